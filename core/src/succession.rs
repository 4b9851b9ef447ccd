//! Heir selection under succession and gender law.
//!
//! Called by the mortality engine the moment a dynasty or house head
//! dies, before any other character is processed that year. Selection
//! consumes no randomness: ranking is fully determined by the family
//! graph, birth years, and ascending-id tie-breaks.

use crate::{
    character::Sex,
    dynasty::{GenderLaw, SuccessionLaw},
    error::SimResult,
    event::SimEvent,
    registry::Registry,
    types::{CharacterId, Year},
};
use std::collections::BTreeSet;

/// Re-resolve the head of a dynasty after `deceased` (its previous
/// head) died in `year`. Flags the dynasty extinct when no eligible
/// member remains; extinction is permanent.
pub fn resolve(
    registry: &mut Registry,
    dynasty_id: &str,
    deceased: CharacterId,
    year: Year,
    events: &mut Vec<SimEvent>,
) -> SimResult<()> {
    let dynasty = registry.dynasty(dynasty_id)?;
    if dynasty.extinct {
        return Ok(());
    }
    let law = dynasty.succession;
    let gender_law = dynasty.gender_law;

    let living = registry.living_members_of(dynasty_id)?;
    let eligible = eligible_members(registry, &living, gender_law)?;

    if eligible.is_empty() {
        let dynasty = registry.dynasty_mut(dynasty_id)?;
        dynasty.head = None;
        dynasty.extinct = true;
        log::info!("Dynasty '{dynasty_id}' went extinct in year {year}");
        events.push(SimEvent::DynastyExtinct {
            year,
            dynasty: dynasty_id.to_string(),
        });
        return Ok(());
    }

    let heir = match law {
        SuccessionLaw::Primogeniture => lineage_heir(registry, deceased, &eligible, gender_law, false),
        SuccessionLaw::Ultimogeniture => lineage_heir(registry, deceased, &eligible, gender_law, true),
        SuccessionLaw::Seniority => None,
    };
    // Seniority, and any lineage walk that exhausts the deceased's
    // lines, falls back to the oldest eligible member.
    let Some(heir) = heir.or_else(|| oldest_of(registry, &eligible)) else {
        return Ok(());
    };

    registry.set_head(dynasty_id, Some(heir))?;
    log::debug!("Dynasty '{dynasty_id}': {heir} succeeds {deceased} in year {year}");
    events.push(SimEvent::SuccessionResolved {
        year,
        dynasty: dynasty_id.to_string(),
        heir,
    });
    Ok(())
}

/// Living members admitted by the gender law. The cognatic variants
/// only open to the other sex once no member of the preferred sex is
/// alive.
fn eligible_members(
    registry: &Registry,
    living: &[CharacterId],
    gender_law: GenderLaw,
) -> SimResult<BTreeSet<CharacterId>> {
    let mut males = BTreeSet::new();
    let mut females = BTreeSet::new();
    for &id in living {
        match registry.character(id)?.sex {
            Sex::Male => males.insert(id),
            Sex::Female => females.insert(id),
        };
    }
    Ok(match gender_law {
        GenderLaw::Agnatic => males,
        GenderLaw::Enatic => females,
        GenderLaw::AgnaticCognatic => {
            if males.is_empty() {
                females
            } else {
                males
            }
        }
        GenderLaw::EnaticCognatic => {
            if females.is_empty() {
                males
            } else {
                females
            }
        }
        GenderLaw::AbsoluteCognatic => {
            males.extend(females);
            males
        }
    })
}

/// Depth-first walk of the deceased's own branch, then up the
/// relevant parent line, widening branch by branch. Primogeniture
/// visits elder children first; ultimogeniture visits younger
/// children first. Ties on birth year break by ascending id.
fn lineage_heir(
    registry: &Registry,
    deceased: CharacterId,
    eligible: &BTreeSet<CharacterId>,
    gender_law: GenderLaw,
    youngest_first: bool,
) -> Option<CharacterId> {
    let mut visited = BTreeSet::from([deceased]);
    if let Some(heir) = walk_down(registry, deceased, eligible, &mut visited, youngest_first) {
        return Some(heir);
    }

    let mut current = deceased;
    loop {
        let record = registry.character(current).ok()?;
        let parent = if gender_law.climbs_maternal_line() {
            record.mother
        } else {
            record.father
        };
        let parent = parent?;
        if eligible.contains(&parent) {
            return Some(parent);
        }
        if visited.insert(parent) {
            if let Some(heir) = walk_down(registry, parent, eligible, &mut visited, youngest_first)
            {
                return Some(heir);
            }
        }
        current = parent;
    }
}

fn walk_down(
    registry: &Registry,
    node: CharacterId,
    eligible: &BTreeSet<CharacterId>,
    visited: &mut BTreeSet<CharacterId>,
    youngest_first: bool,
) -> Option<CharacterId> {
    let mut children: Vec<(Year, CharacterId)> = registry
        .children_of(node)
        .iter()
        .filter_map(|&id| registry.character(id).ok().map(|c| (c.birth_year, id)))
        .collect();
    children.sort_by(|a, b| {
        let by_birth = if youngest_first {
            b.0.cmp(&a.0)
        } else {
            a.0.cmp(&b.0)
        };
        by_birth.then(a.1.cmp(&b.1))
    });

    for (_, child) in children {
        if !visited.insert(child) {
            continue;
        }
        if eligible.contains(&child) {
            return Some(child);
        }
        if let Some(heir) = walk_down(registry, child, eligible, visited, youngest_first) {
            return Some(heir);
        }
    }
    None
}

/// Oldest eligible member; birth-year ties break by ascending id.
fn oldest_of(registry: &Registry, eligible: &BTreeSet<CharacterId>) -> Option<CharacterId> {
    eligible.iter().copied().min_by_key(|&id| {
        let birth = registry
            .character(id)
            .map(|c| c.birth_year)
            .unwrap_or(Year::MAX);
        (birth, id)
    })
}
