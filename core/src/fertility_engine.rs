//! Per-year conception and child creation.
//!
//! Fertile females are processed in ascending id order. Married
//! females roll against the per-age fertility table; unmarried
//! females roll against the bastardy chance. A successful roll
//! creates a full newborn record: sex at even odds, dynasty and
//! culture resolved through the father (or the mother, by config),
//! inherited names, traits, and a rolled skill block.
//!
//! Draw order per birth is fixed: conception, sex, name-inheritance
//! choice, name pick (when needed), traits in document order, skills
//! in document order. Changing it changes every seeded lineage.

use crate::{
    character::{Character, Sex},
    config::SimConfig,
    engine::YearEngine,
    error::SimResult,
    event::SimEvent,
    name_provider::{pick_name, NameProvider},
    registry::Registry,
    rng::EngineRng,
    types::{CharacterId, Year},
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Trait id stamped on children born out of wedlock.
pub const BASTARD_TRAIT: &str = "bastard";

pub struct FertilityEngine {
    config: Arc<SimConfig>,
    provider: Arc<dyn NameProvider>,
}

impl FertilityEngine {
    pub fn new(config: Arc<SimConfig>, provider: Arc<dyn NameProvider>) -> Self {
        Self { config, provider }
    }

    fn create_child(
        &self,
        registry: &mut Registry,
        mother_id: CharacterId,
        father_id: Option<CharacterId>,
        year: Year,
        rng: &mut EngineRng,
        events: &mut Vec<SimEvent>,
    ) -> SimResult<()> {
        let mother = registry.character(mother_id)?.clone();
        let father = match father_id {
            Some(id) => Some(registry.character(id)?.clone()),
            None => None,
        };

        let generation = mother
            .generation
            .max(father.as_ref().map(|f| f.generation).unwrap_or(0))
            + 1;
        if generation > self.config.init.generation_max {
            log::debug!("Suppressing birth past generation {generation} for mother {mother_id}");
            return Ok(());
        }

        let sex = if rng.chance(0.5) { Sex::Male } else { Sex::Female };

        // Children follow the father's affiliation; an unaffiliated
        // or absent father can pass the mother's through instead.
        let lineage_parent = match &father {
            Some(f) if f.affiliation().is_some() => Some(f),
            _ if self.config.life_stages.inherit_mother_dynasty => Some(&mother),
            _ => None,
        };
        let (dynasty, house, culture, faith) = match lineage_parent {
            Some(parent) => (
                parent.dynasty.clone(),
                parent.house.clone(),
                parent.culture.clone(),
                parent.faith.clone(),
            ),
            None => (None, None, mother.culture.clone(), mother.faith.clone()),
        };

        let name = self.child_name(
            registry,
            &mother,
            father.as_ref(),
            sex,
            house.as_deref().or(dynasty.as_deref()),
            &culture,
            rng,
        )?;

        let mut traits = BTreeSet::new();
        for t in &self.config.traits.traits {
            let carried = mother.traits.contains(&t.id)
                || father
                    .as_ref()
                    .map(|f| f.traits.contains(&t.id))
                    .unwrap_or(false);
            let probability = if carried { t.inheritance } else { t.mutation };
            if rng.chance(probability) {
                traits.insert(t.id.clone());
            }
        }
        let is_bastard = father_id.is_none();
        if is_bastard {
            traits.insert(BASTARD_TRAIT.to_string());
        }

        let mut skills = BTreeMap::new();
        for skill in &self.config.traits.skills {
            let index = rng.pick_weighted(&skill.weights);
            skills.insert(skill.id.clone(), skill.levels[index]);
        }

        let id = registry.allocate_id();
        let child = Character {
            id,
            name,
            sex,
            birth_year: year,
            death_year: None,
            death_reason: None,
            culture,
            faith,
            dynasty: dynasty.clone(),
            house,
            father: father_id,
            mother: Some(mother_id),
            spouse: None,
            traits,
            skills,
            generation,
            is_progenitor: false,
            is_bastard,
        };
        registry.insert_character(child)?;

        log::debug!("Character {id} born in year {year} to mother {mother_id}");
        events.push(SimEvent::CharacterBorn {
            year,
            id,
            mother: Some(mother_id),
            father: father_id,
            dynasty,
            bastard: is_bastard,
        });
        Ok(())
    }

    /// Roll the dynasty's name-inheritance table: a grandparent's
    /// name, a parent's name, or a fresh pick from the provider.
    /// Sons look to the paternal line, daughters to the maternal
    /// line; a missing ancestor falls through to the provider.
    #[allow(clippy::too_many_arguments)]
    fn child_name(
        &self,
        registry: &Registry,
        mother: &Character,
        father: Option<&Character>,
        sex: Sex,
        affiliation: Option<&str>,
        culture: &str,
        rng: &mut EngineRng,
    ) -> SimResult<String> {
        let weights = match affiliation {
            Some(group) => Some(registry.dynasty(group)?.name_inheritance),
            None => None,
        };
        if let Some(weights) = weights {
            let choice =
                rng.pick_weighted(&[weights.grandparent, weights.parent, weights.none]);
            let inherited = match (choice, sex) {
                (0, Sex::Male) => father
                    .and_then(|f| f.father)
                    .and_then(|gf| registry.character(gf).ok())
                    .map(|gf| gf.name.clone()),
                (0, Sex::Female) => mother
                    .mother
                    .and_then(|gm| registry.character(gm).ok())
                    .map(|gm| gm.name.clone()),
                (1, Sex::Male) => father.map(|f| f.name.clone()),
                (1, Sex::Female) => Some(mother.name.clone()),
                _ => None,
            };
            if let Some(name) = inherited {
                return Ok(name);
            }
        }
        Ok(pick_name(self.provider.as_ref(), culture, sex, rng))
    }
}

impl YearEngine for FertilityEngine {
    fn name(&self) -> &'static str {
        "fertility"
    }

    fn run_year(
        &mut self,
        year: Year,
        registry: &mut Registry,
        rng: &mut EngineRng,
    ) -> SimResult<Vec<SimEvent>> {
        let stages = &self.config.life_stages;
        let mut events = Vec::new();

        for id in registry.living_ids() {
            let (age, spouse) = {
                let c = registry.character(id)?;
                if c.sex != Sex::Female {
                    continue;
                }
                (c.age_in(year), c.spouse)
            };
            if age < stages.cut_points.adult || age >= stages.female_fertility_cutoff {
                continue;
            }

            let children = registry.children_of(id);
            if children.len() >= stages.maximum_children {
                continue;
            }
            let last_birth = children
                .iter()
                .filter_map(|&child| registry.character(child).ok().map(|c| c.birth_year))
                .max();
            if let Some(last) = last_birth {
                if year - last < stages.minimum_years_between_children as Year {
                    continue;
                }
            }

            let probability = match spouse {
                Some(_) => stages.fertility_rate(Sex::Female, age),
                None => stages.bastardy_chance_female,
            };
            if !rng.chance(probability) {
                continue;
            }

            self.create_child(registry, id, spouse, year, rng, &mut events)?;
        }

        Ok(events)
    }
}
