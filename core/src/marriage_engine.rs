//! Per-year marriage matching.
//!
//! Unmarried adults attempt a match in ascending id order. A proposer
//! rolls against the base marriage rate for their sex and age, or
//! against the desperation curve once they reach the long-unmarried
//! age. The candidate pool is drawn from the registry only; a year
//! with no acceptable candidate simply produces no marriage.

use crate::{
    character::Sex,
    config::SimConfig,
    engine::YearEngine,
    error::SimResult,
    event::SimEvent,
    registry::Registry,
    rng::EngineRng,
    types::{CharacterId, Year},
};
use std::sync::Arc;

pub struct MarriageEngine {
    config: Arc<SimConfig>,
}

impl MarriageEngine {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }

    /// Candidate pool for one proposer: living, unmarried, opposite
    /// sex, adult, within the age gap, and outside the incest screen
    /// (relaxed to the sibling screen when the proposer's affiliation
    /// allows cousin marriage). Ascending id order.
    fn candidates(
        &self,
        registry: &Registry,
        proposer: CharacterId,
        proposer_sex: Sex,
        proposer_age: u32,
        allow_cousins: bool,
        year: Year,
    ) -> SimResult<Vec<CharacterId>> {
        let adult_age = self.config.life_stages.cut_points.adult;
        let max_diff = self.config.life_stages.marriage_max_age_diff as i64;
        let mut pool = Vec::new();
        for id in registry.living_ids() {
            if id == proposer {
                continue;
            }
            let candidate = registry.character(id)?;
            if candidate.sex != proposer_sex.opposite() || candidate.spouse.is_some() {
                continue;
            }
            let age = candidate.age_in(year);
            if age < adult_age {
                continue;
            }
            if (age as i64 - proposer_age as i64).abs() > max_diff {
                continue;
            }
            // Direct-line pairs are barred under every policy; cousin
            // permission only relaxes the shared-grandparent screen
            // down to a shared-parent screen.
            let barred = if allow_cousins {
                registry.shares_parent(proposer, id)
                    || registry.is_ancestor_of(proposer, id)
                    || registry.is_ancestor_of(id, proposer)
            } else {
                registry.closely_related(proposer, id)
            };
            if barred {
                continue;
            }
            pool.push(id);
        }
        Ok(pool)
    }
}

impl YearEngine for MarriageEngine {
    fn name(&self) -> &'static str {
        "marriage"
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
            let (sex, age, affiliation) = {
                let c = registry.character(id)?;
                if c.spouse.is_some() {
                    continue;
                }
                (c.sex, c.age_in(year), c.affiliation().cloned())
            };
            if age < stages.cut_points.adult {
                continue;
            }

            // The desperation curve replaces (not augments) the base
            // rate once the threshold age is reached.
            let probability = if age >= stages.long_unmarried_age {
                stages.desperation_rate(age)
            } else {
                stages.marriage_rate(sex, age)
            };
            if !rng.chance(probability) {
                continue;
            }

            let (allow_cousins, lowborn_priority) = match &affiliation {
                Some(group) => {
                    let dynasty = registry.dynasty(group)?;
                    (dynasty.allow_cousin_marriage, dynasty.lowborn_priority)
                }
                None => (false, false),
            };

            let pool = self.candidates(registry, id, sex, age, allow_cousins, year)?;
            if pool.is_empty() {
                continue;
            }

            let pick_from = if lowborn_priority {
                let lowborn: Vec<CharacterId> = pool
                    .iter()
                    .copied()
                    .filter(|&candidate| {
                        registry
                            .character(candidate)
                            .map(|c| c.affiliation().is_none())
                            .unwrap_or(false)
                    })
                    .collect();
                if lowborn.is_empty() {
                    pool
                } else {
                    lowborn
                }
            } else {
                pool
            };

            let partner = pick_from[rng.next_u64_below(pick_from.len() as u64) as usize];
            registry.set_spouse(id, partner)?;
            let (husband, wife) = match sex {
                Sex::Male => (id, partner),
                Sex::Female => (partner, id),
            };
            log::debug!("Characters {husband} and {wife} married in year {year}");
            events.push(SimEvent::MarriageFormed {
                year,
                husband,
                wife,
            });
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        character::Character,
        config::banded_rates,
        dynasty::Dynasty,
        rng::{EngineSlot, RngBank},
    };
    use std::collections::{BTreeMap, BTreeSet};

    fn character(id: u64, sex: Sex, birth_year: Year) -> Character {
        Character {
            id,
            name: format!("c{id}"),
            sex,
            birth_year,
            death_year: None,
            death_reason: None,
            culture: "forest_folk".into(),
            faith: "old_gods".into(),
            dynasty: None,
            house: None,
            father: None,
            mother: None,
            spouse: None,
            traits: BTreeSet::new(),
            skills: BTreeMap::new(),
            generation: 1,
            is_progenitor: false,
            is_bastard: false,
        }
    }

    fn certain_marriage_config() -> SimConfig {
        let mut config = SimConfig::default_test();
        config.life_stages.marriage.male = banded_rates(&[(16, 120, 1.0)]);
        config.life_stages.marriage.female = banded_rates(&[(16, 120, 1.0)]);
        config.life_stages.desperation_marriage = banded_rates(&[(0, 120, 1.0)]);
        config
    }

    fn run(engine: &mut MarriageEngine, year: Year, registry: &mut Registry) -> Vec<SimEvent> {
        let mut rng = RngBank::new(3).for_engine(EngineSlot::Marriage, year);
        engine.run_year(year, registry, &mut rng).unwrap()
    }

    #[test]
    fn pairs_the_only_two_eligible_adults() {
        let mut engine = MarriageEngine::new(Arc::new(certain_marriage_config()));
        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        registry.insert_character(character(2, Sex::Female, 1002)).unwrap();

        let events = run(&mut engine, 1025, &mut registry);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            SimEvent::MarriageFormed { husband: 1, wife: 2, .. }
        ));
        assert_eq!(registry.character(1).unwrap().spouse, Some(2));
        assert_eq!(registry.character(2).unwrap().spouse, Some(1));
    }

    #[test]
    fn respects_the_age_gap_limit() {
        let mut engine = MarriageEngine::new(Arc::new(certain_marriage_config()));
        let mut registry = Registry::new(1);
        // 40-year gap with a 10-year limit.
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        registry.insert_character(character(2, Sex::Female, 1040)).unwrap();

        let events = run(&mut engine, 1060, &mut registry);
        assert!(events.is_empty());
        assert_eq!(registry.character(1).unwrap().spouse, None);
    }

    #[test]
    fn children_never_marry() {
        let mut engine = MarriageEngine::new(Arc::new(certain_marriage_config()));
        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        registry.insert_character(character(2, Sex::Female, 1000)).unwrap();

        assert!(run(&mut engine, 1010, &mut registry).is_empty());
    }

    #[test]
    fn siblings_are_never_matched() {
        let mut engine = MarriageEngine::new(Arc::new(certain_marriage_config()));
        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 980)).unwrap();
        let mut brother = character(2, Sex::Male, 1000);
        brother.father = Some(1);
        registry.insert_character(brother).unwrap();
        let mut sister = character(3, Sex::Female, 1002);
        sister.father = Some(1);
        registry.insert_character(sister).unwrap();

        let events = run(&mut engine, 1020, &mut registry);
        assert!(events.is_empty());
    }

    #[test]
    fn cousins_marry_only_when_the_dynasty_allows_it() {
        let mut config = certain_marriage_config();
        config.init.dynasties[0].allow_cousin_marriage = true;
        let dynasty = Dynasty::from_config(&config.init.dynasties[0]);
        let mut engine = MarriageEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_dynasty(dynasty);
        registry.insert_character(character(1, Sex::Male, 950)).unwrap();
        for (id, sex) in [(2u64, Sex::Male), (3u64, Sex::Male)] {
            let mut c = character(id, sex, 975);
            c.father = Some(1);
            registry.insert_character(c).unwrap();
        }
        let mut cousin_a = character(4, Sex::Male, 1000);
        cousin_a.father = Some(2);
        cousin_a.dynasty = Some("dynasty_blackwood".into());
        registry.insert_character(cousin_a).unwrap();
        let mut cousin_b = character(5, Sex::Female, 1001);
        cousin_b.father = Some(3);
        cousin_b.dynasty = Some("dynasty_blackwood".into());
        registry.insert_character(cousin_b).unwrap();
        // Keep the elder generation out of the pool.
        for id in [1, 2, 3] {
            registry.mark_dead(id, 1019, "death_natural_causes").unwrap();
        }

        let events = run(&mut engine, 1020, &mut registry);
        assert_eq!(events.len(), 1, "cousin match allowed by policy");
        assert!(registry.character(4).unwrap().spouse.is_some());
    }

    #[test]
    fn desperation_curve_replaces_a_zero_base_rate() {
        let mut config = SimConfig::default_test();
        // No one marries by the base tables, but the desperation
        // curve is certain from the threshold on.
        config.life_stages.marriage.male = banded_rates(&[]);
        config.life_stages.marriage.female = banded_rates(&[]);
        config.life_stages.desperation_marriage = banded_rates(&[(35, 120, 1.0)]);
        config.life_stages.long_unmarried_age = 35;
        let mut engine = MarriageEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        registry.insert_character(character(2, Sex::Female, 1003)).unwrap();

        assert!(run(&mut engine, 1030, &mut registry).is_empty(), "below threshold");
        let events = run(&mut engine, 1035, &mut registry);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn lowborn_priority_prefers_unaffiliated_candidates() {
        let mut config = certain_marriage_config();
        config.init.dynasties[0].lowborn_priority = true;
        let dynasty_a = Dynasty::from_config(&config.init.dynasties[0]);
        let dynasty_b = Dynasty::from_config(&config.init.dynasties[1]);
        let mut engine = MarriageEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_dynasty(dynasty_a);
        registry.insert_dynasty(dynasty_b);
        let mut proposer = character(1, Sex::Male, 1000);
        proposer.dynasty = Some("dynasty_blackwood".into());
        registry.insert_character(proposer).unwrap();
        let mut noble = character(2, Sex::Female, 1001);
        noble.dynasty = Some("dynasty_thorne".into());
        registry.insert_character(noble).unwrap();
        registry.insert_character(character(3, Sex::Female, 1002)).unwrap();

        let events = run(&mut engine, 1025, &mut registry);
        assert!(matches!(
            events[0],
            SimEvent::MarriageFormed { husband: 1, wife: 3, .. }
        ));
    }
}
