//! Per-year death resolution.
//!
//! Every living character gets exactly one roll per year, in
//! ascending id order. The annual probability is the per-age base
//! rate times every negative event covering this year and the
//! character's current age, clamped to 1.0. When a dynasty or house
//! head dies, succession resolves immediately, before the next
//! character is processed.

use crate::{
    character::LifeStage,
    config::SimConfig,
    engine::YearEngine,
    error::SimResult,
    event::SimEvent,
    registry::Registry,
    rng::EngineRng,
    succession,
    types::{DynastyId, Year},
};
use std::sync::Arc;

/// Death reason when an infant or child dies with no event to blame.
pub const DEATH_REASON_ILLNESS: &str = "death_ill";
/// Death reason for adults and seniors with no event to blame.
pub const DEATH_REASON_NATURAL: &str = "death_natural_causes";

pub struct MortalityEngine {
    config: Arc<SimConfig>,
}

impl MortalityEngine {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl YearEngine for MortalityEngine {
    fn name(&self) -> &'static str {
        "mortality"
    }

    fn run_year(
        &mut self,
        year: Year,
        registry: &mut Registry,
        rng: &mut EngineRng,
    ) -> SimResult<Vec<SimEvent>> {
        let config = &self.config;
        let mut events = Vec::new();

        for id in registry.living_ids() {
            let (sex, age, dynasty, house) = {
                let c = registry.character(id)?;
                (c.sex, c.age_in(year), c.dynasty.clone(), c.house.clone())
            };

            let mut probability = config.life_stages.mortality_rate(sex, age);
            let mut event_reason: Option<&str> = None;
            for ev in &config.init.events {
                if ev.applies(year, age) {
                    probability = (probability * ev.mortality_multiplier).min(1.0);
                    event_reason = Some(ev.death_reason.as_str());
                }
            }

            // One roll per living character per year, even when the
            // probability is zero, so streams stay aligned.
            if !rng.chance(probability) {
                continue;
            }

            let reason = match event_reason {
                Some(reason) => reason.to_string(),
                None => match LifeStage::from_age(age, &config.life_stages.cut_points) {
                    LifeStage::Infant | LifeStage::Child => DEATH_REASON_ILLNESS.to_string(),
                    LifeStage::Adult | LifeStage::Senior => DEATH_REASON_NATURAL.to_string(),
                },
            };

            let mut headed: Vec<DynastyId> = Vec::new();
            for group in [dynasty, house].into_iter().flatten() {
                if registry.dynasty(&group)?.head == Some(id) {
                    headed.push(group);
                }
            }

            registry.mark_dead(id, year, &reason)?;
            log::debug!("Character {id} died in year {year} at age {age} ({reason})");
            events.push(SimEvent::CharacterDied { year, id, reason });

            for group in &headed {
                succession::resolve(registry, group, id, year, &mut events)?;
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        character::{Character, Sex},
        config::{banded_rates, NegativeEventConfig},
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

    fn run(engine: &mut MortalityEngine, year: Year, registry: &mut Registry) -> Vec<SimEvent> {
        let mut rng = RngBank::new(11).for_engine(EngineSlot::Mortality, year);
        engine.run_year(year, registry, &mut rng).unwrap()
    }

    #[test]
    fn certain_mortality_bucket_always_kills() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.male = banded_rates(&[(40, 40, 1.0)]);
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();

        // Age 39: rate zero, must survive.
        assert!(run(&mut engine, 1039, &mut registry).is_empty());
        // Age 40: rate one, must die of natural causes (adult).
        let events = run(&mut engine, 1040, &mut registry);
        assert_eq!(events.len(), 1);
        let dead = registry.character(1).unwrap();
        assert_eq!(dead.death_year, Some(1040));
        assert_eq!(dead.death_reason.as_deref(), Some(DEATH_REASON_NATURAL));
    }

    #[test]
    fn child_death_defaults_to_illness() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.female = banded_rates(&[(5, 5, 1.0)]);
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Female, 1000)).unwrap();
        run(&mut engine, 1005, &mut registry);
        assert_eq!(
            registry.character(1).unwrap().death_reason.as_deref(),
            Some(DEATH_REASON_ILLNESS)
        );
    }

    #[test]
    fn ages_past_the_table_are_certain_deaths() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.male = banded_rates(&[]);
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        assert!(run(&mut engine, 1120, &mut registry).is_empty(), "age 120 still in table");
        run(&mut engine, 1121, &mut registry);
        assert!(!registry.character(1).unwrap().alive());
    }

    #[test]
    fn negative_event_supplies_the_death_reason() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.male = banded_rates(&[(20, 20, 0.5)]);
        config.init.events.push(NegativeEventConfig {
            id: "great_plague".into(),
            start_year: 1020,
            end_year: 1020,
            min_age: 0,
            max_age: 120,
            death_reason: "death_plague".into(),
            mortality_multiplier: 10.0,
        });
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        // 0.5 * 10 clamps to 1.0 — certain death, tagged by the event.
        run(&mut engine, 1020, &mut registry);
        assert_eq!(
            registry.character(1).unwrap().death_reason.as_deref(),
            Some("death_plague")
        );
    }

    #[test]
    fn negative_event_outside_age_window_does_not_apply() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.male = banded_rates(&[]);
        config.init.events.push(NegativeEventConfig {
            id: "border_war".into(),
            start_year: 1000,
            end_year: 1100,
            min_age: 16,
            max_age: 40,
            death_reason: "death_battle".into(),
            mortality_multiplier: 100.0,
        });
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_character(character(1, Sex::Male, 1000)).unwrap();
        // Age 10: the war does not touch children, base rate is zero.
        assert!(run(&mut engine, 1010, &mut registry).is_empty());
        assert!(registry.character(1).unwrap().alive());
    }

    #[test]
    fn dead_head_triggers_immediate_succession() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.male = banded_rates(&[(60, 60, 1.0)]);
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_dynasty(Dynasty::from_config(&config_dynasty()));
        let mut head = character(1, Sex::Male, 1000);
        head.dynasty = Some("dynasty_blackwood".into());
        head.is_progenitor = true;
        registry.insert_character(head).unwrap();
        let mut son = character(2, Sex::Male, 1025);
        son.dynasty = Some("dynasty_blackwood".into());
        son.father = Some(1);
        registry.insert_character(son).unwrap();
        registry.set_head("dynasty_blackwood", Some(1)).unwrap();

        let events = run(&mut engine, 1060, &mut registry);
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::SuccessionResolved { heir: 2, .. }
        )));
        assert_eq!(registry.dynasty("dynasty_blackwood").unwrap().head, Some(2));
    }

    #[test]
    fn dead_house_head_triggers_succession_in_both_groups() {
        let mut config = SimConfig::default_test();
        config.life_stages.mortality.male = banded_rates(&[(60, 60, 1.0)]);
        let parent_config = config_dynasty();
        let mut house_config = parent_config.clone();
        house_config.id = "house_ravenwood".into();
        house_config.name = "Ravenwood".into();
        house_config.is_house = true;
        house_config.parent_dynasty = Some("dynasty_blackwood".into());
        let mut engine = MortalityEngine::new(Arc::new(config));

        let mut registry = Registry::new(1);
        registry.insert_dynasty(Dynasty::from_config(&parent_config));
        registry.insert_dynasty(Dynasty::from_config(&house_config));
        let mut head = character(1, Sex::Male, 1000);
        head.dynasty = Some("dynasty_blackwood".into());
        head.house = Some("house_ravenwood".into());
        registry.insert_character(head).unwrap();
        let mut son = character(2, Sex::Male, 1025);
        son.dynasty = Some("dynasty_blackwood".into());
        son.house = Some("house_ravenwood".into());
        son.father = Some(1);
        registry.insert_character(son).unwrap();
        registry.set_head("dynasty_blackwood", Some(1)).unwrap();
        registry.set_head("house_ravenwood", Some(1)).unwrap();

        let events = run(&mut engine, 1060, &mut registry);
        // One succession per headed group, dynasty before house.
        let resolved: Vec<(&str, u64)> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::SuccessionResolved { dynasty, heir, .. } => {
                    Some((dynasty.as_str(), *heir))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            resolved,
            vec![("dynasty_blackwood", 2), ("house_ravenwood", 2)]
        );
        assert_eq!(registry.dynasty("dynasty_blackwood").unwrap().head, Some(2));
        assert_eq!(registry.dynasty("house_ravenwood").unwrap().head, Some(2));
    }

    fn config_dynasty() -> crate::config::DynastyConfig {
        SimConfig::default_test().init.dynasties[0].clone()
    }
}
