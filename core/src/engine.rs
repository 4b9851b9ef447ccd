//! The simulation driver — one year at a time, forever replayable.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Mortality engine   (deaths, then immediate succession)
//!   2. Marriage engine
//!   3. Fertility engine
//!
//! RULES:
//!   - Engines execute in registration order, every year.
//!   - Engines touch state only through the registry.
//!   - All randomness flows through the RngBank; one stream per
//!     engine per year.
//!   - Cancellation is observed at year boundaries only, so the
//!     registry is always consistent when the driver stops.

use crate::{
    character::{Character, Sex},
    config::SimConfig,
    dynasty::Dynasty,
    error::{SimError, SimResult},
    event::SimEvent,
    fertility_engine::FertilityEngine,
    marriage_engine::MarriageEngine,
    mortality_engine::MortalityEngine,
    name_provider::{pick_name, NameProvider},
    progress::{CancelFlag, ProgressMessage, ProgressSink},
    registry::Registry,
    rng::{EngineRng, EngineSlot, RngBank},
    types::{RunId, Year},
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The contract every per-year engine must fulfill.
pub trait YearEngine: Send {
    /// Unique stable name for this engine.
    fn name(&self) -> &'static str;

    /// Called once per simulated year by the driver, with this
    /// engine's deterministic RNG stream for that year. Returns the
    /// events describing every registry mutation made.
    fn run_year(
        &mut self,
        year: Year,
        registry: &mut Registry,
        rng: &mut EngineRng,
    ) -> SimResult<Vec<SimEvent>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Uninitialized,
    Seeded,
    Running,
    Completed,
    Failed,
}

impl SimState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Seeded => "seeded",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

pub struct SimEngine {
    pub run_id: RunId,
    seed: u64,
    rng_bank: RngBank,
    config: Arc<SimConfig>,
    provider: Arc<dyn NameProvider>,
    registry: Registry,
    engines: Vec<(EngineSlot, Box<dyn YearEngine>)>,
    event_log: Vec<SimEvent>,
    state: SimState,
    current_year: Year,
    cancel: CancelFlag,
}

impl SimEngine {
    /// Build a fully wired driver with all engines registered. The
    /// config is validated here; a bad config never reaches Seeded.
    pub fn build(
        run_id: RunId,
        seed: u64,
        config: SimConfig,
        provider: Arc<dyn NameProvider>,
    ) -> SimResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let mut engine = Self {
            rng_bank: RngBank::new(seed),
            seed,
            registry: Registry::new(config.init.initial_character_id),
            engines: Vec::new(),
            event_log: Vec::new(),
            state: SimState::Uninitialized,
            current_year: config.init.min_year,
            cancel: CancelFlag::new(),
            provider: provider.clone(),
            config: config.clone(),
            run_id,
        };

        // EXECUTION ORDER — fixed, documented, never reordered.
        engine.register(
            EngineSlot::Mortality,
            Box::new(MortalityEngine::new(config.clone())),
        );
        engine.register(
            EngineSlot::Marriage,
            Box::new(MarriageEngine::new(config.clone())),
        );
        engine.register(
            EngineSlot::Fertility,
            Box::new(FertilityEngine::new(config, provider)),
        );
        Ok(engine)
    }

    /// Register an engine. Call in the documented execution order.
    pub fn register(&mut self, slot: EngineSlot, engine: Box<dyn YearEngine>) {
        self.engines.push((slot, engine));
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn current_year(&self) -> Year {
        self.current_year
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn event_log(&self) -> &[SimEvent] {
        &self.event_log
    }

    /// Handle for requesting cooperative cancellation from another
    /// thread. Observed at the next year boundary.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Create one progenitor per configured dynasty and seat them as
    /// head. Transitions Uninitialized -> Seeded.
    pub fn seed(&mut self, sink: &mut dyn ProgressSink) -> SimResult<()> {
        if self.state != SimState::Uninitialized {
            return Err(SimError::InvalidState {
                state: self.state.as_str(),
                expected: "uninitialized",
            });
        }

        let config = Arc::clone(&self.config);
        for dynasty_config in &config.init.dynasties {
            self.registry
                .insert_dynasty(Dynasty::from_config(dynasty_config));
        }

        let mut rng = self
            .rng_bank
            .for_engine(EngineSlot::Seeding, config.init.min_year);
        let mut progenitors = 0usize;
        for dynasty_config in &config.init.dynasties {
            let id = self.registry.allocate_id();
            let sex = dynasty_config.progenitor_sex;
            let name = pick_name(
                self.provider.as_ref(),
                &dynasty_config.culture,
                sex,
                &mut rng,
            );

            // Progenitors have no parents: traits come from mutation
            // rolls alone.
            let mut traits = BTreeSet::new();
            for t in &self.config.traits.traits {
                if rng.chance(t.mutation) {
                    traits.insert(t.id.clone());
                }
            }
            let mut skills = BTreeMap::new();
            for skill in &self.config.traits.skills {
                let index = rng.pick_weighted(&skill.weights);
                skills.insert(skill.id.clone(), skill.levels[index]);
            }

            let (dynasty, house) = if dynasty_config.is_house {
                (dynasty_config.parent_dynasty.clone(), Some(dynasty_config.id.clone()))
            } else {
                (Some(dynasty_config.id.clone()), None)
            };

            self.registry.insert_character(Character {
                id,
                name,
                sex,
                birth_year: dynasty_config.progenitor_birth_year,
                death_year: None,
                death_reason: None,
                culture: dynasty_config.culture.clone(),
                faith: dynasty_config.faith.clone(),
                dynasty,
                house,
                father: None,
                mother: None,
                spouse: None,
                traits,
                skills,
                generation: 1,
                is_progenitor: true,
                is_bastard: false,
            })?;
            self.registry.set_head(&dynasty_config.id, Some(id))?;
            progenitors += 1;
        }

        self.state = SimState::Seeded;
        self.event_log.push(SimEvent::RunSeeded {
            run_id: self.run_id.clone(),
            seed: self.seed,
            progenitors,
        });
        log::info!("Run {} seeded with {progenitors} progenitors", self.run_id);
        sink.emit(ProgressMessage::Log(format!(
            "Seeded {progenitors} progenitors"
        )));
        Ok(())
    }

    /// Run every year from min_year through max_year. Transitions
    /// Seeded -> Running -> Completed (or Failed on any error). A
    /// cancelled run still completes, with the years simulated so
    /// far intact.
    pub fn run(&mut self, sink: &mut dyn ProgressSink) -> SimResult<()> {
        if self.state != SimState::Seeded {
            return Err(SimError::InvalidState {
                state: self.state.as_str(),
                expected: "seeded",
            });
        }
        self.state = SimState::Running;
        match self.run_years(sink) {
            Ok(()) => {
                self.state = SimState::Completed;
                sink.emit(ProgressMessage::Completed);
                Ok(())
            }
            Err(e) => {
                self.state = SimState::Failed;
                log::error!("Run {} failed: {e}", self.run_id);
                sink.emit(ProgressMessage::Error(e.to_string()));
                sink.emit(ProgressMessage::Failed);
                Err(e)
            }
        }
    }

    fn run_years(&mut self, sink: &mut dyn ProgressSink) -> SimResult<()> {
        for year in self.config.init.min_year..=self.config.init.max_year {
            if self.cancel.is_cancelled() {
                log::info!("Run {} cancelled before year {year}", self.run_id);
                sink.emit(ProgressMessage::Log(format!(
                    "Cancelled before year {year}"
                )));
                break;
            }
            self.step_year(year, sink)?;
        }
        Ok(())
    }

    /// Advance one year. This is the core simulation step.
    fn step_year(&mut self, year: Year, sink: &mut dyn ProgressSink) -> SimResult<()> {
        self.current_year = year;
        self.event_log.push(SimEvent::YearStarted { year });

        let mut born = 0usize;
        let mut married = 0usize;
        let mut died = 0usize;
        for (slot, engine) in &mut self.engines {
            let mut rng = self.rng_bank.for_engine(*slot, year);
            let events = engine.run_year(year, &mut self.registry, &mut rng)?;
            for event in &events {
                match event {
                    SimEvent::CharacterBorn { .. } => born += 1,
                    SimEvent::MarriageFormed { .. } => married += 1,
                    SimEvent::CharacterDied { .. } => died += 1,
                    _ => {}
                }
            }
            self.event_log.extend(events);
        }

        self.event_log.push(SimEvent::YearCompleted { year });
        let living = self.registry.living_count();
        log::trace!("year {year}: {born} born, {married} married, {died} died, {living} living");
        sink.emit(ProgressMessage::Log(format!(
            "year {year}: {born} born, {married} married, {died} died, {living} living"
        )));
        Ok(())
    }
}
