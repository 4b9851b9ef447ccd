use crate::types::{CharacterId, Year};
use thiserror::Error;

/// Fatal configuration faults. Every variant aborts the run before
/// the engine seeds; no partial output is produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No dynasties defined in the initialization document")]
    NoDynasties,

    #[error("Dynasty '{dynasty}' defined more than once")]
    DuplicateDynasty { dynasty: String },

    #[error("Dynasty '{dynasty}': missing required field '{field}'")]
    MissingField {
        dynasty: String,
        field: &'static str,
    },

    #[error("Dynasty '{dynasty}': unknown culture '{culture}'")]
    UnknownCulture { dynasty: String, culture: String },

    #[error("Dynasty '{dynasty}': unknown faith '{faith}'")]
    UnknownFaith { dynasty: String, faith: String },

    #[error("Dynasty '{dynasty}': name-inheritance chances sum to {sum}, expected 1.0")]
    NameInheritanceSum { dynasty: String, sum: f64 },

    #[error("Dynasty '{dynasty}': blood tier {tier} outside [0, 10]")]
    BloodTierOutOfRange { dynasty: String, tier: u8 },

    #[error("House '{dynasty}': parent dynasty '{parent}' is not defined")]
    UnknownParentDynasty { dynasty: String, parent: String },

    #[error("House '{dynasty}': parent dynasty '{parent}' is itself a house")]
    HouseParentIsHouse { dynasty: String, parent: String },

    #[error("{table} rates ({sex}): expected {expected} entries, got {actual}")]
    RateTableLength {
        table: &'static str,
        sex: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{table} rates ({sex}) at age {age}: probability {value} outside [0, 1]")]
    RateOutOfRange {
        table: &'static str,
        sex: &'static str,
        age: usize,
        value: f64,
    },

    #[error("Probability '{field}' = {value} outside [0, 1]")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    #[error("Life-stage cut points must be strictly increasing (child {child}, adult {adult}, senior {senior})")]
    BadLifeStageCutPoints { child: u32, adult: u32, senior: u32 },

    #[error("Simulation window inverted: min_year {min} is after max_year {max}")]
    InvertedSimWindow { min: Year, max: Year },

    #[error("Negative event '{event}': mortality multiplier {multiplier} must be positive")]
    NonPositiveMultiplier { event: String, multiplier: f64 },

    #[error("Negative event '{event}': start year {start} is after end year {end}")]
    InvertedEventYears { event: String, start: Year, end: Year },

    #[error("Negative event '{event}': minimum age {min} is above maximum age {max}")]
    InvertedEventAges { event: String, min: u32, max: u32 },

    #[error("Trait '{id}' defined more than once")]
    DuplicateTrait { id: String },

    #[error("Skill '{id}': levels and weights must be the same non-zero length")]
    BadSkillTable { id: String },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Character {0} not found in registry")]
    CharacterNotFound(CharacterId),

    #[error("Dynasty '{0}' not found in registry")]
    DynastyNotFound(String),

    #[error("Character {child}: parent {parent} must be born strictly earlier")]
    ParentBornLater { child: CharacterId, parent: CharacterId },

    #[error("Engine is {state}; expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
