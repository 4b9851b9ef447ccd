//! Character records and life-stage derivation.

use crate::{
    config::LifeStageCutPoints,
    types::{Age, CharacterId, DynastyId, Year},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Coarse life stage, derived from age and the configured cut points.
/// Never stored — always recomputed for the year in question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeStage {
    Infant,
    Child,
    Adult,
    Senior,
}

impl LifeStage {
    pub fn from_age(age: Age, cuts: &LifeStageCutPoints) -> Self {
        if age < cuts.child {
            Self::Infant
        } else if age < cuts.adult {
            Self::Child
        } else if age < cuts.senior {
            Self::Adult
        } else {
            Self::Senior
        }
    }
}

/// One character in the registry. Relationship fields hold ids only;
/// the registry owns all records and resolves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub sex: Sex,
    pub birth_year: Year,
    pub death_year: Option<Year>,
    pub death_reason: Option<String>,
    pub culture: String,
    pub faith: String,
    /// Owning dynasty, if any. Lowborn characters carry neither.
    pub dynasty: Option<DynastyId>,
    /// Owning cadet house, if any. Subordinate to `dynasty`.
    pub house: Option<DynastyId>,
    pub father: Option<CharacterId>,
    pub mother: Option<CharacterId>,
    pub spouse: Option<CharacterId>,
    pub traits: BTreeSet<String>,
    pub skills: BTreeMap<String, u8>,
    /// 1 for progenitors; children get max(parent generations) + 1.
    pub generation: u32,
    pub is_progenitor: bool,
    pub is_bastard: bool,
}

impl Character {
    pub fn alive(&self) -> bool {
        self.death_year.is_none()
    }

    /// Age in the given simulation year. Clamped at zero.
    pub fn age_in(&self, year: Year) -> Age {
        (year - self.birth_year).max(0) as Age
    }

    /// The house where one exists, otherwise the dynasty. Used when a
    /// policy (cousin marriage, lowborn priority) is read off the
    /// character's affiliation.
    pub fn affiliation(&self) -> Option<&DynastyId> {
        self.house.as_ref().or(self.dynasty.as_ref())
    }
}
