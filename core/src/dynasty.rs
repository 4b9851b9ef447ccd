//! Dynasty records, succession laws, and gender laws.

use crate::types::{CharacterId, DynastyId, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessionLaw {
    /// Eldest line first, walking down from the deceased.
    Primogeniture,
    /// Youngest line first.
    Ultimogeniture,
    /// Oldest living eligible member, regardless of line.
    Seniority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderLaw {
    /// Males only.
    Agnatic,
    /// Males while any living male member exists, then females.
    AgnaticCognatic,
    /// No filter.
    AbsoluteCognatic,
    /// Females while any living female member exists, then males.
    EnaticCognatic,
    /// Females only.
    Enatic,
}

impl GenderLaw {
    /// Whether lineage walks climb the mother's line rather than the
    /// father's when the deceased's own branch is exhausted.
    pub fn climbs_maternal_line(self) -> bool {
        matches!(self, Self::Enatic | Self::EnaticCognatic)
    }
}

/// Name-inheritance weights for newborns of a dynasty. Must sum to
/// 1.0 (validated at config load).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NameInheritance {
    pub grandparent: f64,
    pub parent: f64,
    pub none: f64,
}

impl NameInheritance {
    pub fn sum(&self) -> f64 {
        self.grandparent + self.parent + self.none
    }
}

/// One dynasty (or cadet house) in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dynasty {
    pub id: DynastyId,
    pub name: String,
    pub motto: String,
    pub culture: String,
    pub faith: String,
    pub succession: SuccessionLaw,
    pub gender_law: GenderLaw,
    pub progenitor_birth_year: Year,
    /// Cadet houses are full dynasty records flagged here, with a
    /// back-reference to their parent dynasty.
    pub is_house: bool,
    pub parent_dynasty: Option<DynastyId>,
    pub allow_cousin_marriage: bool,
    /// When set, unaffiliated candidates are preferred as spouses so
    /// the dynasty's own lines stay unentangled.
    pub lowborn_priority: bool,
    pub name_inheritance: NameInheritance,
    /// Inert lore field, carried through to the roster. No rule
    /// consumes it.
    pub blood_tier: Option<u8>,
    pub head: Option<CharacterId>,
    pub members: BTreeSet<CharacterId>,
    /// Set once no eligible heir exists. Never cleared.
    pub extinct: bool,
}

impl Dynasty {
    pub fn from_config(config: &crate::config::DynastyConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            motto: config.motto.clone(),
            culture: config.culture.clone(),
            faith: config.faith.clone(),
            succession: config.succession,
            gender_law: config.gender_law,
            progenitor_birth_year: config.progenitor_birth_year,
            is_house: config.is_house,
            parent_dynasty: config.parent_dynasty.clone(),
            allow_cousin_marriage: config.allow_cousin_marriage,
            lowborn_priority: config.lowborn_priority,
            name_inheritance: config.name_inheritance,
            blood_tier: config.blood_tier,
            head: None,
            members: BTreeSet::new(),
            extinct: false,
        }
    }
}
