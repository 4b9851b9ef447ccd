//! Typed, validated configuration.
//!
//! Three documents drive a run:
//!   - initialization.json  — simulation window, dynasties, negative events
//!   - life_stages.json     — per-age rate tables and demographic knobs
//!   - traits.json          — heritable traits and skill level tables
//!
//! RULE: Validation runs once, at load. A SimConfig that reaches the
//! engine is internally consistent and is never mutated afterwards.
//! Every validation failure is a ConfigError and aborts before seeding.

use crate::{
    character::Sex,
    dynasty::{GenderLaw, NameInheritance, SuccessionLaw},
    error::{ConfigError, SimResult},
    types::{Age, CharacterId, DynastyId, Year},
};
use serde::{Deserialize, Serialize};

/// Rate tables cover whole-year ages 0 through 120 inclusive.
pub const RATE_TABLE_LEN: usize = 121;

/// Tolerance for the name-inheritance weights summing to 1.0.
const NAME_INHERITANCE_EPSILON: f64 = 1e-6;

// ── Initialization document ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynastyConfig {
    pub id: DynastyId,
    pub name: String,
    #[serde(default)]
    pub motto: String,
    pub culture: String,
    pub faith: String,
    pub succession: SuccessionLaw,
    pub gender_law: GenderLaw,
    pub progenitor_birth_year: Year,
    /// Sex of the seeded progenitor (default male).
    #[serde(default = "default_progenitor_sex")]
    pub progenitor_sex: Sex,
    #[serde(default)]
    pub is_house: bool,
    #[serde(default)]
    pub parent_dynasty: Option<DynastyId>,
    #[serde(default)]
    pub allow_cousin_marriage: bool,
    #[serde(default)]
    pub lowborn_priority: bool,
    pub name_inheritance: NameInheritance,
    /// Inert lore field. Parsed, range-checked, never consumed.
    #[serde(default)]
    pub blood_tier: Option<u8>,
}

fn default_progenitor_sex() -> Sex {
    Sex::Male
}

/// A windowed mortality modifier (plague, war, famine). Applies by
/// simulation year and the character's age in that year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegativeEventConfig {
    pub id: String,
    pub start_year: Year,
    pub end_year: Year,
    pub min_age: Age,
    pub max_age: Age,
    pub death_reason: String,
    pub mortality_multiplier: f64,
}

impl NegativeEventConfig {
    /// Whether this event covers the given year and age.
    pub fn applies(&self, year: Year, age: Age) -> bool {
        (self.start_year..=self.end_year).contains(&year)
            && (self.min_age..=self.max_age).contains(&age)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializationConfig {
    pub min_year: Year,
    pub max_year: Year,
    /// Births past this generation depth are suppressed.
    pub generation_max: u32,
    /// First character id the registry hands out.
    pub initial_character_id: CharacterId,
    pub cultures: Vec<String>,
    pub faiths: Vec<String>,
    pub dynasties: Vec<DynastyConfig>,
    #[serde(default)]
    pub events: Vec<NegativeEventConfig>,
}

// ── Life-stages document ──────────────────────────────────────────

/// Per-age annual rates, split by sex. Indexed by whole-year age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SexRates {
    pub male: Vec<f64>,
    pub female: Vec<f64>,
}

impl SexRates {
    pub fn for_sex(&self, sex: Sex) -> &[f64] {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }
}

/// Inclusive lower bounds of the child, adult, and senior stages.
/// Ages below `child` are infants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LifeStageCutPoints {
    pub child: Age,
    pub adult: Age,
    pub senior: Age,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeStagesConfig {
    pub mortality: SexRates,
    pub marriage: SexRates,
    pub fertility: SexRates,
    /// Replaces the base marriage rate once a character reaches
    /// `long_unmarried_age`, still unmarried.
    pub desperation_marriage: Vec<f64>,
    pub long_unmarried_age: Age,
    pub cut_points: LifeStageCutPoints,
    pub marriage_max_age_diff: u32,
    pub maximum_children: usize,
    pub minimum_years_between_children: u32,
    pub bastardy_chance_male: f64,
    pub bastardy_chance_female: f64,
    pub female_fertility_cutoff: Age,
    /// When the father is unaffiliated (or absent), children join the
    /// mother's dynasty instead of being lowborn.
    #[serde(default)]
    pub inherit_mother_dynasty: bool,
}

impl LifeStagesConfig {
    /// Annual death probability. Ages past the table end are certain
    /// deaths.
    pub fn mortality_rate(&self, sex: Sex, age: Age) -> f64 {
        self.mortality
            .for_sex(sex)
            .get(age as usize)
            .copied()
            .unwrap_or(1.0)
    }

    /// Annual marriage-attempt probability. Zero past the table end.
    pub fn marriage_rate(&self, sex: Sex, age: Age) -> f64 {
        self.marriage
            .for_sex(sex)
            .get(age as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Annual conception probability. Zero past the table end.
    pub fn fertility_rate(&self, sex: Sex, age: Age) -> f64 {
        self.fertility
            .for_sex(sex)
            .get(age as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Desperation marriage probability; clamps to the last entry for
    /// ages past the table end.
    pub fn desperation_rate(&self, age: Age) -> f64 {
        let idx = (age as usize).min(self.desperation_marriage.len().saturating_sub(1));
        self.desperation_marriage.get(idx).copied().unwrap_or(0.0)
    }
}

// ── Traits document ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitDef {
    pub id: String,
    /// Chance a child receives the trait when a parent carries it.
    pub inheritance: f64,
    /// Chance the trait appears with no carrier parent.
    pub mutation: f64,
}

/// Weighted level table for one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub levels: Vec<u8>,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitsConfig {
    pub traits: Vec<TraitDef>,
    /// Ordered list; every character gets one level per skill, rolled
    /// in this order.
    pub skills: Vec<SkillDef>,
}

// ── Assembled config ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub init: InitializationConfig,
    pub life_stages: LifeStagesConfig,
    pub traits: TraitsConfig,
}

impl SimConfig {
    /// Load from a config directory holding the three documents.
    /// In tests, use SimConfig::default_test().
    pub fn load(config_dir: &str) -> SimResult<Self> {
        let init_path = format!("{config_dir}/initialization.json");
        let init_content = std::fs::read_to_string(&init_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {init_path}: {e}"))?;
        let init: InitializationConfig = serde_json::from_str(&init_content)?;

        let stages_path = format!("{config_dir}/life_stages.json");
        let stages_content = std::fs::read_to_string(&stages_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {stages_path}: {e}"))?;
        let life_stages: LifeStagesConfig = serde_json::from_str(&stages_content)?;

        let traits_path = format!("{config_dir}/traits.json");
        let traits_content = std::fs::read_to_string(&traits_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {traits_path}: {e}"))?;
        let traits: TraitsConfig = serde_json::from_str(&traits_content)?;

        let config = Self {
            init,
            life_stages,
            traits,
        };
        config.validate()?;
        Ok(config)
    }

    /// Full structural validation. Called by load(); engine
    /// construction calls it again so hand-built configs are checked
    /// too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_init()?;
        self.validate_life_stages()?;
        self.validate_traits()?;
        Ok(())
    }

    fn validate_init(&self) -> Result<(), ConfigError> {
        let init = &self.init;
        if init.min_year > init.max_year {
            return Err(ConfigError::InvertedSimWindow {
                min: init.min_year,
                max: init.max_year,
            });
        }
        if init.dynasties.is_empty() {
            return Err(ConfigError::NoDynasties);
        }

        let mut seen = std::collections::BTreeSet::new();
        for d in &init.dynasties {
            if !seen.insert(d.id.as_str()) {
                return Err(ConfigError::DuplicateDynasty {
                    dynasty: d.id.clone(),
                });
            }
            for (field, value) in [("id", &d.id), ("name", &d.name)] {
                if value.is_empty() {
                    return Err(ConfigError::MissingField {
                        dynasty: d.id.clone(),
                        field,
                    });
                }
            }
            if !init.cultures.contains(&d.culture) {
                return Err(ConfigError::UnknownCulture {
                    dynasty: d.id.clone(),
                    culture: d.culture.clone(),
                });
            }
            if !init.faiths.contains(&d.faith) {
                return Err(ConfigError::UnknownFaith {
                    dynasty: d.id.clone(),
                    faith: d.faith.clone(),
                });
            }
            let sum = d.name_inheritance.sum();
            if (sum - 1.0).abs() > NAME_INHERITANCE_EPSILON {
                return Err(ConfigError::NameInheritanceSum {
                    dynasty: d.id.clone(),
                    sum,
                });
            }
            if let Some(tier) = d.blood_tier {
                if tier > 10 {
                    return Err(ConfigError::BloodTierOutOfRange {
                        dynasty: d.id.clone(),
                        tier,
                    });
                }
            }
            if d.is_house && d.parent_dynasty.is_none() {
                return Err(ConfigError::MissingField {
                    dynasty: d.id.clone(),
                    field: "parent_dynasty",
                });
            }
            // Parent references must resolve inside this document, and
            // cadet houses hang off full dynasties only.
            if let Some(parent) = &d.parent_dynasty {
                match init.dynasties.iter().find(|p| p.id == *parent) {
                    None => {
                        return Err(ConfigError::UnknownParentDynasty {
                            dynasty: d.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    Some(p) if p.is_house => {
                        return Err(ConfigError::HouseParentIsHouse {
                            dynasty: d.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for ev in &init.events {
            if ev.mortality_multiplier <= 0.0 {
                return Err(ConfigError::NonPositiveMultiplier {
                    event: ev.id.clone(),
                    multiplier: ev.mortality_multiplier,
                });
            }
            if ev.start_year > ev.end_year {
                return Err(ConfigError::InvertedEventYears {
                    event: ev.id.clone(),
                    start: ev.start_year,
                    end: ev.end_year,
                });
            }
            if ev.min_age > ev.max_age {
                return Err(ConfigError::InvertedEventAges {
                    event: ev.id.clone(),
                    min: ev.min_age,
                    max: ev.max_age,
                });
            }
        }
        Ok(())
    }

    fn validate_life_stages(&self) -> Result<(), ConfigError> {
        let ls = &self.life_stages;
        let tables: [(&'static str, &SexRates); 3] = [
            ("mortality", &ls.mortality),
            ("marriage", &ls.marriage),
            ("fertility", &ls.fertility),
        ];
        for (table, rates) in tables {
            for (sex, values) in [("male", &rates.male), ("female", &rates.female)] {
                check_rate_table(table, sex, values)?;
            }
        }
        check_rate_table("desperation_marriage", "any", &ls.desperation_marriage)?;

        let cuts = ls.cut_points;
        if cuts.child >= cuts.adult || cuts.adult >= cuts.senior {
            return Err(ConfigError::BadLifeStageCutPoints {
                child: cuts.child,
                adult: cuts.adult,
                senior: cuts.senior,
            });
        }

        for (field, value) in [
            ("bastardy_chance_male", ls.bastardy_chance_male),
            ("bastardy_chance_female", ls.bastardy_chance_female),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }
        Ok(())
    }

    fn validate_traits(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for t in &self.traits.traits {
            if !seen.insert(t.id.as_str()) {
                return Err(ConfigError::DuplicateTrait { id: t.id.clone() });
            }
            for (field, value) in [
                ("trait inheritance", t.inheritance),
                ("trait mutation", t.mutation),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::ProbabilityOutOfRange { field, value });
                }
            }
        }
        for s in &self.traits.skills {
            if s.levels.is_empty()
                || s.levels.len() != s.weights.len()
                || s.weights.iter().any(|w| *w < 0.0)
            {
                return Err(ConfigError::BadSkillTable { id: s.id.clone() });
            }
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let dynasties = vec![
            DynastyConfig {
                id: "dynasty_blackwood".into(),
                name: "Blackwood".into(),
                motto: "Roots hold fast".into(),
                culture: "forest_folk".into(),
                faith: "old_gods".into(),
                succession: SuccessionLaw::Primogeniture,
                gender_law: GenderLaw::AgnaticCognatic,
                progenitor_birth_year: 980,
                progenitor_sex: Sex::Male,
                is_house: false,
                parent_dynasty: None,
                allow_cousin_marriage: false,
                lowborn_priority: false,
                name_inheritance: NameInheritance {
                    grandparent: 0.2,
                    parent: 0.3,
                    none: 0.5,
                },
                blood_tier: None,
            },
            DynastyConfig {
                id: "dynasty_thorne".into(),
                name: "Thorne".into(),
                motto: "Sharp and sure".into(),
                culture: "forest_folk".into(),
                faith: "old_gods".into(),
                succession: SuccessionLaw::Seniority,
                gender_law: GenderLaw::AbsoluteCognatic,
                progenitor_birth_year: 978,
                progenitor_sex: Sex::Male,
                is_house: false,
                parent_dynasty: None,
                allow_cousin_marriage: false,
                lowborn_priority: false,
                name_inheritance: NameInheritance {
                    grandparent: 0.25,
                    parent: 0.25,
                    none: 0.5,
                },
                blood_tier: Some(2),
            },
        ];

        Self {
            init: InitializationConfig {
                min_year: 1000,
                max_year: 1050,
                generation_max: 10,
                initial_character_id: 1000,
                cultures: vec!["forest_folk".into()],
                faiths: vec!["old_gods".into()],
                dynasties,
                events: vec![],
            },
            life_stages: LifeStagesConfig {
                mortality: SexRates {
                    male: banded_rates(&[(0, 2, 0.03), (3, 64, 0.01), (65, 120, 0.08)]),
                    female: banded_rates(&[(0, 2, 0.03), (3, 64, 0.008), (65, 120, 0.07)]),
                },
                marriage: SexRates {
                    male: banded_rates(&[(16, 60, 0.3)]),
                    female: banded_rates(&[(16, 60, 0.3)]),
                },
                fertility: SexRates {
                    male: banded_rates(&[(16, 60, 0.2)]),
                    female: banded_rates(&[(16, 45, 0.25)]),
                },
                desperation_marriage: banded_rates(&[(35, 70, 0.5)]),
                long_unmarried_age: 35,
                cut_points: LifeStageCutPoints {
                    child: 3,
                    adult: 16,
                    senior: 65,
                },
                marriage_max_age_diff: 10,
                maximum_children: 8,
                minimum_years_between_children: 2,
                bastardy_chance_male: 0.0,
                bastardy_chance_female: 0.02,
                female_fertility_cutoff: 45,
                inherit_mother_dynasty: true,
            },
            traits: TraitsConfig {
                traits: vec![
                    TraitDef {
                        id: "brave".into(),
                        inheritance: 0.35,
                        mutation: 0.02,
                    },
                    TraitDef {
                        id: "cruel".into(),
                        inheritance: 0.25,
                        mutation: 0.01,
                    },
                ],
                skills: ["diplomacy", "martial", "stewardship", "intrigue", "learning", "prowess"]
                    .into_iter()
                    .map(|id| SkillDef {
                        id: id.into(),
                        levels: vec![4, 8, 12, 16],
                        weights: vec![0.4, 0.3, 0.2, 0.1],
                    })
                    .collect(),
            },
        }
    }
}

fn check_rate_table(
    table: &'static str,
    sex: &'static str,
    values: &[f64],
) -> Result<(), ConfigError> {
    if values.len() != RATE_TABLE_LEN {
        return Err(ConfigError::RateTableLength {
            table,
            sex,
            expected: RATE_TABLE_LEN,
            actual: values.len(),
        });
    }
    for (age, value) in values.iter().enumerate() {
        if !(0.0..=1.0).contains(value) {
            return Err(ConfigError::RateOutOfRange {
                table,
                sex,
                age,
                value: *value,
            });
        }
    }
    Ok(())
}

/// Build a full-length rate table from inclusive (from, to, rate)
/// bands. Unlisted ages are zero.
pub fn banded_rates(bands: &[(usize, usize, f64)]) -> Vec<f64> {
    let mut rates = vec![0.0; RATE_TABLE_LEN];
    for &(from, to, rate) in bands {
        for slot in rates.iter_mut().take(to + 1).skip(from) {
            *slot = rate;
        }
    }
    rates
}
