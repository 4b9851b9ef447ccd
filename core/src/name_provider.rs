//! Culture- and sex-keyed name lists.
//!
//! A provider is built once per run and read by the seeding and
//! fertility engines. A missing or empty list is recoverable: the
//! engine logs a warning and falls back to a placeholder name rather
//! than aborting the run.

use crate::{character::Sex, rng::EngineRng};
use std::collections::HashMap;
use std::path::Path;

pub trait NameProvider: Send + Sync {
    /// The name list for a culture and sex, if one was loaded.
    fn names(&self, culture: &str, sex: Sex) -> Option<&[String]>;
}

/// Draw a name from the provider, falling back to a placeholder when
/// the list is missing or empty.
pub fn pick_name(
    provider: &dyn NameProvider,
    culture: &str,
    sex: Sex,
    rng: &mut EngineRng,
) -> String {
    match provider.names(culture, sex) {
        Some(list) if !list.is_empty() => {
            let index = rng.next_u64_below(list.len() as u64) as usize;
            list[index].clone()
        }
        _ => {
            log::warn!("No {} name list for culture '{culture}', using placeholder", sex.as_str());
            format!("Default_{}", sex.as_str())
        }
    }
}

/// In-memory provider, built by hand. Used by tests and embedders.
#[derive(Default)]
pub struct StaticNameProvider {
    lists: HashMap<(String, Sex), Vec<String>>,
}

impl StaticNameProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, culture: &str, sex: Sex, names: &[&str]) -> Self {
        self.lists.insert(
            (culture.to_string(), sex),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }
}

impl NameProvider for StaticNameProvider {
    fn names(&self, culture: &str, sex: Sex) -> Option<&[String]> {
        self.lists
            .get(&(culture.to_string(), sex))
            .map(Vec::as_slice)
    }
}

/// Loads every `<culture>_<sex>.txt` file from a directory. One name
/// per line; blank lines and `#` comments are skipped. Files that do
/// not match the naming pattern are ignored.
pub struct FileNameProvider {
    lists: HashMap<(String, Sex), Vec<String>>,
}

impl FileNameProvider {
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let mut lists: HashMap<(String, Sex), Vec<String>> = HashMap::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Cannot read name directory {}: {e}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((culture, sex_part)) = stem.rsplit_once('_') else {
                continue;
            };
            let sex = match sex_part {
                "male" => Sex::Male,
                "female" => Sex::Female,
                _ => continue,
            };
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
            let names: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect();
            log::debug!("Loaded {} {} names for culture '{culture}'", names.len(), sex.as_str());
            lists.insert((culture.to_string(), sex), names);
        }
        Ok(Self { lists })
    }
}

impl NameProvider for FileNameProvider {
    fn names(&self, culture: &str, sex: Sex) -> Option<&[String]> {
        self.lists
            .get(&(culture.to_string(), sex))
            .map(Vec::as_slice)
    }
}
