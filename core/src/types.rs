//! Shared primitive types used across the entire generator.

/// A simulated calendar year. One step = one year.
pub type Year = i32;

/// A character's age in whole years.
pub type Age = u32;

/// A stable, unique character identifier. Allocated monotonically
/// by the registry, starting from the configured initial id.
pub type CharacterId = u64;

/// A dynasty (or cadet house) identifier, taken verbatim from config.
pub type DynastyId = String;

/// The canonical run identifier.
pub type RunId = String;
