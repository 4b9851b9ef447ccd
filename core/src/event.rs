//! Simulation events — the audit trail of a run.
//!
//! RULE: Engines report every registry mutation as an event. The
//! driver aggregates them into per-year progress notices and the
//! runner can dump them for debugging.

use crate::types::{CharacterId, DynastyId, RunId, Year};
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
/// Variants are added as the model grows — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Driver events ──────────────────────────────
    RunSeeded {
        run_id: RunId,
        seed: u64,
        progenitors: usize,
    },
    YearStarted {
        year: Year,
    },
    YearCompleted {
        year: Year,
    },

    // ── Demographic events ─────────────────────────
    CharacterBorn {
        year: Year,
        id: CharacterId,
        mother: Option<CharacterId>,
        father: Option<CharacterId>,
        dynasty: Option<DynastyId>,
        bastard: bool,
    },
    MarriageFormed {
        year: Year,
        husband: CharacterId,
        wife: CharacterId,
    },
    CharacterDied {
        year: Year,
        id: CharacterId,
        reason: String,
    },

    // ── Succession events ──────────────────────────
    SuccessionResolved {
        year: Year,
        dynasty: DynastyId,
        heir: CharacterId,
    },
    DynastyExtinct {
        year: Year,
        dynasty: DynastyId,
    },
}

/// Extract a stable string name from a SimEvent variant.
/// Used in log lines and the runner's event dump.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::RunSeeded { .. } => "run_seeded",
        SimEvent::YearStarted { .. } => "year_started",
        SimEvent::YearCompleted { .. } => "year_completed",
        SimEvent::CharacterBorn { .. } => "character_born",
        SimEvent::MarriageFormed { .. } => "marriage_formed",
        SimEvent::CharacterDied { .. } => "character_died",
        SimEvent::SuccessionResolved { .. } => "succession_resolved",
        SimEvent::DynastyExtinct { .. } => "dynasty_extinct",
    }
}
