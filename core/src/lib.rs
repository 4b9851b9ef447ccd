//! dynastygen-core: a deterministic multi-generational genealogy
//! generator.
//!
//! A run seeds one progenitor per configured dynasty, then steps one
//! year at a time through three engines (mortality, marriage,
//! fertility) until the configured end year. Every source of
//! randomness derives from a single master seed, so the same seed and
//! config always reproduce the same family tree.

pub mod character;
pub mod config;
pub mod dynasty;
pub mod engine;
pub mod error;
pub mod event;
pub mod fertility_engine;
pub mod marriage_engine;
pub mod mortality_engine;
pub mod name_provider;
pub mod progress;
pub mod registry;
pub mod rng;
pub mod roster;
pub mod succession;
pub mod types;
