//! `tally-recon` — Rule-driven transaction matching engine.
//!
//! Pure engine crate: receives pre-loaded tables and a matching config,
//! returns matched pairs with confidence scores plus the residual unmatched
//! records. No CLI, no file IO beyond CSV decoding of in-memory data.

pub mod anomaly;
pub mod assign;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod rule;
pub mod score;
pub mod similarity;

pub use config::MatchConfig;
pub use engine::{run, RunReport};
pub use error::ReconError;
pub use model::{MatchResult, ReconResult, SourceId, Table, Transaction};
