//! Error types
//!
//! Only configuration defects, unreadable high-score tables and scheduler
//! subscriber faults are errors.
//! Rejected kills and placement fallbacks are ordinary outcomes, not errors.

use thiserror::Error;

/// Configuration defects (unknown keys, malformed or inconsistent tuning)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),
    #[error("malformed engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning: {0}")]
    Invalid(String),
}

/// High-score table could not be read or written
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("malformed high score table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure reported by a scheduler callback. Logged by the scheduler, never fatal.
#[derive(Debug, Error)]
pub enum TickError {
    /// The subsystem's state was already borrowed (re-entrant call from an observer)
    #[error("subsystem `{0}` is busy")]
    Busy(&'static str),
    #[error("{0}")]
    Fault(String),
}
