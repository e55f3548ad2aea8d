//! Desktop Havoc - effects and pest-simulation engine
//!
//! Core modules:
//! - `sim`: Scheduler, particle/beam/animation effects, pests, sessions
//! - `config`: Data-driven tool, species and difficulty tables
//! - `highscores`: End-of-session score sink
//! - `error`: Configuration and scheduler error types
//!
//! Rendering, audio, authentication and raw input capture live outside this crate;
//! the engine only sees normalized pointer coordinates and tool identifiers.

pub mod config;
pub mod error;
pub mod highscores;
pub mod sim;

pub use config::EngineConfig;
pub use error::{ConfigError, ScoreError, TickError};
pub use highscores::{HighScores, ScoreSink};

use glam::Vec2;

/// Engine timing constants
pub mod consts {
    /// Default scheduler cadence
    pub const TARGET_FPS: u32 = 60;
    /// Reference frame length; per-tick physics constants are tuned against it
    pub const REFERENCE_FRAME_MS: f64 = 1000.0 / TARGET_FPS as f64;
    /// Life below this is treated as fully faded (absorbs float drift from repeated subtraction)
    pub const LIFE_EPSILON: f32 = 1e-4;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `angle` (screen space, +y down)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of a direction vector
#[inline]
pub fn angle_of(dir: Vec2) -> f32 {
    dir.y.atan2(dir.x)
}
