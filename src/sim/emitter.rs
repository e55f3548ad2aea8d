//! Continuous fire while the pointer is held
//!
//! Only tools with a `fire_interval_ms` keep firing. The emitter decides *when* and
//! *where* to fire; the engine turns each [`Emission`] into particles and marks.

use glam::Vec2;

use super::tool::Tool;
use crate::config::ToolTable;

/// Throttle state for one held trigger. Owned by the emitter and reset per session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionState {
    pub tool: Option<Tool>,
    pub interval_ms: f64,
    /// Latest pointer position
    pub pointer: Vec2,
    /// Fixed emission point (destroyer-mode flamethrower)
    pub anchor: Option<Vec2>,
    /// `None` until the first tick after the trigger was pulled
    pub last_emit_ms: Option<f64>,
}

/// A due emission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub tool: Tool,
    pub pos: Vec2,
}

#[derive(Debug, Default)]
pub struct ContinuousFire {
    state: EmissionState,
}

impl ContinuousFire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull the trigger. Returns `false` (and does nothing) for single-shot tools.
    pub fn start(&mut self, tool: Tool, pos: Vec2, anchored: bool, tools: &ToolTable) -> bool {
        let Some(interval_ms) = tools.get(tool).fire_interval_ms else {
            return false;
        };
        log::debug!("continuous fire started: {tool} at {pos}");
        self.state = EmissionState {
            tool: Some(tool),
            interval_ms,
            pointer: pos,
            anchor: anchored.then_some(pos),
            last_emit_ms: None,
        };
        true
    }

    pub fn move_to(&mut self, pos: Vec2) {
        self.state.pointer = pos;
    }

    pub fn stop(&mut self) {
        if let Some(tool) = self.state.tool {
            log::debug!("continuous fire stopped: {tool}");
        }
        self.state = EmissionState::default();
    }

    pub fn is_firing(&self) -> bool {
        self.state.tool.is_some()
    }

    pub fn state(&self) -> &EmissionState {
        &self.state
    }

    /// At most one emission per tick. The first tick after `start` only arms the timer.
    pub fn update(&mut self, total_ms: f64) -> Option<Emission> {
        let tool = self.state.tool?;
        let Some(last) = self.state.last_emit_ms else {
            self.state.last_emit_ms = Some(total_ms);
            return None;
        };
        if total_ms - last < self.state.interval_ms {
            return None;
        }
        self.state.last_emit_ms = Some(total_ms);
        Some(Emission {
            tool,
            pos: self.state.anchor.unwrap_or(self.state.pointer),
        })
    }
}
