//! Player tools (weapons)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pests::Species;
use crate::error::ConfigError;

/// Closed set of tools the player can wield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Hammer,
    Gun,
    Flamethrower,
    Laser,
    Paintball,
    Chainsaw,
}

impl Tool {
    /// All tools, in hotkey order
    pub const ALL: [Tool; 6] = [
        Tool::Hammer,
        Tool::Gun,
        Tool::Flamethrower,
        Tool::Laser,
        Tool::Paintball,
        Tool::Chainsaw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Hammer => "hammer",
            Tool::Gun => "gun",
            Tool::Flamethrower => "flamethrower",
            Tool::Laser => "laser",
            Tool::Paintball => "paintball",
            Tool::Chainsaw => "chainsaw",
        }
    }

    /// Number-row hotkeys `1`..`6` select tools in `ALL` order
    pub fn from_hotkey(key: char) -> Option<Tool> {
        let index = key.to_digit(10)?.checked_sub(1)? as usize;
        Tool::ALL.get(index).copied()
    }

    /// The species this tool is required for (inverse of `Species::required_tool`)
    pub fn prey(&self) -> Species {
        match self {
            Tool::Hammer => Species::Snail,
            Tool::Gun => Species::Fly,
            Tool::Flamethrower => Species::Spider,
            Tool::Laser => Species::Cockroach,
            Tool::Paintball => Species::Caterpillar,
            Tool::Chainsaw => Species::Termite,
        }
    }

    /// Tools that keep firing while the pointer is held
    pub fn is_continuous(&self) -> bool {
        matches!(self, Tool::Gun | Tool::Flamethrower)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownTool(s.to_string()))
    }
}
