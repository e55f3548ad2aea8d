//! High score table
//!
//! Sessions report their final result through [`ScoreSink`] exactly once when they
//! end. `HighScores` keeps the top 10 in memory; remote leaderboards implement the
//! same trait outside this crate.

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;
use crate::sim::session::{SessionMode, SessionResult};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Receiver for finished sessions
pub trait ScoreSink {
    fn record(&mut self, result: &SessionResult);
}

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u32,
    pub mode: SessionMode,
    /// Wave reached
    pub wave: u32,
    pub missed_attempts: u32,
    /// Session length (ms)
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    /// Sorted by score, descending
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score would make the table
    pub fn qualifies(&self, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u32) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a session result. Returns the rank achieved, or None if it didn't qualify.
    pub fn add_result(&mut self, result: &SessionResult) -> Option<usize> {
        let rank = self.potential_rank(result.score)?;
        self.entries.insert(
            rank - 1,
            HighScoreEntry {
                score: result.score,
                mode: result.mode,
                wave: result.wave,
                missed_attempts: result.missed_attempts,
                elapsed_ms: result.elapsed_ms,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }

    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let mut scores: HighScores = serde_json::from_str(json)?;
        scores.entries.sort_by(|a, b| b.score.cmp(&a.score));
        scores.entries.truncate(MAX_HIGH_SCORES);
        Ok(scores)
    }

    pub fn to_json(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ScoreSink for HighScores {
    fn record(&mut self, result: &SessionResult) {
        match self.add_result(result) {
            Some(rank) => log::info!("new high score #{rank}: {}", result.score),
            None => log::debug!("score {} did not place", result.score),
        }
    }
}
