//! Kill validation and session state machine
//!
//! `NotStarted -> Running -> Ended`, with `Ended` held until an explicit restart.
//! Strict sessions count down and only accept the species' required tool, keeping a
//! fixed number of pests alive. Permissive sessions count up, accept any tool and
//! escalate through waves and a trickle-spawn curve.

use std::cell::RefCell;
use std::rc::Rc;

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::observe::{ObserverId, Observers};
use super::pests::{Pest, PestId, Species};
use super::spawner::{self, Placement, Spawner};
use super::tool::Tool;
use crate::config::EngineConfig;
use crate::highscores::ScoreSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// Countdown, tool must match the species
    Strict,
    /// Endless swarm, any tool kills
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    NotStarted,
    Running,
    Ended,
}

/// Result of [`Session::attempt_kill`]
#[derive(Debug, Clone, PartialEq)]
pub enum KillOutcome {
    /// Pest removed; carries its last state
    Killed(Pest),
    /// Strict mode tool mismatch; counted as a miss
    WrongTool { required: Tool },
    /// No live pest with that id
    NoSuchPest,
    NotRunning,
}

impl KillOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, KillOutcome::Killed(_))
    }
}

/// Domain events for the UI layer, drained with [`Session::drain_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PestSpawned { id: PestId, species: Species },
    PestKilled { id: PestId, species: Species, tool: Tool },
    KillRejected { id: PestId, required: Tool, used: Tool },
    WaveAdvanced { wave: u32, quota: u32 },
    SessionEnded(SessionResult),
}

/// Final tallies handed to the score sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub mode: SessionMode,
    pub score: u32,
    pub wave: u32,
    pub missed_attempts: u32,
    pub elapsed_ms: f64,
}

pub struct Session {
    config: EngineConfig,
    mode: SessionMode,
    phase: SessionPhase,
    score: u32,
    missed_attempts: u32,
    wave: u32,
    wave_kills: u32,
    elapsed_ms: f64,
    last_spawn_ms: f64,
    pests: Vec<Pest>,
    spawner: Spawner,
    events: Vec<SessionEvent>,
    score_sink: Option<Rc<RefCell<dyn ScoreSink>>>,
    observers: Observers<Pest>,
}

impl Session {
    pub fn new(config: EngineConfig, mode: SessionMode, rng: Pcg32) -> Self {
        Self {
            config,
            mode,
            phase: SessionPhase::NotStarted,
            score: 0,
            missed_attempts: 0,
            wave: 1,
            wave_kills: 0,
            elapsed_ms: 0.0,
            last_spawn_ms: 0.0,
            pests: Vec::new(),
            spawner: Spawner::new(rng),
            events: Vec::new(),
            score_sink: None,
            observers: Observers::default(),
        }
    }

    /// Receives the result once when a running session ends
    pub fn set_score_sink(&mut self, sink: Option<Rc<RefCell<dyn ScoreSink>>>) {
        self.score_sink = sink;
    }

    /// Switch variant; resets to `NotStarted`
    pub fn set_mode(&mut self, mode: SessionMode) {
        self.mode = mode;
        self.reset_session();
    }

    /// Start from `NotStarted` or restart from `Ended`. Returns `false` if already running.
    pub fn start_session(&mut self) -> bool {
        if self.phase == SessionPhase::Running {
            log::debug!("start_session ignored: already running");
            return false;
        }
        self.reset_counters();
        self.phase = SessionPhase::Running;
        log::info!("{:?} session started", self.mode);

        match self.mode {
            SessionMode::Strict => {
                let quota = self.config.strict.live_quota;
                self.spawn_many(quota, Placement::Interior);
            }
            SessionMode::Permissive => {
                let quota = spawner::wave_quota(&self.config.swarm, self.wave);
                self.spawn_many(quota, Placement::Edge);
            }
        }
        self.publish();
        true
    }

    /// Freeze the session and report the result. No-op unless running.
    pub fn end_session(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.phase = SessionPhase::Ended;
        self.pests.clear();

        let result = self.result();
        log::info!(
            "{:?} session ended: score {} wave {} misses {}",
            result.mode,
            result.score,
            result.wave,
            result.missed_attempts
        );
        if let Some(sink) = &self.score_sink {
            match sink.try_borrow_mut() {
                Ok(mut sink) => sink.record(&result),
                Err(_) => log::warn!("score sink busy; result dropped"),
            }
        }
        self.events.push(SessionEvent::SessionEnded(result));
        self.publish();
    }

    /// Back to `NotStarted` with zeroed counters and no pests
    pub fn reset_session(&mut self) {
        self.reset_counters();
        self.phase = SessionPhase::NotStarted;
        self.events.clear();
        self.publish();
    }

    fn reset_counters(&mut self) {
        self.score = 0;
        self.missed_attempts = 0;
        self.wave = 1;
        self.wave_kills = 0;
        self.elapsed_ms = 0.0;
        self.last_spawn_ms = 0.0;
        self.pests.clear();
    }

    /// Validate "tool used on pest". Rejections never move, remove or re-time the pest.
    pub fn attempt_kill(&mut self, id: PestId, tool: Tool) -> KillOutcome {
        if self.phase != SessionPhase::Running {
            return KillOutcome::NotRunning;
        }
        let Some(index) = self.pests.iter().position(|p| p.id == id) else {
            return KillOutcome::NoSuchPest;
        };

        let required = self.pests[index].required_tool();
        if self.mode == SessionMode::Strict && tool != required {
            self.missed_attempts += 1;
            log::debug!("{id} rejected: needs {required}, got {tool}");
            self.events.push(SessionEvent::KillRejected {
                id,
                required,
                used: tool,
            });
            return KillOutcome::WrongTool { required };
        }

        let pest = self.pests.remove(index);
        self.score += 1;
        log::debug!("{id} ({}) killed with {tool}", pest.species);
        self.events.push(SessionEvent::PestKilled {
            id,
            species: pest.species,
            tool,
        });

        match self.mode {
            SessionMode::Strict => {
                let quota = self.config.strict.live_quota as usize;
                let missing = quota.saturating_sub(self.pests.len()) as u32;
                self.spawn_many(missing, Placement::Interior);
            }
            SessionMode::Permissive => {
                self.wave_kills += 1;
                if self.wave_kills >= self.wave_quota() {
                    self.advance_wave();
                }
            }
        }
        self.publish();
        KillOutcome::Killed(pest)
    }

    fn advance_wave(&mut self) {
        self.wave += 1;
        self.wave_kills = 0;
        let quota = self.wave_quota();
        log::info!("wave {} (quota {quota})", self.wave);
        self.events.push(SessionEvent::WaveAdvanced {
            wave: self.wave,
            quota,
        });
        self.spawn_many(quota, Placement::Edge);
    }

    /// Advance the clock. Strict sessions end at zero; permissive sessions move pests
    /// and trickle-spawn along the difficulty curve.
    pub fn tick(&mut self, delta_ms: f64) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.elapsed_ms += delta_ms;

        match self.mode {
            SessionMode::Strict => {
                if self.elapsed_ms >= self.config.strict.duration_ms {
                    self.elapsed_ms = self.config.strict.duration_ms;
                    self.end_session();
                }
            }
            SessionMode::Permissive => {
                let bounds = self.config.arena.bounds();
                let now = self.elapsed_ms;
                for pest in &mut self.pests {
                    let profile = self.config.species.get(pest.species);
                    pest.step(delta_ms, now, profile, &bounds, self.spawner.rng());
                }

                let swarm = &self.config.swarm;
                let due = now - self.last_spawn_ms >= spawner::spawn_interval_ms(swarm, now);
                let room = (self.pests.len() as u32) < spawner::max_concurrent(swarm, now);
                if due && room {
                    self.last_spawn_ms = now;
                    self.spawn_many(1, Placement::Edge);
                }
                self.publish();
            }
        }
    }

    fn spawn_many(&mut self, count: u32, placement: Placement) {
        for _ in 0..count {
            let pest = self.spawner.spawn(placement, &self.config, self.elapsed_ms);
            self.events.push(SessionEvent::PestSpawned {
                id: pest.id,
                species: pest.species,
            });
            self.pests.push(pest);
        }
    }

    fn publish(&mut self) {
        self.observers.publish(&self.pests);
    }

    pub fn result(&self) -> SessionResult {
        SessionResult {
            mode: self.mode,
            score: self.score,
            wave: self.wave,
            missed_attempts: self.missed_attempts,
            elapsed_ms: self.elapsed_ms,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Observe the live pest list; `observer` is called immediately with the current list
    pub fn subscribe_to_pests(
        &mut self,
        observer: impl FnMut(&[Pest]) + 'static,
    ) -> ObserverId {
        self.observers.add(observer, &self.pests)
    }

    pub fn unsubscribe_from_pests(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn pests(&self) -> &[Pest] {
        &self.pests
    }

    pub fn pest(&self, id: PestId) -> Option<&Pest> {
        self.pests.iter().find(|p| p.id == id)
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn missed_attempts(&self) -> u32 {
        self.missed_attempts
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn wave_kills(&self) -> u32 {
        self.wave_kills
    }

    /// Kills needed to clear the current wave
    pub fn wave_quota(&self) -> u32 {
        spawner::wave_quota(&self.config.swarm, self.wave)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Countdown remaining (strict only)
    pub fn time_remaining_ms(&self) -> Option<f64> {
        match self.mode {
            SessionMode::Strict => {
                Some((self.config.strict.duration_ms - self.elapsed_ms).max(0.0))
            }
            SessionMode::Permissive => None,
        }
    }

    /// Countdown in whole seconds, rounded up
    pub fn time_remaining_secs(&self) -> Option<u32> {
        self.time_remaining_ms().map(|ms| (ms / 1000.0).ceil() as u32)
    }

    /// Spawn placements that fell back to the safe region
    pub fn placement_fallbacks(&self) -> u32 {
        self.spawner.fallbacks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;
    use crate::highscores::HighScores;
    use rand::SeedableRng;

    fn session(mode: SessionMode) -> Session {
        Session::new(EngineConfig::default(), mode, Pcg32::seed_from_u64(42))
    }

    fn wrong_tool_for(pest: &Pest) -> Tool {
        Tool::ALL
            .into_iter()
            .find(|t| *t != pest.required_tool())
            .unwrap()
    }

    #[test]
    fn test_phase_transitions() {
        let mut s = session(SessionMode::Strict);
        assert_eq!(s.phase(), SessionPhase::NotStarted);
        assert!(s.start_session());
        assert!(!s.start_session());
        s.end_session();
        assert_eq!(s.phase(), SessionPhase::Ended);
        assert!(s.pests().is_empty());
        assert!(s.start_session());
        assert_eq!(s.phase(), SessionPhase::Running);
        s.reset_session();
        assert_eq!(s.phase(), SessionPhase::NotStarted);
    }

    #[test]
    fn test_kills_ignored_unless_running() {
        let mut s = session(SessionMode::Strict);
        assert_eq!(s.attempt_kill(PestId(1), Tool::Hammer), KillOutcome::NotRunning);
        assert_eq!(s.missed_attempts(), 0);
    }

    #[test]
    fn test_strict_wrong_tool_changes_nothing_but_misses() {
        let mut s = session(SessionMode::Strict);
        s.start_session();
        let before = s.pests()[0].clone();
        let outcome = s.attempt_kill(before.id, wrong_tool_for(&before));

        assert_eq!(
            outcome,
            KillOutcome::WrongTool {
                required: before.required_tool()
            }
        );
        assert_eq!(s.missed_attempts(), 1);
        assert_eq!(s.score(), 0);
        assert_eq!(s.pests().len(), 1);
        assert_eq!(s.pests()[0], before);
        assert_eq!(s.time_remaining_secs(), Some(30));
    }

    #[test]
    fn test_strict_three_kills_in_a_row() {
        let mut s = session(SessionMode::Strict);
        s.start_session();
        for expected in 1..=3 {
            let pest = s.pests()[0].clone();
            assert!(s.attempt_kill(pest.id, pest.required_tool()).is_accepted());
            assert_eq!(s.score(), expected);
            assert_eq!(s.pests().len(), 1);
            assert_ne!(s.pests()[0].id, pest.id);
        }
        assert_eq!(s.missed_attempts(), 0);
    }

    #[test]
    fn test_strict_quota_respected_on_replacement() {
        let mut config = EngineConfig::default();
        config.strict.live_quota = 3;
        let mut s = Session::new(config, SessionMode::Strict, Pcg32::seed_from_u64(1));
        s.start_session();
        assert_eq!(s.pests().len(), 3);
        let pest = s.pests()[1].clone();
        s.attempt_kill(pest.id, pest.required_tool());
        assert_eq!(s.pests().len(), 3);
        assert!(s.pest(pest.id).is_none());
    }

    #[test]
    fn test_strict_countdown_ends_at_zero() {
        let mut s = session(SessionMode::Strict);
        s.start_session();
        s.tick(14_500.0);
        assert_eq!(s.time_remaining_secs(), Some(16));
        s.tick(15_499.0);
        assert_eq!(s.time_remaining_secs(), Some(1));
        assert!(s.is_running());
        s.tick(10.0);
        assert_eq!(s.phase(), SessionPhase::Ended);
        assert_eq!(s.time_remaining_ms(), Some(0.0));
        assert!(s.pests().is_empty());

        // Frozen once ended
        s.tick(1000.0);
        assert_eq!(s.elapsed_ms(), 30_000.0);
    }

    #[test]
    fn test_strict_pests_stay_put() {
        let mut s = session(SessionMode::Strict);
        s.start_session();
        let before = s.pests()[0].pos;
        s.tick(500.0);
        assert_eq!(s.pests()[0].pos, before);
    }

    #[test]
    fn test_permissive_accepts_any_tool() {
        let mut s = session(SessionMode::Permissive);
        s.start_session();
        let pest = s.pests()[0].clone();
        let outcome = s.attempt_kill(pest.id, wrong_tool_for(&pest));
        assert!(outcome.is_accepted());
        assert_eq!(s.score(), 1);
        assert_eq!(s.missed_attempts(), 0);
        assert!(s.pest(pest.id).is_none());
    }

    #[test]
    fn test_wave_advances_exactly_at_quota() {
        let mut s = session(SessionMode::Permissive);
        s.start_session();
        let first_quota = s.wave_quota();
        assert_eq!(s.pests().len() as u32, first_quota);
        s.drain_events();

        for killed in 1..=first_quota {
            let pest = s.pests()[0].clone();
            s.attempt_kill(pest.id, Tool::Hammer);
            if killed < first_quota {
                assert_eq!(s.wave(), 1);
                assert_eq!(s.wave_kills(), killed);
            }
        }
        assert_eq!(s.wave(), 2);
        assert_eq!(s.wave_kills(), 0);

        let next_quota = spawner::wave_quota(&SwarmConfig::default(), 2);
        assert_eq!(s.wave_quota(), next_quota);
        assert!(next_quota >= first_quota);
        assert_eq!(s.pests().len() as u32, next_quota);

        let events = s.drain_events();
        assert!(events.contains(&SessionEvent::WaveAdvanced {
            wave: 2,
            quota: next_quota
        }));
        let spawned = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::PestSpawned { .. }))
            .count();
        assert_eq!(spawned as u32, next_quota);
    }

    #[test]
    fn test_permissive_trickle_spawns_respect_cap() {
        let mut config = EngineConfig::default();
        config.swarm.wave_quota_base = 1;
        config.swarm.concurrency_start = 3;
        config.swarm.concurrency_cap = 3;
        let mut s = Session::new(config, SessionMode::Permissive, Pcg32::seed_from_u64(8));
        s.start_session();
        assert_eq!(s.pests().len(), 1);

        for _ in 0..600 {
            s.tick(100.0);
            assert!(s.pests().len() <= 3);
        }
        assert_eq!(s.pests().len(), 3);
        assert!(s.is_running());
        assert_eq!(s.time_remaining_ms(), None);
    }

    #[test]
    fn test_permissive_pests_move() {
        let mut s = session(SessionMode::Permissive);
        s.start_session();
        let before: Vec<_> = s.pests().iter().map(|p| p.pos).collect();
        s.tick(100.0);
        let moved = s
            .pests()
            .iter()
            .zip(&before)
            .filter(|(p, pos)| p.pos != **pos)
            .count();
        assert!(moved > 0);
    }

    #[test]
    fn test_end_reports_once_to_score_sink() {
        let scores = Rc::new(RefCell::new(HighScores::new()));
        let sink: Rc<RefCell<dyn ScoreSink>> = scores.clone();
        let mut s = session(SessionMode::Strict);
        s.set_score_sink(Some(sink));
        s.start_session();
        let pest = s.pests()[0].clone();
        s.attempt_kill(pest.id, pest.required_tool());
        s.tick(30_000.0);
        s.end_session();

        assert_eq!(scores.borrow().entries.len(), 1);
        assert_eq!(scores.borrow().top_score(), Some(1));
        let ended = s
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::SessionEnded(_)))
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_pest_observer_tracks_kills() {
        let mut s = session(SessionMode::Strict);
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&counts);
        s.subscribe_to_pests(move |pests| sink.borrow_mut().push(pests.len()));
        s.start_session();
        s.end_session();
        assert_eq!(*counts.borrow(), [0, 1, 0]);
    }
}
