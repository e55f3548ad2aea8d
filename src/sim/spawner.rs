//! Pest placement and swarm difficulty curve

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::Rect;
use super::pests::{Pest, PestId, Species};
use crate::config::{ArenaConfig, EngineConfig, SwarmConfig};

/// Screen edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    pub fn random(rng: &mut impl Rng) -> Edge {
        Edge::ALL[rng.random_range(0..Edge::ALL.len())]
    }

    /// Uniform point along this edge of `rect`
    pub fn point(&self, rect: &Rect, rng: &mut impl Rng) -> Vec2 {
        let max = rect.max();
        match self {
            Edge::Top => Vec2::new(rng.random_range(rect.min.x..=max.x), rect.min.y),
            Edge::Bottom => Vec2::new(rng.random_range(rect.min.x..=max.x), max.y),
            Edge::Left => Vec2::new(rect.min.x, rng.random_range(rect.min.y..=max.y)),
            Edge::Right => Vec2::new(max.x, rng.random_range(rect.min.y..=max.y)),
        }
    }
}

/// Where a new pest appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Anywhere clear of the HUD, away from the screen edge
    Interior,
    /// On a random screen edge, heading inward
    Edge,
}

/// Interior spawn point clear of every HUD exclusion (grown by the safety margin).
///
/// Gives up after `max_attempts` candidates and uses the safe region instead.
/// The second value is `true` when the fallback was taken.
pub fn interior_position(arena: &ArenaConfig, rng: &mut impl Rng) -> (Vec2, bool) {
    let area = arena.bounds().inset(arena.edge_inset);
    let blocked: Vec<Rect> = arena
        .exclusions
        .iter()
        .map(|r| r.expanded(arena.safety_margin))
        .collect();

    for _ in 0..arena.max_attempts {
        let candidate = uniform_point(&area, rng);
        if !blocked.iter().any(|r| r.contains(candidate)) {
            return (candidate, false);
        }
    }

    log::warn!(
        "spawn placement exhausted {} attempts; using safe region",
        arena.max_attempts
    );
    (uniform_point(&arena.safe_region, rng), true)
}

/// Spawn point on a uniformly chosen screen edge
pub fn edge_position(arena: &ArenaConfig, rng: &mut impl Rng) -> (Vec2, Edge) {
    let edge = Edge::random(rng);
    (edge.point(&arena.bounds(), rng), edge)
}

fn uniform_point(rect: &Rect, rng: &mut impl Rng) -> Vec2 {
    let max = rect.max();
    Vec2::new(
        rng.random_range(rect.min.x..=max.x),
        rng.random_range(rect.min.y..=max.y),
    )
}

/// Concurrent pest limit after `elapsed_ms` of swarm play. Non-decreasing, capped.
pub fn max_concurrent(cfg: &SwarmConfig, elapsed_ms: f64) -> u32 {
    let steps = (elapsed_ms.max(0.0) / cfg.concurrency_step_ms).floor() as u32;
    cfg.concurrency_start.saturating_add(steps).min(cfg.concurrency_cap)
}

/// Delay between trickle spawns after `elapsed_ms`. Non-increasing, floored.
pub fn spawn_interval_ms(cfg: &SwarmConfig, elapsed_ms: f64) -> f64 {
    let shrink = cfg.spawn_interval_decay_ms * elapsed_ms.max(0.0) / 1000.0;
    (cfg.spawn_interval_start_ms - shrink).max(cfg.spawn_interval_floor_ms)
}

/// Kills needed to clear `wave` (1-based). Non-decreasing, capped.
pub fn wave_quota(cfg: &SwarmConfig, wave: u32) -> u32 {
    let growth = cfg.wave_quota_growth.saturating_mul(wave.saturating_sub(1));
    cfg.wave_quota_base.saturating_add(growth).min(cfg.wave_quota_cap)
}

/// Pest factory owning the id counter and the placement random stream
pub struct Spawner {
    rng: Pcg32,
    next_id: u64,
    fallbacks: u32,
}

impl Spawner {
    pub fn new(rng: Pcg32) -> Self {
        Self {
            rng,
            next_id: 1,
            fallbacks: 0,
        }
    }

    /// New pest of a uniformly random species
    pub fn spawn(&mut self, placement: Placement, config: &EngineConfig, now_ms: f64) -> Pest {
        let species = Species::random(&mut self.rng);
        self.spawn_species(species, placement, config, now_ms)
    }

    pub fn spawn_species(
        &mut self,
        species: Species,
        placement: Placement,
        config: &EngineConfig,
        now_ms: f64,
    ) -> Pest {
        let pos = match placement {
            Placement::Interior => {
                let (pos, fell_back) = interior_position(&config.arena, &mut self.rng);
                if fell_back {
                    self.fallbacks += 1;
                }
                pos
            }
            Placement::Edge => edge_position(&config.arena, &mut self.rng).0,
        };

        let id = PestId(self.next_id);
        self.next_id += 1;
        let pest = Pest::spawn(
            id,
            species,
            pos,
            config.species.get(species),
            &config.arena.bounds(),
            now_ms,
            &mut self.rng,
        );
        log::debug!("spawned {id} ({species}) at {pos}");
        pest
    }

    /// Placements that had to use the safe region
    pub fn fallbacks(&self) -> u32 {
        self.fallbacks
    }

    /// Random stream shared with pest movement
    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }
}
