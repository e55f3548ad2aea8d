//! Pest species and movement AI
//!
//! Each species belongs to one movement class with its own kinematics. Every class
//! integrates in pixels per second and wraps to the opposite edge on leaving the
//! arena, so live pests are never lost off-screen.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::spawner::Edge;
use super::tool::Tool;
use crate::config::SpeciesProfile;
use crate::error::ConfigError;
use crate::{angle_of, heading};

/// Arrival tolerance for target-seeking classes
const ARRIVE_DIST: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Termite,
    Spider,
    Fly,
    Cockroach,
    Snail,
    Caterpillar,
}

/// Kinematic archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementClass {
    /// Very slow, random heading every `retarget_ms`
    Wander,
    /// Slow straight line toward a target point, rare re-aim
    Cruise,
    /// Seeks points near the screen edges
    EdgeCrawl,
    /// Medium speed with frequent small heading changes
    Jitter,
    /// Loops around a wandering focal point
    Orbit,
    /// Fast straight runs with rare large turns
    Dart,
}

impl Species {
    pub const ALL: [Species; 6] = [
        Species::Termite,
        Species::Spider,
        Species::Fly,
        Species::Cockroach,
        Species::Snail,
        Species::Caterpillar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Termite => "termite",
            Species::Spider => "spider",
            Species::Fly => "fly",
            Species::Cockroach => "cockroach",
            Species::Snail => "snail",
            Species::Caterpillar => "caterpillar",
        }
    }

    /// The only tool that kills this species in strict sessions
    pub fn required_tool(&self) -> Tool {
        match self {
            Species::Snail => Tool::Hammer,
            Species::Fly => Tool::Gun,
            Species::Spider => Tool::Flamethrower,
            Species::Cockroach => Tool::Laser,
            Species::Caterpillar => Tool::Paintball,
            Species::Termite => Tool::Chainsaw,
        }
    }

    pub fn movement(&self) -> MovementClass {
        match self {
            Species::Caterpillar => MovementClass::Wander,
            Species::Snail => MovementClass::Cruise,
            Species::Spider => MovementClass::EdgeCrawl,
            Species::Termite => MovementClass::Jitter,
            Species::Fly => MovementClass::Orbit,
            Species::Cockroach => MovementClass::Dart,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Species {
        Species::ALL[rng.random_range(0..Species::ALL.len())]
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .into_iter()
            .find(|species| species.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownSpecies(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PestId(pub u64);

impl fmt::Display for PestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pest#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pest {
    pub id: PestId,
    pub pos: Vec2,
    pub species: Species,
    /// Pixels per second
    pub vel: Vec2,
    /// Current destination (cruise, edge-crawl) or focal destination (orbit)
    pub target: Vec2,
    /// Pixels per second
    pub speed: f32,
    /// Heading in radians for heading-driven classes
    pub heading: f32,
    pub last_move_ms: f64,
    last_retarget_ms: f64,
    /// Loop center (orbit)
    focal: Vec2,
    /// Loop angle (orbit)
    phase: f32,
}

impl Pest {
    /// New pest at `pos` heading toward a random interior point
    pub fn spawn(
        id: PestId,
        species: Species,
        pos: Vec2,
        profile: &SpeciesProfile,
        bounds: &Rect,
        now_ms: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let speed = rng.random_range(profile.speed_min..=profile.speed_max);
        let target = match species.movement() {
            MovementClass::EdgeCrawl => edge_target(bounds, profile.edge_margin, rng),
            _ => random_point(bounds, rng),
        };
        let heading = angle_of(target - pos);
        Self {
            id,
            pos,
            species,
            vel: crate::heading(heading) * speed,
            target,
            speed,
            heading,
            last_move_ms: now_ms,
            last_retarget_ms: now_ms,
            focal: pos,
            phase: rng.random_range(0.0..TAU),
        }
    }

    pub fn required_tool(&self) -> Tool {
        self.species.required_tool()
    }

    pub fn movement(&self) -> MovementClass {
        self.species.movement()
    }

    /// Advance by `delta_ms` and wrap into `bounds`
    pub fn step(
        &mut self,
        delta_ms: f64,
        now_ms: f64,
        profile: &SpeciesProfile,
        bounds: &Rect,
        rng: &mut impl Rng,
    ) {
        let dt = (delta_ms / 1000.0) as f32;
        let chance = profile.retarget_chance.clamp(0.0, 1.0);

        match self.movement() {
            MovementClass::Wander => {
                if now_ms - self.last_retarget_ms >= profile.retarget_ms {
                    self.heading = rng.random_range(0.0..TAU);
                    self.last_retarget_ms = now_ms;
                }
                self.vel = heading(self.heading) * self.speed;
            }
            MovementClass::Cruise => {
                if self.pos.distance(self.target) <= ARRIVE_DIST || rng.random_bool(chance) {
                    self.target = random_point(bounds, rng);
                }
                self.seek_target();
            }
            MovementClass::EdgeCrawl => {
                if self.pos.distance(self.target) <= ARRIVE_DIST.max(self.speed * dt) {
                    self.target = edge_target(bounds, profile.edge_margin, rng);
                }
                self.seek_target();
            }
            MovementClass::Jitter => {
                if rng.random_bool(chance) && profile.turn > 0.0 {
                    self.heading += rng.random_range(-profile.turn..=profile.turn);
                }
                self.vel = heading(self.heading) * self.speed;
            }
            MovementClass::Dart => {
                if rng.random_bool(chance) {
                    let turn = profile.turn + rng.random_range(0.0..=profile.turn);
                    let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                    self.heading += side * turn;
                }
                self.vel = heading(self.heading) * self.speed;
            }
            MovementClass::Orbit => {
                self.step_orbit(dt, now_ms, profile, bounds, rng);
                self.last_move_ms = now_ms;
                return;
            }
        }

        self.heading = crate::normalize_angle(self.heading);
        self.pos += self.vel * dt;
        wrap_into(&mut self.pos, bounds);
        self.last_move_ms = now_ms;
    }

    fn seek_target(&mut self) {
        let dir = (self.target - self.pos).normalize_or_zero();
        if dir != Vec2::ZERO {
            self.heading = angle_of(dir);
        }
        self.vel = dir * self.speed;
    }

    /// The focal point drifts toward `target` at the pest's speed while the pest
    /// circles it; the focal target is re-drawn on arrival or every `retarget_ms`.
    fn step_orbit(
        &mut self,
        dt: f32,
        now_ms: f64,
        profile: &SpeciesProfile,
        bounds: &Rect,
        rng: &mut impl Rng,
    ) {
        if self.focal.distance(self.target) <= ARRIVE_DIST
            || now_ms - self.last_retarget_ms >= profile.retarget_ms
        {
            self.target = random_point(bounds, rng);
            self.last_retarget_ms = now_ms;
        }
        self.focal += (self.target - self.focal).normalize_or_zero() * self.speed * dt;
        self.phase = (self.phase + profile.orbit_rate * dt) % TAU;

        let prev = self.pos;
        let mut next = self.focal + heading(self.phase) * profile.orbit_radius;
        if !bounds.contains(next) {
            wrap_into(&mut next, bounds);
            self.focal = next - heading(self.phase) * profile.orbit_radius;
        }
        if dt > 0.0 {
            self.vel = (next - prev) / dt;
        }
        self.heading = self.phase + std::f32::consts::FRAC_PI_2;
        self.pos = next;
    }
}

/// Re-enter from the opposite edge when outside `bounds`
pub fn wrap_into(pos: &mut Vec2, bounds: &Rect) {
    let max = bounds.max();
    if pos.x < bounds.min.x {
        pos.x = max.x;
    } else if pos.x > max.x {
        pos.x = bounds.min.x;
    }

    if pos.y < bounds.min.y {
        pos.y = max.y;
    } else if pos.y > max.y {
        pos.y = bounds.min.y;
    }
}

fn random_point(bounds: &Rect, rng: &mut impl Rng) -> Vec2 {
    let max = bounds.max();
    Vec2::new(
        rng.random_range(bounds.min.x..=max.x),
        rng.random_range(bounds.min.y..=max.y),
    )
}

/// Point on a random edge, `margin` in from it
fn edge_target(bounds: &Rect, margin: f32, rng: &mut impl Rng) -> Vec2 {
    Edge::random(rng).point(&bounds.inset(margin), rng)
}
