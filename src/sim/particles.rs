//! Particle physics
//!
//! The particle system owns the only mutable particle list. Each tick it moves
//! particles along their heading, adds per-tool gravity, fades them by the per-tool
//! decay rate and drops any that are fully faded or past their batch timeout.
//! Observers see a read-only snapshot after every tick that changed the list.

use std::ops::RangeInclusive;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::observe::{ObserverId, Observers};
use super::tool::Tool;
use crate::config::ToolTable;
use crate::consts::{LIFE_EPSILON, REFERENCE_FRAME_MS};
use crate::heading;

/// Paint splash palette (0xRRGGBB)
pub const PAINT_COLORS: [u32; 15] = [
    0xFF6B6B, 0x4ECDC4, 0x45B7D1, 0x96CEB4, 0xFFEAA7, 0xDDA0DD, 0x98D8C8, 0xF7DC6F, 0xBB8FCE,
    0x85C1E9, 0xF8C471, 0x82E0AA, 0xF1948A, 0x85C1E9, 0xD7BDE2,
];

pub fn random_paint_color(rng: &mut impl Rng) -> u32 {
    PAINT_COLORS[rng.random_range(0..PAINT_COLORS.len())]
}

/// What a particle looks like; only paint carries color and size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Glass shards (hammer)
    Shard,
    /// Muzzle sparks (gun)
    Spark,
    Flame,
    /// Laser glints
    Glint,
    Paint { color: u32, size: f32 },
    /// Chainsaw sawdust
    Dust,
}

impl ParticleKind {
    pub fn for_tool(tool: Tool, rng: &mut impl Rng) -> Self {
        match tool {
            Tool::Hammer => ParticleKind::Shard,
            Tool::Gun => ParticleKind::Spark,
            Tool::Flamethrower => ParticleKind::Flame,
            Tool::Laser => ParticleKind::Glint,
            Tool::Paintball => ParticleKind::Paint {
                color: random_paint_color(rng),
                size: rng.random_range(4.0..=12.0),
            },
            Tool::Chainsaw => ParticleKind::Dust,
        }
    }

    /// Tool whose physics table drives this particle
    pub fn tool(&self) -> Tool {
        match self {
            ParticleKind::Shard => Tool::Hammer,
            ParticleKind::Spark => Tool::Gun,
            ParticleKind::Flame => Tool::Flamethrower,
            ParticleKind::Glint => Tool::Laser,
            ParticleKind::Paint { .. } => Tool::Paintball,
            ParticleKind::Dust => Tool::Chainsaw,
        }
    }
}

/// A particle before it has been given an id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpec {
    pub pos: Vec2,
    /// Heading in radians
    pub angle: f32,
    /// Pixels per reference frame
    pub speed: f32,
    pub life: f32,
    pub kind: ParticleKind,
}

impl ParticleSpec {
    /// `count` particles fanned evenly around `pos`, each angle jittered by up to
    /// `spread / 2` and given a random speed from `speed`
    pub fn burst(
        pos: Vec2,
        tool: Tool,
        count: u32,
        speed: RangeInclusive<f32>,
        spread: f32,
        rng: &mut impl Rng,
    ) -> Vec<ParticleSpec> {
        (0..count)
            .map(|i| {
                let base = std::f32::consts::TAU * i as f32 / count as f32;
                let jitter = if spread > 0.0 {
                    (rng.random::<f32>() - 0.5) * spread
                } else {
                    0.0
                };
                ParticleSpec {
                    pos,
                    angle: base + jitter,
                    speed: rng.random_range(speed.clone()),
                    life: 1.0,
                    kind: ParticleKind::for_tool(tool, rng),
                }
            })
            .collect()
    }
}

/// A live particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    pub id: u64,
    pub pos: Vec2,
    pub angle: f32,
    pub speed: f32,
    /// 1 = fresh, 0 = gone
    pub life: f32,
    pub kind: ParticleKind,
    /// Batch timeout (scheduler time)
    pub expires_ms: f64,
}

impl Particle {
    pub fn tool(&self) -> Tool {
        self.kind.tool()
    }
}

/// Owner of the live particle list
pub struct ParticleSystem {
    particles: Vec<Particle>,
    next_id: u64,
    tools: ToolTable,
    /// Scheduler time of the last update
    now_ms: f64,
    observers: Observers<Particle>,
}

impl ParticleSystem {
    pub fn new(tools: ToolTable) -> Self {
        Self {
            particles: Vec::new(),
            next_id: 0,
            tools,
            now_ms: 0.0,
            observers: Observers::default(),
        }
    }

    /// Assign ids and append. Each particle expires after its tool's timeout.
    pub fn add_particles(&mut self, batch: impl IntoIterator<Item = ParticleSpec>) {
        for spec in batch {
            let timeout = self.tools.get(spec.kind.tool()).particle_timeout_ms;
            self.particles.push(Particle {
                id: self.next_id,
                pos: spec.pos,
                angle: spec.angle,
                speed: spec.speed,
                life: spec.life.clamp(0.0, 1.0),
                kind: spec.kind,
                expires_ms: self.now_ms + timeout,
            });
            self.next_id += 1;
        }
    }

    /// Advance one tick
    pub fn update(&mut self, delta_ms: f64, total_ms: f64) {
        self.now_ms = total_ms;
        if self.particles.is_empty() {
            return;
        }

        let frames = (delta_ms / REFERENCE_FRAME_MS) as f32;
        for p in &mut self.particles {
            let profile = self.tools.get(p.kind.tool());
            p.pos += heading(p.angle) * p.speed * frames;
            p.pos.y += profile.gravity_per_tick * frames;
            p.life = (p.life - profile.decay_per_tick).max(0.0);
            if p.life < LIFE_EPSILON {
                p.life = 0.0;
            }
        }
        self.particles
            .retain(|p| p.life > 0.0 && total_ms < p.expires_ms);

        self.observers.publish(&self.particles);
    }

    /// Drop every particle and publish the empty list
    pub fn clear_particles(&mut self) {
        self.particles.clear();
        self.observers.publish(&self.particles);
    }

    /// Observe the particle list; `observer` is called immediately with the current list
    pub fn subscribe_to_particles(
        &mut self,
        observer: impl FnMut(&[Particle]) + 'static,
    ) -> ObserverId {
        self.observers.add(observer, &self.particles)
    }

    pub fn unsubscribe_from_particles(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn count(&self) -> usize {
        self.particles.len()
    }
}
