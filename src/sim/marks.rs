//! Lasting desktop damage: hit marks, kill splats and chainsaw trails

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::observe::{ObserverId, Observers};
use super::particles::random_paint_color;
use super::tool::Tool;
use crate::config::MarksConfig;

/// Decal left by a destroyer-mode hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageMark {
    pub id: u64,
    pub pos: Vec2,
    pub tool: Tool,
    pub created_ms: f64,
    /// Paint color (paintball only)
    pub color: Option<u32>,
}

/// Remains of a killed pest; `variant` picks one of three images
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Splat {
    pub id: u64,
    pub pos: Vec2,
    pub variant: u8,
    pub created_ms: f64,
}

/// Snapshot of an in-progress chainsaw cut
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailEffect {
    pub id: u64,
    pub path: Vec<Vec2>,
    pub created_ms: f64,
}

pub struct DamageMarks {
    cfg: MarksConfig,
    rng: Pcg32,
    next_id: u64,
    marks: Vec<DamageMark>,
    splats: Vec<Splat>,
    trails: Vec<TrailEffect>,
    /// Chainsaw path while the pointer is held
    path: Vec<Vec2>,
    /// Throttle anchor for flamethrower marks
    last_flame: Option<Vec2>,
    observers: Observers<DamageMark>,
    splat_observers: Observers<Splat>,
    trail_observers: Observers<TrailEffect>,
}

impl DamageMarks {
    pub fn new(cfg: MarksConfig, rng: Pcg32) -> Self {
        Self {
            cfg,
            rng,
            next_id: 0,
            marks: Vec::new(),
            splats: Vec::new(),
            trails: Vec::new(),
            path: Vec::new(),
            last_flame: None,
            observers: Observers::default(),
            splat_observers: Observers::default(),
            trail_observers: Observers::default(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Leave a mark for `tool` at `pos`. Chainsaws never mark, and flamethrower marks
    /// closer than `flame_min_spacing` to the previous one are dropped.
    pub fn add_mark(&mut self, pos: Vec2, tool: Tool, now_ms: f64) -> Option<u64> {
        match tool {
            Tool::Chainsaw => return None,
            Tool::Flamethrower => {
                if let Some(last) = self.last_flame {
                    if last.distance(pos) < self.cfg.flame_min_spacing {
                        return None;
                    }
                }
                self.last_flame = Some(pos);
            }
            _ => {}
        }

        let color = (tool == Tool::Paintball).then(|| random_paint_color(&mut self.rng));
        let id = self.next_id();
        self.marks.push(DamageMark {
            id,
            pos,
            tool,
            created_ms: now_ms,
            color,
        });
        self.observers.publish(&self.marks);
        Some(id)
    }

    pub fn add_splat(&mut self, pos: Vec2, now_ms: f64) -> u64 {
        let id = self.next_id();
        let variant = self.rng.random_range(1..=3);
        self.splats.push(Splat {
            id,
            pos,
            variant,
            created_ms: now_ms,
        });
        self.splat_observers.publish(&self.splats);
        id
    }

    pub fn begin_trail(&mut self, pos: Vec2) {
        self.path.clear();
        self.path.push(pos);
    }

    /// Extend the live chainsaw path. Every `trail_stride` points (past the first
    /// stride) the whole path so far is kept as a [`TrailEffect`].
    pub fn extend_trail(&mut self, pos: Vec2, now_ms: f64) -> Option<&TrailEffect> {
        if self.path.is_empty() {
            return None;
        }
        self.path.push(pos);

        let len = self.path.len();
        if len % self.cfg.trail_stride != 0 || len <= self.cfg.trail_stride {
            return None;
        }
        let id = self.next_id();
        self.trails.push(TrailEffect {
            id,
            path: self.path.clone(),
            created_ms: now_ms,
        });
        self.trail_observers.publish(&self.trails);
        self.trails.last()
    }

    pub fn end_trail(&mut self) {
        self.path.clear();
    }

    pub fn is_cutting(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
        self.splats.clear();
        self.trails.clear();
        self.path.clear();
        self.last_flame = None;
        self.observers.publish(&self.marks);
        self.splat_observers.publish(&self.splats);
        self.trail_observers.publish(&self.trails);
    }

    pub fn subscribe_to_marks(
        &mut self,
        observer: impl FnMut(&[DamageMark]) + 'static,
    ) -> ObserverId {
        self.observers.add(observer, &self.marks)
    }

    pub fn unsubscribe_from_marks(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn subscribe_to_splats(&mut self, observer: impl FnMut(&[Splat]) + 'static) -> ObserverId {
        self.splat_observers.add(observer, &self.splats)
    }

    pub fn unsubscribe_from_splats(&mut self, id: ObserverId) -> bool {
        self.splat_observers.remove(id)
    }

    /// Receives every trail snapshot list, oldest first
    pub fn subscribe_to_trails(
        &mut self,
        observer: impl FnMut(&[TrailEffect]) + 'static,
    ) -> ObserverId {
        self.trail_observers.add(observer, &self.trails)
    }

    pub fn unsubscribe_from_trails(&mut self, id: ObserverId) -> bool {
        self.trail_observers.remove(id)
    }

    pub fn marks(&self) -> &[DamageMark] {
        &self.marks
    }

    pub fn splats(&self) -> &[Splat] {
        &self.splats
    }

    pub fn trails(&self) -> &[TrailEffect] {
        &self.trails
    }
}
