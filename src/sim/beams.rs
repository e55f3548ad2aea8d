//! Laser beam fade-out

use glam::Vec2;
use serde::Serialize;

use super::observe::{ObserverId, Observers};
use crate::heading;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Beam {
    pub id: u64,
    pub start: Vec2,
    pub end: Vec2,
    pub angle: f32,
    /// 1 at creation, fades linearly to 0 over `duration_ms`
    pub intensity: f32,
    pub created_ms: f64,
    pub duration_ms: f64,
}

/// Owner of the live beam list
#[derive(Default)]
pub struct BeamEffect {
    beams: Vec<Beam>,
    next_id: u64,
    now_ms: f64,
    observers: Observers<Beam>,
}

impl BeamEffect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire a beam from `start` along `angle`. Returns its id.
    pub fn fire_beam(&mut self, start: Vec2, angle: f32, length: f32, duration_ms: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.beams.push(Beam {
            id,
            start,
            end: start + heading(angle) * length,
            angle,
            intensity: 1.0,
            created_ms: self.now_ms,
            duration_ms: duration_ms.max(f64::EPSILON),
        });
        id
    }

    pub fn update(&mut self, _delta_ms: f64, total_ms: f64) {
        self.now_ms = total_ms;
        if self.beams.is_empty() {
            return;
        }
        for beam in &mut self.beams {
            let age = total_ms - beam.created_ms;
            beam.intensity = (1.0 - age / beam.duration_ms).max(0.0) as f32;
        }
        self.beams.retain(|b| b.intensity > 0.0);
        self.observers.publish(&self.beams);
    }

    pub fn clear_beams(&mut self) {
        self.beams.clear();
        self.observers.publish(&self.beams);
    }

    /// Observe the beam list; `observer` is called immediately with the current list
    pub fn subscribe_to_beams(&mut self, observer: impl FnMut(&[Beam]) + 'static) -> ObserverId {
        self.observers.add(observer, &self.beams)
    }

    pub fn unsubscribe_from_beams(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }
}
