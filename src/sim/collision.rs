//! Hit testing between weapon strikes and pests
//!
//! Pests are small and move every frame while clicks are sampled once, so a pure
//! box test misses strikes the player sees as hits. Resolution is two-tier:
//! exact AABB overlap first, then a center-to-center distance check against a
//! generous fallback radius before declaring a miss.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::tool::Tool;
use crate::config::{CollisionTuning, ToolTable};

/// Axis-aligned rectangle, origin at top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    /// Rectangle of `size` centered on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - size / 2.0,
            size,
        }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size / 2.0
    }

    /// Strict overlap; rectangles that only share an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max().x
            && self.max().x > other.min.x
            && self.min.y < other.max().y
            && self.max().y > other.min.y
    }

    /// Inclusive point containment
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max().x
            && point.y >= self.min.y
            && point.y <= self.max().y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.min) && self.contains(other.max())
    }

    /// Grow by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Rect {
        Rect {
            min: self.min - Vec2::splat(margin),
            size: self.size + Vec2::splat(2.0 * margin),
        }
    }

    /// Shrink by `inset` on every side (never below zero size)
    pub fn inset(&self, inset: f32) -> Rect {
        let size = (self.size - Vec2::splat(2.0 * inset)).max(Vec2::ZERO);
        Rect {
            min: self.min + Vec2::splat(inset),
            size,
        }
    }
}

/// How a strike connected with a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    /// Weapon box overlaps the target box
    Exact,
    /// Boxes missed but the centers are within the fallback radius
    Fallback,
    Miss,
}

impl HitTier {
    pub fn is_hit(&self) -> bool {
        !matches!(self, HitTier::Miss)
    }
}

/// Weapon hitbox for a strike at `pos`; size comes from the tool table
pub fn weapon_hitbox(pos: Vec2, tool: Tool, tools: &ToolTable) -> Rect {
    Rect::centered(pos, tools.get(tool).hitbox)
}

/// Exact tier: AABB test against a fixed-size target box centered on `target`
pub fn overlaps_target(hitbox: &Rect, target: Vec2, tuning: &CollisionTuning) -> bool {
    hitbox.overlaps(&Rect::centered(target, tuning.target_size))
}

/// Fallback tier: strike center within the fallback radius of the target
pub fn within_fallback(hitbox: &Rect, target: Vec2, tuning: &CollisionTuning) -> bool {
    hitbox.center().distance(target) <= tuning.fallback_radius
}

/// Full two-tier resolution for a single target
pub fn resolve_hit(hitbox: &Rect, target: Vec2, tuning: &CollisionTuning) -> HitTier {
    if overlaps_target(hitbox, target, tuning) {
        HitTier::Exact
    } else if within_fallback(hitbox, target, tuning) {
        HitTier::Fallback
    } else {
        HitTier::Miss
    }
}

/// Whether a strike with `hitbox` connects with `target` under either tier
pub fn intersects(hitbox: &Rect, target: Vec2, tuning: &CollisionTuning) -> bool {
    resolve_hit(hitbox, target, tuning).is_hit()
}

/// Pick the struck target among `targets`.
///
/// Every target is tried with the exact tier before any target is tried with the
/// fallback tier, so an exact hit on one pest always beats a near miss on another.
/// Within a tier the first match in iteration order wins.
pub fn find_target<K: Copy>(
    hitbox: &Rect,
    targets: impl IntoIterator<Item = (K, Vec2)> + Clone,
    tuning: &CollisionTuning,
) -> Option<(K, HitTier)> {
    targets
        .clone()
        .into_iter()
        .find(|&(_, pos)| overlaps_target(hitbox, pos, tuning))
        .map(|(key, _)| (key, HitTier::Exact))
        .or_else(|| {
            targets
                .into_iter()
                .find(|&(_, pos)| within_fallback(hitbox, pos, tuning))
                .map(|(key, _)| (key, HitTier::Fallback))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tuning() -> CollisionTuning {
        CollisionTuning::default()
    }

    #[test]
    fn test_hitbox_is_centered_and_sized_per_tool() {
        let tools = ToolTable::default();
        let pos = Vec2::new(100.0, 200.0);
        let paint = weapon_hitbox(pos, Tool::Paintball, &tools);
        let gun = weapon_hitbox(pos, Tool::Gun, &tools);
        assert_eq!(paint.center(), pos);
        assert_eq!(gun.center(), pos);
        assert_eq!(paint.size, Vec2::new(80.0, 80.0));
        assert!(paint.size.x > gun.size.x * 2.0);
    }

    #[test]
    fn test_target_at_center_hits_exactly() {
        let hitbox = weapon_hitbox(Vec2::new(50.0, 50.0), Tool::Gun, &ToolTable::default());
        assert!(intersects(&hitbox, Vec2::new(50.0, 50.0), &tuning()));
        assert_eq!(
            resolve_hit(&hitbox, Vec2::new(50.0, 50.0), &tuning()),
            HitTier::Exact
        );
    }

    #[test]
    fn test_just_outside_box_uses_fallback() {
        // Gun box half-extent 15 + target half-extent 15: boxes touch at dx = 30
        let hitbox = weapon_hitbox(Vec2::ZERO, Tool::Gun, &ToolTable::default());
        let target = Vec2::new(32.0, 0.0);
        assert!(!overlaps_target(&hitbox, target, &tuning()));
        assert!(intersects(&hitbox, target, &tuning()));
        assert_eq!(resolve_hit(&hitbox, target, &tuning()), HitTier::Fallback);
    }

    #[test]
    fn test_far_target_misses() {
        let hitbox = weapon_hitbox(Vec2::ZERO, Tool::Gun, &ToolTable::default());
        let target = Vec2::new(200.0, -150.0);
        assert_eq!(resolve_hit(&hitbox, target, &tuning()), HitTier::Miss);
        assert!(!intersects(&hitbox, target, &tuning()));
    }

    #[test]
    fn test_laser_box_is_thin() {
        let hitbox = weapon_hitbox(Vec2::ZERO, Tool::Laser, &ToolTable::default());
        // Directly below by 25: laser half-height 5 + target 15 = 20 < 25
        assert!(!overlaps_target(&hitbox, Vec2::new(0.0, 25.0), &tuning()));
        // Still caught by the fallback radius
        assert!(within_fallback(&hitbox, Vec2::new(0.0, 25.0), &tuning()));
    }

    #[test]
    fn test_find_target_prefers_exact_over_earlier_fallback() {
        let hitbox = weapon_hitbox(Vec2::ZERO, Tool::Gun, &ToolTable::default());
        let targets = [(1u64, Vec2::new(0.0, 32.0)), (2u64, Vec2::new(10.0, 10.0))];
        let hit = find_target(&hitbox, targets, &tuning());
        assert_eq!(hit, Some((2, HitTier::Exact)));
    }

    #[test]
    fn test_find_target_fallback_and_miss() {
        let hitbox = weapon_hitbox(Vec2::ZERO, Tool::Gun, &ToolTable::default());
        let near = [(7u64, Vec2::new(0.0, 33.0))];
        assert_eq!(
            find_target(&hitbox, near, &tuning()),
            Some((7, HitTier::Fallback))
        );
        let far = [(7u64, Vec2::new(0.0, 300.0))];
        assert_eq!(find_target(&hitbox, far, &tuning()), None);
    }

    #[test]
    fn test_rect_helpers() {
        let rect = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0));
        assert!(rect.contains(Vec2::new(30.0, 30.0)));
        assert!(!rect.contains(Vec2::new(31.0, 30.0)));
        let grown = rect.expanded(5.0);
        assert_eq!(grown.min, Vec2::new(5.0, 5.0));
        assert_eq!(grown.max(), Vec2::new(35.0, 35.0));
        assert_eq!(rect.inset(15.0).size, Vec2::ZERO);
        assert!(grown.contains_rect(&rect));
    }

    proptest! {
        #[test]
        fn prop_fallback_never_shrinks_hits(
            px in -500.0f32..500.0, py in -500.0f32..500.0,
            tx in -500.0f32..500.0, ty in -500.0f32..500.0,
            tool_idx in 0usize..6,
        ) {
            let tools = ToolTable::default();
            let hitbox = weapon_hitbox(Vec2::new(px, py), Tool::ALL[tool_idx], &tools);
            let target = Vec2::new(tx, ty);
            let tier = resolve_hit(&hitbox, target, &tuning());
            if overlaps_target(&hitbox, target, &tuning()) {
                prop_assert_eq!(tier, HitTier::Exact);
            }
            prop_assert_eq!(intersects(&hitbox, target, &tuning()), tier.is_hit());
            if hitbox.center().distance(target) <= tuning().fallback_radius {
                prop_assert!(tier.is_hit());
            }
        }
    }
}
