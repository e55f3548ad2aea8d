//! Engine configuration
//!
//! Static lookup tables keyed by tool and species, plus arena and difficulty tuning.
//! Tables are structs with one field per enum variant and are read through an
//! exhaustive `match`, so a new tool or species without an entry fails to build.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::TARGET_FPS;
use crate::error::ConfigError;
use crate::sim::collision::Rect;
use crate::sim::pests::Species;
use crate::sim::tool::Tool;

/// Per-tool physics, hitbox and animation constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProfile {
    /// Weapon hitbox (width, height), centered on the pointer
    pub hitbox: Vec2,
    /// Particles emitted by a single shot
    pub burst_particles: u32,
    /// Particle speed range, pixels per reference frame
    pub speed_min: f32,
    pub speed_max: f32,
    /// Random angular jitter applied to evenly spaced burst angles (radians)
    pub spread: f32,
    /// Life lost per processed tick
    pub decay_per_tick: f32,
    /// Downward drift per reference frame (pixels)
    pub gravity_per_tick: f32,
    /// Hard lifetime cap for a particle batch
    pub particle_timeout_ms: f64,
    /// Weapon animation frame interval
    pub frame_interval_ms: f64,
    /// Emission cadence while the pointer is held (continuous tools only)
    pub fire_interval_ms: Option<f64>,
    /// Particles per continuous emission
    pub fire_particles: u32,
}

impl ToolProfile {
    fn single_shot(hitbox: Vec2, frame_interval_ms: f64) -> Self {
        Self {
            hitbox,
            burst_particles: 8,
            speed_min: 2.0,
            speed_max: 7.0,
            spread: 0.5,
            decay_per_tick: 0.02,
            gravity_per_tick: 1.0,
            particle_timeout_ms: 2000.0,
            frame_interval_ms,
            fire_interval_ms: None,
            fire_particles: 0,
        }
    }
}

/// One `ToolProfile` per tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolTable {
    pub hammer: ToolProfile,
    pub gun: ToolProfile,
    pub flamethrower: ToolProfile,
    pub laser: ToolProfile,
    pub paintball: ToolProfile,
    pub chainsaw: ToolProfile,
}

impl ToolTable {
    pub fn get(&self, tool: Tool) -> &ToolProfile {
        match tool {
            Tool::Hammer => &self.hammer,
            Tool::Gun => &self.gun,
            Tool::Flamethrower => &self.flamethrower,
            Tool::Laser => &self.laser,
            Tool::Paintball => &self.paintball,
            Tool::Chainsaw => &self.chainsaw,
        }
    }

    pub fn get_mut(&mut self, tool: Tool) -> &mut ToolProfile {
        match tool {
            Tool::Hammer => &mut self.hammer,
            Tool::Gun => &mut self.gun,
            Tool::Flamethrower => &mut self.flamethrower,
            Tool::Laser => &mut self.laser,
            Tool::Paintball => &mut self.paintball,
            Tool::Chainsaw => &mut self.chainsaw,
        }
    }
}

impl Default for ToolTable {
    fn default() -> Self {
        Self {
            hammer: ToolProfile::single_shot(Vec2::new(40.0, 40.0), 150.0),
            gun: ToolProfile {
                fire_interval_ms: Some(100.0),
                fire_particles: 6,
                ..ToolProfile::single_shot(Vec2::new(30.0, 30.0), 100.0)
            },
            // Flames linger: slow fade, long timeout
            flamethrower: ToolProfile {
                decay_per_tick: 0.005,
                particle_timeout_ms: 3000.0,
                fire_interval_ms: Some(1000.0 / 15.0),
                fire_particles: 8,
                ..ToolProfile::single_shot(Vec2::new(60.0, 60.0), 200.0)
            },
            laser: ToolProfile::single_shot(Vec2::new(50.0, 10.0), 120.0),
            paintball: ToolProfile {
                decay_per_tick: 0.8 / TARGET_FPS as f32,
                gravity_per_tick: 0.5,
                particle_timeout_ms: 2500.0,
                ..ToolProfile::single_shot(Vec2::new(80.0, 80.0), 180.0)
            },
            chainsaw: ToolProfile::single_shot(Vec2::new(50.0, 50.0), 100.0),
        }
    }
}

/// Hit-test tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionTuning {
    /// Pest hitbox (width, height), centered on the pest
    pub target_size: Vec2,
    /// Center-to-center distance accepted after the exact box test fails
    pub fallback_radius: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            target_size: Vec2::new(30.0, 30.0),
            fallback_radius: 35.0,
        }
    }
}

/// Laser beam tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamTuning {
    pub length: f32,
    pub destroyer_duration_ms: f64,
    pub pest_duration_ms: f64,
}

impl Default for BeamTuning {
    fn default() -> Self {
        Self {
            length: 200.0,
            destroyer_duration_ms: 300.0,
            pest_duration_ms: 200.0,
        }
    }
}

/// Per-species kinematic constants. Each movement class reads the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Speed range, pixels per second
    pub speed_min: f32,
    pub speed_max: f32,
    /// Periodic heading change / focal drift interval (wander, orbit)
    pub retarget_ms: f64,
    /// Per-tick probability of re-aiming or turning (cruise, jitter, dart)
    pub retarget_chance: f64,
    /// Turn magnitude in radians (jitter: max small turn, dart: min large turn)
    pub turn: f32,
    /// Loop radius around the focal point (orbit)
    pub orbit_radius: f32,
    /// Loop angular speed, radians per second (orbit)
    pub orbit_rate: f32,
    /// Distance from the screen edge that edge-crawlers aim for
    pub edge_margin: f32,
}

impl Default for SpeciesProfile {
    fn default() -> Self {
        Self {
            speed_min: 40.0,
            speed_max: 60.0,
            retarget_ms: 1000.0,
            retarget_chance: 0.0,
            turn: 0.0,
            orbit_radius: 0.0,
            orbit_rate: 0.0,
            edge_margin: 40.0,
        }
    }
}

/// One `SpeciesProfile` per species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesTable {
    pub termite: SpeciesProfile,
    pub spider: SpeciesProfile,
    pub fly: SpeciesProfile,
    pub cockroach: SpeciesProfile,
    pub snail: SpeciesProfile,
    pub caterpillar: SpeciesProfile,
}

impl SpeciesTable {
    pub fn get(&self, species: Species) -> &SpeciesProfile {
        match species {
            Species::Termite => &self.termite,
            Species::Spider => &self.spider,
            Species::Fly => &self.fly,
            Species::Cockroach => &self.cockroach,
            Species::Snail => &self.snail,
            Species::Caterpillar => &self.caterpillar,
        }
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self {
            // Erratic, medium speed
            termite: SpeciesProfile {
                speed_min: 70.0,
                speed_max: 100.0,
                retarget_chance: 0.25,
                turn: 0.6,
                ..Default::default()
            },
            // Edge-hugging
            spider: SpeciesProfile {
                speed_min: 60.0,
                speed_max: 90.0,
                edge_margin: 40.0,
                ..Default::default()
            },
            // Fast loops around a wandering focal point
            fly: SpeciesProfile {
                speed_min: 50.0,
                speed_max: 80.0,
                retarget_ms: 800.0,
                orbit_radius: 40.0,
                orbit_rate: 6.0,
                ..Default::default()
            },
            // Fast darting, infrequent large turns
            cockroach: SpeciesProfile {
                speed_min: 220.0,
                speed_max: 300.0,
                retarget_chance: 0.01,
                turn: std::f32::consts::FRAC_PI_2,
                ..Default::default()
            },
            // Slow, straight line, rare re-aim
            snail: SpeciesProfile {
                speed_min: 15.0,
                speed_max: 25.0,
                retarget_chance: 0.002,
                ..Default::default()
            },
            // Very slow, periodic random heading
            caterpillar: SpeciesProfile {
                speed_min: 12.0,
                speed_max: 20.0,
                retarget_ms: 1200.0,
                ..Default::default()
            },
        }
    }
}

/// Playable area and spawn placement rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Playable area, origin at top-left
    pub size: Vec2,
    /// HUD overlays pests must not spawn under
    pub exclusions: Vec<Rect>,
    /// Extra clearance around each exclusion
    pub safety_margin: f32,
    /// Interior spawns keep this far from the screen edge
    pub edge_inset: f32,
    /// Placement attempts before falling back to `safe_region`
    pub max_attempts: u32,
    /// Region known to be clear of HUD overlays
    pub safe_region: Rect,
}

impl ArenaConfig {
    pub fn bounds(&self) -> Rect {
        Rect::new(Vec2::ZERO, self.size)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(1280.0, 720.0),
            exclusions: vec![
                // Tool sidebar
                Rect::new(Vec2::ZERO, Vec2::new(120.0, 720.0)),
                // Timer/score panel
                Rect::new(Vec2::new(16.0, 16.0), Vec2::new(180.0, 130.0)),
                // Taskbar
                Rect::new(Vec2::new(0.0, 672.0), Vec2::new(1280.0, 48.0)),
            ],
            safety_margin: 20.0,
            edge_inset: 50.0,
            max_attempts: 20,
            safe_region: Rect::new(Vec2::new(440.0, 260.0), Vec2::new(400.0, 200.0)),
        }
    }
}

/// Countdown session with tool-gated kills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrictConfig {
    pub duration_ms: f64,
    /// Pests kept alive at all times
    pub live_quota: u32,
}

impl Default for StrictConfig {
    fn default() -> Self {
        Self {
            duration_ms: 30_000.0,
            live_quota: 1,
        }
    }
}

/// Endless swarm difficulty curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Concurrent pest limit at session start
    pub concurrency_start: u32,
    /// Elapsed time per +1 concurrent pest
    pub concurrency_step_ms: f64,
    pub concurrency_cap: u32,
    pub spawn_interval_start_ms: f64,
    /// Interval shrink per elapsed second
    pub spawn_interval_decay_ms: f64,
    pub spawn_interval_floor_ms: f64,
    pub wave_quota_base: u32,
    pub wave_quota_growth: u32,
    pub wave_quota_cap: u32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            concurrency_start: 4,
            concurrency_step_ms: 10_000.0,
            concurrency_cap: 30,
            spawn_interval_start_ms: 2000.0,
            spawn_interval_decay_ms: 25.0,
            spawn_interval_floor_ms: 350.0,
            wave_quota_base: 5,
            wave_quota_growth: 2,
            wave_quota_cap: 25,
        }
    }
}

/// Desktop damage decals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarksConfig {
    /// Minimum distance between consecutive flamethrower marks
    pub flame_min_spacing: f32,
    /// Chainsaw trail snapshot every N recorded points
    pub trail_stride: usize,
}

impl Default for MarksConfig {
    fn default() -> Self {
        Self {
            flame_min_spacing: 20.0,
            trail_stride: 3,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub target_fps: u32,
    pub tools: ToolTable,
    pub collision: CollisionTuning,
    pub beams: BeamTuning,
    pub species: SpeciesTable,
    pub arena: ArenaConfig,
    pub strict: StrictConfig,
    pub swarm: SwarmConfig,
    pub marks: MarksConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: TARGET_FPS,
            tools: ToolTable::default(),
            collision: CollisionTuning::default(),
            beams: BeamTuning::default(),
            species: SpeciesTable::default(),
            arena: ArenaConfig::default(),
            strict: StrictConfig::default(),
            swarm: SwarmConfig::default(),
            marks: MarksConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing sections take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Frame interval the scheduler gates on
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.target_fps as f64
    }

    /// Reject tuning that breaks engine invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.target_fps == 0 {
            return invalid("target_fps must be positive".into());
        }

        for tool in Tool::ALL {
            let profile = self.tools.get(tool);
            if profile.hitbox.x <= 0.0 || profile.hitbox.y <= 0.0 {
                return invalid(format!("{tool}: hitbox must be positive"));
            }
            if profile.decay_per_tick <= 0.0 {
                return invalid(format!("{tool}: decay_per_tick must be positive"));
            }
            if profile.speed_min > profile.speed_max {
                return invalid(format!("{tool}: speed_min exceeds speed_max"));
            }
            if profile.frame_interval_ms <= 0.0 {
                return invalid(format!("{tool}: frame_interval_ms must be positive"));
            }
            if matches!(profile.fire_interval_ms, Some(ms) if ms <= 0.0) {
                return invalid(format!("{tool}: fire_interval_ms must be positive"));
            }
        }

        for species in Species::ALL {
            let profile = self.species.get(species);
            if profile.speed_min <= 0.0 || profile.speed_min > profile.speed_max {
                return invalid(format!("{species}: invalid speed range"));
            }
            if profile.turn < 0.0 || profile.orbit_radius < 0.0 || profile.edge_margin < 0.0 {
                return invalid(format!(
                    "{species}: turn, orbit_radius and edge_margin must not be negative"
                ));
            }
            if profile.retarget_ms <= 0.0 || !(0.0..=1.0).contains(&profile.retarget_chance) {
                return invalid(format!("{species}: invalid retarget timing"));
            }
        }

        let half_diagonal = (self.collision.target_size / 2.0).length();
        if self.collision.fallback_radius <= half_diagonal {
            return invalid(format!(
                "fallback_radius {} must exceed target half-diagonal {half_diagonal}",
                self.collision.fallback_radius
            ));
        }

        let arena = &self.arena;
        if arena.size.x <= 2.0 * arena.edge_inset || arena.size.y <= 2.0 * arena.edge_inset {
            return invalid("arena smaller than its edge inset".into());
        }
        if arena.safety_margin < 0.0 || arena.edge_inset < 0.0 {
            return invalid("arena margins must not be negative".into());
        }
        if arena.max_attempts == 0 {
            return invalid("arena.max_attempts must be at least 1".into());
        }
        if arena.safe_region.size.x <= 0.0 || arena.safe_region.size.y <= 0.0 {
            return invalid("arena.safe_region must have a positive size".into());
        }
        if !arena.bounds().contains_rect(&arena.safe_region) {
            return invalid("arena.safe_region lies outside the arena".into());
        }

        if self.strict.live_quota == 0 || self.strict.duration_ms <= 0.0 {
            return invalid("strict sessions need a live quota and a duration".into());
        }

        let swarm = &self.swarm;
        if swarm.concurrency_cap < swarm.concurrency_start || swarm.concurrency_step_ms <= 0.0 {
            return invalid("swarm concurrency cap below its start value".into());
        }
        if swarm.spawn_interval_floor_ms <= 0.0
            || swarm.spawn_interval_floor_ms > swarm.spawn_interval_start_ms
        {
            return invalid("swarm spawn interval floor must be in (0, start]".into());
        }
        if swarm.wave_quota_base == 0 || swarm.wave_quota_cap < swarm.wave_quota_base {
            return invalid("swarm wave quota cap below its base".into());
        }

        if self.marks.trail_stride == 0 {
            return invalid("marks.trail_stride must be at least 1".into());
        }

        Ok(())
    }
}
