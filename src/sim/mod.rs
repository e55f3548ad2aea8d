//! Simulation module
//!
//! Everything that advances with time lives here and is driven by the
//! [`Scheduler`]:
//! - Effects: particles, laser beams, weapon animations, continuous fire, damage marks
//! - Pests: species kinematics, spawning and the difficulty curve
//! - Sessions: kill validation, scoring and waves
//!
//! Single-threaded by construction; subsystems share state through `Rc<RefCell<_>>`.

pub mod animation;
pub mod beams;
pub mod collision;
pub mod emitter;
pub mod engine;
pub mod marks;
pub mod observe;
pub mod particles;
pub mod pests;
pub mod scheduler;
pub mod session;
pub mod spawner;
pub mod tool;

pub use animation::{Frame, FrameObserver, WeaponAnimations};
pub use beams::{Beam, BeamEffect};
pub use collision::{
    HitTier, Rect, find_target, intersects, overlaps_target, resolve_hit, weapon_hitbox,
};
pub use emitter::{ContinuousFire, Emission, EmissionState};
pub use engine::{Engine, GameMode};
pub use marks::{DamageMark, DamageMarks, Splat, TrailEffect};
pub use observe::ObserverId;
pub use particles::{Particle, ParticleKind, ParticleSpec, ParticleSystem};
pub use pests::{MovementClass, Pest, PestId, Species};
pub use scheduler::{Clock, ManualClock, MonotonicClock, Scheduler, Subscription};
pub use session::{KillOutcome, Session, SessionEvent, SessionMode, SessionPhase, SessionResult};
pub use spawner::{Placement, Spawner};
pub use tool::Tool;
