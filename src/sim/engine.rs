//! Engine facade
//!
//! Owns every subsystem behind `Rc<RefCell<_>>`, registers one scheduler callback
//! per subsystem and translates pointer input into effects and kill attempts.
//! All access is single-threaded; a callback that finds its subsystem already
//! borrowed reports [`TickError::Busy`] and the tick carries on.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::animation::{Frame, FrameObserver, WeaponAnimations};
use super::beams::{Beam, BeamEffect};
use super::collision::{find_target, weapon_hitbox};
use super::emitter::ContinuousFire;
use super::marks::{DamageMark, DamageMarks, Splat, TrailEffect};
use super::observe::ObserverId;
use super::particles::{Particle, ParticleSpec, ParticleSystem};
use super::pests::Pest;
use super::scheduler::{Clock, Scheduler, Subscription};
use super::session::{KillOutcome, Session, SessionEvent, SessionMode, SessionPhase};
use super::tool::Tool;
use crate::angle_of;
use crate::config::EngineConfig;
use crate::error::{ConfigError, TickError};
use crate::highscores::ScoreSink;

/// Scheduler priorities (lower runs first)
pub mod priority {
    pub const ANIMATIONS: i32 = 1;
    pub const PARTICLES: i32 = 2;
    pub const BEAMS: i32 = 3;
    pub const EMITTER: i32 = 4;
    pub const SESSION: i32 = 5;
}

/// Particles emitted on a confirmed kill
const KILL_PARTICLES: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Free-play destruction, no session
    DesktopDestroyer,
    /// Countdown hunt with tool-gated kills
    PestControl,
    /// Endless swarm, any tool kills
    Endless,
}

impl GameMode {
    pub fn session_mode(&self) -> Option<SessionMode> {
        match self {
            GameMode::DesktopDestroyer => None,
            GameMode::PestControl => Some(SessionMode::Strict),
            GameMode::Endless => Some(SessionMode::Permissive),
        }
    }
}

fn borrow<'a, T>(
    cell: &'a RefCell<T>,
    name: &'static str,
) -> Result<RefMut<'a, T>, TickError> {
    cell.try_borrow_mut().map_err(|_| TickError::Busy(name))
}

pub struct Engine {
    config: Rc<EngineConfig>,
    scheduler: Scheduler,
    mode: Rc<Cell<GameMode>>,
    particles: Rc<RefCell<ParticleSystem>>,
    beams: Rc<RefCell<BeamEffect>>,
    animations: Rc<RefCell<WeaponAnimations>>,
    fire: Rc<RefCell<ContinuousFire>>,
    marks: Rc<RefCell<DamageMarks>>,
    session: Rc<RefCell<Session>>,
    rng: Rc<RefCell<Pcg32>>,
    /// Tool held down, if any
    held: Option<Tool>,
    pointer: Vec2,
    subscriptions: Vec<Subscription>,
}

impl Engine {
    /// Validate `config` and register every subsystem with a fresh scheduler
    pub fn new(
        config: EngineConfig,
        clock: Rc<dyn Clock>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = Rc::new(config);
        let scheduler = Scheduler::new(clock, config.target_fps);

        let mut engine = Self {
            scheduler,
            mode: Rc::new(Cell::new(GameMode::DesktopDestroyer)),
            particles: Rc::new(RefCell::new(ParticleSystem::new(config.tools.clone()))),
            beams: Rc::new(RefCell::new(BeamEffect::new())),
            animations: Rc::new(RefCell::new(WeaponAnimations::new(&config.tools))),
            fire: Rc::new(RefCell::new(ContinuousFire::new())),
            marks: Rc::new(RefCell::new(DamageMarks::new(
                config.marks.clone(),
                Pcg32::seed_from_u64(seed.wrapping_add(1)),
            ))),
            session: Rc::new(RefCell::new(Session::new(
                (*config).clone(),
                SessionMode::Strict,
                Pcg32::seed_from_u64(seed.wrapping_add(2)),
            ))),
            rng: Rc::new(RefCell::new(Pcg32::seed_from_u64(seed))),
            held: None,
            pointer: Vec2::ZERO,
            subscriptions: Vec::new(),
            config,
        };
        engine.register();
        Ok(engine)
    }

    fn register(&mut self) {
        let animations = Rc::clone(&self.animations);
        let sub = self
            .scheduler
            .subscribe("weapon-animations", priority::ANIMATIONS, move |dt, total| {
                borrow(&animations, "weapon-animations")?.update(dt, total);
                Ok(())
            });
        self.subscriptions.push(sub);

        let particles = Rc::clone(&self.particles);
        let sub = self
            .scheduler
            .subscribe("particles", priority::PARTICLES, move |dt, total| {
                borrow(&particles, "particles")?.update(dt, total);
                Ok(())
            });
        self.subscriptions.push(sub);

        let beams = Rc::clone(&self.beams);
        let sub = self
            .scheduler
            .subscribe("beams", priority::BEAMS, move |dt, total| {
                borrow(&beams, "beams")?.update(dt, total);
                Ok(())
            });
        self.subscriptions.push(sub);

        let fire = Rc::clone(&self.fire);
        let particles = Rc::clone(&self.particles);
        let marks = Rc::clone(&self.marks);
        let rng = Rc::clone(&self.rng);
        let mode = Rc::clone(&self.mode);
        let config = Rc::clone(&self.config);
        let sub = self
            .scheduler
            .subscribe("continuous-fire", priority::EMITTER, move |_, total| {
                let Some(shot) = borrow(&fire, "continuous-fire")?.update(total) else {
                    return Ok(());
                };
                let profile = config.tools.get(shot.tool);
                let batch = ParticleSpec::burst(
                    shot.pos,
                    shot.tool,
                    profile.fire_particles,
                    profile.speed_min..=profile.speed_max,
                    profile.spread,
                    &mut *borrow(&rng, "engine-rng")?,
                );
                borrow(&particles, "particles")?.add_particles(batch);
                if mode.get() == GameMode::DesktopDestroyer {
                    borrow(&marks, "marks")?.add_mark(shot.pos, shot.tool, total);
                }
                Ok(())
            });
        self.subscriptions.push(sub);

        let session = Rc::clone(&self.session);
        let sub = self
            .scheduler
            .subscribe("session", priority::SESSION, move |dt, _| {
                borrow(&session, "session")?.tick(dt);
                Ok(())
            });
        self.subscriptions.push(sub);
    }

    /// Run one scheduler tick if due
    pub fn pump(&self) -> bool {
        self.scheduler.pump()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> GameMode {
        self.mode.get()
    }

    /// Last pointer position seen
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn held_tool(&self) -> Option<Tool> {
        self.held
    }

    /// Switch mode: drops all effects, releases the pointer and resets the session
    pub fn set_mode(&mut self, mode: GameMode) {
        log::info!("mode -> {mode:?}");
        self.release();
        self.animations.borrow_mut().stop_all();
        self.mode.set(mode);
        self.particles.borrow_mut().clear_particles();
        self.beams.borrow_mut().clear_beams();
        self.marks.borrow_mut().clear();
        let mut session = self.session.borrow_mut();
        match mode.session_mode() {
            Some(session_mode) => session.set_mode(session_mode),
            None => session.reset_session(),
        }
    }

    /// Start a hunt in a pest mode. Returns `false` in destroyer mode or when running.
    pub fn start_session(&mut self) -> bool {
        if self.mode.get().session_mode().is_none() {
            return false;
        }
        self.session.borrow_mut().start_session()
    }

    pub fn end_session(&mut self) {
        self.session.borrow_mut().end_session();
    }

    pub fn reset_session(&mut self) {
        self.session.borrow_mut().reset_session();
    }

    pub fn set_score_sink(&mut self, sink: Option<Rc<RefCell<dyn ScoreSink>>>) {
        self.session.borrow_mut().set_score_sink(sink);
    }

    fn now_ms(&self) -> f64 {
        self.scheduler.total_ms()
    }

    fn burst(&self, pos: Vec2, tool: Tool, count: u32) {
        let profile = self.config.tools.get(tool);
        let batch = ParticleSpec::burst(
            pos,
            tool,
            count,
            profile.speed_min..=profile.speed_max,
            profile.spread,
            &mut *self.rng.borrow_mut(),
        );
        self.particles.borrow_mut().add_particles(batch);
    }

    /// Pointer pressed with `tool`
    pub fn pointer_down(&mut self, pos: Vec2, tool: Tool) {
        if self.held.is_some() {
            self.release();
        }
        self.pointer = pos;
        self.held = Some(tool);
        self.animations.borrow_mut().start_animation(tool);

        let destroyer = self.mode.get() == GameMode::DesktopDestroyer;
        if destroyer {
            let now = self.now_ms();
            match tool {
                Tool::Laser => {
                    let angle = self.rng.borrow_mut().random_range(0.0..std::f32::consts::TAU);
                    let beams = &self.config.beams;
                    self.beams.borrow_mut().fire_beam(
                        pos,
                        angle,
                        beams.length,
                        beams.destroyer_duration_ms,
                    );
                    self.marks.borrow_mut().add_mark(pos, tool, now);
                }
                Tool::Hammer | Tool::Gun | Tool::Paintball => {
                    self.marks.borrow_mut().add_mark(pos, tool, now);
                    self.burst(pos, tool, self.config.tools.get(tool).burst_particles);
                }
                Tool::Chainsaw => self.marks.borrow_mut().begin_trail(pos),
                Tool::Flamethrower => {}
            }
        }

        if tool.is_continuous() {
            let anchored = destroyer && tool == Tool::Flamethrower;
            self.fire
                .borrow_mut()
                .start(tool, pos, anchored, &self.config.tools);
        }
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        self.pointer = pos;
        if self.held.is_none() {
            return;
        }
        self.fire.borrow_mut().move_to(pos);
        if self.held == Some(Tool::Chainsaw) && self.mode.get() == GameMode::DesktopDestroyer {
            let now = self.now_ms();
            self.marks.borrow_mut().extend_trail(pos, now);
        }
    }

    pub fn pointer_up(&mut self) {
        self.release();
    }

    /// Changing tools releases whatever was held
    pub fn select_tool(&mut self, tool: Tool) {
        if self.held.is_some_and(|held| held != tool) {
            self.release();
        }
    }

    fn release(&mut self) {
        let Some(tool) = self.held.take() else {
            return;
        };
        self.animations.borrow_mut().stop_animation(tool);
        self.fire.borrow_mut().stop();
        self.marks.borrow_mut().end_trail();
    }

    /// Strike at `pos` in a pest mode. `None` when nothing was hit (or no hunt is on).
    pub fn click(&mut self, pos: Vec2, tool: Tool) -> Option<KillOutcome> {
        self.mode.get().session_mode()?;
        self.pointer = pos;

        let hitbox = weapon_hitbox(pos, tool, &self.config.tools);
        let mut session = self.session.borrow_mut();
        if !session.is_running() {
            return None;
        }
        let targets: Vec<_> = session.pests().iter().map(|p| (p.id, p.pos)).collect();
        let Some((id, tier)) = find_target(&hitbox, targets, &self.config.collision) else {
            log::debug!("miss at {pos} with {tool}");
            return None;
        };
        log::debug!("{id} struck ({tier:?})");

        let outcome = session.attempt_kill(id, tool);
        drop(session);

        if let KillOutcome::Killed(pest) = &outcome {
            self.kill_effects(pest, pos, tool);
        }
        Some(outcome)
    }

    fn kill_effects(&self, pest: &Pest, pointer: Vec2, tool: Tool) {
        let now = self.now_ms();
        let batch: Vec<_> = {
            let mut rng = self.rng.borrow_mut();
            ParticleSpec::burst(pest.pos, tool, KILL_PARTICLES, 1.0..=4.0, 0.0, &mut *rng)
        };
        self.particles.borrow_mut().add_particles(batch);
        self.marks.borrow_mut().add_splat(pest.pos, now);

        if tool == Tool::Laser {
            let offset = pest.pos - pointer;
            self.beams.borrow_mut().fire_beam(
                pointer,
                angle_of(offset),
                offset.length(),
                self.config.beams.pest_duration_ms,
            );
        }
    }

    /// Live pests (copy)
    pub fn pests(&self) -> Vec<Pest> {
        self.session.borrow().pests().to_vec()
    }

    pub fn particles(&self) -> Vec<Particle> {
        self.particles.borrow().particles().to_vec()
    }

    pub fn beams(&self) -> Vec<Beam> {
        self.beams.borrow().beams().to_vec()
    }

    pub fn marks(&self) -> Vec<DamageMark> {
        self.marks.borrow().marks().to_vec()
    }

    /// Kill splats, oldest first
    pub fn splats(&self) -> Vec<Splat> {
        self.marks.borrow().splats().to_vec()
    }

    /// Chainsaw trail snapshots, oldest first
    pub fn trails(&self) -> Vec<TrailEffect> {
        self.marks.borrow().trails().to_vec()
    }

    pub fn current_frame(&self, tool: Tool) -> Frame {
        self.animations.borrow().current_frame(tool)
    }

    pub fn is_animating(&self, tool: Tool) -> bool {
        self.animations.borrow().is_animating(tool)
    }

    /// Called on every weapon frame change; `None` removes the observer
    pub fn set_frame_observer(&self, observer: Option<FrameObserver>) {
        self.animations.borrow_mut().set_frame_observer(observer);
    }

    pub fn is_firing(&self) -> bool {
        self.fire.borrow().is_firing()
    }

    pub fn subscribe_to_particles(
        &self,
        observer: impl FnMut(&[Particle]) + 'static,
    ) -> ObserverId {
        self.particles.borrow_mut().subscribe_to_particles(observer)
    }

    pub fn unsubscribe_from_particles(&self, id: ObserverId) -> bool {
        self.particles.borrow_mut().unsubscribe_from_particles(id)
    }

    pub fn subscribe_to_beams(&self, observer: impl FnMut(&[Beam]) + 'static) -> ObserverId {
        self.beams.borrow_mut().subscribe_to_beams(observer)
    }

    pub fn unsubscribe_from_beams(&self, id: ObserverId) -> bool {
        self.beams.borrow_mut().unsubscribe_from_beams(id)
    }

    pub fn subscribe_to_pests(&self, observer: impl FnMut(&[Pest]) + 'static) -> ObserverId {
        self.session.borrow_mut().subscribe_to_pests(observer)
    }

    pub fn unsubscribe_from_pests(&self, id: ObserverId) -> bool {
        self.session.borrow_mut().unsubscribe_from_pests(id)
    }

    pub fn subscribe_to_marks(
        &self,
        observer: impl FnMut(&[DamageMark]) + 'static,
    ) -> ObserverId {
        self.marks.borrow_mut().subscribe_to_marks(observer)
    }

    pub fn unsubscribe_from_marks(&self, id: ObserverId) -> bool {
        self.marks.borrow_mut().unsubscribe_from_marks(id)
    }

    pub fn subscribe_to_splats(&self, observer: impl FnMut(&[Splat]) + 'static) -> ObserverId {
        self.marks.borrow_mut().subscribe_to_splats(observer)
    }

    pub fn unsubscribe_from_splats(&self, id: ObserverId) -> bool {
        self.marks.borrow_mut().unsubscribe_from_splats(id)
    }

    pub fn subscribe_to_trails(
        &self,
        observer: impl FnMut(&[TrailEffect]) + 'static,
    ) -> ObserverId {
        self.marks.borrow_mut().subscribe_to_trails(observer)
    }

    pub fn unsubscribe_from_trails(&self, id: ObserverId) -> bool {
        self.marks.borrow_mut().unsubscribe_from_trails(id)
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.session.borrow_mut().drain_events()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.borrow().phase()
    }

    pub fn score(&self) -> u32 {
        self.session.borrow().score()
    }

    pub fn wave(&self) -> u32 {
        self.session.borrow().wave()
    }

    pub fn missed_attempts(&self) -> u32 {
        self.session.borrow().missed_attempts()
    }

    pub fn time_remaining_secs(&self) -> Option<u32> {
        self.session.borrow().time_remaining_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scheduler::ManualClock;

    const FRAME: f64 = 17.0;

    fn engine() -> (Engine, ManualClock) {
        let clock = ManualClock::new();
        let engine = Engine::new(EngineConfig::default(), Rc::new(clock.clone()), 7).unwrap();
        (engine, clock)
    }

    fn run_for(engine: &Engine, clock: &ManualClock, ms: f64) {
        let mut elapsed = 0.0;
        while elapsed < ms {
            clock.advance(FRAME);
            engine.pump();
            elapsed += FRAME;
        }
    }

    #[test]
    fn test_subsystems_registered_in_priority_order() {
        let (engine, _clock) = engine();
        assert!(engine.scheduler().is_running());
        assert_eq!(
            engine.scheduler().subscriber_ids(),
            ["weapon-animations", "particles", "beams", "continuous-fire", "session"]
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.target_fps = 0;
        let clock: Rc<dyn Clock> = Rc::new(ManualClock::new());
        assert!(Engine::new(config, clock, 1).is_err());
    }

    #[test]
    fn test_drop_stops_scheduler() {
        let (engine, _clock) = engine();
        let scheduler = engine.scheduler().clone();
        drop(engine);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.subscriber_count(), 0);
    }

    #[test]
    fn test_hammer_smash_marks_and_bursts() {
        let (mut engine, clock) = engine();
        engine.pointer_down(Vec2::new(300.0, 300.0), Tool::Hammer);
        assert_eq!(engine.particles().len(), 8);
        assert_eq!(engine.marks().len(), 1);
        assert!(engine.is_animating(Tool::Hammer));

        run_for(&engine, &clock, 150.0);
        assert_eq!(engine.current_frame(Tool::Hammer), Frame::Two);

        engine.pointer_up();
        assert!(!engine.is_animating(Tool::Hammer));
        assert_eq!(engine.current_frame(Tool::Hammer), Frame::One);

        run_for(&engine, &clock, 1000.0);
        assert!(engine.particles().is_empty());
    }

    #[test]
    fn test_destroyer_laser_beam_fades() {
        let (mut engine, clock) = engine();
        engine.pointer_down(Vec2::new(400.0, 400.0), Tool::Laser);
        let beam = engine.beams()[0];
        assert!((beam.start.distance(beam.end) - 200.0).abs() < 1e-3);
        assert_eq!(engine.marks().len(), 1);

        run_for(&engine, &clock, 320.0);
        assert!(engine.beams().is_empty());
    }

    #[test]
    fn test_held_flamethrower_emits_from_anchor() {
        let (mut engine, clock) = engine();
        engine.pointer_down(Vec2::new(200.0, 200.0), Tool::Flamethrower);
        engine.pointer_move(Vec2::new(600.0, 500.0));
        run_for(&engine, &clock, 500.0);

        let particles = engine.particles();
        assert!(particles.len() >= 8 * 5);
        assert!(particles.iter().all(|p| p.tool() == Tool::Flamethrower));
        // Throttled: every emission lands on the anchor
        assert_eq!(engine.marks().len(), 1);

        engine.pointer_up();
        assert!(!engine.is_firing());
        let count = engine.particles().len();
        run_for(&engine, &clock, 100.0);
        assert!(engine.particles().len() <= count);
    }

    #[test]
    fn test_chainsaw_drag_leaves_trails() {
        let (mut engine, _clock) = engine();
        engine.pointer_down(Vec2::ZERO, Tool::Chainsaw);
        for i in 1..=8 {
            engine.pointer_move(Vec2::new(10.0 * i as f32, 0.0));
        }
        engine.pointer_up();
        assert!(engine.marks().is_empty());
        let trails = engine.trails();
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[1].path.len(), 9);
        assert_eq!(trails[1].path[0], Vec2::ZERO);
    }

    #[test]
    fn test_mode_switch_clears_effects() {
        let (mut engine, _clock) = engine();
        engine.pointer_down(Vec2::new(300.0, 300.0), Tool::Gun);
        assert!(engine.is_firing());
        engine.set_mode(GameMode::PestControl);
        assert!(!engine.is_firing());
        assert!(engine.particles().is_empty());
        assert!(engine.marks().is_empty());
        assert_eq!(engine.phase(), SessionPhase::NotStarted);
    }

    #[test]
    fn test_destroyer_mode_has_no_session() {
        let (mut engine, _clock) = engine();
        assert!(!engine.start_session());
        assert_eq!(engine.click(Vec2::ZERO, Tool::Hammer), None);
    }

    #[test]
    fn test_pest_control_click_kill_and_reject() {
        let (mut engine, _clock) = engine();
        engine.set_mode(GameMode::PestControl);
        assert!(engine.start_session());
        let pest = engine.pests()[0].clone();

        let wrong_tool = Tool::ALL
            .into_iter()
            .find(|t| *t != pest.required_tool())
            .unwrap();
        let outcome = engine.click(pest.pos, wrong_tool);
        assert!(matches!(outcome, Some(KillOutcome::WrongTool { .. })));
        assert_eq!(engine.missed_attempts(), 1);
        assert!(engine.particles().is_empty());

        let outcome = engine.click(pest.pos + Vec2::new(3.0, 3.0), pest.required_tool());
        assert!(outcome.is_some_and(|o| o.is_accepted()));
        assert_eq!(engine.score(), 1);
        assert_eq!(engine.pests().len(), 1);
        assert_eq!(engine.particles().len(), KILL_PARTICLES as usize);
    }

    #[test]
    fn test_kill_leaves_one_splat_at_pest() {
        let (mut engine, _clock) = engine();
        engine.set_mode(GameMode::Endless);
        engine.start_session();
        let splat_lists = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&splat_lists);
        engine.subscribe_to_splats(move |splats: &[Splat]| seen.borrow_mut().push(splats.len()));

        let target = engine.pests()[0].pos;
        let Some(KillOutcome::Killed(pest)) = engine.click(target, Tool::Hammer) else {
            panic!("hammer click on a live pest should kill in endless mode");
        };

        let splats = engine.splats();
        assert_eq!(splats.len(), 1);
        assert_eq!(splats[0].pos, pest.pos);
        assert!((1..=3).contains(&splats[0].variant));
        assert_eq!(*splat_lists.borrow(), [0, 1]);

        engine.set_mode(GameMode::DesktopDestroyer);
        assert!(engine.splats().is_empty());
    }

    #[test]
    fn test_mode_switch_stops_animation_and_notifies() {
        let (mut engine, clock) = engine();
        let frames = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&frames);
        engine.set_frame_observer(Some(Box::new(move |tool: Tool, frame: Frame| {
            seen.borrow_mut().push((tool, frame))
        })));

        engine.pointer_down(Vec2::new(300.0, 300.0), Tool::Hammer);
        run_for(&engine, &clock, 160.0);
        assert_eq!(engine.current_frame(Tool::Hammer), Frame::Two);

        engine.set_mode(GameMode::Endless);
        assert!(Tool::ALL.iter().all(|t| !engine.is_animating(*t)));
        assert_eq!(engine.current_frame(Tool::Hammer), Frame::One);
        assert_eq!(
            frames.borrow().last(),
            Some(&(Tool::Hammer, Frame::One))
        );
    }

    #[test]
    fn test_far_click_misses() {
        let (mut engine, _clock) = engine();
        engine.set_mode(GameMode::PestControl);
        engine.start_session();
        let pest = engine.pests()[0].clone();
        let far = if pest.pos.x > 640.0 {
            Vec2::new(pest.pos.x - 300.0, pest.pos.y)
        } else {
            Vec2::new(pest.pos.x + 300.0, pest.pos.y)
        };
        assert_eq!(engine.click(far, pest.required_tool()), None);
        assert_eq!(engine.missed_attempts(), 0);
    }

    #[test]
    fn test_endless_laser_kill_fires_beam_to_pest() {
        let (mut engine, _clock) = engine();
        engine.set_mode(GameMode::Endless);
        engine.start_session();
        let pest = engine.pests()[0].clone();
        let pointer = pest.pos + Vec2::new(20.0, 0.0);

        let outcome = engine.click(pointer, Tool::Laser);
        assert!(outcome.is_some_and(|o| o.is_accepted()));
        let beam = engine.beams()[0];
        assert_eq!(beam.start, pointer);
        assert!(beam.end.distance(pest.pos) < 1e-3);
    }

    #[test]
    fn test_strict_session_ends_on_scheduler_time() {
        let (mut engine, clock) = engine();
        engine.set_mode(GameMode::PestControl);
        engine.start_session();
        run_for(&engine, &clock, 29_000.0);
        assert_eq!(engine.phase(), SessionPhase::Running);
        assert_eq!(engine.time_remaining_secs(), Some(1));
        run_for(&engine, &clock, 1_100.0);
        assert_eq!(engine.phase(), SessionPhase::Ended);
        assert!(engine.pests().is_empty());
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::SessionEnded(_))));
    }

    #[test]
    fn test_observer_reentry_is_reported_not_fatal() {
        let (mut engine, clock) = engine();
        engine.pointer_down(Vec2::new(100.0, 100.0), Tool::Hammer);
        let particles = Rc::clone(&engine.particles);
        let hits = Rc::new(Cell::new(0));
        let hits_cb = Rc::clone(&hits);
        engine.subscribe_to_particles(move |_| {
            // Re-entrant borrow fails while the particle system is publishing
            if particles.try_borrow_mut().is_err() {
                hits_cb.set(hits_cb.get() + 1);
            }
        });
        run_for(&engine, &clock, FRAME * 2.0);
        assert!(hits.get() >= 1);
        assert!(engine.scheduler().is_running());
    }
}
