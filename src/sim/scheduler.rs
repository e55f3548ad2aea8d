//! Fixed-cadence cooperative scheduler
//!
//! Every subsystem registers a callback under a unique id and priority. The host
//! calls [`Scheduler::pump`] as often as it likes (once per display frame is
//! typical); a tick only fires once at least one frame interval of clock time has
//! passed since the previous processed tick. Callbacks run in ascending priority,
//! ties broken by registration order.
//!
//! The scheduler runs only while it has subscribers: the first subscription starts
//! it and removing the last one stops it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::error::TickError;

/// Monotonic millisecond time source
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall-clock monotonic time measured from construction
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Scheduler callback: `(delta_ms, total_ms)`
pub type TickCallback = Box<dyn FnMut(f64, f64) -> Result<(), TickError>>;

struct Entry {
    id: String,
    priority: i32,
    /// Registration slot; kept when the id is re-subscribed
    order: u64,
    seq: u64,
    callback: Rc<RefCell<TickCallback>>,
}

#[derive(Default)]
struct SchedulerState {
    /// Sorted by (priority, order)
    entries: Vec<Entry>,
    running: bool,
    last_tick_ms: f64,
    total_ms: f64,
    next_seq: u64,
    ticks: u64,
}

impl SchedulerState {
    fn is_live(&self, id: &str, seq: u64) -> bool {
        self.entries.iter().any(|e| e.seq == seq && e.id == id)
    }

    /// Drop the entry under `id`, returning its registration slot
    fn remove(&mut self, id: &str) -> Option<u64> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index).order)
    }
}

/// Shared handle to the scheduler; clones drive the same loop
#[derive(Clone)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
    clock: Rc<dyn Clock>,
    frame_interval_ms: f64,
}

impl Scheduler {
    pub fn new(clock: Rc<dyn Clock>, target_fps: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState::default())),
            clock,
            frame_interval_ms: 1000.0 / target_fps.max(1) as f64,
        }
    }

    /// Register `callback` under `id`, replacing any live entry with the same id.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, id: impl Into<String>, priority: i32, callback: F) -> Subscription
    where
        F: FnMut(f64, f64) -> Result<(), TickError> + 'static,
    {
        let id = id.into();
        let mut state = self.state.borrow_mut();
        let was_idle = state.entries.is_empty();

        let seq = state.next_seq;
        state.next_seq += 1;
        let order = match state.remove(&id) {
            Some(order) => {
                log::debug!("scheduler: replacing subscriber `{id}`");
                order
            }
            None => seq,
        };
        let index = state
            .entries
            .partition_point(|e| (e.priority, e.order) < (priority, order));
        state.entries.insert(
            index,
            Entry {
                id: id.clone(),
                priority,
                order,
                seq,
                callback: Rc::new(RefCell::new(Box::new(callback))),
            },
        );

        if was_idle {
            state.running = true;
            state.last_tick_ms = self.clock.now_ms();
            state.total_ms = 0.0;
            log::info!("scheduler started ({:.1} ms frames)", self.frame_interval_ms);
        }

        Subscription {
            id,
            seq,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Remove the subscriber registered under `id`; no-op if absent
    pub fn unsubscribe(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        if state.remove(id).is_some() {
            stop_if_idle(&mut state);
        }
    }

    /// Run one tick if a frame interval has elapsed. Returns whether a tick ran.
    pub fn pump(&self) -> bool {
        let (delta_ms, total_ms, batch) = {
            let mut state = self.state.borrow_mut();
            if !state.running {
                return false;
            }
            let now = self.clock.now_ms();
            let delta_ms = now - state.last_tick_ms;
            if delta_ms < self.frame_interval_ms {
                return false;
            }
            state.last_tick_ms = now;
            state.total_ms += delta_ms;
            state.ticks += 1;
            let batch: Vec<_> = state
                .entries
                .iter()
                .map(|e| (e.id.clone(), e.seq, Rc::clone(&e.callback)))
                .collect();
            (delta_ms, state.total_ms, batch)
        };

        for (id, seq, callback) in batch {
            // An earlier callback in this tick may have removed or replaced it
            if !self.state.borrow().is_live(&id, seq) {
                continue;
            }
            let result = match callback.try_borrow_mut() {
                Ok(mut callback) => callback(delta_ms, total_ms),
                Err(_) => Err(TickError::Fault(format!("`{id}` re-entered the scheduler"))),
            };
            if let Err(err) = result {
                log::error!("scheduler subscriber `{id}` failed: {err}");
            }
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Subscriber ids in dispatch order
    pub fn subscriber_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .entries
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    /// Processed time since the scheduler last started
    pub fn total_ms(&self) -> f64 {
        self.state.borrow().total_ms
    }

    /// Processed ticks since construction
    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }
}

fn stop_if_idle(state: &mut SchedulerState) {
    if state.entries.is_empty() && state.running {
        state.running = false;
        log::info!("scheduler stopped (no subscribers)");
    }
}

/// Live registration; unsubscribes on drop
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    id: String,
    seq: u64,
    state: Weak<RefCell<SchedulerState>>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Unsubscribe now (same as dropping)
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            log::warn!("subscription `{}` dropped while scheduler busy", self.id);
            return;
        };
        // A newer registration under the same id belongs to someone else
        let before = state.entries.len();
        state
            .entries
            .retain(|e| !(e.id == self.id && e.seq == self.seq));
        if state.entries.len() != before {
            stop_if_idle(&mut state);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .finish()
    }
}
