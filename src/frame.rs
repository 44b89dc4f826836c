//! Frame Coordinator (section 4.5).
//!
//! Stateless per-frame operator, grounded in the teacher's `FrameClock` /
//! `Tick` split: a `FrameClock` decides whether this frame should
//! step/render, while a separate driver owns the actual advancing. Here the
//! roles are [`Clock::idle`](crate::clock::Clock::idle) (advance) and the
//! data-store's `onSetTime` subscription (propagate) — the coordinator's
//! only job is to invoke the former in the right order relative to clearing
//! each slice's per-frame `changed` flag.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::Clock;
use crate::data_store::DataStore;
use crate::slice::command::PreferenceState;

/// Drives one [`Clock`] through one `idle()` tick per call to
/// [`FrameCoordinator::tick`]. Holds no state of its own beyond the
/// references it coordinates — "stateless" per section 4.5.
pub struct FrameCoordinator<P: PreferenceState> {
    clock: Rc<RefCell<Clock>>,
    data_store: Rc<RefCell<DataStore<P>>>,
}

impl<P: PreferenceState> FrameCoordinator<P> {
    /// `data_store` must already be registered as a time-observer on
    /// `clock` (see [`crate::data_store`]'s `TimeObserver` impl) — the
    /// coordinator does not perform that wiring itself, since construction
    /// order (observer registration before the first `tick`) is the
    /// caller's responsibility and varies by embedding application.
    pub fn new(clock: Rc<RefCell<Clock>>, data_store: Rc<RefCell<DataStore<P>>>) -> Self {
        Self { clock, data_store }
    }

    /// Runs one frame: clears every slice's `changed` flag, then advances
    /// the clock. `clock.idle()`'s `onSetTime` firing (if any) re-resolves
    /// every slice through the already-registered data-store observer,
    /// matching section 2's control-flow list exactly.
    pub fn tick(&self) {
        self.data_store.borrow_mut().clear_changed();
        self.clock.borrow_mut().idle();
    }
}
