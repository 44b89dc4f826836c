//! Visualization Clock Proxy (section 4.3).
//!
//! A second [`Clock`]-like facade that forwards to either the authoritative
//! data clock or a private local clock, selected by `locked`. Per section
//! 9's design note ("implement by holding both and a boolean
//! discriminator"), every query and mutator simply picks a target at call
//! time — there is no shared state machine here, just dispatch.
//!
//! Re-emitting the active clock's events to the proxy's own observers needs
//! the proxy to register itself on both underlying clocks, which means it
//! must hold itself by `Weak` reference (a `Rc<RefCell<Clock>>` can't know
//! about the proxy that wraps it) — the same weak-self pattern the
//! teacher's listener sweep uses, applied here to break the ownership cycle
//! rather than to clean up dropped listeners.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::clock::{Clock, Mode};
use crate::listen::{ModeObserver, ObserverHandle, ObserverList, TimeObserver};
use crate::timestamp::{Direction, Timestamp};

/// Fired whenever the proxy's `locked` state transitions.
pub trait LockObserver {
    fn on_lock_changed(&self, _locked: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Data,
    Local,
}

pub struct VisualizationClockProxy {
    data_clock: Rc<RefCell<Clock>>,
    local_clock: Rc<RefCell<Clock>>,
    locked: Cell<bool>,
    mode_observers: RefCell<ObserverList<dyn ModeObserver>>,
    time_observers: RefCell<ObserverList<dyn TimeObserver>>,
    lock_observers: RefCell<ObserverList<dyn LockObserver>>,
}

impl VisualizationClockProxy {
    /// Constructs a proxy, starting locked to `data_clock`. The local clock
    /// is seeded with `data_clock`'s current bounds and time so that an
    /// immediate `unlock()` sees a coherent starting point.
    pub fn new(data_clock: Rc<RefCell<Clock>>) -> Rc<Self> {
        let (reference_year, start, end, current) = {
            let dc = data_clock.borrow();
            (dc.reference_year(), dc.start_time(), dc.end_time(), dc.current_time())
        };
        let local_clock = Clock::new(reference_year, start, end);
        let local_clock = Rc::new(RefCell::new(local_clock));
        local_clock.borrow_mut().set_time(current);
        local_clock.borrow_mut().set_controls_disabled(true);

        let proxy = Rc::new(Self {
            data_clock: data_clock.clone(),
            local_clock,
            locked: Cell::new(true),
            mode_observers: RefCell::new(ObserverList::new()),
            time_observers: RefCell::new(ObserverList::new()),
            lock_observers: RefCell::new(ObserverList::new()),
        });

        let data_relay = Rc::new(Relay {
            proxy: Rc::downgrade(&proxy),
            source: Source::Data,
        });
        data_clock.borrow_mut().add_time_observer(data_relay.clone());
        data_clock.borrow_mut().add_mode_observer(data_relay);

        let local_relay = Rc::new(Relay {
            proxy: Rc::downgrade(&proxy),
            source: Source::Local,
        });
        proxy
            .local_clock
            .borrow_mut()
            .add_time_observer(local_relay.clone());
        proxy.local_clock.borrow_mut().add_mode_observer(local_relay);

        proxy
    }

    fn active(&self) -> &Rc<RefCell<Clock>> {
        if self.locked.get() {
            &self.data_clock
        } else {
            &self.local_clock
        }
    }

    fn notify_mode(&self, mut f: impl FnMut(&Rc<dyn ModeObserver>)) {
        let mut list = self.mode_observers.borrow_mut();
        let mut guard = list.snapshot();
        for obs in guard.observers() {
            f(obs);
        }
    }

    fn notify_time(&self, mut f: impl FnMut(&Rc<dyn TimeObserver>)) {
        let mut list = self.time_observers.borrow_mut();
        let mut guard = list.snapshot();
        for obs in guard.observers() {
            f(obs);
        }
    }

    fn notify_lock(&self, locked: bool) {
        let mut list = self.lock_observers.borrow_mut();
        let mut guard = list.snapshot();
        for obs in guard.observers() {
            obs.on_lock_changed(locked);
        }
    }

    // ---- queries ----

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    pub fn mode(&self) -> Mode {
        self.active().borrow().mode()
    }

    pub fn is_live_mode(&self) -> bool {
        self.active().borrow().is_live_mode()
    }

    pub fn current_time(&self) -> Timestamp {
        self.active().borrow().current_time()
    }

    pub fn time_scale(&self) -> f64 {
        self.active().borrow().time_scale()
    }

    pub fn real_time(&self) -> f64 {
        self.active().borrow().real_time()
    }

    pub fn start_time(&self) -> Timestamp {
        self.active().borrow().start_time()
    }

    pub fn end_time(&self) -> Timestamp {
        self.active().borrow().end_time()
    }

    pub fn can_loop(&self) -> bool {
        self.active().borrow().can_loop()
    }

    pub fn is_playing(&self) -> bool {
        self.active().borrow().is_playing()
    }

    pub fn time_direction(&self) -> Direction {
        self.active().borrow().time_direction()
    }

    pub fn controls_disabled(&self) -> bool {
        self.active().borrow().controls_disabled()
    }

    pub fn is_user_editable(&self) -> bool {
        self.active().borrow().is_user_editable()
    }

    // ---- mutators (forward to whichever clock is currently active) ----

    pub fn set_mode(&self, mode: Mode, live_start: Timestamp) {
        self.active().borrow_mut().set_mode(mode, live_start);
    }

    pub fn set_time(&self, t: Timestamp) {
        self.active().borrow_mut().set_time(t);
    }

    pub fn set_time_scale(&self, scale: f64) {
        self.active().borrow_mut().set_time_scale(scale);
    }

    pub fn set_can_loop(&self, can_loop: bool) {
        self.active().borrow_mut().set_can_loop(can_loop);
    }

    pub fn set_controls_disabled(&self, disabled: bool) {
        self.active().borrow_mut().set_controls_disabled(disabled);
    }

    pub fn set_start_time(&self, t: Timestamp) {
        self.active().borrow_mut().set_start_time(t);
    }

    pub fn set_end_time(&self, t: Timestamp) {
        self.active().borrow_mut().set_end_time(t);
    }

    pub fn play_forward(&self) {
        self.active().borrow_mut().play_forward();
    }

    pub fn play_reverse(&self) {
        self.active().borrow_mut().play_reverse();
    }

    pub fn stop(&self) {
        self.active().borrow_mut().stop();
    }

    pub fn step_forward(&self) {
        self.active().borrow_mut().step_forward();
    }

    pub fn step_backward(&self) {
        self.active().borrow_mut().step_backward();
    }

    pub fn increase_scale(&self) {
        self.active().borrow_mut().increase_scale();
    }

    pub fn decrease_scale(&self) {
        self.active().borrow_mut().decrease_scale();
    }

    /// Advances the local clock. While locked, the data clock is driven by
    /// the frame coordinator directly and re-driving it here would double-
    /// advance a shared clock, so this is a no-op.
    pub fn idle(&self) {
        if !self.locked.get() {
            self.local_clock.borrow_mut().idle();
        }
    }

    // ---- lock transitions (section 4.3) ----

    /// Locks back onto the data clock: stops the local clock and disables
    /// its controls, then pass-through resumes.
    pub fn lock(&self) {
        if self.locked.get() {
            return;
        }
        self.local_clock.borrow_mut().stop();
        self.local_clock.borrow_mut().set_controls_disabled(true);
        self.locked.set(true);
        self.notify_lock(true);
    }

    /// Unlocks into the local clock, seeded from the data clock's current
    /// bounds and time. Refused (returns `false`, no state change) unless
    /// the data clock is currently in a live mode.
    pub fn unlock(&self) -> bool {
        if !self.locked.get() {
            return true;
        }
        let (is_live, start, end, current) = {
            let dc = self.data_clock.borrow();
            (
                dc.is_live_mode(),
                dc.start_time(),
                dc.end_time(),
                dc.current_time(),
            )
        };
        if !is_live {
            return false;
        }
        {
            let mut lc = self.local_clock.borrow_mut();
            lc.set_start_time(start);
            lc.set_end_time(end);
            lc.set_controls_disabled(false);
        }
        self.local_clock.borrow_mut().set_time(current);
        self.locked.set(false);
        self.notify_lock(false);
        true
    }

    // ---- observer registration (the proxy's own list; see module docs) ----

    pub fn add_time_observer(&self, observer: Rc<dyn TimeObserver>) -> ObserverHandle {
        self.time_observers.borrow_mut().register(observer)
    }

    pub fn remove_time_observer(&self, handle: ObserverHandle) {
        self.time_observers.borrow_mut().remove(handle)
    }

    pub fn add_mode_observer(&self, observer: Rc<dyn ModeObserver>) -> ObserverHandle {
        self.mode_observers.borrow_mut().register(observer)
    }

    pub fn remove_mode_observer(&self, handle: ObserverHandle) {
        self.mode_observers.borrow_mut().remove(handle)
    }

    pub fn add_lock_observer(&self, observer: Rc<dyn LockObserver>) -> ObserverHandle {
        self.lock_observers.borrow_mut().register(observer)
    }

    pub fn remove_lock_observer(&self, handle: ObserverHandle) {
        self.lock_observers.borrow_mut().remove(handle)
    }
}

/// Forwards one underlying clock's events into the proxy's own observer
/// lists, filtering to whichever clock is currently active, and mirrors
/// data-clock bounds changes into the local clock while unlocked (section
/// 4.3: "mirrored into the local clock's bounds (but not its time)").
///
/// Held by the underlying clocks via `Rc<dyn TimeObserver/ModeObserver>`,
/// but reaches the proxy only through a `Weak` reference: the proxy's own
/// `Rc` is what these clocks are reachable *from* (`data_clock`,
/// `local_clock`), so a strong back-reference here would be a cycle.
struct Relay {
    proxy: Weak<VisualizationClockProxy>,
    source: Source,
}

impl Relay {
    fn is_active(&self, proxy: &VisualizationClockProxy) -> bool {
        let active = if proxy.locked.get() {
            Source::Data
        } else {
            Source::Local
        };
        active == self.source
    }
}

impl TimeObserver for Relay {
    fn on_set_time(&self, time: Timestamp, is_jump: bool) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_time(|o| o.on_set_time(time, is_jump));
        }
    }

    fn on_time_loop(&self) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_time(|o| o.on_time_loop());
        }
    }
}

impl ModeObserver for Relay {
    fn on_mode_change(&self) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_mode(|o| o.on_mode_change());
        }
    }

    fn on_direction_change(&self) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_mode(|o| o.on_direction_change());
        }
    }

    fn on_scale_change(&self) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_mode(|o| o.on_scale_change());
        }
    }

    fn on_bounds_change(&self, start: Timestamp, end: Timestamp) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        // Mirror data-clock bounds into the local clock while unlocked.
        // Each setter call below is its own statement so the temporary
        // `RefMut` it holds is released before the next one runs: the
        // setter's own notification synchronously re-enters this relay
        // (now for `Source::Local`), which needs its own borrow of the
        // local clock's observer machinery, not this one.
        if self.source == Source::Data && !proxy.locked.get() {
            proxy.local_clock.borrow_mut().set_start_time(start);
            proxy.local_clock.borrow_mut().set_end_time(end);
        }
        if self.is_active(&proxy) {
            proxy.notify_mode(|o| o.on_bounds_change(start, end));
        }
    }

    fn on_can_loop_change(&self) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_mode(|o| o.on_can_loop_change());
        }
    }

    fn on_user_editable_changed(&self, editable: bool) {
        let Some(proxy) = self.proxy.upgrade() else {
            return;
        };
        if self.is_active(&proxy) {
            proxy.notify_mode(|o| o.on_user_editable_changed(editable));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;

    fn t(s: f64) -> Timestamp {
        Timestamp::new(2024, s).unwrap()
    }

    fn data_clock(start: f64, end: f64) -> Rc<RefCell<Clock>> {
        Rc::new(RefCell::new(Clock::new(2024, t(start), t(end))))
    }

    #[test]
    fn starts_locked_and_mirrors_data_clock_queries() {
        let dc = data_clock(0.0, 10.0);
        dc.borrow_mut().set_time(t(3.0));
        let proxy = VisualizationClockProxy::new(dc);
        assert!(proxy.is_locked());
        assert_eq!(proxy.current_time(), t(3.0));
    }

    #[test]
    fn unlock_rejected_outside_live_mode() {
        let dc = data_clock(0.0, 10.0);
        let proxy = VisualizationClockProxy::new(dc);
        assert!(!proxy.unlock());
        assert!(proxy.is_locked());
    }

    #[test]
    fn unlock_succeeds_in_live_mode_and_locals_diverge() {
        let dc = data_clock(0.0, 10.0);
        dc.borrow_mut().set_mode(Mode::Freewheel, t(5.0));
        let proxy = VisualizationClockProxy::new(dc.clone());

        assert!(proxy.unlock());
        assert!(!proxy.is_locked());

        // The proxy now reads/writes the local clock; the data clock is
        // untouched by a local-only mutation.
        proxy.set_time(t(5.5));
        assert_eq!(proxy.current_time(), t(5.5));
        assert_ne!(dc.borrow().current_time(), t(5.5));
    }

    #[test]
    fn lock_stops_and_disables_local_clock() {
        let dc = data_clock(0.0, 10.0);
        dc.borrow_mut().set_mode(Mode::Freewheel, t(5.0));
        let proxy = VisualizationClockProxy::new(dc);
        proxy.unlock();
        proxy.play_forward();
        proxy.lock();
        assert!(proxy.is_locked());
        assert!(!proxy.local_clock.borrow().is_playing());
        assert!(proxy.local_clock.borrow().controls_disabled());
    }

    #[test]
    fn bounds_change_on_data_clock_mirrors_into_unlocked_local_clock() {
        let dc = data_clock(0.0, 10.0);
        dc.borrow_mut().set_mode(Mode::Freewheel, t(5.0));
        let proxy = VisualizationClockProxy::new(dc.clone());
        proxy.unlock();

        dc.borrow_mut().set_time(t(20.0)); // extends Freewheel's end_time
        assert!(proxy.local_clock.borrow().end_time() >= t(20.0));
    }

    #[test]
    fn lock_observer_fires_on_transition() {
        let dc = data_clock(0.0, 10.0);
        dc.borrow_mut().set_mode(Mode::Freewheel, t(5.0));
        let proxy = VisualizationClockProxy::new(dc);

        struct Recorder(StdRefCell<Vec<bool>>);
        impl LockObserver for Recorder {
            fn on_lock_changed(&self, locked: bool) {
                self.0.borrow_mut().push(locked);
            }
        }
        let recorder = Rc::new(Recorder(StdRefCell::new(Vec::new())));
        proxy.add_lock_observer(recorder.clone());

        proxy.unlock();
        proxy.lock();
        assert_eq!(*recorder.0.borrow(), vec![false, true]);
    }
}
