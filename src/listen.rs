//! Observer registration and dispatch.
//!
//! Adapted from the teacher's `Notifier<M>` / `Listener<M>` pair
//! (`universe.rs`): that shape works when every observer receives the same
//! uniform message and may be dropped silently (weak-reference cleanup).
//! Here we need two different fixed sets of callbacks — `TimeObserver` and
//! `ModeObserver` — and `adjust_time` must return a value rather than just
//! receive one, so registration is by explicit add/remove instead of
//! drop-and-sweep. The snapshot-before-dispatch trick is kept: a dispatch
//! iterates a copy of the list taken at its start, so an observer that adds
//! or removes another observer mid-callback doesn't corrupt the in-flight
//! iteration (section 5: "pending add/remove are deferred until dispatch
//! completes").

use std::rc::Rc;

use crate::timestamp::Timestamp;

/// Receives time-authority events from a [`crate::clock::Clock`].
///
/// All methods default to a no-op (or, for [`adjust_time`](Self::adjust_time),
/// identity) so implementers only override what they use.
pub trait TimeObserver {
    /// Fired whenever the authoritative time changes. `is_jump` is true iff
    /// the transition was non-continuous (loop wrap, explicit `setTime`,
    /// direction flip at a bound).
    fn on_set_time(&self, _time: Timestamp, _is_jump: bool) {}

    /// Fired when the clock wraps end→start (or start→end in reverse) under
    /// loop policy.
    fn on_time_loop(&self) {}

    /// Called once per observer, in registration order, before `newTime` is
    /// finalized for an `idle()` tick. An observer may narrow `proposed`
    /// toward `old_time` by returning a smaller-but-still-forward value; see
    /// [`crate::clock`] for the smallest-change-wins acceptance rule. The
    /// default declines to adjust.
    fn adjust_time(&self, _old_time: Timestamp, proposed: Timestamp) -> Timestamp {
        proposed
    }
}

/// Receives clock mode/configuration events.
pub trait ModeObserver {
    fn on_mode_change(&self) {}
    fn on_direction_change(&self) {}
    fn on_scale_change(&self) {}
    fn on_bounds_change(&self, _start: Timestamp, _end: Timestamp) {}
    fn on_can_loop_change(&self) {}
    fn on_user_editable_changed(&self, _editable: bool) {}
}

/// Identity used to remove a previously-registered observer.
///
/// Wraps the registered `Rc`'s pointer address; two handles compare equal
/// iff they were produced for the same registration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ObserverHandle(usize);

/// An ordered set of observers of type `O`, dispatched in registration
/// order. Not re-entrant: do not call a broadcast method from within an
/// in-progress broadcast on the same list (see section 5).
pub struct ObserverList<O: ?Sized> {
    observers: Vec<(ObserverHandle, Rc<O>)>,
    next_id: usize,
    dispatching: bool,
    pending_removals: Vec<ObserverHandle>,
}

impl<O: ?Sized> ObserverList<O> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 0,
            dispatching: false,
            pending_removals: Vec::new(),
        }
    }

    /// Registers `observer`, returning a handle usable with [`Self::remove`].
    pub fn register(&mut self, observer: Rc<O>) -> ObserverHandle {
        let handle = ObserverHandle(self.next_id);
        self.next_id += 1;
        self.observers.push((handle, observer));
        handle
    }

    /// Deregisters the observer for `handle`. Idempotent: removing an
    /// already-removed (or never-registered) handle is a no-op. Safe to call
    /// from within an observer callback during dispatch — the removal is
    /// deferred until the current dispatch's snapshot has been fully walked.
    pub fn remove(&mut self, handle: ObserverHandle) {
        if self.dispatching {
            self.pending_removals.push(handle);
        } else {
            self.observers.retain(|(h, _)| *h != handle);
        }
    }

    /// Returns a snapshot of the currently-registered observers, in
    /// registration order, and marks the list as dispatching for the
    /// duration of the returned guard.
    pub fn snapshot(&mut self) -> DispatchGuard<'_, O> {
        self.dispatching = true;
        DispatchGuard {
            list: self,
            snapshot: None,
        }
    }
}

impl<O: ?Sized> Default for ObserverList<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle covering one dispatch pass: iterate `.observers()`, then drop
/// it (or let it drop) to apply any removals that were requested mid-pass.
pub struct DispatchGuard<'a, O: ?Sized> {
    list: &'a mut ObserverList<O>,
    snapshot: Option<Vec<Rc<O>>>,
}

impl<'a, O: ?Sized> DispatchGuard<'a, O> {
    /// The observers registered at the moment this guard was created.
    pub fn observers(&mut self) -> &[Rc<O>] {
        self.snapshot
            .get_or_insert_with(|| self.list.observers.iter().map(|(_, o)| o.clone()).collect())
    }

    /// Deregisters `handle`, deferred until this guard drops. Equivalent to
    /// [`ObserverList::remove`] called mid-dispatch; exists because the
    /// guard holds the list's only mutable borrow for its lifetime.
    pub fn remove(&mut self, handle: ObserverHandle) {
        self.list.pending_removals.push(handle);
    }
}

impl<'a, O: ?Sized> Drop for DispatchGuard<'a, O> {
    fn drop(&mut self) {
        self.list.dispatching = false;
        for handle in self.list.pending_removals.drain(..) {
            self.list.observers.retain(|(h, _)| *h != handle);
        }
    }
}
