//! The authoritative simulation clock (section 4.2).
//!
//! Grounded in the teacher's [`FrameClock`](../time/index.html) in spirit —
//! a platform-independent clock driven by an external wall-clock source —
//! but generalized from "decide whether to step/draw this frame" into the
//! full mode/direction state machine the design calls for: file modes
//! (`Step`, `Realtime`) are bounded, loopable, and user-editable; live modes
//! (`Freewheel`, `Simulation`) are not.

use std::rc::Rc;

use instant::{Duration, Instant};
use log::{debug, trace, warn};

use crate::consts::{
    DEFAULT_REAL_SCALE, DEFAULT_STEP_SCALE, FREEWHEEL_SET_TIME_THRESHOLD_SECONDS,
    SIMULATION_ENTRY_SCALE,
};
use crate::listen::{ModeObserver, ObserverHandle, ObserverList, TimeObserver};
use crate::timestamp::{Direction, Timestamp};

/// File modes are bounded, loopable, user-editable playback. Live modes
/// flow with external/live semantics and are not freely user-editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Step,
    Realtime,
    Freewheel,
    Simulation,
}

impl Mode {
    pub fn is_file_mode(self) -> bool {
        matches!(self, Mode::Step | Mode::Realtime)
    }

    pub fn is_live_mode(self) -> bool {
        matches!(self, Mode::Freewheel | Mode::Simulation)
    }
}

/// Anchors wall-clock-driven time advancement: "at real instant
/// `anchor_instant`, simulation time was `anchor_sim_time`". `idle()`
/// recomputes the absolute new time from elapsed real time since the last
/// restart rather than accumulating per-tick deltas, so that drift from
/// repeated small roundings never accumulates.
#[derive(Debug, Clone, Copy)]
struct WallClock {
    anchor_instant: Instant,
    anchor_sim_time: Timestamp,
}

impl WallClock {
    fn restart(anchor_sim_time: Timestamp) -> Self {
        Self::restart_at(anchor_sim_time, Instant::now())
    }

    fn restart_at(anchor_sim_time: Timestamp, anchor_instant: Instant) -> Self {
        Self {
            anchor_instant,
            anchor_sim_time,
        }
    }

    fn elapsed_scaled(&self, scale: f64, now: Instant) -> f64 {
        if now <= self.anchor_instant {
            return 0.0;
        }
        now.duration_since(self.anchor_instant).as_secs_f64() * scale
    }
}

/// The authoritative simulation clock.
pub struct Clock {
    current_time: Timestamp,
    start_time: Timestamp,
    end_time: Timestamp,
    mode: Mode,
    direction: Direction,
    is_playing: bool,
    can_loop: bool,
    controls_disabled: bool,
    real_scale: f64,
    step_scale: f64,
    wall_clock: WallClock,
    reference_year: i32,

    time_observers: ObserverList<dyn TimeObserver>,
    mode_observers: ObserverList<dyn ModeObserver>,
}

impl Clock {
    /// Constructs a clock in `Step` mode, `[start, end]` bounds, stopped.
    pub fn new(reference_year: i32, start_time: Timestamp, end_time: Timestamp) -> Self {
        Self {
            current_time: start_time,
            start_time,
            end_time,
            mode: Mode::Step,
            direction: Direction::Stop,
            is_playing: false,
            can_loop: false,
            controls_disabled: false,
            real_scale: DEFAULT_REAL_SCALE,
            step_scale: DEFAULT_STEP_SCALE,
            wall_clock: WallClock::restart(start_time),
            reference_year,
            time_observers: ObserverList::new(),
            mode_observers: ObserverList::new(),
        }
    }

    // ---- queries ----

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_live_mode(&self) -> bool {
        self.mode.is_live_mode()
    }

    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    pub fn time_scale(&self) -> f64 {
        match self.mode {
            Mode::Realtime | Mode::Simulation | Mode::Freewheel => self.real_scale,
            Mode::Step => self.step_scale,
        }
    }

    pub fn real_time(&self) -> f64 {
        self.real_scale
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn can_loop(&self) -> bool {
        self.can_loop
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn time_direction(&self) -> Direction {
        self.direction
    }

    pub fn controls_disabled(&self) -> bool {
        self.controls_disabled
    }

    /// The reference year this clock's timestamps are expressed against.
    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Derived: editable iff controls are enabled, the end is bounded, and
    /// the mode isn't live (section 4.2).
    pub fn is_user_editable(&self) -> bool {
        !self.controls_disabled && !self.end_time.is_infinite() && !self.mode.is_live_mode()
    }

    // ---- observer registration ----

    pub fn add_time_observer(&mut self, observer: Rc<dyn TimeObserver>) -> ObserverHandle {
        self.time_observers.register(observer)
    }

    pub fn remove_time_observer(&mut self, handle: ObserverHandle) {
        self.time_observers.remove(handle)
    }

    pub fn add_mode_observer(&mut self, observer: Rc<dyn ModeObserver>) -> ObserverHandle {
        self.mode_observers.register(observer)
    }

    pub fn remove_mode_observer(&mut self, handle: ObserverHandle) {
        self.mode_observers.remove(handle)
    }

    // ---- editability tracking helper ----

    /// Captures `is_user_editable()` before running `mutate`, and fires
    /// `onUserEditableChanged` afterward iff it flipped. Every mutator that
    /// can affect editability (mode, bounds, controls-disabled) must route
    /// through this.
    fn with_editability_tracking<R>(&mut self, mutate: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.is_user_editable();
        let result = mutate(self);
        let after = self.is_user_editable();
        if before != after {
            self.notify_mode(|o| o.on_user_editable_changed(after));
        }
        result
    }

    fn notify_mode(&mut self, mut f: impl FnMut(&Rc<dyn ModeObserver>)) {
        let mut guard = self.mode_observers.snapshot();
        for obs in guard.observers() {
            f(obs);
        }
    }

    fn notify_time(&mut self, mut f: impl FnMut(&Rc<dyn TimeObserver>)) {
        let mut guard = self.time_observers.snapshot();
        for obs in guard.observers() {
            f(obs);
        }
    }

    // ---- mutators ----

    /// Transitions to `mode`. `live_start` is required (and used) only when
    /// entering a live mode.
    pub fn set_mode(&mut self, mode: Mode, live_start: Timestamp) {
        if mode == self.mode {
            return;
        }
        let leaving_simulation = self.mode == Mode::Simulation;
        let leaving_live_for_file = self.mode.is_live_mode() && mode.is_file_mode();

        self.with_editability_tracking(|this| {
            this.mode = mode;
            debug!(target: "time_machine::clock", "mode -> {mode:?}");

            if leaving_simulation {
                this.real_scale = DEFAULT_REAL_SCALE;
            }
            if leaving_live_for_file {
                this.can_loop = true;
                this.direction = Direction::Forward;
                this.is_playing = false;
                this.notify_mode(|o| {
                    o.on_can_loop_change();
                    o.on_direction_change();
                });
            }

            match mode {
                Mode::Simulation => {
                    this.start_time = Timestamp::MIN_TIME_STAMP;
                    this.end_time = Timestamp::INFINITE_TIME_STAMP;
                    this.real_scale = SIMULATION_ENTRY_SCALE;
                    this.direction = Direction::Forward;
                    this.is_playing = true;
                    let (s, e) = (this.start_time, this.end_time);
                    this.notify_mode(|o| {
                        o.on_bounds_change(s, e);
                        o.on_scale_change();
                    });
                    // Ambiguity (section 9): the source fires onSetTime via
                    // an internal setTime call; preserved here.
                    this.set_time_internal(live_start, true);
                }
                Mode::Freewheel => {
                    this.start_time = live_start;
                    this.end_time = live_start;
                    this.real_scale = DEFAULT_REAL_SCALE;
                    this.direction = Direction::Forward;
                    this.is_playing = true;
                    this.notify_mode(|o| {
                        o.on_bounds_change(live_start, live_start);
                        o.on_scale_change();
                    });
                    this.set_time_internal(live_start, true);
                }
                Mode::Realtime => {
                    this.wall_clock = WallClock::restart(this.current_time);
                }
                Mode::Step => {}
            }

            this.notify_mode(|o| o.on_mode_change());
        });
    }

    /// Sets the wall-clock-to-simulation scale for the current mode
    /// (`realScale` in real-time-like modes, `stepScale` in `Step`).
    /// Negative scales are refused (silent no-op); zero is legal. Restarts
    /// the wall clock and fires `onScaleChange` on any real change.
    pub fn set_time_scale(&mut self, scale: f64) {
        if !scale.is_finite() || scale < 0.0 {
            warn!(target: "time_machine::clock", "refusing negative/non-finite time scale {scale}");
            return;
        }
        if scale == self.time_scale() {
            return;
        }
        match self.mode {
            Mode::Step => self.step_scale = scale,
            Mode::Realtime | Mode::Simulation | Mode::Freewheel => self.real_scale = scale,
        }
        self.wall_clock = WallClock::restart(self.current_time);
        self.notify_mode(|o| o.on_scale_change());
    }

    pub fn set_can_loop(&mut self, can_loop: bool) {
        if can_loop == self.can_loop {
            return;
        }
        self.can_loop = can_loop;
        self.notify_mode(|o| o.on_can_loop_change());
    }

    pub fn set_controls_disabled(&mut self, disabled: bool) {
        if disabled == self.controls_disabled {
            return;
        }
        self.with_editability_tracking(|this| {
            this.controls_disabled = disabled;
        });
    }

    pub fn set_start_time(&mut self, t: Timestamp) {
        if t == self.start_time {
            return;
        }
        self.start_time = t;
        let (s, e) = (self.start_time, self.end_time);
        self.notify_mode(|o| o.on_bounds_change(s, e));
    }

    pub fn set_end_time(&mut self, t: Timestamp) {
        if t == self.end_time {
            return;
        }
        self.with_editability_tracking(|this| {
            this.end_time = t;
            let (s, e) = (this.start_time, this.end_time);
            this.notify_mode(|o| o.on_bounds_change(s, e));
        });
    }

    /// Explicit time set. Clamped to `[start, end]` except in `Freewheel`,
    /// which may extend past `end`. In `Freewheel`, ignores requests closer
    /// than [`FREEWHEEL_SET_TIME_THRESHOLD_SECONDS`] to the current time.
    /// Stepping in a live mode, or any invalid-for-mode request, is silently
    /// refused (section 7).
    pub fn set_time(&mut self, t: Timestamp) {
        self.set_time_internal(t, true);
    }

    fn set_time_internal(&mut self, t: Timestamp, is_jump: bool) {
        let clamped = if self.mode == Mode::Freewheel {
            if (t.seconds_since(&self.current_time)).abs() < FREEWHEEL_SET_TIME_THRESHOLD_SECONDS
            {
                return;
            }
            if t > self.end_time {
                self.end_time = t;
                let (s, e) = (self.start_time, self.end_time);
                self.notify_mode(|o| o.on_bounds_change(s, e));
            }
            t
        } else {
            t.clamp(self.start_time, self.end_time)
        };

        if clamped == self.current_time {
            return;
        }
        self.current_time = clamped;
        self.wall_clock = WallClock::restart(clamped);
        self.notify_time(|o| o.on_set_time(clamped, is_jump));
    }

    // ---- transport controls ----

    pub fn play_forward(&mut self) {
        self.direction = Direction::Forward;
        self.is_playing = true;
        self.wall_clock = WallClock::restart(self.current_time);
        self.notify_mode(|o| o.on_direction_change());
    }

    pub fn play_reverse(&mut self) {
        if self.mode == Mode::Freewheel {
            warn!(target: "time_machine::clock", "reverse direction is forbidden in Freewheel");
            return;
        }
        self.direction = Direction::Reverse;
        self.is_playing = true;
        self.wall_clock = WallClock::restart(self.current_time);
        self.notify_mode(|o| o.on_direction_change());
    }

    /// Only way to leave Freewheel's forced playback is `set_mode`.
    pub fn stop(&mut self) {
        if self.mode == Mode::Freewheel {
            return;
        }
        if !self.is_playing {
            return;
        }
        self.is_playing = false;
        self.direction = Direction::Stop;
        self.notify_mode(|o| o.on_direction_change());
    }

    /// Single manual step. Forbidden (silently refused) in live modes.
    /// Pauses playback first, matching the source's stop-then-step order.
    pub fn step_forward(&mut self) {
        if self.mode.is_live_mode() {
            return;
        }
        self.stop();
        self.apply_step(self.step_scale);
    }

    pub fn step_backward(&mut self) {
        if self.mode.is_live_mode() {
            return;
        }
        self.stop();
        self.apply_step(-self.step_scale);
    }

    pub fn increase_scale(&mut self) {
        self.set_time_scale(self.time_scale() * 2.0);
    }

    pub fn decrease_scale(&mut self) {
        self.set_time_scale(self.time_scale() / 2.0);
    }

    // ---- idle() — the per-frame advance step ----

    /// Advances the clock by one frame's worth of wall-clock time. Behavior
    /// is mode-dependent; see section 4.2. Idempotent when `is_playing ==
    /// false`.
    pub fn idle(&mut self) {
        trace!(target: "time_machine::clock", "idle() mode={:?} t={:?}", self.mode, self.current_time);
        match self.mode {
            Mode::Step => {
                // "STEP forward/reverse" in section 4.2's idle() table: one
                // stepScale-sized tick per frame while playing, using the
                // same loop/clamp logic as an explicit step_forward() call.
                if self.is_playing {
                    let delta = match self.direction {
                        Direction::Forward => self.step_scale,
                        Direction::Reverse => -self.step_scale,
                        Direction::Stop => 0.0,
                    };
                    if delta != 0.0 {
                        self.apply_step(delta);
                    }
                }
            }
            Mode::Realtime => {
                if self.is_playing {
                    self.idle_wall_clock_driven(true);
                }
            }
            Mode::Simulation => {
                if self.is_playing {
                    self.idle_wall_clock_driven(false);
                }
            }
            Mode::Freewheel => {
                if self.is_playing {
                    self.idle_freewheel();
                }
            }
        }
    }

    fn apply_step(&mut self, delta: f64) {
        let proposed = self.current_time.plus_seconds(delta);
        let start = self.start_time;
        let end = self.end_time;
        let can_loop = self.can_loop;

        if delta >= 0.0 {
            if proposed >= end {
                if can_loop {
                    self.current_time = start;
                    self.notify_time(|o| o.on_set_time(start, true));
                    self.notify_time(|o| o.on_time_loop());
                } else {
                    self.current_time = end;
                    self.is_playing = false;
                    self.notify_time(|o| o.on_set_time(end, false));
                }
            } else {
                self.current_time = proposed;
                self.notify_time(|o| o.on_set_time(proposed, false));
            }
        } else if proposed <= start {
            if can_loop {
                self.current_time = end;
                self.notify_time(|o| o.on_set_time(end, true));
                self.notify_time(|o| o.on_time_loop());
            } else {
                self.current_time = start;
                self.is_playing = false;
                self.notify_time(|o| o.on_set_time(start, false));
            }
        } else {
            self.current_time = proposed;
            self.notify_time(|o| o.on_set_time(proposed, false));
        }
    }

    fn idle_wall_clock_driven(&mut self, stop_at_bounds_if_not_loopable: bool) {
        self.idle_wall_clock_driven_at(stop_at_bounds_if_not_loopable, Instant::now());
    }

    /// `now`-parameterized so tests can drive exact wall-clock deltas
    /// without sleeping; see section 8's S1 scenario.
    fn idle_wall_clock_driven_at(&mut self, stop_at_bounds_if_not_loopable: bool, now: Instant) {
        let sign = match self.direction {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
            Direction::Stop => 0.0,
        };
        let elapsed = self.wall_clock.elapsed_scaled(self.real_scale, now) * sign;
        let raw_new_time = self.wall_clock.anchor_sim_time.plus_seconds(elapsed);

        let old_time = self.current_time;
        let adjusted = self.run_adjust_time(old_time, raw_new_time);
        let start = self.start_time;
        let end = self.end_time;
        let can_loop = self.can_loop;

        // Wall-clock-driven modes recompute an absolute elapsed-since-anchor
        // time each tick rather than accumulating per-tick deltas (see
        // `WallClock`'s doc comment), so an overshoot past a bound carries a
        // remainder rather than snapping exactly to the bound: wrapping
        // keeps `elapsed mod span` of the overshoot, matching the S1
        // scenario's 4,4,4-second-delta example (12s elapsed over a 10s
        // span wraps to current=2, not current=0).
        let span = end.seconds_since(&start);
        if sign >= 0.0 && adjusted >= end {
            if can_loop && span > 0.0 {
                let overshoot = adjusted.seconds_since(&start).rem_euclid(span);
                let wrapped = start.plus_seconds(overshoot);
                self.current_time = wrapped;
                self.wall_clock = WallClock::restart_at(wrapped, now);
                self.notify_time(|o| o.on_set_time(wrapped, true));
                self.notify_time(|o| o.on_time_loop());
                return;
            } else if stop_at_bounds_if_not_loopable {
                self.current_time = end;
                self.is_playing = false;
                self.notify_time(|o| o.on_set_time(end, false));
                return;
            }
        }
        if sign < 0.0 && adjusted <= start {
            if can_loop && span > 0.0 {
                let undershoot = start.seconds_since(&adjusted).rem_euclid(span);
                let wrapped = end.minus_seconds(undershoot);
                self.current_time = wrapped;
                self.wall_clock = WallClock::restart_at(wrapped, now);
                self.notify_time(|o| o.on_set_time(wrapped, true));
                self.notify_time(|o| o.on_time_loop());
                return;
            } else if stop_at_bounds_if_not_loopable {
                self.current_time = start;
                self.is_playing = false;
                self.notify_time(|o| o.on_set_time(start, false));
                return;
            }
        }

        let clamped = adjusted.clamp(start, end);
        if clamped != old_time {
            self.current_time = clamped;
            self.notify_time(|o| o.on_set_time(clamped, false));
        }
    }

    fn idle_freewheel(&mut self) {
        self.idle_freewheel_at(Instant::now());
    }

    /// `now`-parameterized so tests can drive exact wall-clock deltas
    /// without sleeping; see section 8's S3 scenario.
    fn idle_freewheel_at(&mut self, now: Instant) {
        let elapsed = self.wall_clock.elapsed_scaled(self.real_scale, now);
        let raw_new_time = self.wall_clock.anchor_sim_time.plus_seconds(elapsed);

        let old_time = self.current_time;
        let adjusted = self.run_adjust_time(old_time, raw_new_time);

        if adjusted > self.end_time {
            self.end_time = adjusted;
            let (s, e) = (self.start_time, self.end_time);
            self.notify_mode(|o| o.on_bounds_change(s, e));
        }
        if adjusted != old_time {
            self.current_time = adjusted;
            self.notify_time(|o| o.on_set_time(adjusted, false));
        }
    }

    /// Runs `adjustTime` over every time-observer in registration order,
    /// applying the smallest-change-wins rule: an observer's proposal
    /// replaces the running `current_proposed` only if
    /// `old_time < proposal < current_proposed`. Proposals at or below
    /// `old_time` are rejected outright (section 9, preserved ambiguity).
    fn run_adjust_time(&mut self, old_time: Timestamp, raw_new_time: Timestamp) -> Timestamp {
        let mut current_proposed = raw_new_time;
        let mut guard = self.time_observers.snapshot();
        for obs in guard.observers() {
            let candidate = obs.adjust_time(old_time, current_proposed);
            if candidate > old_time && candidate < current_proposed {
                current_proposed = candidate;
            }
        }
        current_proposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn t(s: f64) -> Timestamp {
        Timestamp::new(2024, s).unwrap()
    }

    fn new_file_clock(start: f64, end: f64) -> Clock {
        Clock::new(2024, t(start), t(end))
    }

    #[test]
    fn s2_step_reverse_clamp_stops() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_time(t(0.2));
        clock.set_can_loop(false);
        clock.set_time_scale(0.5);
        clock.play_reverse();

        clock.step_backward();
        assert!((clock.current_time().seconds_since(&t(0.0))).abs() < 1e-9);

        clock.step_backward();
        assert!((clock.current_time().seconds_since(&t(0.0))).abs() < 1e-9);
        assert!(!clock.is_playing());
    }

    #[test]
    fn s1_realtime_loop_wraps_with_remainder() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Realtime, t(0.0));
        clock.play_forward();
        let anchor = clock.wall_clock.anchor_instant;

        clock.idle_wall_clock_driven_at(true, anchor + Duration::from_secs_f64(4.0));
        assert!((clock.current_time().seconds_since(&t(4.0))).abs() < 1e-9);

        clock.idle_wall_clock_driven_at(true, anchor + Duration::from_secs_f64(8.0));
        assert!((clock.current_time().seconds_since(&t(8.0))).abs() < 1e-9);

        struct LoopCounter(RefCell<u32>);
        impl TimeObserver for LoopCounter {
            fn on_time_loop(&self) {
                *self.0.borrow_mut() += 1;
            }
        }
        let counter = Rc::new(LoopCounter(RefCell::new(0)));
        clock.add_time_observer(counter.clone());

        clock.idle_wall_clock_driven_at(true, anchor + Duration::from_secs_f64(12.0));
        assert!((clock.current_time().seconds_since(&t(2.0))).abs() < 1e-9);
        assert_eq!(*counter.0.borrow(), 1);
    }

    #[test]
    fn s3_freewheel_extends_bounds_and_never_loops() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Freewheel, t(100.0));
        let anchor = clock.wall_clock.anchor_instant;

        struct LoopCounter(RefCell<u32>);
        impl TimeObserver for LoopCounter {
            fn on_time_loop(&self) {
                *self.0.borrow_mut() += 1;
            }
        }
        let counter = Rc::new(LoopCounter(RefCell::new(0)));
        clock.add_time_observer(counter.clone());

        clock.idle_freewheel_at(anchor + Duration::from_secs_f64(2.0));
        assert!((clock.current_time().seconds_since(&t(102.0))).abs() < 1e-9);
        assert!(clock.end_time().seconds_since(&t(102.0)) >= 0.0);
        assert_eq!(*counter.0.borrow(), 0);
    }

    #[test]
    fn user_editable_reflects_invariant_4() {
        let mut clock = new_file_clock(0.0, 10.0);
        assert!(clock.is_user_editable());
        clock.set_controls_disabled(true);
        assert!(!clock.is_user_editable());
        clock.set_controls_disabled(false);
        assert!(clock.is_user_editable());

        clock.set_mode(Mode::Simulation, t(0.0));
        assert!(!clock.is_user_editable()); // live mode + infinite end
    }

    #[test]
    fn mode_change_fires_observer() {
        struct Counter(RefCell<u32>);
        impl ModeObserver for Counter {
            fn on_mode_change(&self) {
                *self.0.borrow_mut() += 1;
            }
        }
        let mut clock = new_file_clock(0.0, 10.0);
        let counter = Rc::new(Counter(RefCell::new(0)));
        clock.add_mode_observer(counter.clone());
        clock.set_mode(Mode::Realtime, t(0.0));
        // invariant 3: mode() reflects the change and at least one
        // on_mode_change() notification fired.
        assert_eq!(clock.mode(), Mode::Realtime);
        assert_eq!(*counter.0.borrow(), 1);
    }

    #[test]
    fn idle_is_idempotent_when_not_playing() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Realtime, t(0.0));
        clock.stop();
        let before = clock.current_time();
        clock.idle();
        clock.idle();
        assert_eq!(clock.current_time(), before);
    }

    #[test]
    fn entering_simulation_sets_unbounded_end_and_zero_scale() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Simulation, t(100.0));
        assert!(clock.end_time().is_infinite());
        assert_eq!(clock.real_time(), SIMULATION_ENTRY_SCALE);
        assert!(clock.is_playing());
        assert_eq!(clock.time_direction(), Direction::Forward);
    }

    #[test]
    fn leaving_simulation_restores_real_scale() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Simulation, t(0.0));
        clock.set_mode(Mode::Step, t(0.0));
        assert_eq!(clock.real_time(), DEFAULT_REAL_SCALE);
        assert!(clock.can_loop());
        assert_eq!(clock.time_direction(), Direction::Forward);
        assert!(!clock.is_playing());
    }

    #[test]
    fn negative_scale_is_refused() {
        let mut clock = new_file_clock(0.0, 10.0);
        let before = clock.time_scale();
        clock.set_time_scale(-1.0);
        assert_eq!(clock.time_scale(), before);
    }

    #[test]
    fn freewheel_forbids_reverse() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Freewheel, t(100.0));
        clock.play_reverse();
        assert_eq!(clock.time_direction(), Direction::Forward);
    }

    #[test]
    fn freewheel_stop_is_a_no_op() {
        // the only way out of Freewheel's forced playback is set_mode
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Freewheel, t(100.0));
        assert!(clock.is_playing());
        clock.stop();
        assert!(clock.is_playing());
        assert_eq!(clock.time_direction(), Direction::Forward);
    }

    #[test]
    fn play_forward_resumes_from_simulation_after_stop() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Simulation, t(0.0));
        clock.stop();
        assert!(!clock.is_playing());
        clock.play_forward();
        assert!(clock.is_playing());
        assert_eq!(clock.time_direction(), Direction::Forward);
    }

    #[test]
    fn step_backward_pauses_playback_even_without_crossing_a_bound() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_time(t(5.0));
        clock.set_time_scale(0.5);
        clock.play_reverse();
        assert!(clock.is_playing());

        clock.step_backward();
        assert!((clock.current_time().seconds_since(&t(4.5))).abs() < 1e-9);
        assert!(!clock.is_playing());
        assert_eq!(clock.time_direction(), Direction::Stop);
    }

    #[test]
    fn freewheel_set_time_threshold_ignored_below_epsilon() {
        let mut clock = new_file_clock(0.0, 10.0);
        clock.set_mode(Mode::Freewheel, t(100.0));
        let before = clock.current_time();
        clock.set_time(t(100.05));
        assert_eq!(clock.current_time(), before);
        clock.set_time(t(100.2));
        assert_ne!(clock.current_time(), before);
    }

    #[test]
    fn adjust_time_smallest_change_wins() {
        // invariant 9: old=10, proposals {8, 12, 15, 11} in order starting
        // from newTime=20 -> accepted final is 11.
        struct Proposer(f64);
        impl TimeObserver for Proposer {
            fn adjust_time(&self, _old_time: Timestamp, _proposed: Timestamp) -> Timestamp {
                Timestamp::new(2024, self.0).unwrap()
            }
        }
        let mut clock = new_file_clock(0.0, 100.0);
        clock.add_time_observer(Rc::new(Proposer(8.0)));
        clock.add_time_observer(Rc::new(Proposer(12.0)));
        clock.add_time_observer(Rc::new(Proposer(15.0)));
        clock.add_time_observer(Rc::new(Proposer(11.0)));

        let old = t(10.0);
        let result = clock.run_adjust_time(old, t(20.0));
        assert_eq!(result, t(11.0));
    }
}
