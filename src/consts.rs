//! Named magic numbers called out by the time-machine design.
//!
//! Collected in one place the way [`crate::clock::Clock`]'s tuning constants
//! would otherwise be scattered across `match` arms.

use std::time::Duration;

/// Minimum `|t - current|` below which [`crate::clock::Clock::set_time`] is
/// ignored while in [`crate::clock::Mode::Freewheel`].
///
/// Source-dictated; do not "round" this to 0 or 1.
pub const FREEWHEEL_SET_TIME_THRESHOLD_SECONDS: f64 = 0.1;

/// Default `stepScale` applied per `idle()` tick in [`crate::clock::Mode::Step`].
pub const DEFAULT_STEP_SCALE: f64 = 1.0;

/// Default `realScale` (wall-clock multiplier) outside of
/// [`crate::clock::Mode::Simulation`].
pub const DEFAULT_REAL_SCALE: f64 = 1.0;

/// `realScale` forced while entering [`crate::clock::Mode::Simulation`].
pub const SIMULATION_ENTRY_SCALE: f64 = 0.0;

/// Epsilon used for `prev.time == t` exact-match tests in state-slice resolution.
pub const TIME_EQ_EPSILON: f64 = 1e-9;

/// Sequential-search window tried before falling back to binary search in
/// the cached iterator (section 4.4.1).
pub const CACHED_ITER_NEIGHBOR_WINDOW: usize = 3;

/// Sentinel record time treated as the always-present "static" sample.
pub const STATIC_SAMPLE_TIME: f64 = -1.0;

/// Converts a scale-relative duration helper used by the clock's wall-clock
/// bookkeeping into a [`Duration`], saturating rather than panicking on
/// negative input (callers are expected to have already rejected negative
/// scales; this is a last-ditch guard).
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}
