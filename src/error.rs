//! The time-machine core's one programmer-facing error condition.
//!
//! Everything else described in the design's error-handling taxonomy is a
//! silent refusal (a setter that declines to fire observers) rather than an
//! `Err`; see [`crate::clock`] and [`crate::slice`] for those.

use thiserror::Error;

/// Errors raised by [`crate::timestamp`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeMachineError {
    /// A [`crate::timestamp::Timestamp`] was constructed from a non-finite
    /// `f64` (NaN or infinite) where a finite instant was required.
    #[error("cannot construct a timestamp from a non-finite value: {0}")]
    NonFiniteTime(f64),
}
