//! Sample interpolation (section 4.4.2).
//!
//! Two concrete strategies are required: [`Linear`] (field-by-field linear,
//! shortest-arc for angles, linear-in-ECEF for position) and
//! [`NearestNeighbor`] (copy whichever endpoint is closer in time). Both are
//! plain functions of `(t, prev, next)`; they never look at the slice they
//! came from.

use crate::sample::{
    lerp_angle_deg, lerp_orientation_deg, lerp_scalar, lerp_vector, BeamSample, GateSample,
    LaserSample, PlatformSample, ProjectorSample, StateSample,
};
use crate::timestamp::Timestamp;

/// A sample kind that knows how to blend linearly between two of its own
/// instances. Implemented per concrete sample type because the fields (and
/// which of them are angles vs. linear scalars vs. ECEF vectors) differ.
pub trait LinearBlend: StateSample {
    /// Blends `prev` and `next` at `frac` in `[0, 1]`. Does not set `.time`
    /// on the result; [`Linear::interpolate`] does that afterward.
    fn blend(prev: &Self, next: &Self, frac: f64) -> Self;
}

impl LinearBlend for PlatformSample {
    fn blend(prev: &Self, next: &Self, frac: f64) -> Self {
        PlatformSample {
            time: prev.time,
            position: lerp_vector(prev.position, next.position, frac),
            orientation: lerp_orientation_deg(prev.orientation, next.orientation, frac),
            velocity: lerp_vector(prev.velocity, next.velocity, frac),
        }
    }
}

impl LinearBlend for BeamSample {
    fn blend(prev: &Self, next: &Self, frac: f64) -> Self {
        BeamSample {
            time: prev.time,
            azimuth_deg: lerp_angle_deg(prev.azimuth_deg, next.azimuth_deg, frac),
            elevation_deg: lerp_angle_deg(prev.elevation_deg, next.elevation_deg, frac),
            range_meters: lerp_scalar(prev.range_meters, next.range_meters, frac),
        }
    }
}

impl LinearBlend for GateSample {
    fn blend(prev: &Self, next: &Self, frac: f64) -> Self {
        GateSample {
            time: prev.time,
            position: lerp_vector(prev.position, next.position, frac),
            width_meters: lerp_scalar(prev.width_meters, next.width_meters, frac),
            open_fraction: lerp_scalar(prev.open_fraction, next.open_fraction, frac),
        }
    }
}

impl LinearBlend for LaserSample {
    fn blend(prev: &Self, next: &Self, frac: f64) -> Self {
        LaserSample {
            time: prev.time,
            origin: lerp_vector(prev.origin, next.origin, frac),
            direction: lerp_vector(prev.direction, next.direction, frac),
            intensity: lerp_scalar(prev.intensity, next.intensity, frac),
        }
    }
}

impl LinearBlend for ProjectorSample {
    fn blend(prev: &Self, next: &Self, frac: f64) -> Self {
        ProjectorSample {
            time: prev.time,
            position: lerp_vector(prev.position, next.position, frac),
            orientation: lerp_orientation_deg(prev.orientation, next.orientation, frac),
            fov_deg: lerp_scalar(prev.fov_deg, next.fov_deg, frac),
        }
    }
}

/// Computes the `[0, 1]` fraction of `t` between `prev.time` and `next.time`.
/// Returns `0.0` if the two bracketing samples share a time (avoids
/// division by zero; the caller should have already handled the
/// exact-match case per section 4.4.2 step 4).
fn fraction(t: Timestamp, prev_time: Timestamp, next_time: Timestamp) -> f64 {
    let span = next_time.seconds_since(&prev_time);
    if span <= 0.0 {
        0.0
    } else {
        (t.seconds_since(&prev_time) / span).clamp(0.0, 1.0)
    }
}

/// Field-by-field linear interpolator. Sets `result.time = t`.
pub struct Linear;

impl Linear {
    pub fn interpolate<S: LinearBlend>(t: Timestamp, prev: &S, next: &S) -> S {
        let frac = fraction(t, prev.time(), next.time());
        let mut result = S::blend(prev, next, frac);
        result.set_time(t);
        result
    }
}

/// Copies whichever of `prev`/`next` is nearer in time to `t`; ties go to
/// `next`. Sets `result.time = t`.
pub struct NearestNeighbor;

impl NearestNeighbor {
    pub fn interpolate<S: StateSample>(t: Timestamp, prev: &S, next: &S) -> S {
        let half_span = next.time().seconds_since(&prev.time()) / 2.0;
        let mid_time = prev.time().plus_seconds(half_span);
        let mut result = if t < mid_time {
            prev.clone()
        } else {
            next.clone()
        };
        result.set_time(t);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(time_s: f64, pos_x: f64, yaw: f64) -> PlatformSample {
        PlatformSample {
            time: Timestamp::new(2024, time_s).unwrap(),
            position: cgmath::Vector3::new(pos_x, 0.0, 0.0),
            orientation: cgmath::Vector3::new(yaw, 0.0, 0.0),
            velocity: cgmath::Vector3::new(0.0, 0.0, 0.0),
        }
    }

    #[test]
    fn linear_round_trips_at_endpoints() {
        let a = platform(0.0, 0.0, 0.0);
        let b = platform(10.0, 100.0, 90.0);
        let at_a = Linear::interpolate(a.time, &a, &b);
        assert_eq!(at_a.position.x, 0.0);
        let at_b = Linear::interpolate(b.time, &a, &b);
        assert_eq!(at_b.position.x, 100.0);
    }

    #[test]
    fn linear_midpoint_is_halfway() {
        let a = platform(0.0, 0.0, 0.0);
        let b = platform(10.0, 100.0, 0.0);
        let mid = Linear::interpolate(Timestamp::new(2024, 5.0).unwrap(), &a, &b);
        assert_eq!(mid.position.x, 50.0);
    }

    #[test]
    fn linear_yaw_takes_shortest_arc() {
        let a = platform(0.0, 0.0, 350.0);
        let b = platform(10.0, 0.0, 10.0);
        let mid = Linear::interpolate(Timestamp::new(2024, 5.0).unwrap(), &a, &b);
        assert!(
            mid.orientation.x < 1.0 || mid.orientation.x > 359.0,
            "expected near 0deg, got {}",
            mid.orientation.x
        );
    }

    #[test]
    fn nearest_neighbor_picks_closer_endpoint() {
        let a = platform(0.0, 1.0, 0.0);
        let b = platform(10.0, 2.0, 0.0);
        let near_a = NearestNeighbor::interpolate(Timestamp::new(2024, 2.0).unwrap(), &a, &b);
        assert_eq!(near_a.position.x, 1.0);
        let near_b = NearestNeighbor::interpolate(Timestamp::new(2024, 8.0).unwrap(), &a, &b);
        assert_eq!(near_b.position.x, 2.0);
    }
}
