//! Per-entity sample types.
//!
//! Samples are plain value types; a slice owns the storage, never the other
//! way around (section 3, "Ownership"). Position is represented as ECEF
//! (earth-centered, earth-fixed) coordinates — the crate never performs
//! geodesy conversion itself, treating `lla <-> ecef` as an external pure
//! function per the spec's scope.

use cgmath::{InnerSpace, Vector3};

use crate::timestamp::Timestamp;

/// An earth-centered, earth-fixed position, in meters.
pub type Ecef = Vector3<f64>;

/// A stable identifier for an entity in the data store.
pub type ObjectId = u64;

/// Scenario-wide preference/limit id, used when entity-specific
/// preferences are absent (section 4.4.5).
pub const SCENARIO_WIDE_ID: ObjectId = 0;

/// Common shape every state-slice sample implements: a timestamp and the
/// ability to be produced from a linear or nearest-neighbor blend of two
/// samples of the same kind (section 4.4.2).
pub trait StateSample: Clone {
    fn time(&self) -> Timestamp;
    fn set_time(&mut self, time: Timestamp);
}

/// Position/orientation/velocity update for a platform (ship, aircraft,
/// vehicle).
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSample {
    pub time: Timestamp,
    pub position: Ecef,
    /// Yaw/pitch/roll, in degrees.
    pub orientation: Vector3<f64>,
    /// Velocity in ECEF, meters/second.
    pub velocity: Ecef,
}

impl StateSample for PlatformSample {
    fn time(&self) -> Timestamp {
        self.time
    }
    fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }
}

/// Azimuth/elevation/range update for a beam.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamSample {
    pub time: Timestamp,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_meters: f64,
}

impl StateSample for BeamSample {
    fn time(&self) -> Timestamp {
        self.time
    }
    fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }
}

/// Open/close state and position for a gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateSample {
    pub time: Timestamp,
    pub position: Ecef,
    pub width_meters: f64,
    pub open_fraction: f64,
}

impl StateSample for GateSample {
    fn time(&self) -> Timestamp {
        self.time
    }
    fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }
}

/// Direction/intensity update for a laser.
#[derive(Debug, Clone, PartialEq)]
pub struct LaserSample {
    pub time: Timestamp,
    pub origin: Ecef,
    pub direction: Vector3<f64>,
    pub intensity: f64,
}

impl StateSample for LaserSample {
    fn time(&self) -> Timestamp {
        self.time
    }
    fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }
}

/// Frustum/orientation update for a projector.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectorSample {
    pub time: Timestamp,
    pub position: Ecef,
    pub orientation: Vector3<f64>,
    pub fov_deg: f64,
}

impl StateSample for ProjectorSample {
    fn time(&self) -> Timestamp {
        self.time
    }
    fn set_time(&mut self, time: Timestamp) {
        self.time = time;
    }
}

/// One stamped point within a line-of-bearing record (section 4.4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobPoint {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Linearly interpolates a scalar.
pub fn lerp_scalar(a: f64, b: f64, frac: f64) -> f64 {
    a + (b - a) * frac
}

/// Linearly interpolates a vector, component-wise.
pub fn lerp_vector(a: Vector3<f64>, b: Vector3<f64>, frac: f64) -> Vector3<f64> {
    a + (b - a) * frac
}

/// Shortest-arc linear interpolation between two angles, in degrees.
///
/// Unlike [`lerp_scalar`], this never takes the "long way around" — e.g.
/// interpolating from 350° to 10° passes through 0°, not through 180°.
pub fn lerp_angle_deg(a_deg: f64, b_deg: f64, frac: f64) -> f64 {
    let mut delta = (b_deg - a_deg).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    let result = a_deg + delta * frac;
    result.rem_euclid(360.0)
}

/// Interpolates an orientation vector (yaw/pitch/roll, degrees) field-by-field
/// using the shortest-arc rule.
pub fn lerp_orientation_deg(a: Vector3<f64>, b: Vector3<f64>, frac: f64) -> Vector3<f64> {
    Vector3::new(
        lerp_angle_deg(a.x, b.x, frac),
        lerp_angle_deg(a.y, b.y, frac),
        lerp_angle_deg(a.z, b.z, frac),
    )
}

/// Squared distance between two ECEF points; used by callers that only need
/// relative magnitude (avoids an unnecessary `sqrt`).
pub fn ecef_distance2(a: Ecef, b: Ecef) -> f64 {
    (a - b).magnitude2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_arc_crosses_zero_not_one_eighty() {
        // S6: a=350deg, b=10deg, midpoint should read ~0deg, not ~180deg.
        let mid = lerp_angle_deg(350.0, 10.0, 0.5);
        assert!(mid < 1.0 || mid > 359.0, "expected near 0deg, got {mid}");
    }

    #[test]
    fn angle_lerp_endpoints_round_trip() {
        assert!((lerp_angle_deg(350.0, 10.0, 0.0) - 350.0).abs() < 1e-9);
        let end = lerp_angle_deg(350.0, 10.0, 1.0);
        assert!((end - 10.0).abs() < 1e-9 || (end - 370.0).abs() < 1e-9);
    }

    #[test]
    fn scalar_lerp_is_linear() {
        assert_eq!(lerp_scalar(0.0, 10.0, 0.5), 5.0);
    }
}
