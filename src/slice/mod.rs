//! Data slices: per-entity time-indexed sequences (section 4.4).
//!
//! Three structurally distinct flavors — [`state`], [`command`], and
//! [`lob`] — share the [`sorted::SortedSamples`]/[`sorted::SliceIterator`]
//! primitives but are not related by inheritance (per the design notes:
//! "Rather than inheritance, implement them as separate concrete types that
//! each fulfill a common *sliceable* capability set").

pub mod command;
pub mod lob;
pub mod sorted;
pub mod state;

use std::collections::HashMap;

use crate::consts::{STATIC_SAMPLE_TIME, TIME_EQ_EPSILON};
use crate::sample::{ObjectId, SCENARIO_WIDE_ID};
use crate::timestamp::Timestamp;

/// Whether `t` is the sentinel "static/default" sample time (section 6).
pub fn is_static_time(t: Timestamp) -> bool {
    (t.as_seconds(t.reference_year()) - STATIC_SAMPLE_TIME).abs() < TIME_EQ_EPSILON
}

/// A slice's two independent data-limiting caps (section 4.4.5): zero or
/// negative means unlimited for that cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceLimits {
    pub max_points: i64,
    pub max_seconds: f64,
}

impl SliceLimits {
    pub const UNLIMITED: Self = Self {
        max_points: 0,
        max_seconds: 0.0,
    };
}

impl Default for SliceLimits {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

/// Per-entity (or scenario-wide, `id == SCENARIO_WIDE_ID`) limit
/// preferences, as read by each slice's `limit_by_prefs` (section 4.4.5:
/// "read from per-entity preferences (or scenario-wide for id=0)").
#[derive(Debug, Clone, Default)]
pub struct SliceLimitPrefs {
    by_entity: HashMap<ObjectId, SliceLimits>,
}

impl SliceLimitPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: ObjectId, limits: SliceLimits) {
        self.by_entity.insert(id, limits);
    }

    /// `id`'s own limits if set, else the scenario-wide entry, else
    /// unlimited.
    pub fn resolve(&self, id: ObjectId) -> SliceLimits {
        self.by_entity
            .get(&id)
            .or_else(|| self.by_entity.get(&SCENARIO_WIDE_ID))
            .copied()
            .unwrap_or_default()
    }
}
