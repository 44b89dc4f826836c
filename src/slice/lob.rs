//! Accumulating line-of-bearing slice (section 4.4.4).
//!
//! Each [`LobRecord`] carries one stamp time and a vector of points taken at
//! that instant. `update(t)` composes the *current* merged update by
//! unioning points from every record inside a sliding `[t - maxDataSeconds,
//! t]` window, further capped to the most recent `maxDataPoints` records —
//! the more restrictive of the two constraints wins, since both must hold
//! simultaneously.

use crate::sample::{LobPoint, ObjectId};
use crate::slice::sorted::{Modifier, SortedSamples, Timestamped, Visitor};
use crate::slice::{SliceLimitPrefs, SliceLimits};
use crate::timestamp::Timestamp;

/// One stamped batch of bearing points.
#[derive(Debug, Clone, PartialEq)]
pub struct LobRecord {
    pub time: Timestamp,
    pub points: Vec<LobPoint>,
}

impl Timestamped for LobRecord {
    fn time(&self) -> Timestamp {
        self.time
    }
}

/// The merged "current" value: all points from every record the sliding
/// window currently admits.
#[derive(Debug, Clone, PartialEq)]
pub struct LobUpdate {
    pub time: Timestamp,
    pub points: Vec<LobPoint>,
}

pub struct LineOfBearingSlice {
    container: SortedSamples<LobRecord>,
    max_data_points: usize,
    max_data_seconds: f64,
    current: Option<LobUpdate>,
    dirty: bool,
    changed: bool,
}

const UNLIMITED_POINTS: usize = usize::MAX;
const UNLIMITED_SECONDS: f64 = f64::INFINITY;

impl LineOfBearingSlice {
    pub fn new() -> Self {
        Self {
            container: SortedSamples::new(),
            max_data_points: UNLIMITED_POINTS,
            max_data_seconds: UNLIMITED_SECONDS,
            current: None,
            dirty: false,
            changed: false,
        }
    }

    pub fn set_max_data_points(&mut self, n: usize) {
        self.max_data_points = if n == 0 { UNLIMITED_POINTS } else { n };
        self.dirty = true;
    }

    pub fn set_max_data_seconds(&mut self, seconds: f64) {
        self.max_data_seconds = if seconds > 0.0 {
            seconds
        } else {
            UNLIMITED_SECONDS
        };
        self.dirty = true;
    }

    /// Inserts `points` stamped at `time`. If a record at exactly `time`
    /// already exists, `points` are appended to it; otherwise a new record
    /// is inserted in sorted order.
    pub fn insert(&mut self, time: Timestamp, points: Vec<LobPoint>) {
        let idx = self.container.lower_bound_index(time);
        if let Some(existing) = self.container.get_mut(idx) {
            if existing.time() == time {
                existing.points.extend(points);
                self.dirty = true;
                return;
            }
        }
        self.container.insert(LobRecord { time, points });
        self.dirty = true;
    }

    pub fn num_items(&self) -> usize {
        self.container.len()
    }

    pub fn first_time(&self) -> Option<Timestamp> {
        self.container.first_time()
    }

    pub fn last_time(&self) -> Option<Timestamp> {
        self.container.last_time()
    }

    pub fn current(&self) -> Option<&LobUpdate> {
        self.current.as_ref()
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub fn limit_by_points(&mut self, n: i64) {
        self.container.limit_by_points(n);
        self.dirty = true;
    }

    pub fn limit_by_time(&mut self, seconds: f64) {
        self.container.limit_by_time(seconds);
        self.dirty = true;
    }

    pub fn lower_bound_index(&self, t: Timestamp) -> usize {
        self.container.lower_bound_index(t)
    }

    pub fn upper_bound_index(&self, t: Timestamp) -> usize {
        self.container.upper_bound_index(t)
    }

    /// Resolves `id`'s limits from `prefs` (falling back to scenario-wide)
    /// and applies them to the stored record container, time cap first,
    /// then point cap. Distinct from `set_max_data_points`/
    /// `set_max_data_seconds`, which size `update`'s sliding merge window
    /// rather than trim stored records.
    pub fn limit_by_prefs(&mut self, id: ObjectId, prefs: &SliceLimitPrefs) {
        let SliceLimits {
            max_points,
            max_seconds,
        } = prefs.resolve(id);
        self.limit_by_time(max_seconds);
        self.limit_by_points(max_points);
    }

    pub fn visit(&self, visitor: &mut dyn Visitor<LobRecord>) {
        for item in self.container.iter() {
            visitor.visit(item);
        }
    }

    pub fn modify(&mut self, modifier: &mut dyn Modifier<LobRecord>) {
        let mut items = self.container.drain_all();
        for item in &mut items {
            modifier.modify(item);
        }
        for item in items {
            self.container.insert(item);
        }
        self.dirty = true;
    }

    /// Removes every stored record except (optionally) the static record at
    /// `time == -1`. `current()` is left untouched until the next `update`.
    pub fn flush(&mut self, keep_static: bool) {
        let static_record = if keep_static {
            self.container
                .iter()
                .find(|r| crate::slice::is_static_time(r.time()))
                .cloned()
        } else {
            None
        };
        self.container.clear();
        if let Some(r) = static_record {
            self.container.insert(r);
        }
        self.dirty = true;
    }

    /// Removes stored records with `start < time <= end`.
    pub fn flush_range(&mut self, start: Timestamp, end: Timestamp) {
        let keep: Vec<LobRecord> = self
            .container
            .iter()
            .filter(|r| !(r.time() > start && r.time() <= end))
            .cloned()
            .collect();
        self.container.clear();
        for r in keep {
            self.container.insert(r);
        }
        self.dirty = true;
    }

    /// Recomputes `current` for time `t`.
    pub fn update(&mut self, t: Timestamp) {
        let window_start = if self.max_data_seconds.is_finite() {
            Some(t.minus_seconds(self.max_data_seconds))
        } else {
            None
        };

        let within_window: Vec<&LobRecord> = self
            .container
            .iter()
            .filter(|r| r.time <= t && window_start.map_or(true, |start| r.time >= start))
            .collect();

        let capped: &[&LobRecord] = if within_window.len() > self.max_data_points {
            &within_window[within_window.len() - self.max_data_points..]
        } else {
            &within_window[..]
        };

        let new_current = if capped.is_empty() {
            None
        } else {
            let mut points = Vec::new();
            for record in capped {
                points.extend(record.points.iter().copied());
            }
            Some(LobUpdate { time: t, points })
        };

        self.changed = self.current != new_current;
        self.current = new_current;
        self.dirty = false;
    }
}

impl Default for LineOfBearingSlice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(s: f64) -> Timestamp {
        Timestamp::new(2024, s).unwrap()
    }

    fn pts(n: usize) -> Vec<LobPoint> {
        (0..n)
            .map(|i| LobPoint {
                azimuth_deg: i as f64,
                elevation_deg: 0.0,
            })
            .collect()
    }

    #[test]
    fn s5_sliding_window_forward_then_backward() {
        let mut slice = LineOfBearingSlice::new();
        slice.set_max_data_seconds(3.0);
        slice.set_max_data_points(100);
        slice.insert(t(1.0), pts(2));
        slice.insert(t(3.0), pts(2));
        slice.insert(t(5.0), pts(2));

        slice.update(t(5.0));
        assert_eq!(slice.current().unwrap().points.len(), 4); // t=3,5

        slice.update(t(4.0));
        assert_eq!(slice.current().unwrap().points.len(), 4); // t=1,3
    }

    #[test]
    fn merge_on_identical_insert_time() {
        let mut slice = LineOfBearingSlice::new();
        slice.insert(t(1.0), pts(2));
        slice.insert(t(1.0), pts(3));
        assert_eq!(slice.num_items(), 1);
        slice.update(t(1.0));
        assert_eq!(slice.current().unwrap().points.len(), 5);
    }

    #[test]
    fn point_count_cap_is_more_restrictive_than_window() {
        let mut slice = LineOfBearingSlice::new();
        slice.set_max_data_seconds(100.0);
        slice.set_max_data_points(1);
        slice.insert(t(1.0), pts(2));
        slice.insert(t(2.0), pts(2));
        slice.update(t(2.0));
        assert_eq!(slice.current().unwrap().points.len(), 2); // only t=2's record
    }

    #[test]
    fn flush_keeps_static_sample() {
        // invariant 6
        let mut slice = LineOfBearingSlice::new();
        slice.insert(t(-1.0), pts(1));
        slice.insert(t(5.0), pts(2));
        slice.flush(true);
        assert_eq!(slice.num_items(), 1);
        slice.update(t(5.0));
        assert_eq!(slice.current().unwrap().points.len(), 1);
    }

    #[test]
    fn empty_window_yields_no_current() {
        let mut slice = LineOfBearingSlice::new();
        slice.set_max_data_seconds(1.0);
        slice.insert(t(10.0), pts(1));
        slice.update(t(0.0));
        assert!(slice.current().is_none());
    }
}
