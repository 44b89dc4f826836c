//! State-slice: platform/beam/gate/laser/projector (section 4.4.2).

use crate::consts::TIME_EQ_EPSILON;
use crate::interpolate::{Linear, LinearBlend, NearestNeighbor};
use crate::sample::{ObjectId, StateSample};
use crate::slice::sorted::{Modifier, SortedSamples, Timestamped, Visitor};
use crate::slice::{SliceLimitPrefs, SliceLimits};
use crate::timestamp::Timestamp;

impl<S: StateSample> Timestamped for S {
    fn time(&self) -> Timestamp {
        StateSample::time(self)
    }
}

/// Which interpolation strategy (if any) a [`StateSlice::update`] call used
/// to produce its current sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    /// No sample exists yet at or before the queried time.
    NoData,
    /// The current sample is a stored sample, not interpolated.
    Exact,
    /// The current sample was materialized by an interpolator.
    Interpolated,
}

/// A per-entity, per-stream time-indexed sequence of state samples, with a
/// derived "current" value for the last-queried time.
pub struct StateSlice<S: StateSample> {
    container: SortedSamples<S>,
    current: Option<S>,
    resolve_kind: ResolveKind,
    dirty: bool,
    changed: bool,
}

impl<S: StateSample> StateSlice<S> {
    pub fn new() -> Self {
        Self {
            container: SortedSamples::new(),
            current: None,
            resolve_kind: ResolveKind::NoData,
            dirty: false,
            changed: false,
        }
    }

    pub fn insert(&mut self, sample: S) {
        self.container.insert(sample);
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

    pub fn delta_time(&self, t: Timestamp) -> Option<f64> {
        self.last_time().map(|last| t.seconds_since(&last))
    }

    pub fn current(&self) -> Option<&S> {
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

    pub fn lower_bound_index(&self, t: Timestamp) -> usize {
        self.container.lower_bound_index(t)
    }

    pub fn upper_bound_index(&self, t: Timestamp) -> usize {
        self.container.upper_bound_index(t)
    }

    pub fn limit_by_points(&mut self, n: i64) {
        self.container.limit_by_points(n);
        self.dirty = true;
    }

    pub fn limit_by_time(&mut self, seconds: f64) {
        self.container.limit_by_time(seconds);
        self.dirty = true;
    }

    /// Resolves `id`'s limits from `prefs` (falling back to scenario-wide)
    /// and applies them, time cap first, then point cap (section 4.4.5's
    /// "application order").
    pub fn limit_by_prefs(&mut self, id: ObjectId, prefs: &SliceLimitPrefs) {
        let SliceLimits {
            max_points,
            max_seconds,
        } = prefs.resolve(id);
        self.limit_by_time(max_seconds);
        self.limit_by_points(max_points);
    }

    pub fn visit(&self, visitor: &mut dyn Visitor<S>) {
        for item in self.container.iter() {
            visitor.visit(item);
        }
    }

    /// Resolves `current` for time `t` without interpolation: current is
    /// always the last stored sample with `time <= t` (section 4.4.2, the
    /// "no interpolator" branch).
    pub fn update(&mut self, t: Timestamp) {
        self.update_impl(t, None::<fn(Timestamp, &S, &S) -> S>);
        self.dirty = false;
    }

    fn update_impl(&mut self, t: Timestamp, interpolate: Option<impl Fn(Timestamp, &S, &S) -> S>) {
        let n = self.container.len();
        let prev_current_time = self.current.as_ref().map(StateSample::time);

        if n == 0 {
            self.current = None;
            self.resolve_kind = ResolveKind::NoData;
            self.changed = prev_current_time.is_some();
            return;
        }

        let it = self.container.upper_bound_index(t);

        let (new_current, kind) = if it == n {
            // it == end(): current = last sample, not interpolated.
            (self.container.get(n - 1).cloned(), ResolveKind::Exact)
        } else if it == 0 {
            // Nothing at or before t.
            let first_time = self.container.get(0).unwrap().time();
            if t < first_time {
                (None, ResolveKind::NoData)
            } else {
                (self.container.get(0).cloned(), ResolveKind::Exact)
            }
        } else {
            let next = self.container.get(it).unwrap();
            let prev = self.container.get(it - 1).unwrap();
            if (t.seconds_since(&prev.time())).abs() < TIME_EQ_EPSILON {
                (Some(prev.clone()), ResolveKind::Exact)
            } else if let Some(ref interpolate) = interpolate {
                (Some(interpolate(t, prev, next)), ResolveKind::Interpolated)
            } else {
                (Some(prev.clone()), ResolveKind::Exact)
            }
        };

        let changed = match (&self.current, &new_current) {
            (None, None) => false,
            (None, Some(_)) | (Some(_), None) => true,
            (Some(old), Some(new)) => old.time() != new.time() || kind != self.resolve_kind,
        };

        self.current = new_current;
        self.resolve_kind = kind;
        self.changed = changed;
    }

    /// Resolves `current` for time `t`, using `Linear` interpolation between
    /// the bracketing samples when `t` falls strictly between two stored
    /// samples.
    pub fn update_linear(&mut self, t: Timestamp)
    where
        S: LinearBlend,
    {
        self.update_impl(t, Some(Linear::interpolate::<S>));
        self.dirty = false;
    }

    /// Resolves `current` for time `t` using [`NearestNeighbor`]
    /// interpolation.
    pub fn update_nearest(&mut self, t: Timestamp) {
        self.update_impl(t, Some(NearestNeighbor::interpolate::<S>));
        self.dirty = false;
    }

    /// Removes every stored sample except (optionally) the static sample at
    /// `time == -1`. `current` is left untouched until the next `update`.
    pub fn flush(&mut self, keep_static: bool) {
        let static_sample = if keep_static {
            self.container
                .iter()
                .find(|s| crate::slice::is_static_time(s.time()))
                .cloned()
        } else {
            None
        };
        self.container.clear();
        if let Some(s) = static_sample {
            self.container.insert(s);
        }
        self.dirty = true;
    }

    /// Removes stored samples with `start < time <= end`.
    pub fn flush_range(&mut self, start: Timestamp, end: Timestamp) {
        let keep: Vec<S> = self
            .container
            .iter()
            .filter(|s| !(s.time() > start && s.time() <= end))
            .cloned()
            .collect();
        self.container.clear();
        for s in keep {
            self.container.insert(s);
        }
        self.dirty = true;
    }

    pub fn modify(&mut self, modifier: &mut dyn Modifier<S>) {
        let mut items = self.container.drain_all();
        for item in &mut items {
            modifier.modify(item);
        }
        for item in items {
            self.container.insert(item);
        }
        self.dirty = true;
    }
}

impl<S: StateSample> Default for StateSlice<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of [`StateSlice`]'s three `update*` variants an entity's slice
/// should use, chosen once at registration (section 4.4.2: "update(t,
/// interpolator?)" — the interpolator is a per-slice-kind choice, not a
/// per-call one, in this crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the last sample at-or-before `t`; never materialize a blend.
    None,
    Linear,
    Nearest,
}

/// Pairs a [`StateSlice`] with the interpolation strategy the data store
/// should use when resolving it each frame.
pub struct StateEntry<S: LinearBlend> {
    pub slice: StateSlice<S>,
    pub interpolation: Interpolation,
}

impl<S: LinearBlend> StateEntry<S> {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            slice: StateSlice::new(),
            interpolation,
        }
    }

    pub fn update(&mut self, t: Timestamp) {
        match self.interpolation {
            Interpolation::None => self.slice.update(t),
            Interpolation::Linear => self.slice.update_linear(t),
            Interpolation::Nearest => self.slice.update_nearest(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::PlatformSample;
    use cgmath::Vector3;
    use pretty_assertions::assert_eq;

    fn t(s: f64) -> Timestamp {
        Timestamp::new(2024, s).unwrap()
    }

    fn sample(time: f64, x: f64) -> PlatformSample {
        PlatformSample {
            time: t(time),
            position: Vector3::new(x, 0.0, 0.0),
            orientation: Vector3::new(0.0, 0.0, 0.0),
            velocity: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    #[test]
    fn no_data_before_first_sample() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(5.0, 1.0));
        slice.update(t(1.0));
        assert!(slice.current().is_none());
    }

    #[test]
    fn exact_match_without_interpolator() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(0.0, 0.0));
        slice.insert(sample(10.0, 100.0));
        slice.update(t(10.0));
        assert_eq!(slice.current().unwrap().position.x, 100.0);
        // invariant 2: inserting r then updating at r.time gives current == r
        let r = sample(10.0, 100.0);
        assert_eq!(*slice.current().unwrap(), r);
    }

    #[test]
    fn holds_last_before_next_without_interpolator() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(0.0, 0.0));
        slice.insert(sample(10.0, 100.0));
        slice.update(t(5.0));
        assert_eq!(slice.current().unwrap().position.x, 0.0);
    }

    #[test]
    fn interpolates_linearly_between_samples() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(0.0, 0.0));
        slice.insert(sample(10.0, 100.0));
        slice.update_linear(t(5.0));
        assert_eq!(slice.current().unwrap().position.x, 50.0);
    }

    #[test]
    fn past_last_sample_holds_last() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(0.0, 0.0));
        slice.insert(sample(10.0, 100.0));
        slice.update_linear(t(50.0));
        assert_eq!(slice.current().unwrap().position.x, 100.0);
    }

    #[test]
    fn monotonic_updates_never_regress_current_time() {
        // invariant 1
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        for i in 0..10 {
            slice.insert(sample(i as f64, i as f64));
        }
        slice.update(t(3.0));
        slice.update(t(7.0));
        assert!(slice.current().unwrap().time <= t(7.0));
    }

    #[test]
    fn changed_flag_set_only_on_transition() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(0.0, 0.0));
        slice.insert(sample(10.0, 100.0));
        slice.update(t(1.0));
        assert!(slice.has_changed());
        slice.clear_changed();
        slice.update(t(1.0));
        assert!(!slice.has_changed());
    }

    #[test]
    fn flush_keeps_static_sample() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        slice.insert(sample(-1.0, 42.0));
        slice.insert(sample(5.0, 1.0));
        slice.flush(true);
        assert_eq!(slice.num_items(), 1);
        slice.update(t(5.0));
        assert_eq!(slice.current().unwrap().position.x, 42.0);
    }

    #[test]
    fn limit_by_points_keeps_at_most_n() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        for i in 0..5 {
            slice.insert(sample(i as f64, i as f64));
        }
        slice.limit_by_points(2);
        assert!(slice.num_items() <= 2);
    }

    #[test]
    fn limit_by_prefs_falls_back_to_scenario_wide() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        for i in 0..5 {
            slice.insert(sample(i as f64, i as f64));
        }
        let mut prefs = SliceLimitPrefs::new();
        prefs.set(
            crate::sample::SCENARIO_WIDE_ID,
            SliceLimits {
                max_points: 2,
                max_seconds: 0.0,
            },
        );
        // entity 42 has no entry of its own, so the scenario-wide cap applies
        slice.limit_by_prefs(42, &prefs);
        assert!(slice.num_items() <= 2);
    }

    #[test]
    fn limit_by_prefs_prefers_entity_specific_over_scenario_wide() {
        let mut slice: StateSlice<PlatformSample> = StateSlice::new();
        for i in 0..5 {
            slice.insert(sample(i as f64, i as f64));
        }
        let mut prefs = SliceLimitPrefs::new();
        prefs.set(
            crate::sample::SCENARIO_WIDE_ID,
            SliceLimits {
                max_points: 1,
                max_seconds: 0.0,
            },
        );
        prefs.set(
            7,
            SliceLimits {
                max_points: 3,
                max_seconds: 0.0,
            },
        );
        slice.limit_by_prefs(7, &prefs);
        assert_eq!(slice.num_items(), 3);
    }
}
