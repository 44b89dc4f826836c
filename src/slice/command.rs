//! Command-slice: sparse, accumulated preference mutations (section 4.4.3).
//!
//! Unlike a state-slice, the "current" value here is not one stored record
//! but the fold of every command with `time <= t` since the last reset
//! point. A command's repeated fields follow a specific merge rule: an
//! empty repeated field means the command didn't touch that preference, a
//! non-empty one replaces the cached field wholly (never appends).

use crate::sample::ObjectId;
use crate::slice::sorted::{Modifier, SortedSamples, Timestamped, Visitor};
use crate::slice::{SliceLimitPrefs, SliceLimits};
use crate::timestamp::Timestamp;

/// The accumulated preference state a command-slice publishes. Implementors
/// define their own repeated-field merge rule in [`Self::apply_command`].
pub trait PreferenceState: Clone + Default {
    /// Folds `command`'s fields onto `self` in place, per the repeated-field
    /// rule: a field left empty in `command` is untouched; a non-empty one
    /// replaces `self`'s field entirely.
    fn apply_command(&mut self, command: &Self);
}

/// One sparse command: a timestamp plus the fields it patches.
#[derive(Debug, Clone)]
pub struct CommandRecord<P> {
    pub time: Timestamp,
    pub patch: P,
}

impl<P> Timestamped for CommandRecord<P> {
    fn time(&self) -> Timestamp {
        self.time
    }
}

/// A per-entity sequence of sparse commands, with a derived accumulated
/// preference state valid for the last-queried time.
pub struct CommandSlice<P: PreferenceState> {
    container: SortedSamples<CommandRecord<P>>,
    /// The state commands fold onto after a backward-time reset. Beam/gate
    /// specializations pass the entity's own captured defaults here instead
    /// of `P::default()` (section 9: "this reset uses the entity-specific
    /// defaults... captured at slice construction").
    reset_state: P,
    cached_state: P,
    last_update_time: Option<Timestamp>,
    earliest_insert_since_update: Option<Timestamp>,
    dirty: bool,
    changed: bool,
}

impl<P: PreferenceState> CommandSlice<P> {
    /// Constructs a command-slice that resets to `P::default()` on
    /// backward-time jumps (the generic rule; section 4.4.3).
    pub fn new() -> Self {
        Self::with_reset_state(P::default())
    }

    /// Constructs a command-slice that resets to `reset_state` on
    /// backward-time jumps, for entity kinds (beam, gate) whose defaults
    /// are entity-specific rather than global.
    pub fn with_reset_state(reset_state: P) -> Self {
        Self {
            container: SortedSamples::new(),
            cached_state: reset_state.clone(),
            reset_state,
            last_update_time: None,
            earliest_insert_since_update: None,
            dirty: false,
            changed: false,
        }
    }

    pub fn insert(&mut self, record: CommandRecord<P>) {
        self.earliest_insert_since_update = Some(match self.earliest_insert_since_update {
            Some(earliest) if earliest <= record.time => earliest,
            _ => record.time,
        });
        self.container.insert(record);
        self.dirty = true;
    }

    pub fn num_items(&self) -> usize {
        self.container.len()
    }

    pub fn current(&self) -> &P {
        &self.cached_state
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
    /// and applies them, time cap first, then point cap.
    pub fn limit_by_prefs(&mut self, id: ObjectId, prefs: &SliceLimitPrefs) {
        let SliceLimits {
            max_points,
            max_seconds,
        } = prefs.resolve(id);
        self.limit_by_time(max_seconds);
        self.limit_by_points(max_points);
    }

    pub fn visit(&self, visitor: &mut dyn Visitor<CommandRecord<P>>) {
        for item in self.container.iter() {
            visitor.visit(item);
        }
    }

    pub fn modify(&mut self, modifier: &mut dyn Modifier<CommandRecord<P>>) {
        let mut items = self.container.drain_all();
        for item in &mut items {
            modifier.modify(item);
        }
        for item in items {
            self.container.insert(item);
        }
        self.dirty = true;
    }

    /// Removes every stored command except (optionally) the static command
    /// at `time == -1`. `current()` is left untouched until the next
    /// `update`.
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

    /// Removes stored commands with `start < time <= end`.
    pub fn flush_range(&mut self, start: Timestamp, end: Timestamp) {
        let keep: Vec<CommandRecord<P>> = self
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

    /// Resolves the accumulated preference state for `t`. Returns the
    /// published state; callers (the data store) are responsible for
    /// writing it onto the entity in one transaction, per section 4.4.3's
    /// "one transaction per update call".
    pub fn update(&mut self, t: Timestamp) -> &P {
        let ran_backward = self.last_update_time.map_or(false, |last| t < last);

        let mut start_time = self.last_update_time.unwrap_or(Timestamp::MIN_TIME_STAMP);
        if let Some(earliest) = self.earliest_insert_since_update {
            if earliest < start_time {
                start_time = earliest;
            }
        }

        if ran_backward {
            self.cached_state = self.reset_state.clone();
            start_time = Timestamp::MIN_TIME_STAMP;
        }

        let mut changed = false;
        for record in self.container.iter() {
            if record.time > start_time && record.time <= t {
                self.cached_state.apply_command(&record.patch);
                changed = true;
            }
        }

        self.last_update_time = Some(t);
        self.earliest_insert_since_update = None;
        self.dirty = false;
        self.changed = changed;
        &self.cached_state
    }
}

impl<P: PreferenceState> Default for CommandSlice<P> {
    fn default() -> Self {
        Self::new()
    }
}
