//! The data store: every entity's slices, resolved together on each
//! `onSetTime` (section 4.5, control-flow step 3-4).
//!
//! Wiring a `DataStore` to a [`Clock`](crate::clock::Clock) is the caller's
//! job: wrap it in `Rc<RefCell<DataStore<P>>>` and register it as a time
//! observer (`impl TimeObserver for RefCell<DataStore<P>>` below), the same
//! indirection [`crate::vis_clock`] uses for its relays.

use std::collections::HashMap;

use crate::listen::TimeObserver;
use crate::sample::{
    BeamSample, GateSample, LaserSample, ObjectId, PlatformSample, ProjectorSample,
};
use crate::slice::command::{CommandSlice, PreferenceState};
use crate::slice::lob::LineOfBearingSlice;
use crate::slice::state::{Interpolation, StateEntry};
use crate::timestamp::Timestamp;

/// Owns every entity's slices. Generic over the command-slice's preference
/// type `P`, since that type is scenario-defined (section 4.4.3 only
/// specifies the merge contract, not concrete fields).
pub struct DataStore<P: PreferenceState> {
    platforms: HashMap<ObjectId, StateEntry<PlatformSample>>,
    beams: HashMap<ObjectId, StateEntry<BeamSample>>,
    gates: HashMap<ObjectId, StateEntry<GateSample>>,
    lasers: HashMap<ObjectId, StateEntry<LaserSample>>,
    projectors: HashMap<ObjectId, StateEntry<ProjectorSample>>,
    commands: HashMap<ObjectId, CommandSlice<P>>,
    lobs: HashMap<ObjectId, LineOfBearingSlice>,
}

impl<P: PreferenceState> DataStore<P> {
    pub fn new() -> Self {
        Self {
            platforms: HashMap::new(),
            beams: HashMap::new(),
            gates: HashMap::new(),
            lasers: HashMap::new(),
            projectors: HashMap::new(),
            commands: HashMap::new(),
            lobs: HashMap::new(),
        }
    }

    // ---- entity lifecycle (section 3: "Slices are created when an entity
    // is added; destroyed when the entity is removed") ----

    pub fn add_platform(&mut self, id: ObjectId, interpolation: Interpolation) {
        self.platforms.insert(id, StateEntry::new(interpolation));
    }

    pub fn add_beam(&mut self, id: ObjectId, interpolation: Interpolation) {
        self.beams.insert(id, StateEntry::new(interpolation));
    }

    pub fn add_gate(&mut self, id: ObjectId, interpolation: Interpolation) {
        self.gates.insert(id, StateEntry::new(interpolation));
    }

    pub fn add_laser(&mut self, id: ObjectId, interpolation: Interpolation) {
        self.lasers.insert(id, StateEntry::new(interpolation));
    }

    pub fn add_projector(&mut self, id: ObjectId, interpolation: Interpolation) {
        self.projectors.insert(id, StateEntry::new(interpolation));
    }

    pub fn add_commands(&mut self, id: ObjectId, reset_state: P) {
        self.commands
            .insert(id, CommandSlice::with_reset_state(reset_state));
    }

    pub fn add_lob(&mut self, id: ObjectId) {
        self.lobs.insert(id, LineOfBearingSlice::new());
    }

    /// Removes every slice owned by `id`, across all five state kinds plus
    /// the command- and LOB-slices. A no-op for kinds the entity never had.
    pub fn remove_entity(&mut self, id: ObjectId) {
        self.platforms.remove(&id);
        self.beams.remove(&id);
        self.gates.remove(&id);
        self.lasers.remove(&id);
        self.projectors.remove(&id);
        self.commands.remove(&id);
        self.lobs.remove(&id);
    }

    // ---- accessors ----

    pub fn platform(&mut self, id: ObjectId) -> Option<&mut StateEntry<PlatformSample>> {
        self.platforms.get_mut(&id)
    }

    pub fn beam(&mut self, id: ObjectId) -> Option<&mut StateEntry<BeamSample>> {
        self.beams.get_mut(&id)
    }

    pub fn gate(&mut self, id: ObjectId) -> Option<&mut StateEntry<GateSample>> {
        self.gates.get_mut(&id)
    }

    pub fn laser(&mut self, id: ObjectId) -> Option<&mut StateEntry<LaserSample>> {
        self.lasers.get_mut(&id)
    }

    pub fn projector(&mut self, id: ObjectId) -> Option<&mut StateEntry<ProjectorSample>> {
        self.projectors.get_mut(&id)
    }

    pub fn commands(&mut self, id: ObjectId) -> Option<&mut CommandSlice<P>> {
        self.commands.get_mut(&id)
    }

    pub fn lob(&mut self, id: ObjectId) -> Option<&mut LineOfBearingSlice> {
        self.lobs.get_mut(&id)
    }

    /// Re-resolves every slice's current sample for `t` (section 4.5: "the
    /// data store iterates every slice, each of which re-resolves its
    /// current sample"). Atomic from an observer's perspective: this is the
    /// only place slices are updated, so a reader never observes a mix of
    /// old and new times across slices.
    pub fn update(&mut self, t: Timestamp) {
        for entry in self.platforms.values_mut() {
            entry.update(t);
        }
        for entry in self.beams.values_mut() {
            entry.update(t);
        }
        for entry in self.gates.values_mut() {
            entry.update(t);
        }
        for entry in self.lasers.values_mut() {
            entry.update(t);
        }
        for entry in self.projectors.values_mut() {
            entry.update(t);
        }
        for slice in self.commands.values_mut() {
            slice.update(t);
        }
        for slice in self.lobs.values_mut() {
            slice.update(t);
        }
    }

    /// Clears every slice's `changed` flag. Per section 4.4.1, this is done
    /// once at the start of a frame by the coordinator, before `idle()` (and
    /// therefore before this store's own `update`) runs.
    pub fn clear_changed(&mut self) {
        for entry in self.platforms.values_mut() {
            entry.slice.clear_changed();
        }
        for entry in self.beams.values_mut() {
            entry.slice.clear_changed();
        }
        for entry in self.gates.values_mut() {
            entry.slice.clear_changed();
        }
        for entry in self.lasers.values_mut() {
            entry.slice.clear_changed();
        }
        for entry in self.projectors.values_mut() {
            entry.slice.clear_changed();
        }
        for slice in self.commands.values_mut() {
            slice.clear_changed();
        }
        for slice in self.lobs.values_mut() {
            slice.clear_changed();
        }
    }
}

impl<P: PreferenceState> Default for DataStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lets a `DataStore` be registered directly as a clock's time-observer via
/// `Rc::new(RefCell::new(data_store))`, per the control flow in section 2:
/// "the data-store subscriber to `onSetTime` calls `dataStore.update(t)`".
impl<P: PreferenceState> TimeObserver for std::cell::RefCell<DataStore<P>> {
    fn on_set_time(&self, time: Timestamp, _is_jump: bool) {
        self.borrow_mut().update(time);
    }
}
