// Copyright 2020 Kevin Reid under the terms of the MIT License as detailed
// in the accompanying file README.md or <http://opensource.org/licenses/MIT>.

//! The authoritative clock, observer broadcaster, and time-indexed data
//! slices behind a tactical simulation/visualization SDK's time-machine
//! subsystem: a single `Clock` drives every entity's `StateSlice`,
//! `CommandSlice`, and `LineOfBearingSlice` through a `DataStore`, with a
//! `FrameCoordinator` running the per-frame advance and a
//! `VisualizationClockProxy` letting a viewer detach from and re-lock to
//! the shared data clock.

pub mod clock;
pub mod consts;
pub mod data_store;
pub mod error;
pub mod frame;
pub mod interpolate;
pub mod listen;
pub mod sample;
pub mod slice;
pub mod timestamp;
pub mod vis_clock;

pub use clock::{Clock, Mode};
pub use data_store::DataStore;
pub use error::TimeMachineError;
pub use frame::FrameCoordinator;
pub use listen::{ModeObserver, ObserverHandle, TimeObserver};
pub use slice::{SliceLimitPrefs, SliceLimits};
pub use timestamp::{Direction, Timestamp};
pub use vis_clock::{LockObserver, VisualizationClockProxy};
