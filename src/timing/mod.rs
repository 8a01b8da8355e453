//! Run Timing Module
//!
//! Everything between a trigger notification and a scored run.
//!
//! ## Module Structure
//!
//! - `input`: Movement signals read from the host each tick
//! - `frame`: Recorded frame and its persisted layout
//! - `sync`: Per-tick speed, jump, strafe and sync scoring
//! - `timeline`: Append-only frame recorder with playback
//! - `run`: Per-player run state and collections
//! - `track`: Track topology and the trigger state machine
//! - `events`: Lifecycle events and listeners
//! - `course`: All tracks of a map, driven by the host tick

pub mod input;
pub mod frame;
pub mod sync;
pub mod timeline;
pub mod run;
pub mod track;
pub mod events;
pub mod course;

// Re-export key types
pub use input::{InputButtons, MovementSample, MovementSignals};
pub use frame::Frame;
pub use timeline::{Pose, PoseTarget, Timeline, TimelineMode};
pub use run::{PlayerId, RunData, RunTracker};
pub use track::{
    StageConfig, Track, TrackConfig, TrackError, TrackLayout, TrackType, TriggerId, ZoneRole,
};
pub use events::{RunSummary, TrackEvent, TrackEventData, TrackEventKind, TrackListener};
pub use course::{Course, CourseConfig, TickResult};
