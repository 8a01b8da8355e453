//! Replay Module
//!
//! Persisted run recordings and ghost playback.

pub mod recording;

pub use recording::{RecordingError, TimelineRecording, RECORDING_VERSION};
