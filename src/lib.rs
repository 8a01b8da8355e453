//! # Bhop Timer
//!
//! Run timing and movement scoring for bunny-hop and surf maps.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        BHOP TIMER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec3.rs     - 3D float vector                           │
//! │  └── hash.rs     - SHA-256 run digests                       │
//! │                                                              │
//! │  timing/         - Run timing (host authoritative)           │
//! │  ├── input.rs    - Movement signals                          │
//! │  ├── frame.rs    - Recorded frame and persisted layout       │
//! │  ├── sync.rs     - Speed, strafe and sync scoring            │
//! │  ├── timeline.rs - Frame recorder and ghost playback         │
//! │  ├── run.rs      - Per-player run state                      │
//! │  ├── track.rs    - Track topology and trigger state machine  │
//! │  ├── events.rs   - Lifecycle events and listeners            │
//! │  └── course.rs   - All tracks of a map                       │
//! │                                                              │
//! │  replay/         - Persisted recordings                      │
//! │  └── recording.rs- Digest-protected timeline recordings      │
//! │                                                              │
//! │  config.rs       - Tick rate, unit scale, authority          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! Only the host mutates runs. A remote instance ignores triggers and
//! movement samples and only plays recordings back.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod config;
pub mod timing;
pub mod replay;

// Re-export commonly used types
pub use core::vec3::Vec3;
pub use config::{Authority, TimerConfig};
pub use timing::{
    Course, CourseConfig, Frame, MovementSample, MovementSignals, PlayerId, RunData,
    TrackConfig, TrackEvent, TrackListener, TriggerId,
};
pub use replay::TimelineRecording;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 100;

/// World units per speed unit (Hammer units to meters)
pub const UNIT_SCALE: f32 = 39.37;
