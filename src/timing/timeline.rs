//! Timeline Recorder
//!
//! Append-only sequence of [`Frame`]s for one run attempt, with record
//! and playback modes.
//!
//! Frames are stored in an owned `Vec` indexed by tick: the frame with
//! tick `t` lives at index `t - 1` (tick 0 is the implicit seed frame).

use serde::{Serialize, Deserialize};
use crate::core::vec3::Vec3;
use crate::timing::frame::Frame;
use crate::timing::input::MovementSignals;
use crate::timing::sync::next_frame;

/// What a timeline is currently doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineMode {
    /// Neither recording nor playing back
    #[default]
    Idle,
    /// Appending a frame per live tick
    Record,
    /// Stepping through recorded frames onto a target
    Playback,
}

/// Something a recorded pose can be written onto (ghost entities).
pub trait PoseTarget {
    /// Overwrite position and orientation.
    fn set_pose(&mut self, position: Vec3, angles: Vec3);
}

/// Minimal pose holder, useful for headless playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position
    pub position: Vec3,
    /// World orientation
    pub angles: Vec3,
}

impl PoseTarget for Pose {
    fn set_pose(&mut self, position: Vec3, angles: Vec3) {
        self.position = position;
        self.angles = angles;
    }
}

/// Write a frame's pose onto a target. Playback only, never scored.
#[inline]
pub fn apply_frame<T: PoseTarget + ?Sized>(target: &mut T, frame: &Frame) {
    target.set_pose(frame.position, frame.angles);
}

/// Recorded frames of one run attempt.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    mode: TimelineMode,
    live: bool,
    frames: Vec<Frame>,
    markers: Vec<Frame>,
    previous_yaw: Option<f32>,
    top_speed: u32,
    cursor: usize,
}

impl Timeline {
    /// Create an idle, empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an idle timeline from already recorded frames.
    pub fn from_frames(frames: Vec<Frame>, markers: Vec<Frame>) -> Self {
        Self {
            top_speed: frames.iter().map(|f| f.speed).max().unwrap_or(0),
            frames,
            markers,
            ..Self::default()
        }
    }

    /// Clear all recorded data and start recording live.
    ///
    /// The last observed yaw is kept so the first live tick is scored
    /// against the real previous view direction.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.markers.clear();
        self.top_speed = 0;
        self.cursor = 0;
        self.mode = TimelineMode::Record;
        self.live = true;
    }

    /// Set the yaw the next live tick is scored against.
    pub fn seed_yaw(&mut self, yaw: f32) {
        self.previous_yaw = Some(yaw);
    }

    /// Stop recording. Frames are kept.
    pub fn stop(&mut self) {
        self.live = false;
        self.mode = TimelineMode::Idle;
    }

    /// Gate whether ticks are appended while in record mode.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    /// Is this timeline recording the current run?
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live && self.mode == TimelineMode::Record
    }

    /// Current mode.
    #[inline]
    pub fn mode(&self) -> TimelineMode {
        self.mode
    }

    /// Observe one tick of movement.
    ///
    /// In record mode the view yaw is always tracked; a frame is appended
    /// only while live. Returns the appended frame, if any.
    pub fn record_tick<S>(&mut self, signals: &S, unit_scale: f32) -> Option<&Frame>
    where
        S: MovementSignals + ?Sized,
    {
        if self.mode != TimelineMode::Record {
            return None;
        }

        let yaw = signals.view_yaw();
        if !self.live {
            self.previous_yaw = Some(yaw);
            return None;
        }

        let frame = next_frame(&self.last_frame(), signals, self.previous_yaw, unit_scale);
        self.previous_yaw = Some(yaw);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            tick = frame.tick,
            speed = frame.speed,
            sync = frame.final_sync,
            "recorded frame"
        );

        self.top_speed = self.top_speed.max(frame.speed);
        self.frames.push(frame);
        self.frames.last()
    }

    /// Most recent frame, or the seed frame if nothing was recorded.
    #[inline]
    pub fn last_frame(&self) -> Frame {
        self.frames.last().copied().unwrap_or(Frame::ORIGIN)
    }

    /// Mark a checkpoint at the current frame and return the marker.
    pub fn checkpoint(&mut self) -> Frame {
        let marker = self.last_frame();
        self.markers.push(marker);
        marker
    }

    /// All recorded frames in tick order.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Highest scaled speed recorded so far.
    #[inline]
    pub fn top_speed(&self) -> u32 {
        self.top_speed
    }

    /// Copy without the frame history: keeps only the current frame, the
    /// markers and the counters.
    pub fn snapshot(&self) -> Self {
        Self {
            mode: self.mode,
            live: self.live,
            frames: self.frames.last().copied().into_iter().collect(),
            markers: self.markers.clone(),
            previous_yaw: self.previous_yaw,
            top_speed: self.top_speed,
            cursor: 0,
        }
    }

    /// Checkpoint marker frames in the order they were reached.
    #[inline]
    pub fn markers(&self) -> &[Frame] {
        &self.markers
    }

    /// Number of recorded frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// No frames recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame recorded at `tick`.
    pub fn frame_at_tick(&self, tick: u32) -> Option<&Frame> {
        let index = (tick as usize).checked_sub(1)?;
        self.frames.get(index).filter(|f| f.tick == tick)
    }

    /// Elapsed run time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.last_frame().time
    }

    /// Switch to playback from the first frame.
    pub fn play(&mut self) {
        self.mode = TimelineMode::Playback;
        self.live = false;
        self.cursor = 0;
    }

    /// Apply the next frame onto `target`.
    ///
    /// Returns `None` (and goes idle) once every frame was played.
    pub fn playback_step<T>(&mut self, target: &mut T) -> Option<Frame>
    where
        T: PoseTarget + ?Sized,
    {
        if self.mode != TimelineMode::Playback {
            return None;
        }
        match self.frames.get(self.cursor).copied() {
            Some(frame) => {
                apply_frame(target, &frame);
                self.cursor += 1;
                Some(frame)
            }
            None => {
                self.mode = TimelineMode::Idle;
                None
            }
        }
    }
}
