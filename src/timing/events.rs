//! Track Events
//!
//! Outward notifications of run lifecycle transitions, consumed by a
//! scoring or leaderboard collaborator.

use serde::{Serialize, Deserialize};
use crate::timing::run::{PlayerId, RunData};

/// Kind of lifecycle transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrackEventKind {
    /// Player left the start zone
    Start = 0,
    /// Player reached a checkpoint
    Checkpoint = 1,
    /// Player completed a stage
    Stage = 2,
    /// Player completed the track with valid ordering
    Finish = 3,
}

/// Event payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackEventData {
    /// Run started
    Start,
    /// Checkpoint reached
    Checkpoint {
        /// Checkpoint index, 0-based
        index: usize,
    },
    /// Stage completed
    Stage {
        /// Stage index, 0-based
        stage: usize,
    },
    /// Track finished
    Finish,
}

impl TrackEventData {
    /// Kind of this payload.
    pub fn kind(&self) -> TrackEventKind {
        match self {
            TrackEventData::Start => TrackEventKind::Start,
            TrackEventData::Checkpoint { .. } => TrackEventKind::Checkpoint,
            TrackEventData::Stage { .. } => TrackEventKind::Stage,
            TrackEventData::Finish => TrackEventKind::Finish,
        }
    }
}

/// A lifecycle event with the run it concerns.
///
/// `run` is the run as it was when the event fired. `Start` and
/// `Checkpoint` carry a frame-free snapshot (current frame and markers
/// only); `Finish` carries the full timeline and `Stage` the retired stage
/// run itself.
#[derive(Clone, Debug)]
pub struct TrackEvent {
    /// Player involved
    pub player: PlayerId,
    /// Event data
    pub data: TrackEventData,
    /// Run state at the time of the event
    pub run: RunData,
}

impl TrackEvent {
    /// Create run started event.
    pub fn start(player: PlayerId, run: &RunData) -> Self {
        Self {
            player,
            data: TrackEventData::Start,
            run: run.snapshot(),
        }
    }

    /// Create checkpoint reached event.
    pub fn checkpoint(player: PlayerId, index: usize, run: &RunData) -> Self {
        Self {
            player,
            data: TrackEventData::Checkpoint { index },
            run: run.snapshot(),
        }
    }

    /// Create stage completed event, taking ownership of the stage run.
    pub fn stage(player: PlayerId, stage: usize, run: RunData) -> Self {
        Self {
            player,
            data: TrackEventData::Stage { stage },
            run,
        }
    }

    /// Create track finished event.
    pub fn finish(player: PlayerId, run: &RunData) -> Self {
        Self {
            player,
            data: TrackEventData::Finish,
            run: run.clone(),
        }
    }

    /// Kind of this event.
    #[inline]
    pub fn kind(&self) -> TrackEventKind {
        self.data.kind()
    }

    /// Deliver this event to a listener.
    pub fn dispatch<L: TrackListener + ?Sized>(&self, listener: &mut L) {
        match self.data {
            TrackEventData::Start => listener.on_start(self.player, &self.run),
            TrackEventData::Checkpoint { index } => {
                listener.on_checkpoint(self.player, index, &self.run)
            }
            TrackEventData::Stage { stage } => listener.on_stage(self.player, stage, &self.run),
            TrackEventData::Finish => listener.on_finish(self.player, &self.run),
        }
    }

    /// Serializable summary of the run at event time.
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_run(&self.run)
    }
}

/// Observer of track lifecycle events. All methods default to no-ops.
pub trait TrackListener {
    /// A run started.
    fn on_start(&mut self, _player: PlayerId, _run: &RunData) {}

    /// A checkpoint was reached.
    fn on_checkpoint(&mut self, _player: PlayerId, _index: usize, _run: &RunData) {}

    /// A stage was completed.
    fn on_stage(&mut self, _player: PlayerId, _stage: usize, _run: &RunData) {}

    /// A track was finished.
    fn on_finish(&mut self, _player: PlayerId, _run: &RunData) {}
}

/// Compact result of a run, suitable for submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Track name
    pub track: String,
    /// Player id
    pub player: PlayerId,
    /// Stage index of the run
    pub stage: usize,
    /// Last checkpoint reached
    pub checkpoint: i32,
    /// Recorded ticks
    pub ticks: u32,
    /// Elapsed time (seconds)
    pub time: f32,
    /// Jumps performed
    pub jumps: u32,
    /// Strafes performed
    pub strafes: u32,
    /// Key sync percentage
    pub sync: u32,
    /// Velocity sync percentage
    pub velocity_sync: u32,
    /// Highest scaled speed reached
    pub top_speed: u32,
}

impl RunSummary {
    /// Summarize a run from its last recorded frame.
    pub fn from_run(run: &RunData) -> Self {
        let last = run.timeline.last_frame();

        Self {
            track: run.track.clone(),
            player: run.player,
            stage: run.stage,
            checkpoint: run.checkpoint,
            ticks: last.tick,
            time: last.time,
            jumps: last.jumps,
            strafes: last.strafes,
            sync: last.final_sync,
            velocity_sync: last.velocity_sync_percent(),
            top_speed: run.timeline.top_speed(),
        }
    }
}
