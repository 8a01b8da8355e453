//! Run State
//!
//! Per-player run progress and the collections that hold it.

use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::timing::timeline::Timeline;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Runs refer to players only through this id; the engine never owns
/// player entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a random id (UUID v4).
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex form for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

// =============================================================================
// RUN DATA
// =============================================================================

/// Progress of one player's attempt at a track or at one stage.
#[derive(Clone, Debug)]
pub struct RunData {
    /// Name of the track this run belongs to
    pub track: String,
    /// Player making the attempt
    pub player: PlayerId,
    /// Last checkpoint reached, -1 if none
    pub checkpoint: i32,
    /// Stage index (identity for stage runs, progress for staged track runs)
    pub stage: usize,
    /// Frames of this attempt
    pub timeline: Timeline,
}

impl RunData {
    /// Create a fresh, not yet recording run.
    pub fn new(player: PlayerId, track: impl Into<String>, stage: usize) -> Self {
        Self {
            track: track.into(),
            player,
            checkpoint: -1,
            stage,
            timeline: Timeline::new(),
        }
    }

    /// Discard progress and start recording again.
    pub fn reset(&mut self) {
        self.checkpoint = -1;
        self.timeline.reset();
    }

    /// Copy of this run whose timeline holds only the current frame.
    pub fn snapshot(&self) -> Self {
        Self {
            track: self.track.clone(),
            player: self.player,
            checkpoint: self.checkpoint,
            stage: self.stage,
            timeline: self.timeline.snapshot(),
        }
    }

    /// Is the attempt currently being recorded?
    #[inline]
    pub fn is_live(&self) -> bool {
        self.timeline.is_live()
    }

    /// Elapsed time of the attempt in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.timeline.elapsed()
    }
}

// =============================================================================
// RUN TRACKER
// =============================================================================

/// Collection of runs, looked up by linear scan.
///
/// Concurrent players per track are few, so a `Vec` beats a map here and
/// keeps insertion order stable for iteration.
#[derive(Clone, Debug, Default)]
pub struct RunTracker {
    runs: Vec<RunData>,
}

impl RunTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// First run belonging to `player`.
    pub fn get(&self, player: &PlayerId) -> Option<&RunData> {
        self.runs.iter().find(|r| r.player == *player)
    }

    /// First run belonging to `player`, mutably.
    pub fn get_mut(&mut self, player: &PlayerId) -> Option<&mut RunData> {
        self.runs.iter_mut().find(|r| r.player == *player)
    }

    /// Run of `player` for a specific stage.
    pub fn get_stage(&self, player: &PlayerId, stage: usize) -> Option<&RunData> {
        self.runs
            .iter()
            .find(|r| r.player == *player && r.stage == stage)
    }

    /// Run of `player`, created with `make` if missing.
    pub fn get_or_insert_with(
        &mut self,
        player: &PlayerId,
        make: impl FnOnce() -> RunData,
    ) -> &mut RunData {
        let index = match self.runs.iter().position(|r| r.player == *player) {
            Some(index) => index,
            None => {
                self.runs.push(make());
                self.runs.len() - 1
            }
        };
        &mut self.runs[index]
    }

    /// Run of `player` for `stage`, created with `make` if missing.
    pub fn get_stage_or_insert_with(
        &mut self,
        player: &PlayerId,
        stage: usize,
        make: impl FnOnce() -> RunData,
    ) -> &mut RunData {
        let index = match self
            .runs
            .iter()
            .position(|r| r.player == *player && r.stage == stage)
        {
            Some(index) => index,
            None => {
                self.runs.push(make());
                self.runs.len() - 1
            }
        };
        &mut self.runs[index]
    }

    /// Remove and return the run of `player` for `stage`.
    pub fn remove_stage(&mut self, player: &PlayerId, stage: usize) -> Option<RunData> {
        let index = self
            .runs
            .iter()
            .position(|r| r.player == *player && r.stage == stage)?;
        Some(self.runs.remove(index))
    }

    /// Keep only runs matching the predicate.
    pub fn retain(&mut self, f: impl FnMut(&RunData) -> bool) {
        self.runs.retain(f);
    }

    /// Drop runs whose player is no longer valid.
    ///
    /// Returns the number of runs removed. Idempotent.
    pub fn prune(&mut self, mut is_valid: impl FnMut(&PlayerId) -> bool) -> usize {
        let before = self.runs.len();
        self.runs.retain(|r| {
            let keep = is_valid(&r.player);
            if !keep {
                debug!("Dropping run on '{}' for departed player {}", r.track, r.player);
            }
            keep
        });
        before - self.runs.len()
    }

    /// Number of runs.
    #[inline]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// No runs tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Iterate runs mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RunData> {
        self.runs.iter_mut()
    }
}
