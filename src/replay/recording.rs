//! Timeline Recordings
//!
//! A finished run packaged for storage or submission: the frames, the
//! checkpoint markers and a SHA-256 digest binding them to a player and
//! track. Decoding verifies the digest, so a recording that loads is the
//! recording that was made.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{RunDigest, RunHasher};
use crate::timing::frame::Frame;
use crate::timing::run::{PlayerId, RunData};
use crate::timing::timeline::Timeline;

/// Current recording format version.
pub const RECORDING_VERSION: u32 = 1;

/// Errors loading or saving a recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Binary encoding failed
    #[error("failed to encode recording: {0}")]
    Encode(bincode::Error),

    /// Binary decoding failed
    #[error("failed to decode recording: {0}")]
    Decode(bincode::Error),

    /// Written by an incompatible format version
    #[error("recording version {found} is not supported (expected {expected})")]
    VersionMismatch {
        /// Version in the recording
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Contents do not match the stored digest
    #[error("recording digest mismatch")]
    DigestMismatch,

    /// Raw frame block length is not a whole number of frames
    #[error("raw frame data is {0} bytes, not a multiple of {size}", size = Frame::SIZE)]
    Truncated(usize),
}

/// A recorded run with its integrity digest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineRecording {
    /// Format version
    pub version: u32,
    /// Player who made the run
    pub player: PlayerId,
    /// Track the run was made on
    pub track: String,
    /// Frames in tick order
    pub frames: Vec<Frame>,
    /// Checkpoint markers in the order reached
    pub markers: Vec<Frame>,
    /// SHA-256 over everything above
    pub digest: RunDigest,
}

impl TimelineRecording {
    /// Capture a run.
    pub fn from_run(run: &RunData) -> Self {
        Self::new(
            run.player,
            run.track.clone(),
            run.timeline.frames().to_vec(),
            run.timeline.markers().to_vec(),
        )
    }

    /// Build a recording and compute its digest.
    pub fn new(player: PlayerId, track: String, frames: Vec<Frame>, markers: Vec<Frame>) -> Self {
        let mut recording = Self {
            version: RECORDING_VERSION,
            player,
            track,
            frames,
            markers,
            digest: [0u8; 32],
        };
        recording.digest = recording.compute_digest();
        recording
    }

    /// Digest of the recorded contents.
    pub fn compute_digest(&self) -> RunDigest {
        let mut hasher = RunHasher::for_recording();
        hasher.update_u32(self.version);
        hasher.update_uuid(self.player.as_bytes());
        hasher.update_str(&self.track);

        hasher.update_u32(self.frames.len() as u32);
        for frame in &self.frames {
            frame.hash_into(&mut hasher);
        }
        hasher.update_u32(self.markers.len() as u32);
        for marker in &self.markers {
            marker.hash_into(&mut hasher);
        }

        hasher.finalize()
    }

    /// Check the stored digest against the contents.
    pub fn verify(&self) -> Result<(), RecordingError> {
        if self.version != RECORDING_VERSION {
            return Err(RecordingError::VersionMismatch {
                found: self.version,
                expected: RECORDING_VERSION,
            });
        }
        if self.compute_digest() != self.digest {
            return Err(RecordingError::DigestMismatch);
        }
        Ok(())
    }

    /// Short hex form of the digest for logs.
    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest[..8])
    }

    /// Total run time in seconds.
    pub fn time(&self) -> f32 {
        self.frames.last().map(|f| f.time).unwrap_or(0.0)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordingError> {
        bincode::serialize(self).map_err(RecordingError::Encode)
    }

    /// Deserialize from binary and verify.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RecordingError> {
        let recording: Self = bincode::deserialize(data).map_err(RecordingError::Decode)?;
        recording.verify()?;
        Ok(recording)
    }

    /// Frames as consecutive fixed-size little-endian records.
    pub fn frames_le(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.frames.len() * Frame::SIZE);
        for frame in &self.frames {
            frame.write_le(&mut out);
        }
        out
    }

    /// Parse consecutive fixed-size frame records.
    pub fn parse_frames_le(bytes: &[u8]) -> Result<Vec<Frame>, RecordingError> {
        if bytes.len() % Frame::SIZE != 0 {
            return Err(RecordingError::Truncated(bytes.len()));
        }
        Ok(bytes
            .chunks_exact(Frame::SIZE)
            .filter_map(Frame::read_le)
            .collect())
    }

    /// Turn the recording into a timeline ready for ghost playback.
    pub fn into_timeline(self) -> Timeline {
        let mut timeline = Timeline::from_frames(self.frames, self.markers);
        timeline.play();
        timeline
    }
}
