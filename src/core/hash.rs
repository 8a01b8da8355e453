//! Run Hashing
//!
//! Deterministic SHA-256 digests of recorded runs, used to detect
//! tampered or corrupted recordings before they are replayed or submitted.

use sha2::{Sha256, Digest};
use super::vec3::Vec3;

/// Hash output type (256 bits / 32 bytes)
pub type RunDigest = [u8; 32];

/// Deterministic hasher for run data.
///
/// Wraps SHA-256 with helpers for the recorded field types.
/// Order of updates is critical for determinism.
pub struct RunHasher {
    hasher: Sha256,
}

impl RunHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a timeline recording.
    pub fn for_recording() -> Self {
        Self::new(b"BHOP_TIMER_RECORDING_V1")
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 value (little-endian IEEE-754 bits).
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with a Vec3, `x, y, z` order.
    #[inline]
    pub fn update_vec3(&mut self, value: Vec3) {
        self.update_f32(value.x);
        self.update_f32(value.y);
        self.update_f32(value.z);
    }

    /// Update with a length-prefixed string.
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Update with a UUID (16 bytes).
    #[inline]
    pub fn update_uuid(&mut self, uuid: &[u8; 16]) {
        self.hasher.update(uuid);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> RunDigest {
        self.hasher.finalize().into()
    }
}
