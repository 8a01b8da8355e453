//! Frame Model
//!
//! One recorded sample of a run plus its cumulative derived counters.

use serde::{Serialize, Deserialize};
use crate::core::vec3::Vec3;
use crate::core::hash::RunHasher;

/// A single recorded tick of a run.
///
/// Field order is the persisted record order and must not change:
/// `tick, position, angles, time, speed, jumps, strafes, total_sync,
/// good_sync, good_sync_vel, final_sync`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Tick index within the timeline (strictly +1 per recorded frame)
    pub tick: u32,
    /// World position
    pub position: Vec3,
    /// World orientation (degrees)
    pub angles: Vec3,
    /// Elapsed run time in seconds
    pub time: f32,
    /// Horizontal speed in scaled units
    pub speed: u32,
    /// Cumulative jump count
    pub jumps: u32,
    /// Cumulative strafe count
    pub strafes: u32,
    /// Airborne turning samples observed
    pub total_sync: u32,
    /// Samples where strafe key matched turn direction
    pub good_sync: u32,
    /// Samples where lateral velocity matched turn direction
    pub good_sync_vel: u32,
    /// `good_sync / total_sync` as a 0..=100 percentage
    pub final_sync: u32,
}

impl Frame {
    /// Encoded size in bytes: 8 four-byte ints, 7 four-byte floats.
    pub const SIZE: usize = 60;

    /// Seed frame every timeline starts from.
    pub const ORIGIN: Self = Self {
        tick: 0,
        position: Vec3::ZERO,
        angles: Vec3::ZERO,
        time: 0.0,
        speed: 0,
        jumps: 0,
        strafes: 0,
        total_sync: 0,
        good_sync: 0,
        good_sync_vel: 0,
        final_sync: 100,
    };

    /// Sync percentage for the given counters.
    ///
    /// 100 when no airborne turning was observed, floor otherwise.
    #[inline]
    pub fn sync_percent(good_sync: u32, total_sync: u32) -> u32 {
        if total_sync == 0 {
            100
        } else {
            ((good_sync as u64 * 100) / total_sync as u64) as u32
        }
    }

    /// Velocity-based sync percentage, same rounding as `final_sync`.
    pub fn velocity_sync_percent(&self) -> u32 {
        Self::sync_percent(self.good_sync_vel, self.total_sync)
    }

    /// Append the fixed-order little-endian record to `out`.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        out.reserve(Self::SIZE);
        out.extend_from_slice(&self.tick.to_le_bytes());
        for v in self.position.to_array().into_iter().chain(self.angles.to_array()) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&self.time.to_le_bytes());
        for v in [
            self.speed,
            self.jumps,
            self.strafes,
            self.total_sync,
            self.good_sync,
            self.good_sync_vel,
            self.final_sync,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Read a fixed-order record. Returns `None` if `bytes` is too short.
    pub fn read_le(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let word = |i: usize| -> [u8; 4] {
            let at = i * 4;
            [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
        };
        let int = |i: usize| u32::from_le_bytes(word(i));
        let float = |i: usize| f32::from_le_bytes(word(i));

        Some(Self {
            tick: int(0),
            position: Vec3::new(float(1), float(2), float(3)),
            angles: Vec3::new(float(4), float(5), float(6)),
            time: float(7),
            speed: int(8),
            jumps: int(9),
            strafes: int(10),
            total_sync: int(11),
            good_sync: int(12),
            good_sync_vel: int(13),
            final_sync: int(14),
        })
    }

    /// Feed this frame into a run hasher in record order.
    pub fn hash_into(&self, hasher: &mut RunHasher) {
        hasher.update_u32(self.tick);
        hasher.update_vec3(self.position);
        hasher.update_vec3(self.angles);
        hasher.update_f32(self.time);
        hasher.update_u32(self.speed);
        hasher.update_u32(self.jumps);
        hasher.update_u32(self.strafes);
        hasher.update_u32(self.total_sync);
        hasher.update_u32(self.good_sync);
        hasher.update_u32(self.good_sync_vel);
        hasher.update_u32(self.final_sync);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::ORIGIN
    }
}
