//! Core primitives.
//!
//! Value types shared by the timing engine and the recording format.

pub mod vec3;
pub mod hash;

// Re-export core types
pub use vec3::Vec3;
pub use hash::{RunDigest, RunHasher};
