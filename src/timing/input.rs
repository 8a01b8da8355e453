//! Movement Signals
//!
//! Per-tick input and physics signals read from the movement collaborator.
//! The scorer only depends on the [`MovementSignals`] capability, so any
//! movement controller variant can feed it.

use serde::{Serialize, Deserialize};
use crate::core::vec3::Vec3;

// =============================================================================
// BUTTONS
// =============================================================================

/// Input button bitmask for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputButtons(pub u32);

impl InputButtons {
    /// No buttons held
    pub const NONE: Self = Self(0);

    /// Jump bit
    pub const JUMP: u32 = 1 << 0;

    /// Duck bit
    pub const DUCK: u32 = 1 << 1;

    /// Move forward bit
    pub const MOVE_FORWARD: u32 = 1 << 2;

    /// Move back bit
    pub const MOVE_BACK: u32 = 1 << 3;

    /// Strafe left bit
    pub const MOVE_LEFT: u32 = 1 << 4;

    /// Strafe right bit
    pub const MOVE_RIGHT: u32 = 1 << 5;

    /// Create from raw bits.
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Check if every bit of `flag` is held.
    #[inline]
    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Same mask with `flag` set or cleared.
    #[inline]
    pub const fn with(self, flag: u32, pressed: bool) -> Self {
        if pressed {
            Self(self.0 | flag)
        } else {
            Self(self.0 & !flag)
        }
    }

    /// Rising edge: `flag` held now but not in `previous`.
    #[inline]
    pub const fn pressed_since(self, previous: Self, flag: u32) -> bool {
        self.contains(flag) && !previous.contains(flag)
    }

    /// Left strafe held without right.
    #[inline]
    pub const fn only_left(self) -> bool {
        self.contains(Self::MOVE_LEFT) && !self.contains(Self::MOVE_RIGHT)
    }

    /// Right strafe held without left.
    #[inline]
    pub const fn only_right(self) -> bool {
        self.contains(Self::MOVE_RIGHT) && !self.contains(Self::MOVE_LEFT)
    }
}

// =============================================================================
// SIGNAL CAPABILITY
// =============================================================================

/// Read-only per-tick signals the scorer needs from a movement controller.
pub trait MovementSignals {
    /// Standing on ground this tick.
    fn on_ground(&self) -> bool;

    /// Buttons held this tick.
    fn buttons(&self) -> InputButtons;

    /// Buttons held the previous tick.
    fn old_buttons(&self) -> InputButtons;

    /// World velocity.
    fn velocity(&self) -> Vec3;

    /// View yaw in degrees.
    fn view_yaw(&self) -> f32;

    /// A jump was performed this tick.
    fn just_jumped(&self) -> bool;

    /// World position of the entity.
    fn position(&self) -> Vec3;

    /// World orientation angles (pitch, yaw, roll) in degrees.
    fn angles(&self) -> Vec3;

    /// Fixed simulation step in seconds.
    fn tick_duration(&self) -> f32;
}

/// Plain-data snapshot of movement signals.
///
/// Built by the host each tick from whatever controller is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementSample {
    /// Ground contact this tick
    pub on_ground: bool,
    /// Buttons held this tick
    pub buttons: InputButtons,
    /// Buttons held last tick
    pub old_buttons: InputButtons,
    /// World velocity
    pub velocity: Vec3,
    /// View yaw (degrees)
    pub view_yaw: f32,
    /// Jump performed this tick
    pub just_jumped: bool,
    /// World position
    pub position: Vec3,
    /// World orientation
    pub angles: Vec3,
    /// Fixed step (seconds)
    pub tick_duration: f32,
}

impl MovementSample {
    /// Create a grounded, idle sample with the given tick duration.
    pub fn new(tick_duration: f32) -> Self {
        Self {
            on_ground: true,
            tick_duration,
            ..Self::default()
        }
    }

    /// Roll this sample forward to the next tick: current buttons become
    /// the old buttons and one-tick flags are cleared.
    pub fn advance(&mut self) {
        self.old_buttons = self.buttons;
        self.just_jumped = false;
    }
}

impl MovementSignals for MovementSample {
    fn on_ground(&self) -> bool {
        self.on_ground
    }

    fn buttons(&self) -> InputButtons {
        self.buttons
    }

    fn old_buttons(&self) -> InputButtons {
        self.old_buttons
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn view_yaw(&self) -> f32 {
        self.view_yaw
    }

    fn just_jumped(&self) -> bool {
        self.just_jumped
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn angles(&self) -> Vec3 {
        self.angles
    }

    fn tick_duration(&self) -> f32 {
        self.tick_duration
    }
}
