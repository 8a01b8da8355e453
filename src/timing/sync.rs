//! Sync and Strafe Scoring
//!
//! Pure per-tick computation of the next [`Frame`] from the previous one
//! and the current movement signals.
//!
//! ## Sync
//!
//! While airborne, every tick with a non-zero yaw change is a sync sample.
//! A sample is "good" when the strafe key held matches the turn direction
//! (left key while turning left, right key while turning right, never both),
//! and "good by velocity" when the lateral velocity component points the
//! same way as the turn. Ticks with zero yaw change are not samples at all.

use crate::core::vec3::Vec3;
use crate::timing::frame::Frame;
use crate::timing::input::{InputButtons, MovementSignals};

/// Normalize a yaw difference in degrees into `(-180, 180]`.
#[inline]
pub fn normalize_yaw_delta(delta: f32) -> f32 {
    let delta = delta % 360.0;
    if delta > 180.0 {
        delta - 360.0
    } else if delta <= -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

/// Horizontal speed in scaled units, truncated toward zero.
#[inline]
pub fn scaled_speed(velocity: Vec3, unit_scale: f32) -> u32 {
    if unit_scale <= 0.0 {
        return 0;
    }
    // `as` saturates and maps NaN to 0
    (velocity.horizontal().length() / unit_scale) as u32
}

/// Number of strafe key rising edges this tick.
///
/// Left and right are checked independently, so pressing both on the
/// same tick counts two strafes.
#[inline]
pub fn strafe_edges(buttons: InputButtons, old_buttons: InputButtons) -> u32 {
    buttons.pressed_since(old_buttons, InputButtons::MOVE_LEFT) as u32
        + buttons.pressed_since(old_buttons, InputButtons::MOVE_RIGHT) as u32
}

/// Compute the frame that follows `prev`.
///
/// `previous_yaw` is the view yaw seen on the last observed tick, `None`
/// if nothing was observed yet (the tick then contributes no sync sample).
pub fn next_frame<S>(
    prev: &Frame,
    signals: &S,
    previous_yaw: Option<f32>,
    unit_scale: f32,
) -> Frame
where
    S: MovementSignals + ?Sized,
{
    let mut frame = *prev;

    // 1. Timing and pose
    frame.tick = prev.tick + 1;
    frame.time = prev.time + signals.tick_duration();
    frame.position = signals.position();
    frame.angles = signals.angles();

    // 2. Speed
    frame.speed = scaled_speed(signals.velocity(), unit_scale);

    // 3. Jumps
    if signals.just_jumped() {
        frame.jumps += 1;
    }

    // 4. Strafes
    let buttons = signals.buttons();
    frame.strafes += strafe_edges(buttons, signals.old_buttons());

    // 5. Sync (airborne only)
    if !signals.on_ground() {
        if let Some(previous_yaw) = previous_yaw {
            let yaw_delta = normalize_yaw_delta(signals.view_yaw() - previous_yaw);
            let lateral = signals.velocity().z;

            if yaw_delta < 0.0 {
                frame.total_sync += 1;
                if buttons.only_left() {
                    frame.good_sync += 1;
                }
                if lateral < 0.0 {
                    frame.good_sync_vel += 1;
                }
            } else if yaw_delta > 0.0 {
                frame.total_sync += 1;
                if buttons.only_right() {
                    frame.good_sync += 1;
                }
                if lateral > 0.0 {
                    frame.good_sync_vel += 1;
                }
            }
        }
    }

    // 6. Final percentage
    frame.final_sync = Frame::sync_percent(frame.good_sync, frame.total_sync);

    frame
}
