//! Timer Configuration
//!
//! Scoring constants and simulation rate, loadable from JSON.

use serde::{Serialize, Deserialize};

use crate::{TICK_RATE, UNIT_SCALE};

/// Which side of the simulation this instance runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Source of truth: handles triggers, records and scores runs.
    #[default]
    Host,
    /// Presentation only: never mutates runs, only plays recordings back.
    Remote,
}

/// Configuration for run timing and scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Simulation tick rate (Hz)
    pub tick_rate: u32,
    /// World units per speed unit; horizontal speed is divided by this
    pub unit_scale: f32,
    /// Host or remote side
    pub authority: Authority,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            unit_scale: UNIT_SCALE,
            authority: Authority::Host,
        }
    }
}

impl TimerConfig {
    /// Fixed step duration in seconds.
    pub fn tick_duration(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Configuration for a presentation-only client.
    pub fn remote() -> Self {
        Self {
            authority: Authority::Remote,
            ..Self::default()
        }
    }

    /// Whether this instance may mutate runs.
    #[inline]
    pub fn is_host(&self) -> bool {
        self.authority == Authority::Host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimerConfig::default();
        assert_eq!(config.tick_rate, TICK_RATE);
        assert_eq!(config.unit_scale, UNIT_SCALE);
        assert!(config.is_host());
        assert!((config.tick_duration() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TimerConfig::from_json(r#"{ "tick_rate": 64, "authority": "remote" }"#).unwrap();
        assert_eq!(config.tick_rate, 64);
        assert_eq!(config.unit_scale, UNIT_SCALE);
        assert_eq!(config.authority, Authority::Remote);
        assert!(!config.is_host());
    }

    #[test]
    fn test_zero_tick_rate_does_not_divide_by_zero() {
        let config = TimerConfig { tick_rate: 0, ..TimerConfig::default() };
        assert_eq!(config.tick_duration(), 1.0);
    }
}
