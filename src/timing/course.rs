//! Course
//!
//! All tracks of a map and the entry point the host calls each tick.
//!
//! The host forwards trigger notifications and per-player movement
//! samples, then calls [`Course::tick`] once per simulation step to prune
//! departed players and collect the events produced since the last tick.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::config::TimerConfig;
use crate::timing::events::{TrackEvent, TrackListener};
use crate::timing::input::MovementSignals;
use crate::timing::run::PlayerId;
use crate::timing::track::{Track, TrackConfig, TrackError, TriggerId};

/// Track list of a map, as loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Tracks in declaration order
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

impl CourseConfig {
    /// Parse a course from JSON.
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Result of a course tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events produced since the previous tick, in firing order
    pub events: Vec<TrackEvent>,
    /// Runs dropped for departed players
    pub pruned: usize,
}

/// All tracks of a map.
#[derive(Debug, Default)]
pub struct Course {
    config: TimerConfig,
    tracks: Vec<Track>,
}

impl Course {
    /// Create an empty course.
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
        }
    }

    /// Build a course from a track list.
    ///
    /// Invalid tracks are logged and kept unwired so the remaining tracks
    /// still work.
    pub fn from_config(config: TimerConfig, course: CourseConfig) -> Self {
        let mut this = Self::new(config);
        for track in course.tracks {
            this.add_track(track);
        }
        info!(
            "Course loaded: {} tracks ({} bound), authority {:?}",
            this.tracks.len(),
            this.tracks.iter().filter(|t| t.is_bound()).count(),
            this.config.authority
        );
        this
    }

    /// Bind and add a track. Returns its index.
    pub fn add_track(&mut self, config: TrackConfig) -> usize {
        if self.track(&config.name).is_some() {
            warn!("Duplicate track name '{}'", config.name);
        }
        self.tracks.push(Track::bind(config));
        self.tracks.len() - 1
    }

    /// Track by name.
    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name() == name)
    }

    /// All tracks.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// First main (non-bonus) track.
    pub fn main_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.is_main_track())
    }

    /// Forward a trigger entry to every track.
    ///
    /// Ignored on a remote instance: only the host decides run outcomes.
    pub fn zone_entered(&mut self, trigger: TriggerId, player: PlayerId) {
        if !self.config.is_host() {
            return;
        }
        for track in &mut self.tracks {
            track.zone_entered(trigger, player);
        }
    }

    /// Forward a trigger exit to every track.
    pub fn zone_exited(&mut self, trigger: TriggerId, player: PlayerId) {
        if !self.config.is_host() {
            return;
        }
        for track in &mut self.tracks {
            track.zone_exited(trigger, player);
        }
    }

    /// Record one tick of a player's movement on every track.
    pub fn record_tick<S>(&mut self, player: &PlayerId, signals: &S)
    where
        S: MovementSignals + ?Sized,
    {
        if !self.config.is_host() {
            return;
        }
        let unit_scale = self.config.unit_scale;
        for track in &mut self.tracks {
            track.record_tick(player, signals, unit_scale);
        }
    }

    /// End-of-tick housekeeping.
    ///
    /// Drops runs of players for which `is_valid` returns false and drains
    /// the events every track produced.
    pub fn tick(&mut self, mut is_valid: impl FnMut(&PlayerId) -> bool) -> TickResult {
        let mut result = TickResult::default();
        for track in &mut self.tracks {
            result.pruned += track.prune(&mut is_valid);
            result.events.extend(track.take_events());
        }
        result
    }

    /// Drain pending events of every track into a listener.
    pub fn dispatch_events<L: TrackListener + ?Sized>(&mut self, listener: &mut L) {
        for track in &mut self.tracks {
            track.drain_events_into(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::events::TrackEventKind;
    use crate::timing::input::MovementSample;
    use crate::timing::run::RunData;
    use crate::timing::track::TrackType;

    fn player(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    const COURSE_JSON: &str = r#"{
        "tracks": [
            { "name": "main", "layout": { "type": "linear", "start": 1, "end": 2, "checkpoints": [3] } },
            { "name": "bonus", "layout": { "type": "bonus", "start": 10, "end": 11 } },
            { "name": "broken", "layout": { "type": "staged", "stages": [] } }
        ]
    }"#;

    fn course() -> Course {
        let config = CourseConfig::from_json(COURSE_JSON).unwrap();
        Course::from_config(TimerConfig::default(), config)
    }

    #[test]
    fn test_load_keeps_invalid_tracks_unwired() {
        let course = course();
        assert_eq!(course.tracks().len(), 3);
        assert!(course.track("main").unwrap().is_bound());
        assert!(!course.track("broken").unwrap().is_bound());
        assert_eq!(course.main_track().map(|t| t.track_type()), Some(TrackType::Linear));
    }

    #[test]
    fn test_tick_collects_events_in_order() {
        let mut course = course();
        let p = player(1);
        let sample = MovementSample::new(0.01);

        course.zone_entered(TriggerId(1), p);
        course.zone_exited(TriggerId(1), p);
        for _ in 0..3 {
            course.record_tick(&p, &sample);
        }
        course.zone_entered(TriggerId(3), p);
        course.zone_entered(TriggerId(2), p);

        let result = course.tick(|_| true);
        let kinds: Vec<_> = result.events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![TrackEventKind::Start, TrackEventKind::Checkpoint, TrackEventKind::Finish]
        );
        assert_eq!(result.events[2].run.timeline.len(), 3);
        assert!((result.events[2].run.elapsed() - 0.03).abs() < 1e-6);

        // Events are drained
        assert!(course.tick(|_| true).events.is_empty());
    }

    #[test]
    fn test_tracks_are_independent() {
        let mut course = course();
        let p = player(1);

        course.zone_exited(TriggerId(1), p);
        course.zone_exited(TriggerId(10), p);
        course.zone_entered(TriggerId(11), p);

        let result = course.tick(|_| true);
        let tracks: Vec<_> = result
            .events
            .iter()
            .map(|e| (e.run.track.as_str(), e.kind()))
            .collect();
        assert_eq!(
            tracks,
            vec![
                ("main", TrackEventKind::Start),
                ("bonus", TrackEventKind::Start),
                ("bonus", TrackEventKind::Finish),
            ]
        );
        assert!(course.track("main").unwrap().run(&p).unwrap().is_live());
    }

    #[test]
    fn test_remote_course_ignores_triggers() {
        let config = CourseConfig::from_json(COURSE_JSON).unwrap();
        let mut course = Course::from_config(TimerConfig::remote(), config);
        let p = player(1);

        course.zone_exited(TriggerId(1), p);
        course.record_tick(&p, &MovementSample::new(0.01));
        assert!(course.tick(|_| true).events.is_empty());
        assert!(course.track("main").unwrap().run(&p).is_none());
    }

    #[test]
    fn test_tick_prunes_departed_players() {
        let mut course = course();
        let a = player(1);
        let b = player(2);
        course.zone_exited(TriggerId(1), a);
        course.zone_exited(TriggerId(1), b);
        course.zone_exited(TriggerId(10), b);

        let result = course.tick(|p| *p != b);
        assert_eq!(result.pruned, 2);
        assert!(course.track("main").unwrap().run(&b).is_none());
        assert!(course.track("main").unwrap().run(&a).is_some());
    }

    #[test]
    fn test_dispatch_events_to_listener() {
        #[derive(Default)]
        struct Finishes(Vec<String>);

        impl TrackListener for Finishes {
            fn on_finish(&mut self, _player: PlayerId, run: &RunData) {
                self.0.push(run.track.clone());
            }
        }

        let mut course = course();
        let p = player(1);
        course.zone_exited(TriggerId(10), p);
        course.zone_entered(TriggerId(11), p);

        let mut listener = Finishes::default();
        course.dispatch_events(&mut listener);
        assert_eq!(listener.0, vec!["bonus".to_string()]);
        assert!(course.tick(|_| true).events.is_empty());
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            CourseConfig::from_json("{ \"tracks\": 3 }"),
            Err(TrackError::Parse(_))
        ));
    }
}
