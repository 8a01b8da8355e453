//! Track Topology and Trigger State Machine
//!
//! Binds zone trigger notifications to run lifecycle transitions for the
//! three track layouts:
//!
//! - **Linear**: start zone, ordered checkpoints, end zone.
//! - **Staged**: independently timed stages; stage 0's start zone starts
//!   the overall run and the last stage's end zone finishes it.
//! - **Bonus**: start and end zone only.
//!
//! Per attempt the lifecycle is `waiting -> running -> finished | discarded`.
//! Re-entering a start zone always cancels the attempt in progress.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::{debug, error, info, warn};

use crate::timing::events::{TrackEvent, TrackListener};
use crate::timing::input::MovementSignals;
use crate::timing::run::{PlayerId, RunData, RunTracker};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Identity of a trigger volume owned by the collision collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(pub u32);

/// Track topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TrackType {
    /// Chain of independently timed stages
    Staged = 0,
    /// Start, ordered checkpoints, end
    Linear = 1,
    /// Side track with only start and end
    Bonus = 2,
}

/// One stage of a staged track.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Stage start zone
    pub start: Option<TriggerId>,
    /// Stage end zone
    pub end: Option<TriggerId>,
}

/// Trigger layout of a track. `None` marks a missing trigger reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackLayout {
    /// Linear track
    Linear {
        /// Start zone
        start: Option<TriggerId>,
        /// End zone
        end: Option<TriggerId>,
        /// Checkpoints in required order
        #[serde(default)]
        checkpoints: Vec<Option<TriggerId>>,
    },
    /// Staged track
    Staged {
        /// Stages in order
        stages: Vec<StageConfig>,
    },
    /// Bonus track
    Bonus {
        /// Start zone
        start: Option<TriggerId>,
        /// End zone
        end: Option<TriggerId>,
    },
}

/// Static configuration of a track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Track name
    pub name: String,
    /// Trigger layout
    pub layout: TrackLayout,
}

impl TrackConfig {
    /// Create a linear track config.
    pub fn linear(
        name: impl Into<String>,
        start: TriggerId,
        end: TriggerId,
        checkpoints: &[TriggerId],
    ) -> Self {
        Self {
            name: name.into(),
            layout: TrackLayout::Linear {
                start: Some(start),
                end: Some(end),
                checkpoints: checkpoints.iter().copied().map(Some).collect(),
            },
        }
    }

    /// Create a staged track config from `(start, end)` pairs.
    pub fn staged(name: impl Into<String>, stages: &[(TriggerId, TriggerId)]) -> Self {
        Self {
            name: name.into(),
            layout: TrackLayout::Staged {
                stages: stages
                    .iter()
                    .enumerate()
                    .map(|(i, (start, end))| StageConfig {
                        name: format!("Stage {}", i + 1),
                        start: Some(*start),
                        end: Some(*end),
                    })
                    .collect(),
            },
        }
    }

    /// Create a bonus track config.
    pub fn bonus(name: impl Into<String>, start: TriggerId, end: TriggerId) -> Self {
        Self {
            name: name.into(),
            layout: TrackLayout::Bonus {
                start: Some(start),
                end: Some(end),
            },
        }
    }

    /// Parse a single track from JSON.
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Topology of this track.
    pub fn track_type(&self) -> TrackType {
        match self.layout {
            TrackLayout::Linear { .. } => TrackType::Linear,
            TrackLayout::Staged { .. } => TrackType::Staged,
            TrackLayout::Bonus { .. } => TrackType::Bonus,
        }
    }

    /// Check that every referenced trigger is present.
    pub fn validate(&self) -> Result<(), TrackError> {
        let missing = |role: ZoneRole| TrackError::InvalidTrackConfig {
            track: self.name.clone(),
            missing: role,
        };

        match &self.layout {
            TrackLayout::Linear { start, end, checkpoints } => {
                start.ok_or_else(|| missing(ZoneRole::Start))?;
                end.ok_or_else(|| missing(ZoneRole::End))?;
                for (i, cp) in checkpoints.iter().enumerate() {
                    cp.ok_or_else(|| missing(ZoneRole::Checkpoint(i)))?;
                }
            }
            TrackLayout::Staged { stages } => {
                if stages.is_empty() {
                    return Err(TrackError::NoStages { track: self.name.clone() });
                }
                for (i, stage) in stages.iter().enumerate() {
                    stage.start.ok_or_else(|| missing(ZoneRole::StageStart(i)))?;
                    stage.end.ok_or_else(|| missing(ZoneRole::StageEnd(i)))?;
                }
            }
            TrackLayout::Bonus { start, end } => {
                start.ok_or_else(|| missing(ZoneRole::Start))?;
                end.ok_or_else(|| missing(ZoneRole::End))?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Track configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// A referenced trigger is missing
    #[error("track '{track}' is invalid: missing {missing} trigger")]
    InvalidTrackConfig {
        /// Track name
        track: String,
        /// Role of the missing trigger
        missing: ZoneRole,
    },

    /// A staged track without stages
    #[error("track '{track}' is invalid: staged track has no stages")]
    NoStages {
        /// Track name
        track: String,
    },

    /// Malformed JSON
    #[error("failed to parse track config: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// TRIGGER BINDINGS
// =============================================================================

/// What a trigger means to a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneRole {
    /// Track start zone
    Start,
    /// Track end zone
    End,
    /// Linear checkpoint
    Checkpoint(usize),
    /// Start zone of a stage
    StageStart(usize),
    /// End zone of a stage
    StageEnd(usize),
}

impl fmt::Display for ZoneRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneRole::Start => write!(f, "start"),
            ZoneRole::End => write!(f, "end"),
            ZoneRole::Checkpoint(i) => write!(f, "checkpoint {}", i),
            ZoneRole::StageStart(i) => write!(f, "stage {} start", i),
            ZoneRole::StageEnd(i) => write!(f, "stage {} end", i),
        }
    }
}

/// Roles per trigger, in registration order, for entry and exit.
#[derive(Clone, Debug, Default)]
struct Bindings {
    on_enter: BTreeMap<TriggerId, Vec<ZoneRole>>,
    on_exit: BTreeMap<TriggerId, Vec<ZoneRole>>,
}

impl Bindings {
    fn enter(&mut self, trigger: TriggerId, role: ZoneRole) {
        self.on_enter.entry(trigger).or_default().push(role);
    }

    fn exit(&mut self, trigger: TriggerId, role: ZoneRole) {
        self.on_exit.entry(trigger).or_default().push(role);
    }

    /// Build the table for a validated layout.
    ///
    /// Stage roles are registered before the track roles that share their
    /// triggers, so a stage completes before the track finish is checked.
    fn for_layout(layout: &TrackLayout) -> Self {
        let mut bindings = Self::default();
        match layout {
            TrackLayout::Linear { start: Some(start), end: Some(end), checkpoints } => {
                bindings.enter(*start, ZoneRole::Start);
                bindings.exit(*start, ZoneRole::Start);
                bindings.enter(*end, ZoneRole::End);
                for (i, cp) in checkpoints.iter().enumerate() {
                    if let Some(cp) = cp {
                        bindings.enter(*cp, ZoneRole::Checkpoint(i));
                    }
                }
            }
            TrackLayout::Bonus { start: Some(start), end: Some(end) } => {
                bindings.enter(*start, ZoneRole::Start);
                bindings.exit(*start, ZoneRole::Start);
                bindings.enter(*end, ZoneRole::End);
            }
            TrackLayout::Staged { stages } => {
                for (i, stage) in stages.iter().enumerate() {
                    if let (Some(start), Some(end)) = (stage.start, stage.end) {
                        bindings.exit(start, ZoneRole::StageStart(i));
                        bindings.enter(end, ZoneRole::StageEnd(i));
                    }
                }
                if let Some(start) = stages.first().and_then(|s| s.start) {
                    bindings.enter(start, ZoneRole::Start);
                    bindings.exit(start, ZoneRole::Start);
                }
                if let Some(end) = stages.last().and_then(|s| s.end) {
                    bindings.enter(end, ZoneRole::End);
                }
            }
            _ => {}
        }
        bindings
    }
}

// =============================================================================
// TRACK
// =============================================================================

/// A bound track and the runs in progress on it.
#[derive(Debug)]
pub struct Track {
    config: TrackConfig,
    /// `None` when the config failed validation
    bindings: Option<Bindings>,
    runs: RunTracker,
    stage_runs: RunTracker,
    /// Last view yaw seen per player, with or without a run
    last_yaw: BTreeMap<PlayerId, f32>,
    pending_events: Vec<TrackEvent>,
}

impl Track {
    /// Validate and wire a track, failing on an invalid config.
    pub fn try_bind(config: TrackConfig) -> Result<Self, TrackError> {
        config.validate()?;
        let bindings = Bindings::for_layout(&config.layout);
        debug!(
            "Bound {:?} track '{}' to {} triggers",
            config.track_type(),
            config.name,
            bindings.on_enter.len() + bindings.on_exit.len()
        );
        Ok(Self::with_bindings(config, Some(bindings)))
    }

    /// Validate and wire a track.
    ///
    /// An invalid track is logged and left unwired: it never produces
    /// events, but the rest of the course keeps working.
    pub fn bind(config: TrackConfig) -> Self {
        match config.validate() {
            Ok(()) => {
                let bindings = Bindings::for_layout(&config.layout);
                Self::with_bindings(config, Some(bindings))
            }
            Err(e) => {
                error!("{}", e);
                Self::with_bindings(config, None)
            }
        }
    }

    fn with_bindings(config: TrackConfig, bindings: Option<Bindings>) -> Self {
        Self {
            config,
            bindings,
            runs: RunTracker::new(),
            stage_runs: RunTracker::new(),
            last_yaw: BTreeMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Track name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Topology.
    #[inline]
    pub fn track_type(&self) -> TrackType {
        self.config.track_type()
    }

    /// Bonus tracks are side tracks; everything else is a main track.
    #[inline]
    pub fn is_main_track(&self) -> bool {
        self.track_type() != TrackType::Bonus
    }

    /// Whether the track passed validation and reacts to triggers.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bindings.is_some()
    }

    /// Track-level run of a player.
    pub fn run(&self, player: &PlayerId) -> Option<&RunData> {
        self.runs.get(player)
    }

    /// In-flight stage run of a player.
    pub fn stage_run(&self, player: &PlayerId) -> Option<&RunData> {
        self.stage_runs.get(player)
    }

    /// All track-level runs.
    #[inline]
    pub fn runs(&self) -> &RunTracker {
        &self.runs
    }

    /// All stage runs.
    #[inline]
    pub fn stage_runs(&self) -> &RunTracker {
        &self.stage_runs
    }

    // =========================================================================
    // Trigger notifications
    // =========================================================================

    /// A player entered a trigger volume.
    pub fn zone_entered(&mut self, trigger: TriggerId, player: PlayerId) {
        let Some(roles) = self
            .bindings
            .as_ref()
            .and_then(|b| b.on_enter.get(&trigger))
            .cloned()
        else {
            return;
        };

        for role in roles {
            match role {
                ZoneRole::Start => self.enter_start(player),
                ZoneRole::End => self.enter_end(player),
                ZoneRole::Checkpoint(index) => self.enter_checkpoint(index, player),
                ZoneRole::StageEnd(stage) => self.enter_stage_end(stage, player),
                ZoneRole::StageStart(_) => {}
            }
        }
    }

    /// A player left a trigger volume.
    pub fn zone_exited(&mut self, trigger: TriggerId, player: PlayerId) {
        let Some(roles) = self
            .bindings
            .as_ref()
            .and_then(|b| b.on_exit.get(&trigger))
            .cloned()
        else {
            return;
        };

        for role in roles {
            match role {
                ZoneRole::Start => self.exit_start(player),
                ZoneRole::StageStart(stage) => self.exit_stage_start(stage, player),
                _ => {}
            }
        }
    }

    // =========================================================================
    // Per-tick work
    // =========================================================================

    /// Record one tick of movement into every run of `player` on this track.
    ///
    /// The view yaw is remembered even without a run, so a run started on
    /// the next tick scores its first tick against it.
    pub fn record_tick<S>(&mut self, player: &PlayerId, signals: &S, unit_scale: f32)
    where
        S: MovementSignals + ?Sized,
    {
        if !self.is_bound() {
            return;
        }
        self.last_yaw.insert(*player, signals.view_yaw());

        if let Some(run) = self.runs.get_mut(player) {
            run.timeline.record_tick(signals, unit_scale);
        }
        for run in self.stage_runs.iter_mut().filter(|r| r.player == *player) {
            run.timeline.record_tick(signals, unit_scale);
        }
    }

    /// Drop runs of players that are no longer valid.
    ///
    /// Track and stage collections are pruned independently. Returns the
    /// total number of runs removed.
    pub fn prune(&mut self, mut is_valid: impl FnMut(&PlayerId) -> bool) -> usize {
        self.last_yaw.retain(|player, _| is_valid(player));
        self.runs.prune(&mut is_valid) + self.stage_runs.prune(&mut is_valid)
    }

    /// Take events queued since the last call.
    pub fn take_events(&mut self) -> Vec<TrackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Deliver and clear queued events.
    pub fn drain_events_into<L: TrackListener + ?Sized>(&mut self, listener: &mut L) {
        for event in self.take_events() {
            event.dispatch(listener);
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Entering the start zone cancels any attempt in progress.
    fn enter_start(&mut self, player: PlayerId) {
        if let Some(run) = self.runs.get_mut(&player) {
            run.reset();
            run.timeline.set_live(false);
            debug!("Player {} back in start zone of '{}'", player, self.config.name);
        }
    }

    /// Leaving the start zone starts a fresh attempt.
    fn exit_start(&mut self, player: PlayerId) {
        let track = &self.config.name;
        let run = self
            .runs
            .get_or_insert_with(&player, || RunData::new(player, track.clone(), 0));
        run.reset();
        run.stage = 0;
        if let Some(&yaw) = self.last_yaw.get(&player) {
            run.timeline.seed_yaw(yaw);
        }

        info!("Player {} started '{}'", player, track);
        self.pending_events.push(TrackEvent::start(player, run));
    }

    fn enter_checkpoint(&mut self, index: usize, player: PlayerId) {
        let Some(run) = self.runs.get_mut(&player) else {
            return;
        };
        if !run.is_live() {
            return;
        }
        if index as i32 > run.checkpoint + 1 {
            warn!(
                "Player {} skipped to checkpoint {} on '{}' (last reached {})",
                player, index, self.config.name, run.checkpoint
            );
            return;
        }

        run.checkpoint = index as i32;
        let marker = run.timeline.checkpoint();
        debug!(
            "Player {} reached checkpoint {} on '{}' at {:.3}s",
            player, index, self.config.name, marker.time
        );
        self.pending_events.push(TrackEvent::checkpoint(player, index, run));
    }

    fn enter_end(&mut self, player: PlayerId) {
        let Some(run) = self.runs.get_mut(&player) else {
            return;
        };
        if !run.is_live() {
            return;
        }

        run.timeline.stop();

        match &self.config.layout {
            TrackLayout::Linear { checkpoints, .. }
                if !checkpoints.is_empty()
                    && run.checkpoint != checkpoints.len() as i32 - 1 =>
            {
                warn!(
                    "Player {} missed a checkpoint on '{}' (reached {} of {})",
                    player,
                    self.config.name,
                    run.checkpoint + 1,
                    checkpoints.len()
                );
                return;
            }
            TrackLayout::Staged { stages }
                if stages.len() > 1 && run.stage != stages.len() - 1 =>
            {
                warn!(
                    "Player {} missed a stage on '{}' (at stage {} of {})",
                    player,
                    self.config.name,
                    run.stage + 1,
                    stages.len()
                );
                return;
            }
            _ => {}
        }

        info!(
            "Player {} finished '{}' in {:.3}s",
            player,
            self.config.name,
            run.elapsed()
        );
        self.pending_events.push(TrackEvent::finish(player, run));
    }

    /// Leaving a stage start zone starts that stage and abandons any other
    /// stage the player was running.
    fn exit_stage_start(&mut self, stage: usize, player: PlayerId) {
        self.stage_runs
            .retain(|r| r.player != player || r.stage == stage);

        let track = &self.config.name;
        let run = self
            .stage_runs
            .get_stage_or_insert_with(&player, stage, || RunData::new(player, track.clone(), stage));
        run.reset();
        if let Some(&yaw) = self.last_yaw.get(&player) {
            run.timeline.seed_yaw(yaw);
        }
        debug!("Player {} started stage {} of '{}'", player, stage, track);
    }

    fn enter_stage_end(&mut self, stage: usize, player: PlayerId) {
        let live = self
            .stage_runs
            .get_stage(&player, stage)
            .is_some_and(|r| r.is_live());
        if !live {
            return;
        }

        // Stages double as checkpoints of the overall run
        if let Some(outer) = self.runs.get_mut(&player) {
            outer.checkpoint = stage as i32;
            outer.stage = stage;
        }

        let Some(mut run) = self.stage_runs.remove_stage(&player, stage) else {
            return;
        };
        run.timeline.stop();

        info!(
            "Player {} completed stage {} of '{}' in {:.3}s",
            player,
            stage,
            self.config.name,
            run.elapsed()
        );
        self.pending_events.push(TrackEvent::stage(player, stage, run));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::events::TrackEventKind;
    use crate::timing::input::{InputButtons, MovementSample};

    const SCALE: f32 = 39.37;

    fn player(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    fn kinds(events: &[TrackEvent]) -> Vec<TrackEventKind> {
        events.iter().map(|e| e.kind()).collect()
    }

    /// Linear track: start 1, end 2, checkpoints 10, 11, 12.
    fn linear() -> Track {
        Track::try_bind(TrackConfig::linear(
            "main",
            TriggerId(1),
            TriggerId(2),
            &[TriggerId(10), TriggerId(11), TriggerId(12)],
        ))
        .unwrap()
    }

    /// Staged track: stage 0 = (1, 2), stage 1 = (3, 4).
    fn staged() -> Track {
        Track::try_bind(TrackConfig::staged(
            "stages",
            &[(TriggerId(1), TriggerId(2)), (TriggerId(3), TriggerId(4))],
        ))
        .unwrap()
    }

    fn pass_start(track: &mut Track, p: PlayerId) {
        track.zone_entered(TriggerId(1), p);
        track.zone_exited(TriggerId(1), p);
    }

    fn step(track: &mut Track, p: PlayerId, n: usize) {
        let sample = MovementSample::new(0.01);
        for _ in 0..n {
            track.record_tick(&p, &sample, SCALE);
        }
    }

    #[test]
    fn test_exit_start_fires_start() {
        let mut track = linear();
        let p = player(1);

        track.zone_entered(TriggerId(1), p);
        assert!(track.take_events().is_empty());
        assert!(track.run(&p).is_none());

        track.zone_exited(TriggerId(1), p);
        let events = track.take_events();
        assert_eq!(kinds(&events), vec![TrackEventKind::Start]);
        assert_eq!(events[0].player, p);

        let run = track.run(&p).unwrap();
        assert!(run.is_live());
        assert_eq!(run.checkpoint, -1);
    }

    #[test]
    fn test_linear_full_run_finishes() {
        let mut track = linear();
        let p = player(1);

        pass_start(&mut track, p);
        for (i, cp) in [10, 11, 12].into_iter().enumerate() {
            step(&mut track, p, 5);
            track.zone_entered(TriggerId(cp), p);
            assert_eq!(track.run(&p).unwrap().checkpoint, i as i32);
        }
        step(&mut track, p, 5);
        track.zone_entered(TriggerId(2), p);

        let events = track.take_events();
        assert_eq!(
            kinds(&events),
            vec![
                TrackEventKind::Start,
                TrackEventKind::Checkpoint,
                TrackEventKind::Checkpoint,
                TrackEventKind::Checkpoint,
                TrackEventKind::Finish,
            ]
        );

        // Checkpoint events carry only the current frame
        let first_cp = &events[1];
        assert_eq!(first_cp.run.timeline.len(), 1);
        assert_eq!(first_cp.run.timeline.last_frame().tick, 5);
        assert_eq!(first_cp.run.timeline.markers().len(), 1);
        let third_cp = &events[3];
        assert_eq!(third_cp.run.timeline.len(), 1);
        assert_eq!(third_cp.run.timeline.last_frame().tick, 15);

        let finish = events.last().unwrap();
        assert_eq!(finish.run.timeline.len(), 20);
        assert_eq!(finish.run.timeline.markers().len(), 3);
        assert!(!track.run(&p).unwrap().is_live());
    }

    #[test]
    fn test_linear_missed_checkpoint_is_discarded() {
        let mut track = linear();
        let p = player(1);

        pass_start(&mut track, p);
        track.zone_entered(TriggerId(10), p);
        track.zone_entered(TriggerId(11), p);
        track.zone_entered(TriggerId(2), p);

        let events = track.take_events();
        assert!(!events.iter().any(|e| e.kind() == TrackEventKind::Finish));
        // The attempt is over either way
        assert!(!track.run(&p).unwrap().is_live());
    }

    #[test]
    fn test_linear_checkpoint_skip_is_ignored() {
        let mut track = linear();
        let p = player(1);

        pass_start(&mut track, p);
        track.zone_entered(TriggerId(10), p);
        // Skips checkpoint 1
        track.zone_entered(TriggerId(12), p);
        assert_eq!(track.run(&p).unwrap().checkpoint, 0);

        track.zone_entered(TriggerId(2), p);
        let events = track.take_events();
        assert_eq!(
            kinds(&events),
            vec![TrackEventKind::Start, TrackEventKind::Checkpoint]
        );
    }

    #[test]
    fn test_checkpoint_before_start_is_ignored() {
        let mut track = linear();
        let p = player(1);

        track.zone_entered(TriggerId(10), p);
        track.zone_entered(TriggerId(2), p);
        assert!(track.take_events().is_empty());
    }

    #[test]
    fn test_start_reentry_cancels_run() {
        let mut track = linear();
        let p = player(1);

        pass_start(&mut track, p);
        step(&mut track, p, 10);
        track.zone_entered(TriggerId(10), p);
        track.zone_entered(TriggerId(11), p);

        track.zone_entered(TriggerId(1), p);
        let run = track.run(&p).unwrap();
        assert_eq!(run.checkpoint, -1);
        assert!(run.timeline.is_empty());
        assert!(!run.is_live());

        // Ticks inside the start zone are not recorded
        step(&mut track, p, 3);
        assert!(track.run(&p).unwrap().timeline.is_empty());

        // Checkpoints and end are ignored until the player leaves again
        track.take_events();
        track.zone_entered(TriggerId(12), p);
        track.zone_entered(TriggerId(2), p);
        assert!(track.take_events().is_empty());

        track.zone_exited(TriggerId(1), p);
        assert_eq!(kinds(&track.take_events()), vec![TrackEventKind::Start]);
        assert!(track.run(&p).unwrap().is_live());
    }

    #[test]
    fn test_linear_without_checkpoints() {
        let mut track = Track::try_bind(TrackConfig::linear("short", TriggerId(1), TriggerId(2), &[]))
            .unwrap();
        let p = player(1);

        pass_start(&mut track, p);
        track.zone_entered(TriggerId(2), p);
        assert_eq!(
            kinds(&track.take_events()),
            vec![TrackEventKind::Start, TrackEventKind::Finish]
        );
    }

    #[test]
    fn test_end_twice_finishes_once() {
        let mut track = Track::try_bind(TrackConfig::linear("short", TriggerId(1), TriggerId(2), &[]))
            .unwrap();
        let p = player(1);

        pass_start(&mut track, p);
        track.zone_entered(TriggerId(2), p);
        track.zone_entered(TriggerId(2), p);
        let finishes = track
            .take_events()
            .iter()
            .filter(|e| e.kind() == TrackEventKind::Finish)
            .count();
        assert_eq!(finishes, 1);
    }

    #[test]
    fn test_staged_in_order_finishes() {
        let mut track = staged();
        let p = player(1);

        pass_start(&mut track, p);
        step(&mut track, p, 4);
        track.zone_entered(TriggerId(2), p);
        assert_eq!(track.run(&p).unwrap().stage, 0);
        assert!(track.stage_run(&p).is_none());

        track.zone_entered(TriggerId(3), p);
        track.zone_exited(TriggerId(3), p);
        step(&mut track, p, 6);
        track.zone_entered(TriggerId(4), p);

        let events = track.take_events();
        assert_eq!(
            kinds(&events),
            vec![
                TrackEventKind::Start,
                TrackEventKind::Stage,
                TrackEventKind::Stage,
                TrackEventKind::Finish,
            ]
        );

        let stage_times: Vec<_> = events
            .iter()
            .filter(|e| e.kind() == TrackEventKind::Stage)
            .map(|e| (e.run.stage, e.run.timeline.len()))
            .collect();
        assert_eq!(stage_times, vec![(0, 4), (1, 6)]);

        let outer = track.run(&p).unwrap();
        assert_eq!(outer.stage, 1);
        assert_eq!(outer.checkpoint, 1);
        assert_eq!(outer.timeline.len(), 10);
    }

    #[test]
    fn test_staged_skipped_stage_does_not_finish() {
        let mut track = staged();
        let p = player(1);

        pass_start(&mut track, p);
        track.zone_entered(TriggerId(2), p);
        // Never leaves stage 1's start zone
        track.zone_entered(TriggerId(4), p);

        let events = track.take_events();
        assert_eq!(
            kinds(&events),
            vec![TrackEventKind::Start, TrackEventKind::Stage]
        );
    }

    #[test]
    fn test_one_stage_attempt_per_player() {
        let mut track = staged();
        let p = player(1);
        let q = player(2);

        track.zone_exited(TriggerId(1), p);
        track.zone_exited(TriggerId(1), q);
        track.zone_exited(TriggerId(3), p);

        assert_eq!(track.stage_runs().len(), 2);
        assert!(track.stage_runs().get_stage(&p, 0).is_none());
        assert!(track.stage_runs().get_stage(&p, 1).is_some());
        assert!(track.stage_runs().get_stage(&q, 0).is_some());
    }

    #[test]
    fn test_bonus_starts_on_exit() {
        let mut track = Track::try_bind(TrackConfig::bonus("bonus", TriggerId(5), TriggerId(6)))
            .unwrap();
        let p = player(1);
        assert!(!track.is_main_track());

        track.zone_entered(TriggerId(5), p);
        assert!(track.take_events().is_empty());

        track.zone_exited(TriggerId(5), p);
        track.zone_entered(TriggerId(6), p);
        assert_eq!(
            kinds(&track.take_events()),
            vec![TrackEventKind::Start, TrackEventKind::Finish]
        );
    }

    #[test]
    fn test_invalid_track_is_unwired() {
        let config = TrackConfig {
            name: "broken".into(),
            layout: TrackLayout::Linear {
                start: Some(TriggerId(1)),
                end: None,
                checkpoints: Vec::new(),
            },
        };

        match Track::try_bind(config.clone()) {
            Err(TrackError::InvalidTrackConfig { track, missing }) => {
                assert_eq!(track, "broken");
                assert_eq!(missing, ZoneRole::End);
            }
            other => panic!("expected invalid config, got {:?}", other),
        }

        let mut track = Track::bind(config);
        assert!(!track.is_bound());
        let p = player(1);
        pass_start(&mut track, p);
        assert!(track.take_events().is_empty());
        assert!(track.run(&p).is_none());
    }

    #[test]
    fn test_missing_checkpoint_and_empty_stages_are_invalid() {
        let config = TrackConfig {
            name: "holes".into(),
            layout: TrackLayout::Linear {
                start: Some(TriggerId(1)),
                end: Some(TriggerId(2)),
                checkpoints: vec![Some(TriggerId(3)), None],
            },
        };
        assert!(matches!(
            config.validate(),
            Err(TrackError::InvalidTrackConfig { missing: ZoneRole::Checkpoint(1), .. })
        ));

        let empty = TrackConfig {
            name: "empty".into(),
            layout: TrackLayout::Staged { stages: Vec::new() },
        };
        assert!(matches!(empty.validate(), Err(TrackError::NoStages { .. })));
    }

    #[test]
    fn test_players_run_independently() {
        let mut track = linear();
        let a = player(1);
        let b = player(2);

        pass_start(&mut track, a);
        pass_start(&mut track, b);
        track.zone_entered(TriggerId(10), a);
        track.zone_entered(TriggerId(1), b);

        assert_eq!(track.run(&a).unwrap().checkpoint, 0);
        assert!(track.run(&a).unwrap().is_live());
        assert!(!track.run(&b).unwrap().is_live());
    }

    #[test]
    fn test_prune_removes_departed_players() {
        let mut track = staged();
        let stay = player(1);
        let gone = player(2);

        pass_start(&mut track, stay);
        pass_start(&mut track, gone);
        assert_eq!(track.runs().len(), 2);
        assert_eq!(track.stage_runs().len(), 2);

        assert_eq!(track.prune(|p| *p != gone), 2);
        assert!(track.run(&gone).is_none());
        assert!(track.stage_run(&gone).is_none());
        assert!(track.run(&stay).is_some());

        // Events for a departed player are simply ignored
        track.zone_entered(TriggerId(2), gone);
        assert_eq!(track.prune(|p| *p != gone), 0);
    }

    /// Five airborne ticks turning left with left held.
    fn turn_left(track: &mut Track, p: PlayerId, sample: &mut MovementSample) {
        for i in 1..=5 {
            sample.advance();
            sample.on_ground = false;
            sample.buttons = InputButtons::new(InputButtons::MOVE_LEFT);
            sample.view_yaw = 90.0 - 10.0 * i as f32;
            track.record_tick(&p, &*sample, SCALE);
        }
    }

    #[test]
    fn test_first_attempt_scores_first_tick() {
        let mut track = linear();
        let p = player(1);

        // Standing in the start zone before the first attempt
        track.zone_entered(TriggerId(1), p);
        let mut sample = MovementSample::new(0.01);
        sample.view_yaw = 90.0;
        for _ in 0..3 {
            track.record_tick(&p, &sample, SCALE);
        }
        assert!(track.run(&p).is_none());

        track.zone_exited(TriggerId(1), p);
        turn_left(&mut track, p, &mut sample);

        let run = track.run(&p).unwrap();
        assert_eq!(run.timeline.len(), 5);
        let last = run.timeline.last_frame();
        assert_eq!(last.total_sync, 5);
        assert_eq!(last.good_sync, 5);
        assert_eq!(last.final_sync, 100);
        assert_eq!(last.strafes, 1);
    }

    #[test]
    fn test_new_stage_run_scores_first_tick() {
        let mut track = staged();
        let p = player(1);
        pass_start(&mut track, p);
        track.zone_entered(TriggerId(2), p);

        let mut sample = MovementSample::new(0.01);
        sample.view_yaw = 90.0;
        track.record_tick(&p, &sample, SCALE);

        track.zone_exited(TriggerId(3), p);
        turn_left(&mut track, p, &mut sample);

        let stage = track.stage_run(&p).unwrap();
        assert_eq!(stage.stage, 1);
        assert_eq!(stage.timeline.len(), 5);
        assert_eq!(stage.timeline.last_frame().total_sync, 5);
        assert_eq!(stage.timeline.last_frame().good_sync, 5);
    }

    #[test]
    fn test_config_json() {
        let json = r#"{
            "name": "main",
            "layout": { "type": "linear", "start": 1, "end": 2, "checkpoints": [3, null] }
        }"#;
        let config = TrackConfig::from_json(json).unwrap();
        assert_eq!(config.track_type(), TrackType::Linear);
        assert!(config.validate().is_err());

        assert!(matches!(TrackConfig::from_json("{"), Err(TrackError::Parse(_))));
    }
}
