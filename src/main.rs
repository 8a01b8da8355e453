//! Bhop Timer Demo
//!
//! Headless host: loads a course, drives scripted players through it and
//! logs the resulting runs. Pass a course JSON file as the first argument
//! to replace the built-in demo course.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bhop_timer::{
    TICK_RATE, VERSION,
    config::TimerConfig,
    replay::TimelineRecording,
    timing::{
        Course, CourseConfig, InputButtons, MovementSample, PlayerId, RunData, RunSummary,
        TrackConfig, TrackListener, TriggerId,
    },
    Vec3,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Bhop Timer v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let course_config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read course file {}", path))?;
            CourseConfig::from_json(&json)
                .with_context(|| format!("failed to parse course file {}", path))?
        }
        None => demo_course(),
    };

    demo_session(course_config)
}

/// Built-in course: a linear main track, a staged track and a bonus.
fn demo_course() -> CourseConfig {
    CourseConfig {
        tracks: vec![
            TrackConfig::linear(
                "main",
                TriggerId(1),
                TriggerId(2),
                &[TriggerId(3), TriggerId(4)],
            ),
            TrackConfig::staged(
                "stages",
                &[(TriggerId(10), TriggerId(11)), (TriggerId(12), TriggerId(13))],
            ),
            TrackConfig::bonus("bonus", TriggerId(20), TriggerId(21)),
        ],
    }
}

/// Collects finished runs and logs every lifecycle event.
#[derive(Default)]
struct Leaderboard {
    finished: Vec<RunData>,
}

impl TrackListener for Leaderboard {
    fn on_start(&mut self, player: PlayerId, run: &RunData) {
        info!("[{}] {} started", run.track, player);
    }

    fn on_checkpoint(&mut self, player: PlayerId, index: usize, run: &RunData) {
        info!(
            "[{}] {} checkpoint {} at {:.2}s",
            run.track,
            player,
            index + 1,
            run.elapsed()
        );
    }

    fn on_stage(&mut self, player: PlayerId, stage: usize, run: &RunData) {
        info!(
            "[{}] {} stage {} in {:.2}s",
            run.track,
            player,
            stage + 1,
            run.elapsed()
        );
    }

    fn on_finish(&mut self, player: PlayerId, run: &RunData) {
        let summary = RunSummary::from_run(run);
        info!(
            "[{}] {} finished in {:.2}s ({} jumps, {} strafes, {}% sync, {}% velocity sync, top speed {})",
            run.track,
            player,
            summary.time,
            summary.jumps,
            summary.strafes,
            summary.sync,
            summary.velocity_sync,
            summary.top_speed,
        );
        self.finished.push(run.clone());
    }
}

/// Scripted strafing movement: alternate turns every `period` ticks,
/// holding the matching key with some imperfection.
struct Strafer {
    sample: MovementSample,
    period: u32,
    sloppy_every: u32,
    tick: u32,
}

impl Strafer {
    fn new(config: &TimerConfig, period: u32, sloppy_every: u32) -> Self {
        Self {
            sample: MovementSample::new(config.tick_duration()),
            period,
            sloppy_every,
            tick: 0,
        }
    }

    fn step(&mut self) -> &MovementSample {
        self.sample.advance();
        self.tick += 1;

        let left = (self.tick / self.period) % 2 == 0;
        let sloppy = self.sloppy_every > 0 && self.tick % self.sloppy_every == 0;
        let key = match (left, sloppy) {
            (true, false) => InputButtons::MOVE_LEFT,
            (false, false) => InputButtons::MOVE_RIGHT,
            (_, true) => InputButtons::MOVE_LEFT | InputButtons::MOVE_RIGHT,
        };

        let turn = if left { -2.0 } else { 2.0 };
        let on_ground = self.tick % 60 == 0;

        self.sample.on_ground = on_ground;
        self.sample.just_jumped = on_ground;
        self.sample.buttons = InputButtons::new(key | InputButtons::MOVE_FORWARD);
        self.sample.view_yaw = (self.sample.view_yaw + turn) % 360.0;

        let speed = 280.0 + self.tick as f32 * 0.5;
        let lateral = if left { -speed * 0.2 } else { speed * 0.2 };
        self.sample.velocity = Vec3::new(speed, 0.0, lateral);
        self.sample.position = self.sample.position + self.sample.velocity.scale(self.sample.tick_duration);
        self.sample.angles = Vec3::new(0.0, self.sample.view_yaw, 0.0);
        &self.sample
    }
}

fn demo_session(course_config: CourseConfig) -> anyhow::Result<()> {
    info!("=== Starting Demo Session ===");

    let config = TimerConfig::default();
    let mut course = Course::from_config(config.clone(), course_config);
    let mut leaderboard = Leaderboard::default();

    let clean = PlayerId::new([1; 16]);
    let sloppy = PlayerId::new([2; 16]);
    let quitter = PlayerId::new([3; 16]);
    let mut strafers = vec![
        (clean, Strafer::new(&config, 15, 0)),
        (sloppy, Strafer::new(&config, 15, 4)),
        (quitter, Strafer::new(&config, 20, 0)),
    ];

    // Trigger script: (tick, trigger, entered, players)
    let everyone = [clean, sloppy, quitter];
    let stayers = [clean, sloppy];
    let solo = [clean];
    let script: Vec<(u32, TriggerId, bool, &[PlayerId])> = vec![
        (1, TriggerId(1), true, &everyone[..]),
        (10, TriggerId(1), false, &everyone[..]),
        (10, TriggerId(10), false, &everyone[..]),
        (150, TriggerId(3), true, &everyone[..]),
        (220, TriggerId(11), true, &everyone[..]),
        (240, TriggerId(12), false, &everyone[..]),
        (300, TriggerId(4), true, &stayers[..]),
        (420, TriggerId(13), true, &stayers[..]),
        (450, TriggerId(2), true, &everyone[..]),
        (460, TriggerId(20), false, &solo[..]),
        (520, TriggerId(21), true, &solo[..]),
    ];

    let mut connected: Vec<PlayerId> = everyone.to_vec();
    let total_ticks = 600;

    for t in 1..=total_ticks {
        for &(tick, trigger, entered, players) in &script {
            if tick != t {
                continue;
            }
            for player in players.iter().filter(|p| connected.contains(p)) {
                if entered {
                    course.zone_entered(trigger, *player);
                } else {
                    course.zone_exited(trigger, *player);
                }
            }
        }

        for (player, strafer) in strafers.iter_mut() {
            if connected.contains(player) {
                course.record_tick(player, strafer.step());
            }
        }

        if t == 350 {
            warn!("Player {} disconnected", quitter);
            connected.retain(|p| *p != quitter);
        }

        let result = course.tick(|p| connected.contains(p));
        if result.pruned > 0 {
            info!("Tick {}: pruned {} runs", t, result.pruned);
        }
        for event in &result.events {
            event.dispatch(&mut leaderboard);
        }
    }

    info!("=== Session Complete ===");
    info!("Finished runs: {}", leaderboard.finished.len());

    for run in &leaderboard.finished {
        let recording = TimelineRecording::from_run(run);
        let bytes = recording.to_bytes()?;
        let loaded = TimelineRecording::from_bytes(&bytes)?;
        info!(
            "[{}] {} recording: {} frames, {} bytes, digest {}",
            loaded.track,
            loaded.player,
            loaded.frames.len(),
            bytes.len(),
            loaded.digest_hex()
        );
        info!("Summary: {}", serde_json::to_string(&RunSummary::from_run(run))?);
    }

    if let Some(best) = leaderboard
        .finished
        .iter()
        .filter(|r| r.track == "main")
        .min_by(|a, b| a.elapsed().total_cmp(&b.elapsed()))
    {
        let mut ghost = TimelineRecording::from_run(best).into_timeline();
        let mut pose = bhop_timer::timing::Pose::default();
        let mut played = 0;
        while ghost.playback_step(&mut pose).is_some() {
            played += 1;
        }
        info!(
            "Ghost of {} replayed {} frames, final position ({:.1}, {:.1}, {:.1})",
            best.player, played, pose.position.x, pose.position.y, pose.position.z
        );
    }

    Ok(())
}
