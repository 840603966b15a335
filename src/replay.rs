use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::{self, Instant};

use crate::pose::PoseFrame;
use crate::session::{SessionCoordinator, SessionSummary};
use crate::settings::SessionSettings;
use crate::voice::Speaker;
use crate::{log_info, log_warn};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

/// Upper bound on waiting for queued prompts once the frames run out.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Replays recorded pose frames through a coaching session.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "formcoach", about = "Replay recorded pose frames through a coaching session")]
pub struct ReplayOptions {
    /// Session settings JSON file.
    pub settings: PathBuf,

    /// Pose frames, one JSON object per line.
    pub frames: PathBuf,

    /// Feed frames as fast as possible instead of pacing them by timestamp.
    #[arg(long)]
    pub fast: bool,
}

impl ReplayOptions {
    pub fn realtime(&self) -> bool {
        !self.fast
    }
}

/// Reads one JSON `PoseFrame` per line. Blank lines are skipped; lines that
/// do not parse are logged and skipped.
pub fn load_frames(path: &Path) -> Result<Vec<PoseFrame>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pose frames from {}", path.display()))?;

    let mut frames = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<PoseFrame>(line) {
            Ok(frame) => frames.push(frame),
            Err(err) => log_warn!(
                "[REPLAY] skipping line {} of {}: {}",
                index + 1,
                path.display(),
                err
            ),
        }
    }
    Ok(frames)
}

/// Runs a whole session over recorded frames and returns its summary.
/// Stops early once the session completes.
pub async fn replay(
    settings: &SessionSettings,
    frames: Vec<PoseFrame>,
    speaker: Arc<dyn Speaker>,
    realtime: bool,
) -> Result<SessionSummary> {
    let mut coordinator = SessionCoordinator::from_settings(settings, speaker)?;
    coordinator.start()?;
    log_info!("[REPLAY] replaying {} frames", frames.len());

    let clock_start = Instant::now();
    let first_timestamp = frames.first().map(|f| f.timestamp_ms).unwrap_or(0);

    for frame in frames {
        if !coordinator.session().is_active() {
            break;
        }
        if realtime {
            let offset = frame.timestamp_ms.saturating_sub(first_timestamp);
            time::sleep_until(clock_start + Duration::from_millis(offset)).await;
        } else {
            tokio::task::yield_now().await;
        }
        coordinator.process_frame(frame);
    }

    let drained = time::timeout(DRAIN_TIMEOUT, async {
        while coordinator.channel().pending() > 0 || coordinator.channel().is_speaking() {
            time::sleep(DRAIN_POLL).await;
        }
    })
    .await;
    if drained.is_err() {
        log_warn!("[REPLAY] feedback still pending after {:?}", DRAIN_TIMEOUT);
    }

    coordinator.end().await
}

pub fn default_speaker() -> Arc<dyn Speaker> {
    #[cfg(feature = "audio")]
    {
        Arc::new(crate::voice::ChimeSpeaker::new())
    }
    #[cfg(not(feature = "audio"))]
    {
        Arc::new(crate::voice::LogSpeaker::default())
    }
}

/// Loads both inputs, replays them and renders the summary as JSON.
pub async fn run_replay(options: &ReplayOptions) -> Result<String> {
    let settings = SessionSettings::load(&options.settings)?;
    let frames = load_frames(&options.frames)?;
    let summary = replay(&settings, frames, default_speaker(), options.realtime()).await?;
    serde_json::to_string_pretty(&summary).context("Failed to serialize session summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::fixtures;
    use crate::session::SessionStatus;
    use crate::voice::LogSpeaker;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("formcoach-{}-{}", uuid::Uuid::new_v4(), name))
    }

    fn push_up_frames(reps: usize) -> Vec<PoseFrame> {
        let cycle = [170.0, 140.0, 110.0, 90.0, 80.0, 90.0, 110.0, 140.0, 170.0, 170.0, 170.0, 170.0, 170.0, 170.0, 170.0];
        cycle
            .iter()
            .cycle()
            .take(cycle.len() * reps)
            .enumerate()
            .map(|(i, angle)| fixtures::push_up(i as u64 + 1, i as u64 * 50, *angle))
            .collect()
    }

    #[test]
    fn parses_arguments() {
        let options = ReplayOptions::try_parse_from(["formcoach", "s.json", "f.jsonl"]).unwrap();
        assert_eq!(options.settings, PathBuf::from("s.json"));
        assert_eq!(options.frames, PathBuf::from("f.jsonl"));
        assert!(options.realtime());

        let options = ReplayOptions::try_parse_from(["formcoach", "--fast", "s.json", "f.jsonl"]).unwrap();
        assert!(!options.realtime());

        assert!(ReplayOptions::try_parse_from(["formcoach", "s.json"]).is_err());
        assert!(ReplayOptions::try_parse_from(["formcoach", "s.json", "f.jsonl", "--loop"]).is_err());
    }

    #[test]
    fn load_frames_skips_bad_lines() {
        let path = temp_path("frames.jsonl");
        let good = serde_json::to_string(&fixtures::push_up(1, 0, 170.0)).unwrap();
        fs::write(&path, format!("{good}\n\nnot json\n{good}\n")).unwrap();

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames.len(), 2);
        let _ = fs::remove_file(&path);

        assert!(load_frames(&temp_path("missing.jsonl")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_replay_follows_frame_timestamps() {
        let settings = SessionSettings {
            target_reps: 2,
            ..SessionSettings::default()
        };
        let frames = push_up_frames(3);
        let started = Instant::now();

        let summary = replay(&settings, frames, Arc::new(LogSpeaker::default()), true)
            .await
            .unwrap();

        assert_eq!(summary.rep_count, 2);
        assert_eq!(summary.status, SessionStatus::Completed);
        // The second rep closes at frame 24, 1150ms after the first frame.
        assert!(started.elapsed() >= Duration::from_millis(1150));
        assert_eq!(summary.elapsed_ms, 1150);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_replay_writes_summary_json() {
        let settings_path = temp_path("settings.json");
        let frames_path = temp_path("frames.jsonl");
        SessionSettings {
            target_reps: 5,
            ..SessionSettings::default()
        }
        .save(&settings_path)
        .unwrap();
        let lines: Vec<String> = push_up_frames(2)
            .iter()
            .map(|f| serde_json::to_string(f).unwrap())
            .collect();
        fs::write(&frames_path, lines.join("\n")).unwrap();

        let options = ReplayOptions {
            settings: settings_path.clone(),
            frames: frames_path.clone(),
            fast: true,
        };
        let json = run_replay(&options).await.unwrap();
        let summary: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary.rep_count, 2);
        assert_eq!(summary.target_reps, 5);

        let _ = fs::remove_file(settings_path);
        let _ = fs::remove_file(frames_path);
    }
}
