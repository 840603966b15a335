use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use formcoach_lib::coaching::{DeliveryStatus, FeedbackPrompt, PromptCategory};
use formcoach_lib::form::FormErrorType;
use formcoach_lib::pose::{Landmark, LandmarkId, PoseFrame};
use formcoach_lib::session::{SessionCoordinator, SessionStatus};
use formcoach_lib::settings::SessionSettings;
use formcoach_lib::voice::Speaker;

const FRAME_MS: u64 = 40;
const CYCLE: [f32; 15] = [
    170.0, 150.0, 130.0, 110.0, 95.0, 85.0, 95.0, 110.0, 130.0, 150.0, 170.0, 170.0, 170.0, 170.0,
    170.0,
];

/// Speaks instantly, remembers what it said, optionally fails every time.
struct RecordingSpeaker {
    fail: bool,
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            spoken: Mutex::new(Vec::new()),
        })
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    fn name(&self) -> &str {
        "recording"
    }

    async fn speak(&self, prompt: &FeedbackPrompt) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if self.fail {
            bail!("no audio device");
        }
        self.spoken.lock().unwrap().push(prompt.message_id.clone());
        Ok(())
    }
}

fn point(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(x, y, z, 0.9)
}

/// Push-up seen from the head end: the body runs away from the camera and
/// the forearm swings forward in depth as the elbow opens.
fn push_up(sequence: u64, elbow_angle: f32, hip_drop: f32) -> PoseFrame {
    let theta = elbow_angle.to_radians();
    let arm = |x: f32| {
        let elbow = point(x, 0.65, 0.0);
        let wrist = point(x, 0.65 - 0.15 * theta.cos(), 0.15 * theta.sin());
        (elbow, wrist)
    };
    let (left_elbow, left_wrist) = arm(0.4);
    let (right_elbow, right_wrist) = arm(0.6);

    PoseFrame::from_points(
        sequence,
        sequence * FRAME_MS,
        [
            (LandmarkId::LeftShoulder, point(0.4, 0.5, 0.0)),
            (LandmarkId::RightShoulder, point(0.6, 0.5, 0.0)),
            (LandmarkId::LeftElbow, left_elbow),
            (LandmarkId::RightElbow, right_elbow),
            (LandmarkId::LeftWrist, left_wrist),
            (LandmarkId::RightWrist, right_wrist),
            (LandmarkId::LeftHip, point(0.45, 0.5 + hip_drop, 0.4)),
            (LandmarkId::RightHip, point(0.55, 0.5 + hip_drop, 0.4)),
            (LandmarkId::LeftKnee, point(0.45, 0.5 + hip_drop / 2.0, 0.6)),
            (LandmarkId::RightKnee, point(0.55, 0.5 + hip_drop / 2.0, 0.6)),
            (LandmarkId::LeftAnkle, point(0.45, 0.5, 0.8)),
            (LandmarkId::RightAnkle, point(0.55, 0.5, 0.8)),
        ],
    )
}

fn push_ups(reps: usize, hip_drop: f32) -> impl Iterator<Item = PoseFrame> {
    CYCLE
        .iter()
        .cycle()
        .take(CYCLE.len() * reps)
        .enumerate()
        .map(move |(i, angle)| push_up(i as u64 + 1, *angle, hip_drop))
}

fn settings(target_reps: u32, min_form_score: f32) -> SessionSettings {
    SessionSettings {
        exercise: "push-up".into(),
        target_reps,
        min_form_score,
        motivation_seed: Some(11),
        ..SessionSettings::default()
    }
}

/// Feeds frames one at a time, yielding so the delivery task keeps up.
async fn feed(coordinator: &mut SessionCoordinator, frames: impl Iterator<Item = PoseFrame>) {
    for frame in frames {
        coordinator.process_frame(frame);
        tokio::time::sleep(Duration::from_millis(FRAME_MS)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn clean_session_reaches_target_and_speaks_milestones() {
    let speaker = RecordingSpeaker::new(false);
    let mut coordinator = SessionCoordinator::from_settings(&settings(4, 50.0), speaker.clone()).unwrap();
    coordinator.start().unwrap();

    feed(&mut coordinator, push_ups(5, 0.0)).await;
    assert_eq!(coordinator.status(), SessionStatus::Completed);

    let summary = coordinator.end().await.unwrap();
    assert_eq!(summary.rep_count, 4);
    assert_eq!(summary.stats.total_accepted, 4);
    assert_eq!(summary.stats.best_form_score, Some(100.0));
    assert!(summary.error_counts.is_empty());
    assert_eq!(
        speaker.spoken(),
        vec!["milestone_25", "milestone_50", "milestone_75", "milestone_100"]
    );
    assert_eq!(summary.prompts_completed, 4);
    // The last rep closes on frame 56.
    assert_eq!(summary.elapsed_ms, 55 * FRAME_MS);
}

#[tokio::test(start_paused = true)]
async fn sagging_hips_are_warned_and_reps_rejected() {
    let speaker = RecordingSpeaker::new(false);
    let mut coordinator = SessionCoordinator::from_settings(&settings(10, 70.0), speaker.clone()).unwrap();
    coordinator.start().unwrap();

    feed(&mut coordinator, push_ups(3, 0.2)).await;

    let session = coordinator.session();
    assert_eq!(session.rep_count, 0);
    assert_eq!(session.error_counts.get(&FormErrorType::BodyLineBreak), Some(&1));
    assert!(session
        .feedback_history
        .iter()
        .all(|p| p.category == PromptCategory::Warning));
    assert!(!speaker.spoken().is_empty());

    let summary = coordinator.end().await.unwrap();
    assert_eq!(summary.stats.rejected, 3);
    assert_eq!(summary.stats.best_rep, None);
}

#[tokio::test(start_paused = true)]
async fn speaker_failures_never_stop_the_session() {
    let speaker = RecordingSpeaker::new(true);
    let mut coordinator = SessionCoordinator::from_settings(&settings(3, 50.0), speaker.clone()).unwrap();
    coordinator.start().unwrap();

    feed(&mut coordinator, push_ups(3, 0.0)).await;
    assert_eq!(coordinator.status(), SessionStatus::Completed);

    let summary = coordinator.end().await.unwrap();
    assert_eq!(summary.rep_count, 3);
    assert!(speaker.spoken().is_empty());
    assert!(summary.prompts_failed > 0);
    assert!(coordinator
        .session()
        .feedback_history
        .iter()
        .all(|p| p.status == DeliveryStatus::Failed));
}

#[tokio::test]
async fn bad_settings_fail_before_any_frame() {
    let settings = SessionSettings {
        queue_capacity: 0,
        ..SessionSettings::default()
    };
    let speaker = RecordingSpeaker::new(false);
    assert!(SessionCoordinator::from_settings(&settings, speaker).is_err());
}
