use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coaching::{AcceptedRep, DeliveryStatus, FeedbackPrompt, RepStats};
use crate::detection::RepPhase;
use crate::exercise::{Discipline, ExerciseType};
use crate::form::{FormErrorType, FormValidationResult, Severity};
use crate::pose::{LandmarkId, PoseFrame};
use crate::voice::DeliveryEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Preparing,
    Active,
    Paused,
    Completed,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Preparing
    }
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Preparing => "preparing",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

/// In-memory record of one workout. Dropped when the session ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub exercise: ExerciseType,
    pub discipline: Discipline,
    pub status: SessionStatus,
    pub rep_count: u32,
    pub target_reps: u32,
    /// Active time from frame timestamps; paused stretches are excluded.
    pub elapsed_ms: u64,
    pub rolling_form_score: f32,
    pub feedback_history: Vec<FeedbackPrompt>,
    pub rep_history: Vec<AcceptedRep>,
    /// How many times each error type appeared, counting a run of
    /// consecutive frames once.
    pub error_counts: BTreeMap<FormErrorType, u32>,
    #[serde(skip)]
    last_timestamp_ms: Option<u64>,
    #[serde(skip)]
    recent_scores: VecDeque<f32>,
    #[serde(skip)]
    rolling_window: usize,
    #[serde(skip)]
    active_errors: BTreeSet<FormErrorType>,
}

impl ExerciseSession {
    pub fn new(
        exercise: ExerciseType,
        discipline: Discipline,
        target_reps: u32,
        rolling_window: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            exercise,
            discipline,
            status: SessionStatus::Preparing,
            rep_count: 0,
            target_reps,
            elapsed_ms: 0,
            rolling_form_score: 0.0,
            feedback_history: Vec::new(),
            rep_history: Vec::new(),
            error_counts: BTreeMap::new(),
            last_timestamp_ms: None,
            recent_scores: VecDeque::with_capacity(rolling_window),
            rolling_window: rolling_window.max(1),
            active_errors: BTreeSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Advances the clock by the gap since the previous frame.
    pub fn advance_clock(&mut self, timestamp_ms: u64) {
        if let Some(last) = self.last_timestamp_ms {
            self.elapsed_ms += timestamp_ms.saturating_sub(last);
        }
        self.last_timestamp_ms = Some(timestamp_ms);
    }

    /// Forget the previous frame time so a pause does not count as active time.
    pub fn hold_clock(&mut self) {
        self.last_timestamp_ms = None;
    }

    pub fn record_validation(&mut self, result: &FormValidationResult) {
        if self.recent_scores.len() == self.rolling_window {
            self.recent_scores.pop_front();
        }
        self.recent_scores.push_back(result.score);
        self.rolling_form_score =
            self.recent_scores.iter().sum::<f32>() / self.recent_scores.len() as f32;

        let present: BTreeSet<FormErrorType> = result.errors.iter().map(|e| e.error_type).collect();
        for error_type in present.difference(&self.active_errors) {
            *self.error_counts.entry(*error_type).or_insert(0) += 1;
        }
        self.active_errors = present;
    }

    pub fn record_rep(&mut self, rep: AcceptedRep) {
        self.rep_count = rep.count;
        self.rep_history.push(rep);
    }

    pub fn record_prompt(&mut self, prompt: FeedbackPrompt) {
        self.feedback_history.push(prompt);
    }

    /// Returns false when the event names a prompt this session never saw.
    pub fn apply_delivery(&mut self, event: &DeliveryEvent) -> bool {
        match self
            .feedback_history
            .iter_mut()
            .rev()
            .find(|p| p.id == event.prompt_id)
        {
            Some(prompt) => {
                prompt.status = event.status;
                true
            }
            None => false,
        }
    }

    /// Resolves prompts whose delivery will never be reported, such as the
    /// ones dropped when the queue is cleared. Returns how many changed.
    pub fn settle_unfinished(&mut self) -> usize {
        let mut settled = 0;
        for prompt in self.feedback_history.iter_mut().filter(|p| !p.status.is_terminal()) {
            prompt.status = prompt.interrupted_status();
            settled += 1;
        }
        settled
    }

    pub fn target_reached(&self) -> bool {
        self.target_reps > 0 && self.rep_count >= self.target_reps
    }

    pub fn summary(&self, stats: RepStats) -> SessionSummary {
        let count = |status: DeliveryStatus| {
            self.feedback_history
                .iter()
                .filter(|p| p.status == status)
                .count() as u32
        };

        SessionSummary {
            session_id: self.id.clone(),
            exercise: self.exercise,
            discipline: self.discipline,
            status: self.status,
            started_at: self.started_at,
            ended_at: Utc::now(),
            elapsed_ms: self.elapsed_ms,
            rep_count: self.rep_count,
            target_reps: self.target_reps,
            rolling_form_score: self.rolling_form_score,
            stats,
            prompts_total: self.feedback_history.len() as u32,
            prompts_completed: count(DeliveryStatus::Completed),
            prompts_skipped: count(DeliveryStatus::Skipped),
            prompts_failed: count(DeliveryStatus::Failed),
            error_counts: self.error_counts.clone(),
            reps: self.rep_history.clone(),
        }
    }
}

/// End-of-session report. Returned to the caller, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub exercise: ExerciseType,
    pub discipline: Discipline,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub rep_count: u32,
    pub target_reps: u32,
    pub rolling_form_score: f32,
    pub stats: RepStats,
    pub prompts_total: u32,
    pub prompts_completed: u32,
    pub prompts_skipped: u32,
    pub prompts_failed: u32,
    pub error_counts: BTreeMap<FormErrorType, u32>,
    pub reps: Vec<AcceptedRep>,
}

/// One landmark as the renderer should draw it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkOverlay {
    pub id: LandmarkId,
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub visibility: f32,
    /// Most severe failed check this landmark took part in.
    pub flagged: Option<Severity>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    pub frame: PoseFrame,
    pub validation: FormValidationResult,
    pub overlay: Vec<LandmarkOverlay>,
    pub phase: RepPhase,
    pub progress: f32,
    pub rep_count: u32,
    pub target_reps: u32,
}

impl RenderSnapshot {
    pub fn overlay_for(frame: &PoseFrame, validation: &FormValidationResult) -> Vec<LandmarkOverlay> {
        LandmarkId::ALL
            .iter()
            .filter_map(|id| {
                let landmark = frame.get(*id)?;
                let flagged = validation
                    .errors
                    .iter()
                    .filter(|e| e.landmarks.contains(id))
                    .map(|e| e.severity)
                    .max();
                Some(LandmarkOverlay {
                    id: *id,
                    x: landmark.x,
                    y: landmark.y,
                    depth: landmark.z,
                    visibility: landmark.visibility,
                    flagged,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormError;

    fn result(score: f32, errors: &[(FormErrorType, Severity)]) -> FormValidationResult {
        FormValidationResult {
            score,
            errors: errors
                .iter()
                .map(|(error_type, severity)| FormError {
                    error_type: *error_type,
                    severity: *severity,
                    description: String::new(),
                    measured_value: 0.0,
                    threshold: 0.0,
                    correction: String::new(),
                    deduction: 0.0,
                    landmarks: vec![LandmarkId::LeftHip],
                })
                .collect(),
            is_acceptable: score >= 70.0,
            measurements: BTreeMap::new(),
        }
    }

    fn session() -> ExerciseSession {
        ExerciseSession::new(ExerciseType::PushUp, Discipline::General, 10, 3)
    }

    #[test]
    fn rolling_score_covers_the_last_window() {
        let mut session = session();
        for score in [100.0, 40.0, 70.0, 100.0] {
            session.record_validation(&result(score, &[]));
        }
        assert!((session.rolling_form_score - 70.0).abs() < 1e-4);
    }

    #[test]
    fn error_runs_are_counted_once() {
        let mut session = session();
        let tilt = [(FormErrorType::ShoulderTilt, Severity::Normal)];
        session.record_validation(&result(90.0, &tilt));
        session.record_validation(&result(90.0, &tilt));
        session.record_validation(&result(100.0, &[]));
        session.record_validation(&result(90.0, &tilt));

        assert_eq!(session.error_counts[&FormErrorType::ShoulderTilt], 2);
    }

    #[test]
    fn clock_skips_paused_gaps() {
        let mut session = session();
        session.advance_clock(1_000);
        session.advance_clock(1_500);
        session.hold_clock();
        session.advance_clock(9_000);
        session.advance_clock(9_100);
        assert_eq!(session.elapsed_ms, 600);
    }

    #[test]
    fn delivery_events_update_history() {
        use crate::coaching::PromptCategory;

        let mut session = session();
        let prompt = FeedbackPrompt::new("x", "X", PromptCategory::Corrective, Severity::Normal, 0);
        let event = DeliveryEvent {
            prompt_id: prompt.id.clone(),
            message_id: prompt.message_id.clone(),
            status: DeliveryStatus::Completed,
            detail: None,
        };
        session.record_prompt(prompt);

        assert!(session.apply_delivery(&event));
        assert_eq!(session.feedback_history[0].status, DeliveryStatus::Completed);
        assert!(!session.apply_delivery(&DeliveryEvent {
            prompt_id: "unknown".into(),
            ..event
        }));
    }

    #[test]
    fn unfinished_prompts_settle_by_severity() {
        use crate::coaching::PromptCategory;

        let mut session = session();
        let mut done = FeedbackPrompt::new("done", "D", PromptCategory::Corrective, Severity::Normal, 0);
        done.status = DeliveryStatus::Completed;
        let mut speaking = FeedbackPrompt::new("warn", "W", PromptCategory::Warning, Severity::Critical, 0);
        speaking.status = DeliveryStatus::Speaking;
        session.record_prompt(done);
        session.record_prompt(speaking);
        session.record_prompt(FeedbackPrompt::new("tip", "T", PromptCategory::Corrective, Severity::High, 0));

        assert_eq!(session.settle_unfinished(), 2);
        let statuses: Vec<_> = session.feedback_history.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![DeliveryStatus::Completed, DeliveryStatus::Failed, DeliveryStatus::Skipped]
        );
        assert_eq!(session.settle_unfinished(), 0);
    }
}
