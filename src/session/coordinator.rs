use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::coaching::{
    AcceptedRep, FeedbackContext, FeedbackGenerator, FeedbackPrompt, MotivationEngine,
    MotivationSnapshot, RepCounter, RepStats,
};
use crate::detection::{DetectorSnapshot, RepDetector, RepEvent};
use crate::exercise::validate_table;
use crate::form::{FormErrorType, FormValidationResult, FormValidator};
use crate::pose::{LandmarkSmoother, PoseFrame};
use crate::settings::{SessionConfig, SessionSettings};
use crate::voice::{DeliveryEvent, FeedbackChannel, Speaker};
use crate::{log_debug, log_info, log_warn};

use super::{ExerciseSession, RenderSnapshot, SessionStatus, SessionSummary};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

/// Frame scores kept for rep scoring; about 30 seconds at 30 FPS.
const FRAME_SCORE_HISTORY: usize = 900;

/// Everything one processed frame produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutcome {
    pub sequence: u64,
    pub validation: FormValidationResult,
    pub detector: DetectorSnapshot,
    /// Set whenever the detector closed a cycle, accepted or not.
    pub detected_rep: Option<RepEvent>,
    pub accepted_rep: Option<AcceptedRep>,
    /// Prompts offered to the delivery channel for this frame.
    pub prompts: Vec<FeedbackPrompt>,
    pub status: SessionStatus,
}

/// Owns one session and every component that feeds it. All session
/// mutation happens here, one frame at a time.
pub struct SessionCoordinator {
    config: SessionConfig,
    session: ExerciseSession,
    smoother: LandmarkSmoother,
    detector: RepDetector,
    validator: FormValidator,
    feedback: FeedbackGenerator,
    motivation: MotivationEngine,
    counter: RepCounter,
    channel: FeedbackChannel,
    deliveries: mpsc::UnboundedReceiver<DeliveryEvent>,
    last_sequence: Option<u64>,
    frame_scores: VecDeque<(u64, f32)>,
    latest: Option<(PoseFrame, FormValidationResult)>,
}

impl SessionCoordinator {
    /// Builds every component up front so configuration problems surface
    /// here rather than on the first frame. Must be called inside a tokio
    /// runtime; the delivery channel runs as a task on it.
    pub fn new(config: SessionConfig, speaker: Arc<dyn Speaker>) -> Result<Self> {
        validate_table().context("form threshold table failed validation")?;
        let validator = FormValidator::new(config.exercise, config.discipline)?;
        Handle::try_current().context("a coaching session needs a running tokio runtime")?;

        let (channel, deliveries) = FeedbackChannel::spawn(speaker, config.channel);
        let session = ExerciseSession::new(
            config.exercise,
            config.discipline,
            config.target_reps,
            config.rolling_score_window,
        );
        log_info!(
            "[SESSION] {} prepared: {} ({}), target {} reps, speaker {}",
            session.id,
            config.exercise,
            config.discipline,
            config.target_reps,
            channel.speaker_name()
        );

        Ok(Self {
            smoother: LandmarkSmoother::new(config.smoothing_window),
            detector: RepDetector::new(config.exercise),
            validator,
            feedback: FeedbackGenerator::new(config.dedup_window_ms),
            motivation: MotivationEngine::new(config.motivation.clone()),
            counter: RepCounter::new(config.rep_counter),
            channel,
            deliveries,
            session,
            config,
            last_sequence: None,
            frame_scores: VecDeque::new(),
            latest: None,
        })
    }

    pub fn from_settings(settings: &SessionSettings, speaker: Arc<dyn Speaker>) -> Result<Self> {
        Self::new(settings.resolve()?, speaker)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session(&self) -> &ExerciseSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn channel(&self) -> &FeedbackChannel {
        &self.channel
    }

    pub fn detector(&self) -> DetectorSnapshot {
        self.detector.snapshot()
    }

    pub fn motivation(&self) -> MotivationSnapshot {
        self.motivation.snapshot()
    }

    pub fn rep_stats(&self) -> RepStats {
        self.counter.stats()
    }

    pub fn start(&mut self) -> Result<()> {
        if self.session.status != SessionStatus::Preparing {
            bail!("cannot start a session that is {}", self.session.status.as_str());
        }
        self.session.status = SessionStatus::Active;
        self.session.started_at = Utc::now();
        log_info!("[SESSION] {} started", self.session.id);
        Ok(())
    }

    /// A half-finished rep is discarded on pause.
    pub fn pause(&mut self) -> Result<()> {
        if self.session.status != SessionStatus::Active {
            bail!("cannot pause a session that is {}", self.session.status.as_str());
        }
        self.session.status = SessionStatus::Paused;
        self.session.hold_clock();
        self.detector.reset();
        self.smoother.reset();
        log_info!(
            "[SESSION] {} paused at {} reps",
            self.session.id,
            self.session.rep_count
        );
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.session.status != SessionStatus::Paused {
            bail!("cannot resume a session that is {}", self.session.status.as_str());
        }
        self.session.status = SessionStatus::Active;
        log_info!("[SESSION] {} resumed", self.session.id);
        Ok(())
    }

    /// Runs one frame through validation, detection, counting and feedback.
    /// Returns `None` for frames that were ignored: session not active, or
    /// a sequence number at or below the last one processed.
    pub fn process_frame(&mut self, frame: PoseFrame) -> Option<FrameOutcome> {
        if !self.session.is_active() {
            log_debug!(
                "[SESSION] ignoring frame {} while {}",
                frame.sequence,
                self.session.status.as_str()
            );
            return None;
        }
        if let Some(last) = self.last_sequence {
            if frame.sequence <= last {
                log_warn!(
                    "[SESSION] dropping out-of-order frame {} (last processed {})",
                    frame.sequence,
                    last
                );
                return None;
            }
        }
        self.last_sequence = Some(frame.sequence);
        self.sync_deliveries();

        let frame = self.smoother.apply(frame);
        let now_ms = frame.timestamp_ms;
        self.session.advance_clock(now_ms);

        let validation = self.validator.validate(&frame);
        self.session.record_validation(&validation);
        let incomplete = validation
            .errors
            .iter()
            .any(|e| e.error_type == FormErrorType::PoseIncomplete);
        if !incomplete {
            if self.frame_scores.len() == FRAME_SCORE_HISTORY {
                self.frame_scores.pop_front();
            }
            self.frame_scores.push_back((frame.sequence, validation.score));
        }

        let mut prompts = Vec::new();
        let held = self.channel.held_messages();
        if let Some(prompt) = self.feedback.generate(&validation, &self.feedback_context(now_ms, &held)) {
            self.offer(prompt, &mut prompts);
        }

        let detected = self.detector.process_frame(&frame);
        let mut accepted = None;
        if let Some(event) = &detected {
            let score = self.rep_score(event, validation.score);
            if let Some(rep) = self.counter.process(event, score) {
                log_info!(
                    "[SESSION] rep {}/{} counted (form {:.0}, {}ms)",
                    rep.count,
                    self.session.target_reps,
                    score,
                    event.duration_ms
                );
                self.session.record_rep(rep.clone());

                let held = self.channel.held_messages();
                let cue = self
                    .feedback
                    .for_incomplete_rep(event, rep.count, &self.feedback_context(now_ms, &held));
                if let Some(cue) = cue {
                    self.offer(cue, &mut prompts);
                }
                if let Some(prompt) =
                    self.motivation
                        .evaluate(rep.count, self.session.target_reps, score, now_ms)
                {
                    self.offer(prompt, &mut prompts);
                }
                accepted = Some(rep);
            }
        }

        if self.session.target_reached() {
            self.session.status = SessionStatus::Completed;
            log_info!(
                "[SESSION] {} reached its target of {} reps",
                self.session.id,
                self.session.target_reps
            );
        }

        self.latest = Some((frame.clone(), validation.clone()));
        Some(FrameOutcome {
            sequence: frame.sequence,
            validation,
            detector: self.detector.snapshot(),
            detected_rep: detected,
            accepted_rep: accepted,
            prompts,
            status: self.session.status,
        })
    }

    /// Applies pending delivery status changes to the feedback history.
    pub fn sync_deliveries(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.deliveries.try_recv() {
            if self.session.apply_delivery(&event) {
                applied += 1;
            }
        }
        applied
    }

    pub fn render_snapshot(&self) -> Option<RenderSnapshot> {
        let (frame, validation) = self.latest.as_ref()?;
        Some(RenderSnapshot {
            overlay: RenderSnapshot::overlay_for(frame, validation),
            frame: frame.clone(),
            validation: validation.clone(),
            phase: self.detector.phase(),
            progress: self.detector.progress(),
            rep_count: self.session.rep_count,
            target_reps: self.session.target_reps,
        })
    }

    /// Drops pending non-critical feedback, cuts off speech, stops the
    /// delivery task and resets every component. Prompts that never got to
    /// play end up failed when critical and skipped otherwise. The session
    /// cannot be restarted afterwards.
    pub async fn end(&mut self) -> Result<SessionSummary> {
        let dropped = self.channel.clear_queue();
        self.channel.stop();
        self.channel.shutdown().await?;
        self.sync_deliveries();
        let unsettled = self.session.settle_unfinished();
        if unsettled > 0 {
            log_debug!("[SESSION] settled {} prompts that never played", unsettled);
        }

        self.session.status = SessionStatus::Completed;
        let summary = self.session.summary(self.counter.stats());

        self.detector.reset();
        self.motivation.reset();
        self.counter.reset();
        self.smoother.reset();
        self.frame_scores.clear();
        self.latest = None;

        log_info!(
            "[SESSION] {} ended: {} reps in {}ms, {} pending prompts dropped",
            summary.session_id,
            summary.rep_count,
            summary.elapsed_ms,
            dropped
        );
        Ok(summary)
    }

    fn feedback_context<'a>(&'a self, now_ms: u64, pending: &'a [String]) -> FeedbackContext<'a> {
        FeedbackContext {
            history: &self.session.feedback_history,
            now_ms,
            elapsed_ms: self.session.elapsed_ms,
            rep_count: self.session.rep_count,
            pending,
        }
    }

    /// Same message already waiting or playing: drop the new one.
    fn offer(&mut self, mut prompt: FeedbackPrompt, offered: &mut Vec<FeedbackPrompt>) {
        if self.channel.holds(&prompt.message_id) {
            log_debug!("[SESSION] \"{}\" already pending", prompt.message_id);
            return;
        }
        prompt.status = self.channel.submit(prompt.clone());
        offered.push(prompt.clone());
        self.session.record_prompt(prompt);
    }

    /// Mean score of the complete frames the rep spanned.
    fn rep_score(&self, event: &RepEvent, fallback: f32) -> f32 {
        let (sum, count) = self
            .frame_scores
            .iter()
            .filter(|(seq, _)| (event.start_frame..=event.end_frame).contains(seq))
            .fold((0.0f32, 0u32), |(sum, count), (_, score)| (sum + score, count + 1));
        if count == 0 {
            fallback
        } else {
            sum / count as f32
        }
    }
}
