use crate::detection::RepEvent;
use crate::form::{FormValidationResult, Severity};
use crate::log_debug;

use super::phrases::{self, Phrase};
use super::{FeedbackPrompt, PromptCategory};

const ENABLE_LOGS: bool = false;

pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 5_000;

/// What the generator may look at when deciding whether to speak.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackContext<'a> {
    pub history: &'a [FeedbackPrompt],
    pub now_ms: u64,
    pub elapsed_ms: u64,
    pub rep_count: u32,
    /// Messages already waiting on or playing through the delivery channel.
    pub pending: &'a [String],
}

impl FeedbackContext<'_> {
    fn is_pending(&self, message_id: &str) -> bool {
        self.pending.iter().any(|m| m == message_id)
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackGenerator {
    dedup_window_ms: u64,
}

impl Default for FeedbackGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW_MS)
    }
}

impl FeedbackGenerator {
    pub fn new(dedup_window_ms: u64) -> Self {
        Self { dedup_window_ms }
    }

    pub fn dedup_window_ms(&self) -> u64 {
        self.dedup_window_ms
    }

    /// At most one corrective prompt: the most severe error whose phrase is
    /// not already pending and was not said inside the window. Critical
    /// errors ignore the window.
    pub fn generate(
        &self,
        result: &FormValidationResult,
        ctx: &FeedbackContext<'_>,
    ) -> Option<FeedbackPrompt> {
        for error in &result.errors {
            let phrase = phrases::corrective(error.error_type);
            let critical = error.severity == Severity::Critical;

            if ctx.is_pending(phrase.id) {
                log_debug!("[FEEDBACK] {} already pending, trying next error", phrase.id);
                continue;
            }
            if !critical && self.recently_said(phrase, ctx) {
                log_debug!(
                    "[FEEDBACK] suppressing {} ({}), said within {}ms",
                    phrase.id,
                    error.error_type.as_str(),
                    self.dedup_window_ms
                );
                continue;
            }

            let category = if critical {
                PromptCategory::Warning
            } else {
                PromptCategory::Corrective
            };
            let prompt = FeedbackPrompt::new(phrase.id, phrase.text, category, error.severity, ctx.now_ms)
                .with_trigger(error.error_type.as_str(), error.measured_value, error.threshold);
            return Some(prompt);
        }
        None
    }

    /// Cue for a counted rep that never reached its depth or height target.
    pub fn for_incomplete_rep(
        &self,
        rep: &RepEvent,
        rep_number: u32,
        ctx: &FeedbackContext<'_>,
    ) -> Option<FeedbackPrompt> {
        if rep.threshold_met {
            return None;
        }
        let phrase = phrases::incomplete_rep(rep.exercise);
        if ctx.is_pending(phrase.id) || self.recently_said(phrase, ctx) {
            return None;
        }
        Some(
            FeedbackPrompt::new(
                phrase.id,
                phrase.text,
                PromptCategory::Instructional,
                Severity::Normal,
                ctx.now_ms,
            )
            .with_trigger("rep_peak", rep.peak_value, 0.0)
            .with_rep(rep_number),
        )
    }

    fn recently_said(&self, phrase: Phrase, ctx: &FeedbackContext<'_>) -> bool {
        ctx.history.iter().rev().any(|prior| {
            prior.message_id == phrase.id
                && prior.status.counts_as_delivered()
                && ctx.now_ms.saturating_sub(prior.triggered_at_ms) < self.dedup_window_ms
        })
    }
}
