use serde::{Deserialize, Serialize};

use crate::detection::RepEvent;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_MIN_FORM_SCORE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepCounterConfig {
    pub debounce_ms: u64,
    pub min_form_score: f32,
}

impl Default for RepCounterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_form_score: DEFAULT_MIN_FORM_SCORE,
        }
    }
}

/// A detected rep that passed the quality gates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedRep {
    /// Position among accepted reps; differs from the detector's ordinal
    /// once anything has been rejected.
    pub count: u32,
    pub form_score: f32,
    pub accepted_at_ms: u64,
    pub event: RepEvent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    TooSoon { since_last_ms: u64 },
    PoorForm { score: f32 },
}

impl RejectReason {
    pub fn describe(&self, config: &RepCounterConfig) -> String {
        match self {
            RejectReason::TooSoon { since_last_ms } => format!(
                "{}ms after the previous rep (debounce {}ms)",
                since_last_ms, config.debounce_ms
            ),
            RejectReason::PoorForm { score } => format!(
                "form score {:.0} below minimum {:.0}",
                score, config.min_form_score
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepStats {
    pub total_accepted: u32,
    pub rejected: u32,
    pub average_form_score: f32,
    pub best_rep: Option<u32>,
    pub best_form_score: Option<f32>,
    pub average_duration_ms: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RepCounter {
    config: RepCounterConfig,
    history: Vec<AcceptedRep>,
    rejected: u32,
}

impl RepCounter {
    pub fn new(config: RepCounterConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
            rejected: 0,
        }
    }

    pub fn config(&self) -> &RepCounterConfig {
        &self.config
    }

    pub fn count(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn history(&self) -> &[AcceptedRep] {
        &self.history
    }

    pub fn process(&mut self, event: &RepEvent, form_score: f32) -> Option<AcceptedRep> {
        if let Err(reason) = self.check(event, form_score) {
            self.rejected += 1;
            log_info!(
                "[REPS] rejected detected rep {}: {}",
                event.rep_number,
                reason.describe(&self.config)
            );
            return None;
        }

        let accepted = AcceptedRep {
            count: self.count() + 1,
            form_score,
            accepted_at_ms: event.end_timestamp_ms,
            event: event.clone(),
        };
        log_debug!(
            "[REPS] accepted rep {} (score {:.0}, {}ms)",
            accepted.count,
            form_score,
            event.duration_ms
        );
        self.history.push(accepted.clone());
        Some(accepted)
    }

    fn check(&self, event: &RepEvent, form_score: f32) -> Result<(), RejectReason> {
        if let Some(last) = self.history.last() {
            let since_last_ms = event.end_timestamp_ms.saturating_sub(last.accepted_at_ms);
            if since_last_ms < self.config.debounce_ms {
                return Err(RejectReason::TooSoon { since_last_ms });
            }
        }
        if !form_score.is_finite() || form_score < self.config.min_form_score {
            return Err(RejectReason::PoorForm { score: form_score });
        }
        Ok(())
    }

    pub fn stats(&self) -> RepStats {
        let total = self.history.len();
        if total == 0 {
            return RepStats {
                rejected: self.rejected,
                ..RepStats::default()
            };
        }

        let score_sum: f32 = self.history.iter().map(|r| r.form_score).sum();
        let duration_sum: u64 = self.history.iter().map(|r| r.event.duration_ms).sum();
        // First rep wins ties.
        let best = self
            .history
            .iter()
            .fold(None::<&AcceptedRep>, |best, rep| match best {
                Some(b) if b.form_score >= rep.form_score => Some(b),
                _ => Some(rep),
            });

        RepStats {
            total_accepted: total as u32,
            rejected: self.rejected,
            average_form_score: score_sum / total as f32,
            best_rep: best.map(|r| r.count),
            best_form_score: best.map(|r| r.form_score),
            average_duration_ms: duration_sum as f32 / total as f32,
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.rejected = 0;
    }
}
