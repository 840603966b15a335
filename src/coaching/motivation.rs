use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::form::{Severity, ACCEPTABLE_SCORE};
use crate::log_debug;

use super::phrases;
use super::{FeedbackPrompt, PromptCategory};

const ENABLE_LOGS: bool = false;

pub const DEFAULT_MILESTONES: [u32; 4] = [25, 50, 75, 100];
pub const DEFAULT_STREAK_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct MotivationConfig {
    /// Percentages of the target, ascending.
    pub milestones: Vec<u32>,
    pub streak_threshold: u32,
    pub good_form_cutoff: f32,
    /// Fixes phrase variant selection; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for MotivationConfig {
    fn default() -> Self {
        Self {
            milestones: DEFAULT_MILESTONES.to_vec(),
            streak_threshold: DEFAULT_STREAK_THRESHOLD,
            good_form_cutoff: ACCEPTABLE_SCORE,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MotivationSnapshot {
    pub streak: u32,
    pub last_celebrated_streak: u32,
    pub triggered_milestones: Vec<u32>,
}

pub struct MotivationEngine {
    config: MotivationConfig,
    triggered: BTreeSet<u32>,
    streak: u32,
    last_celebrated: u32,
    rng: StdRng,
}

impl MotivationEngine {
    pub fn new(mut config: MotivationConfig) -> Self {
        config.milestones.sort_unstable();
        config.milestones.dedup();
        let rng = seeded(config.seed);
        Self {
            config,
            triggered: BTreeSet::new(),
            streak: 0,
            last_celebrated: 0,
            rng,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn snapshot(&self) -> MotivationSnapshot {
        MotivationSnapshot {
            streak: self.streak,
            last_celebrated_streak: self.last_celebrated,
            triggered_milestones: self.triggered.iter().copied().collect(),
        }
    }

    /// Called once per accepted rep. A streak celebration wins over a
    /// milestone landing on the same rep; the milestone fires on a later call.
    pub fn evaluate(
        &mut self,
        rep_count: u32,
        target_reps: u32,
        last_score: f32,
        now_ms: u64,
    ) -> Option<FeedbackPrompt> {
        if last_score >= self.config.good_form_cutoff {
            self.streak += 1;
        } else {
            // The celebrated high-water mark survives; only reset() clears it.
            self.streak = 0;
        }

        let threshold = self.config.streak_threshold;
        if threshold > 0
            && self.streak >= threshold
            && self.streak % threshold == 0
            && self.streak > self.last_celebrated
        {
            self.last_celebrated = self.streak;
            let (id, text) = phrases::streak(self.streak, &mut self.rng);
            log_debug!("[MOTIVATION] streak {} celebrated", self.streak);
            return Some(
                FeedbackPrompt::new(id, text, PromptCategory::Motivational, Severity::Info, now_ms)
                    .with_trigger("streak", self.streak as f32, threshold as f32)
                    .with_rep(rep_count),
            );
        }

        if target_reps == 0 {
            return None;
        }
        let percent = rep_count as f32 / target_reps as f32 * 100.0;
        let milestone = self
            .config
            .milestones
            .iter()
            .copied()
            .find(|m| !self.triggered.contains(m) && percent >= *m as f32)?;
        self.triggered.insert(milestone);

        let (id, text) = phrases::milestone(milestone, &mut self.rng);
        let (category, severity) = if milestone >= 100 {
            (PromptCategory::Confirmation, Severity::High)
        } else {
            (PromptCategory::Motivational, Severity::Normal)
        };
        log_debug!("[MOTIVATION] milestone {}% reached at rep {}", milestone, rep_count);
        Some(
            FeedbackPrompt::new(id, text, category, severity, now_ms)
                .with_trigger("milestone", percent, milestone as f32)
                .with_rep(rep_count),
        )
    }

    pub fn reset(&mut self) {
        self.triggered.clear();
        self.streak = 0;
        self.last_celebrated = 0;
        self.rng = seeded(self.config.seed);
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
