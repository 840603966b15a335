use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::coaching::{MotivationConfig, RepCounterConfig, DEFAULT_DEDUP_WINDOW_MS};
use crate::exercise::{Discipline, ExerciseType};
use crate::voice::ChannelConfig;

const MAX_SMOOTHING_WINDOW: usize = 30;

/// Session parameters as read from JSON. Keys are camelCase and every field
/// has a default, so `{}` is a valid push-up session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    pub exercise: String,
    pub discipline: String,
    pub target_reps: u32,
    pub min_form_score: f32,
    pub debounce_ms: u64,
    pub queue_capacity: usize,
    pub spacing_ms: u64,
    pub dedup_window_ms: u64,
    /// Frames averaged before analysis; 1 turns smoothing off.
    pub smoothing_window: usize,
    pub rolling_score_window: usize,
    pub streak_threshold: u32,
    pub motivation_seed: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            exercise: ExerciseType::PushUp.as_str().into(),
            discipline: Discipline::General.as_str().into(),
            target_reps: 10,
            min_form_score: 50.0,
            debounce_ms: 500,
            queue_capacity: 3,
            spacing_ms: 200,
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            smoothing_window: 1,
            rolling_score_window: 30,
            streak_threshold: 5,
            motivation_seed: None,
        }
    }
}

/// Validated, typed form of [`SessionSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub exercise: ExerciseType,
    pub discipline: Discipline,
    pub target_reps: u32,
    pub rep_counter: RepCounterConfig,
    pub channel: ChannelConfig,
    pub dedup_window_ms: u64,
    pub smoothing_window: usize,
    pub rolling_score_window: usize,
    pub motivation: MotivationConfig,
}

impl SessionSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid session settings in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write session settings to {}", path.display()))
    }

    pub fn resolve(&self) -> Result<SessionConfig> {
        let exercise: ExerciseType = self.exercise.parse()?;
        let discipline: Discipline = self.discipline.parse()?;

        if !(0.0..=100.0).contains(&self.min_form_score) {
            bail!("minFormScore must be within 0-100, got {}", self.min_form_score);
        }
        if self.queue_capacity == 0 {
            bail!("queueCapacity must be at least 1");
        }
        if self.smoothing_window == 0 || self.smoothing_window > MAX_SMOOTHING_WINDOW {
            bail!(
                "smoothingWindow must be within 1-{}, got {}",
                MAX_SMOOTHING_WINDOW,
                self.smoothing_window
            );
        }
        if self.rolling_score_window == 0 {
            bail!("rollingScoreWindow must be at least 1");
        }
        if self.streak_threshold == 0 {
            bail!("streakThreshold must be at least 1");
        }

        Ok(SessionConfig {
            exercise,
            discipline,
            target_reps: self.target_reps,
            rep_counter: RepCounterConfig {
                debounce_ms: self.debounce_ms,
                min_form_score: self.min_form_score,
            },
            channel: ChannelConfig {
                capacity: self.queue_capacity,
                spacing: Duration::from_millis(self.spacing_ms),
            },
            dedup_window_ms: self.dedup_window_ms,
            smoothing_window: self.smoothing_window,
            rolling_score_window: self.rolling_score_window,
            motivation: MotivationConfig {
                streak_threshold: self.streak_threshold,
                seed: self.motivation_seed,
                ..MotivationConfig::default()
            },
        })
    }
}

impl SessionConfig {
    pub fn new(exercise: ExerciseType, discipline: Discipline) -> Self {
        Self {
            exercise,
            discipline,
            target_reps: 10,
            rep_counter: RepCounterConfig::default(),
            channel: ChannelConfig::default(),
            dedup_window_ms: DEFAULT_DEDUP_WINDOW_MS,
            smoothing_window: 1,
            rolling_score_window: 30,
            motivation: MotivationConfig::default(),
        }
    }
}
