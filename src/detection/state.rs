use serde::{Deserialize, Serialize};

use crate::exercise::ExerciseType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RepPhase {
    Neutral,
    Down,
    Up,
}

impl Default for RepPhase {
    fn default() -> Self {
        RepPhase::Neutral
    }
}

impl RepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepPhase::Neutral => "neutral",
            RepPhase::Down => "down",
            RepPhase::Up => "up",
        }
    }
}

/// One completed engage/release cycle as seen by the detector, before any
/// quality gating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepEvent {
    pub rep_number: u32,
    pub exercise: ExerciseType,
    pub start_frame: u64,
    pub end_frame: u64,
    pub start_timestamp_ms: u64,
    pub end_timestamp_ms: u64,
    pub duration_ms: u64,
    pub peak_value: f32,
    pub peak_frame: u64,
    pub threshold_met: bool,
}

/// Mutable machine state owned by a single detector.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorState {
    pub phase: RepPhase,
    /// How far the current motion has travelled toward the target, 0-100.
    pub progress: f32,
    pub reps_detected: u32,
    pub last_metric: Option<f32>,
    /// Set only while the engaged phase is active.
    #[serde(skip)]
    pub cycle: Option<CycleState>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleState {
    pub start_frame: u64,
    pub start_timestamp_ms: u64,
    pub peak_value: f32,
    pub peak_frame: u64,
}

impl DetectorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_cycle(&mut self, phase: RepPhase, frame: u64, timestamp_ms: u64, metric: f32) {
        self.phase = phase;
        self.cycle = Some(CycleState {
            start_frame: frame,
            start_timestamp_ms: timestamp_ms,
            peak_value: metric,
            peak_frame: frame,
        });
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
