use serde::Serialize;

use crate::exercise::ExerciseType;
use crate::pose::{geometry, LandmarkId, PoseFrame};

use super::{RepEvent, RepPhase};
use super::state::DetectorState;

// Per-frame transitions are noisy; flip on when tuning thresholds.
const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Which way the extension metric moves when the user engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricDirection {
    /// The metric falls while engaged (joint angle closing); peak is the minimum.
    Closing,
    /// The metric rises while engaged (limbs opening); peak is the maximum.
    Opening,
}

/// Engage/target/release levels for one exercise. The gap between `engage`
/// and `release` acts as the hysteresis band that keeps a metric hovering at
/// one level from re-triggering the machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionProfile {
    pub direction: MetricDirection,
    pub engage: f32,
    /// Peak value a full-range rep must reach.
    pub target: f32,
    pub release: f32,
    pub engaged_phase: RepPhase,
    pub released_phase: RepPhase,
}

impl DetectionProfile {
    pub fn for_exercise(exercise: ExerciseType) -> Self {
        match exercise {
            // Average elbow angle in degrees.
            ExerciseType::PushUp => Self {
                direction: MetricDirection::Closing,
                engage: 120.0,
                target: 90.0,
                release: 160.0,
                engaged_phase: RepPhase::Down,
                released_phase: RepPhase::Up,
            },
            // Hip y minus knee y of the higher knee; 0 means the thigh is level.
            ExerciseType::Marching => Self {
                direction: MetricDirection::Opening,
                engage: -0.12,
                target: -0.05,
                release: -0.16,
                engaged_phase: RepPhase::Up,
                released_phase: RepPhase::Down,
            },
            // Wrist spread plus ankle spread, in shoulder widths.
            ExerciseType::JumpingJack => Self {
                direction: MetricDirection::Opening,
                engage: 2.8,
                target: 3.5,
                release: 2.3,
                engaged_phase: RepPhase::Up,
                released_phase: RepPhase::Down,
            },
        }
    }

    fn engaged(&self, metric: f32) -> bool {
        match self.direction {
            MetricDirection::Closing => metric < self.engage,
            MetricDirection::Opening => metric > self.engage,
        }
    }

    fn released(&self, metric: f32) -> bool {
        match self.direction {
            MetricDirection::Closing => metric > self.release,
            MetricDirection::Opening => metric < self.release,
        }
    }

    fn more_extreme(&self, candidate: f32, current: f32) -> bool {
        match self.direction {
            MetricDirection::Closing => candidate < current,
            MetricDirection::Opening => candidate > current,
        }
    }

    fn meets_target(&self, peak: f32) -> bool {
        match self.direction {
            MetricDirection::Closing => peak <= self.target,
            MetricDirection::Opening => peak >= self.target,
        }
    }

    fn progress(&self, metric: f32) -> f32 {
        let span = self.target - self.release;
        if span.abs() < f32::EPSILON {
            return 0.0;
        }
        ((metric - self.release) / span * 100.0).clamp(0.0, 100.0)
    }
}

/// Scalar the detector tracks for `exercise`, or `None` when the landmarks it
/// needs are missing or degenerate.
pub fn extension_metric(exercise: ExerciseType, frame: &PoseFrame) -> Option<f32> {
    use LandmarkId::*;

    match exercise {
        ExerciseType::PushUp => {
            let [ls, le, lw, rs, re, rw] =
                frame.require([LeftShoulder, LeftElbow, LeftWrist, RightShoulder, RightElbow, RightWrist])?;
            let left = geometry::angle_between(ls, le, lw);
            let right = geometry::angle_between(rs, re, rw);
            Some((left + right) / 2.0)
        }
        ExerciseType::Marching => {
            let [lh, lk, rh, rk] = frame.require([LeftHip, LeftKnee, RightHip, RightKnee])?;
            Some((lh.y - lk.y).max(rh.y - rk.y))
        }
        ExerciseType::JumpingJack => {
            let [ls, rs, lw, rw, la, ra] =
                frame.require([LeftShoulder, RightShoulder, LeftWrist, RightWrist, LeftAnkle, RightAnkle])?;
            let shoulder_width = geometry::distance(ls, rs);
            if shoulder_width < 1e-6 {
                return None;
            }
            Some((geometry::distance(lw, rw) + geometry::distance(la, ra)) / shoulder_width)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorSnapshot {
    pub exercise: ExerciseType,
    pub phase: RepPhase,
    pub progress: f32,
    pub reps_detected: u32,
    pub last_metric: Option<f32>,
}

/// Three-state repetition machine bound to one exercise for its lifetime.
pub struct RepDetector {
    exercise: ExerciseType,
    profile: DetectionProfile,
    state: DetectorState,
}

impl RepDetector {
    pub fn new(exercise: ExerciseType) -> Self {
        Self::with_profile(exercise, DetectionProfile::for_exercise(exercise))
    }

    pub fn with_profile(exercise: ExerciseType, profile: DetectionProfile) -> Self {
        Self {
            exercise,
            profile,
            state: DetectorState::new(),
        }
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    pub fn profile(&self) -> &DetectionProfile {
        &self.profile
    }

    pub fn phase(&self) -> RepPhase {
        self.state.phase
    }

    pub fn progress(&self) -> f32 {
        self.state.progress
    }

    pub fn snapshot(&self) -> DetectorSnapshot {
        DetectorSnapshot {
            exercise: self.exercise,
            phase: self.state.phase,
            progress: self.state.progress,
            reps_detected: self.state.reps_detected,
            last_metric: self.state.last_metric,
        }
    }

    /// Advance the machine by one frame. Emits at most one event, and only
    /// when a full engage -> release cycle completes. Frames lacking the
    /// required landmarks are dropped without touching state.
    pub fn process_frame(&mut self, frame: &PoseFrame) -> Option<RepEvent> {
        let metric = extension_metric(self.exercise, frame)?;
        let profile = self.profile;

        self.state.last_metric = Some(metric);
        self.state.progress = profile.progress(metric);

        match self.state.cycle {
            None => {
                if profile.engaged(metric) {
                    log_debug!(
                        "{} engaged at frame {} (metric {:.3})",
                        self.exercise,
                        frame.sequence,
                        metric
                    );
                    self.state
                        .begin_cycle(profile.engaged_phase, frame.sequence, frame.timestamp_ms, metric);
                }
                None
            }
            Some(mut cycle) => {
                if profile.more_extreme(metric, cycle.peak_value) {
                    cycle.peak_value = metric;
                    cycle.peak_frame = frame.sequence;
                }

                if !profile.released(metric) {
                    self.state.cycle = Some(cycle);
                    return None;
                }

                self.state.reps_detected += 1;
                self.state.phase = profile.released_phase;
                self.state.cycle = None;

                let event = RepEvent {
                    rep_number: self.state.reps_detected,
                    exercise: self.exercise,
                    start_frame: cycle.start_frame,
                    end_frame: frame.sequence,
                    start_timestamp_ms: cycle.start_timestamp_ms,
                    end_timestamp_ms: frame.timestamp_ms,
                    duration_ms: frame.timestamp_ms.saturating_sub(cycle.start_timestamp_ms),
                    peak_value: cycle.peak_value,
                    peak_frame: cycle.peak_frame,
                    threshold_met: profile.meets_target(cycle.peak_value),
                };

                log_debug!(
                    "{} rep {} released at frame {} (peak {:.3}, target met: {})",
                    self.exercise,
                    event.rep_number,
                    frame.sequence,
                    event.peak_value,
                    event.threshold_met
                );
                Some(event)
            }
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}
