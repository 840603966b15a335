//! Form thresholds per exercise and discipline.
//!
//! One fixed table with an entry for every (exercise, discipline) pair.
//! `validate_table` runs at session construction and refuses to start if a
//! cell is missing, duplicated, mismatched, or if a relaxed discipline is
//! stricter than a firmer one.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use super::{Discipline, ExerciseType};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushUpThresholds {
    /// Elbow angle (degrees) below which the chest has dropped too far.
    pub min_elbow_angle: f32,
    /// Sideways elbow offset from the shoulder, as a fraction of shoulder width.
    pub max_elbow_flare: f32,
    /// Degrees the shoulder-hip-ankle line may bend away from straight.
    pub max_body_line_deviation: f32,
    pub critical_body_line_deviation: f32,
    /// Vertical shoulder height difference, normalized units.
    pub max_shoulder_tilt: f32,
    /// Left/right elbow angle difference in degrees.
    pub max_elbow_asymmetry: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarchingThresholds {
    pub max_torso_lean: f32,
    pub critical_torso_lean: f32,
    pub max_shoulder_tilt: f32,
    pub max_hip_tilt: f32,
    /// Ankle spread over hip width.
    pub min_stance_ratio: f32,
    pub max_stance_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpingJackThresholds {
    /// Average elbow angle; smaller means bent arms.
    pub min_arm_extension: f32,
    pub max_torso_lean: f32,
    pub critical_torso_lean: f32,
    pub max_wrist_height_diff: f32,
    /// Difference between left and right ankle offsets from the hip center.
    pub max_leg_asymmetry: f32,
    pub max_shoulder_tilt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "exercise")]
pub enum ExerciseThresholds {
    PushUp(PushUpThresholds),
    Marching(MarchingThresholds),
    JumpingJack(JumpingJackThresholds),
}

/// Which direction relaxes a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relaxes {
    Upward,
    Downward,
}

impl ExerciseThresholds {
    pub fn exercise(&self) -> ExerciseType {
        match self {
            ExerciseThresholds::PushUp(_) => ExerciseType::PushUp,
            ExerciseThresholds::Marching(_) => ExerciseType::Marching,
            ExerciseThresholds::JumpingJack(_) => ExerciseType::JumpingJack,
        }
    }

    fn limits(&self) -> Vec<(&'static str, f32, Relaxes)> {
        match self {
            ExerciseThresholds::PushUp(t) => vec![
                ("min_elbow_angle", t.min_elbow_angle, Relaxes::Downward),
                ("max_elbow_flare", t.max_elbow_flare, Relaxes::Upward),
                ("max_body_line_deviation", t.max_body_line_deviation, Relaxes::Upward),
                ("critical_body_line_deviation", t.critical_body_line_deviation, Relaxes::Upward),
                ("max_shoulder_tilt", t.max_shoulder_tilt, Relaxes::Upward),
                ("max_elbow_asymmetry", t.max_elbow_asymmetry, Relaxes::Upward),
            ],
            ExerciseThresholds::Marching(t) => vec![
                ("max_torso_lean", t.max_torso_lean, Relaxes::Upward),
                ("critical_torso_lean", t.critical_torso_lean, Relaxes::Upward),
                ("max_shoulder_tilt", t.max_shoulder_tilt, Relaxes::Upward),
                ("max_hip_tilt", t.max_hip_tilt, Relaxes::Upward),
                ("min_stance_ratio", t.min_stance_ratio, Relaxes::Downward),
                ("max_stance_ratio", t.max_stance_ratio, Relaxes::Upward),
            ],
            ExerciseThresholds::JumpingJack(t) => vec![
                ("min_arm_extension", t.min_arm_extension, Relaxes::Downward),
                ("max_torso_lean", t.max_torso_lean, Relaxes::Upward),
                ("critical_torso_lean", t.critical_torso_lean, Relaxes::Upward),
                ("max_wrist_height_diff", t.max_wrist_height_diff, Relaxes::Upward),
                ("max_leg_asymmetry", t.max_leg_asymmetry, Relaxes::Upward),
                ("max_shoulder_tilt", t.max_shoulder_tilt, Relaxes::Upward),
            ],
        }
    }

    fn check_internal(&self) -> Result<()> {
        for (name, value, _) in self.limits() {
            if !value.is_finite() || value <= 0.0 {
                bail!("{} threshold {name} must be a positive number, got {value}", self.exercise());
            }
        }

        let (max, critical) = match self {
            ExerciseThresholds::PushUp(t) => (t.max_body_line_deviation, t.critical_body_line_deviation),
            ExerciseThresholds::Marching(t) => (t.max_torso_lean, t.critical_torso_lean),
            ExerciseThresholds::JumpingJack(t) => (t.max_torso_lean, t.critical_torso_lean),
        };
        if critical <= max {
            bail!(
                "{} critical alignment limit {critical} must exceed the regular limit {max}",
                self.exercise()
            );
        }

        if let ExerciseThresholds::Marching(t) = self {
            if t.min_stance_ratio >= t.max_stance_ratio {
                bail!("marching stance ratio range is empty");
            }
        }
        Ok(())
    }
}

struct TableEntry {
    exercise: ExerciseType,
    discipline: Discipline,
    thresholds: ExerciseThresholds,
}

static THRESHOLD_TABLE: [TableEntry; 9] = [
    TableEntry {
        exercise: ExerciseType::PushUp,
        discipline: Discipline::Fitness,
        thresholds: ExerciseThresholds::PushUp(PushUpThresholds {
            min_elbow_angle: 45.0,
            max_elbow_flare: 0.6,
            max_body_line_deviation: 15.0,
            critical_body_line_deviation: 35.0,
            max_shoulder_tilt: 0.05,
            max_elbow_asymmetry: 15.0,
        }),
    },
    TableEntry {
        exercise: ExerciseType::PushUp,
        discipline: Discipline::General,
        thresholds: ExerciseThresholds::PushUp(PushUpThresholds {
            min_elbow_angle: 40.0,
            max_elbow_flare: 0.7,
            max_body_line_deviation: 20.0,
            critical_body_line_deviation: 40.0,
            max_shoulder_tilt: 0.06,
            max_elbow_asymmetry: 20.0,
        }),
    },
    TableEntry {
        exercise: ExerciseType::PushUp,
        discipline: Discipline::Yoga,
        thresholds: ExerciseThresholds::PushUp(PushUpThresholds {
            min_elbow_angle: 35.0,
            max_elbow_flare: 0.8,
            max_body_line_deviation: 25.0,
            critical_body_line_deviation: 45.0,
            max_shoulder_tilt: 0.08,
            max_elbow_asymmetry: 25.0,
        }),
    },
    TableEntry {
        exercise: ExerciseType::Marching,
        discipline: Discipline::Fitness,
        thresholds: ExerciseThresholds::Marching(MarchingThresholds {
            max_torso_lean: 10.0,
            critical_torso_lean: 30.0,
            max_shoulder_tilt: 0.05,
            max_hip_tilt: 0.06,
            min_stance_ratio: 0.6,
            max_stance_ratio: 2.0,
        }),
    },
    TableEntry {
        exercise: ExerciseType::Marching,
        discipline: Discipline::General,
        thresholds: ExerciseThresholds::Marching(MarchingThresholds {
            max_torso_lean: 15.0,
            critical_torso_lean: 35.0,
            max_shoulder_tilt: 0.06,
            max_hip_tilt: 0.08,
            min_stance_ratio: 0.5,
            max_stance_ratio: 2.3,
        }),
    },
    TableEntry {
        exercise: ExerciseType::Marching,
        discipline: Discipline::Yoga,
        thresholds: ExerciseThresholds::Marching(MarchingThresholds {
            max_torso_lean: 20.0,
            critical_torso_lean: 40.0,
            max_shoulder_tilt: 0.08,
            max_hip_tilt: 0.10,
            min_stance_ratio: 0.4,
            max_stance_ratio: 2.6,
        }),
    },
    TableEntry {
        exercise: ExerciseType::JumpingJack,
        discipline: Discipline::Fitness,
        thresholds: ExerciseThresholds::JumpingJack(JumpingJackThresholds {
            min_arm_extension: 150.0,
            max_torso_lean: 10.0,
            critical_torso_lean: 30.0,
            max_wrist_height_diff: 0.08,
            max_leg_asymmetry: 0.08,
            max_shoulder_tilt: 0.05,
        }),
    },
    TableEntry {
        exercise: ExerciseType::JumpingJack,
        discipline: Discipline::General,
        thresholds: ExerciseThresholds::JumpingJack(JumpingJackThresholds {
            min_arm_extension: 140.0,
            max_torso_lean: 15.0,
            critical_torso_lean: 35.0,
            max_wrist_height_diff: 0.10,
            max_leg_asymmetry: 0.10,
            max_shoulder_tilt: 0.06,
        }),
    },
    TableEntry {
        exercise: ExerciseType::JumpingJack,
        discipline: Discipline::Yoga,
        thresholds: ExerciseThresholds::JumpingJack(JumpingJackThresholds {
            min_arm_extension: 130.0,
            max_torso_lean: 20.0,
            critical_torso_lean: 40.0,
            max_wrist_height_diff: 0.12,
            max_leg_asymmetry: 0.12,
            max_shoulder_tilt: 0.08,
        }),
    },
];

pub fn thresholds_for(
    exercise: ExerciseType,
    discipline: Discipline,
) -> Result<&'static ExerciseThresholds> {
    THRESHOLD_TABLE
        .iter()
        .find(|entry| entry.exercise == exercise && entry.discipline == discipline)
        .map(|entry| &entry.thresholds)
        .ok_or_else(|| anyhow!("no form thresholds defined for {exercise} / {discipline}"))
}

/// Check that the table covers every exercise/discipline pair exactly once
/// and that strictness only relaxes from fitness to general to yoga.
pub fn validate_table() -> Result<()> {
    for exercise in ExerciseType::ALL {
        let mut by_discipline = Vec::with_capacity(Discipline::ALL.len());

        for discipline in Discipline::ALL {
            let matches: Vec<&TableEntry> = THRESHOLD_TABLE
                .iter()
                .filter(|e| e.exercise == exercise && e.discipline == discipline)
                .collect();

            let entry = match matches.as_slice() {
                [entry] => *entry,
                [] => bail!("threshold table is missing {exercise} / {discipline}"),
                _ => bail!("threshold table defines {exercise} / {discipline} more than once"),
            };

            if entry.thresholds.exercise() != exercise {
                bail!(
                    "threshold table entry {exercise} / {discipline} holds {} thresholds",
                    entry.thresholds.exercise()
                );
            }
            entry.thresholds.check_internal()?;
            by_discipline.push((discipline, entry.thresholds.limits()));
        }

        for pair in by_discipline.windows(2) {
            let (stricter, stricter_limits) = &pair[0];
            let (looser, looser_limits) = &pair[1];
            for ((name, strict_value, relaxes), (_, loose_value, _)) in
                stricter_limits.iter().zip(looser_limits.iter())
            {
                let relaxed = match relaxes {
                    Relaxes::Upward => loose_value >= strict_value,
                    Relaxes::Downward => loose_value <= strict_value,
                };
                if !relaxed {
                    bail!(
                        "{exercise} {name}: {looser} ({loose_value}) is stricter than {stricter} ({strict_value})"
                    );
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_table_is_complete_and_consistent() {
        validate_table().unwrap();
    }

    #[test]
    fn every_pair_resolves_to_its_own_exercise() {
        for exercise in ExerciseType::ALL {
            for discipline in Discipline::ALL {
                let thresholds = thresholds_for(exercise, discipline).unwrap();
                assert_eq!(thresholds.exercise(), exercise);
            }
        }
    }

    #[test]
    fn yoga_is_more_lenient_than_fitness() {
        let fitness = thresholds_for(ExerciseType::PushUp, Discipline::Fitness).unwrap();
        let yoga = thresholds_for(ExerciseType::PushUp, Discipline::Yoga).unwrap();
        match (fitness, yoga) {
            (ExerciseThresholds::PushUp(f), ExerciseThresholds::PushUp(y)) => {
                assert!(y.max_body_line_deviation > f.max_body_line_deviation);
                assert!(y.max_elbow_asymmetry > f.max_elbow_asymmetry);
            }
            other => panic!("unexpected thresholds {other:?}"),
        }
    }

    #[test]
    fn internal_check_rejects_inverted_critical_limit() {
        let broken = ExerciseThresholds::Marching(MarchingThresholds {
            max_torso_lean: 30.0,
            critical_torso_lean: 20.0,
            max_shoulder_tilt: 0.05,
            max_hip_tilt: 0.06,
            min_stance_ratio: 0.6,
            max_stance_ratio: 2.0,
        });
        assert!(broken.check_internal().is_err());
    }
}
