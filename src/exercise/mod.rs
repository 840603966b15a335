pub mod thresholds;

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

pub use thresholds::{
    thresholds_for, validate_table, ExerciseThresholds, JumpingJackThresholds,
    MarchingThresholds, PushUpThresholds,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseType {
    PushUp,
    Marching,
    JumpingJack,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 3] = [
        ExerciseType::PushUp,
        ExerciseType::Marching,
        ExerciseType::JumpingJack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::PushUp => "push_up",
            ExerciseType::Marching => "marching",
            ExerciseType::JumpingJack => "jumping_jack",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "push_up" | "pushup" | "push-up" => Ok(ExerciseType::PushUp),
            "marching" | "march" => Ok(ExerciseType::Marching),
            "jumping_jack" | "jumpingjack" | "jumping-jack" => Ok(ExerciseType::JumpingJack),
            _ => Err(anyhow!(
                "unknown exercise '{value}'; expected one of push_up, marching, jumping_jack"
            )),
        }
    }
}

/// Coaching mode; selects how strict the form thresholds are.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Discipline {
    Fitness,
    General,
    Yoga,
}

impl Discipline {
    /// Ordered from strictest to most relaxed.
    pub const ALL: [Discipline; 3] = [Discipline::Fitness, Discipline::General, Discipline::Yoga];

    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Fitness => "fitness",
            Discipline::General => "general",
            Discipline::Yoga => "yoga",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Discipline {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fitness" => Ok(Discipline::Fitness),
            "general" => Ok(Discipline::General),
            "yoga" => Ok(Discipline::Yoga),
            _ => Err(anyhow!(
                "unknown discipline '{value}'; expected one of fitness, yoga, general"
            )),
        }
    }
}
