use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pose::LandmarkId;

/// Minimum score at which a frame counts as acceptable form.
pub const ACCEPTABLE_SCORE: f32 = 70.0;

/// Priority tier shared by form errors, prompts and the delivery queue.
/// Declared low to high so the derived `Ord` gives `Critical > High > Normal > Info`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Normal,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Normal => "normal",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum FormErrorType {
    PoseIncomplete,
    ExcessiveDepth,
    ElbowFlare,
    BodyLineBreak,
    TorsoLean,
    ShoulderTilt,
    HipTilt,
    ElbowAsymmetry,
    StanceWidth,
    BentArms,
    UnevenArms,
    UnevenLegs,
}

impl FormErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormErrorType::PoseIncomplete => "pose_incomplete",
            FormErrorType::ExcessiveDepth => "excessive_depth",
            FormErrorType::ElbowFlare => "elbow_flare",
            FormErrorType::BodyLineBreak => "body_line_break",
            FormErrorType::TorsoLean => "torso_lean",
            FormErrorType::ShoulderTilt => "shoulder_tilt",
            FormErrorType::HipTilt => "hip_tilt",
            FormErrorType::ElbowAsymmetry => "elbow_asymmetry",
            FormErrorType::StanceWidth => "stance_width",
            FormErrorType::BentArms => "bent_arms",
            FormErrorType::UnevenArms => "uneven_arms",
            FormErrorType::UnevenLegs => "uneven_legs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormError {
    pub error_type: FormErrorType,
    pub severity: Severity,
    pub description: String,
    pub measured_value: f32,
    pub threshold: f32,
    pub correction: String,
    /// Points taken off the frame score.
    pub deduction: f32,
    /// Landmarks the failed check looked at, for highlighting.
    pub landmarks: Vec<LandmarkId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormValidationResult {
    pub score: f32,
    /// Sorted by severity, most severe first; equal severities keep check order.
    pub errors: Vec<FormError>,
    pub is_acceptable: bool,
    pub measurements: BTreeMap<String, f32>,
}

impl FormValidationResult {
    pub fn from_checks(mut errors: Vec<FormError>, measurements: BTreeMap<String, f32>) -> Self {
        // `sort_by` is stable, so ties stay in evaluation order.
        errors.sort_by(|a, b| b.severity.cmp(&a.severity));

        let deducted: f32 = errors.iter().map(|e| e.deduction).sum();
        let score = (100.0 - deducted).clamp(0.0, 100.0);

        Self {
            score,
            is_acceptable: score >= ACCEPTABLE_SCORE,
            errors,
            measurements,
        }
    }

    /// Hard floor for frames the pose source delivered incomplete.
    pub fn incomplete(missing: &[LandmarkId]) -> Self {
        let names: Vec<&str> = missing.iter().map(|id| id.as_str()).collect();
        let error = FormError {
            error_type: FormErrorType::PoseIncomplete,
            severity: Severity::Critical,
            description: format!("Pose incomplete: missing {}", names.join(", ")),
            measured_value: missing.len() as f32,
            threshold: 0.0,
            correction: "Move so your whole body is visible to the camera".to_string(),
            deduction: 100.0,
            landmarks: missing.to_vec(),
        };

        Self {
            score: 0.0,
            errors: vec![error],
            is_acceptable: false,
            measurements: BTreeMap::new(),
        }
    }

    pub fn top_error(&self) -> Option<&FormError> {
        self.errors.first()
    }

    pub fn has_critical(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Critical)
    }
}
