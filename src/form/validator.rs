use std::collections::BTreeMap;

use anyhow::Result;

use crate::exercise::{
    thresholds_for, Discipline, ExerciseThresholds, ExerciseType, JumpingJackThresholds,
    MarchingThresholds, PushUpThresholds,
};
use crate::pose::{geometry, Landmark, LandmarkId, PoseFrame};

use super::{FormError, FormErrorType, FormValidationResult, Severity};

const CRITICAL_DEDUCTION: f32 = 40.0;
const HIGH_DEDUCTION: f32 = 20.0;
const MAJOR_NORMAL_DEDUCTION: f32 = 15.0;
const NORMAL_DEDUCTION: f32 = 10.0;
const INFO_DEDUCTION: f32 = 5.0;

const MIN_SEGMENT: f32 = 1e-6;

/// Accumulates measurements and failed checks for one frame.
#[derive(Default)]
struct Checks {
    errors: Vec<FormError>,
    measurements: BTreeMap<String, f32>,
}

impl Checks {
    fn measure(&mut self, name: &str, value: f32) {
        self.measurements.insert(name.to_string(), value);
    }

    #[allow(clippy::too_many_arguments)]
    fn fail(
        &mut self,
        error_type: FormErrorType,
        severity: Severity,
        deduction: f32,
        description: String,
        measured_value: f32,
        threshold: f32,
        correction: &str,
        landmarks: &[LandmarkId],
    ) {
        self.errors.push(FormError {
            error_type,
            severity,
            description,
            measured_value,
            threshold,
            correction: correction.to_string(),
            deduction,
            landmarks: landmarks.to_vec(),
        });
    }

    fn finish(self) -> FormValidationResult {
        FormValidationResult::from_checks(self.errors, self.measurements)
    }
}

/// Scores single frames against one fixed threshold set. Holds no per-frame
/// state; every call is independent.
#[derive(Debug, Clone)]
pub struct FormValidator {
    exercise: ExerciseType,
    discipline: Discipline,
    thresholds: &'static ExerciseThresholds,
}

impl FormValidator {
    pub fn new(exercise: ExerciseType, discipline: Discipline) -> Result<Self> {
        Ok(Self {
            exercise,
            discipline,
            thresholds: thresholds_for(exercise, discipline)?,
        })
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn thresholds(&self) -> &'static ExerciseThresholds {
        self.thresholds
    }

    pub fn required_landmarks(&self) -> &'static [LandmarkId] {
        required_landmarks(self.exercise)
    }

    pub fn validate(&self, frame: &PoseFrame) -> FormValidationResult {
        let missing: Vec<LandmarkId> = self
            .required_landmarks()
            .iter()
            .copied()
            .filter(|id| frame.get(*id).is_none())
            .collect();
        if !missing.is_empty() {
            return FormValidationResult::incomplete(&missing);
        }

        let mut checks = Checks::default();
        let pose = Pose(frame);
        match self.thresholds {
            ExerciseThresholds::PushUp(t) => check_push_up(&pose, t, &mut checks),
            ExerciseThresholds::Marching(t) => check_marching(&pose, t, &mut checks),
            ExerciseThresholds::JumpingJack(t) => check_jumping_jack(&pose, t, &mut checks),
        }
        checks.finish()
    }
}

pub fn required_landmarks(exercise: ExerciseType) -> &'static [LandmarkId] {
    use LandmarkId::*;

    match exercise {
        ExerciseType::PushUp | ExerciseType::JumpingJack => &[
            LeftShoulder,
            RightShoulder,
            LeftElbow,
            RightElbow,
            LeftWrist,
            RightWrist,
            LeftHip,
            RightHip,
            LeftAnkle,
            RightAnkle,
        ],
        ExerciseType::Marching => &[
            LeftShoulder,
            RightShoulder,
            LeftHip,
            RightHip,
            LeftKnee,
            RightKnee,
            LeftAnkle,
            RightAnkle,
        ],
    }
}

/// Frame view with required landmarks already checked present.
struct Pose<'a>(&'a PoseFrame);

impl Pose<'_> {
    fn at(&self, id: LandmarkId) -> Landmark {
        self.0.get(id).unwrap_or_default()
    }

    fn elbow_angles(&self) -> (f32, f32) {
        use LandmarkId::*;
        (
            geometry::angle_between(self.at(LeftShoulder), self.at(LeftElbow), self.at(LeftWrist)),
            geometry::angle_between(self.at(RightShoulder), self.at(RightElbow), self.at(RightWrist)),
        )
    }

    fn shoulder_mid(&self) -> Landmark {
        self.at(LandmarkId::LeftShoulder).midpoint(self.at(LandmarkId::RightShoulder))
    }

    fn hip_mid(&self) -> Landmark {
        self.at(LandmarkId::LeftHip).midpoint(self.at(LandmarkId::RightHip))
    }

    fn ankle_mid(&self) -> Landmark {
        self.at(LandmarkId::LeftAnkle).midpoint(self.at(LandmarkId::RightAnkle))
    }

    fn shoulder_tilt(&self) -> f32 {
        (self.at(LandmarkId::LeftShoulder).y - self.at(LandmarkId::RightShoulder).y).abs()
    }

    fn torso_lean(&self) -> f32 {
        geometry::angle_from_vertical(self.shoulder_mid(), self.hip_mid())
    }
}

const SHOULDERS: [LandmarkId; 2] = [LandmarkId::LeftShoulder, LandmarkId::RightShoulder];
const TORSO: [LandmarkId; 4] = [
    LandmarkId::LeftShoulder,
    LandmarkId::RightShoulder,
    LandmarkId::LeftHip,
    LandmarkId::RightHip,
];
const ARMS: [LandmarkId; 6] = [
    LandmarkId::LeftShoulder,
    LandmarkId::RightShoulder,
    LandmarkId::LeftElbow,
    LandmarkId::RightElbow,
    LandmarkId::LeftWrist,
    LandmarkId::RightWrist,
];

fn check_shoulder_tilt(pose: &Pose, max_tilt: f32, checks: &mut Checks) {
    let tilt = pose.shoulder_tilt();
    checks.measure("shoulder_tilt", tilt);
    if tilt > max_tilt {
        checks.fail(
            FormErrorType::ShoulderTilt,
            Severity::Normal,
            NORMAL_DEDUCTION,
            format!("Shoulders uneven by {tilt:.3}"),
            tilt,
            max_tilt,
            "Level your shoulders",
            &SHOULDERS,
        );
    }
}

fn check_torso_lean(pose: &Pose, max_lean: f32, critical_lean: f32, checks: &mut Checks) {
    let lean = pose.torso_lean();
    checks.measure("torso_lean", lean);
    if lean > critical_lean {
        checks.fail(
            FormErrorType::TorsoLean,
            Severity::Critical,
            CRITICAL_DEDUCTION,
            format!("Torso leaning {lean:.0}° from vertical"),
            lean,
            critical_lean,
            "Stand up straight before you lose balance",
            &TORSO,
        );
    } else if lean > max_lean {
        checks.fail(
            FormErrorType::TorsoLean,
            Severity::High,
            HIGH_DEDUCTION,
            format!("Torso leaning {lean:.0}° from vertical"),
            lean,
            max_lean,
            "Keep your chest up and torso upright",
            &TORSO,
        );
    }
}

fn check_push_up(pose: &Pose, t: &PushUpThresholds, checks: &mut Checks) {
    use LandmarkId::*;

    let (left, right) = pose.elbow_angles();
    let elbow = (left + right) / 2.0;
    checks.measure("left_elbow_angle", left);
    checks.measure("right_elbow_angle", right);
    checks.measure("elbow_angle", elbow);

    if elbow < t.min_elbow_angle {
        checks.fail(
            FormErrorType::ExcessiveDepth,
            Severity::High,
            HIGH_DEDUCTION,
            format!("Elbows bent to {elbow:.0}°, chest dropping too low"),
            elbow,
            t.min_elbow_angle,
            "Stop just above the floor and keep tension",
            &ARMS,
        );
    }

    let shoulder_width = geometry::distance(pose.at(LeftShoulder), pose.at(RightShoulder));
    if shoulder_width > MIN_SEGMENT {
        let flare = (pose.at(LeftElbow).x - pose.at(LeftShoulder).x)
            .abs()
            .max((pose.at(RightElbow).x - pose.at(RightShoulder).x).abs())
            / shoulder_width;
        checks.measure("elbow_flare", flare);
        if flare > t.max_elbow_flare {
            checks.fail(
                FormErrorType::ElbowFlare,
                Severity::Normal,
                MAJOR_NORMAL_DEDUCTION,
                format!("Elbows flaring {:.0}% of shoulder width from the torso", flare * 100.0),
                flare,
                t.max_elbow_flare,
                "Tuck your elbows closer to your body",
                &[LeftShoulder, RightShoulder, LeftElbow, RightElbow],
            );
        }
    }

    let deviation = 180.0 - geometry::angle_between(pose.shoulder_mid(), pose.hip_mid(), pose.ankle_mid());
    checks.measure("body_line_deviation", deviation);
    let body = [LeftShoulder, RightShoulder, LeftHip, RightHip, LeftAnkle, RightAnkle];
    if deviation > t.critical_body_line_deviation {
        checks.fail(
            FormErrorType::BodyLineBreak,
            Severity::Critical,
            CRITICAL_DEDUCTION,
            format!("Body line bent {deviation:.0}° at the hips"),
            deviation,
            t.critical_body_line_deviation,
            "Reset your plank before the next rep",
            &body,
        );
    } else if deviation > t.max_body_line_deviation {
        checks.fail(
            FormErrorType::BodyLineBreak,
            Severity::High,
            HIGH_DEDUCTION,
            format!("Body line bent {deviation:.0}° at the hips"),
            deviation,
            t.max_body_line_deviation,
            "Brace your core and keep a straight line from head to heels",
            &body,
        );
    }

    check_shoulder_tilt(pose, t.max_shoulder_tilt, checks);

    let asymmetry = (left - right).abs();
    checks.measure("elbow_asymmetry", asymmetry);
    if asymmetry > t.max_elbow_asymmetry {
        checks.fail(
            FormErrorType::ElbowAsymmetry,
            Severity::Normal,
            NORMAL_DEDUCTION,
            format!("Elbows differ by {asymmetry:.0}°"),
            asymmetry,
            t.max_elbow_asymmetry,
            "Lower both sides evenly",
            &ARMS,
        );
    }
}

fn check_marching(pose: &Pose, t: &MarchingThresholds, checks: &mut Checks) {
    use LandmarkId::*;

    check_torso_lean(pose, t.max_torso_lean, t.critical_torso_lean, checks);
    check_shoulder_tilt(pose, t.max_shoulder_tilt, checks);

    let hip_tilt = (pose.at(LeftHip).y - pose.at(RightHip).y).abs();
    checks.measure("hip_tilt", hip_tilt);
    if hip_tilt > t.max_hip_tilt {
        checks.fail(
            FormErrorType::HipTilt,
            Severity::Normal,
            NORMAL_DEDUCTION,
            format!("Hips uneven by {hip_tilt:.3}"),
            hip_tilt,
            t.max_hip_tilt,
            "Keep your hips level as you lift",
            &[LeftHip, RightHip],
        );
    }

    let hip_width = (pose.at(LeftHip).x - pose.at(RightHip).x).abs();
    if hip_width > MIN_SEGMENT {
        let stance = (pose.at(LeftAnkle).x - pose.at(RightAnkle).x).abs() / hip_width;
        checks.measure("stance_ratio", stance);
        let (bound, out_of_range) = if stance < t.min_stance_ratio {
            (t.min_stance_ratio, true)
        } else if stance > t.max_stance_ratio {
            (t.max_stance_ratio, true)
        } else {
            (0.0, false)
        };
        if out_of_range {
            checks.fail(
                FormErrorType::StanceWidth,
                Severity::Info,
                INFO_DEDUCTION,
                format!("Stance is {stance:.1}x hip width"),
                stance,
                bound,
                "Keep your feet about hip width apart",
                &[LeftHip, RightHip, LeftAnkle, RightAnkle],
            );
        }
    }
}

fn check_jumping_jack(pose: &Pose, t: &JumpingJackThresholds, checks: &mut Checks) {
    use LandmarkId::*;

    let (left, right) = pose.elbow_angles();
    let extension = (left + right) / 2.0;
    checks.measure("arm_extension", extension);
    if extension < t.min_arm_extension {
        checks.fail(
            FormErrorType::BentArms,
            Severity::Normal,
            MAJOR_NORMAL_DEDUCTION,
            format!("Arms bent to {extension:.0}°"),
            extension,
            t.min_arm_extension,
            "Reach your arms out long",
            &ARMS,
        );
    }

    check_torso_lean(pose, t.max_torso_lean, t.critical_torso_lean, checks);

    let wrist_diff = (pose.at(LeftWrist).y - pose.at(RightWrist).y).abs();
    checks.measure("wrist_height_diff", wrist_diff);
    if wrist_diff > t.max_wrist_height_diff {
        checks.fail(
            FormErrorType::UnevenArms,
            Severity::Normal,
            NORMAL_DEDUCTION,
            format!("Hands at different heights ({wrist_diff:.3})"),
            wrist_diff,
            t.max_wrist_height_diff,
            "Raise both arms together",
            &[LeftWrist, RightWrist],
        );
    }

    let center = pose.hip_mid().x;
    let leg_asymmetry =
        ((center - pose.at(LeftAnkle).x) - (pose.at(RightAnkle).x - center)).abs();
    checks.measure("leg_asymmetry", leg_asymmetry);
    if leg_asymmetry > t.max_leg_asymmetry {
        checks.fail(
            FormErrorType::UnevenLegs,
            Severity::Info,
            INFO_DEDUCTION,
            format!("Feet landing unevenly ({leg_asymmetry:.3})"),
            leg_asymmetry,
            t.max_leg_asymmetry,
            "Jump both feet out the same distance",
            &[LeftHip, RightHip, LeftAnkle, RightAnkle],
        );
    }

    check_shoulder_tilt(pose, t.max_shoulder_tilt, checks);
}
