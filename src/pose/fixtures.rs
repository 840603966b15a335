//! Synthetic frames for unit tests.

use super::{Landmark, LandmarkId, PoseFrame};

const VIS: f32 = 0.95;

fn lm(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(x, y, z, VIS)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Knobs for a push-up frame seen with the body extending away from the
/// camera along the depth axis.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PushUpPose {
    pub left_elbow: f32,
    pub right_elbow: f32,
    pub hip_drop: f32,
    pub shoulder_tilt: f32,
    pub elbow_flare: f32,
}

impl PushUpPose {
    pub(crate) fn at(elbow_angle: f32) -> Self {
        Self {
            left_elbow: elbow_angle,
            right_elbow: elbow_angle,
            hip_drop: 0.0,
            shoulder_tilt: 0.0,
            elbow_flare: 0.0,
        }
    }
}

fn arm(shoulder: Landmark, outward: f32, flare: f32, angle_deg: f32) -> (Landmark, Landmark) {
    let elbow = lm(shoulder.x + outward * flare, shoulder.y + 0.15, shoulder.z);
    let theta = angle_deg.to_radians();
    let wrist = lm(
        elbow.x,
        elbow.y - 0.15 * theta.cos(),
        elbow.z + 0.15 * theta.sin(),
    );
    (elbow, wrist)
}

pub(crate) fn push_up_with(sequence: u64, timestamp_ms: u64, pose: PushUpPose) -> PoseFrame {
    let ls = lm(0.4, 0.5, 0.0);
    let rs = lm(0.6, 0.5 + pose.shoulder_tilt, 0.0);
    let (le, lw) = arm(ls, -1.0, pose.elbow_flare, pose.left_elbow);
    let (re, rw) = arm(rs, 1.0, pose.elbow_flare, pose.right_elbow);

    PoseFrame::from_points(
        sequence,
        timestamp_ms,
        [
            (LandmarkId::LeftShoulder, ls),
            (LandmarkId::RightShoulder, rs),
            (LandmarkId::LeftElbow, le),
            (LandmarkId::RightElbow, re),
            (LandmarkId::LeftWrist, lw),
            (LandmarkId::RightWrist, rw),
            (LandmarkId::LeftHip, lm(0.45, 0.5 + pose.hip_drop, 0.4)),
            (LandmarkId::RightHip, lm(0.55, 0.5 + pose.hip_drop, 0.4)),
            (LandmarkId::LeftKnee, lm(0.45, 0.5 + pose.hip_drop / 2.0, 0.6)),
            (LandmarkId::RightKnee, lm(0.55, 0.5 + pose.hip_drop / 2.0, 0.6)),
            (LandmarkId::LeftAnkle, lm(0.45, 0.5, 0.8)),
            (LandmarkId::RightAnkle, lm(0.55, 0.5, 0.8)),
        ],
    )
}

pub(crate) fn push_up(sequence: u64, timestamp_ms: u64, elbow_angle: f32) -> PoseFrame {
    push_up_with(sequence, timestamp_ms, PushUpPose::at(elbow_angle))
}

/// Upright stance with the left knee raised by `lift` (0 = standing,
/// 1 = knee level with the hip).
pub(crate) fn marching(sequence: u64, timestamp_ms: u64, lift: f32) -> PoseFrame {
    let raise = 0.20 * lift;
    PoseFrame::from_points(
        sequence,
        timestamp_ms,
        [
            (LandmarkId::LeftShoulder, lm(0.4, 0.3, 0.0)),
            (LandmarkId::RightShoulder, lm(0.6, 0.3, 0.0)),
            (LandmarkId::LeftElbow, lm(0.39, 0.45, 0.0)),
            (LandmarkId::RightElbow, lm(0.61, 0.45, 0.0)),
            (LandmarkId::LeftWrist, lm(0.38, 0.6, 0.0)),
            (LandmarkId::RightWrist, lm(0.62, 0.6, 0.0)),
            (LandmarkId::LeftHip, lm(0.43, 0.55, 0.0)),
            (LandmarkId::RightHip, lm(0.57, 0.55, 0.0)),
            (LandmarkId::LeftKnee, lm(0.43, 0.75 - raise, -0.1 * lift)),
            (LandmarkId::RightKnee, lm(0.57, 0.75, 0.0)),
            (LandmarkId::LeftAnkle, lm(0.43, 0.95 - raise, 0.0)),
            (LandmarkId::RightAnkle, lm(0.57, 0.95, 0.0)),
        ],
    )
}

pub(crate) fn standing(sequence: u64, timestamp_ms: u64) -> PoseFrame {
    marching(sequence, timestamp_ms, 0.0)
}

/// Jumping-jack position interpolated from closed (`0.0`) to fully open (`1.0`).
pub(crate) fn jumping_jack(sequence: u64, timestamp_ms: u64, openness: f32) -> PoseFrame {
    let t = openness;
    let ls = lm(0.4, 0.3, 0.0);
    let rs = lm(0.6, 0.3, 0.0);
    let lw = lm(lerp(0.37, 0.3, t), lerp(0.6, 0.1, t), 0.0);
    let rw = lm(lerp(0.63, 0.7, t), lerp(0.6, 0.1, t), 0.0);
    let lh = lm(0.43, 0.55, 0.0);
    let rh = lm(0.57, 0.55, 0.0);
    let la = lm(lerp(0.43, 0.3, t), 0.95, 0.0);
    let ra = lm(lerp(0.57, 0.7, t), 0.95, 0.0);

    PoseFrame::from_points(
        sequence,
        timestamp_ms,
        [
            (LandmarkId::LeftShoulder, ls),
            (LandmarkId::RightShoulder, rs),
            (LandmarkId::LeftElbow, ls.midpoint(lw)),
            (LandmarkId::RightElbow, rs.midpoint(rw)),
            (LandmarkId::LeftWrist, lw),
            (LandmarkId::RightWrist, rw),
            (LandmarkId::LeftHip, lh),
            (LandmarkId::RightHip, rh),
            (LandmarkId::LeftKnee, lh.midpoint(la)),
            (LandmarkId::RightKnee, rh.midpoint(ra)),
            (LandmarkId::LeftAnkle, la),
            (LandmarkId::RightAnkle, ra),
        ],
    )
}

/// Shift both shoulders sideways, tilting the torso away from vertical.
pub(crate) fn leaning(mut frame: PoseFrame, dx: f32) -> PoseFrame {
    for id in [LandmarkId::LeftShoulder, LandmarkId::RightShoulder] {
        if let Some(mut shoulder) = frame.get(id) {
            shoulder.x += dx;
            frame.landmarks[id.index()] = Some(shoulder);
        }
    }
    frame
}

pub(crate) fn without(mut frame: PoseFrame, id: LandmarkId) -> PoseFrame {
    frame.landmarks[id.index()] = None;
    frame
}
