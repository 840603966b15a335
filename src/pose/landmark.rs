use serde::{Deserialize, Serialize};

/// Number of tracked body points in every frame.
pub const LANDMARK_COUNT: usize = 12;

/// The tracked body points, in the order the pose source emits them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum LandmarkId {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl LandmarkId {
    pub const ALL: [LandmarkId; LANDMARK_COUNT] = [
        LandmarkId::LeftShoulder,
        LandmarkId::RightShoulder,
        LandmarkId::LeftElbow,
        LandmarkId::RightElbow,
        LandmarkId::LeftWrist,
        LandmarkId::RightWrist,
        LandmarkId::LeftHip,
        LandmarkId::RightHip,
        LandmarkId::LeftKnee,
        LandmarkId::RightKnee,
        LandmarkId::LeftAnkle,
        LandmarkId::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LandmarkId::LeftShoulder => "left_shoulder",
            LandmarkId::RightShoulder => "right_shoulder",
            LandmarkId::LeftElbow => "left_elbow",
            LandmarkId::RightElbow => "right_elbow",
            LandmarkId::LeftWrist => "left_wrist",
            LandmarkId::RightWrist => "right_wrist",
            LandmarkId::LeftHip => "left_hip",
            LandmarkId::RightHip => "right_hip",
            LandmarkId::LeftKnee => "left_knee",
            LandmarkId::RightKnee => "right_knee",
            LandmarkId::LeftAnkle => "left_ankle",
            LandmarkId::RightAnkle => "right_ankle",
        }
    }
}

/// One tracked point.
///
/// `x`/`y` are normalized image coordinates in [0, 1] (y grows downward),
/// `z` is depth relative to the body center where smaller means closer to
/// the camera, and `visibility` is the tracker's confidence in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn midpoint(self, other: Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
            visibility: self.visibility.min(other.visibility),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FrameConfidence {
    pub average: f32,
    pub minimum: f32,
}

/// One timestamped snapshot of all tracked landmarks.
///
/// A slot holding `None` means the producer failed to deliver that landmark;
/// consumers treat such frames as incomplete rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoseFrame {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub landmarks: [Option<Landmark>; LANDMARK_COUNT],
}

impl PoseFrame {
    pub fn new(sequence: u64, timestamp_ms: u64, landmarks: [Option<Landmark>; LANDMARK_COUNT]) -> Self {
        Self {
            sequence,
            timestamp_ms,
            landmarks,
        }
    }

    /// Build a frame from `(id, landmark)` pairs; ids not listed stay missing.
    pub fn from_points<I>(sequence: u64, timestamp_ms: u64, points: I) -> Self
    where
        I: IntoIterator<Item = (LandmarkId, Landmark)>,
    {
        let mut landmarks = [None; LANDMARK_COUNT];
        for (id, landmark) in points {
            landmarks[id.index()] = Some(landmark);
        }
        Self::new(sequence, timestamp_ms, landmarks)
    }

    pub fn get(&self, id: LandmarkId) -> Option<Landmark> {
        self.landmarks[id.index()]
    }

    /// Fetch several landmarks at once, or `None` if any of them is missing.
    pub fn require<const N: usize>(&self, ids: [LandmarkId; N]) -> Option<[Landmark; N]> {
        let mut out = [Landmark::default(); N];
        for (slot, id) in out.iter_mut().zip(ids) {
            *slot = self.get(id)?;
        }
        Some(out)
    }

    pub fn missing(&self) -> Vec<LandmarkId> {
        LandmarkId::ALL
            .into_iter()
            .filter(|id| self.get(*id).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.iter().all(Option::is_some)
    }

    /// Average and minimum visibility over the landmarks that are present.
    /// Missing landmarks count as zero visibility.
    pub fn confidence(&self) -> FrameConfidence {
        let mut sum = 0.0;
        let mut minimum = f32::MAX;
        for slot in &self.landmarks {
            let visibility = slot.map(|l| l.visibility).unwrap_or(0.0);
            sum += visibility;
            minimum = minimum.min(visibility);
        }

        FrameConfidence {
            average: sum / LANDMARK_COUNT as f32,
            minimum,
        }
    }
}
