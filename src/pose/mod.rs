pub mod geometry;
pub mod landmark;
pub mod smooth;

#[cfg(test)]
pub(crate) mod fixtures;

pub use landmark::{FrameConfidence, Landmark, LandmarkId, PoseFrame, LANDMARK_COUNT};
pub use smooth::LandmarkSmoother;
