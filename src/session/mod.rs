pub mod coordinator;
pub mod state;

pub use coordinator::{FrameOutcome, SessionCoordinator};
pub use state::{
    ExerciseSession, LandmarkOverlay, RenderSnapshot, SessionStatus, SessionSummary,
};
