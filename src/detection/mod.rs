pub mod detector;
pub mod state;

pub use detector::{extension_metric, DetectionProfile, DetectorSnapshot, MetricDirection, RepDetector};
pub use state::{RepEvent, RepPhase};
