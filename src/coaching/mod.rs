pub mod feedback;
pub mod motivation;
pub mod phrases;
pub mod prompt;
pub mod rep_counter;

pub use feedback::{FeedbackContext, FeedbackGenerator, DEFAULT_DEDUP_WINDOW_MS};
pub use motivation::{MotivationConfig, MotivationEngine, MotivationSnapshot};
pub use prompt::{DeliveryModality, DeliveryStatus, FeedbackPrompt, PromptCategory, TriggerCondition};
pub use rep_counter::{AcceptedRep, RepCounter, RepCounterConfig, RepStats};
