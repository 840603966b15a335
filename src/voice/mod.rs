pub mod channel;
#[cfg(feature = "audio")]
pub mod chime;
pub mod queue;
pub mod speaker;

pub use channel::{ChannelConfig, ChannelSnapshot, DeliveryEvent, FeedbackChannel, DEFAULT_SPACING};
#[cfg(feature = "audio")]
pub use chime::ChimeSpeaker;
pub use queue::{Admission, DeliveryQueue, DEFAULT_QUEUE_CAPACITY};
pub use speaker::{LogSpeaker, Speaker};
