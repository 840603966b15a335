use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use crate::coaching::FeedbackPrompt;

/// Output backend for one prompt at a time. `speak` resolves when the
/// utterance has finished or failed.
#[async_trait]
pub trait Speaker: Send + Sync {
    fn name(&self) -> &str;

    async fn speak(&self, prompt: &FeedbackPrompt) -> Result<()>;

    /// Cut off whatever is playing. Backends that stop when the `speak`
    /// future is dropped can leave this as is.
    fn halt(&self) {}
}

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 160;
const MIN_UTTERANCE: Duration = Duration::from_millis(300);

/// Writes prompts to the log and holds the channel for roughly as long as
/// saying them aloud would take.
#[derive(Debug, Clone)]
pub struct LogSpeaker {
    words_per_minute: u32,
}

impl Default for LogSpeaker {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS_PER_MINUTE)
    }
}

impl LogSpeaker {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
        }
    }

    pub fn estimate(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        let ms = words * 60_000 / self.words_per_minute as u64;
        Duration::from_millis(ms).max(MIN_UTTERANCE)
    }
}

#[async_trait]
impl Speaker for LogSpeaker {
    fn name(&self) -> &str {
        "log"
    }

    async fn speak(&self, prompt: &FeedbackPrompt) -> Result<()> {
        info!(
            "[VOICE] ({}/{}) {}",
            prompt.category.as_str(),
            prompt.severity.as_str(),
            prompt.text
        );
        tokio::time::sleep(self.estimate(&prompt.text)).await;
        Ok(())
    }
}
