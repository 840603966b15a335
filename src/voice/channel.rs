use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::coaching::{DeliveryStatus, FeedbackPrompt};
use crate::{log_debug, log_info, log_warn};

use super::queue::{Admission, DeliveryQueue, DEFAULT_QUEUE_CAPACITY};
use super::Speaker;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

pub const DEFAULT_SPACING: Duration = Duration::from_millis(200);

const SHUTDOWN_DETAIL: &str = "channel shut down";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub capacity: usize,
    /// Minimum gap between the starts of two utterances.
    pub spacing: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            spacing: DEFAULT_SPACING,
        }
    }
}

/// A status change for one prompt, reported back to whoever owns the
/// feedback history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEvent {
    pub prompt_id: String,
    pub message_id: String,
    pub status: DeliveryStatus,
    pub detail: Option<String>,
}

impl DeliveryEvent {
    fn new(prompt: &FeedbackPrompt, status: DeliveryStatus, detail: Option<String>) -> Self {
        Self {
            prompt_id: prompt.id.clone(),
            message_id: prompt.message_id.clone(),
            status,
            detail,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub speaking: Option<FeedbackPrompt>,
    pub pending: Vec<FeedbackPrompt>,
}

struct InFlight {
    prompt: FeedbackPrompt,
    halt: CancellationToken,
}

struct ChannelState {
    queue: DeliveryQueue,
    speaking: Option<InFlight>,
    last_started: Option<Instant>,
}

struct Shared {
    state: Mutex<ChannelState>,
    wake: Notify,
    events: mpsc::UnboundedSender<DeliveryEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: DeliveryEvent) {
        // A closed receiver means nobody is tracking history any more.
        let _ = self.events.send(event);
    }
}

/// Single-speaker delivery channel. Prompts are admitted synchronously
/// through the priority queue; one background task speaks them in order,
/// keeping at least `spacing` between utterance starts.
pub struct FeedbackChannel {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    worker: Option<JoinHandle<()>>,
    speaker_name: String,
}

impl FeedbackChannel {
    /// Starts the delivery task on the current tokio runtime.
    pub fn spawn(
        speaker: Arc<dyn Speaker>,
        config: ChannelConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DeliveryEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(ChannelState {
                queue: DeliveryQueue::new(config.capacity),
                speaking: None,
                last_started: None,
            }),
            wake: Notify::new(),
            events,
        });
        let shutdown = CancellationToken::new();
        let speaker_name = speaker.name().to_string();

        let worker = tokio::spawn(delivery_loop(
            Arc::clone(&shared),
            speaker,
            config.spacing,
            shutdown.clone(),
        ));
        log_debug!("[VOICE] delivery channel started with {} speaker", speaker_name);

        (
            Self {
                shared,
                shutdown,
                worker: Some(worker),
                speaker_name,
            },
            receiver,
        )
    }

    pub fn speaker_name(&self) -> &str {
        &self.speaker_name
    }

    /// Offers a prompt to the queue. Returns the prompt's status after
    /// admission: queued, or skipped if there was no room.
    pub fn submit(&self, prompt: FeedbackPrompt) -> DeliveryStatus {
        let admission = self.shared.lock().queue.push(prompt);

        match admission {
            Admission::Queued { position } => {
                log_debug!("[VOICE] queued at position {}", position);
                self.shared.wake.notify_one();
                DeliveryStatus::Queued
            }
            Admission::Displaced { position, evicted } => {
                log_info!(
                    "[VOICE] queued at position {}, dropped \"{}\"",
                    position,
                    evicted.message_id
                );
                self.shared
                    .emit(DeliveryEvent::new(&evicted, DeliveryStatus::Skipped, Some("displaced".into())));
                self.shared.wake.notify_one();
                DeliveryStatus::Queued
            }
            Admission::Rejected(prompt) => {
                log_info!("[VOICE] queue full, skipping \"{}\"", prompt.message_id);
                self.shared
                    .emit(DeliveryEvent::new(&prompt, DeliveryStatus::Skipped, Some("queue full".into())));
                DeliveryStatus::Skipped
            }
        }
    }

    /// Cuts off the utterance in progress. Pending prompts stay queued.
    pub fn stop(&self) {
        if let Some(in_flight) = self.shared.lock().speaking.as_ref() {
            in_flight.halt.cancel();
        }
    }

    /// Discards pending non-critical prompts without reporting them.
    pub fn clear_queue(&self) -> usize {
        let dropped = self.shared.lock().queue.clear_non_critical();
        if dropped > 0 {
            log_debug!("[VOICE] cleared {} pending prompts", dropped);
        }
        dropped
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Whether a prompt with this message is pending or being spoken.
    pub fn holds(&self, message_id: &str) -> bool {
        let state = self.shared.lock();
        state
            .speaking
            .as_ref()
            .is_some_and(|s| s.prompt.message_id == message_id)
            || state.queue.iter().any(|p| p.message_id == message_id)
    }

    /// Message ids waiting in the queue or being spoken.
    pub fn held_messages(&self) -> Vec<String> {
        let state = self.shared.lock();
        state
            .speaking
            .iter()
            .map(|s| &s.prompt)
            .chain(state.queue.iter())
            .map(|p| p.message_id.clone())
            .collect()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.lock().speaking.is_some()
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        let state = self.shared.lock();
        ChannelSnapshot {
            speaking: state.speaking.as_ref().map(|s| s.prompt.clone()),
            pending: state.queue.iter().cloned().collect(),
        }
    }

    /// Stops the delivery task and waits for it to exit. The prompt being
    /// spoken and everything still queued are reported as interrupted:
    /// failed for critical prompts, skipped otherwise.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(handle) = self.worker.take() {
            handle.await.context("delivery task failed to join")?;
        }
        Ok(())
    }
}

impl Drop for FeedbackChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum Outcome {
    Finished(DeliveryStatus, Option<String>),
    Shutdown,
}

async fn delivery_loop(
    shared: Arc<Shared>,
    speaker: Arc<dyn Speaker>,
    spacing: Duration,
    shutdown: CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }
        let wait = {
            let state = shared.lock();
            if state.queue.is_empty() {
                None
            } else {
                let since = state
                    .last_started
                    .map(|at| at.elapsed())
                    .unwrap_or(spacing);
                Some(spacing.saturating_sub(since))
            }
        };

        match wait {
            None => {
                tokio::select! {
                    _ = shared.wake.notified() => continue,
                    _ = shutdown.cancelled() => break,
                }
            }
            Some(remaining) if !remaining.is_zero() => {
                tokio::select! {
                    _ = time::sleep(remaining) => continue,
                    _ = shutdown.cancelled() => break,
                }
            }
            Some(_) => {}
        }

        let (prompt, halt) = {
            let mut state = shared.lock();
            let Some(mut prompt) = state.queue.pop_front() else {
                continue;
            };
            prompt.status = DeliveryStatus::Speaking;
            let halt = CancellationToken::new();
            state.speaking = Some(InFlight {
                prompt: prompt.clone(),
                halt: halt.clone(),
            });
            state.last_started = Some(Instant::now());
            (prompt, halt)
        };
        shared.emit(DeliveryEvent::new(&prompt, DeliveryStatus::Speaking, None));

        let outcome = tokio::select! {
            result = speaker.speak(&prompt) => match result {
                Ok(()) => Outcome::Finished(DeliveryStatus::Completed, None),
                Err(err) => {
                    log_warn!("[VOICE] {} speaker failed on \"{}\": {err:?}", speaker.name(), prompt.message_id);
                    Outcome::Finished(DeliveryStatus::Failed, Some(err.to_string()))
                }
            },
            _ = halt.cancelled() => {
                speaker.halt();
                log_info!("[VOICE] stopped \"{}\"", prompt.message_id);
                Outcome::Finished(prompt.interrupted_status(), Some("stopped".into()))
            }
            _ = shutdown.cancelled() => {
                speaker.halt();
                Outcome::Shutdown
            }
        };

        shared.lock().speaking = None;
        match outcome {
            Outcome::Finished(status, detail) => {
                shared.emit(DeliveryEvent::new(&prompt, status, detail));
            }
            Outcome::Shutdown => {
                shared.emit(DeliveryEvent::new(
                    &prompt,
                    prompt.interrupted_status(),
                    Some(SHUTDOWN_DETAIL.into()),
                ));
                break;
            }
        }
    }

    // Whatever is still queued will never play.
    let leftover: Vec<FeedbackPrompt> = {
        let mut state = shared.lock();
        std::iter::from_fn(|| state.queue.pop_front()).collect()
    };
    for prompt in &leftover {
        shared.emit(DeliveryEvent::new(
            prompt,
            prompt.interrupted_status(),
            Some(SHUTDOWN_DETAIL.into()),
        ));
    }
    log_debug!(
        "[VOICE] delivery loop exited, {} queued prompts unplayed",
        leftover.len()
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::*;
    use crate::coaching::PromptCategory;
    use crate::form::Severity;

    /// Records when each prompt started and takes a fixed time to say it.
    struct ScriptedSpeaker {
        duration: Duration,
        fail_on: Option<&'static str>,
        started: StdMutex<Vec<(String, Instant)>>,
    }

    impl ScriptedSpeaker {
        fn new(duration_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                duration: Duration::from_millis(duration_ms),
                fail_on: None,
                started: StdMutex::new(Vec::new()),
            })
        }

        fn failing_on(duration_ms: u64, message_id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                duration: Duration::from_millis(duration_ms),
                fail_on: Some(message_id),
                started: StdMutex::new(Vec::new()),
            })
        }

        fn started(&self) -> Vec<(String, Instant)> {
            self.started.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Speaker for ScriptedSpeaker {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn speak(&self, prompt: &FeedbackPrompt) -> Result<()> {
            self.started
                .lock()
                .unwrap()
                .push((prompt.message_id.clone(), Instant::now()));
            time::sleep(self.duration).await;
            if self.fail_on == Some(prompt.message_id.as_str()) {
                return Err(anyhow!("device unplugged"));
            }
            Ok(())
        }
    }

    fn prompt(id: &str, severity: Severity) -> FeedbackPrompt {
        FeedbackPrompt::new(id, id, PromptCategory::Corrective, severity, 0)
    }

    async fn next_final(rx: &mut mpsc::UnboundedReceiver<DeliveryEvent>) -> DeliveryEvent {
        loop {
            let event = rx.recv().await.unwrap();
            if event.status.is_terminal() {
                return event;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_in_priority_order() {
        let speaker = ScriptedSpeaker::new(1_000);
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker.clone(), ChannelConfig::default());

        channel.submit(prompt("first", Severity::Normal));
        // Let the worker pick up the first prompt before the rest arrive.
        time::sleep(Duration::from_millis(10)).await;
        channel.submit(prompt("info", Severity::Info));
        channel.submit(prompt("high", Severity::High));
        channel.submit(prompt("crit", Severity::Critical));

        let mut finished = Vec::new();
        for _ in 0..4 {
            finished.push(next_final(&mut rx).await.message_id);
        }
        assert_eq!(finished, vec!["first", "crit", "high", "info"]);
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_is_kept_between_utterance_starts() {
        let speaker = ScriptedSpeaker::new(50);
        let config = ChannelConfig {
            capacity: 3,
            spacing: Duration::from_millis(200),
        };
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker.clone(), config);

        for id in ["a", "b", "c"] {
            channel.submit(prompt(id, Severity::Normal));
        }
        for _ in 0..3 {
            next_final(&mut rx).await;
        }

        let started = speaker.started();
        assert_eq!(started.len(), 3);
        for pair in started.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(200));
        }
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_and_delivery_continues() {
        let speaker = ScriptedSpeaker::failing_on(100, "bad");
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        channel.submit(prompt("bad", Severity::Normal));
        channel.submit(prompt("good", Severity::Normal));

        let first = next_final(&mut rx).await;
        assert_eq!(first.status, DeliveryStatus::Failed);
        assert_eq!(first.detail.as_deref(), Some("device unplugged"));
        let second = next_final(&mut rx).await;
        assert_eq!(second.message_id, "good");
        assert_eq!(second.status, DeliveryStatus::Completed);
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_is_reported_as_skipped() {
        let speaker = ScriptedSpeaker::new(1_000);
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        for id in ["a", "b", "c"] {
            assert_eq!(channel.submit(prompt(id, Severity::Normal)), DeliveryStatus::Queued);
        }
        assert_eq!(channel.submit(prompt("d", Severity::Normal)), DeliveryStatus::Skipped);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.message_id, "d");
        assert_eq!(event.status, DeliveryStatus::Skipped);
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cuts_off_current_prompt_only() {
        let speaker = ScriptedSpeaker::new(5_000);
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        channel.submit(prompt("long", Severity::Normal));
        channel.submit(prompt("next", Severity::Normal));
        time::sleep(Duration::from_millis(10)).await;
        assert!(channel.is_speaking());

        channel.stop();
        let stopped = next_final(&mut rx).await;
        assert_eq!(stopped.message_id, "long");
        assert_eq!(stopped.status, DeliveryStatus::Skipped);

        let next = next_final(&mut rx).await;
        assert_eq!(next.message_id, "next");
        assert_eq!(next.status, DeliveryStatus::Completed);
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn clear_queue_keeps_critical_prompts() {
        let speaker = ScriptedSpeaker::new(1_000);
        let (mut channel, _rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        channel.submit(prompt("speaking", Severity::Normal));
        time::sleep(Duration::from_millis(10)).await;
        channel.submit(prompt("n", Severity::Normal));
        channel.submit(prompt("c", Severity::Critical));
        channel.submit(prompt("h", Severity::High));

        assert_eq!(channel.clear_queue(), 2);
        let snapshot = channel.snapshot();
        assert_eq!(snapshot.speaking.unwrap().message_id, "speaking");
        let pending: Vec<String> = snapshot.pending.into_iter().map(|p| p.message_id).collect();
        assert_eq!(pending, vec!["c"]);
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_critical_prompt_is_failed_not_skipped() {
        let speaker = ScriptedSpeaker::new(5_000);
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        channel.submit(prompt("crit", Severity::Critical));
        time::sleep(Duration::from_millis(10)).await;
        channel.stop();

        let event = next_final(&mut rx).await;
        assert_eq!(event.message_id, "crit");
        assert_ne!(event.status, DeliveryStatus::Skipped);
        assert_eq!(event.status, DeliveryStatus::Failed);
        assert_eq!(event.detail.as_deref(), Some("stopped"));
        channel.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_resolves_everything_still_queued() {
        let speaker = ScriptedSpeaker::new(5_000);
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        channel.submit(prompt("crit1", Severity::Critical));
        time::sleep(Duration::from_millis(10)).await;
        channel.submit(prompt("crit2", Severity::Critical));
        channel.submit(prompt("normal", Severity::Normal));
        assert_eq!(
            channel.held_messages(),
            vec!["crit1".to_string(), "crit2".into(), "normal".into()]
        );
        channel.shutdown().await.unwrap();

        let mut finals = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.status.is_terminal() {
                finals.push((event.message_id, event.status));
            }
        }
        assert_eq!(
            finals,
            vec![
                ("crit1".to_string(), DeliveryStatus::Failed),
                ("crit2".to_string(), DeliveryStatus::Failed),
                ("normal".to_string(), DeliveryStatus::Skipped),
            ]
        );
        assert!(channel.held_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_reports_the_cut_off_prompt() {
        let speaker = ScriptedSpeaker::new(5_000);
        let (mut channel, mut rx) = FeedbackChannel::spawn(speaker, ChannelConfig::default());

        channel.submit(prompt("long", Severity::High));
        time::sleep(Duration::from_millis(10)).await;
        channel.shutdown().await.unwrap();

        let event = next_final(&mut rx).await;
        assert_eq!(event.status, DeliveryStatus::Skipped);
        assert!(!channel.is_speaking());
    }
}
