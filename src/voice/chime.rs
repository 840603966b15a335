use std::f32::consts::PI;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rodio::{OutputStream, Sink, Source};
use tokio::sync::oneshot;

use crate::coaching::FeedbackPrompt;
use crate::form::Severity;
use crate::{log_error, log_info, log_warn};

use super::Speaker;

const ENABLE_LOGS: bool = true;

const SAMPLE_RATE: u32 = 44_100;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A single decaying tone followed by a short silence.
pub struct Chime {
    freq: f32,
    tone_samples: usize,
    total_samples: usize,
    num_sample: usize,
}

impl Chime {
    pub fn new(freq: f32, tone: Duration, gap: Duration) -> Self {
        let tone_samples = samples_for(tone);
        let gap_samples = samples_for(gap);
        Self {
            freq,
            tone_samples,
            total_samples: tone_samples + gap_samples,
            num_sample: 0,
        }
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let n = self.num_sample;
        self.num_sample += 1;

        if n >= self.tone_samples {
            return Some(0.0);
        }
        let t = n as f32 / SAMPLE_RATE as f32;
        let envelope = (-6.0 * t).exp();
        Some((2.0 * PI * self.freq * t).sin() * envelope * 0.2)
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / SAMPLE_RATE as f32,
        ))
    }
}

fn samples_for(duration: Duration) -> usize {
    (duration.as_millis() as usize) * SAMPLE_RATE as usize / 1_000
}

/// Tone pattern per severity: (frequency, repeats).
fn pattern(severity: Severity) -> (f32, usize) {
    match severity {
        Severity::Critical => (880.0, 3),
        Severity::High => (660.0, 2),
        Severity::Normal => (523.0, 1),
        Severity::Info => (440.0, 1),
    }
}

enum ChimeCommand {
    Play {
        severity: Severity,
        done: oneshot::Sender<Result<()>>,
    },
    Halt,
}

/// Plays a severity-coded chime per prompt on a dedicated audio thread.
pub struct ChimeSpeaker {
    tx: Mutex<Option<Sender<ChimeCommand>>>,
}

impl Default for ChimeSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChimeSpeaker {
    pub fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<ChimeCommand>> {
        let mut guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<ChimeCommand>();

        // The output stream is not Send, so it lives and dies on this thread.
        thread::Builder::new()
            .name("chime-speaker".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;
                let mut playing: Option<oneshot::Sender<Result<()>>> = None;

                fn ensure_sink(stream: &mut Option<OutputStream>, sink: &mut Option<Sink>) -> Result<()> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| anyhow!("failed to open audio output: {e}"))?;
                        let new_sink =
                            Sink::try_new(&handle).map_err(|e| anyhow!("failed to create audio sink: {e}"))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                loop {
                    let command = if playing.is_some() {
                        match rx.recv_timeout(POLL_INTERVAL) {
                            Ok(cmd) => Some(cmd),
                            Err(RecvTimeoutError::Timeout) => None,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    } else {
                        match rx.recv() {
                            Ok(cmd) => Some(cmd),
                            Err(_) => break,
                        }
                    };

                    match command {
                        Some(ChimeCommand::Play { severity, done }) => {
                            if let Some(previous) = playing.take() {
                                let _ = previous.send(Ok(()));
                            }
                            match ensure_sink(&mut _stream, &mut sink) {
                                Ok(()) => {
                                    if let Some(ref s) = sink {
                                        let (freq, repeats) = pattern(severity);
                                        for _ in 0..repeats {
                                            s.append(Chime::new(
                                                freq,
                                                Duration::from_millis(180),
                                                Duration::from_millis(90),
                                            ));
                                        }
                                    }
                                    playing = Some(done);
                                }
                                Err(err) => {
                                    log_error!("[VOICE] {err}");
                                    let _ = done.send(Err(err));
                                }
                            }
                        }
                        Some(ChimeCommand::Halt) => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                            if let Some(done) = playing.take() {
                                let _ = done.send(Ok(()));
                            }
                        }
                        None => {
                            let finished = sink.as_ref().map(|s| s.empty()).unwrap_or(true);
                            if finished {
                                if let Some(done) = playing.take() {
                                    let _ = done.send(Ok(()));
                                }
                            }
                        }
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn audio thread: {e}"))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

#[async_trait]
impl Speaker for ChimeSpeaker {
    fn name(&self) -> &str {
        "chime"
    }

    async fn speak(&self, prompt: &FeedbackPrompt) -> Result<()> {
        let tx = self.ensure_thread()?;
        let (done, finished) = oneshot::channel();
        tx.send(ChimeCommand::Play {
            severity: prompt.severity,
            done,
        })
        .map_err(|_| anyhow!("audio thread is gone"))?;
        log_info!("[VOICE] chime for \"{}\"", prompt.text);

        finished
            .await
            .map_err(|_| anyhow!("audio thread dropped the request"))?
    }

    fn halt(&self) {
        let guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(tx) = guard.as_ref() {
            if tx.send(ChimeCommand::Halt).is_err() {
                log_warn!("[VOICE] halt requested but the audio thread has exited");
            }
        }
    }
}
