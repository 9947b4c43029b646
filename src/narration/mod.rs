//! Narration channel
//!
//! Converts session prompts into speech on a single, process-wide speech
//! engine. Every call cancels whatever is being voiced and queues the new
//! utterance; because engines may still report "speaking" for a moment after
//! a cancel, delivery polls until the engine is idle. A generation counter
//! makes the most recent instruction win: a superseded delivery gives up at
//! its next poll and never reaches the engine.

pub mod engines;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::NarrationConfig;
use crate::observability::KioskMetrics;

pub use engines::{LogSpeechEngine, ProcessSpeechEngine, SilentSpeechEngine};

#[cfg(test)]
use mockall::automock;

/// Platform text-to-speech facility
#[cfg_attr(test, automock)]
pub trait SpeechEngine: Send + Sync {
    /// Stop the current utterance and drop anything queued
    fn cancel_all(&self);

    /// Start voicing `utterance` in `locale`
    fn speak(&self, utterance: &str, locale: &str);

    /// Whether the engine is still voicing something
    fn is_speaking(&self) -> bool;
}

/// Serializes access to a [`SpeechEngine`]: cancel, wait for idle, speak.
pub struct NarrationChannel {
    engine: Arc<dyn SpeechEngine>,
    locale: String,
    poll_interval: Duration,
    max_wait: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    metrics: Arc<KioskMetrics>,
}

impl NarrationChannel {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        locale: impl Into<String>,
        config: &NarrationConfig,
        metrics: Arc<KioskMetrics>,
    ) -> Self {
        Self {
            engine,
            locale: locale.into(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            max_wait: Duration::from_millis(config.max_wait_ms),
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            metrics,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Speak `utterance` in the channel's locale
    pub fn speak(&mut self, utterance: impl Into<String>) {
        let locale = self.locale.clone();
        self.speak_in(utterance, &locale);
    }

    /// Cancel anything in flight and deliver `utterance` once the engine is idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn speak_in(&mut self, utterance: impl Into<String>, locale: &str) {
        let utterance = utterance.into();
        let ticket = self.supersede();

        debug!(ticket, utterance = %utterance, "Queueing utterance");
        self.engine.cancel_all();

        let delivery = Delivery {
            engine: Arc::clone(&self.engine),
            generation: Arc::clone(&self.generation),
            ticket,
            utterance,
            locale: locale.to_string(),
            poll_interval: self.poll_interval,
            max_wait: self.max_wait,
            metrics: Arc::clone(&self.metrics),
        };
        self.pending = Some(tokio::spawn(delivery.run()));
    }

    /// Cancel anything in flight without queueing a replacement
    pub fn silence(&mut self) {
        self.supersede();
        self.engine.cancel_all();
    }

    /// Wait until the latest queued utterance has been handed to the engine
    /// (or given up on). Does not wait for the engine to finish speaking.
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Err(e) = pending.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Narration delivery task failed");
                }
            }
        }
    }

    /// Invalidate every earlier delivery and return the new generation
    fn supersede(&mut self) -> u64 {
        if let Some(previous) = self.pending.take() {
            if !previous.is_finished() {
                self.metrics.record_utterance_superseded();
            }
            previous.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for NarrationChannel {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

struct Delivery {
    engine: Arc<dyn SpeechEngine>,
    generation: Arc<AtomicU64>,
    ticket: u64,
    utterance: String,
    locale: String,
    poll_interval: Duration,
    max_wait: Duration,
    metrics: Arc<KioskMetrics>,
}

impl Delivery {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.ticket
    }

    async fn run(self) {
        let deadline = Instant::now() + self.max_wait;

        while self.engine.is_speaking() {
            if Instant::now() >= deadline {
                warn!(
                    ticket = self.ticket,
                    waited_ms = self.max_wait.as_millis() as u64,
                    "Speech engine still busy after cancel, speaking anyway"
                );
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
            if !self.is_current() {
                debug!(ticket = self.ticket, "Utterance superseded while waiting");
                return;
            }
        }

        if !self.is_current() {
            debug!(ticket = self.ticket, "Utterance superseded before delivery");
            return;
        }

        info!(locale = %self.locale, utterance = %self.utterance, "Speaking");
        self.engine.speak(&self.utterance, &self.locale);
        self.metrics.record_utterance_issued();
    }
}
