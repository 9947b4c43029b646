use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Kiosk usage counters
#[derive(Debug, Default)]
pub struct KioskMetrics {
    pub sessions_started: AtomicU64,
    pub verifications_succeeded: AtomicU64,
    pub verifications_failed: AtomicU64,
    pub lookup_misses: AtomicU64,
    pub utterances_issued: AtomicU64,
    pub utterances_superseded: AtomicU64,
    pub external_launches: AtomicU64,
}

impl KioskMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verification_succeeded(&self) {
        self.verifications_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verification_failed(&self) {
        self.verifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_miss(&self) {
        self.lookup_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_utterance_issued(&self) {
        self.utterances_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_utterance_superseded(&self) {
        self.utterances_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_external_launch(&self) {
        self.external_launches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> KioskStats {
        KioskStats {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            verifications_succeeded: self.verifications_succeeded.load(Ordering::Relaxed),
            verifications_failed: self.verifications_failed.load(Ordering::Relaxed),
            lookup_misses: self.lookup_misses.load(Ordering::Relaxed),
            utterances_issued: self.utterances_issued.load(Ordering::Relaxed),
            utterances_superseded: self.utterances_superseded.load(Ordering::Relaxed),
            external_launches: self.external_launches.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            sessions = stats.sessions_started,
            succeeded = stats.verifications_succeeded,
            failed = stats.verifications_failed,
            lookup_misses = stats.lookup_misses,
            utterances = stats.utterances_issued,
            superseded = stats.utterances_superseded,
            external_launches = stats.external_launches,
            "Kiosk metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskStats {
    pub sessions_started: u64,
    pub verifications_succeeded: u64,
    pub verifications_failed: u64,
    pub lookup_misses: u64,
    pub utterances_issued: u64,
    pub utterances_superseded: u64,
    pub external_launches: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self, outcome: &str) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            outcome = outcome,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
