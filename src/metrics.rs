// Session metrics
//
// Lightweight counters for generation attempts, logged on shutdown

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Generation metrics for one session
///
/// Uses atomic operations so the counters can be bumped from the tokio task
/// running a generation while the UI thread reads them.
#[derive(Debug)]
pub struct Metrics {
    /// Generation triggers that passed validation and started a remote call
    pub generations_started: AtomicU64,

    /// Generations that produced an image
    pub generations_succeeded: AtomicU64,

    /// Generations that failed after starting (read, network or service errors)
    pub generations_failed: AtomicU64,

    /// Triggers rejected locally because a slot was empty
    pub validation_rejections: AtomicU64,

    /// Triggers ignored because a generation was already in flight
    pub ignored_triggers: AtomicU64,

    /// Results that arrived after the session was reset
    pub discarded_results: AtomicU64,

    /// Total time spent in started generations, in milliseconds
    pub total_generation_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            generations_started: AtomicU64::new(0),
            generations_succeeded: AtomicU64::new(0),
            generations_failed: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            ignored_triggers: AtomicU64::new(0),
            discarded_results: AtomicU64::new(0),
            total_generation_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_started(&self) {
        self.generations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_succeeded(&self, duration: Duration) {
        self.generations_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_generation_time(duration);
    }

    pub fn record_failed(&self, duration: Duration) {
        self.generations_failed.fetch_add(1, Ordering::Relaxed);
        self.record_generation_time(duration);
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored_trigger(&self) {
        self.ignored_triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, duration: Duration) {
        self.discarded_results.fetch_add(1, Ordering::Relaxed);
        self.record_generation_time(duration);
    }

    fn record_generation_time(&self, duration: Duration) {
        self.total_generation_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per finished generation in milliseconds
    pub fn avg_generation_time_ms(&self) -> f64 {
        let total = self.total_generation_time_ms.load(Ordering::Relaxed);
        let count = self.generations_succeeded.load(Ordering::Relaxed)
            + self.generations_failed.load(Ordering::Relaxed)
            + self.discarded_results.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Generations: {} started, {} succeeded, {} failed, {} discarded",
            self.generations_started.load(Ordering::Relaxed),
            self.generations_succeeded.load(Ordering::Relaxed),
            self.generations_failed.load(Ordering::Relaxed),
            self.discarded_results.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Rejected triggers: {} validation, {} while in flight",
            self.validation_rejections.load(Ordering::Relaxed),
            self.ignored_triggers.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total generation time: {:.2}s (avg: {:.2}ms)",
            self.total_generation_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_generation_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
