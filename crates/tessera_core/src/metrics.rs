//! Run metrics and structured logging.
//!
//! The statistics collector proper lives outside the core; these counters are
//! what the core reports to it (divide failures, copy-correction exhaustion,
//! speculative waste) plus the usual throughput numbers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Global metrics collector for simulation statistics.
pub struct Metrics {
    update_count: AtomicU64,
    organism_count: AtomicU64,
    instructions: AtomicU64,
    births: AtomicU64,
    deaths: AtomicU64,
    divide_failures: AtomicU64,
    correction_exhausted: AtomicU64,
    speculative_waste: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            update_count: AtomicU64::new(0),
            organism_count: AtomicU64::new(0),
            instructions: AtomicU64::new(0),
            births: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            divide_failures: AtomicU64::new(0),
            correction_exhausted: AtomicU64::new(0),
            speculative_waste: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed update with its duration.
    ///
    /// Emits an info line every `log_interval` updates (0 disables it).
    pub fn record_update(&self, duration: Duration, organisms: usize, log_interval: u64) {
        self.update_count.fetch_add(1, Ordering::Relaxed);
        self.organism_count
            .store(organisms as u64, Ordering::Relaxed);

        let update = self.update_count.load(Ordering::Relaxed);
        if log_interval > 0 && update % log_interval == 0 {
            tracing::info!(
                update = update,
                organisms = organisms,
                births = self.births(),
                divide_failures = self.divide_failures(),
                duration_us = duration.as_micros() as u64,
                "Simulation update"
            );
        }
    }

    pub fn record_instructions(&self, count: u64) {
        self.instructions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_birth(&self) {
        self.births.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_death(&self) {
        self.deaths.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_divide_failure(&self) {
        self.divide_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correction_exhausted(&self) {
        self.correction_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_speculative_waste(&self, amount: u64) {
        self.speculative_waste.fetch_add(amount, Ordering::Relaxed);
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Reads a named counter (0 if it was never incremented).
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn organism_count(&self) -> u64 {
        self.organism_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn instructions(&self) -> u64 {
        self.instructions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn births(&self) -> u64 {
        self.births.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deaths(&self) -> u64 {
        self.deaths.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn divide_failures(&self) -> u64 {
        self.divide_failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn correction_exhausted(&self) -> u64 {
        self.correction_exhausted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn speculative_waste(&self) -> u64 {
        self.speculative_waste.load(Ordering::Relaxed)
    }

    /// Gets elapsed time since metrics creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Initialize tracing subscriber for logging.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
