//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics so the tracking loop, the callback pump and the remote
//! command path never contend on a lock to record a counter.
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free metrics collector
pub struct Metrics {
    /// Tracking loop iterations (monotonic)
    tracking_iterations: AtomicU64,
    /// Iterations that ended with no followable person or a failed query
    tracking_retries: AtomicU64,
    /// Follow commands issued to the gateway
    follow_commands: AtomicU64,
    /// Stop-follow teardowns
    follow_stops: AtomicU64,
    /// Follow status/error callbacks received
    follow_callbacks: AtomicU64,
    /// Navigation events delivered to listeners
    navigation_events: AtomicU64,
    /// Listener invocations that failed or panicked
    listener_failures: AtomicU64,
    places_added: AtomicU64,
    places_skipped: AtomicU64,
    utterances: AtomicU64,
    remote_commands: AtomicU64,
    /// Remote commands dropped because the worker queue was full
    remote_commands_dropped: AtomicU64,
    /// Iterations since last report (reset on report)
    iterations_since_report: AtomicU64,
    last_report_time: Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tracking_iterations: AtomicU64::new(0),
            tracking_retries: AtomicU64::new(0),
            follow_commands: AtomicU64::new(0),
            follow_stops: AtomicU64::new(0),
            follow_callbacks: AtomicU64::new(0),
            navigation_events: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
            places_added: AtomicU64::new(0),
            places_skipped: AtomicU64::new(0),
            utterances: AtomicU64::new(0),
            remote_commands: AtomicU64::new(0),
            remote_commands_dropped: AtomicU64::new(0),
            iterations_since_report: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_tracking_iteration(&self) {
        self.tracking_iterations.fetch_add(1, Ordering::Relaxed);
        self.iterations_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_tracking_retry(&self) {
        self.tracking_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_follow_command(&self) {
        self.follow_commands.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_follow_stop(&self) {
        self.follow_stops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_follow_callback(&self) {
        self.follow_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_navigation_event(&self) {
        self.navigation_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_listener_failure(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_places(&self, added: u64, skipped: u64) {
        self.places_added.fetch_add(added, Ordering::Relaxed);
        self.places_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_utterance(&self) {
        self.utterances.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remote_command(&self) {
        self.remote_commands.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remote_command_dropped(&self) {
        self.remote_commands_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn follow_commands(&self) -> u64 {
        self.follow_commands.load(Ordering::Relaxed)
    }

    pub fn listener_failures(&self) -> u64 {
        self.listener_failures.load(Ordering::Relaxed)
    }

    /// Snapshot all counters; the per-interval iteration rate is reset
    pub fn report(&self) -> MetricsSummary {
        let now = Instant::now();
        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *last = now;
            elapsed
        };
        let iterations = self.iterations_since_report.swap(0, Ordering::Relaxed);
        let iterations_per_sec =
            if elapsed_secs > 0.0 { iterations as f64 / elapsed_secs } else { 0.0 };

        MetricsSummary {
            tracking_iterations: self.tracking_iterations.load(Ordering::Relaxed),
            tracking_iterations_per_sec: iterations_per_sec,
            tracking_retries: self.tracking_retries.load(Ordering::Relaxed),
            follow_commands: self.follow_commands.load(Ordering::Relaxed),
            follow_stops: self.follow_stops.load(Ordering::Relaxed),
            follow_callbacks: self.follow_callbacks.load(Ordering::Relaxed),
            navigation_events: self.navigation_events.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            places_added: self.places_added.load(Ordering::Relaxed),
            places_skipped: self.places_skipped.load(Ordering::Relaxed),
            utterances: self.utterances.load(Ordering::Relaxed),
            remote_commands: self.remote_commands.load(Ordering::Relaxed),
            remote_commands_dropped: self.remote_commands_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub tracking_iterations: u64,
    pub tracking_iterations_per_sec: f64,
    pub tracking_retries: u64,
    pub follow_commands: u64,
    pub follow_stops: u64,
    pub follow_callbacks: u64,
    pub navigation_events: u64,
    pub listener_failures: u64,
    pub places_added: u64,
    pub places_skipped: u64,
    pub utterances: u64,
    pub remote_commands: u64,
    pub remote_commands_dropped: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            tracking_iterations = %self.tracking_iterations,
            iterations_per_sec = format!("{:.1}", self.tracking_iterations_per_sec),
            tracking_retries = %self.tracking_retries,
            follow_cmds = %self.follow_commands,
            follow_stops = %self.follow_stops,
            follow_callbacks = %self.follow_callbacks,
            nav_events = %self.navigation_events,
            listener_failures = %self.listener_failures,
            places_added = %self.places_added,
            places_skipped = %self.places_skipped,
            utterances = %self.utterances,
            remote_cmds = %self.remote_commands,
            remote_dropped = %self.remote_commands_dropped,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.follow_commands(), 0);
        assert_eq!(metrics.listener_failures(), 0);
    }

    #[test]
    fn test_report_resets_rate_only() {
        let metrics = Metrics::new();
        metrics.record_tracking_iteration();
        metrics.record_tracking_iteration();
        metrics.record_places(3, 1);

        let first = metrics.report();
        assert_eq!(first.tracking_iterations, 2);
        assert_eq!(first.places_added, 3);
        assert_eq!(first.places_skipped, 1);

        let second = metrics.report();
        assert_eq!(second.tracking_iterations, 2);
        assert_eq!(second.tracking_iterations_per_sec, 0.0);
    }
}
