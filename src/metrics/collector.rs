//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the rating service using
//! Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the rating service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Rating workflow metrics
    rating_metrics: RatingMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Rating workflow metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Contests processed, by outcome
    pub contests_processed_total: IntCounterVec,

    /// Rating change records written
    pub rating_changes_written_total: IntCounter,

    /// Failed operations, by error kind
    pub failures_total: IntCounterVec,

    /// Domain-wide operations (clear, purge, recompute, rollback)
    pub domain_operations_total: IntCounterVec,

    /// Number of contestants per processed contest
    pub contest_size: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Rating engine computation time
    pub rating_calculation_duration: Histogram,

    /// Batch persistence time
    pub persistence_duration: Histogram,

    /// Full-history replay time
    pub replay_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let rating_metrics = RatingMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            rating_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get rating metrics
    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a contest whose rating changes were persisted
    pub fn record_contest_processed(&self, contestants: usize, written: usize) {
        self.rating_metrics
            .contests_processed_total
            .with_label_values(&["success"])
            .inc();
        self.rating_metrics
            .rating_changes_written_total
            .inc_by(written as u64);
        self.rating_metrics.contest_size.observe(contestants as f64);
    }

    /// Record a contest that could not be processed
    pub fn record_contest_failed(&self, kind: &str) {
        self.rating_metrics
            .contests_processed_total
            .with_label_values(&["error"])
            .inc();
        self.record_failure(kind);
    }

    /// Record a failed operation by error kind
    pub fn record_failure(&self, kind: &str) {
        self.rating_metrics
            .failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record a domain-wide operation
    pub fn record_domain_operation(&self, operation: &str) {
        self.rating_metrics
            .domain_operations_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Record rating calculation duration
    pub fn record_rating_calculation(&self, duration: Duration) {
        self.performance_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record batch persistence duration
    pub fn record_persistence(&self, duration: Duration) {
        self.performance_metrics
            .persistence_duration
            .observe(duration.as_secs_f64());
    }

    /// Record full-history replay duration
    pub fn record_replay(&self, duration: Duration) {
        self.performance_metrics
            .replay_duration
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let contests_processed_total = IntCounterVec::new(
            Opts::new(
                "contest_rating_contests_processed_total",
                "Total contests processed",
            ),
            &["status"],
        )?;
        registry.register(Box::new(contests_processed_total.clone()))?;

        let rating_changes_written_total = IntCounter::new(
            "contest_rating_changes_written_total",
            "Total rating change records written",
        )?;
        registry.register(Box::new(rating_changes_written_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new("contest_rating_failures_total", "Total failed operations"),
            &["kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let domain_operations_total = IntCounterVec::new(
            Opts::new(
                "contest_rating_domain_operations_total",
                "Total domain-wide rating operations",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(domain_operations_total.clone()))?;

        let contest_size = Histogram::with_opts(
            HistogramOpts::new(
                "contest_rating_contest_size",
                "Number of rated contestants per contest",
            )
            .buckets(vec![
                1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0,
            ]),
        )?;
        registry.register(Box::new(contest_size.clone()))?;

        Ok(Self {
            contests_processed_total,
            rating_changes_written_total,
            failures_total,
            domain_operations_total,
            contest_size,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "contest_rating_calculation_duration_seconds",
                "Time spent computing rating deltas for one contest",
            )
            .buckets(vec![0.0001, 0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        let persistence_duration = Histogram::with_opts(
            HistogramOpts::new(
                "contest_rating_persistence_duration_seconds",
                "Time spent persisting one contest's rating changes",
            )
            .buckets(vec![0.0001, 0.001, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(persistence_duration.clone()))?;

        let replay_duration = Histogram::with_opts(
            HistogramOpts::new(
                "contest_rating_replay_duration_seconds",
                "Time spent replaying a domain's full rating history",
            )
            .buckets(vec![0.01, 0.1, 1.0, 10.0, 60.0, 300.0]),
        )?;
        registry.register(Box::new(replay_duration.clone()))?;

        Ok(Self {
            rating_calculation_duration,
            persistence_duration,
            replay_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _rating = collector.rating();
        let _performance = collector.performance();
    }

    #[test]
    fn test_contest_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_contest_processed(12, 12);
        collector.record_contest_processed(3, 3);
        collector.record_contest_failed("invalid_standings");

        let rating = collector.rating();
        assert_eq!(
            rating
                .contests_processed_total
                .with_label_values(&["success"])
                .get(),
            2
        );
        assert_eq!(rating.rating_changes_written_total.get(), 15);
        assert_eq!(
            rating
                .failures_total
                .with_label_values(&["invalid_standings"])
                .get(),
            1
        );
    }

    #[test]
    fn test_render_text_format() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_domain_operation("clear");
        collector.record_rating_calculation(Duration::from_millis(2));

        let text = collector.render().unwrap();
        assert!(text.contains("contest_rating_domain_operations_total"));
        assert!(text.contains("contest_rating_calculation_duration_seconds"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
