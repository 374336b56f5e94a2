//! Metrics for the rating service
//!
//! Prometheus counters and histograms for contest processing, rendered in
//! the text exposition format on demand.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, PerformanceMetrics, RatingMetrics};
