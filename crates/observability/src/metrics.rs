//! Routing metrics
//!
//! Global counters recorded through the `metrics` facade, plus an
//! in-memory aggregator used for end-of-run summaries.

use std::sync::Arc;

use metrics::{counter, gauge, histogram};

/// Record a value message handed to the transport
pub fn record_message_sent(router: Arc<str>) {
    counter!(
        "sigroute_messages_sent_total",
        "router" => router
    )
    .increment(1);
}

/// Record a query message handed to the transport
pub fn record_query_sent(router: Arc<str>) {
    counter!(
        "sigroute_queries_sent_total",
        "router" => router
    )
    .increment(1);
}

/// Record a send rejected by the transport
pub fn record_transport_failure(router: Arc<str>) {
    counter!(
        "sigroute_transport_failures_total",
        "router" => router
    )
    .increment(1);
}

/// Record a mapping discarded because one of its elements failed
pub fn record_mapping_aborted(router: Arc<str>) {
    counter!(
        "sigroute_mappings_aborted_total",
        "router" => router
    )
    .increment(1);
}

/// Record a value change dropped at a full routing queue
pub fn record_value_dropped() {
    counter!("sigroute_values_dropped_total").increment(1);
}

/// Record the time taken to dispatch one value change
pub fn record_dispatch_latency_ms(latency_ms: f64) {
    histogram!("sigroute_dispatch_latency_ms").record(latency_ms);
}

/// Record the number of live routers
pub fn record_router_count(count: usize) {
    gauge!("sigroute_routers").set(count as f64);
}

/// Dispatch statistics aggregator
///
/// Keeps totals in memory so a run can print a summary on exit.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Value changes dispatched
    pub total_values: u64,

    /// Messages sent across all mappings
    pub total_sent: u64,

    /// Mappings discarded
    pub total_aborted: u64,

    /// Queries sent
    pub total_queries: u64,

    /// Dispatch latency in milliseconds
    pub latency_stats: RunningStats,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one dispatched value change
    pub fn update(&mut self, sent: usize, aborted: usize, latency_ms: f64) {
        self.total_values += 1;
        self.total_sent += sent as u64;
        self.total_aborted += aborted as u64;
        self.latency_stats.push(latency_ms);
        record_dispatch_latency_ms(latency_ms);
    }

    /// Account for one query request
    pub fn record_queries(&mut self, count: usize) {
        self.total_queries += count as u64;
    }

    pub fn summary(&self) -> MetricsSummary {
        let total_mappings = self.total_sent + self.total_aborted;
        MetricsSummary {
            total_values: self.total_values,
            total_sent: self.total_sent,
            total_aborted: self.total_aborted,
            total_queries: self.total_queries,
            abort_rate: if total_mappings > 0 {
                self.total_aborted as f64 / total_mappings as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_values: u64,
    pub total_sent: u64,
    pub total_aborted: u64,
    pub total_queries: u64,
    pub abort_rate: f64,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Routing Summary ===")?;
        writeln!(f, "Values dispatched: {}", self.total_values)?;
        writeln!(f, "Messages sent: {}", self.total_sent)?;
        writeln!(
            f,
            "Mappings aborted: {} ({:.2}%)",
            self.total_aborted, self.abort_rate
        )?;
        writeln!(f, "Queries sent: {}", self.total_queries)?;
        writeln!(f, "Dispatch latency (ms): {}", self.latency_ms)?;
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        let router: Arc<str> = Arc::from("/synth1");
        record_message_sent(router.clone());
        record_query_sent(router.clone());
        record_transport_failure(router.clone());
        record_mapping_aborted(router.clone());
        assert_eq!(Arc::strong_count(&router), 1);
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchStatsAggregator::new();

        aggregator.update(2, 0, 0.5);
        aggregator.update(1, 1, 1.5);
        aggregator.record_queries(3);

        assert_eq!(aggregator.total_values, 2);
        assert_eq!(aggregator.total_sent, 3);
        assert_eq!(aggregator.total_aborted, 1);
        assert_eq!(aggregator.total_queries, 3);

        let summary = aggregator.summary();
        assert!((summary.abort_rate - 25.0).abs() < 1e-10);
        assert!((summary.latency_ms.mean - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_summary() {
        let summary = DispatchStatsAggregator::new().summary();
        assert_eq!(summary.abort_rate, 0.0);
        assert_eq!(format!("{}", summary.latency_ms), "N/A");
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchStatsAggregator::new();
        aggregator.update(1, 1, 2.0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Values dispatched: 1"));
        assert!(output.contains("50.00%"));
    }
}
