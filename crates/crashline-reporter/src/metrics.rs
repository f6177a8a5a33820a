//! Prometheus metrics for the report pipeline
//!
//! Delivery is best-effort and failures never reach the reporting caller,
//! so these counters are how silent loss is observed. Each reporter owns
//! its own registry; nothing is registered globally.

use crashline_core::domain::Level;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Reason label for reports dropped because the queue was full
pub const DROP_QUEUE_FULL: &str = "queue_full";
/// Reason label for reports submitted after the dispatcher closed
pub const DROP_CLOSED: &str = "closed";

/// Metrics registry of one reporter.
#[derive(Clone)]
pub struct ReporterMetrics {
    registry: Registry,
    /// Counter: reports accepted into the queue, by level
    pub reports_enqueued_total: IntCounterVec,
    /// Counter: reports the transport accepted, by level
    pub reports_delivered_total: IntCounterVec,
    /// Counter: failed delivery attempts, by transport error reason
    pub delivery_failures_total: IntCounterVec,
    /// Counter: reports never handed to the transport, by reason
    pub reports_dropped_total: IntCounterVec,
    /// Gauge: reports enqueued but not yet delivered or failed
    pub pending_reports: IntGauge,
    /// Histogram: duration of a single delivery attempt in seconds
    pub delivery_duration_seconds: HistogramVec,
}

impl ReporterMetrics {
    /// Creates a new `ReporterMetrics` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("crashline".to_string()), None)?;

        let reports_enqueued_total = IntCounterVec::new(
            Opts::new("reports_enqueued_total", "Reports accepted for delivery"),
            &["level"],
        )?;
        registry.register(Box::new(reports_enqueued_total.clone()))?;

        let reports_delivered_total = IntCounterVec::new(
            Opts::new("reports_delivered_total", "Reports accepted by the transport"),
            &["level"],
        )?;
        registry.register(Box::new(reports_delivered_total.clone()))?;

        let delivery_failures_total = IntCounterVec::new(
            Opts::new("delivery_failures_total", "Failed delivery attempts"),
            &["reason"],
        )?;
        registry.register(Box::new(delivery_failures_total.clone()))?;

        let reports_dropped_total = IntCounterVec::new(
            Opts::new("reports_dropped_total", "Reports dropped before delivery"),
            &["reason"],
        )?;
        registry.register(Box::new(reports_dropped_total.clone()))?;

        let pending_reports = IntGauge::new("pending_reports", "Reports awaiting delivery")?;
        registry.register(Box::new(pending_reports.clone()))?;

        let delivery_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "delivery_duration_seconds",
                "Single delivery attempt duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, f64::INFINITY]),
            &["result"],
        )?;
        registry.register(Box::new(delivery_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            reports_enqueued_total,
            reports_delivered_total,
            delivery_failures_total,
            reports_dropped_total,
            pending_reports,
            delivery_duration_seconds,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record a report accepted into the queue.
    pub fn record_enqueued(&self, level: Level) {
        self.reports_enqueued_total
            .with_label_values(&[level.as_str()])
            .inc();
    }

    /// Record a successful delivery and its duration.
    pub fn record_delivered(&self, level: Level, duration_secs: f64) {
        self.reports_delivered_total
            .with_label_values(&[level.as_str()])
            .inc();
        self.delivery_duration_seconds
            .with_label_values(&["success"])
            .observe(duration_secs);
    }

    /// Record a failed delivery and its duration.
    pub fn record_failure(&self, reason: &str, duration_secs: f64) {
        self.delivery_failures_total
            .with_label_values(&[reason])
            .inc();
        self.delivery_duration_seconds
            .with_label_values(&["failure"])
            .observe(duration_secs);
    }

    /// Record a report dropped before it reached the queue.
    pub fn record_dropped(&self, reason: &str) {
        self.reports_dropped_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Set the pending reports gauge.
    pub fn set_pending(&self, pending: usize) {
        self.pending_reports
            .set(i64::try_from(pending).unwrap_or(i64::MAX));
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Reports delivered at the given level so far.
    pub fn delivered(&self, level: Level) -> u64 {
        self.reports_delivered_total
            .with_label_values(&[level.as_str()])
            .get()
    }

    /// Delivered reports across all levels.
    pub fn delivered_total(&self) -> u64 {
        Level::ALL.iter().map(|level| self.delivered(*level)).sum()
    }

    /// Failed deliveries with the given reason so far.
    pub fn failures(&self, reason: &str) -> u64 {
        self.delivery_failures_total
            .with_label_values(&[reason])
            .get()
    }

    /// Dropped reports with the given reason so far.
    pub fn dropped(&self, reason: &str) -> u64 {
        self.reports_dropped_total
            .with_label_values(&[reason])
            .get()
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl std::fmt::Debug for ReporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterMetrics")
            .field("pending_reports", &self.pending_reports.get())
            .finish_non_exhaustive()
    }
}
