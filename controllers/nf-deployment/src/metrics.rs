//! Prometheus metrics for reconcile attempts

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::fmt;
use std::time::Duration;

/// Attempt counters and latency histogram, registered on a private registry
pub struct Metrics {
    registry: Registry,

    /// Attempts by terminal state (`skipped`, `converged`, `requeued`, `failed`)
    pub reconcile_total: IntCounterVec,

    /// Failed attempts by error kind
    pub reconcile_errors_total: IntCounterVec,

    /// Attempt duration by terminal state
    pub reconcile_duration_seconds: HistogramVec,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create the collectors and register them under the `nfdeployment` prefix
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("nfdeployment".to_string()), None)?;

        let reconcile_total = IntCounterVec::new(
            Opts::new("reconcile_total", "Reconcile attempts by terminal state"),
            &["result"],
        )?;
        registry.register(Box::new(reconcile_total.clone()))?;

        let reconcile_errors_total = IntCounterVec::new(
            Opts::new("reconcile_errors_total", "Failed reconcile attempts by error kind"),
            &["error"],
        )?;
        registry.register(Box::new(reconcile_errors_total.clone()))?;

        let reconcile_duration_seconds = HistogramVec::new(
            HistogramOpts::new("reconcile_duration_seconds", "Reconcile attempt duration")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["result"],
        )?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            reconcile_total,
            reconcile_errors_total,
            reconcile_duration_seconds,
        })
    }

    /// Record one attempt ending in `result`
    pub fn observe(&self, result: &str, elapsed: Duration) {
        self.reconcile_total.with_label_values(&[result]).inc();
        self.reconcile_duration_seconds
            .with_label_values(&[result])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a failed attempt
    pub fn observe_error(&self, error: &str, elapsed: Duration) {
        self.observe("failed", elapsed);
        self.reconcile_errors_total.with_label_values(&[error]).inc();
    }

    /// Text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
