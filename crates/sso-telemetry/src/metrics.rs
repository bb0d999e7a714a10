//! Prometheus metrics for the SSO provider.
//!
//! All metrics follow the naming convention: `sso_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Handshake attempts by outcome (`success` or an error label)
    pub static ref HANDSHAKES: CounterVec = CounterVec::new(
        Opts::new("sso_handshakes_total", "Total SSO handshake attempts"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Time spent completing a handshake
    pub static ref HANDSHAKE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sso_handshake_duration_seconds",
            "Time spent verifying, binding and re-signing a handshake"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Background replay guard sweeps
    pub static ref REPLAY_GUARD_SWEEPS: Counter = Counter::new(
        "sso_replay_guard_sweeps_total",
        "Total background sweeps of the nonce replay guard"
    ).expect("metric creation failed");

    /// Expired nonces removed by background sweeps
    pub static ref REPLAY_GUARD_EVICTED: Counter = Counter::new(
        "sso_replay_guard_evicted_total",
        "Total expired nonces evicted from the replay guard"
    ).expect("metric creation failed");

    /// Successful settings writes by key
    pub static ref SETTINGS_UPDATES: CounterVec = CounterVec::new(
        Opts::new("sso_settings_updates_total", "Total SSO settings updates"),
        &["key"]
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register every SSO metric with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HANDSHAKES.clone()),
        Box::new(HANDSHAKE_DURATION.clone()),
        Box::new(REPLAY_GUARD_SWEEPS.clone()),
        Box::new(REPLAY_GUARD_EVICTED.clone()),
        Box::new(SETTINGS_UPDATES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_encode_contains_counters() {
        register_metrics().unwrap();
        HANDSHAKES.with_label_values(&["success"]).inc();
        SETTINGS_UPDATES
            .with_label_values(&["discourse_sso.sso_secret"])
            .inc();

        let text = encode_metrics().unwrap();
        assert!(text.contains("sso_handshakes_total"));
        assert!(text.contains("outcome=\"success\""));
        assert!(text.contains("sso_settings_updates_total"));
    }

    #[test]
    fn test_histogram_timer() {
        let before = HANDSHAKE_DURATION.get_sample_count();
        {
            let _timer = HistogramTimer::new(&HANDSHAKE_DURATION);
        }
        assert_eq!(HANDSHAKE_DURATION.get_sample_count(), before + 1);
    }
}
