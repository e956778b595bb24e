//! Optional metrics instrumentation for tandem.
//!
//! When the `observe` feature is enabled, capture, publish and backup paths
//! emit counters and histograms via the [`metrics`] crate. A downstream
//! application must install a metrics recorder (e.g. `metrics-exporter-prometheus`)
//! to collect the data.
//!
//! When the feature is **not** enabled every function in this module is a
//! zero-cost no-op.

/// Record one captured row change.
///
/// - `tandem.capture.changes_total` – counter with `operation` label
#[inline]
pub fn record_capture(operation: &'static str) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tandem.capture.changes_total", "operation" => operation).increment(1);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = operation;
    }
}

/// Record one captured schema statement batch.
///
/// - `tandem.capture.ddl_total` – counter
#[inline]
pub fn record_ddl_capture() {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("tandem.capture.ddl_total").increment(1);
    }
}

/// Record a changeset publish (counter + latency + size).
///
/// - `tandem.publish.total` – counter with `outcome` label
/// - `tandem.publish.duration_seconds` – histogram
/// - `tandem.publish.changes` – histogram of changes per changeset
#[inline]
pub fn record_publish(duration: std::time::Duration, changes: usize, success: bool) {
    #[cfg(feature = "observe")]
    {
        let outcome = if success { "ok" } else { "fail" };
        metrics::counter!("tandem.publish.total", "outcome" => outcome).increment(1);
        metrics::histogram!("tandem.publish.duration_seconds").record(duration.as_secs_f64());
        metrics::histogram!("tandem.publish.changes").record(changes as f64);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (duration, changes, success);
    }
}

/// Record a snapshot export.
///
/// - `tandem.backup.total` – counter with `outcome` and `mode` labels
/// - `tandem.backup.duration_seconds` – histogram
#[inline]
pub fn record_backup(duration: std::time::Duration, success: bool, mode: &'static str) {
    #[cfg(feature = "observe")]
    {
        let outcome = if success { "ok" } else { "fail" };
        metrics::counter!("tandem.backup.total", "outcome" => outcome, "mode" => mode)
            .increment(1);
        metrics::histogram!("tandem.backup.duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (duration, success, mode);
    }
}
