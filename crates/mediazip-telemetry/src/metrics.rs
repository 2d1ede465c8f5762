//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters relevant to bulk media exports.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    bulk_exports_total: IntCounterVec,
    archive_entries_total: IntCounter,
    archive_bytes_total: IntCounter,
}

/// Outcome label recorded for each bulk export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// An archive was produced and handed to the client.
    Download,
    /// The request named another action and was ignored.
    PassThrough,
    /// The request failed with the given wire error code.
    Failed(&'static str),
}

impl ExportOutcome {
    /// Label value stored on the `bulk_exports_total` counter.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::PassThrough => "pass_through",
            Self::Failed(code) => code,
        }
    }
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total entries written across all produced archives.
    pub archive_entries_total: u64,
    /// Total archive bytes produced.
    pub archive_bytes_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "http_requests_total",
            source,
        })?;
        let bulk_exports_total = IntCounterVec::new(
            Opts::new("bulk_exports_total", "Bulk media export requests by outcome"),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "bulk_exports_total",
            source,
        })?;
        let archive_entries_total = IntCounter::with_opts(Opts::new(
            "archive_entries_total",
            "Files written into produced archives",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "archive_entries_total",
            source,
        })?;
        let archive_bytes_total = IntCounter::with_opts(Opts::new(
            "archive_bytes_total",
            "Bytes of archive data produced",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "archive_bytes_total",
            source,
        })?;

        register(&registry, "http_requests_total", http_requests_total.clone())?;
        register(&registry, "bulk_exports_total", bulk_exports_total.clone())?;
        register(
            &registry,
            "archive_entries_total",
            archive_entries_total.clone(),
        )?;
        register(&registry, "archive_bytes_total", archive_bytes_total.clone())?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                bulk_exports_total,
                archive_entries_total,
                archive_bytes_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record the outcome of a bulk export request.
    pub fn inc_bulk_export(&self, outcome: ExportOutcome) {
        self.inner
            .bulk_exports_total
            .with_label_values(&[outcome.label()])
            .inc();
    }

    /// Record a produced archive.
    pub fn record_archive(&self, entries: usize, bytes: u64) {
        self.inner
            .archive_entries_total
            .inc_by(u64::try_from(entries).unwrap_or(u64::MAX));
        self.inner.archive_bytes_total.inc_by(bytes);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Capture a snapshot of the archive counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            archive_entries_total: self.inner.archive_entries_total.get(),
            archive_bytes_total: self.inner.archive_bytes_total.get(),
        }
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/health", 200);
        metrics.inc_bulk_export(ExportOutcome::Download);
        metrics.inc_bulk_export(ExportOutcome::Failed("no_selection"));
        metrics.record_archive(3, 4_096);
        metrics.record_archive(1, 512);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.archive_entries_total, 4);
        assert_eq!(snapshot.archive_bytes_total, 4_608);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("bulk_exports_total{outcome=\"no_selection\"} 1"));
        assert!(rendered.contains("bulk_exports_total{outcome=\"download\"} 1"));
        Ok(())
    }

    #[test]
    fn export_outcome_labels() {
        assert_eq!(ExportOutcome::Download.label(), "download");
        assert_eq!(ExportOutcome::PassThrough.label(), "pass_through");
        assert_eq!(ExportOutcome::Failed("invalid_ids").label(), "invalid_ids");
    }
}
