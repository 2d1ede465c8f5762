//! Shared application state handed to every handler.

use mediazip_core::BulkExporter;
use mediazip_telemetry::Metrics;

use crate::http::auth::CallerDirectory;

/// Dependencies shared across handlers.
pub(crate) struct ApiState {
    pub(crate) exporter: BulkExporter,
    pub(crate) callers: CallerDirectory,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) const fn new(
        exporter: BulkExporter,
        callers: CallerDirectory,
        telemetry: Metrics,
    ) -> Self {
        Self {
            exporter,
            callers,
            telemetry,
        }
    }
}
