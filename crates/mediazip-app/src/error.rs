//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: mediazip_config::ConfigError,
    },
    /// Loading the media catalog failed.
    #[error("media catalog operation failed")]
    Catalog {
        /// Operation identifier.
        operation: &'static str,
        /// Source catalog error.
        source: mediazip_core::CatalogError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: mediazip_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: mediazip_telemetry::TelemetryError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: mediazip_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn catalog(
        operation: &'static str,
        source: mediazip_core::CatalogError,
    ) -> Self {
        Self::Catalog { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: mediazip_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: mediazip_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;
    use std::net::SocketAddr;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            mediazip_config::ConfigError::MissingEnv {
                name: "MEDIAZIP_CATALOG",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let catalog = AppError::catalog(
            "catalog.load",
            mediazip_core::CatalogError::InvalidEntry {
                index: 0,
                reason: "duplicate id",
            },
        );
        assert!(matches!(catalog, AppError::Catalog { .. }));

        let api = AppError::api_server(
            "serve",
            mediazip_api::ApiServerError::Bind {
                addr: SocketAddr::from(([127, 0, 0, 1], 0)),
                source: io::Error::other("in use"),
            },
        );
        assert_eq!(api.to_string(), "api server operation failed");

        let telemetry = AppError::telemetry(
            "telemetry.metrics",
            mediazip_telemetry::TelemetryError::UnknownLogFormat {
                value: "xml".to_string(),
            },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));
    }
}
