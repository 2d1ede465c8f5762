//! Service wiring: configuration, logging, catalog, exporter and HTTP server.

use std::sync::Arc;

use mediazip_api::{ApiServer, CallerDirectory};
use mediazip_config::ServiceConfig;
use mediazip_core::{ArchiveBuilder, BulkExporter, CatalogRegistry};
use mediazip_telemetry::{GlobalContextGuard, LoggingConfig, Metrics, init_logging};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Build identifier stamped at compile time when available.
const BUILD_SHA: &str = match option_env!("MEDIAZIP_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to bootstrap the mediazip service.
pub(crate) struct BootstrapDependencies {
    config: ServiceConfig,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = ServiceConfig::from_env()
            .map_err(|err| AppError::config("service_config.from_env", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self { config, telemetry })
    }
}

/// Entry point used by the binary: load configuration and run until shutdown.
///
/// # Errors
///
/// Returns an error if configuration, logging, catalog loading or serving fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies { config, telemetry } = dependencies;
    let logging = LoggingConfig {
        level: &config.log_level,
        format: config.log_format,
        build_sha: BUILD_SHA,
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("mediazip");

    info!(
        uploads = %config.uploads_dir.display(),
        catalog = %config.catalog_path.display(),
        uploaders = config.uploader_keys.len(),
        "mediazip bootstrap starting"
    );

    let server = build_server(&config, telemetry)?;
    server
        .serve(config.bind_addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))
}

/// Wire the catalog, caller table and exporter into an API server.
pub(crate) fn build_server(config: &ServiceConfig, telemetry: Metrics) -> AppResult<ApiServer> {
    let registry = CatalogRegistry::load(&config.catalog_path, &config.uploads_dir)
        .map_err(|err| AppError::catalog("catalog.load", err))?;
    if !ArchiveBuilder::is_available() {
        warn!("built without ZIP support; bulk downloads will be refused");
    }
    let exporter = BulkExporter::new(
        Arc::new(registry),
        ArchiveBuilder::new(config.uploads_dir.clone()),
    );
    let callers = CallerDirectory::new(config.uploader_keys.iter().cloned());
    Ok(ApiServer::new(exporter, callers, telemetry))
}
