//! Loads [`ServiceConfig`] from environment variables.
//!
//! # Design
//! - `from_env` reads the process environment; `from_lookup` takes any lookup
//!   closure so tests never mutate global state.
//! - Every rejected value surfaces as `ConfigError::InvalidField` naming the
//!   variable and a static reason.

use std::net::SocketAddr;
use std::path::PathBuf;

use mediazip_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};

use crate::error::{ConfigError, ConfigResult};

/// Uploads base directory holding media files and the scratch directory.
pub const ENV_UPLOADS_DIR: &str = "MEDIAZIP_UPLOADS_DIR";
/// Path to the JSON media catalog.
pub const ENV_CATALOG: &str = "MEDIAZIP_CATALOG";
/// Socket address the HTTP server binds to.
pub const ENV_BIND_ADDR: &str = "MEDIAZIP_BIND_ADDR";
/// Comma-separated API keys granted the `upload_files` capability.
pub const ENV_UPLOADER_KEYS: &str = "MEDIAZIP_UPLOADER_KEYS";
/// Log level directive used when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "MEDIAZIP_LOG_LEVEL";
/// Log output format (`json` or `pretty`).
pub const ENV_LOG_FORMAT: &str = "MEDIAZIP_LOG_FORMAT";
/// Bind address used when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7080";

/// Validated service settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base directory of the media uploads tree.
    pub uploads_dir: PathBuf,
    /// Location of the JSON media catalog.
    pub catalog_path: PathBuf,
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// API keys whose callers may download media.
    pub uploader_keys: Vec<String>,
    /// Log level directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnv` when a required variable is absent and
    /// `ConfigError::InvalidField` when a value fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through the supplied lookup function.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ServiceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uploads_raw = required(&lookup, ENV_UPLOADS_DIR)?;
        let uploads_dir = PathBuf::from(&uploads_raw);
        if !uploads_dir.is_dir() {
            return Err(ConfigError::invalid(
                ENV_UPLOADS_DIR,
                &uploads_raw,
                "not a directory",
            ));
        }

        let catalog_path = PathBuf::from(required(&lookup, ENV_CATALOG)?);

        let bind_raw = optional(&lookup, ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::invalid(ENV_BIND_ADDR, &bind_raw, "invalid socket address"))?;

        let uploader_keys = optional(&lookup, ENV_UPLOADER_KEYS)
            .map(|raw| parse_keys(&raw))
            .transpose()?
            .unwrap_or_default();

        let log_level =
            optional(&lookup, ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let log_format = match optional(&lookup, ENV_LOG_FORMAT) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|_| ConfigError::invalid(ENV_LOG_FORMAT, &raw, "unknown log format"))?,
            None => LogFormat::infer(),
        };

        Ok(Self {
            uploads_dir,
            catalog_path,
            bind_addr,
            uploader_keys,
            log_level,
            log_format,
        })
    }
}

fn optional<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::MissingEnv { name })
}

fn parse_keys(raw: &str) -> ConfigResult<Vec<String>> {
    let mut keys = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|key| !key.is_empty()) {
        if key.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid(
                ENV_UPLOADER_KEYS,
                key,
                "api key contains whitespace",
            ));
        }
        if !keys.iter().any(|existing: &String| existing == key) {
            keys.push(key.to_string());
        }
    }
    Ok(keys)
}
