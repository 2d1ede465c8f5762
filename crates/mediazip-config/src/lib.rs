#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Environment-driven configuration for the mediazip service.

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    DEFAULT_BIND_ADDR, ENV_BIND_ADDR, ENV_CATALOG, ENV_LOG_FORMAT, ENV_LOG_LEVEL,
    ENV_UPLOADER_KEYS, ENV_UPLOADS_DIR, ServiceConfig,
};
