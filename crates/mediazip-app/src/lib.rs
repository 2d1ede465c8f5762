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

//! mediazip application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `error.rs` (bootstrap failures).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application error types.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
