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

//! HTTP surface for the bulk media archive exporter.
//!
//! Layout: `http/bulk.rs` (bulk-action endpoint and archive streaming),
//! `http/notices.rs` (admin page error notices), `http/auth.rs` (API-key caller
//! resolution), `http/router.rs` (router and server host), `i18n.rs` (localized
//! messages).

pub mod error;
pub mod http;
pub(crate) mod i18n;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::auth::{Caller, CallerDirectory};
pub use http::router::ApiServer;
pub use models::{BulkActionBody, BulkActionEntry, HealthResponse, ProblemDetails};
