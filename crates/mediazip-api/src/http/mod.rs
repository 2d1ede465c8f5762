//! HTTP surface modules (router, handlers, middleware).

/// API-key caller resolution.
pub mod auth;
/// Bulk-action endpoint and archive streaming.
pub mod bulk;
/// Shared constants and header names.
pub mod constants;
/// Problem response helpers.
pub mod errors;
/// Health and metrics endpoints.
pub mod health;
/// Admin media page with error notices.
pub mod notices;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
