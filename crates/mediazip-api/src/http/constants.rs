//! Shared HTTP constants (headers, query parameters, problem URIs).

pub(crate) const HEADER_API_KEY: &str = "x-mediazip-api-key";
pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_SKIPPED_ENTRIES: &str = "x-mediazip-skipped-entries";
pub(crate) const HEADER_TRANSFER_ENCODING_LEGACY: &str = "content-transfer-encoding";

/// Query parameter carrying the error code on failure redirects.
pub const ERROR_QUERY_PARAM: &str = "bmzd_error";
/// Redirect target used when the submission names none or an unsafe one.
pub const DEFAULT_REDIRECT: &str = "/admin/media";

pub(crate) const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
pub(crate) const NO_CACHE: &str = "no-cache, no-store, must-revalidate";
pub(crate) const STREAM_CHUNK_SIZE: usize = 64 * 1024;

pub(crate) const PROBLEM_INTERNAL: &str = "https://mediazip.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://mediazip.dev/problems/bad-request";
