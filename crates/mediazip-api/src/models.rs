//! Request and response payloads exchanged over HTTP.

use mediazip_core::{BulkActionRequest, RawId};
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on request-level failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short summary of the problem type.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Bulk-action form submission from the media list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkActionBody {
    /// Selected action key.
    pub action: String,
    /// Raw media identifiers in list order.
    #[serde(default)]
    pub media: Vec<RawId>,
    /// Same-origin path to return to after a failure or a foreign action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl BulkActionBody {
    /// Split the submission into the pipeline request and the redirect target.
    #[must_use]
    pub fn into_parts(self) -> (BulkActionRequest, Option<String>) {
        (
            BulkActionRequest {
                action: self.action,
                media: self.media,
            },
            self.redirect_to,
        )
    }
}

/// Bulk action offered in the media list dropdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkActionEntry {
    /// Action key submitted with the selection.
    pub key: String,
    /// Localized label.
    pub label: String,
}

/// Liveness payload returned by `/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` when the server answers.
    pub status: String,
    /// Build identifier recorded at startup.
    pub build: String,
    /// Entries written across all archives served so far.
    pub archive_entries_total: u64,
    /// Archive bytes produced so far.
    pub archive_bytes_total: u64,
}
