//! Domain types shared by the export pipeline.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Bulk action key the exporter answers to; every other action passes through.
pub const BULK_ACTION_KEY: &str = "download_files_zip";

/// Positive media identifier that survived selection validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(u64);

impl MediaId {
    /// Wrap a raw identifier, rejecting zero.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Numeric value of the identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for MediaId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

/// Untrusted identifier token as submitted by the caller.
///
/// Callers send either JSON integers or strings; anything else is kept so the
/// validator can count it as rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Integral JSON number.
    Integer(i64),
    /// String token, expected to hold a decimal integer.
    Text(String),
    /// Any other JSON value (floats, booleans, null, objects).
    Other(serde_json::Value),
}

impl From<i64> for RawId {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Kind of entity stored in the host content registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Uploaded media file with an associated path on disk.
    Attachment,
    /// Any other registry entity (posts, pages, revisions).
    #[serde(other)]
    Other,
}

/// Named permission checked against the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Permission to upload and download media files.
    UploadFiles,
}

impl Capability {
    /// Stable identifier used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UploadFiles => "upload_files",
        }
    }
}

/// Bulk-action submission from the media list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkActionRequest {
    /// Selected action key.
    pub action: String,
    /// Selected media identifiers, in list order.
    #[serde(default)]
    pub media: Vec<RawId>,
}

/// One file scheduled for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Entry name inside the archive, unique within one batch.
    pub archive_name: String,
    /// Existing regular file on disk.
    pub source_path: PathBuf,
}

/// Ordered archive-name to source-path mapping for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFiles {
    entries: Vec<ResolvedFile>,
}

impl ResolvedFiles {
    pub(crate) const fn new(entries: Vec<ResolvedFile>) -> Self {
        Self { entries }
    }

    /// Number of resolved entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing resolved.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedFile> {
        self.entries.iter()
    }

    /// Archive names in resolution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.archive_name.as_str())
    }

    /// Look up the source path assigned to an archive name.
    #[must_use]
    pub fn source_for(&self, archive_name: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|entry| entry.archive_name == archive_name)
            .map(|entry| entry.source_path.as_path())
    }
}
