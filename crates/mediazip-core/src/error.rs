//! # Design
//!
//! - Provide a closed, constant-message error set for the export pipeline.
//! - Every variant maps onto a wire code carried by the failure redirect.
//! - Capture operation context (paths, counts) without interpolating it into messages.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::Capability;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Boxed source error for archive backend failures.
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Failures surfaced by the bulk export pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Caller lacks the capability required to export media.
    #[error("caller lacks required capability")]
    Unauthorized {
        /// Capability that was checked.
        capability: Capability,
    },
    /// No identifiers were submitted.
    #[error("selection is empty")]
    EmptySelection,
    /// Every submitted identifier failed validation.
    #[error("selection contains no valid identifiers")]
    InvalidIdentifiers {
        /// Number of tokens that were rejected.
        rejected: usize,
    },
    /// The build carries no ZIP support.
    #[error("zip archive support unavailable")]
    ZipUnavailable,
    /// No identifier resolved to an existing attachment file.
    #[error("selection resolved to no valid files")]
    NoValidFiles {
        /// Number of validated identifiers that were looked up.
        requested: usize,
    },
    /// Scratch directory or its protection markers could not be prepared.
    #[error("scratch directory unavailable")]
    ScratchUnavailable {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The archive container could not be opened for writing.
    #[error("archive could not be opened")]
    ArchiveOpenFailed {
        /// Archive path that failed to open.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The archive could not be written or finalized.
    #[error("archive creation failed")]
    ArchiveCreationFailed {
        /// Archive path being produced.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
        /// Underlying backend error when available.
        source: Option<BoxedSource>,
    },
}

impl ExportError {
    pub(crate) fn scratch(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::ScratchUnavailable {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn creation_failed(
        path: impl Into<PathBuf>,
        reason: &'static str,
        source: Option<BoxedSource>,
    ) -> Self {
        Self::ArchiveCreationFailed {
            path: path.into(),
            reason,
            source,
        }
    }

    /// Wire code reported to the caller for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::EmptySelection => ErrorCode::NoSelection,
            Self::InvalidIdentifiers { .. } => ErrorCode::InvalidIds,
            Self::ZipUnavailable => ErrorCode::ZipNotAvailable,
            Self::NoValidFiles { .. } => ErrorCode::NoValidFiles,
            Self::ScratchUnavailable { .. }
            | Self::ArchiveOpenFailed { .. }
            | Self::ArchiveCreationFailed { .. } => ErrorCode::ZipCreationFailed,
        }
    }
}

/// Error codes carried on the `bmzd_error` redirect parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Caller lacks the upload capability.
    Unauthorized,
    /// Nothing was selected.
    NoSelection,
    /// No identifier parsed as a positive integer.
    InvalidIds,
    /// ZIP support is missing.
    ZipNotAvailable,
    /// No selected media resolved to a file.
    NoValidFiles,
    /// Archive preparation, writing or finalization failed.
    ZipCreationFailed,
}

impl ErrorCode {
    /// Every code, in check order.
    pub const ALL: [Self; 6] = [
        Self::Unauthorized,
        Self::NoSelection,
        Self::InvalidIds,
        Self::ZipNotAvailable,
        Self::NoValidFiles,
        Self::ZipCreationFailed,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NoSelection => "no_selection",
            Self::InvalidIds => "invalid_ids",
            Self::ZipNotAvailable => "zip_not_available",
            Self::NoValidFiles => "no_valid_files",
            Self::ZipCreationFailed => "zip_creation_failed",
        }
    }

    /// Parse a wire code taken from a query string; unknown codes yield `None`.
    #[must_use]
    pub fn from_query(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL.into_iter().find(|code| code.as_str() == trimmed)
    }
}

/// Failures while loading the media catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("catalog io failure")]
    Io {
        /// Catalog path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Catalog file is not valid JSON for the expected layout.
    #[error("catalog json failure")]
    Json {
        /// Catalog path.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// A catalog record failed validation.
    #[error("catalog entry invalid")]
    InvalidEntry {
        /// Position of the record in the catalog.
        index: usize,
        /// Static reason for the failure.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_maps_to_a_wire_code() {
        let cases = [
            (
                ExportError::Unauthorized {
                    capability: Capability::UploadFiles,
                },
                "unauthorized",
            ),
            (ExportError::EmptySelection, "no_selection"),
            (ExportError::InvalidIdentifiers { rejected: 3 }, "invalid_ids"),
            (ExportError::ZipUnavailable, "zip_not_available"),
            (ExportError::NoValidFiles { requested: 1 }, "no_valid_files"),
            (
                ExportError::scratch("scratch.create_dir", "tmp", io::Error::other("io")),
                "zip_creation_failed",
            ),
            (
                ExportError::ArchiveOpenFailed {
                    path: PathBuf::from("a.zip"),
                    source: io::Error::other("io"),
                },
                "zip_creation_failed",
            ),
            (
                ExportError::creation_failed("a.zip", "empty archive", None),
                "zip_creation_failed",
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.code().as_str(), code);
        }
    }

    #[test]
    fn error_codes_round_trip_through_query_values() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_query(code.as_str()), Some(code));
        }
        assert_eq!(
            ErrorCode::from_query(" no_valid_files "),
            Some(ErrorCode::NoValidFiles)
        );
        assert_eq!(ErrorCode::from_query("<script>"), None);
        assert_eq!(ErrorCode::from_query(""), None);
    }

    #[test]
    fn io_backed_variants_keep_their_source() {
        let err = ExportError::scratch("scratch.write_marker", "x", io::Error::other("denied"));
        assert_eq!(err.to_string(), "scratch directory unavailable");
        assert!(err.source().is_some());

        let bare = ExportError::creation_failed("a.zip", "missing after close", None);
        assert!(bare.source().is_none());
    }
}
