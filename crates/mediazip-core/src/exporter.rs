//! End-to-end bulk "download as ZIP" action.
//!
//! # Design
//! - Checks run eagerly and in a fixed order; the first failure wins.
//! - Nothing touches the filesystem before the selection has been validated.
//! - Success hands back a [`FinishedArchive`]; delivering it is the caller's job.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::archive::{ArchiveBuilder, FinishedArchive};
use crate::error::{ExportError, ExportResult};
use crate::model::{BULK_ACTION_KEY, BulkActionRequest, Capability};
use crate::registry::{CapabilityCheck, MediaRegistry};
use crate::resolver::resolve_files;
use crate::selection::validate_selection;

/// Result of handling a bulk-action submission.
#[derive(Debug)]
pub enum ActionOutcome {
    /// The submission targets another action and was left untouched.
    PassThrough,
    /// Archive ready for delivery.
    Download(FinishedArchive),
}

/// Bulk export pipeline wired with its host collaborators.
#[derive(Clone)]
pub struct BulkExporter {
    registry: Arc<dyn MediaRegistry>,
    builder: ArchiveBuilder,
}

impl BulkExporter {
    /// Wire the pipeline with a registry and an archive builder.
    #[must_use]
    pub fn new(registry: Arc<dyn MediaRegistry>, builder: ArchiveBuilder) -> Self {
        Self { registry, builder }
    }

    /// Handle one bulk-action submission on behalf of `caller`.
    ///
    /// Blocks on filesystem and archive IO.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: [`ExportError::Unauthorized`],
    /// [`ExportError::EmptySelection`], [`ExportError::ZipUnavailable`],
    /// [`ExportError::InvalidIdentifiers`], [`ExportError::NoValidFiles`], or an
    /// archive creation failure.
    #[instrument(
        name = "bulk_export",
        skip_all,
        fields(action = %request.action, selected = request.media.len())
    )]
    pub fn handle(
        &self,
        caller: &dyn CapabilityCheck,
        request: &BulkActionRequest,
    ) -> ExportResult<ActionOutcome> {
        if request.action != BULK_ACTION_KEY {
            return Ok(ActionOutcome::PassThrough);
        }

        let capability = Capability::UploadFiles;
        if !caller.has_capability(capability) {
            return Err(ExportError::Unauthorized { capability });
        }
        if request.media.is_empty() {
            return Err(ExportError::EmptySelection);
        }
        self.builder.ensure_available()?;

        let ids = validate_selection(&request.media)?;
        let files = resolve_files(self.registry.as_ref(), &ids)?;
        let archive = self.builder.build(&files)?;

        info!(
            requested = ids.len(),
            entries = archive.entries(),
            bytes = archive.size(),
            "bulk export archive ready"
        );
        Ok(ActionOutcome::Download(archive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawId;
    use crate::registry::CatalogRegistry;
    use crate::scratch::SCRATCH_DIR_NAME;
    use anyhow::Result;
    use mediazip_test_support::MediaLibraryFixture;

    struct Grants(bool);

    impl CapabilityCheck for Grants {
        fn has_capability(&self, _capability: Capability) -> bool {
            self.0
        }
    }

    fn request(action: &str, media: Vec<RawId>) -> BulkActionRequest {
        BulkActionRequest {
            action: action.to_string(),
            media,
        }
    }

    fn exporter(fixture: &MediaLibraryFixture) -> Result<BulkExporter> {
        let registry = CatalogRegistry::load(fixture.catalog_path(), fixture.uploads())?;
        Ok(BulkExporter::new(
            Arc::new(registry),
            ArchiveBuilder::new(fixture.uploads()),
        ))
    }

    fn library() -> Result<MediaLibraryFixture> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("2024/05/photo.jpg", b"jpeg bytes")?;
        fixture.write_catalog(&[(5, "attachment", Some("2024/05/photo.jpg"))])?;
        Ok(fixture)
    }

    #[test]
    fn other_actions_pass_through_untouched() -> Result<()> {
        let fixture = library()?;
        let outcome = exporter(&fixture)?.handle(&Grants(false), &request("trash", vec![]))?;
        assert!(matches!(outcome, ActionOutcome::PassThrough));
        assert!(!fixture.uploads().join(SCRATCH_DIR_NAME).exists());
        Ok(())
    }

    #[test]
    fn authorization_is_checked_before_the_selection() -> Result<()> {
        let fixture = library()?;
        let result = exporter(&fixture)?.handle(&Grants(false), &request(BULK_ACTION_KEY, vec![]));
        assert!(matches!(result, Err(ExportError::Unauthorized { .. })));
        Ok(())
    }

    #[test]
    fn empty_selection_touches_nothing_on_disk() -> Result<()> {
        let fixture = library()?;
        let result = exporter(&fixture)?.handle(&Grants(true), &request(BULK_ACTION_KEY, vec![]));
        assert!(matches!(result, Err(ExportError::EmptySelection)));
        assert!(!fixture.uploads().join(SCRATCH_DIR_NAME).exists());
        Ok(())
    }

    #[cfg(feature = "zip")]
    #[test]
    fn invalid_tokens_never_create_an_archive() -> Result<()> {
        let fixture = library()?;
        let raw = vec![RawId::from("abc"), RawId::from("-3"), RawId::from("0")];
        let result = exporter(&fixture)?.handle(&Grants(true), &request(BULK_ACTION_KEY, raw));
        assert!(matches!(
            result,
            Err(ExportError::InvalidIdentifiers { .. })
        ));
        assert!(!fixture.uploads().join(SCRATCH_DIR_NAME).exists());
        Ok(())
    }

    #[cfg(feature = "zip")]
    #[test]
    fn unresolvable_selection_reports_no_valid_files() -> Result<()> {
        let fixture = library()?;
        let raw = vec![RawId::Integer(9999), RawId::from("12")];
        let result = exporter(&fixture)?.handle(&Grants(true), &request(BULK_ACTION_KEY, raw));
        assert!(matches!(result, Err(ExportError::NoValidFiles { .. })));
        Ok(())
    }

    #[cfg(feature = "zip")]
    #[test]
    fn valid_selection_produces_a_download() -> Result<()> {
        let fixture = library()?;
        let raw = vec![RawId::Integer(5), RawId::Integer(5), RawId::Integer(9999)];
        let outcome = exporter(&fixture)?.handle(&Grants(true), &request(BULK_ACTION_KEY, raw))?;
        let ActionOutcome::Download(archive) = outcome else {
            anyhow::bail!("expected a download");
        };
        assert_eq!(archive.entries(), 1);
        assert!(archive.path().is_file());
        Ok(())
    }

    #[cfg(not(feature = "zip"))]
    #[test]
    fn builds_without_zip_refuse_before_touching_the_selection() -> Result<()> {
        let fixture = library()?;
        let raw = vec![RawId::Integer(5)];
        let result = exporter(&fixture)?.handle(&Grants(true), &request(BULK_ACTION_KEY, raw));
        let Err(err) = result else {
            anyhow::bail!("expected zip support to be missing");
        };
        assert_eq!(err.code(), crate::error::ErrorCode::ZipNotAvailable);
        assert!(!fixture.uploads().join(SCRATCH_DIR_NAME).exists());
        Ok(())
    }
}
