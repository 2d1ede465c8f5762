//! ZIP assembly for a resolved selection.
//!
//! # Design
//! - Archives are written into the scratch directory under a unique on-disk name;
//!   the timestamped download name is kept separately for the response.
//! - A source that cannot be opened at archive time is recorded as skipped and
//!   the batch continues; write failures after an entry was started abort the archive.
//! - [`FinishedArchive`] owns its scratch file and removes it on drop, so every
//!   exit path (streamed, failed, abandoned) cleans up.

use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ExportError, ExportResult};
use crate::model::{ResolvedFile, ResolvedFiles};
use crate::scratch::ScratchDir;

const DOWNLOAD_PREFIX: &str = "medias-selection-";
const DOWNLOAD_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Download name for an archive started at `now`: `medias-selection-<YYYYMMDD>-<HHMMSS>.zip`.
#[must_use]
pub fn download_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{DOWNLOAD_PREFIX}{}.zip",
        now.format(DOWNLOAD_TIMESTAMP_FORMAT)
    )
}

/// Entry that could not be added to the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Archive name the entry would have used.
    pub archive_name: String,
    /// Source file that failed.
    pub source_path: PathBuf,
    /// Rendered IO failure.
    pub reason: String,
}

impl EntryFailure {
    #[cfg_attr(not(feature = "zip"), allow(dead_code))]
    fn new(entry: &ResolvedFile, error: &io::Error) -> Self {
        Self {
            archive_name: entry.archive_name.clone(),
            source_path: entry.source_path.clone(),
            reason: error.to_string(),
        }
    }
}

/// Finalized archive waiting in the scratch directory.
///
/// Dropping the value deletes the scratch file; failures to delete are ignored.
#[derive(Debug)]
pub struct FinishedArchive {
    path: PathBuf,
    download_name: String,
    size: u64,
    entries: usize,
    skipped: Vec<EntryFailure>,
}

impl FinishedArchive {
    /// Scratch file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name presented to the client.
    #[must_use]
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    /// Archive size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Number of entries written.
    #[must_use]
    pub const fn entries(&self) -> usize {
        self.entries
    }

    /// Entries left out of the archive.
    #[must_use]
    pub fn skipped(&self) -> &[EntryFailure] {
        &self.skipped
    }
}

impl Drop for FinishedArchive {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch archive removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => debug!(
                path = %self.path.display(),
                error = %err,
                "failed to remove scratch archive"
            ),
        }
    }
}

/// Writes resolved selections into ZIP archives below an uploads directory.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    uploads_base: PathBuf,
}

impl ArchiveBuilder {
    /// Builder whose scratch directory lives under `uploads_base`.
    #[must_use]
    pub fn new(uploads_base: impl Into<PathBuf>) -> Self {
        Self {
            uploads_base: uploads_base.into(),
        }
    }

    /// Uploads directory hosting the scratch directory.
    #[must_use]
    pub fn uploads_base(&self) -> &Path {
        &self.uploads_base
    }

    /// Whether this build can write ZIP archives.
    #[must_use]
    pub const fn is_available() -> bool {
        cfg!(feature = "zip")
    }

    /// Fail fast when ZIP support is not compiled in.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::ZipUnavailable`] for builds without the `zip` feature.
    pub const fn ensure_available(&self) -> ExportResult<()> {
        if Self::is_available() {
            Ok(())
        } else {
            Err(ExportError::ZipUnavailable)
        }
    }

    /// Build an archive named after the current local time.
    ///
    /// # Errors
    ///
    /// See [`ArchiveBuilder::build_at`].
    pub fn build(&self, files: &ResolvedFiles) -> ExportResult<FinishedArchive> {
        self.build_at(files, &Local::now())
    }

    /// Build an archive whose download name embeds `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::ScratchUnavailable`] if the scratch directory cannot
    /// be prepared, [`ExportError::ArchiveOpenFailed`] if the container cannot be
    /// created, and [`ExportError::ArchiveCreationFailed`] if writing fails, no
    /// entry could be added, or the finalized file is missing or empty.
    pub fn build_at<Tz>(&self, files: &ResolvedFiles, now: &DateTime<Tz>) -> ExportResult<FinishedArchive>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.build_with_suffix(files, now, Uuid::new_v4())
    }

    /// Build into the scratch file identified by `suffix`.
    pub(crate) fn build_with_suffix<Tz>(
        &self,
        files: &ResolvedFiles,
        now: &DateTime<Tz>,
        suffix: Uuid,
    ) -> ExportResult<FinishedArchive>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.ensure_available()?;
        let scratch = ScratchDir::ensure(&self.uploads_base)?;
        let download_name = download_file_name(now);
        let path = scratch.archive_path(&download_name, suffix);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| ExportError::ArchiveOpenFailed {
                path: path.clone(),
                source,
            })?;

        let mut archive = FinishedArchive {
            path,
            download_name,
            size: 0,
            entries: 0,
            skipped: Vec::new(),
        };

        archive.skipped = write_entries(file, files, &archive.path)?;
        archive.entries = files.len().saturating_sub(archive.skipped.len());
        if archive.entries == 0 {
            return Err(ExportError::creation_failed(
                archive.path.clone(),
                "no entries written",
                None,
            ));
        }

        archive.size = match fs::metadata(&archive.path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => {
                return Err(ExportError::creation_failed(
                    archive.path.clone(),
                    "archive is not a regular file",
                    None,
                ));
            }
            Err(source) => {
                return Err(ExportError::creation_failed(
                    archive.path.clone(),
                    "archive missing after close",
                    Some(Box::new(source)),
                ));
            }
        };
        if archive.size == 0 {
            return Err(ExportError::creation_failed(
                archive.path.clone(),
                "archive is empty",
                None,
            ));
        }

        info!(
            path = %archive.path.display(),
            download_name = %archive.download_name,
            entries = archive.entries,
            skipped = archive.skipped.len(),
            bytes = archive.size,
            "archive finalized"
        );
        Ok(archive)
    }
}

#[cfg(feature = "zip")]
fn write_entries(file: File, files: &ResolvedFiles, path: &Path) -> ExportResult<Vec<EntryFailure>> {
    use std::io::Write;

    use tracing::warn;
    use zip::CompressionMethod;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    const ENTRY_MODE: u32 = 0o644;

    let mut writer = ZipWriter::new(file);
    let mut skipped = Vec::new();

    for entry in files.iter() {
        let mut source = match File::open(&entry.source_path) {
            Ok(source) => source,
            Err(err) => {
                warn!(
                    archive_name = %entry.archive_name,
                    path = %entry.source_path.display(),
                    error = %err,
                    "skipping unreadable archive entry"
                );
                skipped.push(EntryFailure::new(entry, &err));
                continue;
            }
        };
        let large_file = source
            .metadata()
            .is_ok_and(|metadata| metadata.len() > u64::from(u32::MAX));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(ENTRY_MODE)
            .large_file(large_file);

        writer
            .start_file(entry.archive_name.as_str(), options)
            .map_err(|source| {
                ExportError::creation_failed(path, "start archive entry", Some(Box::new(source)))
            })?;
        io::copy(&mut source, &mut writer).map_err(|source| {
            ExportError::creation_failed(path, "write archive entry", Some(Box::new(source)))
        })?;
    }

    let mut file = writer.finish().map_err(|source| {
        ExportError::creation_failed(path, "finalize archive", Some(Box::new(source)))
    })?;
    file.flush()
        .and_then(|()| file.sync_all())
        .map_err(|source| {
            ExportError::creation_failed(path, "flush archive", Some(Box::new(source)))
        })?;
    Ok(skipped)
}

#[cfg(not(feature = "zip"))]
fn write_entries(
    _file: File,
    _files: &ResolvedFiles,
    _path: &Path,
) -> ExportResult<Vec<EntryFailure>> {
    Err(ExportError::ZipUnavailable)
}

#[cfg(all(test, feature = "zip"))]
mod tests {
    use super::*;
    use crate::scratch::SCRATCH_DIR_NAME;
    use anyhow::{Result, anyhow};
    use chrono::Utc;
    use std::io::Read;
    use mediazip_test_support::MediaLibraryFixture;

    fn resolved(fixture: &MediaLibraryFixture, entries: &[(&str, &str)]) -> ResolvedFiles {
        ResolvedFiles::new(
            entries
                .iter()
                .map(|(name, relative)| ResolvedFile {
                    archive_name: (*name).to_string(),
                    source_path: fixture.uploads().join(relative),
                })
                .collect(),
        )
    }

    fn read_archive(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            entries.push((entry.name().to_string(), contents));
        }
        Ok(entries)
    }

    fn scratch_archives(fixture: &MediaLibraryFixture) -> Result<Vec<PathBuf>> {
        let mut archives = Vec::new();
        for entry in fs::read_dir(fixture.uploads().join(SCRATCH_DIR_NAME))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "zip") {
                archives.push(path);
            }
        }
        Ok(archives)
    }

    #[test]
    fn download_name_embeds_second_resolution_timestamp() -> Result<()> {
        let now = Utc
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .ok_or_else(|| anyhow!("ambiguous timestamp"))?;
        assert_eq!(
            download_file_name(&now),
            "medias-selection-20240102-030405.zip"
        );
        Ok(())
    }

    #[test]
    fn unopenable_scratch_file_maps_to_zip_creation_failed() -> Result<()> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("2024/05/photo.jpg", b"photo")?;
        let files = resolved(&fixture, &[("photo.jpg", "2024/05/photo.jpg")]);
        let now = Utc
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .ok_or_else(|| anyhow!("ambiguous timestamp"))?;
        let suffix = Uuid::new_v4();

        // A directory squatting on the scratch path makes the open fail.
        let scratch = ScratchDir::ensure(fixture.uploads())?;
        let blocked = scratch.archive_path(&download_file_name(&now), suffix);
        fs::create_dir(&blocked)?;

        let result = ArchiveBuilder::new(fixture.uploads()).build_with_suffix(&files, &now, suffix);
        let Err(err) = result else {
            return Err(anyhow!("expected the open to fail"));
        };
        assert!(matches!(&err, ExportError::ArchiveOpenFailed { path, .. } if *path == blocked));
        assert_eq!(err.code(), crate::error::ErrorCode::ZipCreationFailed);
        assert!(blocked.is_dir());
        Ok(())
    }

    #[test]
    fn archive_round_trips_names_and_contents() -> Result<()> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("2024/05/photo.jpg", b"first photo")?;
        fixture.add_file("2024/06/photo.jpg", b"second photo")?;
        fixture.add_file("docs/report.pdf", &[0_u8, 1, 2, 3, 255])?;
        let files = resolved(
            &fixture,
            &[
                ("photo.jpg", "2024/05/photo.jpg"),
                ("photo-1.jpg", "2024/06/photo.jpg"),
                ("report.pdf", "docs/report.pdf"),
            ],
        );

        let archive = ArchiveBuilder::new(fixture.uploads()).build(&files)?;
        assert_eq!(archive.entries(), 3);
        assert!(archive.skipped().is_empty());
        assert_eq!(archive.size(), fs::metadata(archive.path())?.len());
        assert!(archive.download_name().starts_with("medias-selection-"));

        let entries = read_archive(archive.path())?;
        assert_eq!(
            entries,
            vec![
                ("photo.jpg".to_string(), b"first photo".to_vec()),
                ("photo-1.jpg".to_string(), b"second photo".to_vec()),
                ("report.pdf".to_string(), vec![0, 1, 2, 3, 255]),
            ]
        );
        Ok(())
    }

    #[test]
    fn dropping_the_archive_removes_the_scratch_file() -> Result<()> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("a.txt", b"a")?;
        let files = resolved(&fixture, &[("a.txt", "a.txt")]);

        let archive = ArchiveBuilder::new(fixture.uploads()).build(&files)?;
        let path = archive.path().to_path_buf();
        assert!(path.is_file());
        drop(archive);
        assert!(!path.exists());
        assert!(scratch_archives(&fixture)?.is_empty());
        Ok(())
    }

    #[test]
    fn vanished_sources_are_reported_as_skipped() -> Result<()> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("keep.txt", b"keep")?;
        let files = resolved(&fixture, &[("keep.txt", "keep.txt"), ("lost.txt", "lost.txt")]);

        let archive = ArchiveBuilder::new(fixture.uploads()).build(&files)?;
        assert_eq!(archive.entries(), 1);
        assert_eq!(archive.skipped().len(), 1);
        assert_eq!(archive.skipped()[0].archive_name, "lost.txt");
        let names: Vec<String> = read_archive(archive.path())?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["keep.txt".to_string()]);
        Ok(())
    }

    #[test]
    fn archive_without_any_entry_fails_and_leaves_nothing_behind() -> Result<()> {
        let fixture = MediaLibraryFixture::new()?;
        let files = resolved(&fixture, &[("ghost.txt", "ghost.txt")]);

        let result = ArchiveBuilder::new(fixture.uploads()).build(&files);
        assert!(matches!(
            result,
            Err(ExportError::ArchiveCreationFailed {
                reason: "no entries written",
                ..
            })
        ));
        assert!(scratch_archives(&fixture)?.is_empty());
        Ok(())
    }

    #[test]
    fn builds_in_the_same_second_do_not_collide() -> Result<()> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("a.txt", b"a")?;
        let files = resolved(&fixture, &[("a.txt", "a.txt")]);
        let now = Local::now();

        let builder = ArchiveBuilder::new(fixture.uploads());
        let first = builder.build_at(&files, &now)?;
        let second = builder.build_at(&files, &now)?;
        assert_eq!(first.download_name(), second.download_name());
        assert_ne!(first.path(), second.path());
        assert!(first.path().is_file());
        assert!(second.path().is_file());
        Ok(())
    }
}
