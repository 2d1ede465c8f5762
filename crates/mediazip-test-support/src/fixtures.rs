//! Temporary media library fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tempfile::TempDir;

const UPLOADS_DIR: &str = "uploads";
const CATALOG_FILE: &str = "catalog.json";

/// Throwaway uploads tree plus a media catalog describing it.
///
/// Everything lives under one temporary directory removed on drop.
pub struct MediaLibraryFixture {
    root: TempDir,
    uploads: PathBuf,
}

impl MediaLibraryFixture {
    /// Create an empty uploads directory and no catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("mediazip-library-")
            .tempdir()
            .context("failed to create fixture root")?;
        let uploads = root.path().join(UPLOADS_DIR);
        fs::create_dir_all(&uploads).context("failed to create fixture uploads dir")?;
        Ok(Self { root, uploads })
    }

    /// Fixture root (parent of the uploads directory and the catalog).
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Uploads directory.
    #[must_use]
    pub fn uploads(&self) -> &Path {
        &self.uploads
    }

    /// Catalog file location (may not exist yet).
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.root.path().join(CATALOG_FILE)
    }

    /// Write `contents` to `relative` below the uploads directory, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn add_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.uploads.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(path)
    }

    /// Write the catalog from `(id, kind, file)` records, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be serialised or written.
    pub fn write_catalog(&self, records: &[(u64, &str, Option<&str>)]) -> Result<()> {
        let media: Vec<Value> = records
            .iter()
            .map(|(id, kind, file)| match file {
                Some(file) => json!({ "id": id, "kind": kind, "file": file }),
                None => json!({ "id": id, "kind": kind }),
            })
            .collect();
        let body = serde_json::to_string_pretty(&json!({ "media": media }))
            .context("failed to serialise catalog")?;
        fs::write(self.catalog_path(), body).context("failed to write catalog")?;
        Ok(())
    }
}
