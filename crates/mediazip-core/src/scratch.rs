//! Protected scratch directory for archives awaiting download.
//!
//! # Design
//! - Lives under the uploads directory and is created on first use.
//! - Access-denial markers are written only when absent; existing markers are
//!   never rewritten, so repeated runs leave the directory unchanged.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::{ExportError, ExportResult};

/// Directory name created below the uploads base.
pub const SCRATCH_DIR_NAME: &str = "bmzd-tmp";

const HTACCESS_NAME: &str = ".htaccess";
const HTACCESS_BODY: &str = "deny from all";
const INDEX_NAME: &str = "index.php";
const INDEX_BODY: &str = "<?php // Silence is golden";
#[cfg(unix)]
const SCRATCH_DIR_MODE: u32 = 0o700;

/// Scratch directory whose protection markers are known to exist.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create the scratch directory and its markers under `uploads_base` if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::ScratchUnavailable`] if the directory or a marker
    /// cannot be created.
    pub fn ensure(uploads_base: &Path) -> ExportResult<Self> {
        let path = uploads_base.join(SCRATCH_DIR_NAME);
        if !path.is_dir() {
            fs::create_dir_all(&path)
                .map_err(|source| ExportError::scratch("scratch.create_dir", &path, source))?;
            restrict_permissions(&path)?;
            info!(path = %path.display(), "scratch directory created");
        }
        write_marker(&path.join(HTACCESS_NAME), HTACCESS_BODY)?;
        write_marker(&path.join(INDEX_NAME), INDEX_BODY)?;
        Ok(Self { path })
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk path for an archive whose download name is `download_name`.
    ///
    /// The random `suffix` keeps archives started within the same second apart.
    #[must_use]
    pub fn archive_path(&self, download_name: &str, suffix: Uuid) -> PathBuf {
        let stem = download_name.strip_suffix(".zip").unwrap_or(download_name);
        self.path.join(format!("{stem}-{}.zip", suffix.simple()))
    }
}

fn write_marker(path: &Path, body: &str) -> ExportResult<()> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => file
            .write_all(body.as_bytes())
            .map_err(|source| ExportError::scratch("scratch.write_marker", path, source)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(ExportError::scratch("scratch.create_marker", path, source)),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> ExportResult<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(SCRATCH_DIR_MODE))
        .map_err(|source| ExportError::scratch("scratch.set_permissions", path, source))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> ExportResult<()> {
    Ok(())
}
