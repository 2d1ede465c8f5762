//! Resolution of validated identifiers to files on disk.
//!
//! # Design
//! - A bad identifier is skipped, never fatal for the batch.
//! - Archive names are assigned in encounter order; the first file keeps its
//!   base name and later clashes try `<stem>-<n><ext>` in order from `n = 1`.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::model::{MediaId, MediaKind, ResolvedFile, ResolvedFiles};
use crate::registry::MediaRegistry;

/// Map identifiers to existing attachment files with unique archive names.
///
/// # Errors
///
/// Returns [`ExportError::NoValidFiles`] when no identifier resolves.
pub fn resolve_files(registry: &dyn MediaRegistry, ids: &[MediaId]) -> ExportResult<ResolvedFiles> {
    let mut used = HashSet::with_capacity(ids.len());
    let mut entries = Vec::with_capacity(ids.len());

    for &id in ids {
        let kind = registry.kind(id);
        if kind != Some(MediaKind::Attachment) {
            debug!(media_id = %id, kind = ?kind, "skipping media that is not an attachment");
            continue;
        }

        let Some(source_path) = registry
            .attached_file(id)
            .filter(|path| !path.as_os_str().is_empty())
        else {
            debug!(media_id = %id, "skipping attachment without a file path");
            continue;
        };
        if !source_path.is_file() {
            debug!(
                media_id = %id,
                path = %source_path.display(),
                "skipping attachment whose file is missing"
            );
            continue;
        }
        let Some(base_name) = base_name(&source_path) else {
            debug!(media_id = %id, "skipping attachment without a file name");
            continue;
        };

        let archive_name = unique_archive_name(&base_name, &used);
        used.insert(archive_name.clone());
        entries.push(ResolvedFile {
            archive_name,
            source_path,
        });
    }

    if entries.is_empty() {
        return Err(ExportError::NoValidFiles {
            requested: ids.len(),
        });
    }
    Ok(ResolvedFiles::new(entries))
}

/// Pick an archive name for `base` that does not clash with `used`.
#[must_use]
pub fn unique_archive_name(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }

    let (stem, extension) = split_extension(base);
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{stem}-{counter}{extension}");
        if !used.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn base_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

// Dotfiles keep their leading dot in the stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}
