//! Host capabilities injected into the pipeline, plus the JSON catalog adapter.
//!
//! # Design
//! - The pipeline never reaches into global host state; callers hand it a
//!   [`MediaRegistry`] and a [`CapabilityCheck`] per request.
//! - [`CatalogRegistry`] is the production registry: an immutable snapshot of a
//!   JSON catalog, with relative file paths anchored at the uploads directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::CatalogError;
use crate::model::{Capability, MediaId, MediaKind};

/// Read access to the host content registry.
pub trait MediaRegistry: Send + Sync {
    /// Kind of the entity registered under `id`, if any.
    fn kind(&self, id: MediaId) -> Option<MediaKind>;

    /// Absolute path of the file attached to `id`, if any.
    fn attached_file(&self, id: MediaId) -> Option<PathBuf>;
}

/// Capability lookup for the current caller.
pub trait CapabilityCheck {
    /// Whether the caller holds `capability`.
    fn has_capability(&self, capability: Capability) -> bool;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    media: Vec<CatalogRecord>,
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    id: u64,
    kind: MediaKind,
    #[serde(default)]
    file: Option<String>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    kind: MediaKind,
    file: Option<PathBuf>,
}

/// Media registry backed by a JSON catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    entries: HashMap<MediaId, CatalogEntry>,
}

impl CatalogRegistry {
    /// Load the catalog at `path`, resolving relative file paths against `uploads_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid catalog JSON, or
    /// contains an entry with a zero or duplicate identifier.
    pub fn load(path: impl AsRef<Path>, uploads_base: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CatalogFile = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_records(file.media, uploads_base.as_ref())?;
        info!(
            catalog = %path.display(),
            entries = registry.len(),
            "media catalog loaded"
        );
        Ok(registry)
    }

    fn from_records(records: Vec<CatalogRecord>, uploads_base: &Path) -> Result<Self, CatalogError> {
        let mut entries = HashMap::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let id = MediaId::new(record.id).ok_or(CatalogError::InvalidEntry {
                index,
                reason: "id must be positive",
            })?;
            let file = record
                .file
                .map(|file| file.trim().to_string())
                .filter(|file| !file.is_empty())
                .map(|file| uploads_base.join(file));
            let entry = CatalogEntry {
                kind: record.kind,
                file,
            };
            if entries.insert(id, entry).is_some() {
                return Err(CatalogError::InvalidEntry {
                    index,
                    reason: "duplicate id",
                });
            }
        }
        Ok(Self { entries })
    }

    /// Number of catalog entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MediaRegistry for CatalogRegistry {
    fn kind(&self, id: MediaId) -> Option<MediaKind> {
        self.entries.get(&id).map(|entry| entry.kind)
    }

    fn attached_file(&self, id: MediaId) -> Option<PathBuf> {
        self.entries.get(&id).and_then(|entry| entry.file.clone())
    }
}
