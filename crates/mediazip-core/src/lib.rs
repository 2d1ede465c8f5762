#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Bulk media archive export pipeline.
//!
//! Layout: `selection.rs` (raw identifier validation), `resolver.rs` (attachment
//! lookup and archive naming), `scratch.rs` (protected temp directory), `archive.rs`
//! (ZIP assembly), `exporter.rs` (the end-to-end bulk action), `registry.rs`
//! (injected host capabilities and the JSON catalog adapter).

pub mod archive;
pub mod error;
pub mod exporter;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod scratch;
pub mod selection;

pub use archive::{ArchiveBuilder, EntryFailure, FinishedArchive, download_file_name};
pub use error::{CatalogError, ErrorCode, ExportError, ExportResult};
pub use exporter::{ActionOutcome, BulkExporter};
pub use model::{
    BULK_ACTION_KEY, BulkActionRequest, Capability, MediaId, MediaKind, RawId, ResolvedFile,
    ResolvedFiles,
};
pub use registry::{CapabilityCheck, CatalogRegistry, MediaRegistry};
pub use resolver::{resolve_files, unique_archive_name};
pub use scratch::{SCRATCH_DIR_NAME, ScratchDir};
pub use selection::validate_selection;
