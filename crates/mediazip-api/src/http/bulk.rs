//! Bulk-action endpoint: runs the export pipeline and streams the archive.
//!
//! # Design
//! - The pipeline is blocking IO, so it runs on the blocking pool.
//! - Every pipeline failure becomes a `303` back to the media list with the
//!   error code attached; nothing here answers with a 5xx for those.
//! - The response body owns the [`FinishedArchive`]; the scratch file goes away
//!   when streaming finishes or the client disconnects.

use std::io;
use std::sync::Arc;

use async_stream::try_stream;
use axum::{
    Extension, Json,
    body::{Body, Bytes},
    extract::{State, rejection::JsonRejection},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA},
    },
    response::{IntoResponse, Redirect, Response},
};
use mediazip_core::{
    ActionOutcome, BULK_ACTION_KEY, Capability, CapabilityCheck, ErrorCode, FinishedArchive,
};
use mediazip_telemetry::{ExportOutcome, current_request_context};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, warn};
use url::Url;

use crate::http::auth::Caller;
use crate::http::constants::{
    ARCHIVE_CONTENT_TYPE, DEFAULT_REDIRECT, ERROR_QUERY_PARAM, HEADER_SKIPPED_ENTRIES,
    HEADER_TRANSFER_ENCODING_LEGACY, NO_CACHE, STREAM_CHUNK_SIZE,
};
use crate::http::errors::ApiError;
use crate::i18n::{current_locale, localize};
use crate::models::{BulkActionBody, BulkActionEntry};
use crate::state::ApiState;

const REDIRECT_BASE: &str = "http://mediazip.invalid/";

/// Response produced by the bulk-action endpoint.
#[derive(Debug)]
pub(crate) enum BulkActionOutcome {
    /// Stream the finished archive to the client.
    Download(FinishedArchive),
    /// Send the client back to the media list.
    Redirect(String),
}

impl IntoResponse for BulkActionOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Download(archive) => archive_response(archive),
            Self::Redirect(location) => Redirect::to(&location).into_response(),
        }
    }
}

pub(crate) async fn bulk_action(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<BulkActionBody>, JsonRejection>,
) -> Result<BulkActionOutcome, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        debug!(error = %rejection, "rejected bulk action payload");
        ApiError::bad_request(rejection.body_text())
    })?;
    let (request, redirect_to) = body.into_parts();
    let redirect = redirect_target(redirect_to.as_deref());

    let exporter = state.exporter.clone();
    let joined =
        tokio::task::spawn_blocking(move || exporter.handle(&caller, &request)).await;

    let outcome = match joined {
        Ok(Ok(ActionOutcome::PassThrough)) => {
            state.telemetry.inc_bulk_export(ExportOutcome::PassThrough);
            BulkActionOutcome::Redirect(redirect)
        }
        Ok(Ok(ActionOutcome::Download(archive))) => {
            for failure in archive.skipped() {
                warn!(
                    entry = %failure.archive_name,
                    source_path = %failure.source_path.display(),
                    reason = %failure.reason,
                    "archive entry skipped"
                );
            }
            state.telemetry.inc_bulk_export(ExportOutcome::Download);
            state
                .telemetry
                .record_archive(archive.entries(), archive.size());
            BulkActionOutcome::Download(archive)
        }
        Ok(Err(err)) => {
            let code = err.code();
            let context = current_request_context();
            warn!(
                error = %err,
                code = code.as_str(),
                request_id = context.as_ref().map_or("", |context| context.request_id()),
                route = context.as_ref().map_or("", |context| context.route()),
                "bulk export failed"
            );
            state
                .telemetry
                .inc_bulk_export(ExportOutcome::Failed(code.as_str()));
            BulkActionOutcome::Redirect(with_error_code(&redirect, code))
        }
        Err(err) => {
            error!(error = %err, "bulk export task aborted");
            let code = ErrorCode::ZipCreationFailed;
            state
                .telemetry
                .inc_bulk_export(ExportOutcome::Failed(code.as_str()));
            BulkActionOutcome::Redirect(with_error_code(&redirect, code))
        }
    };
    Ok(outcome)
}

pub(crate) async fn list_bulk_actions(
    Extension(caller): Extension<Caller>,
) -> Json<Vec<BulkActionEntry>> {
    let mut actions = Vec::new();
    if caller.has_capability(Capability::UploadFiles) {
        actions.push(BulkActionEntry {
            key: BULK_ACTION_KEY.to_string(),
            label: localize(current_locale(), "action.download_files_zip"),
        });
    }
    Json(actions)
}

/// Accept only same-origin absolute paths; anything else falls back to the
/// media list. The returned target is normalized (dot segments resolved,
/// fragment dropped), so what was checked is what gets sent.
pub(crate) fn redirect_target(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|target| {
            target.starts_with('/')
                && !target.contains('\\')
                && !target.chars().any(char::is_control)
        })
        .and_then(|target| same_origin_url(target).map(|url| path_and_query(&url)))
        .unwrap_or_else(|| DEFAULT_REDIRECT.to_string())
}

/// Attach `bmzd_error=<code>` to `target`, replacing any previous value and
/// keeping the other query parameters in order.
pub(crate) fn with_error_code(target: &str, code: ErrorCode) -> String {
    let Some(mut url) = same_origin_url(target) else {
        return format!("{DEFAULT_REDIRECT}?{ERROR_QUERY_PARAM}={}", code.as_str());
    };
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != ERROR_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(ERROR_QUERY_PARAM, code.as_str());
    path_and_query(&url)
}

/// Resolve `target` against the local origin; `None` when the normalized
/// location would leave it, including protocol-relative `//host` paths.
fn same_origin_url(target: &str) -> Option<Url> {
    let base = Url::parse(REDIRECT_BASE).ok()?;
    let mut url = base.join(target).ok()?;
    url.set_fragment(None);
    let local = url.origin() == base.origin()
        && url.path().starts_with('/')
        && !url.path().starts_with("//");
    local.then_some(url)
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

fn archive_response(archive: FinishedArchive) -> Response {
    let size = archive.size();
    let skipped = archive.skipped().len();
    let disposition = format!("attachment; filename=\"{}\"", archive.download_name());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
        .header(CONTENT_DISPOSITION, disposition)
        .header(CONTENT_LENGTH, size)
        .header(HEADER_TRANSFER_ENCODING_LEGACY, "binary")
        .header(CACHE_CONTROL, NO_CACHE)
        .header(PRAGMA, "no-cache")
        .header(EXPIRES, "0");
    if skipped > 0 {
        builder = builder.header(HEADER_SKIPPED_ENTRIES, skipped);
    }

    builder
        .body(Body::from_stream(archive_stream(archive)))
        .unwrap_or_else(|err| {
            error!(error = %err, "failed to build archive response");
            ApiError::internal("failed to build archive response").into_response()
        })
}

fn archive_stream(
    archive: FinishedArchive,
) -> impl futures_core::Stream<Item = io::Result<Bytes>> + Send {
    try_stream! {
        let mut file = tokio::fs::File::open(archive.path()).await?;
        let mut buffer = vec![0_u8; STREAM_CHUNK_SIZE];
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buffer[..read]);
        }
        drop(file);
        debug!(archive = %archive.download_name(), "archive streamed");
        drop(archive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::http::header::LOCATION;
    use mediazip_core::{ArchiveBuilder, BulkExporter, CatalogRegistry, RawId, SCRATCH_DIR_NAME};
    use mediazip_telemetry::Metrics;
    use mediazip_test_support::MediaLibraryFixture;

    use crate::http::auth::CallerDirectory;

    fn state_for(fixture: &MediaLibraryFixture) -> Result<Arc<ApiState>> {
        let registry = CatalogRegistry::load(fixture.catalog_path(), fixture.uploads())?;
        let exporter = BulkExporter::new(
            Arc::new(registry),
            ArchiveBuilder::new(fixture.uploads()),
        );
        Ok(Arc::new(ApiState::new(
            exporter,
            CallerDirectory::new(["uploader".to_string()]),
            Metrics::new()?,
        )))
    }

    fn library() -> Result<MediaLibraryFixture> {
        let fixture = MediaLibraryFixture::new()?;
        fixture.add_file("2024/05/photo.jpg", b"jpeg bytes")?;
        fixture.write_catalog(&[(5, "attachment", Some("2024/05/photo.jpg"))])?;
        Ok(fixture)
    }

    fn uploader() -> Caller {
        Caller::with_capabilities([Capability::UploadFiles])
    }

    fn body(action: &str, media: Vec<RawId>, redirect_to: Option<&str>) -> BulkActionBody {
        BulkActionBody {
            action: action.to_string(),
            media,
            redirect_to: redirect_to.map(ToString::to_string),
        }
    }

    fn location(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    #[test]
    fn redirect_target_rejects_foreign_locations() {
        assert_eq!(redirect_target(None), DEFAULT_REDIRECT);
        assert_eq!(redirect_target(Some("https://evil.test/")), DEFAULT_REDIRECT);
        assert_eq!(redirect_target(Some("//evil.test/")), DEFAULT_REDIRECT);
        assert_eq!(redirect_target(Some("/\\evil.test")), DEFAULT_REDIRECT);
        assert_eq!(
            redirect_target(Some("/a/../..//evil.example/x")),
            DEFAULT_REDIRECT
        );
        assert_eq!(
            redirect_target(Some("/admin/./../..//evil.example")),
            DEFAULT_REDIRECT
        );
        assert_eq!(
            redirect_target(Some("/admin/media?paged=2")),
            "/admin/media?paged=2"
        );
        assert_eq!(
            redirect_target(Some("/admin/tools/../media#top")),
            "/admin/media"
        );
    }

    #[test]
    fn error_redirects_never_leave_the_origin() {
        for target in ["/a/../..//evil.example/x", "//evil.example", "/..//evil.example/"] {
            let location = with_error_code(target, ErrorCode::NoSelection);
            assert!(!location.starts_with("//"), "{target} -> {location}");
            assert_eq!(location, "/admin/media?bmzd_error=no_selection");

            let location = with_error_code(&redirect_target(Some(target)), ErrorCode::NoSelection);
            assert_eq!(location, "/admin/media?bmzd_error=no_selection");
        }
    }

    #[test]
    fn error_code_replaces_previous_value() {
        assert_eq!(
            with_error_code("/admin/media?paged=2&bmzd_error=no_selection", ErrorCode::InvalidIds),
            "/admin/media?paged=2&bmzd_error=invalid_ids"
        );
        assert_eq!(
            with_error_code("/admin/media", ErrorCode::Unauthorized),
            "/admin/media?bmzd_error=unauthorized"
        );
    }

    #[tokio::test]
    async fn empty_selection_redirects_with_code() -> Result<()> {
        let fixture = library()?;
        let state = state_for(&fixture)?;
        let outcome = bulk_action(
            State(state),
            Extension(uploader()),
            Ok(Json(body(BULK_ACTION_KEY, vec![], Some("/admin/media?paged=2")))),
        )
        .await
        .map_err(|err| anyhow::anyhow!("unexpected api error: {err:?}"))?;
        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            Some("/admin/media?paged=2&bmzd_error=no_selection")
        );
        assert!(!fixture.uploads().join(SCRATCH_DIR_NAME).exists());
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_caller_is_unauthorized() -> Result<()> {
        let fixture = library()?;
        let outcome = bulk_action(
            State(state_for(&fixture)?),
            Extension(Caller::anonymous()),
            Ok(Json(body(BULK_ACTION_KEY, vec![RawId::Integer(5)], None))),
        )
        .await
        .map_err(|err| anyhow::anyhow!("unexpected api error: {err:?}"))?;
        let response = outcome.into_response();
        assert_eq!(
            location(&response),
            Some("/admin/media?bmzd_error=unauthorized")
        );
        Ok(())
    }

    #[tokio::test]
    async fn foreign_action_redirects_unchanged() -> Result<()> {
        let fixture = library()?;
        let outcome = bulk_action(
            State(state_for(&fixture)?),
            Extension(uploader()),
            Ok(Json(body("trash", vec![RawId::Integer(5)], Some("/admin/media?mode=list")))),
        )
        .await
        .map_err(|err| anyhow::anyhow!("unexpected api error: {err:?}"))?;
        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/admin/media?mode=list"));
        Ok(())
    }

    #[cfg(feature = "zip")]
    #[tokio::test]
    async fn download_streams_archive_and_removes_scratch_file() -> Result<()> {
        let fixture = library()?;
        let state = state_for(&fixture)?;
        let outcome = bulk_action(
            State(Arc::clone(&state)),
            Extension(uploader()),
            Ok(Json(body(
                BULK_ACTION_KEY,
                vec![RawId::Integer(5), RawId::from("5"), RawId::Integer(9999)],
                None,
            ))),
        )
        .await
        .map_err(|err| anyhow::anyhow!("unexpected api error: {err:?}"))?;
        let BulkActionOutcome::Download(archive) = outcome else {
            anyhow::bail!("expected a download");
        };
        let scratch_file = archive.path().to_path_buf();
        let size = archive.size();
        assert!(scratch_file.is_file());

        let response = BulkActionOutcome::Download(archive).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], ARCHIVE_CONTENT_TYPE);
        assert_eq!(headers[CONTENT_LENGTH], size.to_string().as_str());
        assert_eq!(headers[CACHE_CONTROL], NO_CACHE);
        assert_eq!(headers[PRAGMA], "no-cache");
        assert_eq!(headers[EXPIRES], "0");
        assert_eq!(headers[HEADER_TRANSFER_ENCODING_LEGACY], "binary");
        assert!(headers.get(HEADER_SKIPPED_ENTRIES).is_none());
        let disposition = headers[CONTENT_DISPOSITION].to_str()?;
        assert!(disposition.starts_with("attachment; filename=\"medias-selection-"));
        assert!(disposition.ends_with(".zip\""));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(u64::try_from(bytes.len())?, size);
        assert!(!scratch_file.exists());
        assert_eq!(state.telemetry.snapshot().archive_entries_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn bulk_actions_listing_depends_on_capability() {
        let Json(granted) = list_bulk_actions(Extension(uploader())).await;
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].key, BULK_ACTION_KEY);
        assert_eq!(granted[0].label, "Download files (ZIP)");

        let Json(denied) = list_bulk_actions(Extension(Caller::anonymous())).await;
        assert!(denied.is_empty());
    }
}
