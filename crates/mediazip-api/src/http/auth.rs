//! Caller resolution from the API key header.
//!
//! Unknown or missing keys are not rejected here: they resolve to a caller with
//! no capabilities so the bulk pipeline can report `unauthorized` itself.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use mediazip_core::{Capability, CapabilityCheck};
use tracing::debug;

use crate::http::constants::HEADER_API_KEY;
use crate::state::ApiState;

/// Identity and capabilities of the caller behind one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    capabilities: HashSet<Capability>,
}

impl Caller {
    /// Caller holding no capabilities.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Caller holding the supplied capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
        }
    }
}

impl CapabilityCheck for Caller {
    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Table of API keys granted the upload capability.
#[derive(Debug, Clone, Default)]
pub struct CallerDirectory {
    uploader_keys: HashSet<String>,
}

impl CallerDirectory {
    /// Build the directory from the configured uploader keys.
    #[must_use]
    pub fn new(uploader_keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            uploader_keys: uploader_keys.into_iter().collect(),
        }
    }

    /// Resolve the caller presenting `api_key`.
    #[must_use]
    pub fn resolve(&self, api_key: Option<&str>) -> Caller {
        match api_key {
            Some(key) if self.uploader_keys.contains(key) => {
                Caller::with_capabilities([Capability::UploadFiles])
            }
            _ => Caller::anonymous(),
        }
    }
}

pub(crate) async fn resolve_caller(
    State(state): State<Arc<ApiState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let caller = state.callers.resolve(extract_api_key(req.headers()).as_deref());
    debug!(
        upload_files = caller.has_capability(Capability::UploadFiles),
        "resolved caller"
    );
    req.extensions_mut().insert(caller);
    next.run(req).await
}

pub(crate) fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HEADER_API_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn directory_grants_upload_to_known_keys_only() {
        let directory = CallerDirectory::new(["secret".to_string()]);
        assert!(
            directory
                .resolve(Some("secret"))
                .has_capability(Capability::UploadFiles)
        );
        assert!(
            !directory
                .resolve(Some("other"))
                .has_capability(Capability::UploadFiles)
        );
        assert_eq!(directory.resolve(None), Caller::anonymous());
    }

    #[test]
    fn api_key_header_is_trimmed() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);
        headers.insert(HEADER_API_KEY, HeaderValue::from_static("  secret "));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("secret"));
        headers.insert(HEADER_API_KEY, HeaderValue::from_static("   "));
        assert_eq!(extract_api_key(&headers), None);
    }
}
