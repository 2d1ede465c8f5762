//! # Design
//!
//! - Localize admin-facing text based on `Accept-Language`.
//! - Bundles map stable message keys to text; unknown locales fall back to English,
//!   missing keys fall back to the English bundle and then to the key itself.
//! - Translation parse failures degrade to empty bundles and log once at load time.

use std::collections::HashMap;
use std::sync::OnceLock;

use axum::{
    body::Body,
    http::{HeaderMap, Request, header::ACCEPT_LANGUAGE},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LocaleCode {
    En,
    Fr,
}

impl LocaleCode {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split('-').next().unwrap_or(tag).trim();
        if primary.eq_ignore_ascii_case("en") {
            Some(Self::En)
        } else if primary.eq_ignore_ascii_case("fr") {
            Some(Self::Fr)
        } else {
            None
        }
    }
}

pub(crate) const DEFAULT_LOCALE: LocaleCode = LocaleCode::En;

tokio::task_local! {
    static REQUEST_LOCALE: LocaleCode;
}

#[derive(Debug, Default)]
struct TranslationBundle {
    messages: HashMap<String, String>,
}

impl TranslationBundle {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct TranslationFile {
    #[serde(default)]
    messages: HashMap<String, String>,
}

pub(crate) fn localize(locale: LocaleCode, key: &str) -> String {
    translations_for(locale)
        .lookup(key)
        .or_else(|| translations_for(DEFAULT_LOCALE).lookup(key))
        .map_or_else(|| key.to_string(), ToString::to_string)
}

pub(crate) fn current_locale() -> LocaleCode {
    REQUEST_LOCALE
        .try_with(|locale| *locale)
        .map_or(DEFAULT_LOCALE, |locale| locale)
}

pub(crate) async fn with_locale(req: Request<Body>, next: Next) -> Response {
    let locale = parse_locale(req.headers());
    REQUEST_LOCALE
        .scope(locale, async move { next.run(req).await })
        .await
}

fn parse_locale(headers: &HeaderMap) -> LocaleCode {
    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_accept_language)
        .unwrap_or(DEFAULT_LOCALE)
}

fn parse_accept_language(value: &str) -> Option<LocaleCode> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.split(';').next())
        .find_map(|tag| LocaleCode::from_tag(tag.trim()))
}

fn translations_for(locale: LocaleCode) -> &'static TranslationBundle {
    static EN_TRANSLATIONS: OnceLock<TranslationBundle> = OnceLock::new();
    static FR_TRANSLATIONS: OnceLock<TranslationBundle> = OnceLock::new();
    match locale {
        LocaleCode::En => EN_TRANSLATIONS.get_or_init(|| load_translations(LocaleCode::En)),
        LocaleCode::Fr => FR_TRANSLATIONS.get_or_init(|| load_translations(LocaleCode::Fr)),
    }
}

fn load_translations(locale: LocaleCode) -> TranslationBundle {
    let raw = match locale {
        LocaleCode::En => include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/i18n/en.json")),
        LocaleCode::Fr => include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/i18n/fr.json")),
    };
    match serde_json::from_str::<TranslationFile>(raw) {
        Ok(file) => TranslationBundle {
            messages: file.messages,
        },
        Err(err) => {
            error!(
                error = %err,
                locale = locale.as_str(),
                "failed to parse API i18n bundle"
            );
            TranslationBundle::default()
        }
    }
}
