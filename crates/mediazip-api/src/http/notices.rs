//! Admin media page and the error notice shown after a failed bulk export.

use axum::{extract::Query, response::Html};
use mediazip_core::ErrorCode;
use serde::Deserialize;

use crate::i18n::{LocaleCode, current_locale, localize};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NoticeQuery {
    #[serde(default)]
    bmzd_error: Option<String>,
}

pub(crate) async fn media_page(Query(query): Query<NoticeQuery>) -> Html<String> {
    let locale = current_locale();
    let notice = query
        .bmzd_error
        .as_deref()
        .and_then(ErrorCode::from_query)
        .map(|code| render_notice(code, locale))
        .unwrap_or_default();
    let title = escape_html(&localize(locale, "page.media_library"));
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<div class=\"wrap\">\n<h1>{title}</h1>\n{notice}</div>\n</body>\n</html>\n",
        lang = locale.as_str(),
    ))
}

/// Dismissible error notice for `code` in `locale`.
pub(crate) fn render_notice(code: ErrorCode, locale: LocaleCode) -> String {
    let message = localize(locale, notice_key(code));
    format!(
        "<div class=\"notice notice-error is-dismissible\"><p>{}</p></div>\n",
        escape_html(&message)
    )
}

const fn notice_key(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::Unauthorized => "notice.unauthorized",
        ErrorCode::NoSelection => "notice.no_selection",
        ErrorCode::InvalidIds => "notice.invalid_ids",
        ErrorCode::ZipNotAvailable => "notice.zip_not_available",
        ErrorCode::NoValidFiles => "notice.no_valid_files",
        ErrorCode::ZipCreationFailed => "notice.zip_creation_failed",
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}
