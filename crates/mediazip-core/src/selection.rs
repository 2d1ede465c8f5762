//! Normalisation of raw caller-supplied media identifiers.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{ExportError, ExportResult};
use crate::model::{MediaId, RawId};

/// Filter raw tokens down to positive identifiers.
///
/// Strings contribute their leading `[+-]digits` prefix after trimming (`"12abc"`
/// is 12), JSON numbers count when integral. Tokens with no integer prefix, or
/// that parse to zero or a negative value, are dropped. Duplicates are removed
/// keeping the first occurrence.
///
/// # Errors
///
/// Returns [`ExportError::EmptySelection`] when `raw` is empty and
/// [`ExportError::InvalidIdentifiers`] when no token survives.
pub fn validate_selection(raw: &[RawId]) -> ExportResult<Vec<MediaId>> {
    if raw.is_empty() {
        return Err(ExportError::EmptySelection);
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut ids = Vec::with_capacity(raw.len());
    for token in raw {
        if let Some(id) = parse_token(token)
            && seen.insert(id)
        {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(ExportError::InvalidIdentifiers {
            rejected: raw.len(),
        });
    }
    Ok(ids)
}

fn parse_token(token: &RawId) -> Option<MediaId> {
    match token {
        RawId::Integer(value) => u64::try_from(*value).ok().and_then(MediaId::new),
        RawId::Text(text) => leading_integer(text).and_then(MediaId::new),
        RawId::Other(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(integral_float))
            .and_then(MediaId::new),
        RawId::Other(_) => None,
    }
}

/// Leading `[+-]digits` prefix of `text` after trimming; negative values and
/// prefixes overflowing `u64` yield `None`.
fn leading_integer(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if negative || digits == 0 {
        return None;
    }
    unsigned[..digits].parse().ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral_float(value: f64) -> Option<u64> {
    // Largest float with every integer below it exactly representable.
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;
    (value.is_finite() && value.fract() == 0.0 && value >= 1.0 && value <= EXACT_LIMIT)
        .then_some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u64]) -> Vec<MediaId> {
        values.iter().filter_map(|value| MediaId::new(*value)).collect()
    }

    #[test]
    fn empty_input_is_rejected_before_parsing() {
        assert!(matches!(
            validate_selection(&[]),
            Err(ExportError::EmptySelection)
        ));
    }

    #[test]
    fn non_numeric_and_non_positive_tokens_are_invalid() {
        let raw = vec![RawId::from("abc"), RawId::from("-3"), RawId::from("0")];
        assert!(matches!(
            validate_selection(&raw),
            Err(ExportError::InvalidIdentifiers { rejected: 3 })
        ));

        let raw = vec![
            RawId::Integer(-1),
            RawId::Integer(0),
            RawId::Other(Value::Bool(true)),
            RawId::Other(serde_json::json!(2.5)),
            RawId::from("-12abc"),
            RawId::from("x12"),
        ];
        assert!(matches!(
            validate_selection(&raw),
            Err(ExportError::InvalidIdentifiers { .. })
        ));
    }

    #[test]
    fn survivors_keep_first_seen_order_without_duplicates() -> ExportResult<()> {
        let raw = vec![
            RawId::from(" 9 "),
            RawId::Integer(5),
            RawId::from("nope"),
            RawId::from("5"),
            RawId::from("+12"),
            RawId::Integer(9),
        ];
        assert_eq!(validate_selection(&raw)?, ids(&[9, 5, 12]));
        Ok(())
    }

    #[test]
    fn tokens_contribute_their_leading_integer() -> ExportResult<()> {
        let cases: Vec<(RawId, Option<u64>)> = vec![
            (RawId::from("12abc"), Some(12)),
            (RawId::from("  7 "), Some(7)),
            (RawId::from("+3px"), Some(3)),
            (RawId::from("4.5"), Some(4)),
            (RawId::Other(serde_json::json!(5.0)), Some(5)),
            (RawId::Other(serde_json::json!(u64::MAX)), Some(u64::MAX)),
            (RawId::Other(serde_json::json!(5.5)), None),
            (RawId::Other(serde_json::json!(-2.0)), None),
            (RawId::from("-8"), None),
            (RawId::from("0042"), Some(42)),
            (RawId::from("000"), None),
            (RawId::from("99999999999999999999999"), None),
            (RawId::from(""), None),
        ];
        for (token, expected) in cases {
            assert_eq!(
                parse_token(&token).map(MediaId::get),
                expected,
                "token {token:?}"
            );
        }

        let raw = vec![
            RawId::from("12abc"),
            RawId::Other(serde_json::json!(5.0)),
            RawId::from("7 "),
        ];
        assert_eq!(validate_selection(&raw)?, ids(&[12, 5, 7]));
        Ok(())
    }
}
