//! Structured-document codec: strict/lenient field-dispatched parsing over
//! `serde_json::Value` plus ordered document emission.
//!
//! Every result entity decodes through one dispatch table parameterized by
//! [`ParseMode`], so strict and lenient behavior cannot drift apart. Strict
//! rejects unrecognized fields; lenient skips them, which is how a node reads
//! documents written by a newer peer.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Unknown-field policy for document decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Fail on any unrecognized field.
    Strict,
    /// Skip unrecognized fields (forward compatibility).
    Lenient,
}

/// Errors from decoding a result document.
///
/// All of these abort the decode of the enclosing entity immediately; no
/// partially populated entity is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("[{entity}] missing required field [{field}]")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("[{entity}] unknown field [{field}]")]
    UnknownField { entity: &'static str, field: String },

    #[error("[{entity}] unexpected token [{token}] for [{field}]")]
    UnexpectedToken {
        entity: &'static str,
        field: &'static str,
        token: &'static str,
    },

    #[error("[{entity}] field [{field}] must not be null")]
    NullField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("cannot parse timestamp [{text}]")]
    InvalidTimestamp { text: String },

    #[error("expected an object for [{entity}], got [{token}]")]
    NotAnObject {
        entity: &'static str,
        token: &'static str,
    },
}

/// Result type for document decode operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// Entities decodable from a result document.
pub trait DocDecode: Sized {
    fn from_doc(doc: &Value, mode: ParseMode) -> Result<Self>;
}

/// Entities encodable as a result document.
///
/// Key emission order is a wire-stable contract (snapshot tests depend on
/// it), which is why the crate enables `serde_json/preserve_order`.
pub trait DocEncode {
    fn to_doc(&self) -> Value;
}

/// JSON token kind name used in error messages.
pub(crate) fn token_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Dispatch-table default arm: error in strict mode, traced skip in lenient.
pub(crate) fn on_unknown_field(entity: &'static str, field: &str, mode: ParseMode) -> Result<()> {
    match mode {
        ParseMode::Strict => Err(DocError::UnknownField {
            entity,
            field: field.to_string(),
        }),
        ParseMode::Lenient => {
            tracing::debug!(entity, field, "skipping unrecognized result field");
            Ok(())
        }
    }
}

pub(crate) fn expect_str(entity: &'static str, field: &'static str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DocError::UnexpectedToken {
            entity,
            field,
            token: token_kind(value),
        })
}

pub(crate) fn expect_i64(entity: &'static str, field: &'static str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| DocError::UnexpectedToken {
        entity,
        field,
        token: token_kind(value),
    })
}

pub(crate) fn expect_f64(entity: &'static str, field: &'static str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| DocError::UnexpectedToken {
        entity,
        field,
        token: token_kind(value),
    })
}

pub(crate) fn expect_bool(entity: &'static str, field: &'static str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| DocError::UnexpectedToken {
        entity,
        field,
        token: token_kind(value),
    })
}

/// Decode an array of nested entities with the same parse mode.
///
/// A literal `null` is rejected: collection fields are never null, only
/// absent or empty.
pub(crate) fn decode_entity_array<T: DocDecode>(
    entity: &'static str,
    field: &'static str,
    value: &Value,
    mode: ParseMode,
) -> Result<Vec<T>> {
    match value {
        Value::Null => Err(DocError::NullField { entity, field }),
        Value::Array(items) => items.iter().map(|item| T::from_doc(item, mode)).collect(),
        other => Err(DocError::UnexpectedToken {
            entity,
            field,
            token: token_kind(other),
        }),
    }
}

pub(crate) fn decode_string_array(
    entity: &'static str,
    field: &'static str,
    value: &Value,
) -> Result<Vec<String>> {
    match value {
        Value::Null => Err(DocError::NullField { entity, field }),
        Value::Array(items) => items
            .iter()
            .map(|item| expect_str(entity, field, item))
            .collect(),
        other => Err(DocError::UnexpectedToken {
            entity,
            field,
            token: token_kind(other),
        }),
    }
}

/// Decode the dual-encoded timestamp field: a JSON number is epoch
/// milliseconds, a JSON string goes through [`parse_timestamp`].
pub(crate) fn decode_timestamp(
    entity: &'static str,
    field: &'static str,
    value: &Value,
) -> Result<DateTime<Utc>> {
    match value {
        Value::Number(_) => {
            let millis = expect_i64(entity, field, value)?;
            DateTime::from_timestamp_millis(millis).ok_or_else(|| DocError::InvalidTimestamp {
                text: millis.to_string(),
            })
        }
        Value::String(text) => parse_timestamp(text),
        other => Err(DocError::UnexpectedToken {
            entity,
            field,
            token: token_kind(other),
        }),
    }
}

/// Shared date-string-to-epoch routine: RFC 3339, or a decimal string of
/// epoch milliseconds.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        let millis = parsed.timestamp_millis();
        if let Some(truncated) = DateTime::from_timestamp_millis(millis) {
            return Ok(truncated);
        }
    }
    if let Ok(millis) = text.parse::<i64>() {
        if let Some(parsed) = DateTime::from_timestamp_millis(millis) {
            return Ok(parsed);
        }
    }
    Err(DocError::InvalidTimestamp {
        text: text.to_string(),
    })
}
