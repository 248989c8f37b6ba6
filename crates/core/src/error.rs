//! Domain error model.

use serde_json::Value as Json;
use thiserror::Error;

/// Result type used across the crate.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a candidate was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The predicate returned `false`.
    Rejected,
    /// The candidate could not be decoded into the value type at all.
    WrongType,
    /// A serialized payload matched neither the compact nor the legacy shape.
    UnrecognizedFormat,
}

impl core::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            InvalidReason::Rejected => "rejected by predicate",
            InvalidReason::WrongType => "wrong type",
            InvalidReason::UnrecognizedFormat => "unrecognized serialized format",
        };
        f.write_str(s)
    }
}

/// Domain-level error.
///
/// Every failure here is deterministic: retrying the same input yields the
/// same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A candidate failed validation for a value object.
    ///
    /// `value` is a short rendering of the candidate (a quoted string, a
    /// scalar literal, or the JSON kind name for structured data), never a
    /// full dump.
    #[error("invalid value {value} for {value_object}: {reason}")]
    InvalidValue {
        value_object: &'static str,
        value: String,
        reason: InvalidReason,
    },

    /// A value could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl DomainError {
    pub fn invalid(value_object: &'static str, candidate: &Json, reason: InvalidReason) -> Self {
        Self::InvalidValue {
            value_object,
            value: render(candidate),
            reason,
        }
    }

    pub fn unrecognized(value_object: &'static str) -> Self {
        Self::InvalidValue {
            value_object,
            value: "payload".to_string(),
            reason: InvalidReason::UnrecognizedFormat,
        }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// The failing reason, if this is a validation failure.
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            DomainError::InvalidValue { reason, .. } => Some(*reason),
            DomainError::Encoding(_) => None,
        }
    }
}

/// Render a candidate for error messages and logs.
pub(crate) fn render(candidate: &Json) -> String {
    match candidate {
        Json::String(s) => format!("{s:?}"),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Null => "null".to_string(),
        Json::Array(_) => "array".to_string(),
        Json::Object(_) => "object".to_string(),
    }
}

/// Render a typed candidate.
///
/// JSON has no form for non-finite floats and encodes them as `null`; those
/// fall back to `Debug` (`NaN`, `inf`). Values with no JSON form at all are
/// rendered by their Rust type name.
pub(crate) fn render_typed<T: serde::Serialize + core::fmt::Debug>(candidate: &T) -> String {
    match serde_json::to_value(candidate) {
        Ok(Json::Null) => format!("{candidate:?}"),
        Ok(json) => render(&json),
        Err(_) => core::any::type_name::<T>().to_string(),
    }
}
