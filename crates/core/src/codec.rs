//! Persisted form of value objects.
//!
//! Two JSON shapes are understood:
//!
//! - **compact** (written today): a one-element array, `["41111"]`. Only the
//!   value is stored, positionally, so renaming internals never breaks it.
//! - **legacy** (read only, unless written explicitly with
//!   [`serialize_legacy`]): an object keyed by the historical field name,
//!   `{"\u0000ValueWrapper\u0000value": "41111"}`. Older payloads may carry
//!   other bookkeeping keys next to it; those are ignored.
//!
//! Decoding always runs the predicate again. Rules can be tightened after data
//! was written, and a payload that no longer satisfies them is refused.

use serde_json::{Map, Value as Json};

use crate::error::{DomainError, DomainResult};
use crate::value_object::{Predicate, Wrapped};

/// Namespace prefix of every legacy field key.
pub const LEGACY_NAMESPACE: &str = "\0ValueWrapper\0";

/// Legacy key holding the value.
pub const LEGACY_VALUE_KEY: &str = "\0ValueWrapper\0value";

/// Legacy bookkeeping key written next to the value by old encoders.
pub const LEGACY_INITIALIZED_KEY: &str = "\0ValueWrapper\0initialized";

/// Environment variable toggling the legacy fallback.
pub const ACCEPT_LEGACY_ENV: &str = "VALWRAP_ACCEPT_LEGACY";

/// Decoding options.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Whether the legacy keyed shape is accepted.
    pub accept_legacy: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { accept_legacy: true }
    }
}

impl DecodeOptions {
    /// Read options from the environment (`VALWRAP_ACCEPT_LEGACY`, default `true`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through `lookup`, which maps a variable name to its value.
    ///
    /// Unset or unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let accept_legacy = lookup(ACCEPT_LEGACY_ENV)
            .unwrap_or_else(|| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        Self { accept_legacy }
    }
}

/// Shape of a decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedForm {
    Compact(Json),
    Legacy(Json),
    Unrecognized,
}

impl EncodedForm {
    /// Classify a parsed payload.
    pub fn detect(payload: Json) -> Self {
        match payload {
            Json::Array(mut items) if items.len() == 1 => match items.pop() {
                Some(value) => EncodedForm::Compact(value),
                None => EncodedForm::Unrecognized,
            },
            Json::Object(mut fields) => match fields.remove(LEGACY_VALUE_KEY) {
                Some(value) => EncodedForm::Legacy(value),
                None => EncodedForm::Unrecognized,
            },
            _ => EncodedForm::Unrecognized,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EncodedForm::Compact(_) => "compact",
            EncodedForm::Legacy(_) => "legacy",
            EncodedForm::Unrecognized => "unrecognized",
        }
    }
}

/// Encode `wrapped` in the compact form.
pub fn serialize<P: Predicate>(wrapped: &Wrapped<P>) -> DomainResult<String> {
    serde_json::to_string(&[wrapped]).map_err(|e| DomainError::encoding(format!("{}: {e}", P::NAME)))
}

/// Encode `wrapped` in the legacy keyed form.
pub fn serialize_legacy<P: Predicate>(wrapped: &Wrapped<P>) -> DomainResult<String> {
    let value = serde_json::to_value(wrapped)
        .map_err(|e| DomainError::encoding(format!("{}: {e}", P::NAME)))?;

    let mut fields = Map::new();
    fields.insert(LEGACY_VALUE_KEY.to_string(), value);
    fields.insert(LEGACY_INITIALIZED_KEY.to_string(), Json::Bool(true));

    serde_json::to_string(&Json::Object(fields))
        .map_err(|e| DomainError::encoding(format!("{}: {e}", P::NAME)))
}

/// Decode a payload in either form with default options.
pub fn deserialize<P: Predicate>(payload: &str) -> DomainResult<Wrapped<P>> {
    deserialize_with(payload, DecodeOptions::default())
}

/// Decode a payload, honoring `options`.
pub fn deserialize_with<P: Predicate>(
    payload: &str,
    options: DecodeOptions,
) -> DomainResult<Wrapped<P>> {
    let parsed: Json = match serde_json::from_str(payload) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(
                value_object = P::NAME,
                line = err.line(),
                column = err.column(),
                "payload is not JSON"
            );
            return Err(DomainError::unrecognized(P::NAME));
        }
    };

    decode_json(parsed, options)
}

/// Decode an already-parsed payload.
pub fn decode_json<P: Predicate>(payload: Json, options: DecodeOptions) -> DomainResult<Wrapped<P>> {
    let value = match EncodedForm::detect(payload) {
        EncodedForm::Compact(value) => value,
        EncodedForm::Legacy(value) if options.accept_legacy => {
            tracing::debug!(value_object = P::NAME, "decoding legacy payload");
            value
        }
        form => {
            tracing::debug!(value_object = P::NAME, form = form.name(), "payload shape refused");
            return Err(DomainError::unrecognized(P::NAME));
        }
    };

    Wrapped::from_json(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidReason;
    use proptest::prelude::*;
    use serde_json::json;

    crate::value_object!(
        CardNumber(String) via CardNumberRule,
        |candidate| candidate.chars().count() == 5 && candidate.starts_with('4')
    );

    crate::value_object!(
        Quantity(u32) via QuantityRule,
        |candidate| *candidate > 0
    );

    fn card(value: &str) -> CardNumber {
        CardNumber::new(value.to_string()).unwrap()
    }

    #[test]
    fn compact_form_is_single_element_array() {
        assert_eq!(serialize(&card("41111")).unwrap(), r#"["41111"]"#);
        assert_eq!(serialize(&Quantity::new(7).unwrap()).unwrap(), "[7]");
    }

    #[test]
    fn legacy_form_is_keyed_by_field_name() {
        let encoded = serialize_legacy(&card("41111")).unwrap();
        let parsed: Json = serde_json::from_str(&encoded).unwrap();
        assert_eq!(parsed[LEGACY_VALUE_KEY], json!("41111"));
        assert!(LEGACY_VALUE_KEY.starts_with(LEGACY_NAMESPACE));
    }

    #[test]
    fn both_forms_decode_to_same_value() {
        let c = card("41111");
        let compact = deserialize::<CardNumberRule>(&serialize(&c).unwrap()).unwrap();
        let legacy = deserialize::<CardNumberRule>(&serialize_legacy(&c).unwrap()).unwrap();
        assert_eq!(compact, c);
        assert_eq!(legacy, c);
    }

    #[test]
    fn legacy_payload_with_only_value_key_decodes() {
        let payload = json!({ LEGACY_VALUE_KEY: "42020" }).to_string();
        assert_eq!(deserialize::<CardNumberRule>(&payload).unwrap(), card("42020"));
    }

    #[test]
    fn detect_classifies_shapes() {
        assert_eq!(EncodedForm::detect(json!(["x"])), EncodedForm::Compact(json!("x")));
        assert_eq!(
            EncodedForm::detect(json!({ LEGACY_VALUE_KEY: 1, "other": 2 })),
            EncodedForm::Legacy(json!(1))
        );
        assert_eq!(EncodedForm::detect(json!([])), EncodedForm::Unrecognized);
        assert_eq!(EncodedForm::detect(json!(["a", "b"])), EncodedForm::Unrecognized);
        assert_eq!(EncodedForm::detect(json!({"value": "x"})), EncodedForm::Unrecognized);
        assert_eq!(EncodedForm::detect(json!("41111")), EncodedForm::Unrecognized);
    }

    #[test]
    fn unrecognized_shapes_are_invalid_values() {
        for payload in [r#"{"value":"41111"}"#, r#""41111""#, "[]", "not json", r#"["41111","42020"]"#] {
            let err = deserialize::<CardNumberRule>(payload).unwrap_err();
            assert_eq!(err, DomainError::unrecognized("CardNumber"), "payload: {payload}");
        }
    }

    #[test]
    fn decoded_value_is_validated_again() {
        let encoded = serialize(&card("41234")).unwrap();
        let tampered = encoded.replace("41234", "61234");
        let err = deserialize::<CardNumberRule>(&tampered).unwrap_err();
        assert_eq!(err.reason(), Some(InvalidReason::Rejected));

        let err = deserialize::<QuantityRule>("[0]").unwrap_err();
        assert_eq!(err.reason(), Some(InvalidReason::Rejected));
    }

    #[test]
    fn wrong_type_inside_valid_shape() {
        let err = deserialize::<CardNumberRule>("[811]").unwrap_err();
        assert_eq!(err.reason(), Some(InvalidReason::WrongType));

        let err = deserialize::<QuantityRule>(r#"[{"n":1}]"#).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidValue {
                value_object: "Quantity",
                value: "object".to_string(),
                reason: InvalidReason::WrongType,
            }
        );
    }

    #[test]
    fn legacy_fallback_can_be_disabled() {
        let legacy = serialize_legacy(&card("41111")).unwrap();
        let strict = DecodeOptions { accept_legacy: false };

        let err = deserialize_with::<CardNumberRule>(&legacy, strict).unwrap_err();
        assert_eq!(err, DomainError::unrecognized("CardNumber"));

        let compact = serialize(&card("41111")).unwrap();
        assert_eq!(deserialize_with::<CardNumberRule>(&compact, strict).unwrap(), card("41111"));
    }

    #[test]
    fn default_options_accept_legacy() {
        assert!(DecodeOptions::default().accept_legacy);
    }

    #[test]
    fn options_follow_lookup() {
        let unset = DecodeOptions::from_lookup(|_| None);
        assert!(unset.accept_legacy);

        let disabled = DecodeOptions::from_lookup(|key| {
            (key == ACCEPT_LEGACY_ENV).then(|| "false".to_string())
        });
        assert!(!disabled.accept_legacy);

        let garbage = DecodeOptions::from_lookup(|_| Some("not-a-bool".to_string()));
        assert!(garbage.accept_legacy);

        let other_key = DecodeOptions::from_lookup(|key| {
            (key == "SOMETHING_ELSE").then(|| "false".to_string())
        });
        assert!(other_key.accept_legacy);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: compact round-trip yields an equal wrapper.
        #[test]
        fn compact_round_trip(tail in "[0-9]{4}") {
            let c = card(&format!("4{tail}"));
            let decoded = deserialize::<CardNumberRule>(&serialize(&c).unwrap()).unwrap();
            prop_assert!(decoded.equals(&c));
        }

        /// Property: legacy and compact payloads agree.
        #[test]
        fn legacy_matches_compact(n in 1u32..u32::MAX) {
            let q = Quantity::new(n).unwrap();
            let compact = deserialize::<QuantityRule>(&serialize(&q).unwrap()).unwrap();
            let legacy = deserialize::<QuantityRule>(&serialize_legacy(&q).unwrap()).unwrap();
            prop_assert_eq!(compact, legacy);
        }
    }
}
