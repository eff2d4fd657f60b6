//! Envelope normalization for stored JSON documents.
//!
//! Preferences and sessions have historically been stored both bare
//! (`{"a": 1}`) and enveloped (`{"preferences": {"a": 1}}`). Callers never
//! care which form is on disk: reads want the bare object, writes echo the
//! enveloped one. A top-level key equal to the envelope key is always taken
//! to mean "this payload is enveloped", even if the writer meant it as data.

use serde_json::{Map, Value};
use thiserror::Error;

/// A parsed JSON object
pub type JsonMap = Map<String, Value>;

/// Failure to normalize a stored payload
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("stored payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("stored payload is not a JSON object")]
    NotAnObject,

    #[error("value under \"{0}\" is not a JSON object")]
    InnerNotAnObject(&'static str),
}

/// Converter for one envelope key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    key: &'static str,
}

impl Envelope {
    pub const fn new(key: &'static str) -> Self {
        Self { key }
    }

    /// Normalize `raw` into the wrapped or unwrapped form.
    pub fn convert(&self, raw: &str, wrap: bool) -> Result<JsonMap, EnvelopeError> {
        if wrap {
            self.wrap(raw)
        } else {
            self.unwrap(raw)
        }
    }

    /// Return the bare object, removing the envelope if one is present.
    pub fn unwrap(&self, raw: &str) -> Result<JsonMap, EnvelopeError> {
        let mut values = parse(raw)?;
        match values.remove(self.key) {
            Some(Value::Object(inner)) => Ok(inner),
            Some(_) => Err(EnvelopeError::InnerNotAnObject(self.key)),
            None => Ok(values),
        }
    }

    /// Return `{key: object}`, leaving an already enveloped payload untouched.
    pub fn wrap(&self, raw: &str) -> Result<JsonMap, EnvelopeError> {
        let values = parse(raw)?;
        if values.contains_key(self.key) {
            return Ok(values);
        }

        let mut wrapped = JsonMap::new();
        wrapped.insert(self.key.to_string(), Value::Object(values));
        Ok(wrapped)
    }
}

/// Parse a stored payload. Empty text and JSON `null` both mean "no values".
fn parse(raw: &str) -> Result<JsonMap, EnvelopeError> {
    if raw.is_empty() {
        return Ok(JsonMap::new());
    }

    match serde_json::from_str::<Value>(raw)? {
        Value::Object(values) => Ok(values),
        Value::Null => Ok(JsonMap::new()),
        _ => Err(EnvelopeError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PREFS: Envelope = Envelope::new("preferences");
    const SESSION: Envelope = Envelope::new("session");

    fn object(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_blank_payload_is_empty() {
        assert!(PREFS.unwrap("").unwrap().is_empty());
        assert_eq!(
            PREFS.wrap("").unwrap(),
            object(json!({ "preferences": {} }))
        );
    }

    #[test]
    fn test_unparseable_payload_fails() {
        let result = PREFS.unwrap("------------");
        assert!(matches!(result, Err(EnvelopeError::Parse(_))));

        let result = SESSION.wrap("------------");
        assert!(matches!(result, Err(EnvelopeError::Parse(_))));
    }

    #[test]
    fn test_unwrap_embedded_payload() {
        let actual = PREFS.unwrap(r#"{"preferences":{"foo":"bar"}}"#).unwrap();
        assert_eq!(actual, object(json!({ "foo": "bar" })));
    }

    #[test]
    fn test_unwrap_bare_payload_is_unchanged() {
        let actual = PREFS.unwrap(r#"{"foo":"bar"}"#).unwrap();
        assert_eq!(actual, object(json!({ "foo": "bar" })));
    }

    #[test]
    fn test_wrap_bare_payload() {
        let actual = SESSION.wrap(r#"{"one":"two"}"#).unwrap();
        assert_eq!(actual, object(json!({ "session": { "one": "two" } })));
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let actual = PREFS.wrap(r#"{"preferences":{"a":1}}"#).unwrap();
        assert_eq!(actual, object(json!({ "preferences": { "a": 1 } })));
    }

    #[test]
    fn test_envelope_keys_are_independent() {
        // A session envelope is just data to the preferences converter
        let actual = PREFS.unwrap(r#"{"session":{"a":1}}"#).unwrap();
        assert_eq!(actual, object(json!({ "session": { "a": 1 } })));
    }

    #[test]
    fn test_null_payload_is_empty() {
        assert!(PREFS.unwrap("null").unwrap().is_empty());
    }

    #[test]
    fn test_non_object_payload_fails() {
        assert!(matches!(
            PREFS.unwrap("[1, 2, 3]"),
            Err(EnvelopeError::NotAnObject)
        ));
        assert!(matches!(
            PREFS.wrap("\"text\""),
            Err(EnvelopeError::NotAnObject)
        ));
    }

    #[test]
    fn test_unwrap_non_object_envelope_fails() {
        assert!(matches!(
            PREFS.unwrap(r#"{"preferences":"dark"}"#),
            Err(EnvelopeError::InnerNotAnObject("preferences"))
        ));

        // Wrapping leaves it alone
        let actual = PREFS.wrap(r#"{"preferences":"dark"}"#).unwrap();
        assert_eq!(actual, object(json!({ "preferences": "dark" })));
    }

    #[test]
    fn test_convert_dispatches_on_wrap_flag() {
        let raw = r#"{"one":"two"}"#;
        assert_eq!(PREFS.convert(raw, false).unwrap(), PREFS.unwrap(raw).unwrap());
        assert_eq!(PREFS.convert(raw, true).unwrap(), PREFS.wrap(raw).unwrap());
    }
}
