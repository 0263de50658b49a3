//! Filters registered on the config template engine
//!
//! Callback bodies often omit optional subscription fields, and some config
//! formats want credentials base64 encoded, so templates get:
//! `default`, `base64_encode` and `base64_decode`.

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Error, ErrorKind, Value};

/// `{{ request.subscribedSubdomain | default("none") }}`
///
/// Falls back when the value is undefined or null. Strict undefined mode
/// still lets an undefined value reach a filter, so this is the one way to
/// make a field optional.
pub fn default_filter(value: Value, fallback: Value) -> Value {
    if value.is_undefined() || value.is_none() {
        return fallback;
    }
    value
}

/// `{{ request.additionalInformation.clientId | base64_encode }}`
pub fn base64_encode(value: &str) -> String {
    STANDARD.encode(value)
}

/// Inverse of [`base64_encode`]; fails on bad padding or non UTF-8 output
pub fn base64_decode(value: &str) -> Result<String, Error> {
    let invalid = |msg: String| Error::new(ErrorKind::InvalidOperation, msg);

    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|e| invalid(format!("'{}' is not base64: {}", value, e)))?;
    String::from_utf8(bytes).map_err(|_| invalid("decoded base64 is not UTF-8 text".to_string()))
}
