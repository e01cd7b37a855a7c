use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Parses a raw request body as JSON. Malformed JSON syntax is
/// `invalid_json`; a schema mismatch surfaces once the caller tries to
/// deserialize the resulting `Value` into a typed struct.
pub fn parse_raw(bytes: &Bytes) -> Result<JsonValue, AppError> {
    if bytes.is_empty() {
        return Ok(JsonValue::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::invalid_json(format!("request body is not valid JSON: {e}")))
}

/// Deserializes an already-parsed JSON value into a typed request DTO. A
/// schema mismatch here (missing field, wrong type) is a `validation_error`,
/// distinct from malformed JSON syntax.
pub fn parse_typed<T: DeserializeOwned>(value: JsonValue) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::validation_error(format!("request body does not match the expected schema: {e}")))
}
