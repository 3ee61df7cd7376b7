//! Conversions between domain values and `PostgreSQL` column types.
//!
//! Enum columns hold the same `snake_case` labels the types serialize to,
//! so labels go through `serde_json` rather than a second hand-kept table.
//! Unsigned counters are stored in signed columns and converted with a
//! range check in both directions. List-valued fields go to `JSONB`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DbError;

/// Encode a unit enum variant as its wire label.
pub(crate) fn encode_label<T: Serialize>(value: &T) -> Result<String, DbError> {
    match serde_json::to_value(value)? {
        Value::String(label) => Ok(label),
        other => Err(DbError::Serialization(<serde_json::Error as serde::ser::Error>::custom(
            format!("expected a string label, got {other}"),
        ))),
    }
}

/// Decode a wire label back into its enum variant.
pub(crate) fn decode_label<T: DeserializeOwned>(label: String) -> Result<T, DbError> {
    Ok(serde_json::from_value(Value::String(label))?)
}

/// Encode a value as JSON text for a `JSONB` column.
pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String, DbError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode JSON text read back from a `JSONB` column.
pub(crate) fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, DbError> {
    Ok(serde_json::from_str(text)?)
}

/// Range-checked integer conversion for a named column.
pub(crate) fn convert<F, T>(column: &'static str, value: F) -> Result<T, DbError>
where
    F: Copy + ToString,
    T: TryFrom<F>,
{
    T::try_from(value).map_err(|_out_of_range| DbError::OutOfRange {
        column,
        value: value.to_string(),
    })
}
