//! Structured log record representation.
//!
//! A [`LogRecord`] is a JSON object whose fields keep their insertion order,
//! so the payload shipped to the stream mirrors the order in which the host
//! produced the fields. The synthetic tag and time fields are appended (or
//! overwritten in place) just before encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name used for the injected tag.
pub const TAG_FIELD: &str = "__tag";
/// Field name used for the injected timestamp.
pub const TIME_FIELD: &str = "__time";

/// A structured log record: string keys mapped to JSON values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord {
    fields: Map<String, Value>,
}

impl LogRecord {
    /// Construct an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Insert or replace a field, returning the previous value.
    ///
    /// Replacing an existing field keeps its original position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Inject the host tag under [`TAG_FIELD`].
    pub fn inject_tag(&mut self, tag: &str) {
        self.insert(TAG_FIELD, tag);
    }

    /// Inject the host timestamp under [`TIME_FIELD`].
    pub fn inject_time(&mut self, time: i64) {
        self.insert(TIME_FIELD, time);
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrow the record's fields.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Copy the record into a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Serialize the record to compact JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.fields)
    }
}

impl From<Map<String, Value>> for LogRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for LogRecord {
    type Error = Value;

    /// Accept only JSON objects; any other value is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(other),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for LogRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Map<_, _>>();
        Self::from(map)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn injected_fields_follow_existing_fields() {
        let mut record = LogRecord::new().with_field("a", 1);
        record.inject_tag("app.log");
        record.inject_time(1000);
        assert_eq!(
            record.to_json().expect("serialise"),
            r#"{"a":1,"__tag":"app.log","__time":1000}"#
        );
    }

    #[test]
    fn injection_overwrites_in_place() {
        let mut record = LogRecord::new()
            .with_field(TAG_FIELD, "stale")
            .with_field("b", true);
        record.inject_tag("fresh");
        assert_eq!(
            record.to_json().expect("serialise"),
            r#"{"__tag":"fresh","b":true}"#
        );
    }

    #[test]
    fn try_from_rejects_non_objects() {
        assert!(LogRecord::try_from(json!([1, 2])).is_err());
        let record = LogRecord::try_from(json!({"x": "y"})).expect("object");
        assert_eq!(record.get("x"), Some(&json!("y")));
    }
}
