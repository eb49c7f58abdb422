//! Partition and explicit hash key derivation.
//!
//! A [`KeyDerivation`] combines an optional field lookup with an optional
//! registered [`KeyFn`]. When a field is configured the looked-up value feeds
//! the function; otherwise the whole record does. Zero-argument functions
//! ignore their input entirely. Whatever comes out is coerced to a string with
//! [`coerce_to_string`].

mod registry;


use std::borrow::Cow;

use serde_json::Value;
use thiserror::Error;

use crate::log_record::LogRecord;

pub use registry::{KeyFn, KeyFnRegistry};

/// Error raised by a key function.
///
/// Derivation failures point at a configuration bug, so callers treat them as
/// fatal rather than retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("key derivation failed: {message}")]
pub struct DerivationError {
    message: String,
}

impl DerivationError {
    /// Create an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message supplied by the failing function.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// How a single key (partition or explicit hash) is derived from a record.
#[derive(Clone, Debug)]
pub struct KeyDerivation {
    field: Option<String>,
    function: Option<KeyFn>,
}

impl KeyDerivation {
    /// Combine a field lookup and a function.
    ///
    /// Returns `None` when neither is supplied: such a derivation has nothing
    /// to resolve.
    pub fn new(field: Option<String>, function: Option<KeyFn>) -> Option<Self> {
        if field.is_none() && function.is_none() {
            return None;
        }
        Some(Self { field, function })
    }

    /// Derive the key from a single field.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            field: Some(name.into()),
            function: None,
        }
    }

    /// Derive the key with `function`, fed by the whole record.
    pub fn function(function: KeyFn) -> Self {
        Self {
            field: None,
            function: Some(function),
        }
    }

    /// Feed `function` with the value of `field` instead of the whole record.
    pub fn field_with_function(name: impl Into<String>, function: KeyFn) -> Self {
        Self {
            field: Some(name.into()),
            function: Some(function),
        }
    }

    /// Configured field name, if any.
    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Configured function, if any.
    pub fn key_fn(&self) -> Option<&KeyFn> {
        self.function.as_ref()
    }

    /// Resolve the key for `record`.
    ///
    /// A configured field missing from the record resolves to JSON `null`,
    /// which coerces to the empty string.
    pub fn resolve(&self, record: &LogRecord) -> Result<String, DerivationError> {
        let value: Cow<'_, Value> = match &self.field {
            Some(name) => Cow::Borrowed(record.get(name).unwrap_or(&Value::Null)),
            None => match &self.function {
                // Only unary functions look at the whole record.
                Some(KeyFn::Unary(_)) | None => Cow::Owned(record.to_value()),
                Some(KeyFn::Constant(_)) => Cow::Owned(Value::Null),
            },
        };

        match &self.function {
            Some(function) => function.call(&value).map(|derived| coerce_to_string(&derived)),
            None => Ok(coerce_to_string(&value)),
        }
    }
}

/// Coerce a resolved key value to its string form.
///
/// Strings are used verbatim and `null` becomes the empty string. Numbers and
/// booleans use their display form. Arrays and objects are rendered as compact
/// JSON rather than rejected.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
