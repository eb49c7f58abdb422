//! Named key functions supplied by the embedding application.
//!
//! Configuration refers to key functions by name (`partition_key_proc`,
//! `explicit_hash_key_proc`); the registry maps those names to Rust closures
//! once, at configuration time.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use super::DerivationError;

type ConstantFn = dyn Fn() -> Result<Value, DerivationError> + Send + Sync;
type UnaryFn = dyn Fn(&Value) -> Result<Value, DerivationError> + Send + Sync;

/// A key function, distinguished by arity.
#[derive(Clone)]
pub enum KeyFn {
    /// Takes no input and yields a fixed or externally sourced key.
    Constant(Arc<ConstantFn>),
    /// Receives the looked-up field value, or the whole record as a JSON
    /// object when no field is configured.
    Unary(Arc<UnaryFn>),
}

impl KeyFn {
    /// Wrap a zero-argument closure.
    pub fn constant<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, DerivationError> + Send + Sync + 'static,
    {
        Self::Constant(Arc::new(f))
    }

    /// Wrap a one-argument closure.
    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, DerivationError> + Send + Sync + 'static,
    {
        Self::Unary(Arc::new(f))
    }

    /// Number of parameters the function accepts.
    pub fn arity(&self) -> usize {
        match self {
            Self::Constant(_) => 0,
            Self::Unary(_) => 1,
        }
    }

    pub(super) fn call(&self, value: &Value) -> Result<Value, DerivationError> {
        match self {
            Self::Constant(f) => f(),
            Self::Unary(f) => f(value),
        }
    }
}

impl fmt::Debug for KeyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(_) => f.write_str("Constant(<fn>)"),
            Self::Unary(_) => f.write_str("Unary(<fn>)"),
        }
    }
}

/// Name-to-function lookup used when validating configuration.
#[derive(Clone, Debug, Default)]
pub struct KeyFnRegistry {
    functions: HashMap<String, KeyFn>,
}

impl KeyFnRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, function: KeyFn) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Register a zero-argument function.
    pub fn register_constant<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn() -> Result<Value, DerivationError> + Send + Sync + 'static,
    {
        self.register(name, KeyFn::constant(f))
    }

    /// Register a one-argument function.
    pub fn register_unary<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Value, DerivationError> + Send + Sync + 'static,
    {
        self.register(name, KeyFn::unary(f))
    }

    /// Look up a function by name.
    pub fn get(&self, name: &str) -> Option<KeyFn> {
        self.functions.get(name).cloned()
    }

    /// Whether a function is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}
