//! JSON-Schema compilation and validation for block data.
//!
//! A schema is compiled once, when its block type is registered, into a
//! tree of [`Node`]s with regexes and references already resolved. Checking
//! a value walks that tree and collects [`FieldError`]s in a stable order:
//! the first error reported is the one a host should surface first.

mod check;
mod compile;
mod equality;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use equality::{json_eq, json_map_eq};

use compile::Node;

/// Root name used for error fields.
const ROOT_FIELD: &str = "data";

/// A single validation failure: which field, and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path of the offending value, rooted at `data` (e.g. `data.items[2]`)
    pub field: String,
    /// Human-readable description (e.g. `is required`)
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Reasons a schema document cannot be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{pointer}: schema must be an object or a boolean")]
    NotASchema { pointer: String },

    #[error("{pointer}: {reason}")]
    BadKeyword { pointer: String, reason: String },

    #[error("{pointer}: invalid pattern: {reason}")]
    BadPattern { pointer: String, reason: String },

    #[error("{pointer}: unknown format '{format}'")]
    UnknownFormat { pointer: String, format: String },

    #[error("{pointer}: unresolvable reference '{reference}'")]
    UnresolvedRef { pointer: String, reference: String },

    #[error("{pointer}: reference loops back to itself without descending into the value")]
    CyclicRef { pointer: String },
}

/// A schema ready to check values.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    root: Node,
    definitions: HashMap<String, Node>,
}

impl CompiledSchema {
    /// Compile a schema document.
    ///
    /// # Errors
    /// Returns a [`SchemaError`] naming the JSON pointer of the first
    /// malformed keyword, invalid regex, unknown format, dangling `$ref` or
    /// `$ref` cycle that never moves into the value.
    pub fn compile(schema: &Value) -> Result<Self, SchemaError> {
        compile::compile_document(schema)
    }

    /// Check `value` and return every failure found, in walk order.
    ///
    /// An empty vector means the value conforms.
    pub fn validate(&self, value: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();
        self.check(&self.root, value, ROOT_FIELD, &mut errors);
        errors
    }

    /// Shorthand for `validate(value).is_empty()`.
    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_empty()
    }
}
