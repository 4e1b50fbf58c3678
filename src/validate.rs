//! The validation gate between block data and its type's schema.
//!
//! A block whose data still equals its type's `initialData` is always
//! accepted, even when that initial value would fail the schema. This lets a
//! type forbid, say, an empty text while still allowing a freshly created,
//! untouched block to exist.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::block::{BlockId, RegisteredType};
use crate::error::EditorError;
use crate::schema::{FieldError, json_map_eq};

/// Outcome of validating one block, or a whole document.
///
/// Returned as data, never raised: the host decides whether to abort, log or
/// show the errors inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "errors", rename_all = "lowercase")]
pub enum ValidationResult<E = FieldError> {
    Valid,
    Invalid(Vec<E>),
}

impl<E> ValidationResult<E> {
    fn from_errors(errors: Vec<E>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The errors in the order they were produced; empty when valid.
    pub fn errors(&self) -> &[E] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }
}

/// A field error tagged with the block it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFieldError {
    pub id: BlockId,
    pub field: String,
    pub message: String,
}

/// Validate arbitrary `data` for a block type.
///
/// # Errors
/// Returns [`EditorError::InvalidArgument`] if `data` is not a JSON object.
/// A failed validation is not an error.
pub fn validate(block_type: &RegisteredType, data: &Value) -> Result<ValidationResult, EditorError> {
    let map = data
        .as_object()
        .ok_or_else(|| EditorError::invalid_argument("data must be an object"))?;
    Ok(validate_data(block_type, map))
}

/// Validate block data that is already known to be an object.
pub fn validate_data(block_type: &RegisteredType, data: &Map<String, Value>) -> ValidationResult {
    if json_map_eq(data, block_type.initial_data()) {
        return ValidationResult::Valid;
    }
    let errors = block_type.validator().validate(&Value::Object(data.clone()));
    ValidationResult::from_errors(errors)
}

/// Merge per-block results into one document result, in block order.
pub(crate) fn aggregate<'a>(
    results: impl IntoIterator<Item = (&'a BlockId, ValidationResult)>,
) -> ValidationResult<BlockFieldError> {
    let errors = results
        .into_iter()
        .flat_map(|(id, result)| {
            let errors = match result {
                ValidationResult::Valid => Vec::new(),
                ValidationResult::Invalid(errors) => errors,
            };
            errors.into_iter().map(move |e| BlockFieldError {
                id: id.clone(),
                field: e.field,
                message: e.message,
            })
        })
        .collect();
    ValidationResult::from_errors(errors)
}
