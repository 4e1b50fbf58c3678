//! Error types raised at the editor boundary.
//!
//! Failed validation is not an error: it is returned as
//! [`ValidationResult::Invalid`](crate::validate::ValidationResult) so the
//! host can decide what to do with it.

use thiserror::Error;

use crate::block::BlockId;

/// Errors raised synchronously by the registry and the editor facade.
///
/// All of these indicate a mistake in the host integration and are never
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// A caller passed a malformed argument (wrong shape or unknown id).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An action referenced a block type that was never registered.
    #[error("unknown block type with name '{name}'")]
    UnknownBlockType { name: String },

    /// A block type descriptor was malformed or its name is already taken.
    #[error("invalid block type '{name}': {reason}")]
    InvalidBlockType { name: String, reason: String },

    /// The document failed the pre-render validation gate.
    #[error("{field} {message} at block with id '{id}'")]
    InvalidDocument {
        id: BlockId,
        field: String,
        message: String,
    },

    /// The id source kept returning ids that are blank or already taken.
    #[error("id source produced no unused block id after {attempts} attempts")]
    IdsExhausted { attempts: usize },
}

impl EditorError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn unknown_block_type(name: impl Into<String>) -> Self {
        Self::UnknownBlockType { name: name.into() }
    }

    pub(crate) fn invalid_block_type(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBlockType {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
