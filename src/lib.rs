// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. block::BlockType)
    clippy::module_name_repetitions
)]

//! # Blockwise
//!
//! An embeddable block-document editor engine.
//!
//! A document is an ordered list of typed blocks (text, image, ...). Hosts
//! register block types, each with a JSON schema and initial data, and drive
//! the document through an [`Editor`](editor::Editor). Rendering is left to
//! the host, which subscribes to state changes.
//!
//! ## Architecture
//!
//! Blockwise uses The Elm Architecture (TEA) pattern:
//! - **Model**: [`EditorState`](editor::EditorState), the whole document
//! - **Message**: [`Action`](editor::Action), a closed set of changes
//! - **Update**: [`update`](editor::update), pure state transitions
//! - **View**: owned by the host, fed through subscriptions
//!
//! ## Modules
//!
//! - [`block`]: Block ids, records, type descriptors and the registry
//! - [`schema`]: JSON schema compilation and validation
//! - [`validate`]: The validation gate with its initial-data short-circuit
//! - [`editor`]: Document state, reducer, facade and block handles
//! - [`builtin`]: Ready-made `text` and `image` block types
//! - [`config`]: rc-file defaults for the command-line host

pub mod block;
pub mod builtin;
pub mod config;
pub mod editor;
pub mod error;
pub mod perf;
pub mod schema;
pub mod validate;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::block::{BlockId, BlockRecord, BlockType};
    pub use crate::editor::{Action, BlockHandle, Editor, EditorState, ToolbarAnchor};
    pub use crate::error::EditorError;
    pub use crate::validate::{BlockFieldError, ValidationResult};
}
