//! Blocks and block types.
//!
//! This module handles:
//! - Block identifiers and the persisted block record
//! - Block type descriptors supplied by plugins
//! - The registry that checks descriptors and compiles their schemas

mod registry;
mod types;

pub use registry::{BlockTypeRegistry, RegisteredType};
pub use types::{BlockId, BlockRecord, BlockType};
