//! Ready-made block types.
//!
//! Hosts can register these directly or use them as templates for their own
//! descriptors. Rendering stays with the host.

use serde_json::json;

use crate::block::BlockType;

/// Version tag shared by the built-in types.
pub const BUILTIN_VERSION: &str = "1.0.0";

/// A plain text block. New blocks start empty; once edited the text must
/// not be empty.
pub fn text() -> BlockType {
    BlockType::new(
        "text",
        BUILTIN_VERSION,
        json!({
            "type": "object",
            "required": ["text"],
            "properties": {
                "text": { "type": "string", "minLength": 1 }
            },
            "additionalProperties": false
        }),
        json!({ "text": "" }),
    )
    .with_initial_state(json!({ "editing": false }))
}

/// An image block referencing its source by URI.
pub fn image() -> BlockType {
    BlockType::new(
        "image",
        BUILTIN_VERSION,
        json!({
            "type": "object",
            "required": ["src"],
            "properties": {
                "src": { "type": "string", "format": "uri" },
                "alt": { "type": "string" },
                "caption": { "type": "string" }
            },
            "additionalProperties": false
        }),
        json!({ "src": "", "alt": "" }),
    )
}

/// Every built-in type, in the order a toolbar should offer them.
pub fn all() -> Vec<BlockType> {
    vec![text(), image()]
}
