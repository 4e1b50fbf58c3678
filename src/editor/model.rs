use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockRecord};
use crate::error::EditorError;

/// Where the block-creation toolbar is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AnchorRepr", into = "AnchorRepr")]
pub enum ToolbarAnchor {
    /// Directly after the block with this id
    After(BlockId),
    /// After the last block (or alone, in an empty document)
    End,
}

/// Persisted form: a block id, or `{"position": "end"}`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AnchorRepr {
    Block(BlockId),
    Position { position: EndMarker },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EndMarker {
    End,
}

impl From<AnchorRepr> for ToolbarAnchor {
    fn from(repr: AnchorRepr) -> Self {
        match repr {
            AnchorRepr::Block(id) => Self::After(id),
            AnchorRepr::Position { .. } => Self::End,
        }
    }
}

impl From<ToolbarAnchor> for AnchorRepr {
    fn from(anchor: ToolbarAnchor) -> Self {
        match anchor {
            ToolbarAnchor::After(id) => Self::Block(id),
            ToolbarAnchor::End => Self::Position {
                position: EndMarker::End,
            },
        }
    }
}

impl ToolbarAnchor {
    /// The block the toolbar follows, if any.
    pub const fn block_id(&self) -> Option<&BlockId> {
        match self {
            Self::After(id) => Some(id),
            Self::End => None,
        }
    }
}

/// The complete document state.
///
/// All editor state lives here. It is only ever replaced through
/// [`update`](super::update), never edited in place by the facade.
///
/// Deserializing checks the document invariants: ids are non-empty and
/// unique, and `focus`/`toolbar` refer to blocks that exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StateDocument")]
pub struct EditorState {
    /// Blocks in document order
    pub(crate) blocks: Vec<BlockRecord>,
    /// Focused block, at most one
    pub(crate) focus: Option<BlockId>,
    /// Block-creation toolbar position; `None` when hidden
    pub(crate) toolbar: Option<ToolbarAnchor>,
}

#[derive(Deserialize)]
struct StateDocument {
    #[serde(default)]
    blocks: Vec<BlockRecord>,
    #[serde(default)]
    focus: Option<BlockId>,
    #[serde(default)]
    toolbar: Option<ToolbarAnchor>,
}

impl TryFrom<StateDocument> for EditorState {
    type Error = EditorError;

    fn try_from(doc: StateDocument) -> Result<Self, Self::Error> {
        Self::new(doc.blocks, doc.focus, doc.toolbar)
    }
}

impl EditorState {
    /// An empty document: no blocks, no focus, no toolbar.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a state from its parts, checking the document invariants.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if an id is empty or
    /// duplicated, or if `focus`/`toolbar` name a block that is not present.
    pub fn new(
        blocks: Vec<BlockRecord>,
        focus: Option<BlockId>,
        toolbar: Option<ToolbarAnchor>,
    ) -> Result<Self, EditorError> {
        let state = Self {
            blocks,
            focus,
            toolbar,
        };
        state.check_invariants()?;
        Ok(state)
    }

    /// Parse a persisted document.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if the JSON is malformed or the
    /// document breaks an invariant.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json)
            .map_err(|err| EditorError::invalid_argument(format!("malformed document: {err}")))
    }

    /// Convert a persisted document held as a JSON value.
    ///
    /// # Errors
    /// Same as [`EditorState::from_json`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, EditorError> {
        serde_json::from_value(value)
            .map_err(|err| EditorError::invalid_argument(format!("malformed document: {err}")))
    }

    /// The persisted document form of this state.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    pub fn blocks(&self) -> &[BlockRecord] {
        &self.blocks
    }

    pub const fn focus(&self) -> Option<&BlockId> {
        self.focus.as_ref()
    }

    pub const fn toolbar(&self) -> Option<&ToolbarAnchor> {
        self.toolbar.as_ref()
    }

    pub fn block(&self, id: &BlockId) -> Option<&BlockRecord> {
        self.blocks.iter().find(|block| &block.id == id)
    }

    /// Index of the block with `id` in document order.
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| &block.id == id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BlockId> {
        self.blocks.iter().map(|block| &block.id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn check_invariants(&self) -> Result<(), EditorError> {
        let mut seen = std::collections::HashSet::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if block.id.is_blank() {
                return Err(EditorError::invalid_argument("block id must not be empty"));
            }
            if !seen.insert(&block.id) {
                return Err(EditorError::invalid_argument(format!(
                    "duplicate block id '{}'",
                    block.id
                )));
            }
        }
        if let Some(focus) = &self.focus {
            if !seen.contains(focus) {
                return Err(EditorError::invalid_argument(format!(
                    "focus refers to missing block '{focus}'"
                )));
            }
        }
        if let Some(id) = self.toolbar.as_ref().and_then(ToolbarAnchor::block_id) {
            if !seen.contains(id) {
                return Err(EditorError::invalid_argument(format!(
                    "toolbar refers to missing block '{id}'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bootstrap_document_without_versions_loads() {
        let state = EditorState::from_value(json!({
            "blocks": [
                { "id": 0, "name": "text", "data": { "text": "foo" } },
                { "id": 1, "name": "text", "data": { "text": "bar" } },
                { "id": 2, "name": "text", "data": { "text": "baz" } }
            ]
        }))
        .unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.focus(), None);
        assert_eq!(state.toolbar(), None);
        assert_eq!(state.position(&BlockId::Number(2)), Some(2));
    }

    #[test]
    fn test_document_round_trips_without_loss() {
        let doc = json!({
            "blocks": [
                { "id": "a", "name": "text", "version": "1.0.0",
                  "data": { "text": "hi" }, "state": { "editing": true } },
                { "id": 7, "name": "image", "version": "2",
                  "data": { "src": "" }, "state": {} }
            ],
            "focus": "a",
            "toolbar": 7
        });
        let state = EditorState::from_value(doc.clone()).unwrap();
        assert_eq!(state.to_value(), doc);
    }

    #[test]
    fn test_negative_and_fractional_ids_load_and_round_trip() {
        let doc = json!({
            "blocks": [
                { "id": -1, "name": "text", "version": "",
                  "data": { "text": "minus" }, "state": {} },
                { "id": 1.5, "name": "text", "version": "",
                  "data": { "text": "half" }, "state": {} },
                { "id": 1, "name": "text", "version": "",
                  "data": { "text": "one" }, "state": {} }
            ],
            "focus": -1,
            "toolbar": 1.5
        });
        let state = EditorState::from_value(doc.clone()).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.position(&BlockId::Number(1)), Some(2));
        assert_eq!(state.to_value(), doc);
    }

    #[test]
    fn test_end_anchor_round_trips() {
        let doc = json!({ "blocks": [], "focus": null, "toolbar": { "position": "end" } });
        let state = EditorState::from_value(doc.clone()).unwrap();
        assert_eq!(state.toolbar(), Some(&ToolbarAnchor::End));
        assert_eq!(state.to_value(), doc);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let err = EditorState::from_value(json!({
            "blocks": [
                { "id": 1, "name": "text", "data": {} },
                { "id": 1, "name": "text", "data": {} }
            ]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("duplicate block id '1'"), "{err}");
    }

    #[test]
    fn test_dangling_focus_and_toolbar_are_rejected() {
        let block = json!({ "id": 1, "name": "text", "data": {} });
        assert!(EditorState::from_value(json!({ "blocks": [block], "focus": 2 })).is_err());
        assert!(EditorState::from_value(json!({ "blocks": [block], "toolbar": 2 })).is_err());
        assert!(EditorState::from_value(json!({ "blocks": [block], "focus": 1, "toolbar": 1 })).is_ok());
    }

    #[test]
    fn test_non_object_data_is_malformed() {
        let err = EditorState::from_json(r#"{ "blocks": [{ "id": 1, "name": "text", "data": "x" }] }"#)
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_string_id_is_rejected() {
        let err = EditorState::from_value(json!({
            "blocks": [{ "id": "", "name": "text", "data": {} }]
        }))
        .unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument(_)));
    }
}
