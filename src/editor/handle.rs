use serde_json::{Map, Value};

use super::Editor;
use crate::block::{BlockId, BlockRecord};
use crate::error::EditorError;
use crate::validate::ValidationResult;

/// A view of one block, bound to the editor that owns it.
///
/// The handle stores only the id. Every read goes back to the editor's
/// current state, so a handle taken before an update sees the update.
/// Create one per render pass with [`Editor::block`] instead of caching it.
pub struct BlockHandle<'a> {
    editor: &'a mut Editor,
    id: BlockId,
}

impl<'a> BlockHandle<'a> {
    pub(super) fn new(editor: &'a mut Editor, id: BlockId) -> Self {
        Self { editor, id }
    }

    pub const fn id(&self) -> &BlockId {
        &self.id
    }

    /// The block as it is in the editor right now, or `None` once deleted.
    pub fn record(&self) -> Option<&BlockRecord> {
        self.editor.state().block(&self.id)
    }

    pub fn name(&self) -> Option<&str> {
        self.record().map(|block| block.name.as_str())
    }

    pub fn version(&self) -> Option<&str> {
        self.record().map(|block| block.version.as_str())
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.record().map(|block| &block.data)
    }

    pub fn local_state(&self) -> Option<&Map<String, Value>> {
        self.record().map(|block| &block.local_state)
    }

    pub fn is_focused(&self) -> bool {
        self.editor.state().focus() == Some(&self.id)
    }

    /// # Errors
    /// See [`Editor::focus_block`].
    pub fn focus(&mut self) -> Result<(), EditorError> {
        self.editor.focus_block(self.id.clone())
    }

    pub fn blur(&mut self) {
        self.editor.blur_block();
    }

    /// # Errors
    /// See [`Editor::update_block`].
    pub fn update_data(&mut self, patch: Value) -> Result<(), EditorError> {
        self.editor.update_block(self.id.clone(), patch)
    }

    /// # Errors
    /// See [`Editor::update_block_state`].
    pub fn update_state(&mut self, patch: Value) -> Result<(), EditorError> {
        self.editor.update_block_state(self.id.clone(), patch)
    }

    /// # Errors
    /// See [`Editor::validate_block`].
    pub fn validate(&self) -> Result<ValidationResult, EditorError> {
        self.editor.validate_block(&self.id)
    }
}

impl std::fmt::Debug for BlockHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockHandle")
            .field("id", &self.id)
            .field("record", &self.record())
            .finish()
    }
}
