use serde::Serialize;
use serde_json::{Map, Value};

use crate::block::{BlockId, BlockRecord};
use crate::editor::{EditorState, ToolbarAnchor};

/// Every state change the editor can make.
///
/// Actions are built by the [`Editor`](super::Editor) facade after it has
/// checked its arguments, so the reducer never re-validates them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Insert a new block after `after`, or at the end
    Create {
        id: BlockId,
        name: String,
        version: String,
        data: Map<String, Value>,
        local_state: Map<String, Value>,
        after: Option<BlockId>,
    },
    /// Remove a block; a missing id is a no-op
    Delete { id: BlockId },
    /// Shallow-merge into a block's data
    UpdateData {
        id: BlockId,
        patch: Map<String, Value>,
        version: Option<String>,
    },
    /// Shallow-merge into a block's local state
    UpdateState {
        id: BlockId,
        patch: Map<String, Value>,
        version: Option<String>,
    },
    /// Focus a block
    Focus { id: BlockId },
    /// Clear focus
    Blur,
    /// Show the block-creation toolbar
    ShowToolbar { anchor: ToolbarAnchor },
    /// Hide the block-creation toolbar
    HideToolbar,
}

impl Action {
    /// Short name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::UpdateData { .. } => "update-data",
            Self::UpdateState { .. } => "update-state",
            Self::Focus { .. } => "focus",
            Self::Blur => "blur",
            Self::ShowToolbar { .. } => "show-toolbar",
            Self::HideToolbar => "hide-toolbar",
        }
    }
}

/// Pure function that computes the next state from an action.
///
/// All document changes happen here. No side effects: no I/O, no clock, no
/// registry lookups. Blocks an action does not touch are moved into the new
/// state untouched.
pub fn update(mut state: EditorState, action: &Action) -> EditorState {
    match action {
        Action::Create {
            id,
            name,
            version,
            data,
            local_state,
            after,
        } => {
            let index = after
                .as_ref()
                .and_then(|after| state.position(after))
                .map_or(state.blocks.len(), |i| i + 1);
            state.blocks.insert(
                index,
                BlockRecord {
                    id: id.clone(),
                    name: name.clone(),
                    version: version.clone(),
                    data: data.clone(),
                    local_state: local_state.clone(),
                },
            );
        }
        Action::Delete { id } => {
            state.blocks.retain(|block| &block.id != id);
            if state.focus.as_ref() == Some(id) {
                state.focus = None;
            }
            if state
                .toolbar
                .as_ref()
                .and_then(ToolbarAnchor::block_id)
                .is_some_and(|anchor| anchor == id)
            {
                state.toolbar = None;
            }
        }
        Action::UpdateData { id, patch, version } => {
            if let Some(block) = state.blocks.iter_mut().find(|block| &block.id == id) {
                merge(&mut block.data, patch);
                if let Some(version) = version {
                    block.version.clone_from(version);
                }
            }
        }
        Action::UpdateState { id, patch, version } => {
            if let Some(block) = state.blocks.iter_mut().find(|block| &block.id == id) {
                merge(&mut block.local_state, patch);
                if let Some(version) = version {
                    block.version.clone_from(version);
                }
            }
        }
        Action::Focus { id } => {
            state.focus = Some(id.clone());
        }
        Action::Blur => {
            state.focus = None;
        }
        Action::ShowToolbar { anchor } => {
            state.toolbar = Some(anchor.clone());
        }
        Action::HideToolbar => {
            state.toolbar = None;
        }
    }
    state
}

/// Keys in `patch` overwrite, keys it does not mention are kept.
fn merge(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}
