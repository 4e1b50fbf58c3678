//! Document state and the editor facade.
//!
//! This module follows The Elm Architecture (TEA):
//! - [`EditorState`]: The complete document state
//! - [`Action`]: Every state change the editor can make
//! - [`update`]: Pure function for state transitions
//! - [`Editor`]: The facade hosts call; it checks arguments, dispatches
//!   actions and publishes each new state to subscribers

mod handle;
mod ids;
mod model;
mod update;

pub use handle::BlockHandle;
pub use ids::{ClockIds, IdSource, SequentialIds};
pub use model::{EditorState, ToolbarAnchor};
pub use update::{Action, update};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value};

use crate::block::{BlockId, BlockType, BlockTypeRegistry, RegisteredType};
use crate::error::EditorError;
use crate::perf;
use crate::validate::{self, BlockFieldError, ValidationResult};

type Subscriber = Box<dyn FnMut(&EditorState, &Action) -> anyhow::Result<()> + Send>;

/// Returned by [`Editor::subscribe`]; pass it to [`Editor::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// The editor facade.
///
/// Owns the block-type registry, the current [`EditorState`] and the
/// subscriber list. Every mutating method checks its arguments, turns the
/// call into an [`Action`], runs it through [`update`] and then notifies
/// subscribers in the order they subscribed.
///
/// `Editor` is `Send`. Hosts that share it between threads wrap it in a
/// `Mutex` so that dispatch and publish stay serialized.
pub struct Editor {
    registry: BlockTypeRegistry,
    state: EditorState,
    ids: Box<dyn IdSource>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    mounted: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Create an editor over an empty document.
    pub fn new() -> Self {
        Self::with_state(EditorState::empty())
    }

    /// Create an editor over an existing document.
    pub fn with_state(state: EditorState) -> Self {
        Self {
            registry: BlockTypeRegistry::new(),
            state,
            ids: Box::new(ClockIds::default()),
            subscribers: Vec::new(),
            next_subscription: 0,
            mounted: false,
        }
    }

    /// Create an editor over a persisted JSON document.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        EditorState::from_json(json).map(Self::with_state)
    }

    /// Replace the id source used by [`Editor::create_block`].
    #[must_use]
    pub fn with_id_source(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Register a block type.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidBlockType`] for a malformed descriptor or
    /// a name that is already registered.
    pub fn register_block_type(
        &mut self,
        descriptor: BlockType,
    ) -> Result<&RegisteredType, EditorError> {
        self.registry.register(descriptor)
    }

    pub const fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    /// Registered block types in registration order.
    pub fn block_types(&self) -> impl Iterator<Item = &RegisteredType> {
        self.registry.iter()
    }

    pub const fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn into_state(self) -> EditorState {
        self.state
    }

    /// Insert a new block of type `name` after `after`, or at the end.
    ///
    /// The block starts with the type's initial data and initial state and
    /// carries the type's version. An `after` id that is not in the document
    /// appends.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownBlockType`] if `name` is not registered,
    /// [`EditorError::InvalidArgument`] if `after` is an empty id, or
    /// [`EditorError::IdsExhausted`] if the id source has no unused id left.
    /// Nothing is dispatched on error.
    pub fn create_block(
        &mut self,
        name: &str,
        after: Option<BlockId>,
    ) -> Result<BlockId, EditorError> {
        if let Some(after) = &after {
            require_id(after)?;
        }
        let block_type = self.registry.lookup(name)?;
        let (version, data, local_state) = (
            block_type.version().to_string(),
            block_type.initial_data().clone(),
            block_type.initial_state().clone(),
        );
        let id = self.mint_id()?;
        self.dispatch(Action::Create {
            id: id.clone(),
            name: name.to_string(),
            version,
            data,
            local_state,
            after,
        });
        Ok(id)
    }

    /// Create a block where the toolbar is shown, hide the toolbar and focus
    /// the new block. A hidden toolbar or one at the end appends.
    ///
    /// # Errors
    /// Same as [`Editor::create_block`].
    pub fn create_from_toolbar(&mut self, name: &str) -> Result<BlockId, EditorError> {
        let after = self
            .state
            .toolbar()
            .and_then(ToolbarAnchor::block_id)
            .cloned();
        let id = self.create_block(name, after)?;
        self.dispatch(Action::HideToolbar);
        self.dispatch(Action::Focus { id: id.clone() });
        Ok(id)
    }

    /// Remove a block. Deleting an id that is not present is a no-op.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if `id` is empty.
    pub fn delete_block(&mut self, id: BlockId) -> Result<(), EditorError> {
        require_id(&id)?;
        self.dispatch(Action::Delete { id });
        Ok(())
    }

    /// Shallow-merge `data` into a block's data and stamp the block with the
    /// currently registered version of its type. Unknown ids are a no-op.
    ///
    /// The result is not validated; call [`Editor::validate_block`] to check it.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if `id` is empty or `data` is
    /// not an object, or [`EditorError::UnknownBlockType`] if the block's type
    /// is not registered.
    pub fn update_block(&mut self, id: BlockId, data: Value) -> Result<(), EditorError> {
        require_id(&id)?;
        let patch = object(data, "data")?;
        let version = self.current_version(&id)?;
        self.dispatch(Action::UpdateData { id, patch, version });
        Ok(())
    }

    /// Shallow-merge `state` into a block's local state.
    ///
    /// # Errors
    /// As [`Editor::update_block`].
    pub fn update_block_state(&mut self, id: BlockId, state: Value) -> Result<(), EditorError> {
        require_id(&id)?;
        let patch = object(state, "state")?;
        let version = self.current_version(&id)?;
        self.dispatch(Action::UpdateState { id, patch, version });
        Ok(())
    }

    /// Focus a block.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if no block has this id.
    pub fn focus_block(&mut self, id: BlockId) -> Result<(), EditorError> {
        self.require_present(&id)?;
        self.dispatch(Action::Focus { id });
        Ok(())
    }

    pub fn blur_block(&mut self) {
        self.dispatch(Action::Blur);
    }

    /// Show the block-creation toolbar after `after`, or at the end.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if `after` names a block that
    /// is not present.
    pub fn show_toolbar(&mut self, after: Option<BlockId>) -> Result<(), EditorError> {
        let anchor = match after {
            Some(id) => {
                self.require_present(&id)?;
                ToolbarAnchor::After(id)
            }
            None => ToolbarAnchor::End,
        };
        self.dispatch(Action::ShowToolbar { anchor });
        Ok(())
    }

    pub fn hide_toolbar(&mut self) {
        self.dispatch(Action::HideToolbar);
    }

    /// Validate one block's data against its type.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidArgument`] if no block has this id, or
    /// [`EditorError::UnknownBlockType`] if its type is not registered.
    pub fn validate_block(&self, id: &BlockId) -> Result<ValidationResult, EditorError> {
        let block = self
            .state
            .block(id)
            .ok_or_else(|| missing_block(id))?;
        let block_type = self.registry.lookup(&block.name)?;
        Ok(validate::validate_data(block_type, &block.data))
    }

    /// Validate every block, in document order.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownBlockType`] for the first block whose
    /// type is not registered.
    pub fn validate_all(&self) -> Result<ValidationResult<BlockFieldError>, EditorError> {
        let mut results = Vec::with_capacity(self.state.len());
        for block in self.state.blocks() {
            let block_type = self.registry.lookup(&block.name)?;
            results.push((&block.id, validate::validate_data(block_type, &block.data)));
        }
        Ok(validate::aggregate(results))
    }

    /// Gate before the first render: refuse a document with invalid blocks.
    ///
    /// Validation runs on the first successful mount only; later calls
    /// return the current state directly.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidDocument`] describing the first invalid
    /// field, or [`EditorError::UnknownBlockType`] if a block's type is not
    /// registered.
    pub fn mount(&mut self) -> Result<&EditorState, EditorError> {
        if !self.mounted {
            let _scope = perf::scope("editor.mount");
            if let Err(err) = self.check_document() {
                perf::log_mount(self.state.len(), Some(&err));
                return Err(err);
            }
            perf::log_mount(self.state.len(), None);
            self.mounted = true;
            tracing::info!(blocks = self.state.len(), "editor mounted");
        }
        Ok(&self.state)
    }

    fn check_document(&self) -> Result<(), EditorError> {
        let report = self.validate_all()?;
        match report.errors().first() {
            Some(first) => {
                tracing::warn!(
                    id = %first.id,
                    errors = report.errors().len(),
                    "refusing to mount invalid document"
                );
                Err(EditorError::InvalidDocument {
                    id: first.id.clone(),
                    field: first.field.clone(),
                    message: first.message.clone(),
                })
            }
            None => Ok(()),
        }
    }

    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// A handle on the block with `id`, if it is present.
    pub fn block(&mut self, id: &BlockId) -> Option<BlockHandle<'_>> {
        if self.state.contains(id) {
            Some(BlockHandle::new(self, id.clone()))
        } else {
            None
        }
    }

    /// Ids of every block in document order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.state.ids().cloned().collect()
    }

    /// Call `subscriber` with the new state and the action after every
    /// dispatch. An error or a panic in a subscriber is logged and does not
    /// stop the others.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&EditorState, &Action) -> anyhow::Result<()> + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn dispatch(&mut self, action: Action) {
        let _scope = perf::scope("editor.dispatch");
        let state = std::mem::take(&mut self.state);
        self.state = update(state, &action);
        tracing::debug!(action = action.kind(), blocks = self.state.len(), "dispatched");
        perf::log_action(&action);
        self.publish(&action);
    }

    fn publish(&mut self, action: &Action) {
        let state = &self.state;
        for (id, subscriber) in &mut self.subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber(state, action)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            tracing::warn!(
                subscription = id.0,
                action = action.kind(),
                "subscriber failed: {message}"
            );
            perf::log_subscriber_failure(*id, &message);
        }
    }

    /// Draw ids until one is unused. A source of distinct ids can hit at most
    /// one blank id and every id already in the document, so running past
    /// that means it is repeating itself.
    fn mint_id(&mut self) -> Result<BlockId, EditorError> {
        let attempts = self.state.len() + 2;
        for _ in 0..attempts {
            let Some(id) = self.ids.next_id() else {
                break;
            };
            if !id.is_blank() && !self.state.contains(&id) {
                return Ok(id);
            }
        }
        tracing::warn!(attempts, "id source exhausted");
        Err(EditorError::IdsExhausted { attempts })
    }

    fn current_version(&self, id: &BlockId) -> Result<Option<String>, EditorError> {
        match self.state.block(id) {
            Some(block) => Ok(Some(self.registry.lookup(&block.name)?.version().to_string())),
            None => Ok(None),
        }
    }

    fn require_present(&self, id: &BlockId) -> Result<(), EditorError> {
        require_id(id)?;
        if self.state.contains(id) {
            Ok(())
        } else {
            Err(missing_block(id))
        }
    }
}

fn require_id(id: &BlockId) -> Result<(), EditorError> {
    if id.is_blank() {
        Err(EditorError::invalid_argument("block id must not be empty"))
    } else {
        Ok(())
    }
}

fn missing_block(id: &BlockId) -> EditorError {
    EditorError::invalid_argument(format!("no block with id '{id}'"))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn object(value: Value, what: &str) -> Result<Map<String, Value>, EditorError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EditorError::invalid_argument(format!(
            "{what} must be an object, got {other}"
        ))),
    }
}
