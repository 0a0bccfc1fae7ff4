//! # Template Store
//!
//! Owns the canonical template and is the only writer of it.
//!
//! Every mutation is applied to a draft copy and swapped in on success, so
//! readers holding an `Arc<Template>` snapshot never observe a partial edit.
//! Structural rejections are silent at this surface (`bool` / `Option`)
//! and logged at `debug`; the `try_*` methods expose the typed error.
//!
//! ## Lifecycle
//!
//! ```text
//! mutation → validate → draft.apply → swap snapshot → version += 1 → notify
//!                ↓ (rejected)
//!             no-op, no history entry
//! ```

use crate::errors::{EditorError, EditorResult};
use crate::mutations::{Mutation, MutationError};
use crate::undo_stack::UndoStack;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use stencil_model::{
    Block, BlockKind, IdGenerator, PageSettings, Selection, Styles, Template,
};
use tracing::{debug, info, instrument};

/// Handle returned by [`TemplateStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Why the template changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeCause {
    Mutation(&'static str),
    Undo,
    Redo,
    Reset,
}

/// Notification delivered to subscribers after every committed change
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub version: u64,
    pub template: Arc<Template>,
    pub cause: ChangeCause,
}

pub type Listener = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Canonical template plus history, selection and subscribers
pub struct TemplateStore {
    template: Arc<Template>,
    version: u64,
    history: UndoStack,
    selected_block_id: Option<String>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateStore")
            .field("template_id", &self.template.id)
            .field("version", &self.version)
            .field("history", &self.history)
            .field("selected_block_id", &self.selected_block_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TemplateStore {
    pub fn new(template: Template) -> Self {
        Self::with_history_limit(template, crate::undo_stack::DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(template: Template, history_limit: usize) -> Self {
        Self {
            template: Arc::new(template),
            version: 0,
            history: UndoStack::with_max_levels(history_limit),
            selected_block_id: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Decode and validate a template from JSON
    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(Self::new(Template::from_json(json)?))
    }

    /// Current immutable snapshot
    pub fn template(&self) -> Arc<Template> {
        Arc::clone(&self.template)
    }

    /// Increments on every committed mutation, undo, redo and reset
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    // ---- subscriptions ----------------------------------------------------

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn commit(&mut self, draft: Template, cause: ChangeCause) {
        self.template = Arc::new(draft);
        self.version += 1;

        if let Some(selected) = &self.selected_block_id {
            if self.template.find_block(selected).is_none() {
                debug!(block_id = %selected, "Clearing selection of removed block");
                self.selected_block_id = None;
            }
        }

        let event = StoreEvent {
            version: self.version,
            template: Arc::clone(&self.template),
            cause,
        };
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    // ---- selection --------------------------------------------------------

    /// Select a block; unknown ids clear the selection
    pub fn select_block(&mut self, block_id: Option<&str>) -> bool {
        self.selected_block_id = block_id
            .filter(|id| self.template.find_block(id).is_some())
            .map(str::to_string);
        self.selected_block_id.is_some()
    }

    pub fn selected_block_id(&self) -> Option<&str> {
        self.selected_block_id.as_deref()
    }

    // ---- mutations --------------------------------------------------------

    /// Apply a mutation atomically and record it in history
    #[instrument(skip(self, mutation), fields(mutation = mutation.name()))]
    pub fn try_apply(&mut self, mutation: Mutation) -> EditorResult<()> {
        let mut draft = (*self.template).clone();
        self.history.apply(&mutation, &mut draft)?;
        self.commit(draft, ChangeCause::Mutation(mutation.name()));
        debug!(version = self.version, "Mutation committed");
        Ok(())
    }

    /// Silent-rejection wrapper around [`Self::try_apply`]
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        let name = mutation.name();
        match self.try_apply(mutation) {
            Ok(()) => true,
            Err(e) => {
                debug!(mutation = name, error = %e, "Mutation rejected");
                false
            }
        }
    }

    /// Create a block of `kind` with its default payload and insert it.
    /// `None` parent means the root list; `None` index appends.
    #[instrument(skip(self))]
    pub fn add_block(
        &mut self,
        kind: BlockKind,
        parent_id: Option<&str>,
        index: Option<usize>,
    ) -> Option<Block> {
        let mut ids = IdGenerator::for_template(&self.template);
        let block = Block::new(kind, &mut ids);

        let inserted = self.apply(Mutation::InsertBlock {
            parent_id: parent_id.map(str::to_string),
            index,
            block: block.clone(),
        });
        inserted.then_some(block)
    }

    #[instrument(skip(self))]
    pub fn move_block(
        &mut self,
        block_id: &str,
        target_parent_id: Option<&str>,
        target_index: usize,
    ) -> bool {
        self.apply(Mutation::MoveBlock {
            block_id: block_id.to_string(),
            target_parent_id: target_parent_id.map(str::to_string),
            target_index,
        })
    }

    #[instrument(skip(self))]
    pub fn delete_block(&mut self, block_id: &str) -> bool {
        self.apply(Mutation::RemoveBlock {
            block_id: block_id.to_string(),
        })
    }

    #[instrument(skip(self, partial))]
    pub fn update_block(&mut self, block_id: &str, partial: Map<String, Value>) -> bool {
        self.apply(Mutation::UpdateBlock {
            block_id: block_id.to_string(),
            partial,
        })
    }

    pub fn insert_table_row(&mut self, table_id: &str, at: usize) -> bool {
        self.apply(Mutation::InsertTableRow {
            table_id: table_id.to_string(),
            at,
        })
    }

    pub fn remove_table_row(&mut self, table_id: &str, at: usize) -> bool {
        self.apply(Mutation::RemoveTableRow {
            table_id: table_id.to_string(),
            at,
        })
    }

    pub fn insert_table_column(&mut self, table_id: &str, at: usize) -> bool {
        self.apply(Mutation::InsertTableColumn {
            table_id: table_id.to_string(),
            at,
        })
    }

    pub fn remove_table_column(&mut self, table_id: &str, at: usize) -> bool {
        self.apply(Mutation::RemoveTableColumn {
            table_id: table_id.to_string(),
            at,
        })
    }

    pub fn merge_cells(&mut self, table_id: &str, selection: Selection) -> bool {
        self.apply(Mutation::MergeCells {
            table_id: table_id.to_string(),
            selection,
        })
    }

    pub fn unmerge_cell(&mut self, table_id: &str, row: usize, col: usize) -> bool {
        self.apply(Mutation::UnmergeCell {
            table_id: table_id.to_string(),
            row,
            col,
        })
    }

    pub fn add_column(&mut self, block_id: &str, index: Option<usize>) -> bool {
        self.apply(Mutation::AddColumn {
            block_id: block_id.to_string(),
            index,
        })
    }

    pub fn remove_column(&mut self, block_id: &str, column_id: &str) -> bool {
        self.apply(Mutation::RemoveColumn {
            block_id: block_id.to_string(),
            column_id: column_id.to_string(),
        })
    }

    pub fn set_document_styles(&mut self, styles: Styles) -> bool {
        self.apply(Mutation::SetDocumentStyles { styles })
    }

    pub fn set_page_settings(&mut self, settings: PageSettings) -> bool {
        self.apply(Mutation::SetPageSettings { settings })
    }

    pub fn rename_template(&mut self, name: &str) -> bool {
        self.apply(Mutation::RenameTemplate {
            name: name.to_string(),
        })
    }

    /// Replace the whole template; history is cleared. An invalid template
    /// leaves the store untouched.
    pub fn reset(&mut self, template: Template) -> EditorResult<()> {
        template.validate()?;
        info!(template_id = %template.id, "Resetting template store");
        self.history.clear();
        self.commit(template, ChangeCause::Reset);
        Ok(())
    }

    // ---- history ----------------------------------------------------------

    pub fn begin_batch(&mut self, description: &str) {
        self.history.begin_batch();
        self.history.set_batch_description(description);
    }

    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch()
    }

    #[instrument(skip(self))]
    pub fn try_undo(&mut self) -> EditorResult<()> {
        let mut draft = (*self.template).clone();
        if !self.history.undo(&mut draft)? {
            return Err(EditorError::EmptyHistory("undo"));
        }
        self.commit(draft, ChangeCause::Undo);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn try_redo(&mut self) -> EditorResult<()> {
        let mut draft = (*self.template).clone();
        if !self.history.redo(&mut draft)? {
            return Err(EditorError::EmptyHistory("redo"));
        }
        self.commit(draft, ChangeCause::Redo);
        Ok(())
    }

    /// Undo past the oldest entry is a no-op returning `false`
    pub fn undo(&mut self) -> bool {
        match self.try_undo() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Undo skipped");
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.try_redo() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Redo skipped");
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- drag and drop ----------------------------------------------------

    /// Would moving `dragged_block_id` to `position` in `target_parent_id` succeed?
    pub fn can_drop(
        &self,
        dragged_block_id: &str,
        target_parent_id: Option<&str>,
        position: usize,
    ) -> bool {
        self.check_drop(dragged_block_id, target_parent_id, position)
            .is_ok()
    }

    /// Reason a drop would be rejected
    pub fn check_drop(
        &self,
        dragged_block_id: &str,
        target_parent_id: Option<&str>,
        position: usize,
    ) -> Result<(), MutationError> {
        Mutation::MoveBlock {
            block_id: dragged_block_id.to_string(),
            target_parent_id: target_parent_id.map(str::to_string),
            target_index: position,
        }
        .validate(&self.template)
    }
}
