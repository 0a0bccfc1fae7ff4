//! # Undo/Redo Stack
//!
//! Linear command history of `(mutation, inverse)` pairs.
//!
//! ## Design
//!
//! - The inverse is computed against the template before the mutation runs
//! - Undo replays inverses newest first; redo replays the forward mutations
//! - Recording anything new drops the redo tail
//! - A batch of mutations is one history step
//! - A batch whose inverses fail to apply is put back where it was; the
//!   caller is expected to discard the partially edited template
//!
//! ## Example
//!
//! ```rust
//! use stencil_editor::{Mutation, UndoStack};
//! use stencil_model::{Block, Template};
//!
//! let mut template = Template::new("doc", "Doc");
//! let mut stack = UndoStack::new();
//!
//! let mutation = Mutation::InsertBlock {
//!     parent_id: None,
//!     index: None,
//!     block: Block::container("box", vec![]),
//! };
//! stack.apply(&mutation, &mut template).unwrap();
//! assert_eq!(template.blocks.len(), 1);
//!
//! stack.undo(&mut template).unwrap();
//! assert!(template.blocks.is_empty());
//!
//! stack.redo(&mut template).unwrap();
//! assert_eq!(template.blocks.len(), 1);
//! ```

use crate::{Mutation, MutationError};
use stencil_model::Template;

/// Default number of undo levels kept
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One history step
#[derive(Debug, Clone)]
pub struct MutationBatch {
    /// Forward mutations, oldest first
    pub mutations: Vec<Mutation>,

    /// Inverses, newest first
    pub inverses: Vec<Mutation>,

    pub description: Option<String>,
}

impl MutationBatch {
    pub fn single(mutation: Mutation, inverse: Mutation) -> Self {
        Self {
            description: Some(mutation.name().to_string()),
            mutations: vec![mutation],
            inverses: vec![inverse],
        }
    }

    fn empty() -> Self {
        Self {
            mutations: Vec::new(),
            inverses: Vec::new(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Bounded undo/redo history for one template
#[derive(Debug)]
pub struct UndoStack {
    /// Applied steps, newest last
    undo_stack: Vec<MutationBatch>,

    /// Undone steps, newest last
    redo_stack: Vec<MutationBatch>,

    /// 0 keeps everything
    max_levels: usize,

    /// Open batch between `begin_batch` and `end_batch`
    current_batch: Option<MutationBatch>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Apply `mutation` to `template`; nothing is recorded when it fails
    pub fn apply(
        &mut self,
        mutation: &Mutation,
        template: &mut Template,
    ) -> Result<(), MutationError> {
        let inverse = mutation.to_inverse(template)?;

        mutation.apply(template)?;

        if let Some(batch) = &mut self.current_batch {
            batch.mutations.push(mutation.clone());
            batch.inverses.insert(0, inverse);
        } else {
            self.push_batch(MutationBatch::single(mutation.clone(), inverse));
        }

        Ok(())
    }

    /// Group the following mutations into one undo step
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(MutationBatch::empty());
    }

    /// Close the open batch; `false` when it recorded nothing
    pub fn end_batch(&mut self) -> bool {
        match self.current_batch.take() {
            Some(batch) if !batch.mutations.is_empty() => {
                self.push_batch(batch);
                true
            }
            _ => false,
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_batch(&mut self, batch: MutationBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the redo tail
        self.redo_stack.clear();
    }

    /// `Ok(false)` when there is nothing to undo
    pub fn undo(&mut self, template: &mut Template) -> Result<bool, MutationError> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(false);
        };

        let result = batch
            .inverses
            .iter()
            .try_for_each(|inverse| inverse.apply(template));
        if let Err(e) = result {
            self.undo_stack.push(batch);
            return Err(e);
        }

        self.redo_stack.push(batch);
        Ok(true)
    }

    pub fn redo(&mut self, template: &mut Template) -> Result<bool, MutationError> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(false);
        };

        let result = batch
            .mutations
            .iter()
            .try_for_each(|mutation| mutation.apply(template));
        if let Err(e) = result {
            self.redo_stack.push(batch);
            return Err(e);
        }

        self.undo_stack.push(batch);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_model::Block;

    fn rename(name: &str) -> Mutation {
        Mutation::RenameTemplate {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_fresh_stack_is_empty() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert_eq!(stack.max_levels(), 100);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_apply_and_undo_rename() {
        let mut template = Template::new("t", "Before");
        let mut stack = UndoStack::new();

        stack.apply(&rename("After"), &mut template).unwrap();
        assert_eq!(template.name, "After");
        assert_eq!(stack.undo_description(), Some("rename_template"));

        assert!(stack.undo(&mut template).unwrap());
        assert_eq!(template.name, "Before");
        assert!(stack.can_redo());

        assert!(stack.redo(&mut template).unwrap());
        assert_eq!(template.name, "After");
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_undo_past_oldest_is_noop() {
        let mut template = Template::new("t", "T");
        let mut stack = UndoStack::new();

        assert!(!stack.undo(&mut template).unwrap());
        assert!(!stack.redo(&mut template).unwrap());
    }

    #[test]
    fn test_batch_undoes_as_one_step() {
        let mut template = Template::new("t", "T");
        let mut stack = UndoStack::new();

        stack.begin_batch();
        stack.set_batch_description("Scaffold");
        for id in ["a", "b", "c"] {
            let mutation = Mutation::InsertBlock {
                parent_id: None,
                index: None,
                block: Block::container(id, vec![]),
            };
            stack.apply(&mutation, &mut template).unwrap();
        }
        assert!(stack.end_batch());

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Scaffold"));

        stack.undo(&mut template).unwrap();
        assert!(template.blocks.is_empty());
    }

    #[test]
    fn test_empty_batch_not_recorded() {
        let mut stack = UndoStack::new();
        stack.begin_batch();
        assert!(!stack.end_batch());
        assert_eq!(stack.undo_levels(), 0);
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let mut template = Template::new("t", "v0");
        let mut stack = UndoStack::new();

        stack.apply(&rename("v1"), &mut template).unwrap();
        stack.undo(&mut template).unwrap();
        assert_eq!(stack.redo_levels(), 1);

        stack.apply(&rename("v2"), &mut template).unwrap();
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut template = Template::new("t", "v0");
        let mut stack = UndoStack::with_max_levels(2);

        for i in 1..=3 {
            stack.apply(&rename(&format!("v{}", i)), &mut template).unwrap();
        }

        assert_eq!(stack.undo_levels(), 2);
        stack.undo(&mut template).unwrap();
        stack.undo(&mut template).unwrap();
        assert_eq!(template.name, "v1");
    }

    #[test]
    fn test_failed_apply_is_not_recorded() {
        let mut template = Template::new("t", "T");
        let mut stack = UndoStack::new();

        let result = stack.apply(
            &Mutation::RemoveBlock {
                block_id: "missing".to_string(),
            },
            &mut template,
        );

        assert!(result.is_err());
        assert_eq!(stack.undo_levels(), 0);
    }
}
