//! # Template Mutations
//!
//! Structural operations on a template's block tree.
//!
//! ## Design Principles
//!
//! 1. **Validated**: every mutation checks structural constraints before it
//!    touches the tree (existence, capability sets, cycles, id uniqueness)
//! 2. **Invertible**: `to_inverse` is computed against the pre-mutation tree
//!    and restores it exactly when applied after the mutation
//! 3. **Deterministic**: ids a mutation generates depend only on the tree it
//!    is applied to, so redo reproduces the same ids
//!
//! ## Mutation Semantics
//!
//! ### MoveBlock
//! - `target_index` addresses the target list after the block is detached
//! - Fails if the target slot is the block itself or one of its descendants
//! - Fails if the move would leave the block where it is
//!
//! ### UpdateBlock
//! - Shallow merge of `partial` into the block's own JSON fields
//! - `id`, `type` and `children` are protected and ignored
//! - The merged value must decode as a block of the same type

use crate::capability;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use stencil_grid::{self as grid, GridError};
use stencil_model::{
    collect_ids, Block, BlockKind, Column, ColumnsBlock, IdGenerator, PageSettings, Selection,
    Styles, TableBlock, Template,
};
use thiserror::Error;
use tracing::debug;

const PROTECTED_FIELDS: [&str; 3] = ["id", "type", "children"];

/// Structural mutations (the only way the tree changes)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a block (with its subtree) into a slot; root when `parent_id` is `None`
    InsertBlock {
        parent_id: Option<String>,
        index: Option<usize>,
        block: Block,
    },

    MoveBlock {
        block_id: String,
        target_parent_id: Option<String>,
        target_index: usize,
    },

    /// Remove a block and all of its descendants
    RemoveBlock { block_id: String },

    UpdateBlock {
        block_id: String,
        partial: Map<String, Value>,
    },

    /// Swap a block for another with the same id (inverse of in-place edits)
    ReplaceBlock { block_id: String, block: Block },

    InsertTableRow { table_id: String, at: usize },
    RemoveTableRow { table_id: String, at: usize },
    InsertTableColumn { table_id: String, at: usize },
    RemoveTableColumn { table_id: String, at: usize },
    MergeCells { table_id: String, selection: Selection },
    UnmergeCell { table_id: String, row: usize, col: usize },

    /// Add a column to a `columns` block
    AddColumn {
        block_id: String,
        index: Option<usize>,
    },
    RemoveColumn { block_id: String, column_id: String },

    SetDocumentStyles { styles: Styles },
    SetPageSettings { settings: PageSettings },
    RenameTemplate { name: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("'{parent}' does not accept '{child}' blocks")]
    NotAllowed { parent: String, child: BlockKind },

    #[error("Move would leave the block where it is")]
    NoOpMove,

    #[error("Update would not change the block")]
    NoChange,

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Unknown block types cannot be edited")]
    UnknownBlock,

    #[error("Block is not a table: {0}")]
    NotATable(String),

    #[error("Block is not a columns block: {0}")]
    NotColumns(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Cannot remove the last column of a columns block")]
    LastColumn,

    #[error("Table error: {0}")]
    Grid(#[from] GridError),
}

impl Mutation {
    /// Apply mutation to the template with validation
    pub fn apply(&self, template: &mut Template) -> Result<(), MutationError> {
        self.validate(template)?;

        match self {
            Mutation::InsertBlock {
                parent_id,
                index,
                block,
            } => {
                template
                    .insert_block(parent_id.as_deref(), *index, block.clone())
                    .map_err(|_| MutationError::ParentNotFound(slot_name(parent_id.as_deref())))?;
                Ok(())
            }

            Mutation::MoveBlock {
                block_id,
                target_parent_id,
                target_index,
            } => {
                let (block, _) = template
                    .take_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                template
                    .insert_block(target_parent_id.as_deref(), Some(*target_index), block)
                    .map_err(|_| {
                        MutationError::ParentNotFound(slot_name(target_parent_id.as_deref()))
                    })?;
                Ok(())
            }

            Mutation::RemoveBlock { block_id } => {
                template
                    .take_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(())
            }

            Mutation::UpdateBlock { block_id, partial } => {
                let updated = Self::updated_block(template, block_id, partial)?;
                Self::replace(template, block_id, updated)
            }

            Mutation::ReplaceBlock { block_id, block } => {
                Self::replace(template, block_id, block.clone())
            }

            Mutation::InsertTableRow { table_id, at } => {
                let mut ids = IdGenerator::for_template(template);
                grid::insert_row(Self::table_mut(template, table_id)?, *at, &mut ids)?;
                Ok(())
            }

            Mutation::RemoveTableRow { table_id, at } => {
                grid::remove_row(Self::table_mut(template, table_id)?, *at)?;
                Ok(())
            }

            Mutation::InsertTableColumn { table_id, at } => {
                let mut ids = IdGenerator::for_template(template);
                grid::insert_column(Self::table_mut(template, table_id)?, *at, &mut ids)?;
                Ok(())
            }

            Mutation::RemoveTableColumn { table_id, at } => {
                grid::remove_column(Self::table_mut(template, table_id)?, *at)?;
                Ok(())
            }

            Mutation::MergeCells {
                table_id,
                selection,
            } => {
                grid::merge_cells(Self::table_mut(template, table_id)?, selection)?;
                Ok(())
            }

            Mutation::UnmergeCell { table_id, row, col } => {
                grid::unmerge_cell(Self::table_mut(template, table_id)?, *row, *col)?;
                Ok(())
            }

            Mutation::AddColumn { block_id, index } => {
                let mut ids = IdGenerator::for_template(template);
                let columns = Self::columns_mut(template, block_id)?;
                let len = columns.columns.len();
                let index = index.map_or(len, |i| i.min(len));
                columns.columns.insert(index, Column::new(&mut ids));
                Ok(())
            }

            Mutation::RemoveColumn {
                block_id,
                column_id,
            } => {
                let columns = Self::columns_mut(template, block_id)?;
                let index = columns
                    .columns
                    .iter()
                    .position(|c| &c.id == column_id)
                    .ok_or_else(|| MutationError::ColumnNotFound(column_id.clone()))?;
                if columns.columns.len() <= 1 {
                    return Err(MutationError::LastColumn);
                }
                columns.columns.remove(index);
                Ok(())
            }

            Mutation::SetDocumentStyles { styles } => {
                template.document_styles = styles.clone();
                Ok(())
            }

            Mutation::SetPageSettings { settings } => {
                template.page_settings = *settings;
                Ok(())
            }

            Mutation::RenameTemplate { name } => {
                template.name = name.clone();
                Ok(())
            }
        }
    }

    /// Validate without applying
    pub fn validate(&self, template: &Template) -> Result<(), MutationError> {
        match self {
            Mutation::InsertBlock {
                parent_id, block, ..
            } => {
                let kind = block.kind().ok_or(MutationError::UnknownBlock)?;
                Self::check_capability(template, parent_id.as_deref(), kind)?;
                Self::check_unique_ids(template, None, block)
            }

            Mutation::MoveBlock {
                block_id,
                target_parent_id,
                target_index,
            } => {
                let target = target_parent_id.as_deref();
                let block = template
                    .find_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                let kind = block.kind().ok_or(MutationError::UnknownBlock)?;
                let location = template
                    .locate(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                let target_len = template
                    .find_slot(target)
                    .map(|slot| slot.children.len())
                    .ok_or_else(|| MutationError::ParentNotFound(slot_name(target)))?;

                if target == Some(block_id.as_str())
                    || template
                        .slot_ancestors(target)
                        .iter()
                        .any(|ancestor| ancestor == block_id)
                {
                    return Err(MutationError::CycleDetected);
                }

                Self::check_capability(template, target, kind)?;

                if location.parent.as_deref() == target {
                    let len_after_detach = target_len.saturating_sub(1);
                    if location.index == (*target_index).min(len_after_detach) {
                        return Err(MutationError::NoOpMove);
                    }
                }
                Ok(())
            }

            Mutation::RemoveBlock { block_id } => {
                template
                    .find_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(())
            }

            Mutation::UpdateBlock { block_id, partial } => {
                Self::updated_block(template, block_id, partial)?;
                Ok(())
            }

            Mutation::ReplaceBlock { block_id, block } => {
                let current = template
                    .find_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                if block.id() != Some(block_id.as_str()) {
                    return Err(MutationError::InvalidBlock(format!(
                        "replacement for '{}' must keep its id",
                        block_id
                    )));
                }
                Self::check_unique_ids(template, Some(current), block)
            }

            Mutation::InsertTableRow { table_id, .. }
            | Mutation::RemoveTableRow { table_id, .. }
            | Mutation::InsertTableColumn { table_id, .. }
            | Mutation::RemoveTableColumn { table_id, .. }
            | Mutation::MergeCells { table_id, .. }
            | Mutation::UnmergeCell { table_id, .. } => {
                template
                    .find_block(table_id)
                    .ok_or_else(|| MutationError::BlockNotFound(table_id.clone()))?
                    .as_table()
                    .ok_or_else(|| MutationError::NotATable(table_id.clone()))?;
                Ok(())
            }

            Mutation::AddColumn { block_id, .. } | Mutation::RemoveColumn { block_id, .. } => {
                match template.find_block(block_id) {
                    Some(Block::Columns(_)) => Ok(()),
                    Some(_) => Err(MutationError::NotColumns(block_id.clone())),
                    None => Err(MutationError::BlockNotFound(block_id.clone())),
                }
            }

            Mutation::SetDocumentStyles { .. }
            | Mutation::SetPageSettings { .. }
            | Mutation::RenameTemplate { .. } => Ok(()),
        }
    }

    /// Mutation that undoes `self`, computed against the tree before `self` is applied
    pub fn to_inverse(&self, template: &Template) -> Result<Mutation, MutationError> {
        match self {
            Mutation::InsertBlock { block, .. } => {
                let block_id = block.id().ok_or(MutationError::UnknownBlock)?;
                Ok(Mutation::RemoveBlock {
                    block_id: block_id.to_string(),
                })
            }

            Mutation::MoveBlock { block_id, .. } => {
                let location = template
                    .locate(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(Mutation::MoveBlock {
                    block_id: block_id.clone(),
                    target_parent_id: location.parent,
                    target_index: location.index,
                })
            }

            Mutation::RemoveBlock { block_id } => {
                let location = template
                    .locate(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                let block = template
                    .find_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(Mutation::InsertBlock {
                    parent_id: location.parent,
                    index: Some(location.index),
                    block: block.clone(),
                })
            }

            Mutation::UpdateBlock { block_id, .. }
            | Mutation::ReplaceBlock { block_id, .. }
            | Mutation::AddColumn { block_id, .. }
            | Mutation::RemoveColumn { block_id, .. }
            | Mutation::InsertTableRow {
                table_id: block_id, ..
            }
            | Mutation::RemoveTableRow {
                table_id: block_id, ..
            }
            | Mutation::InsertTableColumn {
                table_id: block_id, ..
            }
            | Mutation::RemoveTableColumn {
                table_id: block_id, ..
            }
            | Mutation::MergeCells {
                table_id: block_id, ..
            }
            | Mutation::UnmergeCell {
                table_id: block_id, ..
            } => {
                let block = template
                    .find_block(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(Mutation::ReplaceBlock {
                    block_id: block_id.clone(),
                    block: block.clone(),
                })
            }

            Mutation::SetDocumentStyles { .. } => Ok(Mutation::SetDocumentStyles {
                styles: template.document_styles.clone(),
            }),

            Mutation::SetPageSettings { .. } => Ok(Mutation::SetPageSettings {
                settings: template.page_settings,
            }),

            Mutation::RenameTemplate { .. } => Ok(Mutation::RenameTemplate {
                name: template.name.clone(),
            }),
        }
    }

    /// Short name for logs and history descriptions
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::InsertBlock { .. } => "insert_block",
            Mutation::MoveBlock { .. } => "move_block",
            Mutation::RemoveBlock { .. } => "remove_block",
            Mutation::UpdateBlock { .. } => "update_block",
            Mutation::ReplaceBlock { .. } => "replace_block",
            Mutation::InsertTableRow { .. } => "insert_table_row",
            Mutation::RemoveTableRow { .. } => "remove_table_row",
            Mutation::InsertTableColumn { .. } => "insert_table_column",
            Mutation::RemoveTableColumn { .. } => "remove_table_column",
            Mutation::MergeCells { .. } => "merge_cells",
            Mutation::UnmergeCell { .. } => "unmerge_cell",
            Mutation::AddColumn { .. } => "add_column",
            Mutation::RemoveColumn { .. } => "remove_column",
            Mutation::SetDocumentStyles { .. } => "set_document_styles",
            Mutation::SetPageSettings { .. } => "set_page_settings",
            Mutation::RenameTemplate { .. } => "rename_template",
        }
    }

    fn check_capability(
        template: &Template,
        parent_id: Option<&str>,
        kind: BlockKind,
    ) -> Result<(), MutationError> {
        let slot = template
            .slot_kind(parent_id)
            .ok_or_else(|| MutationError::ParentNotFound(slot_name(parent_id)))?;

        if capability::accepts(slot, kind) {
            Ok(())
        } else {
            Err(MutationError::NotAllowed {
                parent: slot_name(parent_id),
                child: kind,
            })
        }
    }

    /// Ids introduced by `added` must not collide with ids outside `removed`
    fn check_unique_ids(
        template: &Template,
        removed: Option<&Block>,
        added: &Block,
    ) -> Result<(), MutationError> {
        let mut taken: HashSet<String> = template.collect_ids().into_iter().collect();
        if let Some(removed) = removed {
            for id in collect_ids(std::slice::from_ref(removed)) {
                taken.remove(&id);
            }
        }

        for id in collect_ids(std::slice::from_ref(added)) {
            if !taken.insert(id.clone()) {
                return Err(MutationError::DuplicateId(id));
            }
        }
        Ok(())
    }

    /// Block resulting from shallow-merging `partial` into the current block
    fn updated_block(
        template: &Template,
        block_id: &str,
        partial: &Map<String, Value>,
    ) -> Result<Block, MutationError> {
        let current = template
            .find_block(block_id)
            .ok_or_else(|| MutationError::BlockNotFound(block_id.to_string()))?;

        let mut value = serde_json::to_value(current)
            .map_err(|e| MutationError::InvalidBlock(e.to_string()))?;
        let fields = value
            .as_object_mut()
            .ok_or_else(|| MutationError::InvalidBlock(block_id.to_string()))?;

        for (key, field) in partial {
            if PROTECTED_FIELDS.contains(&key.as_str()) {
                debug!(block_id, field = %key, "Ignoring protected field in update");
                continue;
            }
            fields.insert(key.clone(), field.clone());
        }

        let mut updated: Block =
            serde_json::from_value(value).map_err(|e| MutationError::InvalidBlock(e.to_string()))?;

        if let Some(table) = updated.as_table_mut() {
            table
                .check_merges()
                .map_err(|e| MutationError::InvalidBlock(e.to_string()))?;
            grid::sync_cell_spans(table);
        }

        if &updated == current {
            return Err(MutationError::NoChange);
        }

        Self::check_unique_ids(template, Some(current), &updated)?;
        Ok(updated)
    }

    fn replace(template: &mut Template, block_id: &str, block: Block) -> Result<(), MutationError> {
        let slot = template
            .find_block_mut(block_id)
            .ok_or_else(|| MutationError::BlockNotFound(block_id.to_string()))?;
        *slot = block;
        Ok(())
    }

    fn table_mut<'a>(
        template: &'a mut Template,
        table_id: &str,
    ) -> Result<&'a mut TableBlock, MutationError> {
        template
            .find_block_mut(table_id)
            .ok_or_else(|| MutationError::BlockNotFound(table_id.to_string()))?
            .as_table_mut()
            .ok_or_else(|| MutationError::NotATable(table_id.to_string()))
    }

    fn columns_mut<'a>(
        template: &'a mut Template,
        block_id: &str,
    ) -> Result<&'a mut ColumnsBlock, MutationError> {
        template
            .find_block_mut(block_id)
            .ok_or_else(|| MutationError::BlockNotFound(block_id.to_string()))?
            .as_columns_mut()
            .ok_or_else(|| MutationError::NotColumns(block_id.to_string()))
    }
}

fn slot_name(slot_id: Option<&str>) -> String {
    slot_id.unwrap_or("root").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_model::rich_text;

    fn template() -> Template {
        let mut template = Template::new("t", "T");
        template.blocks = vec![
            Block::container("a", vec![Block::text("a1", rich_text::empty_document())]),
            Block::container("b", vec![]),
        ];
        template
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::MoveBlock {
            block_id: "a1".to_string(),
            target_parent_id: Some("b".to_string()),
            target_index: 0,
        };

        let json = serde_json::to_string(&mutation).unwrap();
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();

        assert_eq!(mutation, deserialized);
    }

    #[test]
    fn test_move_into_self_is_cycle() {
        let template = template();
        let mutation = Mutation::MoveBlock {
            block_id: "a".to_string(),
            target_parent_id: Some("a".to_string()),
            target_index: 0,
        };

        assert_eq!(mutation.validate(&template), Err(MutationError::CycleDetected));
    }

    #[test]
    fn test_same_position_move_is_noop() {
        let template = template();
        let mutation = Mutation::MoveBlock {
            block_id: "b".to_string(),
            target_parent_id: None,
            target_index: 7,
        };

        assert_eq!(mutation.validate(&template), Err(MutationError::NoOpMove));
    }

    #[test]
    fn test_move_inverse_restores_position() {
        let mut template = template();
        let original = template.clone();
        let mutation = Mutation::MoveBlock {
            block_id: "a1".to_string(),
            target_parent_id: Some("b".to_string()),
            target_index: 0,
        };

        let inverse = mutation.to_inverse(&template).unwrap();
        mutation.apply(&mut template).unwrap();
        assert!(template.find_block("b").unwrap().children().unwrap().len() == 1);

        inverse.apply(&mut template).unwrap();
        assert_eq!(template, original);
    }

    #[test]
    fn test_update_ignores_protected_fields() {
        let mut template = template();
        let partial = json!({ "id": "zzz", "styles": { "color": "red" } });
        let mutation = Mutation::UpdateBlock {
            block_id: "a".to_string(),
            partial: partial.as_object().unwrap().clone(),
        };

        mutation.apply(&mut template).unwrap();

        let block = template.find_block("a").unwrap();
        assert_eq!(block.styles().unwrap()["color"], json!("red"));
        assert_eq!(block.children().unwrap().len(), 1);
    }

    #[test]
    fn test_update_rejects_invalid_payload() {
        let template = template();
        let partial = json!({ "children": [], "styles": 5 });
        let mutation = Mutation::UpdateBlock {
            block_id: "a".to_string(),
            partial: partial.as_object().unwrap().clone(),
        };

        assert!(matches!(
            mutation.validate(&template),
            Err(MutationError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_insert_rejects_duplicate_ids() {
        let template = template();
        let mutation = Mutation::InsertBlock {
            parent_id: None,
            index: None,
            block: Block::container("b", vec![]),
        };

        assert_eq!(
            mutation.validate(&template),
            Err(MutationError::DuplicateId("b".to_string()))
        );
    }

    #[test]
    fn test_insert_respects_capabilities() {
        let mut ids = IdGenerator::for_template(&template());
        let mutation = Mutation::InsertBlock {
            parent_id: Some("a".to_string()),
            index: None,
            block: Block::new(BlockKind::PageHeader, &mut ids),
        };

        assert!(matches!(
            mutation.validate(&template()),
            Err(MutationError::NotAllowed { child: BlockKind::PageHeader, .. })
        ));
    }
}
