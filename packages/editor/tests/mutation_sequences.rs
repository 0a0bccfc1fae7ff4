//! Tests for complex mutation sequences
//!
//! This tests:
//! - Add / move / delete chains with undo and redo
//! - Cycle rejection
//! - Table edits through history
//! - Batched mutations

use std::sync::Arc;
use stencil_editor::TemplateStore;
use stencil_model::{Block, BlockKind, Selection, Template};

fn id_of(block: &Block) -> String {
    block.id().unwrap().to_string()
}

#[test]
fn test_add_move_undo_redo_restores_each_point() {
    let mut store = TemplateStore::new(Template::new("seq", "Sequence"));

    let container = store.add_block(BlockKind::Container, None, None).unwrap();
    let text = store.add_block(BlockKind::Text, None, None).unwrap();
    let after_add: Arc<Template> = store.template();

    assert!(store.move_block(&id_of(&text), Some(&id_of(&container)), 0));
    let after_move = store.template();
    assert_eq!(after_move.blocks.len(), 1);

    assert!(store.undo());
    assert_eq!(*store.template(), *after_add);

    assert!(store.redo());
    assert_eq!(*store.template(), *after_move);

    // undo everything, then redo everything
    while store.undo() {}
    assert!(store.template().blocks.is_empty());
    while store.redo() {}
    assert_eq!(*store.template(), *after_move);
}

#[test]
fn test_move_into_descendant_leaves_tree_unchanged() {
    let mut store = TemplateStore::new(Template::new("cycle", "Cycle"));

    let outer = store.add_block(BlockKind::Container, None, None).unwrap();
    let middle = store
        .add_block(BlockKind::Conditional, Some(&id_of(&outer)), None)
        .unwrap();
    let inner = store
        .add_block(BlockKind::Loop, Some(&id_of(&middle)), None)
        .unwrap();

    let before = store.template();
    let levels = store.history().undo_levels();

    assert!(!store.move_block(&id_of(&outer), Some(&id_of(&inner)), 0));
    assert!(!store.move_block(&id_of(&outer), Some(&id_of(&outer)), 0));

    assert_eq!(*store.template(), *before);
    assert_eq!(store.history().undo_levels(), levels);
}

#[test]
fn test_move_table_into_its_own_cell_rejected() {
    let mut store = TemplateStore::new(Template::new("tbl", "Table"));
    let table = store.add_block(BlockKind::Table, None, None).unwrap();
    let cell_id = table.as_table().unwrap().rows[0].cells[0].id.clone();

    assert!(!store.move_block(&id_of(&table), Some(&cell_id), 0));

    let text = store.add_block(BlockKind::Text, Some(&cell_id), None).unwrap();
    assert!(store.template().find_block(&id_of(&text)).is_some());

    // tables cannot nest in cells
    assert!(store.add_block(BlockKind::Table, Some(&cell_id), None).is_none());
}

#[test]
fn test_noop_move_creates_no_history() {
    let mut store = TemplateStore::new(Template::new("noop", "Noop"));
    let a = store.add_block(BlockKind::Container, None, None).unwrap();
    store.add_block(BlockKind::Container, None, None).unwrap();

    let levels = store.history().undo_levels();
    let version = store.version();
    assert!(!store.move_block(&id_of(&a), None, 0));
    assert_eq!(store.history().undo_levels(), levels);
    assert_eq!(store.version(), version);

    // moving to the end is a real move
    assert!(store.move_block(&id_of(&a), None, 1));
    assert_eq!(store.template().blocks[1].id(), a.id());
}

#[test]
fn test_delete_cascades_and_undo_restores_subtree() {
    let mut store = TemplateStore::new(Template::new("del", "Delete"));
    let outer = store.add_block(BlockKind::Container, None, None).unwrap();
    let child = store
        .add_block(BlockKind::Text, Some(&id_of(&outer)), None)
        .unwrap();
    let before = store.template();

    assert!(store.delete_block(&id_of(&outer)));
    assert!(store.template().find_block(&id_of(&child)).is_none());
    assert!(!store.delete_block(&id_of(&outer)));

    assert!(store.undo());
    assert_eq!(*store.template(), *before);
}

#[test]
fn test_table_edits_redo_with_identical_ids() {
    let mut store = TemplateStore::new(Template::new("grid", "Grid"));
    let table = store.add_block(BlockKind::Table, None, None).unwrap();
    let table_id = id_of(&table);

    assert!(store.insert_table_row(&table_id, 2));
    assert!(store.insert_table_column(&table_id, 0));
    assert!(store.merge_cells(&table_id, Selection::new(0, 0, 1, 1)));
    let edited = store.template();

    assert!(!store.merge_cells(&table_id, Selection::single(2, 2)));
    assert!(!store.remove_table_row(&table_id, 9));

    for _ in 0..3 {
        assert!(store.undo());
    }
    assert_eq!(store.template().find_block(&table_id), Some(&table));

    for _ in 0..3 {
        assert!(store.redo());
    }
    assert_eq!(*store.template(), *edited);
}

#[test]
fn test_columns_block_add_and_remove_column() {
    let mut store = TemplateStore::new(Template::new("cols", "Columns"));
    let columns = store.add_block(BlockKind::Columns, None, None).unwrap();
    let columns_id = id_of(&columns);

    assert!(store.add_column(&columns_id, Some(0)));
    let column_ids: Vec<String> = match store.template().find_block(&columns_id) {
        Some(Block::Columns(b)) => b.columns.iter().map(|c| c.id.clone()).collect(),
        _ => panic!("Expected columns block"),
    };
    assert_eq!(column_ids.len(), 3);

    assert!(store.remove_column(&columns_id, &column_ids[0]));
    assert!(store.remove_column(&columns_id, &column_ids[1]));
    assert!(!store.remove_column(&columns_id, &column_ids[2]));
    assert!(!store.add_column("missing", None));
}

#[test]
fn test_batch_undoes_as_one_step() {
    let mut store = TemplateStore::new(Template::new("batch", "Batch"));

    store.begin_batch("Scaffold page");
    store.add_block(BlockKind::PageHeader, None, None).unwrap();
    store.add_block(BlockKind::Container, None, None).unwrap();
    store.add_block(BlockKind::PageFooter, None, None).unwrap();
    assert!(store.end_batch());

    assert_eq!(store.history().undo_levels(), 1);
    assert_eq!(store.history().undo_description(), Some("Scaffold page"));

    assert!(store.undo());
    assert!(store.template().blocks.is_empty());
    assert!(store.redo());
    assert_eq!(store.template().blocks.len(), 3);
}

#[test]
fn test_new_mutation_after_undo_truncates_redo() {
    let mut store = TemplateStore::new(Template::new("trunc", "Truncate"));
    store.add_block(BlockKind::Container, None, None).unwrap();
    store.add_block(BlockKind::Container, None, None).unwrap();

    assert!(store.undo());
    assert!(store.can_redo());

    store.add_block(BlockKind::Text, None, None).unwrap();
    assert!(!store.can_redo());
    assert!(!store.redo());
}
