//! # Stencil Grid
//!
//! Merge-grid bookkeeping for table blocks.
//!
//! A table keeps a full `rows × columns` grid of cells. Merges are stored as
//! anchor records (`CellMerge`) that must never overlap; the cells they cover
//! stay in the grid but are skipped when rendering. [`merge`] holds the pure
//! arithmetic over merge records and selections, [`table_ops`] applies it to
//! a `TableBlock`.

pub mod error;
pub mod merge;
pub mod table_ops;

pub use error::{GridError, GridResult};
pub use merge::{
    can_merge, cell_slot_name, expand_selection_for_merges, find_merge_at, is_cell_covered,
    normalize_selection, parse_cell_name, shift_merges_for_col_insert,
    shift_merges_for_col_remove, shift_merges_for_row_insert, shift_merges_for_row_remove,
};
pub use table_ops::{
    insert_column, insert_row, merge_cells, remove_column, remove_row, sync_cell_spans,
    unmerge_cell,
};
