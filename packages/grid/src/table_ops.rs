//! Structural table operations
//!
//! Each operation validates first and only then touches the table, so a
//! returned error always leaves the table unchanged.

use crate::error::{GridError, GridResult};
use crate::merge::{
    can_merge, expand_selection_for_merges, find_merge_at, shift_merges_for_col_insert,
    shift_merges_for_col_remove, shift_merges_for_row_insert, shift_merges_for_row_remove,
};
use stencil_model::{CellMerge, IdGenerator, Selection, TableBlock, TableCell, TableRow};
use tracing::debug;

/// Insert an empty row at `at` (`at == row_count` appends)
pub fn insert_row(table: &mut TableBlock, at: usize, ids: &mut IdGenerator) -> GridResult<()> {
    let len = table.row_count();
    if at > len {
        return Err(GridError::RowOutOfBounds { index: at, len });
    }

    let columns = table.column_count().max(1);
    table.rows.insert(at, TableRow::new(columns, ids));
    table.merges = shift_merges_for_row_insert(&table.merges, at);
    sync_cell_spans(table);

    debug!(table_id = %table.id, at, "Inserted table row");
    Ok(())
}

pub fn remove_row(table: &mut TableBlock, at: usize) -> GridResult<TableRow> {
    let len = table.row_count();
    if at >= len {
        return Err(GridError::RowOutOfBounds { index: at, len });
    }
    if len <= 1 {
        return Err(GridError::LastRow);
    }

    let row = table.rows.remove(at);
    table.merges = shift_merges_for_row_remove(&table.merges, at);
    sync_cell_spans(table);

    debug!(table_id = %table.id, at, "Removed table row");
    Ok(row)
}

/// Insert an empty column at `at` (`at == column_count` appends)
pub fn insert_column(table: &mut TableBlock, at: usize, ids: &mut IdGenerator) -> GridResult<()> {
    let len = table.column_count();
    if at > len {
        return Err(GridError::ColumnOutOfBounds { index: at, len });
    }

    for row in &mut table.rows {
        let index = at.min(row.cells.len());
        row.cells.insert(index, TableCell::new(ids));
    }
    table.merges = shift_merges_for_col_insert(&table.merges, at);
    sync_cell_spans(table);

    debug!(table_id = %table.id, at, "Inserted table column");
    Ok(())
}

/// Remove column `at`, returning the removed cells top to bottom
pub fn remove_column(table: &mut TableBlock, at: usize) -> GridResult<Vec<TableCell>> {
    let len = table.column_count();
    if at >= len {
        return Err(GridError::ColumnOutOfBounds { index: at, len });
    }
    if len <= 1 {
        return Err(GridError::LastColumn);
    }

    let removed = table
        .rows
        .iter_mut()
        .filter(|row| at < row.cells.len())
        .map(|row| row.cells.remove(at))
        .collect();
    table.merges = shift_merges_for_col_remove(&table.merges, at);
    sync_cell_spans(table);

    debug!(table_id = %table.id, at, "Removed table column");
    Ok(removed)
}

/// Merge the cells under `selection`.
///
/// The selection is first expanded over any merge it touches; merges it
/// then contains are replaced by the new one. Content of covered cells is
/// kept and reappears on unmerge.
pub fn merge_cells(table: &mut TableBlock, selection: &Selection) -> GridResult<CellMerge> {
    let sel = selection.normalized();
    check_bounds(table, sel.end_row, sel.end_col)?;

    let expanded = expand_selection_for_merges(&sel, &table.merges);
    if expanded.is_single_cell() {
        return Err(GridError::SingleCell);
    }
    if !can_merge(
        expanded.start_row,
        expanded.start_col,
        expanded.end_row,
        expanded.end_col,
        &table.merges,
    ) {
        return Err(GridError::PartialOverlap);
    }

    let merge = CellMerge::from_selection(&expanded);
    table
        .merges
        .retain(|existing| !expanded.contains_selection(&existing.bounds()));
    table.merges.push(merge);
    sync_cell_spans(table);

    debug!(
        table_id = %table.id,
        row = merge.row,
        col = merge.col,
        row_span = merge.row_span,
        col_span = merge.col_span,
        "Merged cells"
    );
    Ok(merge)
}

/// Remove the merge containing `(row, col)`
pub fn unmerge_cell(table: &mut TableBlock, row: usize, col: usize) -> GridResult<CellMerge> {
    let merge = *find_merge_at(row, col, &table.merges).ok_or(GridError::NoMergeAt { row, col })?;
    table.merges.retain(|existing| *existing != merge);
    sync_cell_spans(table);

    debug!(table_id = %table.id, row, col, "Unmerged cells");
    Ok(merge)
}

/// Re-derive rendered cell spans from the merge records
pub fn sync_cell_spans(table: &mut TableBlock) {
    for row in &mut table.rows {
        for cell in &mut row.cells {
            cell.row_span = 1;
            cell.col_span = 1;
        }
    }

    let merges = table.merges.clone();
    for merge in merges {
        if let Some(cell) = table.cell_mut(merge.row, merge.col) {
            cell.row_span = merge.row_span;
            cell.col_span = merge.col_span;
        }
    }
}

fn check_bounds(table: &TableBlock, row: usize, col: usize) -> GridResult<()> {
    let rows = table.row_count();
    if row >= rows {
        return Err(GridError::RowOutOfBounds { index: row, len: rows });
    }
    let cols = table.column_count();
    if col >= cols {
        return Err(GridError::ColumnOutOfBounds { index: col, len: cols });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> (TableBlock, IdGenerator) {
        let mut ids = IdGenerator::new("grid");
        let table = TableBlock::with_grid("tbl", rows, cols, &mut ids);
        (table, ids)
    }

    #[test]
    fn test_merge_sets_anchor_spans() {
        let (mut table, _) = grid(3, 3);
        let merge = merge_cells(&mut table, &Selection::new(1, 1, 0, 0)).unwrap();

        assert_eq!(merge, CellMerge::new(0, 0, 2, 2));
        assert_eq!(table.rows[0].cells[0].row_span, 2);
        assert_eq!(table.rows[0].cells[0].col_span, 2);
        assert_eq!(table.rows[1].cells[1].col_span, 1);
    }

    #[test]
    fn test_merge_single_cell_rejected() {
        let (mut table, _) = grid(2, 2);
        let before = table.clone();

        assert_eq!(
            merge_cells(&mut table, &Selection::single(0, 0)),
            Err(GridError::SingleCell)
        );
        assert_eq!(table, before);
    }

    #[test]
    fn test_merge_absorbs_touched_merges() {
        let (mut table, _) = grid(3, 3);
        merge_cells(&mut table, &Selection::new(1, 1, 2, 2)).unwrap();

        let merge = merge_cells(&mut table, &Selection::new(0, 0, 1, 1)).unwrap();
        assert_eq!(merge, CellMerge::new(0, 0, 3, 3));
        assert_eq!(table.merges, vec![merge]);
    }

    #[test]
    fn test_merge_out_of_bounds() {
        let (mut table, _) = grid(2, 2);
        assert!(matches!(
            merge_cells(&mut table, &Selection::new(0, 0, 2, 0)),
            Err(GridError::RowOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_unmerge_restores_spans() {
        let (mut table, _) = grid(2, 2);
        merge_cells(&mut table, &Selection::new(0, 0, 1, 1)).unwrap();

        let removed = unmerge_cell(&mut table, 1, 1).unwrap();
        assert_eq!(removed, CellMerge::new(0, 0, 2, 2));
        assert!(table.merges.is_empty());
        assert_eq!(table.rows[0].cells[0].row_span, 1);

        assert_eq!(
            unmerge_cell(&mut table, 0, 0),
            Err(GridError::NoMergeAt { row: 0, col: 0 })
        );
    }

    #[test]
    fn test_row_insert_keeps_grid_full_and_grows_merge() {
        let (mut table, mut ids) = grid(2, 3);
        merge_cells(&mut table, &Selection::new(0, 0, 1, 0)).unwrap();

        insert_row(&mut table, 1, &mut ids).unwrap();

        assert_eq!(table.row_count(), 3);
        assert!(table.rows.iter().all(|row| row.cells.len() == 3));
        assert_eq!(table.merges, vec![CellMerge::new(0, 0, 3, 1)]);
        assert_eq!(table.rows[0].cells[0].row_span, 3);
    }

    #[test]
    fn test_remove_last_row_and_column_rejected() {
        let (mut table, _) = grid(1, 1);
        assert_eq!(remove_row(&mut table, 0), Err(GridError::LastRow));
        assert_eq!(remove_column(&mut table, 0), Err(GridError::LastColumn));
    }

    #[test]
    fn test_column_remove_shrinks_merge_to_nothing() {
        let (mut table, _) = grid(2, 3);
        merge_cells(&mut table, &Selection::new(0, 1, 0, 2)).unwrap();

        let removed = remove_column(&mut table, 2).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(table.merges.is_empty());
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows[0].cells[1].col_span, 1);
    }

    #[test]
    fn test_insert_column_appends() {
        let (mut table, mut ids) = grid(2, 2);
        insert_column(&mut table, 2, &mut ids).unwrap();
        assert_eq!(table.column_count(), 3);

        assert!(matches!(
            insert_column(&mut table, 9, &mut ids),
            Err(GridError::ColumnOutOfBounds { index: 9, len: 3 })
        ));
    }
}
