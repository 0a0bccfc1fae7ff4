//! Table block, merge records and selections
//!
//! The editing grid is always full: every row holds one cell per logical
//! column. `CellMerge` records are authoritative for merges; cell
//! `colSpan`/`rowSpan` are the rendered shape derived from them.

use crate::block::{Block, BlockId};
use crate::error::{ModelError, ModelResult};
use crate::id::IdGenerator;
use crate::styles::Styles;
use serde::{Deserialize, Serialize};

fn one() -> usize {
    1
}

fn is_one(value: &usize) -> bool {
    *value == 1
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Which cell borders are drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    All,
    Horizontal,
    Vertical,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub id: String,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub col_span: usize,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub row_span: usize,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(default)]
    pub children: Vec<Block>,
}

impl TableCell {
    pub fn new(ids: &mut IdGenerator) -> Self {
        Self {
            id: ids.new_id(),
            col_span: 1,
            row_span: 1,
            styles: Styles::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_header: bool,
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn new(columns: usize, ids: &mut IdGenerator) -> Self {
        Self {
            id: ids.new_id(),
            is_header: false,
            cells: (0..columns).map(|_| TableCell::new(ids)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(default)]
    pub border_style: BorderStyle,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub merges: Vec<CellMerge>,
}

impl TableBlock {
    /// Empty `rows` × `columns` grid without merges
    pub fn with_grid(
        id: impl Into<String>,
        rows: usize,
        columns: usize,
        ids: &mut IdGenerator,
    ) -> Self {
        Self {
            id: id.into(),
            styles: Styles::new(),
            border_style: BorderStyle::All,
            rows: (0..rows).map(|_| TableRow::new(columns, ids)).collect(),
            merges: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Logical column count (widest row)
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Every merge spans more than one cell, stays inside the grid and
    /// overlaps no other merge
    pub fn check_merges(&self) -> ModelResult<()> {
        let rows = self.row_count();
        let cols = self.column_count();
        let invalid = |merge: &CellMerge, problem: &str| ModelError::InvalidMerge {
            table_id: self.id.clone(),
            message: format!("merge at ({}, {}) {}", merge.row, merge.col, problem),
        };

        for (i, merge) in self.merges.iter().enumerate() {
            if merge.row_span * merge.col_span <= 1 {
                return Err(invalid(merge, "is degenerate"));
            }
            if merge.end_row() >= rows || merge.end_col() >= cols {
                return Err(invalid(merge, "exceeds the table"));
            }
            if self.merges[i + 1..]
                .iter()
                .any(|other| other.bounds().intersects(&merge.bounds()))
            {
                return Err(invalid(merge, "overlaps another merge"));
            }
        }
        Ok(())
    }
}

/// Authoritative merge record: anchor cell plus spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellMerge {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl CellMerge {
    pub fn new(row: usize, col: usize, row_span: usize, col_span: usize) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
        }
    }

    /// Last row inside the merge (inclusive)
    pub fn end_row(&self) -> usize {
        self.row + self.row_span.saturating_sub(1)
    }

    /// Last column inside the merge (inclusive)
    pub fn end_col(&self) -> usize {
        self.col + self.col_span.saturating_sub(1)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row && row <= self.end_row() && col >= self.col && col <= self.end_col()
    }

    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        self.row == row && self.col == col
    }

    pub fn bounds(&self) -> Selection {
        Selection::new(self.row, self.col, self.end_row(), self.end_col())
    }

    pub fn from_selection(selection: &Selection) -> Self {
        let sel = selection.normalized();
        Self::new(
            sel.start_row,
            sel.start_col,
            sel.end_row - sel.start_row + 1,
            sel.end_col - sel.start_col + 1,
        )
    }
}

/// Rectangular cell selection (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl Selection {
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    pub fn single(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    /// Same selection with `start <= end` on both axes
    pub fn normalized(&self) -> Self {
        Self {
            start_row: self.start_row.min(self.end_row),
            start_col: self.start_col.min(self.end_col),
            end_row: self.start_row.max(self.end_row),
            end_col: self.start_col.max(self.end_col),
        }
    }

    pub fn is_single_cell(&self) -> bool {
        self.start_row == self.end_row && self.start_col == self.end_col
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    pub fn intersects(&self, other: &Selection) -> bool {
        self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_col <= other.end_col
            && other.start_col <= self.end_col
    }

    pub fn contains_selection(&self, other: &Selection) -> bool {
        self.start_row <= other.start_row
            && self.start_col <= other.start_col
            && self.end_row >= other.end_row
            && self.end_col >= other.end_col
    }

    /// Smallest selection covering both
    pub fn union(&self, other: &Selection) -> Selection {
        Selection::new(
            self.start_row.min(other.start_row),
            self.start_col.min(other.start_col),
            self.end_row.max(other.end_row),
            self.end_col.max(other.end_col),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_geometry() {
        let merge = CellMerge::new(1, 1, 2, 3);
        assert_eq!(merge.end_row(), 2);
        assert_eq!(merge.end_col(), 3);
        assert!(merge.contains(2, 3));
        assert!(!merge.contains(3, 3));
        assert!(merge.is_anchor(1, 1));
    }

    #[test]
    fn test_selection_normalization() {
        let sel = Selection::new(3, 4, 1, 0).normalized();
        assert_eq!(sel, Selection::new(1, 0, 3, 4));
    }

    #[test]
    fn test_merge_serializes_camel_case_spans() {
        let value = serde_json::to_value(CellMerge::new(0, 1, 2, 3)).unwrap();
        assert_eq!(value, json!({ "row": 0, "col": 1, "rowSpan": 2, "colSpan": 3 }));
    }

    #[test]
    fn test_cell_spans_default_to_one() {
        let cell: TableCell = serde_json::from_str(r#"{ "id": "c" }"#).unwrap();
        assert_eq!(cell.col_span, 1);
        assert_eq!(cell.row_span, 1);
    }

    #[test]
    fn test_with_grid_builds_full_grid() {
        let mut ids = IdGenerator::new("t");
        let table = TableBlock::with_grid("tbl", 3, 4, &mut ids);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 4);
        assert!(table.cell(2, 3).is_some());
    }
}
