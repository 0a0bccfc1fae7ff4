//! Pure merge-record arithmetic
//!
//! Everything here works on plain `CellMerge` slices and returns new vectors;
//! the table operations in [`crate::table_ops`] apply the results.

use stencil_model::{CellMerge, Selection};

/// Stable slot name of a grid cell
pub fn cell_slot_name(row: usize, col: usize) -> String {
    format!("cell-{}-{}", row, col)
}

/// Inverse of [`cell_slot_name`]
pub fn parse_cell_name(name: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix("cell-")?;
    let (row, col) = rest.split_once('-')?;
    if !is_plain_number(row) || !is_plain_number(col) {
        return None;
    }
    Some((row.parse().ok()?, col.parse().ok()?))
}

fn is_plain_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Merge whose anchor or covered region contains the cell
pub fn find_merge_at(row: usize, col: usize, merges: &[CellMerge]) -> Option<&CellMerge> {
    merges.iter().find(|m| m.contains(row, col))
}

/// True for cells hidden under another cell's merge (never for anchors)
pub fn is_cell_covered(row: usize, col: usize, merges: &[CellMerge]) -> bool {
    merges
        .iter()
        .any(|m| m.contains(row, col) && !m.is_anchor(row, col))
}

pub fn normalize_selection(selection: &Selection) -> Selection {
    selection.normalized()
}

/// A selection can become a merge when it spans more than one cell and every
/// existing merge is either disjoint from it or entirely inside it.
pub fn can_merge(
    start_row: usize,
    start_col: usize,
    end_row: usize,
    end_col: usize,
    merges: &[CellMerge],
) -> bool {
    let sel = Selection::new(start_row, start_col, end_row, end_col).normalized();
    if sel.is_single_cell() {
        return false;
    }

    merges.iter().all(|m| {
        let bounds = m.bounds();
        !sel.intersects(&bounds) || sel.contains_selection(&bounds)
    })
}

/// Grow a selection until it fully contains every merge it touches.
///
/// Each productive round absorbs at least one merge not yet contained, so
/// the loop runs at most `merges.len() + 1` times.
pub fn expand_selection_for_merges(selection: &Selection, merges: &[CellMerge]) -> Selection {
    let mut sel = selection.normalized();

    for _ in 0..=merges.len() {
        let mut changed = false;
        for merge in merges {
            let bounds = merge.bounds();
            if sel.intersects(&bounds) && !sel.contains_selection(&bounds) {
                sel = sel.union(&bounds);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    sel
}

#[derive(Clone, Copy)]
enum Axis {
    Row,
    Col,
}

fn span_start(merge: &CellMerge, axis: Axis) -> (usize, usize) {
    match axis {
        Axis::Row => (merge.row, merge.row_span),
        Axis::Col => (merge.col, merge.col_span),
    }
}

fn with_axis(merge: &CellMerge, axis: Axis, start: usize, span: usize) -> CellMerge {
    match axis {
        Axis::Row => CellMerge::new(start, merge.col, span, merge.col_span),
        Axis::Col => CellMerge::new(merge.row, start, merge.row_span, span),
    }
}

fn is_degenerate(merge: &CellMerge) -> bool {
    merge.row_span == 0 || merge.col_span == 0 || (merge.row_span == 1 && merge.col_span == 1)
}

fn shift_for_insert(merges: &[CellMerge], at: usize, axis: Axis) -> Vec<CellMerge> {
    merges
        .iter()
        .map(|merge| {
            let (start, span) = span_start(merge, axis);
            if start >= at {
                with_axis(merge, axis, start + 1, span)
            } else if at < start + span {
                with_axis(merge, axis, start, span + 1)
            } else {
                *merge
            }
        })
        .collect()
}

fn shift_for_remove(merges: &[CellMerge], at: usize, axis: Axis) -> Vec<CellMerge> {
    merges
        .iter()
        .filter_map(|merge| {
            let (start, span) = span_start(merge, axis);
            let shifted = if start > at {
                with_axis(merge, axis, start - 1, span)
            } else if at < start + span {
                if span <= 1 {
                    return None;
                }
                with_axis(merge, axis, start, span - 1)
            } else {
                *merge
            };
            (!is_degenerate(&shifted)).then_some(shifted)
        })
        .collect()
}

/// Adjust merges for a row inserted at index `at`
pub fn shift_merges_for_row_insert(merges: &[CellMerge], at: usize) -> Vec<CellMerge> {
    shift_for_insert(merges, at, Axis::Row)
}

/// Adjust merges for a column inserted at index `at`
pub fn shift_merges_for_col_insert(merges: &[CellMerge], at: usize) -> Vec<CellMerge> {
    shift_for_insert(merges, at, Axis::Col)
}

/// Adjust merges for the row at index `at` being removed
pub fn shift_merges_for_row_remove(merges: &[CellMerge], at: usize) -> Vec<CellMerge> {
    shift_for_remove(merges, at, Axis::Row)
}

/// Adjust merges for the column at index `at` being removed
pub fn shift_merges_for_col_remove(merges: &[CellMerge], at: usize) -> Vec<CellMerge> {
    shift_for_remove(merges, at, Axis::Col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_names_are_inverse() {
        for row in 0..10 {
            for col in 0..10 {
                let name = cell_slot_name(row, col);
                assert_eq!(parse_cell_name(&name), Some((row, col)));
            }
        }
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        assert_eq!(parse_cell_name("cell-1"), None);
        assert_eq!(parse_cell_name("cell--1-2"), None);
        assert_eq!(parse_cell_name("cell-+1-2"), None);
        assert_eq!(parse_cell_name("row-1-2"), None);
    }

    #[test]
    fn test_single_cell_never_mergeable() {
        for row in 0..5 {
            for col in 0..5 {
                assert!(!can_merge(row, col, row, col, &[]));
            }
        }
    }

    #[test]
    fn test_covered_cells() {
        let merges = [CellMerge::new(0, 0, 2, 2)];

        assert!(is_cell_covered(0, 1, &merges));
        assert!(is_cell_covered(1, 0, &merges));
        assert!(is_cell_covered(1, 1, &merges));
        assert!(!is_cell_covered(0, 0, &merges));
        assert!(!is_cell_covered(2, 2, &merges));
        assert!(!is_cell_covered(0, 2, &merges));
        assert_eq!(find_merge_at(1, 1, &merges), Some(&merges[0]));
    }

    #[test]
    fn test_can_merge_overlap_rules() {
        let merges = [CellMerge::new(1, 1, 2, 2)];

        // disjoint
        assert!(can_merge(0, 0, 0, 3, &merges));
        // fully containing
        assert!(can_merge(0, 0, 3, 3, &merges));
        // partial overlap
        assert!(!can_merge(0, 0, 1, 1, &merges));
        // reversed coordinates are normalized first
        assert!(can_merge(3, 3, 0, 0, &merges));
    }

    #[test]
    fn test_row_insert_shifts_and_grows() {
        let shifted = shift_merges_for_row_insert(&[CellMerge::new(2, 0, 1, 1)], 1);
        assert_eq!(shifted[0].row, 3);

        let grown = shift_merges_for_row_insert(&[CellMerge::new(0, 0, 2, 2)], 1);
        assert_eq!(grown, vec![CellMerge::new(0, 0, 3, 2)]);

        let before = shift_merges_for_row_insert(&[CellMerge::new(0, 0, 2, 2)], 2);
        assert_eq!(before, vec![CellMerge::new(0, 0, 2, 2)]);
    }

    #[test]
    fn test_col_insert_shifts_and_grows() {
        let merges = [CellMerge::new(0, 1, 1, 2), CellMerge::new(2, 4, 2, 1)];
        let shifted = shift_merges_for_col_insert(&merges, 2);

        assert_eq!(
            shifted,
            vec![CellMerge::new(0, 1, 1, 3), CellMerge::new(2, 5, 2, 1)]
        );
    }

    #[test]
    fn test_row_remove_drops_single_row_merge() {
        let merges = [CellMerge::new(1, 0, 1, 2)];
        assert!(shift_merges_for_row_remove(&merges, 1).is_empty());
    }

    #[test]
    fn test_row_remove_shrinks_and_shifts() {
        let merges = [CellMerge::new(0, 0, 3, 2), CellMerge::new(4, 0, 2, 2)];
        let shifted = shift_merges_for_row_remove(&merges, 1);

        assert_eq!(
            shifted,
            vec![CellMerge::new(0, 0, 2, 2), CellMerge::new(3, 0, 2, 2)]
        );
    }

    #[test]
    fn test_remove_that_leaves_one_cell_drops_merge() {
        let merges = [CellMerge::new(0, 0, 1, 2)];
        assert!(shift_merges_for_col_remove(&merges, 1).is_empty());
    }

    #[test]
    fn test_remove_anchor_row_keeps_spanning_merge() {
        let merges = [CellMerge::new(1, 0, 3, 1)];
        assert_eq!(
            shift_merges_for_row_remove(&merges, 1),
            vec![CellMerge::new(1, 0, 2, 1)]
        );
    }

    #[test]
    fn test_chain_expansion() {
        let merges = [CellMerge::new(1, 0, 2, 1), CellMerge::new(2, 0, 1, 2)];
        let expanded = expand_selection_for_merges(&Selection::single(1, 0), &merges);

        assert_eq!(expanded, Selection::new(1, 0, 2, 1));
    }

    #[test]
    fn test_expansion_without_merges_only_normalizes() {
        let expanded = expand_selection_for_merges(&Selection::new(2, 2, 0, 0), &[]);
        assert_eq!(expanded, Selection::new(0, 0, 2, 2));
    }
}
