use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Row index {index} out of bounds (table has {len} rows)")]
    RowOutOfBounds { index: usize, len: usize },

    #[error("Column index {index} out of bounds (table has {len} columns)")]
    ColumnOutOfBounds { index: usize, len: usize },

    #[error("Cannot remove the last row of a table")]
    LastRow,

    #[error("Cannot remove the last column of a table")]
    LastColumn,

    #[error("A merge must span more than one cell")]
    SingleCell,

    #[error("Selection partially overlaps an existing merge")]
    PartialOverlap,

    #[error("No merge at ({row}, {col})")]
    NoMergeAt { row: usize, col: usize },
}

pub type GridResult<T> = Result<T, GridError>;
