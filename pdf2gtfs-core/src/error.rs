use thiserror::Error;

/// top-level error type for `pdf2gtfs-core`.
///
/// Per spec §7, most per-cell/per-column problems are logged and
/// recovered from inline (an `Other`-typed cell, a dropped repeat
/// column, a discarded table) rather than raised here. `CoreError` is
/// reserved for failures that make continuing meaningless.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot build a table from an empty cell list")]
    EmptyTable,
    #[error("row/column length mismatch: existing line has {existing} cells, new line has {new}")]
    LineLengthMismatch { existing: usize, new: usize },
    #[error("new line does not form a valid row/column: {0}")]
    InvalidLine(String),
    #[error("insert index {index} is out of bounds for {len} columns")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("invalid configuration value: {0}")]
    InvalidConfig(#[from] crate::config::ConfigError),
    #[error("cell id {0:?} does not belong to this table")]
    ForeignCellId(usize),
}
