use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file type: {0:?}")]
    UnsupportedFile(PathBuf),
    #[error("file {path:?} is {size} bytes, above the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("no data found in {0}")]
    EmptyGrid(String),
    #[error("create table {table} failed: {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("row {row} has {found} value(s) but table {table} has {expected} column(s)")]
    ColumnCount {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("insert of row {row} into {table} failed: {source}")]
    Row {
        table: String,
        row: usize,
        #[source]
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Store(#[from] rusqlite::Error),
    #[error(transparent)]
    Read(#[from] anyhow::Error),
}
