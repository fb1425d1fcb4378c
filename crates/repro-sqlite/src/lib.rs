//! Thin boundary over the SQLite engine used by the blob-join repro.
//!
//! Everything the repro needs from the engine goes through here: opening a
//! connection from a data source, binding typed named parameters, executing
//! statements, and reading BLOB columns through a scoped byte stream.

pub mod blob;
pub mod params;
pub mod source;

pub use blob::{read_blob, ColumnSource, Projection};
pub use params::{execute, prepare_bound, NamedParams, SqlValue};
pub use source::{open, ConnectionOptions, DataSource};

use rusqlite::types::Type;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("Statement has no parameter named {0}")]
    UnknownParameter(String),
    #[error("Must add a value for parameter {0}")]
    MissingParameter(String),
    #[error("Column {index} holds {found}, not a BLOB")]
    NotABlob { index: usize, found: Type },
    #[error("BLOB stream ended after {actual} of {expected} bytes")]
    TruncatedBlob { expected: usize, actual: usize },
    #[error("Column index {0} is outside the projection")]
    ColumnOutOfRange(usize),
    #[error("Projection describes {expected} columns but the statement returns {actual}")]
    ProjectionMismatch { expected: usize, actual: usize },
}
