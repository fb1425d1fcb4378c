use std::io::{Cursor, Read};

use rusqlite::blob::Blob;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, DatabaseName, Row, Statement};
use tracing::debug;

use crate::SqliteError;

/// Origin of one projected result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource<'a> {
    /// The rowid (or its `INTEGER PRIMARY KEY` alias) of `table`.
    Rowid { table: &'a str },
    /// A BLOB column of `table`.
    Blob { table: &'a str, column: &'a str },
    Other,
}

/// Column origins of a query's result set, in projection order.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    columns: &'a [ColumnSource<'a>],
}

impl<'a> Projection<'a> {
    pub fn new(columns: &'a [ColumnSource<'a>]) -> Self {
        Self { columns }
    }

    pub fn get(&self, index: usize) -> Option<&ColumnSource<'a>> {
        self.columns.get(index)
    }

    /// Fail unless the statement returns exactly as many columns as described.
    pub fn check(&self, stmt: &Statement<'_>) -> Result<(), SqliteError> {
        let actual = stmt.column_count();
        if actual != self.columns.len() {
            return Err(SqliteError::ProjectionMismatch {
                expected: self.columns.len(),
                actual,
            });
        }
        Ok(())
    }

    /// Index of the rowid column for `table`, if exactly one is projected.
    ///
    /// With two rowid columns for one table (a self-join) there is no way to
    /// tell which row a BLOB belongs to, so none is returned.
    pub fn rowid_column(&self, table: &str) -> Option<usize> {
        let mut found = None;
        for (index, source) in self.columns.iter().enumerate() {
            if let ColumnSource::Rowid { table: t } = source {
                if t.eq_ignore_ascii_case(table) {
                    if found.is_some() {
                        return None;
                    }
                    found = Some(index);
                }
            }
        }
        found
    }
}

/// A read-only byte stream over one BLOB value.
enum BlobStream<'c, 'r> {
    /// Incremental I/O handle on the base table row.
    Incremental(Blob<'c>),
    /// Reader over the value already held by the current row.
    Value(Cursor<&'r [u8]>),
}

impl Read for BlobStream<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            BlobStream::Incremental(blob) => blob.read(buf),
            BlobStream::Value(cursor) => cursor.read(buf),
        }
    }
}

impl BlobStream<'_, '_> {
    fn close(self) -> Result<(), SqliteError> {
        match self {
            BlobStream::Incremental(blob) => blob.close()?,
            BlobStream::Value(_) => {}
        }
        Ok(())
    }
}

/// Drain `stream` into an owned buffer of `expected` bytes. The stream is
/// released on every path: closed explicitly on success, dropped on error.
fn drain(mut stream: BlobStream<'_, '_>, expected: usize) -> Result<Vec<u8>, SqliteError> {
    let mut buf = Vec::with_capacity(expected);
    stream.read_to_end(&mut buf)?;
    if buf.len() < expected {
        return Err(SqliteError::TruncatedBlob {
            expected,
            actual: buf.len(),
        });
    }
    stream.close()?;
    Ok(buf)
}

/// Read the BLOB in column `index` of `row` through a scoped stream.
///
/// When the projection also carries the rowid of the BLOB's table and that
/// rowid is non-NULL, the bytes come from an incremental BLOB handle on that
/// row; otherwise they come from the row's own value. NULL reads as an empty
/// buffer.
pub fn read_blob(
    conn: &Connection,
    row: &Row<'_>,
    projection: &Projection<'_>,
    index: usize,
) -> Result<Vec<u8>, SqliteError> {
    let source = projection
        .get(index)
        .ok_or(SqliteError::ColumnOutOfRange(index))?;

    let bytes = match row.get_ref(index)? {
        ValueRef::Null => return Ok(Vec::new()),
        ValueRef::Blob(bytes) => bytes,
        other => {
            return Err(SqliteError::NotABlob {
                index,
                found: other.data_type(),
            })
        }
    };

    if let ColumnSource::Blob { table, column } = *source {
        if let Some(rowid_index) = projection.rowid_column(table) {
            if let Some(rowid) = row.get::<_, Option<i64>>(rowid_index)? {
                let blob = conn.blob_open(DatabaseName::Main, table, column, rowid, true)?;
                let len = blob.len();
                debug!(table, column, rowid, len, "opened incremental blob handle");
                return drain(BlobStream::Incremental(blob), len);
            }
        }
    }

    drain(BlobStream::Value(Cursor::new(bytes)), bytes.len())
}
