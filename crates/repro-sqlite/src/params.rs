use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, Statement};
use tracing::debug;

use crate::SqliteError;

/// Prefixes SQLite accepts in front of a named parameter.
const PREFIXES: [char; 3] = ['$', ':', '@'];

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            SqlValue::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v.as_slice())),
        })
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Blob(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Named parameter values for one statement execution.
///
/// Names may carry their SQL prefix (`$id`) or omit it (`id`); unprefixed
/// names are looked up under each prefix in turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    values: Vec<(String, SqlValue)>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`NamedParams::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a parameter, replacing an earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

fn resolve_index(stmt: &Statement<'_>, name: &str) -> Result<Option<usize>, SqliteError> {
    if name.starts_with(&PREFIXES[..]) {
        return Ok(stmt.parameter_index(name)?);
    }
    for prefix in PREFIXES {
        if let Some(index) = stmt.parameter_index(&format!("{}{}", prefix, name))? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn bind(stmt: &mut Statement<'_>, params: &NamedParams) -> Result<(), SqliteError> {
    let mut bound = vec![false; stmt.parameter_count()];
    for (name, value) in params.iter() {
        let index = resolve_index(stmt, name)?
            .ok_or_else(|| SqliteError::UnknownParameter(name.to_string()))?;
        stmt.raw_bind_parameter(index, value)?;
        bound[index - 1] = true;
    }
    if let Some(missing) = bound.iter().position(|done| !done) {
        let name = stmt.parameter_name(missing + 1).unwrap_or("?");
        return Err(SqliteError::MissingParameter(name.to_string()));
    }
    Ok(())
}

/// Prepare `sql` and bind every parameter it declares.
pub fn prepare_bound<'c>(
    conn: &'c Connection,
    sql: &str,
    params: &NamedParams,
) -> Result<Statement<'c>, SqliteError> {
    let mut stmt = conn.prepare(sql)?;
    bind(&mut stmt, params)?;
    Ok(stmt)
}

/// Execute a single DDL/DML statement. Returns the number of rows affected.
pub fn execute(conn: &Connection, sql: &str, params: &NamedParams) -> Result<usize, SqliteError> {
    let mut stmt = prepare_bound(conn, sql, params)?;
    let changed = stmt.raw_execute()?;
    debug!(sql = sql.trim(), params = params.len(), changed, "executed statement");
    Ok(changed)
}
