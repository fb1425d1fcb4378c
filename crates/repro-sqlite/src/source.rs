use std::path::PathBuf;

use rusqlite::Connection;
use tracing::debug;

use crate::SqliteError;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Ephemeral, process-local database discarded when the connection closes.
    Memory,
    File(PathBuf),
}

/// Options for opening a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub data_source: DataSource,
    /// Whether `PRAGMA foreign_keys` is switched on after opening.
    pub foreign_keys: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            data_source: DataSource::Memory,
            foreign_keys: true,
        }
    }
}

impl ConnectionOptions {
    /// Parse a `key=value;key=value` connection string such as
    /// `Data Source=:memory:`.
    ///
    /// Keys are case-insensitive and ignore inner whitespace. Recognized keys:
    /// `Data Source` (aliases `DataSource`, `Filename`), `Mode` and
    /// `Foreign Keys`.
    pub fn parse(connection_string: &str) -> Result<Self, SqliteError> {
        let mut source: Option<String> = None;
        let mut memory_mode = false;
        let mut foreign_keys = true;

        for pair in connection_string.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                SqliteError::InvalidConnectionString(format!("expected key=value, got '{}'", pair))
            })?;
            let key: String = key
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "datasource" | "filename" => source = Some(value.to_string()),
                "mode" => match value.to_lowercase().as_str() {
                    "memory" => memory_mode = true,
                    "readwrite" | "readwritecreate" | "readonly" => {}
                    other => {
                        return Err(SqliteError::InvalidConnectionString(format!(
                            "unknown mode '{}'",
                            other
                        )))
                    }
                },
                "foreignkeys" => {
                    foreign_keys = parse_bool(value).ok_or_else(|| {
                        SqliteError::InvalidConnectionString(format!(
                            "Foreign Keys expects True or False, got '{}'",
                            value
                        ))
                    })?
                }
                _ => {
                    return Err(SqliteError::InvalidConnectionString(format!(
                        "unknown key '{}'",
                        key
                    )))
                }
            }
        }

        let source = source.ok_or_else(|| {
            SqliteError::InvalidConnectionString("missing Data Source".to_string())
        })?;
        let data_source = if memory_mode || source.is_empty() || source == ":memory:" {
            DataSource::Memory
        } else {
            DataSource::File(PathBuf::from(source))
        };

        Ok(Self {
            data_source,
            foreign_keys,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Open a connection and apply the connection-level pragmas.
pub fn open(options: &ConnectionOptions) -> Result<Connection, SqliteError> {
    let conn = match &options.data_source {
        DataSource::Memory => Connection::open_in_memory()?,
        DataSource::File(path) => Connection::open(path)?,
    };
    conn.pragma_update(None, "foreign_keys", options.foreign_keys)?;
    debug!(
        data_source = ?options.data_source,
        foreign_keys = options.foreign_keys,
        "opened connection"
    );
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_source() {
        let opts = ConnectionOptions::parse("Data Source=:memory:").unwrap();
        assert_eq!(opts, ConnectionOptions::default());
    }

    #[test]
    fn test_parse_file_source_and_keys() {
        let opts =
            ConnectionOptions::parse("filename=/tmp/repro.db; Foreign Keys=False;").unwrap();
        assert_eq!(opts.data_source, DataSource::File(PathBuf::from("/tmp/repro.db")));
        assert!(!opts.foreign_keys);
    }

    #[test]
    fn test_parse_memory_mode_overrides_name() {
        let opts = ConnectionOptions::parse("Data Source=shared;Mode=Memory").unwrap();
        assert_eq!(opts.data_source, DataSource::Memory);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            ConnectionOptions::parse("Mode=Memory"),
            Err(SqliteError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionOptions::parse("Data Source=:memory:;Pooling=True"),
            Err(SqliteError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionOptions::parse("Data Source"),
            Err(SqliteError::InvalidConnectionString(_))
        ));
    }

    #[test]
    fn test_open_enables_foreign_keys() {
        let conn = open(&ConnectionOptions::default()).unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }
}
