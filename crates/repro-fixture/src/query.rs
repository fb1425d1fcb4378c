use repro_sqlite::{prepare_bound, read_blob, ColumnSource, NamedParams, Projection};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{FixtureData, FixtureError};

/// A parameterless Link -> Fact -> File join whose payload columns are read
/// through the streaming BLOB accessor.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonQuery {
    /// Printed above the query's rows.
    pub label: &'static str,
    pub sql: &'static str,
    pub columns: &'static [ColumnSource<'static>],
    /// Result column holding `fact.payload`.
    pub fact_payload: usize,
    /// Result column holding `file.payload`.
    pub file_payload: usize,
}

const FACT_ID: ColumnSource<'static> = ColumnSource::Rowid { table: "fact" };
const FACT_PAYLOAD: ColumnSource<'static> = ColumnSource::Blob {
    table: "fact",
    column: "payload",
};
const FILE_PAYLOAD: ColumnSource<'static> = ColumnSource::Blob {
    table: "file",
    column: "payload",
};

/// Projects `fact.id` ahead of both payloads. Affected drivers repeat the
/// first File payload on every row here.
pub const WITH_FACT_ID: ComparisonQuery = ComparisonQuery {
    label: "including fact.id in the select statement",
    sql: "SELECT fact.id, fact.payload, file.payload
          FROM fact_file link
          LEFT JOIN fact ON link.fact_id = fact.id
          LEFT JOIN file ON link.file_id = file.id",
    columns: &[FACT_ID, FACT_PAYLOAD, FILE_PAYLOAD],
    fact_payload: 1,
    file_payload: 2,
};

/// The same join without `fact.id`; the reference result.
pub const WITHOUT_FACT_ID: ComparisonQuery = ComparisonQuery {
    label: "excluding fact.id from the select statement",
    sql: "SELECT fact.payload, file.payload
          FROM fact_file link
          LEFT JOIN fact ON link.fact_id = fact.id
          LEFT JOIN file ON link.file_id = file.id",
    columns: &[FACT_PAYLOAD, FILE_PAYLOAD],
    fact_payload: 0,
    file_payload: 1,
};

/// Payloads read from one result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub fact_payload: Vec<u8>,
    pub file_payload: Vec<u8>,
}

impl Observation {
    pub fn fact_byte(&self) -> Option<u8> {
        self.fact_payload.first().copied()
    }

    pub fn file_byte(&self) -> Option<u8> {
        self.file_payload.first().copied()
    }

    /// Whether this is the `row`-th row (0-based, link insertion order) the
    /// fixture in `data` should produce.
    pub fn matches_expected(&self, data: &FixtureData, row: usize) -> bool {
        match data.file_payloads.get(row) {
            Some(file) => self.fact_payload == data.fact_payload && self.file_payload == *file,
            None => false,
        }
    }
}

/// Execute `query` once and read both payloads of every row, column by
/// column, in row order.
///
/// A statement that produces no result columns yields no observations.
pub fn run_query(conn: &Connection, query: &ComparisonQuery) -> Result<Vec<Observation>, FixtureError> {
    let mut stmt = prepare_bound(conn, query.sql, &NamedParams::new())?;
    if stmt.column_count() == 0 {
        debug!(query = query.label, "statement returned no result set");
        return Ok(Vec::new());
    }
    let projection = Projection::new(query.columns);
    projection.check(&stmt)?;

    let mut observations = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let fact_payload = read_blob(conn, row, &projection, query.fact_payload)?;
        let file_payload = read_blob(conn, row, &projection, query.file_payload)?;
        observations.push(Observation {
            fact_payload,
            file_payload,
        });
    }

    info!(query = query.label, rows = observations.len(), "comparison query finished");
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_schema, seed};

    fn seeded_db() -> Connection {
        let conn = repro_sqlite::open(&Default::default()).unwrap();
        init_schema(&conn).unwrap();
        seed(&conn, &FixtureData::default()).unwrap();
        conn
    }

    fn file_bytes(observations: &[Observation]) -> Vec<Option<u8>> {
        observations.iter().map(Observation::file_byte).collect()
    }

    #[test]
    fn test_without_fact_id() {
        let conn = seeded_db();
        let observations = run_query(&conn, &WITHOUT_FACT_ID).unwrap();
        assert_eq!(file_bytes(&observations), vec![Some(0x02), Some(0x03)]);
        assert!(observations.iter().all(|o| o.fact_byte() == Some(0x01)));
    }

    #[test]
    fn test_with_fact_id() {
        let conn = seeded_db();
        let observations = run_query(&conn, &WITH_FACT_ID).unwrap();
        assert_eq!(file_bytes(&observations), vec![Some(0x02), Some(0x03)]);
        assert!(observations.iter().all(|o| o.fact_byte() == Some(0x01)));
    }

    #[test]
    fn test_matches_expected_by_row() {
        let data = FixtureData::default();
        let second = Observation {
            fact_payload: vec![0x01],
            file_payload: vec![0x03],
        };
        assert!(second.matches_expected(&data, 1));
        assert!(!second.matches_expected(&data, 0));
        assert!(!second.matches_expected(&data, 2));

        let repeated = Observation {
            file_payload: vec![0x02],
            ..second.clone()
        };
        assert!(!data.matches(&[repeated.clone(), repeated]));
    }

    #[test]
    fn test_query_is_rerunnable() {
        let conn = seeded_db();
        let first = run_query(&conn, &WITH_FACT_ID).unwrap();
        let second = run_query(&conn, &WITH_FACT_ID).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dangling_link_reads_empty_payloads() {
        let conn = seeded_db();
        conn.execute_batch(
            "PRAGMA foreign_keys = OFF;
             INSERT INTO fact_file (fact_id, file_id) VALUES (9, 9);",
        )
        .unwrap();
        let observations = run_query(&conn, &WITH_FACT_ID).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(
            observations[2],
            Observation {
                fact_payload: vec![],
                file_payload: vec![]
            }
        );
    }

    #[test]
    fn test_statement_without_result_set() {
        let conn = seeded_db();
        let query = ComparisonQuery {
            label: "no rows",
            sql: "DELETE FROM fact_file WHERE id < 0",
            columns: &[],
            fact_payload: 0,
            file_payload: 0,
        };
        assert!(run_query(&conn, &query).unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_projection_fails() {
        let conn = seeded_db();
        let query = ComparisonQuery {
            columns: &[FACT_PAYLOAD],
            ..WITHOUT_FACT_ID
        };
        assert!(run_query(&conn, &query).is_err());
    }
}
