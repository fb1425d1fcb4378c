//! The Fact/File/Link fixture and the two comparison queries that expose
//! (or fail to expose) the BLOB projection defect.

pub mod query;
pub mod report;
pub mod schema;

pub use query::{run_query, ComparisonQuery, Observation, WITHOUT_FACT_ID, WITH_FACT_ID};
pub use report::Report;
pub use schema::{init_schema, seed, FixtureData, SeededIds};

use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Sqlite(#[from] repro_sqlite::SqliteError),
    #[error("SQLite error: {0}")]
    Engine(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the fixture on an empty connection, then run both comparison
/// queries in order and return one report per query.
pub fn run_comparison(conn: &Connection, data: &FixtureData) -> Result<Vec<Report>, FixtureError> {
    init_schema(conn)?;
    let ids = seed(conn, data)?;
    info!(fact_id = ids.fact_id, file_ids = ?ids.file_ids, "fixture seeded");

    let mut reports = Vec::new();
    for query in [&WITH_FACT_ID, &WITHOUT_FACT_ID] {
        let observations = run_query(conn, query)?;
        if !data.matches(&observations) {
            let observed: Vec<Option<u8>> = observations.iter().map(Observation::file_byte).collect();
            warn!(
                query = query.label,
                expected = ?data.expected_file_bytes(),
                observed = ?observed,
                "file payloads diverge from the fixture"
            );
        }
        reports.push(Report::new(query, &observations));
    }
    Ok(reports)
}
