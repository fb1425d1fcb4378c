use repro_sqlite::{execute, NamedParams};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::FixtureError;

const CREATE_FACT: &str = "CREATE TABLE fact (
    id      INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    payload BLOB
)";

const CREATE_FILE: &str = "CREATE TABLE file (
    id      INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    payload BLOB
)";

const CREATE_FACT_FILE: &str = "CREATE TABLE fact_file (
    id      INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    fact_id INTEGER,
    file_id INTEGER,
    FOREIGN KEY (fact_id) REFERENCES fact (id) ON DELETE CASCADE,
    FOREIGN KEY (file_id) REFERENCES file (id) ON DELETE CASCADE
)";

/// Payloads written into the fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureData {
    pub fact_payload: Vec<u8>,
    /// Inserted in order with one two-tuple INSERT.
    pub file_payloads: [Vec<u8>; 2],
}

impl Default for FixtureData {
    fn default() -> Self {
        Self {
            fact_payload: vec![0x01],
            file_payloads: [vec![0x02], vec![0x03]],
        }
    }
}

impl FixtureData {
    /// First byte of each File payload, in link insertion order.
    pub fn expected_file_bytes(&self) -> Vec<Option<u8>> {
        self.file_payloads.iter().map(|p| p.first().copied()).collect()
    }

    /// Whether `observations` carry the fixture's payloads, row by row.
    pub fn matches(&self, observations: &[crate::Observation]) -> bool {
        observations.len() == self.file_payloads.len()
            && observations
                .iter()
                .enumerate()
                .all(|(row, o)| o.matches_expected(self, row))
    }
}

/// Identities the engine assigned while seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededIds {
    pub fact_id: i64,
    pub file_ids: [i64; 2],
}

/// Create the three empty fixture tables.
pub fn init_schema(conn: &Connection) -> Result<(), FixtureError> {
    let none = NamedParams::new();
    for ddl in [CREATE_FACT, CREATE_FILE, CREATE_FACT_FILE] {
        execute(conn, ddl, &none)?;
    }
    Ok(())
}

/// Insert one Fact, two Files (single batch insert) and the two Links
/// between them.
pub fn seed(conn: &Connection, data: &FixtureData) -> Result<SeededIds, FixtureError> {
    execute(
        conn,
        "INSERT INTO fact (payload) VALUES ($fact_payload)",
        &NamedParams::new().with("fact_payload", data.fact_payload.clone()),
    )?;
    let fact_id = conn.last_insert_rowid();

    execute(
        conn,
        "INSERT INTO file (payload) VALUES ($file_payload_1), ($file_payload_2)",
        &NamedParams::new()
            .with("file_payload_1", data.file_payloads[0].clone())
            .with("file_payload_2", data.file_payloads[1].clone()),
    )?;
    // Both tuples come from one statement, so their rowids are consecutive.
    let last_file_id = conn.last_insert_rowid();
    let file_ids = [last_file_id - 1, last_file_id];

    for file_id in file_ids {
        execute(
            conn,
            "INSERT INTO fact_file (fact_id, file_id) VALUES ($fact_id, $file_id)",
            &NamedParams::new().with("fact_id", fact_id).with("file_id", file_id),
        )?;
    }

    debug!(fact_id, ?file_ids, "inserted fixture rows");
    Ok(SeededIds { fact_id, file_ids })
}

/// Current AUTOINCREMENT counter for `table`, if it has ever assigned one.
pub fn sequence_value(conn: &Connection, table: &str) -> Result<Option<i64>, FixtureError> {
    let value = conn
        .query_row(
            "SELECT seq FROM sqlite_sequence WHERE name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// All Fact rows as `(id, payload)`, by id.
pub fn fact_rows(conn: &Connection) -> Result<Vec<(i64, Vec<u8>)>, FixtureError> {
    payload_rows(conn, "SELECT id, payload FROM fact ORDER BY id")
}

/// All File rows as `(id, payload)`, by id.
pub fn file_rows(conn: &Connection) -> Result<Vec<(i64, Vec<u8>)>, FixtureError> {
    payload_rows(conn, "SELECT id, payload FROM file ORDER BY id")
}

fn payload_rows(conn: &Connection, sql: &str) -> Result<Vec<(i64, Vec<u8>)>, FixtureError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get(0)?, row.get::<_, Option<Vec<u8>>>(1)?.unwrap_or_default()))
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// All Link rows as `(fact_id, file_id)`, in insertion order.
pub fn link_rows(conn: &Connection) -> Result<Vec<(i64, i64)>, FixtureError> {
    let mut stmt = conn.prepare("SELECT fact_id, file_id FROM fact_file ORDER BY id")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
