//! Builds the Fact/File/Link fixture in memory and prints the first payload
//! byte of every row for both comparison queries.

use std::io::Write;
use std::process::ExitCode;

use repro_fixture::{run_comparison, FixtureData, FixtureError};
use repro_sqlite::{open, ConnectionOptions};
use tracing_subscriber::EnvFilter;

const CONNECTION_STRING: &str = "Data Source=:memory:";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), FixtureError> {
    let options = ConnectionOptions::parse(CONNECTION_STRING)?;
    let conn = open(&options)?;
    let reports = run_comparison(&conn, &FixtureData::default())?;

    let mut out = std::io::stdout().lock();
    for report in &reports {
        write!(out, "{}", report)?;
    }
    out.flush()?;
    Ok(())
}

// Diagnostics go to stderr; stdout carries only the report.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
