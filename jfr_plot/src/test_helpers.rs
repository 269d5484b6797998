//! Centralized test helpers for jfr-plot
//!
//! This module provides measurement database fixtures used across unit tests,
//! integration tests and benchmarks.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::{tempdir, TempDir};

/// Schema of the table used by most tests: the four fixed columns followed by
/// a single metric column.
pub const BENCH_SCHEMA: &str = "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric REAL);";

/// Rows of the reference scenario: two rows for `c1` and one for `c2`.
pub const BENCH_ROWS: &str = "INSERT INTO bench VALUES (1, 'c1', 'f1', '2024-01-01', 10);
INSERT INTO bench VALUES (2, 'c1', 'f1', '2024-01-01', 20);
INSERT INTO bench VALUES (3, 'c2', 'f2', '2024-01-02', 5);";

/// Creates an in-memory database and runs `sql` against it.
///
/// # Panics
/// Panics if the statements fail.
pub fn connection_with(sql: &str) -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to open in-memory database");
    conn.execute_batch(sql).expect("Failed to populate database");
    conn
}

/// In-memory database holding the `bench` reference table.
pub fn bench_connection() -> Connection {
    connection_with(&format!("{}\n{}", BENCH_SCHEMA, BENCH_ROWS))
}

/// Writes a database file named `name` into `dir` and runs `sql` against it.
///
/// # Panics
/// Panics if the file cannot be created or the statements fail.
pub fn database_file_with(dir: &Path, name: &str, sql: &str) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).expect("Failed to create database file");
    conn.execute_batch(sql).expect("Failed to populate database");
    path
}

/// Creates a temporary directory holding `bench.db` with the reference table.
///
/// # Returns
/// The directory, removed when dropped, and the path of the database file.
pub fn dir_with_bench_database() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = database_file_with(
        dir.path(),
        "bench.db",
        &format!("{}\n{}", BENCH_SCHEMA, BENCH_ROWS),
    );
    (dir, path)
}

/// Populates a `progression` table with `commits` commits, one per day
/// starting 2024-01-01, each recorded `files` times with a varying metric.
///
/// # Panics
/// Panics if the rows cannot be inserted.
pub fn connection_with_commits(commits: usize, files: usize) -> Connection {
    let conn = connection_with(
        "CREATE TABLE progression (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, duration REAL, count INTEGER);",
    );
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    {
        let mut stmt = conn
            .prepare("INSERT INTO progression (commit_value, file, date, duration, count) VALUES (?1, ?2, ?3, ?4, ?5)")
            .unwrap();
        for c in 0..commits {
            let date = (start + chrono::Days::new(c as u64)).format("%Y-%m-%d").to_string();
            for f in 0..files {
                stmt.execute((
                    format!("commit{:04}", c),
                    format!("recording{}.jfr", f),
                    &date,
                    (c * 10 + f) as f64 / 3.0,
                    (c + f) as i64,
                ))
                .unwrap();
            }
        }
    }
    conn
}
