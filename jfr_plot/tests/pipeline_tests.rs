use std::path::{Path, PathBuf};

use jfr_plot::assembly::{assemble_distribution, assemble_progression};
use jfr_plot::error::PipelineError;
use jfr_plot::stats::ReductionFunc;
use jfr_plot::store::store_interop::{list_metric_columns, list_tables, open_read_only};
use jfr_plot::summary::summarize_commits;
use rusqlite::Connection;
use tempfile::TempDir;

/// Recording database with the layout written by the JFR import: one table
/// per event type, four fixed columns followed by the event fields.
fn create_recording_database(dir: &Path) -> PathBuf {
    let path = dir.join("recordings.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE jdk_CPULoad (id_pk INTEGER PRIMARY KEY AUTOINCREMENT, commit_value TEXT, file TEXT, date TEXT, jvmUser REAL, jvmSystem REAL, machineTotal REAL);
         CREATE TABLE jdk_GarbageCollection (id_pk INTEGER PRIMARY KEY AUTOINCREMENT, commit_value TEXT, file TEXT, date TEXT, gcId INTEGER, name TEXT, sumOfPauses REAL);
         CREATE INDEX idx_cpu_commit ON jdk_CPULoad (commit_value);",
    )
    .unwrap();

    let commits = [
        ("a1b2c3", "2024-03-01 10:00:00"),
        ("d4e5f6", "2024-03-02 10:00:00"),
        ("0a9b8c", "2024-03-03 10:00:00"),
        ("7f6e5d", "2024-03-04 10:00:00"),
    ];
    for (i, (commit, date)) in commits.iter().enumerate() {
        for sample in 0..5 {
            conn.execute(
                "INSERT INTO jdk_CPULoad (commit_value, file, date, jvmUser, jvmSystem, machineTotal) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    commit,
                    format!("{}.jfr", commit),
                    date,
                    0.1 * (i + 1) as f64 + 0.01 * sample as f64,
                    0.02,
                    0.5,
                ),
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO jdk_GarbageCollection (commit_value, file, date, gcId, name, sumOfPauses) VALUES (?1, ?2, ?3, ?4, 'G1New', ?5)",
            (commit, format!("{}.jfr", commit), date, i as i64, 1.5 * (i + 1) as f64),
        )
        .unwrap();
    }
    path
}

fn open_fixture() -> (TempDir, Connection) {
    let dir = TempDir::new().unwrap();
    let path = create_recording_database(dir.path());
    let conn = open_read_only(&path).unwrap();
    (dir, conn)
}

#[test]
fn test_schema_inspection() {
    let (_dir, conn) = open_fixture();

    // sqlite_sequence from AUTOINCREMENT is not a measurement table
    assert_eq!(
        list_tables(&conn).unwrap(),
        vec!["jdk_CPULoad", "jdk_GarbageCollection"]
    );
    assert_eq!(
        list_metric_columns(&conn, "jdk_CPULoad").unwrap(),
        vec!["jvmUser", "jvmSystem", "machineTotal"]
    );
    assert_eq!(
        list_metric_columns(&conn, "jdk_GarbageCollection").unwrap(),
        vec!["gcId", "name", "sumOfPauses"]
    );
}

#[test]
fn test_distribution_from_file_database() {
    let (_dir, conn) = open_fixture();

    let table = assemble_distribution(&conn, "jdk_CPULoad", "jvmUser").unwrap();
    assert_eq!(table.points.len(), 20);
    assert_eq!(table.context_columns, vec!["jvmSystem", "machineTotal"]);
    assert_eq!(
        table,
        assemble_distribution(&conn, "jdk_CPULoad", "jvmUser").unwrap()
    );
}

#[test]
fn test_progression_between_commits() {
    let (_dir, conn) = open_fixture();

    let table = assemble_progression(
        &conn,
        "jdk_GarbageCollection",
        "sumOfPauses",
        ReductionFunc::Max,
        "d4e5f6",
        "0a9b8c",
    )
    .unwrap();

    assert_eq!(
        table
            .points
            .iter()
            .map(|p| (p.commit_value.as_str(), p.value))
            .collect::<Vec<_>>(),
        vec![("d4e5f6", 3.0), ("0a9b8c", 4.5)]
    );
}

#[test]
fn test_progression_statistics_are_bounded() {
    let (_dir, conn) = open_fixture();

    let run = |statistic| {
        assemble_progression(&conn, "jdk_CPULoad", "jvmUser", statistic, "a1b2c3", "7f6e5d")
            .unwrap()
            .points
    };
    let min = run(ReductionFunc::Min);
    let mean = run(ReductionFunc::Mean);
    let max = run(ReductionFunc::Max);

    assert_eq!(min.len(), 4);
    assert!(min.windows(2).all(|w| w[0].date <= w[1].date));
    for ((lo, mid), hi) in min.iter().zip(&mean).zip(&max) {
        assert!(lo.value <= mid.value && mid.value <= hi.value);
    }
}

#[test]
fn test_progression_rejects_reversed_commits() {
    let (_dir, conn) = open_fixture();

    let err = assemble_progression(
        &conn,
        "jdk_CPULoad",
        "jvmUser",
        ReductionFunc::Mean,
        "7f6e5d",
        "a1b2c3",
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::NonSequentialCommits { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_text_metric_is_rejected() {
    let (_dir, conn) = open_fixture();

    assert!(matches!(
        assemble_distribution(&conn, "jdk_GarbageCollection", "name"),
        Err(PipelineError::InvalidColumnType { .. })
    ));
}

#[test]
fn test_summary_json() {
    let (_dir, conn) = open_fixture();

    let report = summarize_commits(&conn, "jdk_CPULoad", "machineTotal").unwrap();
    assert_eq!(report.results.len(), 4);
    assert!(report.results.iter().all(|r| r.count == 5 && r.iqr == 0.0));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["results"][3]["commitValue"], "7f6e5d");
}
