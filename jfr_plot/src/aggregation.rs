use std::collections::BTreeMap;

use crate::{
    data::{cell_as_f64, AggregatedPoint, MeasurementDate, MeasurementRow},
    error::{PipelineError, PipelineResult},
    stats::{NumericReductionFunc, ReductionFunc},
    store::store_types::TableSchema,
};

/// Reads the numeric value of metric `index` of each row, paired with the
/// row. Rows holding NULL are skipped.
pub(crate) fn numeric_cells<'a>(
    schema: &TableSchema,
    column: &str,
    index: usize,
    rows: &'a [MeasurementRow],
) -> PipelineResult<Vec<(&'a MeasurementRow, f64)>> {
    rows.iter()
        .filter_map(|row| match cell_as_f64(&row.metrics[index]) {
            Ok(Some(val)) => Some(Ok((row, val))),
            Ok(None) => None,
            Err(detail) => Some(Err(PipelineError::InvalidColumnType {
                table: schema.table.clone(),
                column: column.to_string(),
                detail: format!("row {}: {}", row.row_id, detail),
            })),
        })
        .collect()
}

/// Groups `rows` by (commit value, date) and reduces `metric_column` of
/// each group with `statistic`.
///
/// The result is ordered by date, then commit value. A commit recorded on
/// several dates forms one group per date.
pub fn aggregate(
    schema: &TableSchema,
    rows: &[MeasurementRow],
    metric_column: &str,
    statistic: ReductionFunc,
) -> PipelineResult<Vec<AggregatedPoint>> {
    let (index, _) = schema.numeric_metric_column(metric_column)?;

    let mut groups: BTreeMap<(MeasurementDate, &str), Vec<f64>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.date.clone(), row.commit_value.as_str()))
            .or_default();
    }
    for (row, val) in numeric_cells(schema, metric_column, index, rows)? {
        groups
            .entry((row.date.clone(), row.commit_value.as_str()))
            .or_default()
            .push(val);
    }

    let points = groups
        .into_iter()
        .filter_map(|((date, commit_value), vals)| {
            let value = vals.into_iter().aggregate_by(statistic);
            if value.is_none() {
                log::debug!(
                    "No {} values for commit {} on {}, skipping",
                    metric_column,
                    commit_value,
                    date
                );
            }
            value.map(|value| AggregatedPoint {
                commit_value: commit_value.to_string(),
                date,
                value,
            })
        })
        .collect();

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store_interop::MeasurementTable;
    use crate::test_helpers::{bench_connection, connection_with, connection_with_commits};

    fn fetch(conn: &rusqlite::Connection, table: &str) -> (TableSchema, Vec<MeasurementRow>) {
        let table = MeasurementTable::open(conn, table).unwrap();
        (table.schema().clone(), table.fetch_all().unwrap())
    }

    fn point(commit: &str, date: &str, value: f64) -> AggregatedPoint {
        AggregatedPoint {
            commit_value: commit.to_string(),
            date: date.into(),
            value,
        }
    }

    #[test]
    fn test_mean_of_reference_table() {
        let conn = bench_connection();
        let (schema, rows) = fetch(&conn, "bench");

        let points = aggregate(&schema, &rows, "metric", ReductionFunc::Mean).unwrap();
        assert_eq!(
            points,
            vec![point("c1", "2024-01-01", 15.0), point("c2", "2024-01-02", 5.0)]
        );
    }

    #[test]
    fn test_all_statistics_of_reference_table() {
        let conn = bench_connection();
        let (schema, rows) = fetch(&conn, "bench");

        let values = |statistic| {
            aggregate(&schema, &rows, "metric", statistic)
                .unwrap()
                .into_iter()
                .map(|p| p.value)
                .collect::<Vec<_>>()
        };
        assert_eq!(values(ReductionFunc::Min), vec![10.0, 5.0]);
        assert_eq!(values(ReductionFunc::Max), vec![20.0, 5.0]);
        assert_eq!(values(ReductionFunc::Median), vec![15.0, 5.0]);
        assert_eq!(values(ReductionFunc::Mean), vec![15.0, 5.0]);
    }

    #[test]
    fn test_same_commit_on_different_dates_forms_distinct_groups() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric REAL);
             INSERT INTO bench VALUES (1, 'c1', 'a.jfr', '2024-01-03', 1.0);
             INSERT INTO bench VALUES (2, 'c1', 'b.jfr', '2024-01-01', 3.0);
             INSERT INTO bench VALUES (3, 'c1', 'b.jfr', '2024-01-01', 5.0);",
        );
        let (schema, rows) = fetch(&conn, "bench");

        let points = aggregate(&schema, &rows, "metric", ReductionFunc::Mean).unwrap();
        assert_eq!(
            points,
            vec![point("c1", "2024-01-01", 4.0), point("c1", "2024-01-03", 1.0)]
        );
    }

    #[test]
    fn test_ties_on_date_ordered_by_commit() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric REAL);
             INSERT INTO bench VALUES (1, 'zz', 'f', '2024-01-01', 1.0);
             INSERT INTO bench VALUES (2, 'aa', 'f', '2024-01-01', 2.0);",
        );
        let (schema, rows) = fetch(&conn, "bench");

        let points = aggregate(&schema, &rows, "metric", ReductionFunc::Max).unwrap();
        assert_eq!(
            points,
            vec![point("aa", "2024-01-01", 2.0), point("zz", "2024-01-01", 1.0)]
        );
    }

    #[test]
    fn test_output_sorted_by_date() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric REAL);
             INSERT INTO bench VALUES (1, 'c3', 'f', '2024-03-01', 1.0);
             INSERT INTO bench VALUES (2, 'c1', 'f', '2024-01-01', 2.0);
             INSERT INTO bench VALUES (3, 'c2', 'f', '2024-02-01', 3.0);
             INSERT INTO bench VALUES (4, 'c1', 'f', '2024-01-01', 4.0);",
        );
        let (schema, rows) = fetch(&conn, "bench");

        let points = aggregate(&schema, &rows, "metric", ReductionFunc::Median).unwrap();
        assert!(points.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(
            points.iter().map(|p| p.commit_value.as_str()).collect::<Vec<_>>(),
            vec!["c1", "c2", "c3"]
        );
    }

    #[test]
    fn test_mean_between_min_and_max() {
        let conn = connection_with_commits(12, 5);
        let (schema, rows) = fetch(&conn, "progression");

        for column in ["duration", "count"] {
            let min = aggregate(&schema, &rows, column, ReductionFunc::Min).unwrap();
            let mean = aggregate(&schema, &rows, column, ReductionFunc::Mean).unwrap();
            let median = aggregate(&schema, &rows, column, ReductionFunc::Median).unwrap();
            let max = aggregate(&schema, &rows, column, ReductionFunc::Max).unwrap();

            assert_eq!(min.len(), 12);
            for i in 0..min.len() {
                assert_eq!(min[i].commit_value, max[i].commit_value);
                assert!(min[i].value <= mean[i].value);
                assert!(mean[i].value <= max[i].value);
                assert!(min[i].value <= median[i].value);
                assert!(median[i].value <= max[i].value);
            }
        }
    }

    #[test]
    fn test_null_cells_are_skipped() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric REAL);
             INSERT INTO bench VALUES (1, 'c1', 'f', '2024-01-01', NULL);
             INSERT INTO bench VALUES (2, 'c1', 'f', '2024-01-01', 4.0);
             INSERT INTO bench VALUES (3, 'c2', 'f', '2024-01-02', NULL);",
        );
        let (schema, rows) = fetch(&conn, "bench");

        let points = aggregate(&schema, &rows, "metric", ReductionFunc::Mean).unwrap();
        assert_eq!(points, vec![point("c1", "2024-01-01", 4.0)]);
    }

    #[test]
    fn test_numeric_text_is_accepted() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric NUMERIC);
             INSERT INTO bench VALUES (1, 'c1', 'f', '2024-01-01', '1e3');
             INSERT INTO bench VALUES (2, 'c1', 'f', '2024-01-01', 3);",
        );
        let (schema, rows) = fetch(&conn, "bench");

        let points = aggregate(&schema, &rows, "metric", ReductionFunc::Max).unwrap();
        assert_eq!(points, vec![point("c1", "2024-01-01", 1000.0)]);
    }

    #[test]
    fn test_non_numeric_cell_is_rejected() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, metric REAL);
             INSERT INTO bench VALUES (1, 'c1', 'f', '2024-01-01', 'n/a');",
        );
        let (schema, rows) = fetch(&conn, "bench");

        let err = aggregate(&schema, &rows, "metric", ReductionFunc::Mean).unwrap_err();
        match err {
            PipelineError::InvalidColumnType { column, detail, .. } => {
                assert_eq!(column, "metric");
                assert_eq!(detail, "row 1: found text value 'n/a'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_text_column_is_rejected() {
        let conn = connection_with(
            "CREATE TABLE bench (id_pk INTEGER PRIMARY KEY, commit_value TEXT, file TEXT, date TEXT, gcName TEXT);
             INSERT INTO bench VALUES (1, 'c1', 'f', '2024-01-01', '42');",
        );
        let (schema, rows) = fetch(&conn, "bench");

        assert!(matches!(
            aggregate(&schema, &rows, "gcName", ReductionFunc::Mean),
            Err(PipelineError::InvalidColumnType { .. })
        ));
    }

    #[test]
    fn test_empty_rows() {
        let conn = bench_connection();
        let (schema, _) = fetch(&conn, "bench");
        assert!(aggregate(&schema, &[], "metric", ReductionFunc::Mean)
            .unwrap()
            .is_empty());
    }
}
