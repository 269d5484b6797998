//! Shapes raw measurement rows into the plot-ready tables fed to reporters.

use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::{
    aggregation::{aggregate, numeric_cells},
    data::{DistributionPoint, DistributionTable, ProgressionTable},
    error::{PipelineError, PipelineResult},
    range::validate_range,
    stats::ReductionFunc,
    store::store_interop::MeasurementTable,
};

/// Every row of `table` projected onto `metric`, in row id order.
///
/// The remaining metric columns travel along as hover context. Rows with a
/// NULL `metric` cell are left out.
pub fn assemble_distribution(
    conn: &Connection,
    table: &str,
    metric: &str,
) -> PipelineResult<DistributionTable> {
    let table = MeasurementTable::open(conn, table)?;
    let (index, _) = table.numeric_metric_column(metric)?;

    let rows = table.fetch_all()?;
    let context_columns = table
        .schema()
        .metric_columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, c)| c.name.clone())
        .collect();

    let points = numeric_cells(table.schema(), metric, index, &rows)?
        .into_iter()
        .map(|(row, value)| DistributionPoint {
            row_id: row.row_id,
            commit_value: row.commit_value.clone(),
            date: row.date.clone(),
            source_file: row.source_file.clone(),
            value,
            context: row
                .metrics
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, cell)| cell.clone())
                .collect(),
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Assembled {} distribution points for {}.{}",
        points.len(),
        table.name(),
        metric
    );

    Ok(DistributionTable {
        table: table.name().to_string(),
        metric: metric.to_string(),
        context_columns,
        points,
    })
}

/// One `statistic` value per (commit, date) for every commit recorded
/// between the dates of `start_commit` and `end_commit`, in date order.
///
/// Rows of a selected commit that fall outside the date window still
/// contribute to its groups.
pub fn assemble_progression(
    conn: &Connection,
    table: &str,
    metric: &str,
    statistic: ReductionFunc,
    start_commit: &str,
    end_commit: &str,
) -> PipelineResult<ProgressionTable> {
    let table = MeasurementTable::open(conn, table)?;
    table.numeric_metric_column(metric)?;

    let range = validate_range(&table, start_commit, end_commit)?;

    let commits: BTreeSet<String> = table
        .fetch_in_date_range(&range.start_date, &range.end_date)?
        .into_iter()
        .map(|row| row.commit_value)
        .collect();
    if commits.is_empty() {
        return Err(PipelineError::EmptySelection {
            start_commit: start_commit.to_string(),
            end_commit: end_commit.to_string(),
        });
    }
    log::debug!("Selected {} commits", commits.len());

    let rows = table.fetch_for_commits(&commits)?;
    let points = aggregate(table.schema(), &rows, metric, statistic)?;

    Ok(ProgressionTable {
        table: table.name().to_string(),
        metric: metric.to_string(),
        statistic,
        range,
        points,
    })
}
