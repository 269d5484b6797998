use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    aggregation::numeric_cells,
    error::PipelineResult,
    stats::aggregate_measurements,
    store::store_interop::MeasurementTable,
};

/// Share of the largest values dropped for [`CommitSummary::percentile99`].
const TRIMMED_SHARE: f64 = 0.01;

/// Descriptive statistics of one metric column for one commit.
///
/// Quantiles use the lower index convention: `q1 = sorted[n / 4]`,
/// `median = sorted[n / 2]`, `q3 = sorted[3n / 4]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub commit_value: String,
    pub count: usize,
    pub average: f64,
    /// Mean after dropping the top 1% of values.
    pub percentile99: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub table: String,
    pub column: String,
    pub results: Vec<CommitSummary>,
}

impl SummaryReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn summarize(commit_value: String, mut values: Vec<f64>) -> Option<CommitSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();

    let kept = n - (n as f64 * TRIMMED_SHARE).floor() as usize;
    let overall = aggregate_measurements(values.iter().copied());
    let trimmed = aggregate_measurements(values[..kept].iter().copied());
    log::debug!("{}: {}", commit_value, overall);

    let q1 = values[n / 4];
    let q3 = values[3 * n / 4];
    Some(CommitSummary {
        commit_value,
        count: n,
        average: overall.mean,
        percentile99: trimmed.mean,
        min: overall.min,
        max: overall.max,
        median: values[n / 2],
        q1,
        q3,
        iqr: q3 - q1,
    })
}

/// Per commit statistics of `metric`, commits in order of their first row.
/// Commits without a single non NULL value are left out.
pub fn summarize_commits(
    conn: &Connection,
    table: &str,
    metric: &str,
) -> PipelineResult<SummaryReport> {
    let table = MeasurementTable::open(conn, table)?;
    let (index, _) = table.numeric_metric_column(metric)?;
    let rows = table.fetch_all()?;

    let mut order: Vec<&str> = Vec::new();
    let mut values: HashMap<&str, Vec<f64>> = HashMap::new();
    for (row, value) in numeric_cells(table.schema(), metric, index, &rows)? {
        values
            .entry(row.commit_value.as_str())
            .or_insert_with(|| {
                order.push(row.commit_value.as_str());
                Vec::new()
            })
            .push(value);
    }

    let results = order
        .into_iter()
        .filter_map(|commit| {
            let vals = values.remove(commit)?;
            summarize(commit.to_string(), vals)
        })
        .collect::<Vec<_>>();
    log::debug!("Summarized {} commits of {}.{}", results.len(), table.name(), metric);

    Ok(SummaryReport {
        table: table.name().to_string(),
        column: metric.to_string(),
        results,
    })
}
