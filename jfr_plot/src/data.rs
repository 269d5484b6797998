use std::cmp::Ordering;
use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

use crate::stats::ReductionFunc;

/// Date of a measurement as stored in the database.
///
/// Dates are usually ISO-8601 text, but tables written by other tools may hold
/// unix timestamps. Values are ordered the way SQLite orders them: numbers
/// before text, numbers numerically, text lexicographically.
#[derive(Debug, Clone)]
pub enum MeasurementDate {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl MeasurementDate {
    fn storage_rank(&self) -> u8 {
        match self {
            MeasurementDate::Integer(_) | MeasurementDate::Real(_) => 0,
            MeasurementDate::Text(_) => 1,
        }
    }
}

impl Ord for MeasurementDate {
    fn cmp(&self, other: &Self) -> Ordering {
        use MeasurementDate::*;
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(a), Real(b)) => (*a as f64).total_cmp(b),
            (Real(a), Integer(b)) => a.total_cmp(&(*b as f64)),
            (Real(a), Real(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => self.storage_rank().cmp(&other.storage_rank()),
        }
    }
}

impl PartialOrd for MeasurementDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MeasurementDate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MeasurementDate {}

impl Display for MeasurementDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementDate::Integer(i) => write!(f, "{}", i),
            MeasurementDate::Real(r) => write!(f, "{}", r),
            MeasurementDate::Text(t) => f.write_str(t),
        }
    }
}

impl From<&str> for MeasurementDate {
    fn from(value: &str) -> Self {
        MeasurementDate::Text(value.to_string())
    }
}

impl FromSql for MeasurementDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(MeasurementDate::Integer(i)),
            ValueRef::Real(r) => Ok(MeasurementDate::Real(r)),
            ValueRef::Text(_) => value.as_str().map(|s| MeasurementDate::Text(s.to_owned())),
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

impl ToSql for MeasurementDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            MeasurementDate::Integer(i) => ToSqlOutput::from(*i),
            MeasurementDate::Real(r) => ToSqlOutput::from(*r),
            MeasurementDate::Text(t) => ToSqlOutput::from(t.as_str()),
        })
    }
}

/// A commit value or file name. The store selects these as text, NULL is
/// read as "".
pub(crate) struct Label(pub String);

impl FromSql for Label {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Label(String::new())),
            _ => value.as_str().map(|s| Label(s.to_owned())),
        }
    }
}

/// One row of a measurement table.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub row_id: i64,
    pub commit_value: String,
    pub source_file: String,
    pub date: MeasurementDate,
    /// Metric cells in declared column order.
    pub metrics: Vec<Value>,
}

/// Interprets a metric cell as a number. NULL cells yield `Ok(None)`.
///
/// Text is accepted when it parses as a float, otherwise the error describes
/// the offending cell.
pub fn cell_as_f64(cell: &Value) -> Result<Option<f64>, String> {
    match cell {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i as f64)),
        Value::Real(r) => Ok(Some(*r)),
        Value::Text(t) => t
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("found text value '{}'", t)),
        Value::Blob(b) => Err(format!("found blob value of {} bytes", b.len())),
    }
}

/// Renders a cell for hover texts and tab-separated output.
pub fn cell_display(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// A validated pair of commits with their resolved dates.
/// `start_date <= end_date` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRange {
    pub start_commit: String,
    pub start_date: MeasurementDate,
    pub end_commit: String,
    pub end_date: MeasurementDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPoint {
    pub commit_value: String,
    pub date: MeasurementDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionPoint {
    pub row_id: i64,
    pub commit_value: String,
    pub date: MeasurementDate,
    pub source_file: String,
    pub value: f64,
    /// Cells of the other metric columns, shown as hover context.
    pub context: Vec<Value>,
}

/// Plot-ready table of every row of one metric column.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionTable {
    pub table: String,
    pub metric: String,
    pub context_columns: Vec<String>,
    pub points: Vec<DistributionPoint>,
}

/// Plot-ready table of one statistic per (commit, date), in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionTable {
    pub table: String,
    pub metric: String,
    pub statistic: ReductionFunc,
    pub range: CommitRange,
    pub points: Vec<AggregatedPoint>,
}
