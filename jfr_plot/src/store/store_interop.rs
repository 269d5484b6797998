use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension};

use crate::data::{Label, MeasurementDate, MeasurementRow};
use crate::error::{PipelineError, PipelineResult};

use super::store_definitions::{FIXED_COLUMN_COUNT, MAX_BOUND_PARAMETERS, SQLITE_INTERNAL_TABLE_PREFIX};
use super::store_lowlevel::{
    label_expression, query_rows, quote_identifier, select_all_columns, table_columns, user_tables,
};
use super::store_types::{ColumnInfo, TableSchema};

/// Opens a measurement database for reading. The database must exist.
pub fn open_read_only(path: &Path) -> PipelineResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    log::debug!("Opened measurement database {}", path.display());
    Ok(conn)
}

/// All measurement tables, sorted by name.
pub fn list_tables(conn: &Connection) -> PipelineResult<Vec<String>> {
    Ok(user_tables(conn, SQLITE_INTERNAL_TABLE_PREFIX)?)
}

/// Metric columns of `table` in declared order, i.e. every column after the
/// four fixed leading ones.
pub fn list_metric_columns(conn: &Connection, table: &str) -> PipelineResult<Vec<String>> {
    let table = MeasurementTable::open(conn, table)?;
    Ok(table
        .schema()
        .metric_columns()
        .iter()
        .map(|c| c.name.clone())
        .collect())
}

/// Introspects `table`. Fails with [`PipelineError::UnknownTable`] unless the
/// name is one of [`list_tables`].
pub fn table_schema(conn: &Connection, table: &str) -> PipelineResult<TableSchema> {
    if !list_tables(conn)?.iter().any(|t| t == table) {
        return Err(PipelineError::UnknownTable {
            table: table.to_string(),
        });
    }

    let columns = table_columns(conn, table)?;
    if columns.len() < FIXED_COLUMN_COUNT {
        return Err(PipelineError::MalformedSchema {
            table: table.to_string(),
            reason: format!(
                "expected at least {} columns (row id, commit value, source file, date), found {}",
                FIXED_COLUMN_COUNT,
                columns.len()
            ),
        });
    }

    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

/// A measurement table whose name has been checked against the catalog,
/// bound to the connection owned by the caller.
pub struct MeasurementTable<'c> {
    conn: &'c Connection,
    schema: TableSchema,
}

impl<'c> MeasurementTable<'c> {
    pub fn open(conn: &'c Connection, table: &str) -> PipelineResult<MeasurementTable<'c>> {
        let schema = table_schema(conn, table)?;
        Ok(MeasurementTable { conn, schema })
    }

    pub fn name(&self) -> &str {
        &self.schema.table
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn metric_column(&self, column: &str) -> PipelineResult<(usize, &ColumnInfo)> {
        self.schema.metric_column(column)
    }

    pub fn numeric_metric_column(&self, column: &str) -> PipelineResult<(usize, &ColumnInfo)> {
        self.schema.numeric_metric_column(column)
    }

    fn order_by_row_id(&self) -> String {
        format!(" ORDER BY {}", quote_identifier(self.schema.row_id_column()))
    }

    /// Every row of the table in row id order.
    pub fn fetch_all(&self) -> PipelineResult<Vec<MeasurementRow>> {
        let sql = format!("{}{}", select_all_columns(&self.schema), self.order_by_row_id());
        let rows = query_rows(self.conn, &self.schema, &sql, [])?;
        log::debug!("Fetched {} rows from {}", rows.len(), self.name());
        Ok(rows)
    }

    /// Rows dated within `[start_date, end_date]`. The bounds are not checked
    /// for ordering here.
    pub fn fetch_in_date_range(
        &self,
        start_date: &MeasurementDate,
        end_date: &MeasurementDate,
    ) -> PipelineResult<Vec<MeasurementRow>> {
        let sql = format!(
            "{} WHERE {} BETWEEN ?1 AND ?2{}",
            select_all_columns(&self.schema),
            quote_identifier(self.schema.date_column()),
            self.order_by_row_id()
        );
        let rows = query_rows(self.conn, &self.schema, &sql, (start_date, end_date))?;
        log::debug!(
            "Fetched {} rows from {} dated between {} and {}",
            rows.len(),
            self.name(),
            start_date,
            end_date
        );
        Ok(rows)
    }

    /// Rows whose commit value is one of `commit_values`. An empty set yields
    /// no rows without touching the database.
    pub fn fetch_for_commits(
        &self,
        commit_values: &BTreeSet<String>,
    ) -> PipelineResult<Vec<MeasurementRow>> {
        if commit_values.is_empty() {
            return Ok(vec![]);
        }

        let commits: Vec<&String> = commit_values.iter().collect();
        let mut rows = Vec::new();
        for chunk in commits.chunks(MAX_BOUND_PARAMETERS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "{} WHERE {} IN ({})",
                select_all_columns(&self.schema),
                label_expression(self.schema.commit_value_column()),
                placeholders
            );
            rows.extend(query_rows(
                self.conn,
                &self.schema,
                &sql,
                params_from_iter(chunk.iter()),
            )?);
        }
        rows.sort_by_key(|r| r.row_id);

        log::debug!(
            "Fetched {} rows from {} for {} commits",
            rows.len(),
            self.name(),
            commit_values.len()
        );
        Ok(rows)
    }

    /// Date of the first row (in row id order) recorded for `commit_value`.
    pub fn first_date_of(&self, commit_value: &str) -> PipelineResult<Option<MeasurementDate>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1{} LIMIT 1",
            quote_identifier(self.schema.date_column()),
            quote_identifier(self.name()),
            label_expression(self.schema.commit_value_column()),
            self.order_by_row_id()
        );
        let date = self
            .conn
            .query_row(&sql, [commit_value], |row| row.get(0))
            .optional()?;
        Ok(date)
    }

    /// Distinct commit values with their earliest date, oldest first.
    pub fn list_commits(&self) -> PipelineResult<Vec<(String, MeasurementDate)>> {
        let sql = format!(
            "SELECT {commit}, MIN({date}) FROM {table} GROUP BY 1 ORDER BY 2, 1",
            commit = label_expression(self.schema.commit_value_column()),
            date = quote_identifier(self.schema.date_column()),
            table = quote_identifier(self.name()),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let commits = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Label>(0)?.0, row.get::<_, MeasurementDate>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(commits)
    }
}
