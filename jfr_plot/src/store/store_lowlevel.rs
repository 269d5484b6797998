use rusqlite::types::Value;
use rusqlite::{Connection, Params, Row};

use crate::data::{Label, MeasurementRow};

use super::store_definitions::{
    COMMIT_VALUE_POSITION, DATE_POSITION, FIXED_COLUMN_COUNT, ROW_ID_POSITION,
    SOURCE_FILE_POSITION,
};
use super::store_types::{Affinity, ColumnInfo, TableSchema};

/// Quotes a name as an SQL identifier. Names are additionally checked
/// against the catalog before they reach a query.
pub(super) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(super) fn user_tables(conn: &Connection, internal_prefix: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, length(?1)) <> ?1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([internal_prefix], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

pub(super) fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnInfo>> {
    let mut stmt =
        conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<ColumnInfo>>>()?;
    Ok(rows)
}

/// Commit values and file names are selected and compared as text. A column
/// without TEXT affinity may store numbers, which are cast so that a value
/// listed by one query matches when it is bound as text in the next.
pub(super) fn label_expression(column: &ColumnInfo) -> String {
    let quoted = quote_identifier(&column.name);
    match column.affinity() {
        Affinity::Text => quoted,
        _ => format!("CAST({} AS TEXT)", quoted),
    }
}

/// `SELECT <all columns in declared order> FROM <table>`
pub(super) fn select_all_columns(schema: &TableSchema) -> String {
    let fixed = [
        quote_identifier(schema.row_id_column()),
        label_expression(schema.commit_value_column()),
        label_expression(schema.source_file_column()),
        quote_identifier(schema.date_column()),
    ];
    let columns = fixed
        .into_iter()
        .chain(schema.metric_columns().iter().map(|c| quote_identifier(&c.name)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {} FROM {}",
        columns,
        quote_identifier(&schema.table)
    )
}

fn read_row(row: &Row<'_>, metric_count: usize) -> rusqlite::Result<MeasurementRow> {
    let metrics = (FIXED_COLUMN_COUNT..FIXED_COLUMN_COUNT + metric_count)
        .map(|i| row.get::<_, Value>(i))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(MeasurementRow {
        row_id: row.get(ROW_ID_POSITION)?,
        commit_value: row.get::<_, Label>(COMMIT_VALUE_POSITION)?.0,
        source_file: row.get::<_, Label>(SOURCE_FILE_POSITION)?.0,
        date: row.get(DATE_POSITION)?,
        metrics,
    })
}

pub(super) fn query_rows<P: Params>(
    conn: &Connection,
    schema: &TableSchema,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<MeasurementRow>> {
    log::trace!("{}", sql);
    let metric_count = schema.metric_columns().len();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| read_row(row, metric_count))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("jdk_CPULoad"), "\"jdk_CPULoad\"");
        assert_eq!(
            quote_identifier("bench\"; DROP TABLE bench; --"),
            "\"bench\"\"; DROP TABLE bench; --\""
        );
    }

    fn schema_with_types(types: [&str; 5]) -> TableSchema {
        TableSchema {
            table: "bench".to_string(),
            columns: ["id_pk", "commit_value", "file", "date", "metric"]
                .iter()
                .zip(types)
                .map(|(name, declared_type)| ColumnInfo {
                    name: name.to_string(),
                    declared_type: declared_type.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_select_all_columns() {
        let schema = schema_with_types(["INTEGER", "TEXT", "VARCHAR(64)", "TEXT", "REAL"]);
        assert_eq!(
            select_all_columns(&schema),
            "SELECT \"id_pk\", \"commit_value\", \"file\", \"date\", \"metric\" FROM \"bench\""
        );
    }

    #[test]
    fn test_select_untyped_labels_as_text() {
        let schema = schema_with_types(["INTEGER", "", "", "", ""]);
        assert_eq!(
            select_all_columns(&schema),
            "SELECT \"id_pk\", CAST(\"commit_value\" AS TEXT), CAST(\"file\" AS TEXT), \"date\", \"metric\" FROM \"bench\""
        );
    }

    #[test]
    fn test_user_tables_skips_internal_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE zeta (a INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE alpha (a);",
        )
        .unwrap();
        // AUTOINCREMENT creates sqlite_sequence
        assert_eq!(
            user_tables(&conn, "sqlite_").unwrap(),
            vec!["alpha".to_string(), "zeta".to_string()]
        );
    }
}
