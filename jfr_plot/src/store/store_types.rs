use crate::error::{PipelineError, PipelineResult};

use super::store_definitions::{
    COMMIT_VALUE_POSITION, DATE_POSITION, FIXED_COLUMN_COUNT, ROW_ID_POSITION,
    SOURCE_FILE_POSITION,
};

/// Type affinity of a column, derived from its declared type with SQLite's
/// own rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    pub fn from_declared_type(declared_type: &str) -> Affinity {
        let declared = declared_type.to_ascii_uppercase();
        if declared.contains("INT") {
            Affinity::Integer
        } else if ["CHAR", "CLOB", "TEXT"]
            .iter()
            .any(|needle| declared.contains(needle))
        {
            Affinity::Text
        } else if declared.is_empty() || declared.contains("BLOB") {
            Affinity::Blob
        } else if ["REAL", "FLOA", "DOUB"]
            .iter()
            .any(|needle| declared.contains(needle))
        {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Affinity::Integer | Affinity::Real | Affinity::Numeric)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

impl ColumnInfo {
    pub fn affinity(&self) -> Affinity {
        Affinity::from_declared_type(&self.declared_type)
    }
}

/// Introspected layout of a measurement table.
///
/// Only built from the database catalog, so every name in here is a real
/// identifier of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn row_id_column(&self) -> &str {
        &self.columns[ROW_ID_POSITION].name
    }

    pub fn commit_value_column(&self) -> &ColumnInfo {
        &self.columns[COMMIT_VALUE_POSITION]
    }

    pub fn source_file_column(&self) -> &ColumnInfo {
        &self.columns[SOURCE_FILE_POSITION]
    }

    pub fn date_column(&self) -> &str {
        &self.columns[DATE_POSITION].name
    }

    pub fn metric_columns(&self) -> &[ColumnInfo] {
        &self.columns[FIXED_COLUMN_COUNT..]
    }

    /// Position of a metric column within [`TableSchema::metric_columns`].
    pub fn metric_index(&self, column: &str) -> Option<usize> {
        self.metric_columns().iter().position(|c| c.name == column)
    }

    /// Looks up a metric column. Fails with [`PipelineError::UnknownColumn`]
    /// for names that are not metric columns of this table, including the
    /// fixed leading columns.
    pub fn metric_column(&self, column: &str) -> PipelineResult<(usize, &ColumnInfo)> {
        self.metric_index(column)
            .map(|index| (index, &self.metric_columns()[index]))
            .ok_or_else(|| PipelineError::UnknownColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })
    }

    /// Like [`TableSchema::metric_column`], additionally requiring a numeric
    /// declared type.
    pub fn numeric_metric_column(&self, column: &str) -> PipelineResult<(usize, &ColumnInfo)> {
        let (index, info) = self.metric_column(column)?;
        if !info.affinity().is_numeric() {
            return Err(PipelineError::InvalidColumnType {
                table: self.table.clone(),
                column: column.to_string(),
                detail: format!("declared type '{}'", info.declared_type),
            });
        }
        Ok((index, info))
    }
}
