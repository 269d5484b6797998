use thiserror::Error;

/// Failures of the selection and aggregation pipeline.
///
/// All variants except [`PipelineError::MalformedSchema`] and
/// [`PipelineError::Sqlite`] describe a rejected request: the caller reports
/// them and aborts the current plot, nothing else is affected.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown table '{table}'.")]
    UnknownTable { table: String },

    #[error("Unknown metric column '{column}' in table '{table}'.")]
    UnknownColumn { table: String, column: String },

    #[error("Commit '{commit}' not found in table '{table}'.")]
    CommitNotFound { table: String, commit: String },

    #[error("The commit values are not sequential: '{start_commit}' ({start_date}) is dated after '{end_commit}' ({end_date}).")]
    NonSequentialCommits {
        start_commit: String,
        start_date: String,
        end_commit: String,
        end_date: String,
    },

    #[error("No data between the selected commits '{start_commit}' and '{end_commit}'.")]
    EmptySelection {
        start_commit: String,
        end_commit: String,
    },

    #[error("Column '{column}' of table '{table}' is not numeric ({detail}).")]
    InvalidColumnType {
        table: String,
        column: String,
        detail: String,
    },

    #[error("Malformed schema for table '{table}': {reason}")]
    MalformedSchema { table: String, reason: String },

    #[error("Failed to query the measurement database")]
    Sqlite(#[from] rusqlite::Error),
}

impl PipelineError {
    /// Whether the error is a user-facing validation failure rather than a
    /// fault of the underlying data source.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PipelineError::MalformedSchema { .. } | PipelineError::Sqlite(_)
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
