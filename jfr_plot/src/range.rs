use crate::{
    data::{CommitRange, MeasurementDate},
    error::{PipelineError, PipelineResult},
    store::store_interop::MeasurementTable,
};

/// Date of the first row (in row id order) recorded for `commit_value`.
pub fn resolve_date(table: &MeasurementTable, commit_value: &str) -> PipelineResult<MeasurementDate> {
    table
        .first_date_of(commit_value)?
        .ok_or_else(|| PipelineError::CommitNotFound {
            table: table.name().to_string(),
            commit: commit_value.to_string(),
        })
}

/// Resolves both commits and checks that `start_commit` is not dated after
/// `end_commit`. Equal dates, including `start_commit == end_commit`, are
/// accepted.
pub fn validate_range(
    table: &MeasurementTable,
    start_commit: &str,
    end_commit: &str,
) -> PipelineResult<CommitRange> {
    let start_date = resolve_date(table, start_commit)?;
    let end_date = resolve_date(table, end_commit)?;

    if start_date > end_date {
        return Err(PipelineError::NonSequentialCommits {
            start_commit: start_commit.to_string(),
            start_date: start_date.to_string(),
            end_commit: end_commit.to_string(),
            end_date: end_date.to_string(),
        });
    }

    log::debug!(
        "Commit range {} ({}) .. {} ({})",
        start_commit,
        start_date,
        end_commit,
        end_date
    );

    Ok(CommitRange {
        start_commit: start_commit.to_string(),
        start_date,
        end_commit: end_commit.to_string(),
        end_date,
    })
}
