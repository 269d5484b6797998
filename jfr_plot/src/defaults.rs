//! Centralized default values for jfr-plot configuration.
//!
//! These are the fallback values used when neither the command line nor a
//! configuration file provides a setting.

use crate::stats::ReductionFunc;

// ============================================================================
// Database Defaults
// ============================================================================

/// Directory searched for databases given by name rather than by path.
///
/// Used when the configuration file does not specify `database.directory`.
pub const DEFAULT_DATABASE_DIRECTORY: &str = "./databases";

/// Extension appended to a database name to form its file name.
pub const DATABASE_EXTENSION: &str = "db";

// ============================================================================
// Progression Defaults
// ============================================================================

/// Statistic reducing each (commit, date) group of a trend plot.
///
/// Used when neither `--statistic` nor `progression.*.statistic` is given.
pub const DEFAULT_STATISTIC: ReductionFunc = ReductionFunc::Mean;

// ============================================================================
// Reporting Defaults
// ============================================================================

/// Horizontal spread of the individual points drawn next to each box.
pub const DEFAULT_POINT_JITTER: f64 = 0.3;

/// Angle of the commit value labels on the x-axis of trend plots.
pub const DEFAULT_TICK_ANGLE: f64 = 45.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Returns the default database directory.
#[inline]
pub const fn default_database_directory() -> &'static str {
    DEFAULT_DATABASE_DIRECTORY
}

/// Returns the default progression statistic.
#[inline]
pub const fn default_statistic() -> ReductionFunc {
    DEFAULT_STATISTIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_directory() {
        assert_eq!(DEFAULT_DATABASE_DIRECTORY, "./databases");
        assert_eq!(default_database_directory(), "./databases");
    }

    #[test]
    fn test_default_statistic() {
        assert_eq!(DEFAULT_STATISTIC, ReductionFunc::Mean);
        assert_eq!(default_statistic(), ReductionFunc::Mean);
    }
}
