/// Every measurement table starts with these columns, in this order:
/// row id, commit value, source file, date. Only their positions are fixed,
/// their names are read from the schema.
pub const FIXED_COLUMN_COUNT: usize = 4;

pub const ROW_ID_POSITION: usize = 0;
pub const COMMIT_VALUE_POSITION: usize = 1;
pub const SOURCE_FILE_POSITION: usize = 2;
pub const DATE_POSITION: usize = 3;

/// Upper bound of bound parameters per `IN (...)` query. Matches the
/// historical SQLITE_MAX_VARIABLE_NUMBER default.
pub const MAX_BOUND_PARAMETERS: usize = 999;

/// Tables SQLite creates for its own bookkeeping.
pub const SQLITE_INTERNAL_TABLE_PREFIX: &str = "sqlite_";
