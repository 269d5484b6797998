use anyhow::{Context, Result};
use regex::Regex;

/// Compile table filter patterns into regex objects
pub fn compile_filters(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("Invalid regex pattern: '{}'", pattern))
        })
        .collect()
}

/// Check if a table name matches any of the compiled filters
/// Returns true if filters is empty (no filters = match all)
pub fn matches_any_filter(name: &str, filters: &[Regex]) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters.iter().any(|re| re.is_match(name))
}

/// Keeps the names matching any of `patterns`, preserving their order.
pub fn filter_names(names: Vec<String>, patterns: &[String]) -> Result<Vec<String>> {
    let filters = compile_filters(patterns)?;
    Ok(names
        .into_iter()
        .filter(|name| matches_any_filter(name, &filters))
        .collect())
}
