use std::collections::HashSet;
use std::path::Path;

use super::model::{column_names, Table};
use crate::error::{LoaderError, Result};

/// Fail with [`LoaderError::NotFound`] unless something exists at `path`.
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        log::error!("File not found: {}", path.display());
        return Err(LoaderError::NotFound {
            path: path.to_path_buf(),
        });
    }
    log::info!("File exists: {}", path.display());
    Ok(())
}

/// Check that every name in `expected` is a column of `table`.
///
/// The error lists the missing names in the order they were asked for.
pub fn validate_columns<S: AsRef<str>>(table: &Table, expected: &[S]) -> Result<()> {
    let present: HashSet<String> = column_names(table).into_iter().collect();
    let missing: Vec<String> = expected
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !present.contains(*c))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        log::error!("Missing columns: {missing:?}");
        return Err(LoaderError::SchemaMismatch { missing });
    }
    log::info!("All expected columns are present.");
    Ok(())
}
