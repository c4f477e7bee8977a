use std::path::{Path, PathBuf};

use crate::error::{LoaderError, Result};

/// Full paths of the `.csv` entries directly inside `directory`.
///
/// The suffix match is on the literal bytes of the entry name, so `y.CSV` is
/// not listed. Entries come back in directory-listing order and are not
/// checked for being regular files.
pub fn list_csv_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        log::error!("Directory not found: {}", directory.display());
        return Err(LoaderError::NotFound {
            path: directory.to_path_buf(),
        });
    }

    let listing = |e: std::io::Error| LoaderError::io(format!("listing {}", directory.display()), e);
    let mut csv_files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(listing)? {
        let entry = entry.map_err(listing)?;
        if entry.file_name().as_encoded_bytes().ends_with(b".csv") {
            csv_files.push(directory.join(entry.file_name()));
        }
    }

    log::info!("Found {} CSV files in {}", csv_files.len(), directory.display());
    Ok(csv_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lowercase_csv_suffix_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x.csv", "y.CSV", "z.txt"] {
            std::fs::write(dir.path().join(name), "a\n1\n").unwrap();
        }
        let found = list_csv_files(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("x.csv")]);
    }

    #[test]
    fn directories_with_csv_names_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("archive.csv")).unwrap();
        assert_eq!(list_csv_files(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(list_csv_files(&missing), Err(LoaderError::NotFound { .. })));

        let file = dir.path().join("file.csv");
        std::fs::write(&file, "a\n").unwrap();
        assert!(matches!(list_csv_files(&file), Err(LoaderError::NotFound { .. })));
    }
}
