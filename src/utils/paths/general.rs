//! File discovery in scenario and output directories.

use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::error::{Result, RollupError};

/// Find regular files in `dir` whose names start with `prefix`
///
/// Companion metadata files share the directory with simulation output; the
/// prefix is what tells them apart.
///
/// # Returns
/// Matching paths sorted by file name
///
/// # Errors
/// Returns an error if the directory cannot be read
pub fn find_prefixed_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RollupError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RollupError::io(dir, e))?;
        let path = entry.path();
        let matches = path.is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix));
        if matches {
            files.push(path);
        }
    }
    Ok(files.into_iter().sorted().collect_vec())
}

/// Find `.csv` files directly inside `dir`, sorted by name
///
/// # Errors
/// Returns an error if the directory cannot be read
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RollupError::io(dir, e))?;
    Ok(entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
        .sorted()
        .collect_vec())
}
