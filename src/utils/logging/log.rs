//! Log lines shared by the reading, writing and loading stages.

use std::path::Path;
use std::time::Duration;

/// Debug line emitted before a simulation or summary file is touched
///
/// # Arguments
/// * `action` - What is about to happen, e.g. "Reading csv file"
/// * `path` - File being read or written
pub fn log_file_started(action: &str, path: &Path) {
    log::debug!("{action} {}", path.display());
}

/// Debug line emitted once a file has been fully read or written
///
/// # Arguments
/// * `action` - Past-tense verb, e.g. "read" or "wrote"
/// * `path` - File that was handled
/// * `rows` - Rows read from or written to it
/// * `elapsed` - Time taken, when measured
pub fn log_file_finished(action: &str, path: &Path, rows: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(elapsed) => log::debug!("{}: {action} {rows} row(s) in {elapsed:?}", path.display()),
        None => log::debug!("{}: {action} {rows} row(s)", path.display()),
    }
}

/// Warn that a scenario will not appear in the output
pub fn log_skip(scenario: &str, reason: &dyn std::fmt::Display) {
    log::warn!("Skipping scenario '{scenario}': {reason}");
}

/// Warn about a condition tied to a directory or file
pub fn log_path_warning(message: &str, path: &Path) {
    log::warn!("{message} {}", path.display());
}
