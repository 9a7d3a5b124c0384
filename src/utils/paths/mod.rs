//! Path utilities for input discovery and the output directory layout.

pub mod general;

use std::fs;
use std::path::{Path, PathBuf};

pub use general::{find_csv_files, find_prefixed_files};

use crate::config::PipelineConfig;
use crate::error::{Result, RollupError};

/// Directories of one run under the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    /// `<output>/data`, where CSVs are written
    pub data_dir: PathBuf,
    /// `<output>/graphs`
    pub graphs_dir: PathBuf,
    /// `<output>/<YYYYMMDD>`
    pub dated_dir: PathBuf,
    /// `<output>/latest`, pointing at `dated_dir` where symlinks are supported
    pub latest_link: PathBuf,
}

/// Create the output directories for this run and repoint `latest`
///
/// Existing directories are reused. A previous `latest` link is replaced.
///
/// # Errors
/// Returns an error if a directory cannot be created or the link cannot be replaced
pub fn setup_output_dirs(config: &PipelineConfig) -> Result<RunLayout> {
    log::info!("Setting up directories under {}", config.output_dir.display());

    let layout = RunLayout {
        data_dir: config.data_dir(),
        graphs_dir: config.graphs_dir(),
        dated_dir: config.output_dir.join(config.date_slug()),
        latest_link: config.output_dir.join("latest"),
    };

    for dir in [&layout.data_dir, &layout.graphs_dir, &layout.dated_dir] {
        fs::create_dir_all(dir).map_err(|e| RollupError::io(dir, e))?;
    }

    replace_latest_link(&layout.dated_dir, &layout.latest_link)?;
    Ok(layout)
}

#[cfg(unix)]
fn replace_latest_link(target: &Path, link: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link).map_err(|e| RollupError::io(link, e))?;
    }
    std::os::unix::fs::symlink(target, link).map_err(|e| RollupError::io(link, e))
}

#[cfg(not(unix))]
fn replace_latest_link(_target: &Path, link: &Path) -> Result<()> {
    log::debug!("Symlinks unsupported here, not creating {}", link.display());
    Ok(())
}
