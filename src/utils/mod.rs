//! Utility functions shared by the loader, aggregator and publisher

pub mod logging;
pub mod paths;

pub use logging::{
    create_main_progress_bar, finish_progress_bar, init_logging, log_file_finished,
    log_file_started, log_skip, log_path_warning,
};
pub use paths::{RunLayout, find_csv_files, find_prefixed_files, setup_output_dirs};

/// Default batch size for reading input files
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("ROLLUP_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Batch size to use for readers: the environment override or the default
#[must_use]
pub fn batch_size() -> usize {
    get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE)
}
