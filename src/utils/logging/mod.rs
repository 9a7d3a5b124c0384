//! Logging utilities for stage transitions and progress tracking
//!
//! This module provides utilities for logging and progress tracking.

#[cfg(test)]
pub(crate) mod capture;
pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use self::log::{log_file_finished, log_file_started, log_skip, log_path_warning};
pub use progress::{create_main_progress_bar, finish_progress_bar};

/// Initialise `env_logger` with timestamped `time:LEVEL: message` lines.
///
/// The level defaults to `info` and can be changed through `RUST_LOG`.
/// Calling this more than once is harmless.
pub fn init_logging() {
    use std::io::Write;

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{}: {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
