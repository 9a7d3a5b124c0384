//! In-memory logger for asserting on emitted log lines in unit tests.

use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct CaptureLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

/// Install the capturing logger; later calls are no-ops
pub fn install() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

/// Captured lines at `level` containing `needle`.
///
/// Tests run in parallel, so callers should search for text unique to their case.
pub fn lines_containing(level: Level, needle: &str) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .map(|lines| {
            lines
                .iter()
                .filter(|(l, msg)| *l == level && msg.contains(needle))
                .map(|(_, msg)| msg.clone())
                .collect()
        })
        .unwrap_or_default()
}
