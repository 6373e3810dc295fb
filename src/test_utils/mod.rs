//! Test-only helpers shared across crate unit tests.
//!
//! This module is only compiled for unit tests and provides small utilities
//! used by multiple test modules to keep individual test files focused.

pub mod recording_connection;

use std::sync::OnceLock;

use logtest::Logger;
use parking_lot::{Mutex, MutexGuard};

static CAPTURE: OnceLock<Mutex<Logger>> = OnceLock::new();

/// Exclusive access to the process-wide capture logger.
///
/// `Logger::start` installs the global logger, which only succeeds once per
/// test binary, so it runs on first use. Records left by earlier tests are
/// discarded before the guard is handed out.
pub fn capture_logs() -> MutexGuard<'static, Logger> {
    let mut logger = CAPTURE.get_or_init(|| Mutex::new(Logger::start())).lock();
    while logger.pop().is_some() {}
    logger
}

/// Drain every captured record at `level` and return the formatted messages.
///
/// Tests running in parallel log into the same queue, so callers filter for
/// the text they expect rather than relying on record order.
pub fn captured_messages(logger: &mut Logger, level: log::Level) -> Vec<String> {
    std::iter::from_fn(|| logger.pop())
        .filter(|record| record.level() == level)
        .map(|record| record.args().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;

    #[rstest]
    #[serial]
    fn capture_can_be_taken_repeatedly() {
        drop(capture_logs());
        let mut logger = capture_logs();
        log::warn!("second capture sees this");
        let warnings = captured_messages(&mut logger, log::Level::Warn);
        assert!(warnings.iter().any(|w| w == "second capture sees this"));
    }
}
