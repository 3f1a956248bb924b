//! Helpers shared by unit tests, integration tests and benches.
//!
//! Enabled with the `test-utils` feature.

use std::sync::Once;

use crate::config::LoggerConfig;
use crate::logger::ClockedLogger;
use crate::sink::MemorySink;

static INIT_LOGGING: Once = Once::new();

/// Routes the crate's `tracing` diagnostics to the test output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Logger backed by a `MemorySink`; the returned sink handle sees every record.
pub fn memory_logger(pid: &str, config: LoggerConfig) -> (ClockedLogger, MemorySink) {
    let sink = MemorySink::new();
    let logger = ClockedLogger::with_sink(pid, config, sink.clone());
    (logger, sink)
}
