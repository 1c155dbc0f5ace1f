//! Unit tests for log.rs
//!
//! Other unit tests log concurrently, so every assertion filters captured
//! entries by a source string unique to the test.

use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Test logger that captures log entries for verification
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn captured(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<LogEntry> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == source)
        .cloned()
        .collect()
}

// ============================================================================
// SEVERITY
// ============================================================================

#[test]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_default_logger_handles_both_formats() {
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "mana::log_tests".to_string(),
        message: "plain".to_string(),
        file: None,
        line: None,
    });
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "mana::log_tests".to_string(),
        message: "detailed".to_string(),
        file: Some("log_tests.rs"),
        line: Some(42),
    });
}

// ============================================================================
// MACROS
// ============================================================================

#[test]
#[serial]
fn test_macros_route_to_custom_logger() {
    let (logger, entries) = CaptureLogger::new();
    crate::log::set_logger(logger);

    crate::mana_trace!("test::macros", "trace {}", 1);
    crate::mana_debug!("test::macros", "debug {}", 2);
    crate::mana_info!("test::macros", "info {}", 3);
    crate::mana_warn!("test::macros", "warn {}", 4);
    crate::mana_error!("test::macros", "error {}", 5);

    let logs = captured(&entries, "test::macros");
    crate::log::reset_logger();

    assert_eq!(logs.len(), 5);
    assert_eq!(logs[0].severity, LogSeverity::Trace);
    assert_eq!(logs[0].message, "trace 1");
    assert_eq!(logs[3].severity, LogSeverity::Warn);
    assert!(logs[3].file.is_none());
    assert_eq!(logs[4].severity, LogSeverity::Error);
    assert_eq!(logs[4].message, "error 5");
    assert!(logs[4].file.is_some());
    assert!(logs[4].line.is_some());
}

#[test]
#[serial]
fn test_mana_err_logs_and_builds_backend_error() {
    let (logger, entries) = CaptureLogger::new();
    crate::log::set_logger(logger);

    let err = crate::mana_err!("test::mana_err", "queue submit failed: {}", -4);

    let logs = captured(&entries, "test::mana_err");
    crate::log::reset_logger();

    match err {
        crate::mana::Error::BackendError(msg) => assert_eq!(msg, "queue submit failed: -4"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].severity, LogSeverity::Error);
}

#[test]
#[serial]
fn test_mana_bail_returns_early() {
    fn checked(index: u32) -> crate::mana::Result<u32> {
        if index >= 3 {
            crate::mana_bail!("test::mana_bail", "index {} out of range", index);
        }
        Ok(index)
    }

    let (logger, entries) = CaptureLogger::new();
    crate::log::set_logger(logger);

    assert_eq!(checked(1).unwrap(), 1);
    assert!(checked(7).is_err());

    let logs = captured(&entries, "test::mana_bail");
    crate::log::reset_logger();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "index 7 out of range");
}
