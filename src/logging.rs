/// Structured logging for the groundwater sync service.
///
/// Context-rich logging with well identifiers, timestamps, and severity
/// levels. Supports console output plus an optional append-to-file log so
/// scheduled daily runs leave an inspectable trail.

use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::{FailureReason, RunSummary};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Vizugy,
    Db,
    Backup,
    Sys,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Vizugy => write!(f, "VIZUGY"),
            DataSource::Db => write!(f, "DB"),
            DataSource::Backup => write!(f, "BACKUP"),
            DataSource::Sys => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>) {
        let logger = Logger { min_level, log_file };
        *LOGGER.lock().unwrap() = Some(logger);
    }

    fn log(&self, level: LogLevel, source: &DataSource, well_code: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let well_part = well_code.map(|c| format!(" [#{}]", c)).unwrap_or_default();
        let entry = format!("{} {} {}{}: {}", timestamp, level, source, well_part, message);

        match level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", entry),
            LogLevel::Info | LogLevel::Debug => println!("{}", entry),
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    Logger::init(min_level, log_file.map(String::from));
}

pub fn info(source: DataSource, well_code: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, &source, well_code, message);
    }
}

pub fn warn(source: DataSource, well_code: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, &source, well_code, message);
    }
}

pub fn error(source: DataSource, well_code: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, &source, well_code, message);
    }
}

pub fn debug(source: DataSource, well_code: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, &source, well_code, message);
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a well pipeline failure at a severity matching its kind.
///
/// Transient failures (network, store) log at error — they indicate service
/// or connectivity trouble. Structural parse failures log at warning: they
/// usually mean the page layout changed for one well and need a human look,
/// not a retry.
pub fn log_well_failure(well_code: &str, well_name: &str, reason: &FailureReason) {
    let source = match reason {
        FailureReason::Fetch(_) | FailureReason::Parse(_) => DataSource::Vizugy,
        FailureReason::WellNotRegistered | FailureReason::Store(_) => DataSource::Db,
    };
    let message = format!("{}: {}", well_name, reason);

    if reason.is_transient() {
        error(source, Some(well_code), &message);
    } else {
        warn(source, Some(well_code), &message);
    }
}

/// Log the end-of-run summary, one line per failed well plus the totals.
pub fn log_run_summary(summary: &RunSummary) {
    for outcome in &summary.outcomes {
        if let Some(reason) = &outcome.failure_reason {
            warn(
                DataSource::Sys,
                Some(&outcome.well_code),
                &format!("{} failed: {}", outcome.well_name, reason),
            );
        } else if outcome.failed_records > 0 {
            warn(
                DataSource::Sys,
                Some(&outcome.well_code),
                &format!(
                    "{}: {} record(s) failed to insert",
                    outcome.well_name, outcome.failed_records
                ),
            );
        }
    }

    let message = format!(
        "run complete: {} scraped, {} inserted, {} already present, {}/{} wells failed",
        summary.total_scraped,
        summary.total_inserted,
        summary.total_skipped,
        summary.wells_failed,
        summary.wells_total
    );

    if summary.wells_failed == 0 {
        info(DataSource::Sys, None, &message);
    } else if summary.wells_failed == summary.wells_total {
        error(DataSource::Sys, None, &message);
    } else {
        warn(DataSource::Sys, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChartParseError;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_failure_logging_does_not_panic_without_init() {
        // Library users may call parsing helpers without initializing the
        // logger; logging must degrade to a no-op.
        log_well_failure(
            "4576",
            "Sátorhely",
            &FailureReason::Parse(ChartParseError::MarkerNotFound),
        );
    }
}
