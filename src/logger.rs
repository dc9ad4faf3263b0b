//! Custom logging module.
//!
//! This module provides the `log` backend: records are formatted with a UTC
//! timestamp, written to stderr, and optionally forwarded to a callback.

use crate::error::AppError;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;
use std::sync::{Arc, Mutex};

type Callback = Box<dyn Fn(String) + Send + Sync>;

/// Format a log record into a string for display
///
pub fn format_log(record: &Record) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let level_str = match record.level() {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };
    format!("{} {} {}", timestamp, level_str, record.args())
}

/// Logger writing formatted records to stderr.
///
pub struct Logger {
    level: LevelFilter,
    log_callback: Arc<Mutex<Option<Callback>>>,
}

impl Logger {
    pub fn new(level: LevelFilter) -> Self {
        Logger {
            level,
            log_callback: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_log_callback(&self, callback: Callback) {
        if let Ok(mut guard) = self.log_callback.lock() {
            *guard = Some(callback);
        }
        // A poisoned lock only loses the callback; stderr output continues.
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let formatted = format_log(record);
        let _ = writeln!(std::io::stderr(), "{}", formatted);
        if let Ok(callback) = self.log_callback.lock() {
            if let Some(ref cb) = *callback {
                cb(formatted);
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the logger as the global `log` backend.
///
pub fn init(level: LevelFilter) -> Result<(), AppError> {
    log::set_boxed_logger(Box::new(Logger::new(level)))
        .map_err(|e| AppError::Logger(e.to_string()))?;
    log::set_max_level(level);
    Ok(())
}
