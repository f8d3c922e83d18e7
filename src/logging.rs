//! Logging
//!
//! The runtime reports diagnostics through a [`LogSink`]. Executors, coroutines
//! and task bridges receive their sink by injection; a process-wide sink slot
//! exists for code that has nothing injected.
//!
//! # Sinks
//! - [`TracingSink`]: forwards to `tracing` (the default everywhere)
//! - [`MemorySink`]: keeps entries in memory for later inspection
//!
//! Reading the global slot while it is empty is the only failure mode:
//! nothing breaks at load time when no logger has been set up.

use crate::error::RuntimeError;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Destination for runtime diagnostics
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str, severity: Severity, context: Option<&str>);

    /// Called once a fatal assertion has failed, after the error is logged
    fn on_break(&self, _message: &str) {}
}

pub type Logger = Arc<dyn LogSink>;

/// The sink used when nothing else is injected
pub fn default_logger() -> Logger {
    Arc::new(TracingSink)
}

/* ===================== Tracing ===================== */

/// Forwards every entry to the `tracing` macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str, severity: Severity, context: Option<&str>) {
        let context = context.unwrap_or("");
        match severity {
            Severity::Error => tracing::error!(context, "{}", message),
            Severity::Warning => tracing::warn!(context, "{}", message),
            Severity::Info => tracing::info!(context, "{}", message),
        }
    }

    fn on_break(&self, message: &str) {
        tracing::error!(assertion = message, "runtime assertion failed");
    }
}

/* ===================== Memory ===================== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub severity: Severity,
    pub context: Option<String>,
}

/// Collects entries in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
    breaks: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn breaks(&self) -> Vec<String> {
        self.breaks.lock().clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str, severity: Severity, context: Option<&str>) {
        self.entries.lock().push(LogEntry {
            message: message.to_string(),
            severity,
            context: context.map(str::to_string),
        });
    }

    fn on_break(&self, message: &str) {
        self.breaks.lock().push(message.to_string());
    }
}

/* ===================== Global Sink ===================== */

static GLOBAL_SINK: RwLock<Option<Logger>> = parking_lot::const_rwlock(None);

pub fn set_global_sink(sink: Logger) {
    *GLOBAL_SINK.write() = Some(sink);
}

pub fn clear_global_sink() {
    *GLOBAL_SINK.write() = None;
}

/// The configured process-wide sink
pub fn global_sink() -> Result<Logger, RuntimeError> {
    GLOBAL_SINK
        .read()
        .clone()
        .ok_or(RuntimeError::LoggerNotConfigured)
}

/// Log through the process-wide sink
pub fn log(message: &str, severity: Severity, context: Option<&str>) -> Result<(), RuntimeError> {
    global_sink()?.log(message, severity, context);
    Ok(())
}

/// Check a condition, breaking through the process-wide sink when it does not hold
pub fn assert_that(condition: bool, message: &str) -> Result<(), RuntimeError> {
    if condition {
        return Ok(());
    }
    Err(break_with(&global_sink()?, message))
}

/// Report a fatal assertion failure on `sink` and build the matching error
pub fn break_with(sink: &Logger, message: &str) -> RuntimeError {
    sink.log(message, Severity::Error, Some("assertion"));
    sink.on_break(message);
    RuntimeError::AssertionFailed(message.to_string())
}

/* ===================== Subscriber ===================== */

/// Install a stderr `fmt` subscriber; `RUST_LOG` overrides `default_filter`
///
/// Safe to call more than once: later calls leave the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
