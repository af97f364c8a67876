//! Rolling Logger
//!
//! Process-wide tracing setup for the survey client:
//! - stderr output for interactive use
//! - daily rolling log file under the given directory
//! - in-memory circular buffer of recent lines (shown in diagnostics views)
//!
//! `log` records are bridged into tracing, so both macro families end up in
//! the same three sinks.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Number of lines kept in the in-memory buffer
pub const DEFAULT_CAPACITY: usize = 500;

static BUFFER: OnceLock<Arc<Mutex<LineBuffer>>> = OnceLock::new();

/// Keeps the non-blocking file writer flushing until dropped
pub struct LoggerGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the global logger.
///
/// Log files are named `<app_name>.log.<date>` inside `log_dir`.
/// Fails if the directory cannot be created or a global subscriber is
/// already installed.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<LoggerGuard, String> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create log dir {}: {}", log_dir.display(), e))?;

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        log_dir,
        format!("{}.log", app_name),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let buffer = BUFFER
        .get_or_init(|| Arc::new(Mutex::new(LineBuffer::new(DEFAULT_CAPACITY))))
        .clone();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,waypoint_survey=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(BufferMakeWriter { buffer }),
        )
        .try_init()
        .map_err(|e| format!("Failed to initialize tracing: {}", e))?;

    tracing::info!(app = app_name, dir = %log_dir.display(), "logger initialized");

    Ok(LoggerGuard { _file_guard: guard })
}

/// Log an info line through the global logger
pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

/// Log an error line through the global logger
pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// Most recent log lines, oldest first
pub fn recent_lines() -> Vec<String> {
    BUFFER
        .get()
        .and_then(|buffer| buffer.lock().ok().map(|b| b.lines()))
        .unwrap_or_default()
}

fn ensure_initialized() -> Result<(), String> {
    if BUFFER.get().is_some() {
        Ok(())
    } else {
        Err("Logger not initialized".to_string())
    }
}

// ========================
// Circular line buffer
// ========================

/// Fixed-capacity line store; the oldest line is evicted first
#[derive(Debug)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            partial: String::new(),
        }
    }

    /// Append raw output; only newline-terminated lines are stored
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(bytes));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            if line.is_empty() {
                continue;
            }
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

struct BufferMakeWriter {
    buffer: Arc<Mutex<LineBuffer>>,
}

impl<'a> MakeWriter<'a> for BufferMakeWriter {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter {
            buffer: self.buffer.clone(),
        }
    }
}

struct BufferWriter {
    buffer: Arc<Mutex<LineBuffer>>,
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
