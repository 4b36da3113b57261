//! Streams `tracing` events to the connected console pages.
//!
//! [`ConsoleLayer`] captures each event as a [`LogEntry`], a [`LogFormatter`] turns the
//! entry into one websocket message and the message is broadcast to every live session.

mod layer;

pub use layer::ConsoleLayer;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use wsconsole_http::protocol::OpCode;

/// Severity shown on the console page. `TRACE` events are reported as [`LogLevel::Debug`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        if *level == Level::ERROR {
            LogLevel::Error
        } else if *level == Level::WARN {
            LogLevel::Warning
        } else if *level == Level::INFO {
            LogLevel::Info
        } else {
            LogLevel::Debug
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// One captured log event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds since the unix epoch, with sub-second precision.
    pub unix_time: f64,
    pub level: LogLevel,
    pub message: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        let unix_time = SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs_f64()).unwrap_or_default();
        Self { unix_time, level, message: message.into(), target: target.into(), file: None, line: None }
    }

    /// Records the source location of the event when it is known.
    #[must_use]
    pub fn with_location(mut self, file: Option<&str>, line: Option<u32>) -> Self {
        self.file = file.map(str::to_owned);
        self.line = line;
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.target, self.message)
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Serializes log entries into websocket message payloads.
#[cfg_attr(test, mockall::automock)]
pub trait LogFormatter: Send + Sync {
    /// The opcode of the messages this formatter produces.
    fn opcode(&self) -> OpCode;

    /// The payload of the message carrying `entry`.
    fn format(&self, entry: &LogEntry) -> Result<Bytes, FormatError>;
}

/// Formats entries as one JSON object per text message.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl LogFormatter for JsonFormatter {
    fn opcode(&self) -> OpCode {
        OpCode::Text
    }

    fn format(&self, entry: &LogEntry) -> Result<Bytes, FormatError> {
        Ok(Bytes::from(serde_json::to_vec(entry)?))
    }
}
