use std::fmt;

use crate::log::log_level::LogLevel;

/// Represents a single log message event.
///
/// This struct encapsulates the metadata associated with a log entry,
/// including its severity, timestamp, origin (target), and the message content itself.
#[derive(Debug, Clone)]
pub struct LogMsg {
    /// The severity level of the log (e.g., Info, Warning, Error).
    pub level: LogLevel,
    /// The timestamp of the log event in milliseconds.
    pub ts_ms: u128,
    /// The actual content or payload of the log message.
    pub text: String,
    /// The target source of the log, typically the static module path.
    pub target: &'static str, // module path
}

impl LogMsg {
    /// Creates a new `LogMsg` instance.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let msg = LogMsg::new(LogLevel::Info, "hub listening", module_path!(), now_millis());
    /// ```
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }
}

/// The line format of the log file.
impl fmt::Display for LogMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} | {}",
            self.level, self.ts_ms, self.target, self.text
        )
    }
}
