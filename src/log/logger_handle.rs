use std::sync::mpsc;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink, now_millis};

/// Lightweight, cloneable handle to the process logger.
///
/// `LoggerHandle` is a thin, lock-free sink that enqueues `LogMsg` into a
/// bounded `SyncSender`. Calls to [`try_log`](Self::try_log) are non-blocking:
/// if the queue is full, the message is dropped and an error is returned.
///
/// Typical usage is to obtain it from the `Logger` and hand it to the hub or
/// client as an `Arc<dyn LogSink>`.
///
/// # Examples
/// ```ignore
/// // Usually you obtain it via: let handle = logger.handle();
/// handle.try_log(LogLevel::Info, "hub listening", module_path!())?;
/// ```
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        // `try_log` takes Into<String>; &str works (it will allocate).
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Attempts to enqueue a log message without blocking.
    ///
    /// The message carries a millisecond timestamp from [`now_millis`]
    /// and the given `target` (e.g., `module_path!()`).
    ///
    /// # Returns
    /// `Ok(())` if the message was queued.
    ///
    /// # Errors
    /// Returns:
    /// - `Err(TrySendError::Full(_))` when the bounded queue is at capacity (message is not sent).
    /// - `Err(TrySendError::Disconnected(_))` when the logger worker has been dropped.
    ///
    /// # Examples
    /// ```ignore
    /// handle.try_log(LogLevel::Warn, "no common codec", module_path!())?;
    /// ```
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        let msg = LogMsg {
            level,
            ts_ms: now_millis(),
            text: text.into(),
            target,
        };
        self.tx.try_send(msg)
    }
}
