use crate::log::log_level::LogLevel;

/// Destination of the `sink_*!` macros.
///
/// Components hold an `Arc<dyn LogSink>`; binaries hand them a
/// [`LoggerHandle`](crate::log::LoggerHandle), tests a
/// [`NoopLogSink`](crate::log::NoopLogSink).
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
