use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, TrySendError},
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

// -----------------------------------------------------------------------------
// COMPILE-TIME CONFIGURATION
// -----------------------------------------------------------------------------

/// Flush to disk every 100 lines if debugging/tracing (to see crashes near real-time).
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

/// Flush to disk every 1000 lines in production/default (to save I/O & CPU).
#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

/// Capacity of the log queue used by the binaries.
pub const DEFAULT_QUEUE_CAP: usize = 4_096;

// -----------------------------------------------------------------------------

/// Bounded, non-blocking logger that writes to a per-process log file.
///
/// This struct manages a background worker thread that consumes log messages from a
/// bounded channel and writes them to a file. Warnings and errors can also be
/// mirrored to stderr so an operator watching the terminal sees them.
///
/// # Architecture
///
/// 1. **Producers**: the reactor thread logs through a cloned [`LoggerHandle`].
/// 2. **Queue**: A bounded `mpsc` channel buffers messages.
/// 3. **Consumer**: A dedicated background thread writes to disk and flushes periodically.
pub struct Logger {
    handle: LoggerHandle,
    thread: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Initializes the logger for the hub binary.
    ///
    /// Reads `[Logging] hub_log_filename`, `log_path` and `mirror_stderr`.
    #[must_use]
    pub fn start_hub(cap: usize, config: &Config) -> Self {
        Self::start("hub_log_filename", "signaling_hub", cap, config)
    }

    /// Initializes the logger for the peer binary.
    ///
    /// Reads `[Logging] peer_log_filename`, `log_path` and `mirror_stderr`.
    #[must_use]
    pub fn start_peer(cap: usize, config: &Config) -> Self {
        Self::start("peer_log_filename", "signaling_peer", cap, config)
    }

    /// Internal helper to resolve configuration and start the logger.
    fn start(fn_key: &str, default_name: &str, cap: usize, config: &Config) -> Self {
        let app_name = config.get_non_empty_or_default("Logging", fn_key, default_name);
        let mirror = config.get_bool("Logging", "mirror_stderr").unwrap_or(true);

        let dir = config
            .get_non_empty("Logging", "log_path")
            .map_or_else(|| exe_dir_fallback_cwd().join("logs"), expand_path);
        Self::start_in_dir(dir, Some(app_name), cap, mirror)
    }

    /// Starts the logger in a specific directory.
    ///
    /// This function:
    /// 1. Creates the target directory if it is missing.
    /// 2. Generates a unique filename based on the timestamp and process ID (PID).
    /// 3. Spawns the background worker thread.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the log file will be created.
    /// * `app_name` - Optional prefix for the log filename.
    /// * `cap` - Capacity of the log channel (backpressure buffer).
    /// * `mirror_stderr` - Also print warnings and errors to stderr.
    ///
    /// # Example Filename
    /// `logs/signaling_hub-20251102_023045-pid1234.log`
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: Option<&str>,
        cap: usize,
        mirror_stderr: bool,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let ts = timestamp_for_filename();
        let pid = std::process::id();

        let fname = if let Some(name) = app_name {
            format!("{name}-{ts}-pid{pid}.log")
        } else {
            format!("{ts}-pid{pid}.log")
        };

        let file_path = dir.join(&fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap.max(1));
        let handle = LoggerHandle { tx };

        let file_path_clone = file_path.clone();

        let thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || {
                // Try target file -> temp file -> sink (never panic).
                let writer: Box<dyn Write + Send> = if let Ok(f) = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&file_path_clone)
                {
                    Box::new(f)
                } else {
                    let fallback = std::env::temp_dir().join("meshsignal-fallback.log");
                    match OpenOptions::new().create(true).append(true).open(&fallback) {
                        Ok(f) => Box::new(f),
                        Err(_) => Box::new(io::sink()),
                    }
                };

                let mut out: BufWriter<Box<dyn Write + Send>> = BufWriter::new(writer);
                let mut lines_written: u32 = 0;

                while let Ok(m) = rx.recv() {
                    let _ = writeln!(&mut out, "{m}");
                    lines_written = lines_written.wrapping_add(1);

                    if mirror_stderr && m.level.is_alert() {
                        // Operators should not wait for a batch flush to see these.
                        let _ = out.flush();
                        eprintln!("[{}] {}", m.level, m.text);
                    } else if lines_written.is_multiple_of(FLUSH_BATCH_SIZE) {
                        let _ = out.flush();
                    }
                }

                let _ = out.flush();
            })
            .ok();

        Self {
            handle,
            thread,
            file_path,
        }
    }

    /// Attempts to enqueue a log message without blocking the current thread.
    ///
    /// If the channel is full, the message is **dropped** and an error is returned.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), TrySendError<LogMsg>> {
        self.handle.try_log(level, text, target)
    }

    /// Returns a cloneable handle to the logger sink.
    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    /// Returns the path of the active log file.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Closes the queue and waits for the worker to flush the file.
    ///
    /// Returns once every handle has been dropped; handles still alive keep
    /// the worker running.
    pub fn shutdown(mut self) {
        let thread = self.thread.take();
        drop(self);
        if let Some(t) = thread {
            let _ = t.join();
        }
    }
}

/// Locates the `logs` directory next to the executable (target/{debug,release}),
/// or falls back to the current working directory on error.
fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Generates a human-readable timestamp for filenames without external dependencies.
///
/// Output Format: `YYYYMMDD_HHMMSS` (e.g., `20251102_023045`)
fn timestamp_for_filename() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    unix_to_utc(secs).map_or_else(
        |_| format!("unix_{secs}"), // graceful fallback, never panics
        |tm| {
            format!(
                "{:04}{:02}{:02}_{:02}{:02}{:02}",
                tm.year, tm.mon, tm.day, tm.hour, tm.min, tm.sec
            )
        },
    )
}

#[derive(Clone, Copy, Debug)]
struct SimpleUtc {
    year: i32,
    mon: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
}

#[derive(Debug)]
enum UtcConvError {
    Year,
    Month,
    Day,
}

/// Minimal UTC conversion (Civl Time) to avoid importing `chrono`.
///
/// Implements the algorithm to convert UNIX timestamp to a Gregorian date.
/// Note: not a `const fn` because it uses `Result/try_from`.
///
/// # Errors
///
/// Returns a [`UtcConvError`] if the calculated components generally overflow or
/// cannot be represented in standard integer types:
///
/// * [`UtcConvError::Year`] - If the calculated year does not fit in an `i32`.
/// * [`UtcConvError::Month`] - If the month cannot be converted to `u32` (unlikely by algorithm design).
/// * [`UtcConvError::Day`] - If the day cannot be converted to `u32` (unlikely by algorithm design).
#[allow(clippy::missing_const_for_fn, clippy::many_single_char_names)]
fn unix_to_utc(mut s: u64) -> Result<SimpleUtc, UtcConvError> {
    use std::convert::TryFrom;

    let sec = (s % 60) as u32;
    s /= 60;
    let min = (s % 60) as u32;
    s /= 60;
    let hour = (s % 24) as u32;
    s /= 24;

    // Use i128 to prevent overflow during intermediate calculations.
    let z: i128 = i128::from(s) + 719_468;

    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = doy - (153 * mp + 2) / 5 + 1; // [1, 31]
    let m = mp + if mp < 10 { 3 } else { -9 }; // [1, 12]

    let year_i = y + i128::from(m <= 2);

    let year = i32::try_from(year_i).map_err(|_| UtcConvError::Year)?;
    let mon = u32::try_from(m).map_err(|_| UtcConvError::Month)?;
    let day = u32::try_from(d).map_err(|_| UtcConvError::Day)?;

    Ok(SimpleUtc {
        year,
        mon,
        day,
        hour,
        min,
        sec,
    })
}

/// Expands tilde (`~`) in file paths to the user's home directory.
fn expand_path(path_str: &str) -> PathBuf {
    if path_str.starts_with("~") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from);

        if let Some(mut home_path) = home {
            if path_str == "~" {
                return home_path;
            }
            if path_str.starts_with("~/") || path_str.starts_with("~\\") {
                home_path.push(&path_str[2..]);
                return home_path;
            }
        }
    }
    PathBuf::from(path_str)
}
