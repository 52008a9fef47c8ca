//! Console and file logging.
//!
//! Components receive a `&dyn Logger` instead of reaching for a global, so
//! tests can capture what was logged.

use chrono::Local;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Log file size at which it is rotated.
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Number of rotated log files kept (`.1` is the newest).
const LOG_BACKUPS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Sink for log lines. `scope` names the component emitting the line.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, scope: &str, message: &str);

    fn debug(&self, scope: &str, message: &str) {
        self.log(Level::Debug, scope, message);
    }

    fn info(&self, scope: &str, message: &str) {
        self.log(Level::Info, scope, message);
    }

    fn warn(&self, scope: &str, message: &str) {
        self.log(Level::Warning, scope, message);
    }

    fn error(&self, scope: &str, message: &str) {
        self.log(Level::Error, scope, message);
    }

    fn critical(&self, scope: &str, message: &str) {
        self.log(Level::Critical, scope, message);
    }
}

/// Formats one log line: `[HH:MM:SS.mmm] LEVEL (scope) message`.
pub fn format_line(level: Level, scope: &str, message: &str) -> String {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    format!("[{}] {} ({}) {}", timestamp, level, scope, message)
}

/// Writes to the console and appends every level to a rotating log file.
pub struct FileLogger {
    path: PathBuf,
    console_level: Level,
    file_lock: Mutex<()>,
}

impl FileLogger {
    /// Creates a logger writing to `path`. Lines below `console_level` go
    /// to the file only.
    pub fn new(path: impl Into<PathBuf>, console_level: Level) -> Self {
        Self {
            path: path.into(),
            console_level,
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) {
        // Logging must never take the bot down, so file errors are dropped.
        let Ok(_guard) = self.file_lock.lock() else {
            return;
        };
        let _ = rotate_if_needed(&self.path, MAX_LOG_BYTES, LOG_BACKUPS);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Logger for FileLogger {
    fn log(&self, level: Level, scope: &str, message: &str) {
        let line = format_line(level, scope, message);
        if level >= self.console_level {
            if level >= Level::Error {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        }
        self.append(&line);
    }
}

/// Shifts `log` → `log.1` → ... → `log.N` once `log` reaches `max_bytes`.
fn rotate_if_needed(path: &Path, max_bytes: u64, backups: u32) -> std::io::Result<()> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(()),
    };
    if size < max_bytes {
        return Ok(());
    }

    let oldest = backup_path(path, backups);
    if backups > 0 && oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for i in (1..backups).rev() {
        let from = backup_path(path, i);
        if from.exists() {
            fs::rename(&from, backup_path(path, i + 1))?;
        }
    }
    if backups > 0 {
        fs::rename(path, backup_path(path, 1))?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Collects log lines in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

#[cfg(test)]
impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

#[cfg(test)]
impl Logger for MemoryLogger {
    fn log(&self, level: Level, scope: &str, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((level, format!("({}) {}", scope, message)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_line() {
        let line = format_line(Level::Warning, "ControlLoop", "hello");
        assert!(line.ends_with("] WARNING (ControlLoop) hello"));
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_file_logger_appends_all_levels() {
        let dir = tempdir().unwrap();
        let logger = FileLogger::new(dir.path().join("test.log"), Level::Critical);

        logger.debug("scope", "first");
        logger.error("scope", "second");

        let contents = fs::read_to_string(logger.path()).unwrap();
        assert!(contents.contains("DEBUG (scope) first"));
        assert!(contents.contains("ERROR (scope) second"));
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_rotation_shifts_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "current").unwrap();
        fs::write(backup_path(&path, 1), "older").unwrap();

        rotate_if_needed(&path, 4, 3).unwrap();

        assert!(!path.exists());
        assert_eq!(fs::read_to_string(backup_path(&path, 1)).unwrap(), "current");
        assert_eq!(fs::read_to_string(backup_path(&path, 2)).unwrap(), "older");
    }

    #[test]
    fn test_rotation_skips_small_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "tiny").unwrap();

        rotate_if_needed(&path, 1024, 3).unwrap();

        assert!(path.exists());
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn test_memory_logger_records() {
        let logger = MemoryLogger::new();
        logger.critical("ControlLoop", "halting");
        assert!(logger.contains(Level::Critical, "halting"));
        assert!(!logger.contains(Level::Info, "halting"));
    }
}
