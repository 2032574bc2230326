//! Append-only diagnostics file.
//!
//! Every pipeline event ends up here as `[<timestamp>] <message>`. The file is
//! never rotated or truncated; it is the only place a user can look to find
//! out why a field was left untouched.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "TextFieldTrans.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub struct DiagnosticsLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DiagnosticsLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Log file in the user's Documents folder, or the temp dir when there is none.
    pub fn at_default_location() -> Self {
        Self::new(default_log_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line. Never fails: I/O errors are reported on the console
    /// and dropped.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(target: "diagnostics", "{}", message);

        let line = format_line(&chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(), message);

        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = self.append(&line) {
            tracing::warn!("Could not write to log file {}: {}", self.path.display(), e);
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

fn format_line(timestamp: &str, message: &str) -> String {
    format!("[{}] {}\n", timestamp, message)
}

pub fn default_log_path() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn line_format_wraps_timestamp_in_brackets() {
        assert_eq!(format_line("T", "hello"), "[T] hello\n");
    }

    #[test]
    fn creates_file_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.log");
        assert!(!path.exists());

        let log = DiagnosticsLog::new(path.clone());
        log.log("Application did finish launching");

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Application did finish launching"));
    }

    #[test]
    fn appends_in_call_order_and_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.log");
        std::fs::write(&path, "[earlier] previous session\n").unwrap();

        let log = DiagnosticsLog::new(path.clone());
        log.log("first");
        log.log("second");

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[earlier] previous session");
        assert!(lines[1].ends_with("] first"));
        assert!(lines[2].ends_with("] second"));
    }

    #[test]
    fn unwritable_path_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("x.log");

        let log = DiagnosticsLog::new(path.clone());
        log.log("goes nowhere");

        assert!(!path.exists());
    }

    #[test]
    fn concurrent_writers_never_tear_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.log");
        let log = std::sync::Arc::new(DiagnosticsLog::new(path.clone()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.log(format!("writer {} line {}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 100);
        assert!(lines.iter().all(|l| l.starts_with('[') && l.contains("] writer ")));
    }

    #[test]
    fn default_path_uses_fixed_file_name() {
        assert!(default_log_path().ends_with(LOG_FILE_NAME));
    }
}
