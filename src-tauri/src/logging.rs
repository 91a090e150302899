use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
};

use chrono::{DateTime, Local};
use env_logger::{Builder, Env, Target};

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the process-wide logger. Honors `RUST_LOG`; when `log_file` is set
/// the log is appended there instead of stderr. Safe to call more than once.
pub fn init_logging(log_file: Option<&Path>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}",
            format_log_line(
                Local::now(),
                record.level(),
                record.target(),
                &record.args().to_string()
            )
        )
    });

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(error) => eprintln!(
                "failed to open log file {}: {error}; logging to stderr",
                path.display()
            ),
        }
    }

    let _ = builder.try_init();
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

pub(crate) fn format_log_line(
    timestamp: DateTime<Local>,
    level: log::Level,
    target: &str,
    message: &str,
) -> String {
    format!(
        "[{}] [{}] [{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        target,
        message
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn format_log_line_includes_timestamp_level_and_target() {
        let timestamp = Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 5).unwrap();
        let line = format_log_line(
            timestamp,
            log::Level::Info,
            "backend",
            "[BACKEND] Using port 5001",
        );
        assert_eq!(
            line,
            "[2026-10-19 09:30:05.000] [INFO] [backend] [BACKEND] Using port 5001"
        );
    }

    #[test]
    fn open_log_file_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("desktop.log");
        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "first").unwrap();
        drop(file);

        let mut file = open_log_file(&path).unwrap();
        writeln!(file, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
