//! Logging setup: the timed terminal logger, optionally mirrored into a dated run log.

use chrono::{Local, NaiveDate};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const RUN_LOG_PREFIX: &str = "camera_angle_detection_run_log";

/// `<dir>/camera_angle_detection_run_log-<YYYYMMDD>.txt`
pub fn run_log_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}-{}.txt", RUN_LOG_PREFIX, date.format("%Y%m%d")))
}

/// Opens the run log of `date` for appending, creating `dir` if needed.
pub fn open_run_log(dir: &Path, date: NaiveDate) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(run_log_path(dir, date))
}

/// Passes records to the terminal logger and appends the same records to a file.
pub struct RunLog {
    terminal: Box<dyn Log>,
    file: Mutex<File>,
}

impl RunLog {
    pub fn new(terminal: Box<dyn Log>, file: File) -> Self {
        Self {
            terminal,
            file: Mutex::new(file),
        }
    }
}

impl Log for RunLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.terminal.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.terminal.log(record);
        if let Ok(mut file) = self.file.lock() {
            writeln!(
                file,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
            .ok();
        }
    }

    fn flush(&self) {
        self.terminal.flush();
        if let Ok(mut file) = self.file.lock() {
            file.flush().ok();
        }
    }
}

/// Installs the global logger.
///
/// The level comes from `RUST_LOG` and defaults to `info`. If `dir` is given, records are also
/// appended to the run log of `date` there; failing to open it is logged and otherwise ignored.
pub fn init(dir: Option<&Path>, date: NaiveDate) -> Result<(), SetLoggerError> {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()));
    let terminal = builder.build();
    let max_level: LevelFilter = terminal.filter();

    let (file, failure) = match dir.map(|dir| open_run_log(dir, date)) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let logger: Box<dyn Log> = match file {
        Some(file) => Box::new(RunLog::new(Box::new(terminal), file)),
        None => Box::new(terminal),
    };
    log::set_boxed_logger(logger)?;
    log::set_max_level(max_level);

    if let (Some(dir), Some(e)) = (dir, failure) {
        log::error!(
            "unable to open run log {}: {}",
            run_log_path(dir, date).display(),
            e
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn run_log_is_named_after_the_day() {
        assert_eq!(
            run_log_path(Path::new("/var/log/watch"), date()),
            Path::new("/var/log/watch/camera_angle_detection_run_log-20240517.txt")
        );
    }

    #[test]
    fn records_are_appended_to_the_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let terminal = pretty_env_logger::formatted_timed_builder()
            .filter_level(LevelFilter::Info)
            .build();
        let logger = RunLog::new(Box::new(terminal), open_run_log(&logs, date()).unwrap());

        logger.log(
            &Record::builder()
                .args(format_args!("Alert: camera frame cam2.jpg moved"))
                .level(Level::Warn)
                .target("drift_watch")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("matching details"))
                .level(Level::Debug)
                .target("drift_watch")
                .build(),
        );
        logger.flush();

        let written = fs::read_to_string(run_log_path(&logs, date())).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains(" - WARN - Alert: camera frame cam2.jpg moved"));

        // A second run on the same day appends.
        let again = RunLog::new(
            Box::new(
                pretty_env_logger::formatted_timed_builder()
                    .filter_level(LevelFilter::Info)
                    .build(),
            ),
            open_run_log(&logs, date()).unwrap(),
        );
        again.log(
            &Record::builder()
                .args(format_args!("cam3.jpg shows no significant movement"))
                .level(Level::Info)
                .target("drift_watch")
                .build(),
        );
        again.flush();
        let written = fs::read_to_string(run_log_path(&logs, date())).unwrap();
        assert_eq!(written.lines().count(), 2);
    }
}
