//! File logger behind the `log` facade. The terminal belongs to the game, so records go
//! to a file given with `--log-file`; without it nothing is installed and logging is off.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger already installed")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Writes one line per record and flushes immediately so a crash keeps the tail.
pub struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
    started: Instant,
}

impl FileLogger {
    pub fn new(file: File, level: LevelFilter) -> Self {
        Self {
            file: Mutex::new(file),
            level,
            started: Instant::now(),
        }
    }

    fn format(&self, record: &Record) -> String {
        let elapsed = self.started.elapsed();
        format!(
            "[{:>4}.{:03}] {:<5} {}: {}",
            elapsed.as_secs(),
            elapsed.subsec_millis(),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(record);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
            let _ = file.flush();
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// `-v` count → level. 0 info, 1 debug, 2+ trace.
pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Truncate `path` and install a [`FileLogger`] as the global logger.
pub fn init(path: &Path, level: LevelFilter) -> Result<(), LogError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    log::set_boxed_logger(Box::new(FileLogger::new(file, level)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), LevelFilter::Info);
        assert_eq!(level_for(1), LevelFilter::Debug);
        assert_eq!(level_for(5), LevelFilter::Trace);
    }

    #[test]
    fn writes_enabled_records_only() {
        let path = std::env::temp_dir().join(format!("oceantui-log-{}.txt", std::process::id()));
        let file = File::create(&path).unwrap();
        let logger = FileLogger::new(file, LevelFilter::Info);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("oceantui::game")
                .args(format_args!("session started"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("oceantui::game")
                .args(format_args!("hidden"))
                .build(),
        );
        logger.flush();

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(written.contains("INFO  oceantui::game: session started"));
        assert!(!written.contains("hidden"));
        assert_eq!(written.lines().count(), 1);
    }
}
