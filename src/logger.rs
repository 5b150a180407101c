//! File-backed `log` sink. The terminal belongs to the UI, so records go to a file instead.

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

pub const LOG_FILENAME: &str = "candyburst.log";

struct FileLogger {
    file: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            record.level(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            &record.args().to_string(),
        );
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut f) = self.file.lock() {
            let _ = f.flush();
        }
    }
}

/// `[timestamp][LEVEL][file:line] message`, file reduced to its name.
fn format_line(level: Level, file: &str, line: u32, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let file_name = file.rsplit(['/', '\\']).next().unwrap_or(file);
    format!("[{}][{}][{}:{}] {}", timestamp, level, file_name, line, message)
}

/// Install the file logger at `level`. `Off` installs nothing.
pub fn init(path: &Path, level: LevelFilter) -> io::Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    log::set_boxed_logger(Box::new(FileLogger {
        file: Mutex::new(file),
    }))
    .map_err(io::Error::other)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_strips_directories() {
        let line = format_line(Level::Warn, "src/game/history.rs", 42, "disk full");
        assert!(line.ends_with("][WARN][history.rs:42] disk full"));
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_format_line_windows_path() {
        let line = format_line(Level::Info, r"src\app.rs", 7, "hi");
        assert!(line.contains("[app.rs:7]"));
    }
}
