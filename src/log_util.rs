use crate::output_manager::OutputManager;
use chrono::Utc;
use std::{
    fs::OpenOptions,
    io::{self, Write},
};

const LOG_FILENAME: &str = "stagequiz-debug.log";

/// Append a timestamped line to the shared debug log. Errors are reported to stderr only.
pub fn log_debug(message: &str) {
    if let Err(err) = append_line(message) {
        eprintln!("[stagequiz::log_util] failed to write debug log: {}", err);
    }
}

fn append_line(message: &str) -> io::Result<()> {
    let path = OutputManager::new()
        .artifact_path(LOG_FILENAME)
        .map_err(io::Error::other)?;
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "[{}] {}", Utc::now().to_rfc3339(), message)?;
    Ok(())
}
