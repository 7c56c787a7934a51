use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};
use crate::layout::ensure_dir;

/// Append-only, line-oriented build log.
#[derive(Debug)]
pub struct BuildLog {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl BuildLog {
    /// Opens `path` for appending, creating it and its parent directory.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BuildError::io("failed to open log file", path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: LineWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one output line; flushed immediately.
    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}")
            .map_err(|e| BuildError::io("failed to write log", &self.path, e))
    }

    /// Appends the summary record written after each command.
    pub fn command_summary(&mut self, command: &str, exit: &str) -> Result<()> {
        self.line(&format!("+ {command} (exit {exit})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/trunk.log");

        let mut log = BuildLog::open(&path).unwrap();
        log.line("checking for gcc... gcc").unwrap();
        log.command_summary("./configure", "0").unwrap();
        drop(log);

        let mut log = BuildLog::open(&path).unwrap();
        log.line("second run").unwrap();
        drop(log);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["checking for gcc... gcc", "+ ./configure (exit 0)", "second run"]
        );
    }
}
