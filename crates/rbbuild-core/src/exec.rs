use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};

use tracing::{debug, info};

use crate::error::{BuildError, CommandFailure, Result};
use crate::log::BuildLog;

/// Runs `command` through `/bin/sh` in the current directory.
///
/// Standard error is merged into standard output and every line is appended
/// to `log` as soon as it is read. A summary record with the exit status
/// follows. A non-zero exit is reported as [`BuildError::CommandFailed`].
pub fn run_logged(command: &str, log: &mut BuildLog) -> Result<()> {
    info!(target: "rbbuild", "run {}", command);

    let mut child = Command::new("/bin/sh")
        .arg("-c")
        .arg(format!("exec 2>&1; {command}"))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| BuildError::io("failed to start shell", "/bin/sh", e))?;

    if let Err(e) = stream_output(&mut child, log) {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e);
    }

    let status = child
        .wait()
        .map_err(|e| BuildError::io("failed to wait for command", "/bin/sh", e))?;

    let failure = CommandFailure {
        command: command.to_string(),
        code: status.code(),
    };
    log.command_summary(command, &failure.exit_text())?;

    if status.success() {
        Ok(())
    } else {
        Err(BuildError::CommandFailed(failure))
    }
}

/// Copies the child's output into `log` line by line until it closes.
fn stream_output(child: &mut Child, log: &mut BuildLog) -> Result<()> {
    let Some(stdout) = child.stdout.take() else {
        return Ok(());
    };
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| BuildError::io("failed to read command output", "/bin/sh", e))?;
        if read == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        debug!(target: "rbbuild::output", "{}", line);
        log.line(line)?;
    }
}

/// Joins non-empty words into one command line.
pub(crate) fn command_line<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-quotes a value for `/bin/sh`.
pub(crate) fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,%".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
