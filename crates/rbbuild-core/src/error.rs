use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use thiserror::Error;

/// A spawned command that exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// The command text exactly as it was handed to the shell.
    pub command: String,
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandFailure {
    pub fn exit_text(&self) -> String {
        match self.code {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        }
    }
}

impl Display for CommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "command '{}' failed with exit {}",
            self.command,
            self.exit_text()
        )
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    CommandFailed(CommandFailure),

    #[error("unrecognized repository type for '{0}' (expected a git or svn location)")]
    UnknownRepository(String),

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("unknown failure policy '{0}' (expected raise, skip or ignore)")]
    UnknownPolicy(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{context}: {}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_names_command_and_code() {
        let failure = CommandFailure {
            command: "make -j4 all".to_string(),
            code: Some(2),
        };
        assert_eq!(
            failure.to_string(),
            "command 'make -j4 all' failed with exit 2"
        );
    }

    #[test]
    fn signalled_command_reports_signal() {
        let failure = CommandFailure {
            command: "make test-all".to_string(),
            code: None,
        };
        assert_eq!(failure.exit_text(), "signal");
    }
}
