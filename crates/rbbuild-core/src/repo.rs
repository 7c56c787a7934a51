use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::BuildError;

/// Version control system the source tree is fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Git,
    Svn,
}

impl RepoKind {
    /// Guesses the kind from markers in the repository location.
    ///
    /// The location is split into alphanumeric words. A word that is `git`
    /// or starts with it (`github`, `gitlab`) marks git and wins over an
    /// `svn` word; `x.git` and `git@host:` both yield the word `git`.
    pub fn detect(location: &str) -> Result<Self, BuildError> {
        let words: Vec<String> = location
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if words.iter().any(|word| word.starts_with("git")) {
            Ok(Self::Git)
        } else if words.iter().any(|word| word == "svn") {
            Ok(Self::Svn)
        } else {
            Err(BuildError::UnknownRepository(location.to_string()))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Svn => "svn",
        }
    }
}

impl Display for RepoKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoKind {
    type Err = BuildError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "git" => Ok(Self::Git),
            "svn" => Ok(Self::Svn),
            other => Err(BuildError::UnknownRepository(other.to_string())),
        }
    }
}
