use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::BuildError;

/// One named unit of work in the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Checkout,
    Autoconf,
    Configure,
    BuildUp,
    BuildMiniruby,
    BuildRuby,
    BuildExts,
    BuildAll,
    BuildInstall,
    TestBtest,
    TestAll,
    TestRubyspec,
}

impl Step {
    /// The full catalog in execution order.
    pub const ALL: [Step; 12] = [
        Self::Checkout,
        Self::Autoconf,
        Self::Configure,
        Self::BuildUp,
        Self::BuildMiniruby,
        Self::BuildRuby,
        Self::BuildExts,
        Self::BuildAll,
        Self::BuildInstall,
        Self::TestBtest,
        Self::TestAll,
        Self::TestRubyspec,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Autoconf => "autoconf",
            Self::Configure => "configure",
            Self::BuildUp => "build_up",
            Self::BuildMiniruby => "build_miniruby",
            Self::BuildRuby => "build_ruby",
            Self::BuildExts => "build_exts",
            Self::BuildAll => "build_all",
            Self::BuildInstall => "build_install",
            Self::TestBtest => "test_btest",
            Self::TestAll => "test_all",
            Self::TestRubyspec => "test_rubyspec",
        }
    }

    pub fn default_policy(self) -> FailurePolicy {
        match self {
            Self::BuildUp | Self::BuildExts => FailurePolicy::Ignore,
            Self::TestBtest | Self::TestAll | Self::TestRubyspec => FailurePolicy::Skip,
            _ => FailurePolicy::Raise,
        }
    }

    pub fn is_test(self) -> bool {
        matches!(self, Self::TestBtest | Self::TestAll | Self::TestRubyspec)
    }

    /// The make target a build or test step drives, if any.
    pub fn make_target(self) -> Option<&'static str> {
        match self {
            Self::BuildUp => Some("up"),
            Self::BuildMiniruby => Some("miniruby"),
            Self::BuildRuby => Some("ruby"),
            Self::BuildExts => Some("exts"),
            Self::BuildAll => Some("all"),
            Self::BuildInstall => Some("install"),
            Self::TestBtest => Some("btest"),
            Self::TestAll => Some("test-all"),
            Self::TestRubyspec => Some("test-rubyspec"),
            Self::Checkout | Self::Autoconf | Self::Configure => None,
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = BuildError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == value)
            .ok_or_else(|| BuildError::UnknownStep(value.to_string()))
    }
}

/// What a non-zero exit inside a step means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    /// Abort the whole sequence.
    Raise,
    /// Record the failure and continue.
    Skip,
    /// Tolerate the failure silently.
    Ignore,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Skip => "skip",
            Self::Ignore => "ignore",
        }
    }
}

impl Display for FailurePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = BuildError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "raise" => Ok(Self::Raise),
            "skip" => Ok(Self::Skip),
            "ignore" => Ok(Self::Ignore),
            other => Err(BuildError::UnknownPolicy(other.to_string())),
        }
    }
}
