//! Core logic for rbbuild.
//!
//! This crate defines the build configuration, the directory layout of a
//! target, the fixed step catalog with its failure policies, and the
//! [`StepRunner`] that drives external tools through those steps.

pub mod config;
pub mod constants;
pub mod error;
pub mod exec;
pub mod layout;
pub mod log;
pub mod repo;
pub mod runner;
pub mod step;
pub mod workdir;

#[cfg(test)]
mod test_support;

pub use config::{BuildConfig, BuildSettings, ProjectFile, ToolsConfig};
pub use error::{BuildError, CommandFailure};
pub use layout::Layout;
pub use log::BuildLog;
pub use repo::RepoKind;
pub use runner::{RunReport, StepOutcome, StepRecord, StepRunner};
pub use step::{FailurePolicy, Step};
pub use workdir::ScopedDir;
