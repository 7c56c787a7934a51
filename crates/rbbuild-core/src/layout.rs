use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::*;
use crate::error::{BuildError, Result};
use crate::step::Step;

/// Directory tree of one target: `<root>/{src,build,install}/<target>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    src: PathBuf,
    build: PathBuf,
    install: PathBuf,
}

impl Layout {
    pub fn new(root: &Path, target: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            src: root.join(SRC_DIR).join(target),
            build: root.join(BUILD_DIR).join(target),
            install: root.join(INSTALL_DIR).join(target),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn build(&self) -> &Path {
        &self.build
    }

    pub fn install(&self) -> &Path {
        &self.install
    }

    /// Parent of every checkout, where the clone command runs.
    pub fn checkouts(&self) -> PathBuf {
        self.root.join(SRC_DIR)
    }

    pub fn configure_script(&self) -> PathBuf {
        self.src.join(CONFIGURE_SCRIPT)
    }

    /// Whether the artifact a step produces is already on disk.
    ///
    /// Only the setup steps have such a marker; build and test steps
    /// always run.
    pub fn is_up_to_date(&self, step: Step) -> bool {
        match step {
            Step::Checkout => self.src.exists(),
            Step::Autoconf => self.configure_script().exists(),
            Step::Configure => self.build.join(MAKEFILE).exists(),
            _ => false,
        }
    }

    /// Deletes the source, build and install trees of the target.
    pub fn remove_all(&self) -> Result<()> {
        for dir in [&self.src, &self.build, &self.install] {
            match fs::remove_dir_all(dir) {
                Ok(()) => info!("removed {}", dir.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("{} already absent", dir.display());
                }
                Err(e) => return Err(BuildError::io("failed to remove directory", dir, e)),
            }
        }
        Ok(())
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| BuildError::io("failed to create directory", dir, e))
}
