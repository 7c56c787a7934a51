use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{BuildError, Result};

/// Changes the process working directory until dropped.
///
/// The previous directory is restored on every exit path, including early
/// returns through `?`. `Drop` cannot report a failed restore, so callers that
/// go on using the process directory should finish with [`ScopedDir::leave`].
#[derive(Debug)]
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub struct ScopedDir {
    previous: PathBuf,
    left: bool,
}

impl ScopedDir {
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = env::current_dir()
            .map_err(|e| BuildError::io("failed to read working directory", ".", e))?;
        env::set_current_dir(dir)
            .map_err(|e| BuildError::io("failed to enter directory", dir, e))?;
        debug!("entered {}", dir.display());
        Ok(Self {
            previous,
            left: false,
        })
    }

    /// Restores the previous directory, reporting failure to the caller.
    pub fn leave(mut self) -> Result<()> {
        self.left = true;
        env::set_current_dir(&self.previous)
            .map_err(|e| BuildError::io("failed to restore directory", &self.previous, e))
    }

    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if self.left {
            return;
        }
        if let Err(e) = env::set_current_dir(&self.previous) {
            error!(
                "failed to restore working directory {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CWD_LOCK;

    #[test]
    fn restores_directory_on_drop() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        {
            let _guard = ScopedDir::enter(dir.path()).unwrap();
            assert_eq!(
                env::current_dir().unwrap().canonicalize().unwrap(),
                dir.path().canonicalize().unwrap()
            );
        }
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn restores_directory_on_error_path() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        fn failing(dir: &Path) -> Result<()> {
            let _guard = ScopedDir::enter(dir)?;
            Err(BuildError::Config("boom".to_string()))
        }

        assert!(failing(dir.path()).is_err());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn leave_reports_a_vanished_previous_directory() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let outer = tempfile::tempdir().unwrap();
        let inner = tempfile::tempdir().unwrap();

        let outer_guard = ScopedDir::enter(outer.path()).unwrap();
        let inner_guard = ScopedDir::enter(inner.path()).unwrap();
        std::fs::remove_dir(outer.path()).unwrap();

        let err = inner_guard.leave().expect_err("previous directory is gone");
        assert!(matches!(err, BuildError::Io { .. }));

        drop(outer_guard);
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn leave_restores_directory() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        ScopedDir::enter(dir.path()).unwrap().leave().unwrap();
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn missing_directory_leaves_cwd_untouched() {
        let _lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let err = ScopedDir::enter(Path::new("/nonexistent/rbbuild")).expect_err("must fail");
        assert!(matches!(err, BuildError::Io { .. }));
        assert_eq!(env::current_dir().unwrap(), before);
    }
}
