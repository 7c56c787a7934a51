//! Shared fixtures for tests that spawn fake tools or touch the working directory.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use crate::config::{BuildSettings, ToolsConfig};
use crate::step::Step;

/// Serializes tests that change the process working directory.
pub static CWD_LOCK: Mutex<()> = Mutex::new(());

/// A scratch root with shell scripts standing in for git, svn, autoconf and make.
pub struct FakeTools {
    pub dir: TempDir,
}

impl FakeTools {
    /// `failing_targets` are make targets that exit with status 2.
    pub fn new(failing_targets: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let calls = dir.path().join("calls");
        let calls = calls.display();

        let configure = format!(
            "cat > configure <<'EOS'\n#!/bin/sh\necho \"configure $*\" >> \"{calls}\"\necho \"creating Makefile\"\ntouch Makefile\nEOS\nchmod +x configure\n"
        );

        write_script(
            &bin.join("git"),
            &format!(
                "#!/bin/sh\necho \"git $*\" >> \"{calls}\"\nif [ \"$1\" = clone ]; then\n  for last; do :; done\n  mkdir -p \"$last\"\n  cd \"$last\" || exit 1\n{configure}fi\n"
            ),
        );
        write_script(
            &bin.join("svn"),
            &format!(
                "#!/bin/sh\necho \"svn $*\" >> \"{calls}\"\nif [ \"$1\" = checkout ]; then\n  for last; do :; done\n  mkdir -p \"$last\"\n  cd \"$last\" || exit 1\n{configure}fi\n"
            ),
        );
        write_script(
            &bin.join("autoconf"),
            &format!("#!/bin/sh\necho \"autoconf $*\" >> \"{calls}\"\n{configure}"),
        );

        let cases = if failing_targets.is_empty() {
            "__never__".to_string()
        } else {
            failing_targets.join("|")
        };
        write_script(
            &bin.join("make"),
            &format!(
                "#!/bin/sh\necho \"make $*\" >> \"{calls}\"\necho \"make: building $*\"\nfor arg; do\n  case \"$arg\" in\n    {cases}) exit 2 ;;\n  esac\ndone\nexit 0\n"
            ),
        );

        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("build.log")
    }

    pub fn tools(&self) -> ToolsConfig {
        let bin = self.dir.path().join("bin");
        let tool = |name: &str| bin.join(name).display().to_string();
        ToolsConfig {
            git: tool("git"),
            svn: tool("svn"),
            autoconf: tool("autoconf"),
            make: tool("make"),
        }
    }

    pub fn settings(&self, steps: &[Step]) -> BuildSettings {
        let mut settings = BuildSettings::new("https://github.com/ruby/ruby.git", "trunk");
        settings.root = self.root();
        settings.jobs = 2;
        settings.tools = self.tools();
        settings.steps = steps.to_vec();
        settings
    }

    /// Tool invocations recorded so far, one per line.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls"))
            .unwrap_or_default()
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Summary records from the build log.
    pub fn summaries(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .filter(|line| line.starts_with("+ "))
            .map(ToOwned::to_owned)
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}
