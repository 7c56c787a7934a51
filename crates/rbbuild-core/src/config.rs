use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::error::BuildError;
use crate::layout::Layout;
use crate::repo::RepoKind;
use crate::step::{FailurePolicy, Step};

/// Optional on-disk defaults (`rbbuild.toml`).
#[derive(Debug, Default, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub steps: StepsConfig,
    /// Per-step failure policy overrides, keyed by step name.
    #[serde(default)]
    pub policy: HashMap<String, String>,
}

impl ProjectFile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let cfg = toml::from_str::<Self>(&text)
            .with_context(|| format!("failed to parse TOML config: {}", path.display()))?;
        Ok(cfg)
    }
}

/// Program names for the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub git: String,
    pub svn: String,
    pub autoconf: String,
    pub make: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            svn: "svn".to_string(),
            autoconf: "autoconf".to_string(),
            make: "make".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OptionsConfig {
    pub configure: Option<String>,
    pub build: Option<String>,
    pub test: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StepsConfig {
    pub default: Option<Vec<String>>,
}

/// Mutable input gathered from the command line and project file.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub repository: String,
    pub repo_kind: Option<RepoKind>,
    pub target: String,
    pub root: PathBuf,
    pub branch: Option<String>,
    pub revision: Option<String>,
    pub configure_opts: String,
    pub build_opts: String,
    pub test_opts: String,
    pub jobs: usize,
    pub tools: ToolsConfig,
    pub steps: Vec<Step>,
    pub policies: HashMap<Step, FailurePolicy>,
}

impl BuildSettings {
    pub fn new(repository: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            repo_kind: None,
            target: target.into(),
            root: PathBuf::from("."),
            branch: None,
            revision: None,
            configure_opts: String::new(),
            build_opts: String::new(),
            test_opts: String::new(),
            jobs: num_cpus::get(),
            tools: ToolsConfig::default(),
            steps: Step::ALL.to_vec(),
            policies: HashMap::new(),
        }
    }
}

/// Resolved, read-only configuration of one run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    repository: String,
    repo_kind: RepoKind,
    target: String,
    layout: Layout,
    branch: Option<String>,
    revision: Option<String>,
    configure_opts: String,
    build_opts: String,
    test_opts: String,
    jobs: usize,
    tools: ToolsConfig,
    steps: Vec<Step>,
    policies: HashMap<Step, FailurePolicy>,
}

impl BuildConfig {
    /// Validates settings and fixes the directory layout.
    ///
    /// # Errors
    /// Fails when the repository kind cannot be determined, the target is
    /// not a plain directory name, or the root cannot be made absolute.
    pub fn new(settings: BuildSettings) -> Result<Self, BuildError> {
        let repo_kind = match settings.repo_kind {
            Some(kind) => kind,
            None => RepoKind::detect(&settings.repository)?,
        };

        let target = settings.target.trim();
        if target.is_empty() || target.contains(['/', '\\']) || target == ".." {
            return Err(BuildError::Config(format!(
                "target '{}' must be a plain directory name",
                settings.target
            )));
        }
        if settings.jobs == 0 {
            return Err(BuildError::Config("jobs must be at least 1".to_string()));
        }

        let root = std::path::absolute(&settings.root)
            .map_err(|e| BuildError::io("failed to resolve root directory", &settings.root, e))?;
        let layout = Layout::new(&root, target);
        debug!("resolved {} repository, layout {:?}", repo_kind, layout);

        Ok(Self {
            repository: settings.repository,
            repo_kind,
            target: target.to_string(),
            layout,
            branch: settings.branch,
            revision: settings.revision,
            configure_opts: settings.configure_opts,
            build_opts: settings.build_opts,
            test_opts: settings.test_opts,
            jobs: settings.jobs,
            tools: settings.tools,
            steps: settings.steps,
            policies: settings.policies,
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn repo_kind(&self) -> RepoKind {
        self.repo_kind
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn configure_opts(&self) -> &str {
        &self.configure_opts
    }

    pub fn build_opts(&self) -> &str {
        &self.build_opts
    }

    pub fn test_opts(&self) -> &str {
        &self.test_opts
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The effective policy for a step: an override, else the catalog default.
    pub fn policy_for(&self, step: Step) -> FailurePolicy {
        self.policies
            .get(&step)
            .copied()
            .unwrap_or_else(|| step.default_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kind_when_not_given() {
        let cfg = BuildConfig::new(BuildSettings::new("https://svn.example.org/repos/x", "trunk"))
            .expect("svn location should resolve");
        assert_eq!(cfg.repo_kind(), RepoKind::Svn);
    }

    #[test]
    fn explicit_kind_bypasses_detection() {
        let mut settings = BuildSettings::new("https://example.org/plain/x", "trunk");
        settings.repo_kind = Some(RepoKind::Git);
        let cfg = BuildConfig::new(settings).expect("explicit kind should be honoured");
        assert_eq!(cfg.repo_kind(), RepoKind::Git);
    }

    #[test]
    fn unknown_location_fails_construction() {
        let err = BuildConfig::new(BuildSettings::new("https://example.org/plain/x", "trunk"))
            .expect_err("must fail");
        assert!(matches!(err, BuildError::UnknownRepository(_)));
    }

    #[test]
    fn rejects_target_with_separator() {
        let err = BuildConfig::new(BuildSettings::new("https://github.com/ruby/ruby.git", "a/b"))
            .expect_err("must fail");
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn layout_is_absolute() {
        let cfg = BuildConfig::new(BuildSettings::new("https://github.com/ruby/ruby.git", "trunk"))
            .unwrap();
        assert!(cfg.layout().root().is_absolute());
        assert!(cfg.layout().src().ends_with("src/trunk"));
    }

    #[test]
    fn policy_override_replaces_default() {
        let mut settings = BuildSettings::new("https://github.com/ruby/ruby.git", "trunk");
        settings.policies.insert(Step::TestAll, FailurePolicy::Raise);
        let cfg = BuildConfig::new(settings).unwrap();
        assert_eq!(cfg.policy_for(Step::TestAll), FailurePolicy::Raise);
        assert_eq!(cfg.policy_for(Step::TestBtest), FailurePolicy::Skip);
    }

    #[test]
    fn parses_project_file() {
        let file: ProjectFile = toml::from_str(
            r#"
            [tools]
            make = "gmake"

            [options]
            configure = "--enable-shared"

            [steps]
            default = ["checkout", "build_all"]

            [policy]
            test_all = "raise"
            "#,
        )
        .expect("project file should parse");
        assert_eq!(file.tools.make, "gmake");
        assert_eq!(file.tools.git, "git");
        assert_eq!(file.options.configure.as_deref(), Some("--enable-shared"));
        assert_eq!(file.steps.default.unwrap().len(), 2);
        assert_eq!(file.policy.get("test_all").map(String::as_str), Some("raise"));
    }
}
