use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;

use rbbuild_core::constants::CONFIG_FILE;
use rbbuild_core::{
    BuildConfig, BuildLog, BuildSettings, ProjectFile, RepoKind, Step, StepRunner,
};
use rbbuild_policy::StepRequest;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod styles;

use styles as s;

/// The command-line interface for rbbuild.
#[derive(Debug, Parser)]
#[command(name = "rbbuild")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(about = "Check out, build, install and test a Ruby tree from source control")]
#[command(
    long_about = "rbbuild fetches a Ruby source tree, configures it out of tree, builds and
installs it, and runs its test suites. Steps run strictly in order; setup steps
are skipped when their output already exists, so re-running is cheap.

Layout below --root:
  src/<TARGET>        checkout
  build/<TARGET>      out-of-tree build
  install/<TARGET>    install prefix
"
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mrbbuild https://github.com/ruby/ruby.git trunk\x1b[0m\n  \x1b[36mrbbuild --install-only --branch ruby_3_3 https://github.com/ruby/ruby.git 3.3\x1b[0m\n  \x1b[36mrbbuild --steps \"build_all test_btest\" https://github.com/ruby/ruby.git trunk\x1b[0m\n  \x1b[36mrbbuild --remove https://github.com/ruby/ruby.git trunk\x1b[0m"
)]
pub(crate) struct Cli {
    /// Repository location (git or svn URL)
    #[arg(required_unless_present = "list_steps")]
    repository: Option<String>,
    /// Target name, used for the src/build/install subdirectories
    #[arg(required_unless_present = "list_steps")]
    target: Option<String>,
    /// Repository kind; detected from the location when omitted
    #[arg(long, value_name = "git|svn")]
    repo_kind: Option<RepoKind>,
    /// Branch to check out
    #[arg(long)]
    branch: Option<String>,
    /// Revision to check out
    #[arg(long)]
    revision: Option<String>,
    /// Extra arguments for configure
    #[arg(long, allow_hyphen_values = true)]
    configure_opts: Option<String>,
    /// Extra arguments for make on build targets
    #[arg(long, allow_hyphen_values = true)]
    build_opts: Option<String>,
    /// Options passed to the test suites (TESTOPTS / MSPECOPT)
    #[arg(long, allow_hyphen_values = true)]
    test_opts: Option<String>,
    /// Root directory holding src/, build/ and install/
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Whitespace-separated list of steps to run
    #[arg(long)]
    steps: Option<String>,
    /// Only build and install; skip every test step
    #[arg(long, default_value_t = false)]
    install_only: bool,
    /// Build log path (default: <ROOT>/<TARGET>-<TIMESTAMP>.log)
    #[arg(long)]
    log: Option<PathBuf>,
    /// Delete the src, build and install trees of the target and exit
    #[arg(long, default_value_t = false)]
    remove: bool,
    /// Parallel make jobs (default: number of CPUs)
    #[arg(long)]
    jobs: Option<usize>,
    /// Project file with tool and option defaults (default: <ROOT>/rbbuild.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the step catalog with default failure policies and exit
    #[arg(long, default_value_t = false)]
    list_steps: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    debug!("parsed cli arguments: {:?}", cli);

    execute(&cli).map(ExitCode::from)
}

/// Runs the requested mode and returns the process exit code.
fn execute(cli: &Cli) -> Result<u8> {
    if cli.list_steps {
        print_catalog();
        return Ok(0);
    }

    let file = load_project_file(cli)?;
    let config = build_config(cli, &file)?;

    if cli.remove {
        config
            .layout()
            .remove_all()
            .with_context(|| format!("unable to remove target '{}'", config.target()))?;
        println!("removed {}", config.target());
        return Ok(0);
    }

    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| default_log_path(&config, Local::now()));
    let log = BuildLog::open(&log_path)?;
    info!(
        "building {} from {} ({}), log {}",
        config.target(),
        config.repository(),
        config.repo_kind(),
        log_path.display()
    );

    let report = StepRunner::new(&config, log).run()?;
    for line in report.diagnostics() {
        eprintln!("{}error:{} {line}", s::ERROR, s::ERROR.render_reset());
    }
    Ok(report.exit_code())
}

fn load_project_file(cli: &Cli) -> Result<ProjectFile> {
    match &cli.config {
        Some(path) => ProjectFile::load_from_file(path)
            .with_context(|| format!("unable to load config '{}'", path.display())),
        None => {
            let path = cli.root.join(CONFIG_FILE);
            if path.is_file() {
                ProjectFile::load_from_file(&path)
            } else {
                debug!("no project file at {}", path.display());
                Ok(ProjectFile::default())
            }
        }
    }
}

/// Merges command-line options over project-file defaults.
fn build_config(cli: &Cli, file: &ProjectFile) -> Result<BuildConfig> {
    let repository = cli
        .repository
        .clone()
        .context("repository location is required")?;
    let target = cli.target.clone().context("target name is required")?;

    let steps = rbbuild_policy::resolve_steps(
        StepRequest {
            install_only: cli.install_only,
            custom: cli.steps.as_deref(),
        },
        file,
    )?;
    let policies = rbbuild_policy::resolve_policies(file)?;

    let mut settings = BuildSettings::new(repository, target);
    settings.repo_kind = cli.repo_kind;
    settings.root = cli.root.clone();
    settings.branch = cli.branch.clone();
    settings.revision = cli.revision.clone();
    settings.configure_opts = pick(&cli.configure_opts, &file.options.configure);
    settings.build_opts = pick(&cli.build_opts, &file.options.build);
    settings.test_opts = pick(&cli.test_opts, &file.options.test);
    if let Some(jobs) = cli.jobs {
        settings.jobs = jobs;
    }
    settings.tools = file.tools.clone();
    settings.steps = steps;
    settings.policies = policies;

    BuildConfig::new(settings).context("invalid build configuration")
}

fn pick(cli: &Option<String>, file: &Option<String>) -> String {
    cli.as_ref().or(file.as_ref()).cloned().unwrap_or_default()
}

fn default_log_path(config: &BuildConfig, now: DateTime<Local>) -> PathBuf {
    log_path_in(config.layout().root(), config.target(), now)
}

fn log_path_in(root: &Path, target: &str, now: DateTime<Local>) -> PathBuf {
    root.join(format!("{}-{}.log", target, now.format("%Y%m%d-%H%M%S")))
}

fn print_catalog() {
    for step in Step::ALL {
        println!(
            "{}{:<16}{} {}{}{}",
            s::STEP,
            step.as_str(),
            s::STEP.render_reset(),
            s::POLICY,
            step.default_policy(),
            s::POLICY.render_reset()
        );
    }
}
