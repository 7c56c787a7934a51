use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, CommandFailure, Result};
use crate::exec::{command_line, run_logged, shell_quote};
use crate::layout::ensure_dir;
use crate::log::BuildLog;
use crate::repo::RepoKind;
use crate::step::{FailurePolicy, Step};
use crate::workdir::ScopedDir;

/// How a step ended once its policy has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Halted the sequence.
    Fatal(CommandFailure),
    /// Recorded for the end-of-run report; the sequence went on.
    Recorded(CommandFailure),
}

impl StepOutcome {
    fn classify(policy: FailurePolicy, failure: CommandFailure) -> Self {
        match policy {
            FailurePolicy::Raise => Self::Fatal(failure),
            FailurePolicy::Skip => Self::Recorded(failure),
            FailurePolicy::Ignore => {
                warn!(target: "rbbuild", "ignoring failure: {}", failure);
                Self::Success
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
    /// The step's output already existed, so nothing ran.
    pub up_to_date: bool,
    pub elapsed: Duration,
}

/// Result of a run that was not cut short by an unexpected error.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn fatal(&self) -> Option<&CommandFailure> {
        self.steps.iter().find_map(|record| match &record.outcome {
            StepOutcome::Fatal(failure) => Some(failure),
            _ => None,
        })
    }

    /// Failures of `skip` steps, in the order they happened.
    pub fn recorded(&self) -> Vec<(Step, &CommandFailure)> {
        self.steps
            .iter()
            .filter_map(|record| match &record.outcome {
                StepOutcome::Recorded(failure) => Some((record.step, failure)),
                _ => None,
            })
            .collect()
    }

    /// Lines to print before exiting: the fatal failure alone, or one line
    /// per recorded failure.
    pub fn diagnostics(&self) -> Vec<String> {
        if let Some(failure) = self.fatal() {
            return vec![failure.to_string()];
        }
        self.recorded()
            .into_iter()
            .map(|(step, failure)| format!("{step}: {failure}"))
            .collect()
    }

    pub fn exit_code(&self) -> u8 {
        if self.fatal().is_some() || !self.recorded().is_empty() {
            1
        } else {
            0
        }
    }

    pub fn ran(&self, step: Step) -> bool {
        self.steps.iter().any(|record| record.step == step)
    }
}

/// Executes the configured steps strictly in order.
#[derive(Debug)]
pub struct StepRunner<'a> {
    config: &'a BuildConfig,
    log: BuildLog,
}

impl<'a> StepRunner<'a> {
    pub fn new(config: &'a BuildConfig, log: BuildLog) -> Self {
        Self { config, log }
    }

    /// Runs every step, stopping at the first fatal failure.
    ///
    /// # Errors
    /// Any error other than a failed command (I/O, spawn, directory setup)
    /// aborts the run and is returned after the timing so far is reported.
    #[instrument(skip(self), fields(build = %self.config.target()))]
    pub fn run(mut self) -> Result<RunReport> {
        let config = self.config;
        let started = Instant::now();
        let mut records = Vec::with_capacity(config.steps().len());

        for &step in config.steps() {
            let step_started = Instant::now();
            let up_to_date = config.layout().is_up_to_date(step);

            let result = if up_to_date {
                info!(target: "rbbuild", "skip {}: already present", step);
                Ok(())
            } else {
                info!(target: "rbbuild", "step {}", step);
                self.execute(step)
            };

            let outcome = match result {
                Ok(()) => StepOutcome::Success,
                Err(BuildError::CommandFailed(failure)) => {
                    StepOutcome::classify(config.policy_for(step), failure)
                }
                Err(e) => {
                    warn!(target: "rbbuild", "step {} aborted: {}", step, e);
                    let aborted = Some((step, step_started.elapsed()));
                    report_timing(&records, aborted, started.elapsed());
                    return Err(e);
                }
            };

            let fatal = matches!(outcome, StepOutcome::Fatal(_));
            records.push(StepRecord {
                step,
                outcome,
                up_to_date,
                elapsed: step_started.elapsed(),
            });
            if fatal {
                break;
            }
        }

        let report = RunReport {
            steps: records,
            elapsed: started.elapsed(),
        };
        report_timing(&report.steps, None, report.elapsed);
        Ok(report)
    }

    fn execute(&mut self, step: Step) -> Result<()> {
        match step {
            Step::Checkout => self.checkout(),
            Step::Autoconf => self.autoconf(),
            Step::Configure => self.configure(),
            _ => self.make(step),
        }
    }

    fn checkout(&mut self) -> Result<()> {
        let config = self.config;
        let layout = config.layout();
        let tools = config.tools();
        let url = config.repository();
        let target = shell_quote(config.target());

        match config.repo_kind() {
            RepoKind::Git => {
                let branch = config
                    .branch()
                    .map(|b| format!("--branch {}", shell_quote(b)))
                    .unwrap_or_default();
                let clone = command_line([
                    tools.git.as_str(),
                    "clone",
                    branch.as_str(),
                    shell_quote(url).as_str(),
                    target.as_str(),
                ]);
                self.sh(&layout.checkouts(), &clone)?;

                if let Some(revision) = config.revision() {
                    let revision = shell_quote(revision);
                    let checkout = command_line([tools.git.as_str(), "checkout", revision.as_str()]);
                    self.sh(layout.src(), &checkout)?;
                }
            }
            RepoKind::Svn => {
                let url = match config.branch() {
                    Some(branch) => format!("{}/branches/{}", url.trim_end_matches('/'), branch),
                    None => url.to_string(),
                };
                let revision = config
                    .revision()
                    .map(|r| format!("-r {}", shell_quote(r)))
                    .unwrap_or_default();
                let checkout = command_line([
                    tools.svn.as_str(),
                    "checkout",
                    revision.as_str(),
                    shell_quote(&url).as_str(),
                    target.as_str(),
                ]);
                self.sh(&layout.checkouts(), &checkout)?;
            }
        }
        Ok(())
    }

    fn autoconf(&mut self) -> Result<()> {
        let config = self.config;
        self.sh(config.layout().src(), &config.tools().autoconf)
    }

    fn configure(&mut self) -> Result<()> {
        let config = self.config;
        let layout = config.layout();
        let script = shell_quote(&layout.configure_script().display().to_string());
        let prefix = format!(
            "--prefix={}",
            shell_quote(&layout.install().display().to_string())
        );
        let command = command_line([script.as_str(), prefix.as_str(), config.configure_opts()]);
        self.sh(layout.build(), &command)
    }

    fn make(&mut self, step: Step) -> Result<()> {
        let config = self.config;
        let Some(make_target) = step.make_target() else {
            return Err(BuildError::Config(format!("step '{step}' has no make target")));
        };

        let command = if step.is_test() {
            let opts = match (step, config.test_opts()) {
                (_, "") => String::new(),
                (Step::TestRubyspec, opts) => format!("MSPECOPT={}", shell_quote(opts)),
                (_, opts) => format!("TESTOPTS={}", shell_quote(opts)),
            };
            command_line([config.tools().make.as_str(), make_target, opts.as_str()])
        } else {
            let jobs = format!("-j{}", config.jobs());
            command_line([
                config.tools().make.as_str(),
                jobs.as_str(),
                config.build_opts(),
                make_target,
            ])
        };
        self.sh(config.layout().build(), &command)
    }

    /// Runs one command with `dir` as the working directory.
    fn sh(&mut self, dir: &Path, command: &str) -> Result<()> {
        ensure_dir(dir)?;
        let cwd = ScopedDir::enter(dir)?;
        let result = run_logged(command, &mut self.log);
        cwd.leave()?;
        result
    }
}

fn report_timing(records: &[StepRecord], aborted: Option<(Step, Duration)>, total: Duration) {
    for line in timing_lines(records, aborted, total) {
        info!(target: "rbbuild", "{}", line);
    }
}

/// One line per finished step, then the aborted step if any, then the total.
fn timing_lines(
    records: &[StepRecord],
    aborted: Option<(Step, Duration)>,
    total: Duration,
) -> Vec<String> {
    let mut lines: Vec<String> = records
        .iter()
        .map(|record| {
            let note = if record.up_to_date { " (up to date)" } else { "" };
            format!("{}: {:.2?}{}", record.step, record.elapsed, note)
        })
        .collect();
    if let Some((step, elapsed)) = aborted {
        lines.push(format!("{}: {:.2?} (aborted)", step, elapsed));
    }
    lines.push(format!("total: {:.2?}", total));
    lines
}
