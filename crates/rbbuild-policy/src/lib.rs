use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use rbbuild_core::{FailurePolicy, ProjectFile, Step};

/// Where the list of steps to run comes from, highest precedence first.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepRequest<'a> {
    /// Build-and-install preset: every step except the test steps.
    pub install_only: bool,
    /// Whitespace-separated step names given on the command line.
    pub custom: Option<&'a str>,
}

pub fn resolve_steps(request: StepRequest<'_>, file: &ProjectFile) -> Result<Vec<Step>> {
    if request.install_only {
        debug!("using install-only preset");
        return Ok(install_steps());
    }

    if let Some(custom) = request.custom {
        let steps = parse_names(custom.split_whitespace())
            .with_context(|| format!("invalid step list '{custom}'"))?;
        if steps.is_empty() {
            bail!("step list is empty");
        }
        return Ok(steps);
    }

    if let Some(default) = &file.steps.default {
        let steps = parse_names(default.iter().map(String::as_str))
            .context("invalid [steps] default in project file")?;
        if steps.is_empty() {
            bail!("[steps] default in project file is empty");
        }
        return Ok(steps);
    }

    Ok(Step::ALL.to_vec())
}

/// The build-and-install subset of the catalog.
pub fn install_steps() -> Vec<Step> {
    Step::ALL.into_iter().filter(|step| !step.is_test()).collect()
}

pub fn resolve_policies(file: &ProjectFile) -> Result<HashMap<Step, FailurePolicy>> {
    file.policy
        .iter()
        .map(|(name, policy)| {
            let step = Step::from_str(name).map_err(|e| anyhow!("[policy] {e}"))?;
            let policy = FailurePolicy::from_str(policy)
                .map_err(|e| anyhow!("[policy] {name}: {e}"))?;
            Ok::<_, anyhow::Error>((step, policy))
        })
        .collect()
}

fn parse_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<Vec<Step>> {
    names
        .map(|name| Step::from_str(name).map_err(|e| anyhow!(e)))
        .collect()
}
