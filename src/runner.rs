//! Execution backends for resolved invocations.
//!
//! `ProcessRunner` spawns the processing and unwrap tools and checks their exit
//! status. `PreviewRunner` records invocations without touching anything.
use crate::args::{InvocationKind, InvocationSummary, ResolvedInvocation};
use crate::error::{Result, WorkflowError};
use crate::graphs::install_graph;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Instant;

const UNWRAP_CONFIG: &str = "snaphu.conf";
const UNWRAPPED_HEADER_PATTERN: &str = "UnwPhase*.snaphu.hdr";

/// Backend that carries out resolved steps.
pub trait ToolRunner {
    /// Run the processing tool for an operator or graph invocation.
    fn run_tool(&mut self, invocation: &ResolvedInvocation) -> Result<()>;

    /// Run the unwrap tool in `export_dir`, returning the unwrapped-phase header.
    fn run_unwrap(
        &mut self,
        invocation: &ResolvedInvocation,
        export_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Paths or names of the external tools.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub gpt: PathBuf,
    pub snaphu: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            gpt: PathBuf::from("gpt"),
            snaphu: PathBuf::from("snaphu"),
        }
    }
}

/// Runs invocations as blocking external processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tools: ToolPaths,
}

impl ProcessRunner {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}

impl ToolRunner for ProcessRunner {
    fn run_tool(&mut self, invocation: &ResolvedInvocation) -> Result<()> {
        if let InvocationKind::Graph { graph, path } = &invocation.kind {
            install_graph(*graph, path)?;
        }
        let program = locate(&self.tools.gpt)?;
        tracing::info!(
            group = %invocation.group,
            step = invocation.step,
            operator = %invocation.operator,
            command = %invocation.command_line(&self.tools.gpt),
            "running processing tool"
        );
        let mut cmd = Command::new(&program);
        cmd.args(invocation.argv());
        run_checked(cmd, &program, invocation)
    }

    fn run_unwrap(
        &mut self,
        invocation: &ResolvedInvocation,
        export_dir: &Path,
    ) -> Result<PathBuf> {
        let config_path = find_unwrap_config(export_dir)?;
        let base_args = unwrap_command_args(&config_path)?;
        let program = locate(&self.tools.snaphu)?;
        tracing::info!(
            group = %invocation.group,
            step = invocation.step,
            export_dir = %export_dir.display(),
            command = %invocation.command_line(&self.tools.snaphu),
            "running unwrap tool"
        );
        let mut cmd = Command::new(&program);
        cmd.args(&base_args)
            .args(invocation.argv())
            .current_dir(export_dir);
        run_checked(cmd, &program, invocation)?;
        find_unwrapped_header(export_dir)
    }
}

fn locate(tool: &Path) -> Result<PathBuf> {
    which::which(tool).map_err(|source| WorkflowError::ToolNotFound {
        tool: tool.display().to_string(),
        source,
    })
}

fn run_checked(mut cmd: Command, program: &Path, invocation: &ResolvedInvocation) -> Result<()> {
    let start = Instant::now();
    let status = cmd
        .status()
        .map_err(|err| WorkflowError::io(format!("spawn {}", program.display()), err))?;
    let elapsed_ms = start.elapsed().as_millis();
    tracing::info!(
        elapsed_ms,
        group = %invocation.group,
        step = invocation.step,
        operator = %invocation.operator,
        target = %invocation.target.display(),
        success = status.success(),
        "step complete"
    );
    if !status.success() {
        return Err(WorkflowError::ExternalToolFailed {
            tool: format!("{} ({})", program.display(), invocation.operator),
            status: status_label(status),
        });
    }
    Ok(())
}

/// Exit code, or a note that a signal ended the tool.
fn status_label(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "killed by signal".to_string(), |code| code.to_string())
}

/// The unwrap configuration written by the export step into `export_dir`.
fn find_unwrap_config(export_dir: &Path) -> Result<PathBuf> {
    let path = export_dir.join(UNWRAP_CONFIG);
    if path.is_file() {
        Ok(path)
    } else {
        Err(WorkflowError::MissingUpstreamArtifact {
            operator: "SnaphuUnwrapping".to_string(),
            artifact: path.display().to_string(),
        })
    }
}

/// Locate the unwrapped-phase header produced inside `export_dir`.
pub(crate) fn find_unwrapped_header(export_dir: &Path) -> Result<PathBuf> {
    let pattern = format!(
        "{}/{UNWRAPPED_HEADER_PATTERN}",
        glob::Pattern::escape(&export_dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|source| WorkflowError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;
    let mut matches: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or_else(|| WorkflowError::MissingUpstreamArtifact {
            operator: "SnaphuUnwrapping".to_string(),
            artifact: pattern,
        })
}

/// Unwrap-tool arguments from the `snaphu -f ...` comment line of the config.
pub(crate) fn unwrap_command_args(config_path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(config_path)
        .map_err(|err| WorkflowError::io(format!("read {}", config_path.display()), err))?;
    let invalid = |reason: String| WorkflowError::InvalidUnwrapConfig {
        path: config_path.to_path_buf(),
        reason,
    };
    let line = text
        .lines()
        .map(|line| line.trim_start_matches('#').trim())
        .find_map(|line| line.strip_prefix("snaphu "))
        .filter(|rest| rest.contains("-f"))
        .ok_or_else(|| invalid("no `snaphu -f` command line".to_string()))?;
    shell_words::split(line).map_err(|err| invalid(err.to_string()))
}

/// Records invocations instead of running them.
#[derive(Debug, Clone, Default)]
pub struct PreviewRunner {
    tools: ToolPaths,
    recorded: Vec<InvocationSummary>,
}

impl PreviewRunner {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            recorded: Vec::new(),
        }
    }

    pub fn recorded(&self) -> &[InvocationSummary] {
        &self.recorded
    }
}

impl ToolRunner for PreviewRunner {
    fn run_tool(&mut self, invocation: &ResolvedInvocation) -> Result<()> {
        self.recorded.push(invocation.summary(&self.tools.gpt));
        Ok(())
    }

    fn run_unwrap(
        &mut self,
        invocation: &ResolvedInvocation,
        export_dir: &Path,
    ) -> Result<PathBuf> {
        self.recorded.push(invocation.summary(&self.tools.snaphu));
        Ok(export_dir.join(UNWRAPPED_HEADER_PATTERN))
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
