//! Workflow orchestration.
//!
//! Groups run strictly in declaration order against one namespace that lives
//! for a single run.
mod group;

use crate::config::WorkflowConfig;
use crate::error::{Result, WorkflowError};
use crate::graphs::{GraphDir, DEFAULT_GRAPHS_DIR};
use crate::namespace::Namespace;
use crate::runner::ToolRunner;
use crate::scene::Platform;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Where and for which platform a workflow runs.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub platform: Platform,
    pub graphs: GraphDir,
}

impl RunSettings {
    /// Settings with graphs installed under `<output_dir>/.graphs`.
    pub fn new(output_dir: PathBuf, platform: Platform) -> Self {
        let graphs = GraphDir::new(output_dir.join(DEFAULT_GRAPHS_DIR));
        Self {
            output_dir,
            platform,
            graphs,
        }
    }

    pub fn with_graphs_dir(mut self, root: Option<PathBuf>) -> Self {
        if let Some(root) = root {
            self.graphs = GraphDir::new(root);
        }
        self
    }
}

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    /// Latest output of the last group.
    pub final_output: PathBuf,
    /// Latest output of every group, in declaration order.
    pub group_outputs: Vec<(String, PathBuf)>,
}

/// Run every group of `config` in order and return the final product.
///
/// The first failing step aborts the run; files written by earlier steps are
/// left in place.
pub fn run_workflow(
    config: &WorkflowConfig,
    settings: &RunSettings,
    runner: &mut dyn ToolRunner,
) -> Result<WorkflowOutcome> {
    let start = Instant::now();
    let mut ns = Namespace::with_inputs(&config.sources);
    let mut group_outputs = Vec::with_capacity(config.groups.len());
    for group in &config.groups {
        tracing::info!(group = %group.name, steps = group.steps.len(), "running group");
        let output = group::run_group(settings, &mut ns, group, runner)?;
        group_outputs.push((group.name.clone(), output.path));
    }
    let final_output = group_outputs
        .last()
        .map(|(_, path)| path.clone())
        .ok_or(WorkflowError::EmptyWorkflow)?;
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis(),
        groups = group_outputs.len(),
        final_output = %final_output.display(),
        "workflow complete"
    );
    Ok(WorkflowOutcome {
        final_output,
        group_outputs,
    })
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
