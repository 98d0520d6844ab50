//! Batch and pair expansion of a template workflow.
//!
//! Matching inputs are cut into windows, one window per workflow instance,
//! and written into the first step of each insertion-point group.
use crate::config::{SourceSpec, WorkflowConfig};
use crate::error::{Result, WorkflowError};
use crate::runner::ToolRunner;
use crate::workflow::{run_workflow, RunSettings};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// How input windows advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Windows advance by `stride`; without one they do not overlap.
    Batch { stride: Option<usize> },
    /// Consecutive overlapping windows.
    Pairs,
}

impl WindowMode {
    fn stride(self, window: usize) -> usize {
        match self {
            WindowMode::Batch { stride } => stride.unwrap_or(window),
            WindowMode::Pairs => 1,
        }
    }
}

/// One expanded, independent copy of the template.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInstance {
    pub index: usize,
    pub inputs: Vec<PathBuf>,
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub completed: usize,
    /// Final products that cleanup must keep.
    pub protected: BTreeSet<PathBuf>,
    /// Scenes the completed instances read.
    pub inputs: BTreeSet<PathBuf>,
}

impl BatchOutcome {
    /// Everything a post-batch sweep must leave alone: final products and
    /// the input scenes, which may live in the output directory.
    pub fn retained(&self) -> BTreeSet<PathBuf> {
        self.protected.union(&self.inputs).cloned().collect()
    }
}

/// Files in `dir` whose name matches `pattern`, sorted by path.
pub fn list_inputs(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = glob::Pattern::new(pattern).map_err(|source| WorkflowError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let entries = fs::read_dir(dir)
        .map_err(|err| WorkflowError::io(format!("read {}", dir.display()), err))?;
    let mut inputs = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|err| WorkflowError::io(format!("read {}", dir.display()), err))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| matcher.matches(&name.to_string_lossy()));
        if matches && path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Expand `template` over `inputs`, one instance per window.
///
/// The window size is the number of insertion points; window element `k` is
/// written into the first step of insertion group `k`.
pub fn expand(
    template: &WorkflowConfig,
    inputs: &[PathBuf],
    insertion_points: &[String],
    mode: WindowMode,
) -> Result<Vec<WorkflowInstance>> {
    if insertion_points.is_empty() {
        return Err(WorkflowError::InvalidBatch(
            "at least one insertion point is required".to_string(),
        ));
    }
    for name in insertion_points {
        let group = template
            .groups
            .iter()
            .find(|group| group.name == *name)
            .ok_or_else(|| WorkflowError::UnknownInsertionPoint(name.clone()))?;
        if group.steps.is_empty() {
            return Err(WorkflowError::EmptyGroup(name.clone()));
        }
    }
    let window = insertion_points.len();
    let stride = mode.stride(window);
    if stride == 0 {
        return Err(WorkflowError::InvalidBatch(
            "stride must be at least 1".to_string(),
        ));
    }

    let mut instances = Vec::new();
    for (index, chunk) in inputs.windows(window).step_by(stride).enumerate() {
        let mut workflow = template.clone();
        for (name, input) in insertion_points.iter().zip(chunk) {
            if let Some(first) = workflow
                .group_mut(name)
                .and_then(|group| group.steps.first_mut())
            {
                first.source = Some(SourceSpec::One(input.display().to_string()));
            }
        }
        instances.push(WorkflowInstance {
            index,
            inputs: chunk.to_vec(),
            workflow,
        });
    }
    tracing::info!(
        inputs = inputs.len(),
        window,
        stride,
        instances = instances.len(),
        "expanded batch"
    );
    Ok(instances)
}

/// Record every instance before anything runs.
pub fn write_manifest(path: &Path, instances: &[WorkflowInstance]) -> Result<()> {
    let io_err = |err: std::io::Error| WorkflowError::io(format!("write {}", path.display()), err);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(instances)
        .map_err(|err| io_err(std::io::Error::from(err)))?;
    fs::write(path, json + "\n").map_err(io_err)
}

/// Run instances one after another, collecting their final products.
///
/// The first failing instance aborts the batch.
pub fn run_batch(
    instances: &[WorkflowInstance],
    settings: &RunSettings,
    runner: &mut dyn ToolRunner,
) -> Result<BatchOutcome> {
    let start = Instant::now();
    let mut outcome = BatchOutcome::default();
    for instance in instances {
        tracing::info!(
            instance = instance.index,
            inputs = ?instance.inputs,
            "running batch instance"
        );
        let result = run_workflow(&instance.workflow, settings, runner).inspect_err(|err| {
            tracing::error!(
                instance = instance.index,
                completed = outcome.completed,
                error = %err,
                "batch instance failed"
            );
        })?;
        outcome.protected.insert(result.final_output);
        outcome.inputs.extend(instance.inputs.iter().cloned());
        outcome.completed += 1;
    }
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis(),
        completed = outcome.completed,
        protected = outcome.protected.len(),
        "batch complete"
    );
    Ok(outcome)
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
