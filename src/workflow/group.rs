//! Step resolution for one processing group.
//!
//! Steps are folded over an immutable `GroupState`: each step sees the state
//! left by the previous one and returns its invocation plus the next state.
use super::RunSettings;
use crate::args::{InvocationKind, ResolvedInvocation, ToolArg};
use crate::catalog::{Dispatch, Operator, SourceConvention};
use crate::config::{GroupConfig, ParamValue, ProcessingStep};
use crate::error::{Result, WorkflowError};
use crate::namespace::{symbol_name, Binding, GroupOutput, Namespace};
use crate::runner::ToolRunner;
use crate::scene::{acquisition_time, date_label, Platform, DIMAP_EXTENSION};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

const WRAPPED_PHASE_PARAM: &str = "wrappedPhase";
const UNWRAPPED_PHASE_PARAM: &str = "unwrappedPhase";

/// What a group carries from one step to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GroupState {
    /// Product the next step reads by default.
    pub latest_output: Option<PathBuf>,
    /// Acquisition times gathered from declared sources, in order.
    pub acquired: Vec<NaiveDateTime>,
    /// Current target filename; suffixes accumulate on it.
    pub target: Option<PathBuf>,
    pub wrapped_phase: Option<PathBuf>,
    pub unwrapped_phase: Option<PathBuf>,
    /// Export directory of this group's wrapped phase, `<targetFolder>/<product>`.
    pub unwrap_export: Option<PathBuf>,
}

impl GroupState {
    fn with_unwrapped(self, header: PathBuf) -> Self {
        Self {
            latest_output: Some(header.clone()),
            unwrapped_phase: Some(header),
            ..self
        }
    }

    pub fn output(&self) -> Option<GroupOutput> {
        self.latest_output.as_ref().map(|path| GroupOutput {
            path: path.clone(),
            acquired: self.acquired.clone(),
        })
    }
}

/// Resolve and run every step of `group`, binding its alias after each step.
pub(crate) fn run_group(
    settings: &RunSettings,
    ns: &mut Namespace,
    group: &GroupConfig,
    runner: &mut dyn ToolRunner,
) -> Result<GroupOutput> {
    if group.steps.is_empty() {
        return Err(WorkflowError::EmptyGroup(group.name.clone()));
    }
    let state = group.steps.iter().enumerate().try_fold(
        GroupState::default(),
        |state, (index, step)| -> Result<GroupState> {
            let (invocation, next) = resolve_step(settings, ns, &group.name, index, step, &state)?;
            let next = match &invocation.kind {
                InvocationKind::Unwrap { export_dir } => {
                    let header = runner.run_unwrap(&invocation, export_dir)?;
                    next.with_unwrapped(header)
                }
                InvocationKind::Operator | InvocationKind::Graph { .. } => {
                    runner.run_tool(&invocation)?;
                    next
                }
            };
            if let Some(output) = next.output() {
                ns.bind_group(&group.name, output);
            }
            Ok(next)
        },
    )?;
    state
        .output()
        .ok_or_else(|| WorkflowError::EmptyGroup(group.name.clone()))
}

/// Materialize step `index` of `group` against the current state.
///
/// Nothing is executed here; the returned state assumes the step succeeds.
pub(crate) fn resolve_step(
    settings: &RunSettings,
    ns: &Namespace,
    group: &str,
    index: usize,
    step: &ProcessingStep,
    state: &GroupState,
) -> Result<(ResolvedInvocation, GroupState)> {
    let operator = Operator::from_id(&step.operator)?;
    let spec = operator.spec();
    let mut next = state.clone();

    let sources: Vec<PathBuf> = match step.declared_sources() {
        Some(references) => {
            let paths = references
                .iter()
                .map(|reference| ns.resolve(reference))
                .collect::<Result<Vec<_>>>()?;
            for reference in references {
                next.acquired
                    .extend(reference_times(&settings.platform, ns, reference)?);
            }
            paths
        }
        None if index == 0 => return Err(WorkflowError::MissingSource(group.to_string())),
        None => state.latest_output.iter().cloned().collect(),
    };

    let base = match (&step.output_basename, &state.target) {
        (Some(basename), _) => dimap_path(&settings.output_dir, basename),
        (None, Some(target)) if index > 0 => target.clone(),
        (None, _) => {
            let basename = date_basename(operator, &next.acquired)
                .ok_or_else(|| WorkflowError::MissingAcquisitionTime(group.to_string()))?;
            dimap_path(&settings.output_dir, &basename)
        }
    };
    let target = with_suffix(&base, &operator.suffix(&step.parameters)?);

    let mut params = Vec::new();
    let source_args = match spec.source {
        _ if spec.dispatch == Dispatch::Unwrap => Vec::new(),
        SourceConvention::Flag(flag) => flagged_sources(flag, &sources),
        SourceConvention::Positional => sources.iter().cloned().map(ToolArg::Positional).collect(),
        SourceConvention::UpstreamPhases => {
            params.push(phase_param(operator, WRAPPED_PHASE_PARAM, &state.wrapped_phase)?);
            params.push(phase_param(operator, UNWRAPPED_PHASE_PARAM, &state.unwrapped_phase)?);
            Vec::new()
        }
    };
    params.extend(step.parameters.iter().map(|(name, value)| {
        let (name, value) = (name.clone(), value.clone());
        match spec.dispatch {
            Dispatch::Unwrap => ToolArg::ConfigOverride { name, value },
            _ => ToolArg::Param { name, value },
        }
    }));

    let (kind, output) = match spec.dispatch {
        Dispatch::Operator => (InvocationKind::Operator, Some(ToolArg::Target(target.clone()))),
        Dispatch::FolderExport { folder_param } => {
            next.wrapped_phase = sources.first().cloned();
            next.unwrap_export = step
                .parameters
                .get(folder_param)
                .zip(next.wrapped_phase.as_deref().and_then(Path::file_stem))
                .map(|(folder, product)| PathBuf::from(folder.to_string()).join(product));
            (InvocationKind::Operator, None)
        }
        Dispatch::Graph(graph) => (
            InvocationKind::Graph {
                graph,
                path: settings.graphs.path(graph),
            },
            Some(ToolArg::OutputFile(target.clone())),
        ),
        Dispatch::Unwrap => {
            let export_dir = state
                .unwrap_export
                .clone()
                .ok_or_else(|| WorkflowError::MissingUnwrapWorkdir(group.to_string()))?;
            (InvocationKind::Unwrap { export_dir }, None)
        }
    };

    next.latest_output = Some(target.clone());
    next.target = Some(target.clone());
    tracing::debug!(
        group,
        step = index,
        operator = %operator,
        target = %target.display(),
        "resolved step"
    );
    let invocation = ResolvedInvocation {
        group: group.to_string(),
        step: index,
        operator,
        kind,
        params,
        sources: source_args,
        output,
        target,
    };
    Ok((invocation, next))
}

/// Acquisition times contributed by one declared source reference.
fn reference_times(
    platform: &Platform,
    ns: &Namespace,
    reference: &str,
) -> Result<Vec<NaiveDateTime>> {
    let path = match symbol_name(reference).map(|name| ns.lookup(name)) {
        None => Path::new(reference),
        Some(Some(Binding::Group(output))) => return Ok(output.acquired.clone()),
        Some(Some(Binding::Input(path))) => path,
        Some(None) => return Ok(Vec::new()),
    };
    Ok(acquisition_time(platform, path)?.into_iter().collect())
}

/// Date-derived basename: a first/last range for co-registration, otherwise
/// the earliest acquisition.
fn date_basename(operator: Operator, acquired: &[NaiveDateTime]) -> Option<String> {
    if operator.is_coregistration() {
        let (first, last) = (acquired.first()?, acquired.last()?);
        Some(format!("{}_{}", date_label(first), date_label(last)))
    } else {
        acquired.iter().min().map(date_label)
    }
}

fn dimap_path(output_dir: &Path, basename: &str) -> PathBuf {
    output_dir.join(format!("{basename}.{DIMAP_EXTENSION}"))
}

/// `scene.dim` + `Orb` -> `scene_Orb.dim`; an empty suffix leaves the name alone.
pub(crate) fn with_suffix(target: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return target.to_path_buf();
    }
    let stem = target
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{stem}_{suffix}.{DIMAP_EXTENSION}"))
}

fn flagged_sources(flag: &'static str, sources: &[PathBuf]) -> Vec<ToolArg> {
    match sources {
        [single] => vec![ToolArg::Source {
            flag,
            index: None,
            path: single.clone(),
        }],
        _ => sources
            .iter()
            .enumerate()
            .map(|(index, path)| ToolArg::Source {
                flag,
                index: Some(index + 1),
                path: path.clone(),
            })
            .collect(),
    }
}

fn phase_param(operator: Operator, name: &str, phase: &Option<PathBuf>) -> Result<ToolArg> {
    let path = phase
        .as_ref()
        .ok_or_else(|| WorkflowError::MissingUpstreamArtifact {
            operator: operator.id().to_string(),
            artifact: name.to_string(),
        })?;
    Ok(ToolArg::Param {
        name: name.to_string(),
        value: ParamValue::Path(path.display().to_string()),
    })
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
