//! Typed command-line construction for processing-tool invocations.
//!
//! Arguments keep their semantic type until the last moment and render two
//! ways: argv elements for spawning without a shell, and the quoted display
//! form used in previews and logs.
use crate::catalog::Operator;
use crate::config::ParamValue;
use crate::graphs::GraphId;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One argument of a processing-tool or unwrap-tool command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArg {
    /// `-<flag>="<path>"`, or `-<flag><index>="<path>"` for indexed sources.
    Source {
        flag: &'static str,
        index: Option<usize>,
        path: PathBuf,
    },
    /// Bare source path with no flag.
    Positional(PathBuf),
    /// `-P<name>=<value>`.
    Param { name: String, value: ParamValue },
    /// `-t "<target>"`.
    Target(PathBuf),
    /// `-PoutputFile="<target>"` for graph files.
    OutputFile(PathBuf),
    /// `-C "<name> <value>"` configuration override for the unwrap tool.
    ConfigOverride { name: String, value: ParamValue },
}

impl ToolArg {
    /// Argv elements for direct process spawning.
    pub fn argv(&self) -> Vec<String> {
        match self {
            ToolArg::Source { flag, index, path } => {
                vec![format!("-{flag}{}={}", index_label(*index), path.display())]
            }
            ToolArg::Positional(path) => vec![path.display().to_string()],
            ToolArg::Param { name, value } => vec![format!("-P{name}={value}")],
            ToolArg::Target(path) => vec!["-t".to_string(), path.display().to_string()],
            ToolArg::OutputFile(path) => vec![format!("-PoutputFile={}", path.display())],
            ToolArg::ConfigOverride { name, value } => {
                vec!["-C".to_string(), format!("{name} {value}")]
            }
        }
    }

    /// Quoted display form.
    pub fn display(&self) -> String {
        match self {
            ToolArg::Source { flag, index, path } => {
                format!("-{flag}{}=\"{}\"", index_label(*index), path.display())
            }
            ToolArg::Positional(path) => path.display().to_string(),
            ToolArg::Param { name, value } if value.is_quoted() => format!("-P{name}=\"{value}\""),
            ToolArg::Param { name, value } => format!("-P{name}={value}"),
            ToolArg::Target(path) => format!("-t \"{}\"", path.display()),
            ToolArg::OutputFile(path) => format!("-PoutputFile=\"{}\"", path.display()),
            ToolArg::ConfigOverride { name, value } => format!("-C \"{name} {value}\""),
        }
    }
}

fn index_label(index: Option<usize>) -> String {
    index.map(|index| index.to_string()).unwrap_or_default()
}

/// What an invocation executes.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationKind {
    /// Processing tool with the operator named directly.
    Operator,
    /// Processing tool with an embedded graph file in place of the operator.
    Graph { graph: GraphId, path: PathBuf },
    /// Unwrap tool run inside the export directory of one wrapped phase.
    Unwrap { export_dir: PathBuf },
}

/// Fully materialized form of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInvocation {
    pub group: String,
    pub step: usize,
    pub operator: Operator,
    pub kind: InvocationKind,
    pub params: Vec<ToolArg>,
    pub sources: Vec<ToolArg>,
    pub output: Option<ToolArg>,
    pub target: PathBuf,
}

impl ResolvedInvocation {
    /// Operator name or graph path, the first tool argument.
    pub fn operand(&self) -> String {
        match &self.kind {
            InvocationKind::Graph { path, .. } => path.display().to_string(),
            InvocationKind::Operator | InvocationKind::Unwrap { .. } => {
                self.operator.id().to_string()
            }
        }
    }

    fn ordered_args(&self) -> impl Iterator<Item = &ToolArg> {
        self.params
            .iter()
            .chain(self.sources.iter())
            .chain(self.output.iter())
    }

    /// Argv for the processing tool, operand first.
    ///
    /// Unwrap invocations carry only their configuration overrides.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::new();
        if !matches!(self.kind, InvocationKind::Unwrap { .. }) {
            argv.push(self.operand());
        }
        argv.extend(self.ordered_args().flat_map(ToolArg::argv));
        argv
    }

    /// Display command line, `<tool> <operand> [params] <sources> [output]`.
    pub fn command_line(&self, tool: &Path) -> String {
        let mut parts = vec![tool.display().to_string()];
        match &self.kind {
            InvocationKind::Unwrap { export_dir } => {
                parts.push(format!("(in {})", export_dir.display()));
            }
            _ => parts.push(self.operand()),
        }
        parts.extend(self.ordered_args().map(ToolArg::display));
        parts.join(" ")
    }

    pub fn summary(&self, tool: &Path) -> InvocationSummary {
        InvocationSummary {
            group: self.group.clone(),
            step: self.step,
            operator: self.operator.id().to_string(),
            target: self.target.display().to_string(),
            command: self.command_line(tool),
        }
    }
}

/// Serializable view of an invocation for previews.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationSummary {
    pub group: String,
    pub step: usize,
    pub operator: String,
    pub target: String,
    pub command: String,
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
