//! Workflow configuration model and TOML loading.
//!
//! The document names input aliases under `[sources]` and an ordered set of
//! processing groups under `[workflow]`. Group order in the file is execution
//! order, so the loader keeps it exactly as written.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Parsed workflow: declared inputs plus groups in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowConfig {
    pub sources: BTreeMap<String, String>,
    pub groups: Vec<GroupConfig>,
}

impl WorkflowConfig {
    pub fn group_mut(&mut self, name: &str) -> Option<&mut GroupConfig> {
        self.groups.iter_mut().find(|group| group.name == name)
    }
}

/// A named, ordered chain of processing steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupConfig {
    pub name: String,
    pub steps: Vec<ProcessingStep>,
}

/// One operator application within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessingStep {
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_basename: Option<String>,
}

impl ProcessingStep {
    /// Declared source references, if the step has any.
    pub fn declared_sources(&self) -> Option<&[String]> {
        self.source
            .as_ref()
            .map(SourceSpec::as_slice)
            .filter(|sources| !sources.is_empty())
    }
}

/// `source = "..."` or `source = ["...", "..."]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    One(String),
    Many(Vec<String>),
}

impl SourceSpec {
    pub fn as_slice(&self) -> &[String] {
        match self {
            SourceSpec::One(source) => std::slice::from_ref(source),
            SourceSpec::Many(sources) => sources,
        }
    }
}

/// Operator parameter value, classified once at parse time.
///
/// Numbers and booleans are passed bare; text and paths are quoted in the
/// display form of a command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawParamValue", into = "RawParamValue")]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Path(String),
}

impl ParamValue {
    pub fn is_quoted(&self) -> bool {
        matches!(self, ParamValue::Text(_) | ParamValue::Path(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(value) => write!(f, "{value}"),
            // Debug keeps the fractional part: 1.0 stays `1.0`.
            ParamValue::Float(value) => write!(f, "{value:?}"),
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Text(value) | ParamValue::Path(value) => f.write_str(value),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawParamValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl From<RawParamValue> for ParamValue {
    fn from(raw: RawParamValue) -> Self {
        match raw {
            RawParamValue::Integer(value) => ParamValue::Integer(value),
            RawParamValue::Float(value) => ParamValue::Float(value),
            RawParamValue::Bool(value) => ParamValue::Bool(value),
            RawParamValue::Text(value) if value.contains(['/', '\\']) => ParamValue::Path(value),
            RawParamValue::Text(value) => ParamValue::Text(value),
        }
    }
}

impl From<ParamValue> for RawParamValue {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Integer(value) => RawParamValue::Integer(value),
            ParamValue::Float(value) => RawParamValue::Float(value),
            ParamValue::Bool(value) => RawParamValue::Bool(value),
            ParamValue::Text(value) | ParamValue::Path(value) => RawParamValue::Text(value),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    sources: BTreeMap<String, String>,
    workflow: toml::Table,
}

/// Load and parse a workflow TOML file.
pub fn load_config(path: &Path) -> Result<WorkflowConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read workflow config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("load workflow config {}", path.display()))
}

/// Parse workflow TOML text, preserving group declaration order.
pub fn parse_config(text: &str) -> Result<WorkflowConfig> {
    let escaped = escape_backslashes(text);
    let raw: RawConfig = toml::from_str(&escaped).context("parse workflow TOML")?;
    let mut groups = Vec::with_capacity(raw.workflow.len());
    for (name, value) in raw.workflow {
        let steps: Vec<ProcessingStep> = value
            .try_into()
            .with_context(|| format!("parse steps of [[workflow.{name}]]"))?;
        groups.push(GroupConfig { name, steps });
    }
    Ok(WorkflowConfig {
        sources: raw.sources,
        groups,
    })
}

/// Double every backslash so Windows paths in basic strings load literally.
fn escape_backslashes(text: &str) -> String {
    text.replace('\\', "\\\\")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
