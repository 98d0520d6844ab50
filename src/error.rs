//! Error taxonomy for workflow resolution and execution.
//!
//! Every variant is fatal to the workflow instance that raised it; nothing
//! here is retried.
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised while resolving or running a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Operator identifier outside the catalog allow-list.
    #[error("operator {0:?} is not a recognized processing operator")]
    UnknownOperator(String),

    /// Operator whose suffix is derived from a parameter that was not given.
    #[error("operator {operator} requires a {parameter:?} parameter")]
    MissingRequiredParameter { operator: String, parameter: String },

    /// Symbolic reference with no group output and no declared input.
    #[error("symbol ${0} does not name a group output or a declared input")]
    UnresolvedSymbol(String),

    /// An artifact an operator depends on was never produced in its group.
    #[error("{operator} needs the {artifact} produced earlier in the same group")]
    MissingUpstreamArtifact { operator: String, artifact: String },

    /// Unwrapping reached without a prior export in the same group.
    #[error("group {0}: SnaphuUnwrapping needs a SnaphuExport targetFolder earlier in the group")]
    MissingUnwrapWorkdir(String),

    #[error("{field} not found in {}", path.display())]
    MetadataFieldMissing { field: &'static str, path: PathBuf },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// First step of a group declares no source.
    #[error("group {0}: the first step must declare a source")]
    MissingSource(String),

    /// External process exited unsuccessfully.
    #[error("{tool} failed with status {status}")]
    ExternalToolFailed { tool: String, status: String },

    #[error("could not locate {tool}: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("group {0} has no steps")]
    EmptyGroup(String),

    #[error("workflow declares no groups")]
    EmptyWorkflow,

    /// Group with no acquisition time to derive its output name from.
    #[error("group {0}: no acquisition time available to name the output")]
    MissingAcquisitionTime(String),

    /// Batch insertion point that is not a group of the template.
    #[error("insertion point {0:?} is not a group in the template workflow")]
    UnknownInsertionPoint(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("invalid unwrap configuration {}: {reason}", path.display())]
    InvalidUnwrapConfig { path: PathBuf, reason: String },

    #[error("invalid scene timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("parse XML {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        WorkflowError::Io {
            context: context.into(),
            source,
        }
    }
}
