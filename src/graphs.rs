//! Embedded processing-graph files.
//!
//! Operators that the processing tool cannot take by name are run through
//! these graphs, installed on demand into a graphs directory.
use crate::error::{Result, WorkflowError};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUBSET_GRAPH_XML: &str = include_str!("../graphs/subset.xml");
pub const PHASE_IMPORT_GRAPH_XML: &str = include_str!("../graphs/snaphu_import.xml");

/// Default graphs directory, relative to the output directory.
pub const DEFAULT_GRAPHS_DIR: &str = ".graphs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphId {
    Subset,
    PhaseImport,
}

impl GraphId {
    pub fn file_name(self) -> &'static str {
        match self {
            GraphId::Subset => "subset.xml",
            GraphId::PhaseImport => "snaphu_import.xml",
        }
    }

    pub fn contents(self) -> &'static str {
        match self {
            GraphId::Subset => SUBSET_GRAPH_XML,
            GraphId::PhaseImport => PHASE_IMPORT_GRAPH_XML,
        }
    }
}

/// Location of installed graph files.
#[derive(Debug, Clone)]
pub struct GraphDir {
    root: PathBuf,
}

impl GraphDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self, graph: GraphId) -> PathBuf {
        self.root.join(graph.file_name())
    }
}

/// Write a graph file unless one already exists at `path`.
///
/// An existing file is left alone so local edits to a graph survive.
pub fn install_graph(graph: GraphId, path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| WorkflowError::io(format!("create {}", parent.display()), err))?;
    }
    fs::write(path, graph.contents())
        .map_err(|err| WorkflowError::io(format!("write {}", path.display()), err))?;
    tracing::debug!(path = %path.display(), "installed graph");
    Ok(())
}
