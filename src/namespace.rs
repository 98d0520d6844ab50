//! Symbolic name resolution for a single workflow run.
//!
//! Declared input aliases and group output aliases are kept in separate
//! tables. A `$name` reference resolves against group outputs first, then
//! against declared inputs.
use crate::error::{Result, WorkflowError};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Marker that opens a symbolic reference.
pub const SYMBOL_MARKER: char = '$';

pub fn is_symbolic(reference: &str) -> bool {
    reference.starts_with(SYMBOL_MARKER)
}

/// Symbol name of a `$name` reference, or `None` for a literal path.
pub fn symbol_name(reference: &str) -> Option<&str> {
    reference.strip_prefix(SYMBOL_MARKER)
}

/// Latest output of a group and the acquisition times its name was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutput {
    pub path: PathBuf,
    pub acquired: Vec<NaiveDateTime>,
}

/// What a symbol is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding<'a> {
    Group(&'a GroupOutput),
    Input(&'a Path),
}

impl Binding<'_> {
    pub fn path(&self) -> &Path {
        match self {
            Binding::Group(output) => &output.path,
            Binding::Input(path) => path,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Namespace {
    inputs: BTreeMap<String, PathBuf>,
    groups: BTreeMap<String, GroupOutput>,
}

impl Namespace {
    /// Seed the namespace from the configuration's declared inputs.
    pub fn with_inputs(sources: &BTreeMap<String, String>) -> Self {
        let inputs = sources
            .iter()
            .map(|(name, path)| (name.clone(), PathBuf::from(path)))
            .collect();
        Self {
            inputs,
            groups: BTreeMap::new(),
        }
    }

    /// Point a group alias at the group's latest output.
    pub fn bind_group(&mut self, name: &str, output: GroupOutput) {
        self.groups.insert(name.to_string(), output);
    }

    /// Look a bare symbol name up: group outputs first, then declared inputs.
    pub fn lookup(&self, name: &str) -> Option<Binding<'_>> {
        self.groups
            .get(name)
            .map(Binding::Group)
            .or_else(|| self.inputs.get(name).map(|path| Binding::Input(path.as_path())))
    }

    /// Resolve a source reference to a path.
    ///
    /// Literal paths come back unchanged.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        match symbol_name(reference) {
            Some(name) => self
                .lookup(name)
                .map(|binding| binding.path().to_path_buf())
                .ok_or_else(|| WorkflowError::UnresolvedSymbol(name.to_string())),
            None => Ok(PathBuf::from(reference)),
        }
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
