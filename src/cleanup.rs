//! Post-batch removal of intermediate products.
//!
//! A product is its `.dim` descriptor plus the same-named `.data` directory;
//! both halves are kept or removed together.
use crate::error::{Result, WorkflowError};
use crate::scene::{DIMAP_DATA_EXTENSION, DIMAP_EXTENSION};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
}

/// Delete every product in `output_dir` that is not protected.
///
/// Only direct children are considered. Entries already gone are ignored, so
/// repeating a sweep is a no-op.
pub fn sweep(output_dir: &Path, protected: &BTreeSet<PathBuf>) -> Result<SweepReport> {
    let keep: BTreeSet<OsString> = protected
        .iter()
        .filter_map(|path| path.file_stem().map(OsString::from))
        .collect();
    let entries = match fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(SweepReport::default()),
        Err(err) => {
            return Err(WorkflowError::io(
                format!("read {}", output_dir.display()),
                err,
            ))
        }
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| WorkflowError::io(format!("read {}", output_dir.display()), err))?
            .path();
        let Some(stem) = path.file_stem().map(OsString::from) else {
            continue;
        };
        if keep.contains(&stem) {
            continue;
        }
        let is_descriptor = has_extension(&path, DIMAP_EXTENSION) && !path.is_dir();
        let is_data_dir = has_extension(&path, DIMAP_DATA_EXTENSION) && path.is_dir();
        if is_descriptor || is_data_dir {
            candidates.push(path);
        }
    }
    candidates.sort();

    let mut report = SweepReport::default();
    for path in candidates {
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match removed {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed intermediate");
                report.removed.push(path);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(WorkflowError::io(
                    format!("remove {}", path.display()),
                    err,
                ))
            }
        }
    }
    tracing::info!(
        output_dir = %output_dir.display(),
        removed = report.removed.len(),
        kept = keep.len(),
        "cleanup complete"
    );
    Ok(report)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
