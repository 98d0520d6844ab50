//! Scene acquisition-time discovery.
//!
//! Reads the scene start time from a DIMAP product descriptor, or from the
//! manifest inside a platform source archive.
use crate::error::{Result, WorkflowError};
use crate::namespace::is_symbolic;
use chrono::NaiveDateTime;
use std::convert::Infallible;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// Product descriptor extension.
pub const DIMAP_EXTENSION: &str = "dim";
/// Data directory extension paired with each descriptor.
pub const DIMAP_DATA_EXTENSION: &str = "data";

const DIMAP_START_TIME: &str = "PRODUCT_SCENE_RASTER_START_TIME";
const SAFE_MANIFEST: &str = "manifest.safe";
const SAFE_NAMESPACE: &str = "http://www.esa.int/safe/sentinel-1.0";
const SAFE_START_TIME: &str = "startTime";
const MANIFEST_SCRATCH_PREFIX: &str = "snapflow-manifest-";

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const LEGACY_FORMAT: &str = "%d-%b-%Y %H:%M:%S%.f";

/// Acquisition platform; decides how source archives are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Sentinel1,
    Other(String),
}

impl FromStr for Platform {
    type Err = Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Ok(match normalized.as_str() {
            "SENTINEL-1" | "SENTINEL1" => Platform::Sentinel1,
            _ => Platform::Other(normalized),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Sentinel1 => f.write_str("SENTINEL-1"),
            Platform::Other(name) => f.write_str(name),
        }
    }
}

/// Scene start time for a product reference.
///
/// Symbolic references are not resolved here and yield `None`: the product
/// they name may not exist yet at this point of a run.
pub fn acquisition_time(platform: &Platform, path: &Path) -> Result<Option<NaiveDateTime>> {
    if is_symbolic(&path.to_string_lossy()) {
        return Ok(None);
    }
    let is_dimap = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DIMAP_EXTENSION));
    let time = if is_dimap {
        dimap_start_time(path)?
    } else {
        match platform {
            Platform::Sentinel1 => safe_archive_start_time(&std::env::temp_dir(), path)?,
            Platform::Other(name) => return Err(WorkflowError::UnsupportedPlatform(name.clone())),
        }
    };
    tracing::debug!(path = %path.display(), %time, "scene acquisition time");
    Ok(Some(time))
}

/// Parse either the ISO-like or the legacy `DD-Mon-YYYY` timestamp form.
pub fn parse_scene_time(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    let format = if text.contains('T') {
        ISO_FORMAT
    } else {
        LEGACY_FORMAT
    };
    NaiveDateTime::parse_from_str(text, format).map_err(|source| WorkflowError::InvalidTimestamp {
        value: text.to_string(),
        source,
    })
}

/// `YYYYMMDD` form used in output names.
pub fn date_label(time: &NaiveDateTime) -> String {
    time.format("%Y%m%d").to_string()
}

fn dimap_start_time(path: &Path) -> Result<NaiveDateTime> {
    let text = fs::read_to_string(path)
        .map_err(|err| WorkflowError::io(format!("read {}", path.display()), err))?;
    let doc = parse_xml(&text, path)?;
    let value = doc
        .descendants()
        .find(|node| node.has_tag_name(DIMAP_START_TIME))
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| WorkflowError::MetadataFieldMissing {
            field: DIMAP_START_TIME,
            path: path.to_path_buf(),
        })?;
    parse_scene_time(value)
}

/// Reads the archive's manifest through a scratch dir created under `scratch_root`.
fn safe_archive_start_time(scratch_root: &Path, archive_path: &Path) -> Result<NaiveDateTime> {
    let archive_err = |source: zip::result::ZipError| WorkflowError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };
    let file = fs::File::open(archive_path)
        .map_err(|err| WorkflowError::io(format!("open {}", archive_path.display()), err))?;
    let mut archive = zip::ZipArchive::new(file).map_err(archive_err)?;
    let entry_name = archive
        .file_names()
        .filter(|name| name.ends_with(SAFE_MANIFEST))
        .min_by_key(|name| name.len())
        .map(str::to_owned)
        .ok_or_else(|| WorkflowError::MetadataFieldMissing {
            field: SAFE_MANIFEST,
            path: archive_path.to_path_buf(),
        })?;

    // Dropping the scratch dir removes the extracted manifest on every path out.
    let scratch = tempfile::Builder::new()
        .prefix(MANIFEST_SCRATCH_PREFIX)
        .tempdir_in(scratch_root)
        .map_err(|err| WorkflowError::io("create manifest scratch dir", err))?;
    let extracted = scratch.path().join(SAFE_MANIFEST);
    {
        let mut entry = archive.by_name(&entry_name).map_err(archive_err)?;
        let mut out = fs::File::create(&extracted)
            .map_err(|err| WorkflowError::io(format!("create {}", extracted.display()), err))?;
        io::copy(&mut entry, &mut out)
            .map_err(|err| WorkflowError::io(format!("extract {entry_name}"), err))?;
    }
    let text = fs::read_to_string(&extracted)
        .map_err(|err| WorkflowError::io(format!("read {}", extracted.display()), err))?;
    safe_manifest_start_time(&text, archive_path)
}

fn safe_manifest_start_time(text: &str, origin: &Path) -> Result<NaiveDateTime> {
    let doc = parse_xml(text, origin)?;
    let value = doc
        .descendants()
        .find(|node| node.has_tag_name((SAFE_NAMESPACE, SAFE_START_TIME)))
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| WorkflowError::MetadataFieldMissing {
            field: SAFE_START_TIME,
            path: origin.to_path_buf(),
        })?;
    NaiveDateTime::parse_from_str(value, ISO_FORMAT).map_err(|source| {
        WorkflowError::InvalidTimestamp {
            value: value.to_string(),
            source,
        }
    })
}

fn parse_xml<'a>(text: &'a str, path: &Path) -> Result<roxmltree::Document<'a>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(text, options).map_err(|source| WorkflowError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
