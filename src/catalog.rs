//! Operator catalog.
//!
//! A closed allow-list of processing operators, each carrying its source
//! convention, default output suffix, and dispatch target. Identifiers outside
//! the list are rejected rather than passed through to the processing tool.
use crate::config::ParamValue;
use crate::error::{Result, WorkflowError};
use crate::graphs::GraphId;
use std::collections::BTreeMap;
use std::fmt;

/// Parameter of the export operator naming the unwrap working directory.
pub const EXPORT_FOLDER_PARAM: &str = "targetFolder";

/// How an operator receives its source products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceConvention {
    /// `-<flag>="<path>"`; indexed `-<flag>N=...` when there are several.
    Flag(&'static str),
    /// Bare space-separated paths.
    Positional,
    /// Wrapped and unwrapped phase artifacts from earlier in the group,
    /// passed as named parameters instead of sources.
    UpstreamPhases,
}

/// Rule for the token appended to the output filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixRule {
    Fixed(&'static str),
    /// No suffix; the operator's real output is a directory.
    Empty,
    /// Suffix is the value of a parameter.
    FromParameter { name: &'static str, required: bool },
}

/// Where a resolved step is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Processing tool by operator name with `-t "<target>"`.
    Operator,
    /// Processing tool by operator name, writing into a folder parameter.
    FolderExport { folder_param: &'static str },
    /// Processing tool with an embedded graph file and `-PoutputFile`.
    Graph(GraphId),
    /// External unwrap tool.
    Unwrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub source: SourceConvention,
    pub suffix: SuffixRule,
    pub dispatch: Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    ApplyOrbitFile,
    BackGeocoding,
    BandSelect,
    Coherence,
    GoldsteinPhaseFiltering,
    ImportVector,
    Interferogram,
    LandSeaMask,
    Multilook,
    SnaphuExport,
    SnaphuImport,
    SnaphuUnwrapping,
    Subset,
    TerrainCorrection,
    TopoPhaseRemoval,
    TopsarDeburst,
    TopsarSplit,
}

impl Operator {
    pub const ALL: [Operator; 17] = [
        Operator::ApplyOrbitFile,
        Operator::BackGeocoding,
        Operator::BandSelect,
        Operator::Coherence,
        Operator::GoldsteinPhaseFiltering,
        Operator::ImportVector,
        Operator::Interferogram,
        Operator::LandSeaMask,
        Operator::Multilook,
        Operator::SnaphuExport,
        Operator::SnaphuImport,
        Operator::SnaphuUnwrapping,
        Operator::Subset,
        Operator::TerrainCorrection,
        Operator::TopoPhaseRemoval,
        Operator::TopsarDeburst,
        Operator::TopsarSplit,
    ];

    /// Identifier as written in configuration and understood by the tool.
    pub fn id(self) -> &'static str {
        match self {
            Operator::ApplyOrbitFile => "Apply-Orbit-File",
            Operator::BackGeocoding => "Back-Geocoding",
            Operator::BandSelect => "BandSelect",
            Operator::Coherence => "Coherence",
            Operator::GoldsteinPhaseFiltering => "GoldsteinPhaseFiltering",
            Operator::ImportVector => "Import-Vector",
            Operator::Interferogram => "Interferogram",
            Operator::LandSeaMask => "Land-Sea-Mask",
            Operator::Multilook => "Multilook",
            Operator::SnaphuExport => "SnaphuExport",
            Operator::SnaphuImport => "SnaphuImport",
            Operator::SnaphuUnwrapping => "SnaphuUnwrapping",
            Operator::Subset => "Subset",
            Operator::TerrainCorrection => "Terrain-Correction",
            Operator::TopoPhaseRemoval => "TopoPhaseRemoval",
            Operator::TopsarDeburst => "TOPSAR-Deburst",
            Operator::TopsarSplit => "TOPSAR-Split",
        }
    }

    pub fn from_id(id: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|operator| operator.id() == id)
            .ok_or_else(|| WorkflowError::UnknownOperator(id.to_string()))
    }

    /// Two-scene co-registration; its output is named by a date range.
    pub fn is_coregistration(self) -> bool {
        self == Operator::BackGeocoding
    }

    pub fn spec(self) -> OperatorSpec {
        use SourceConvention::{Flag, Positional, UpstreamPhases};
        let source = match self {
            Operator::BackGeocoding => Positional,
            Operator::Interferogram
            | Operator::TopoPhaseRemoval
            | Operator::GoldsteinPhaseFiltering => Flag("SsourceProduct"),
            Operator::Subset => Flag("PinputFile"),
            Operator::SnaphuImport => UpstreamPhases,
            _ => Flag("Ssource"),
        };
        let suffix = match self {
            Operator::TopsarSplit => SuffixRule::FromParameter {
                name: "subswath",
                required: true,
            },
            Operator::BandSelect => SuffixRule::FromParameter {
                name: "sourceBands",
                required: true,
            },
            Operator::SnaphuExport | Operator::SnaphuUnwrapping => SuffixRule::Empty,
            Operator::ApplyOrbitFile => SuffixRule::Fixed("Orb"),
            Operator::BackGeocoding => SuffixRule::Fixed("Stack"),
            Operator::Interferogram => SuffixRule::Fixed("Ifg"),
            Operator::TopsarDeburst => SuffixRule::Fixed("Deb"),
            Operator::TopoPhaseRemoval => SuffixRule::Fixed("Topo"),
            Operator::Coherence => SuffixRule::Fixed("Coh"),
            Operator::Multilook => SuffixRule::Fixed("ML"),
            Operator::GoldsteinPhaseFiltering => SuffixRule::Fixed("Flt"),
            Operator::Subset => SuffixRule::Fixed("Subset"),
            Operator::TerrainCorrection => SuffixRule::Fixed("TC"),
            Operator::SnaphuImport => SuffixRule::Fixed("Unw"),
            Operator::ImportVector => SuffixRule::Fixed("Vec"),
            Operator::LandSeaMask => SuffixRule::Fixed("Msk"),
        };
        let dispatch = match self {
            Operator::Subset => Dispatch::Graph(GraphId::Subset),
            Operator::SnaphuImport => Dispatch::Graph(GraphId::PhaseImport),
            Operator::SnaphuExport => Dispatch::FolderExport {
                folder_param: EXPORT_FOLDER_PARAM,
            },
            Operator::SnaphuUnwrapping => Dispatch::Unwrap,
            _ => Dispatch::Operator,
        };
        OperatorSpec {
            source,
            suffix,
            dispatch,
        }
    }

    /// Suffix for this operator given the step's parameters.
    pub fn suffix(self, params: &BTreeMap<String, ParamValue>) -> Result<String> {
        match self.spec().suffix {
            SuffixRule::Fixed(suffix) => Ok(suffix.to_string()),
            SuffixRule::Empty => Ok(String::new()),
            SuffixRule::FromParameter { name, required } => {
                let value = params
                    .get(name)
                    .map(ToString::to_string)
                    .filter(|value| !value.is_empty());
                match value {
                    Some(value) => Ok(value),
                    None if required => Err(WorkflowError::MissingRequiredParameter {
                        operator: self.id().to_string(),
                        parameter: name.to_string(),
                    }),
                    None => Ok(String::new()),
                }
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
