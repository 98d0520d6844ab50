use super::*;
use crate::args::ResolvedInvocation;
use crate::config::{GroupConfig, ProcessingStep, SourceSpec};
use crate::runner::{PreviewRunner, ToolPaths};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Runner that fails on one operator and counts what it was asked to run.
struct FailOn {
    operator: &'static str,
    ran: Vec<String>,
}

impl ToolRunner for FailOn {
    fn run_tool(&mut self, invocation: &ResolvedInvocation) -> Result<()> {
        self.ran.push(invocation.operator.id().to_string());
        if invocation.operator.id() == self.operator {
            return Err(WorkflowError::ExternalToolFailed {
                tool: "gpt".to_string(),
                status: "1".to_string(),
            });
        }
        Ok(())
    }

    fn run_unwrap(&mut self, _: &ResolvedInvocation, export_dir: &Path) -> Result<PathBuf> {
        Ok(export_dir.join("UnwPhase.snaphu.hdr"))
    }
}

fn chained_config(dir: &Path) -> WorkflowConfig {
    let scene = dir.join("scene.dim");
    fs::write(
        &scene,
        "<Dimap_Document><PRODUCT_SCENE_RASTER_START_TIME>23-JUN-2022 05:47:12.000000</PRODUCT_SCENE_RASTER_START_TIME></Dimap_Document>",
    )
    .expect("write scene");
    let step = |operator: &str, source: Option<&str>| ProcessingStep {
        operator: operator.to_string(),
        source: source.map(|source| SourceSpec::One(source.to_string())),
        parameters: BTreeMap::new(),
        output_basename: None,
    };
    WorkflowConfig {
        sources: BTreeMap::from([("scene".to_string(), scene.display().to_string())]),
        groups: vec![
            GroupConfig {
                name: "primary".to_string(),
                steps: vec![
                    step("Apply-Orbit-File", Some("$scene")),
                    step("TOPSAR-Deburst", None),
                ],
            },
            GroupConfig {
                name: "terrain".to_string(),
                steps: vec![step("Terrain-Correction", Some("$primary"))],
            },
        ],
    }
}

#[test]
fn groups_run_in_declaration_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = chained_config(dir.path());
    let out = dir.path().join("out");
    let settings = RunSettings::new(out.clone(), Platform::Sentinel1);
    let mut runner = PreviewRunner::new(ToolPaths::default());

    let outcome = run_workflow(&config, &settings, &mut runner).expect("run");
    assert_eq!(outcome.final_output, out.join("20220623_TC.dim"));
    assert_eq!(
        outcome.group_outputs,
        vec![
            ("primary".to_string(), out.join("20220623_Orb_Deb.dim")),
            ("terrain".to_string(), out.join("20220623_TC.dim")),
        ]
    );
    let operators: Vec<&str> = runner
        .recorded()
        .iter()
        .map(|summary| summary.operator.as_str())
        .collect();
    assert_eq!(
        operators,
        vec!["Apply-Orbit-File", "TOPSAR-Deburst", "Terrain-Correction"]
    );
}

#[test]
fn tool_failure_stops_the_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = chained_config(dir.path());
    let settings = RunSettings::new(dir.path().join("out"), Platform::Sentinel1);
    let mut runner = FailOn {
        operator: "TOPSAR-Deburst",
        ran: Vec::new(),
    };
    let err = run_workflow(&config, &settings, &mut runner).expect_err("tool fails");
    assert!(matches!(err, WorkflowError::ExternalToolFailed { .. }));
    assert_eq!(runner.ran, vec!["Apply-Orbit-File", "TOPSAR-Deburst"]);
}

#[test]
fn workflow_without_groups_fails() {
    let config = WorkflowConfig {
        sources: BTreeMap::new(),
        groups: Vec::new(),
    };
    let settings = RunSettings::new(PathBuf::from("/out"), Platform::Sentinel1);
    let mut runner = PreviewRunner::new(ToolPaths::default());
    let err = run_workflow(&config, &settings, &mut runner).expect_err("no groups");
    assert!(matches!(err, WorkflowError::EmptyWorkflow));
}

#[test]
fn graphs_dir_override() {
    let settings = RunSettings::new(PathBuf::from("/out"), Platform::Sentinel1)
        .with_graphs_dir(Some(PathBuf::from("/graphs")));
    assert_eq!(
        settings.graphs.path(crate::graphs::GraphId::Subset),
        PathBuf::from("/graphs/subset.xml")
    );
    let default = RunSettings::new(PathBuf::from("/out"), Platform::Sentinel1).with_graphs_dir(None);
    assert_eq!(
        default.graphs.path(crate::graphs::GraphId::Subset),
        PathBuf::from("/out/.graphs/subset.xml")
    );
}
