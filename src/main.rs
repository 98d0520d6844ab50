use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

mod args;
mod batch;
mod catalog;
mod cleanup;
mod cli;
mod config;
mod error;
mod graphs;
mod namespace;
mod runner;
mod scene;
mod workflow;

use crate::args::InvocationSummary;
use crate::batch::{expand, list_inputs, run_batch, write_manifest, WindowMode};
use crate::cli::{
    BatchArgs, CleanArgs, Command, ExpandArgs, PairsArgs, PlanArgs, RootArgs, RunArgs, ToolArgs,
    WorkflowArgs,
};
use crate::config::load_config;
use crate::runner::{PreviewRunner, ProcessRunner, ToolPaths};
use crate::workflow::{run_workflow, RunSettings, WorkflowOutcome};

fn main() -> Result<()> {
    let RootArgs {
        tools,
        verbose,
        command,
    } = RootArgs::parse();
    init_tracing(verbose);

    match command {
        Command::Run(args) => cmd_run(args, &tools),
        Command::Plan(args) => cmd_plan(args, &tools),
        Command::Batch(args) => cmd_batch(args, &tools),
        Command::Pairs(args) => cmd_pairs(args, &tools),
        Command::Clean(args) => cmd_clean(args),
    }
}

/// Human-readable events on stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "snapflow=debug,info"
    } else {
        "snapflow=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn tool_paths(tools: &ToolArgs) -> ToolPaths {
    ToolPaths {
        gpt: tools.gpt.clone(),
        snaphu: tools.snaphu.clone(),
    }
}

fn run_settings(workflow: &WorkflowArgs, tools: &ToolArgs) -> RunSettings {
    RunSettings::new(workflow.output_dir.clone(), workflow.platform.clone())
        .with_graphs_dir(tools.graphs_dir.clone())
}

fn ensure_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create output dir {}", path.display()))
}

fn print_commands(recorded: &[InvocationSummary]) {
    for summary in recorded {
        println!("{}", summary.command);
    }
}

fn cmd_run(args: RunArgs, tools: &ToolArgs) -> Result<()> {
    let config = load_config(&args.workflow.config)?;
    let settings = run_settings(&args.workflow, tools);
    if args.dry_run {
        let mut runner = PreviewRunner::new(tool_paths(tools));
        let outcome = run_workflow(&config, &settings, &mut runner)?;
        print_commands(runner.recorded());
        println!("{}", outcome.final_output.display());
        return Ok(());
    }

    ensure_output_dir(&settings.output_dir)?;
    let mut runner = ProcessRunner::new(tool_paths(tools));
    let outcome = run_workflow(&config, &settings, &mut runner)
        .with_context(|| format!("run workflow {}", args.workflow.config.display()))?;
    println!("{}", outcome.final_output.display());
    Ok(())
}

#[derive(Serialize)]
struct PlanReport<'a> {
    invocations: &'a [InvocationSummary],
    outcome: &'a WorkflowOutcome,
}

fn cmd_plan(args: PlanArgs, tools: &ToolArgs) -> Result<()> {
    let config = load_config(&args.workflow.config)?;
    let settings = run_settings(&args.workflow, tools);
    let mut runner = PreviewRunner::new(tool_paths(tools));
    let outcome = run_workflow(&config, &settings, &mut runner)
        .with_context(|| format!("plan workflow {}", args.workflow.config.display()))?;

    if args.json {
        let report = PlanReport {
            invocations: runner.recorded(),
            outcome: &outcome,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_commands(runner.recorded());
    println!("final output: {}", outcome.final_output.display());
    Ok(())
}

fn cmd_batch(args: BatchArgs, tools: &ToolArgs) -> Result<()> {
    run_expanded(
        args.expand,
        WindowMode::Batch {
            stride: args.stride,
        },
        tools,
    )
}

fn cmd_pairs(args: PairsArgs, tools: &ToolArgs) -> Result<()> {
    run_expanded(args.expand, WindowMode::Pairs, tools)
}

fn run_expanded(args: ExpandArgs, mode: WindowMode, tools: &ToolArgs) -> Result<()> {
    let template = load_config(&args.workflow.config)?;
    let inputs = list_inputs(&args.input_dir, &args.pattern)?;
    let instances = expand(&template, &inputs, &args.insertion_points, mode)?;
    if instances.is_empty() {
        tracing::warn!(
            inputs = inputs.len(),
            pattern = %args.pattern,
            "no complete input window; nothing to run"
        );
    }
    if let Some(manifest) = &args.manifest {
        write_manifest(manifest, &instances)?;
        tracing::info!(path = %manifest.display(), "wrote batch manifest");
    }

    let settings = run_settings(&args.workflow, tools);
    if args.dry_run {
        let mut runner = PreviewRunner::new(tool_paths(tools));
        let outcome = run_batch(&instances, &settings, &mut runner)?;
        print_commands(runner.recorded());
        for path in &outcome.protected {
            println!("{}", path.display());
        }
        return Ok(());
    }

    ensure_output_dir(&settings.output_dir)?;
    let mut runner = ProcessRunner::new(tool_paths(tools));
    let outcome = run_batch(&instances, &settings, &mut runner).context("batch aborted")?;
    if !args.no_cleanup {
        cleanup::sweep(&settings.output_dir, &outcome.retained())?;
    }
    for path in &outcome.protected {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_clean(args: CleanArgs) -> Result<()> {
    let protected: BTreeSet<_> = args.keep.into_iter().collect();
    let report = cleanup::sweep(&args.output_dir, &protected)?;
    for path in &report.removed {
        let shown = path.strip_prefix(&args.output_dir).unwrap_or(path);
        println!("removed {}", shown.display());
    }
    Ok(())
}
