//! CLI argument parsing for workflow runs.
//!
//! Each subcommand maps onto one engine entry point; the CLI only loads the
//! configuration and picks an execution backend.
use crate::scene::Platform;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "snapflow",
    version,
    about = "Run declarative SNAP processing workflows",
    after_help = "Examples:\n  snapflow plan --config ifg.toml --output-dir out\n  snapflow run --config ifg.toml --output-dir out\n  snapflow pairs --config ifg.toml --output-dir out --input-dir scenes --pattern 'S1*.zip' --insert primary --insert secondary\n  snapflow clean --output-dir out --keep out/20220623_20220701_Ifg.dim",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub tools: ToolArgs,

    /// Log debug events (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Plan(PlanArgs),
    Batch(BatchArgs),
    Pairs(PairsArgs),
    Clean(CleanArgs),
}

/// External tool locations shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// Processing tool executable
    #[arg(long, value_name = "PATH", default_value = "gpt", global = true)]
    pub gpt: PathBuf,

    /// Unwrap tool executable
    #[arg(long, value_name = "PATH", default_value = "snaphu", global = true)]
    pub snaphu: PathBuf,

    /// Directory for the embedded graph files (default: <output-dir>/.graphs)
    #[arg(long, value_name = "DIR", global = true)]
    pub graphs_dir: Option<PathBuf>,
}

/// Inputs common to every command that runs a workflow.
#[derive(Args, Debug, Clone)]
pub struct WorkflowArgs {
    /// Workflow configuration (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Acquisition platform of the source archives
    #[arg(long, value_name = "NAME", default_value = "SENTINEL-1")]
    pub platform: Platform,

    /// Directory receiving every product
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Run a workflow once")]
pub struct RunArgs {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    /// Print the resolved commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Show the commands a workflow would run")]
pub struct PlanArgs {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Inputs shared by batch and pair expansion.
#[derive(Args, Debug, Clone)]
pub struct ExpandArgs {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    /// Directory holding the input scenes
    #[arg(long, value_name = "DIR")]
    pub input_dir: PathBuf,

    /// File-name glob selecting inputs
    #[arg(long, value_name = "GLOB", default_value = "*.zip")]
    pub pattern: String,

    /// Group whose first step receives an input (repeat for wider windows)
    #[arg(long = "insert", value_name = "GROUP", required = true)]
    pub insertion_points: Vec<String>,

    /// Write the expanded instances to this JSON file before running
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Keep intermediate products after the batch
    #[arg(long)]
    pub no_cleanup: bool,

    /// Print the resolved commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run a workflow over windows of input scenes")]
pub struct BatchArgs {
    #[command(flatten)]
    pub expand: ExpandArgs,

    /// Inputs to advance between windows (default: window size)
    #[arg(long, value_name = "N")]
    pub stride: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(about = "Run a workflow over consecutive input pairs")]
pub struct PairsArgs {
    #[command(flatten)]
    pub expand: ExpandArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Remove intermediate products from an output directory")]
pub struct CleanArgs {
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Product to keep (repeatable)
    #[arg(long, value_name = "PATH")]
    pub keep: Vec<PathBuf>,
}
