use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "fieldwork")]
#[command(version, about = "LLM-driven customer discovery orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Auto-approve every human-in-the-loop checkpoint
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute the configured workflow over an input brief
    Run {
        /// Path to the JSON task input (product brief)
        input: PathBuf,
    },
    /// List registered steps and the configured workflow
    List,
    /// Validate an artifact file against a step's contract and checklist
    Validate {
        /// Step name whose contract applies
        step: String,
        /// Path to the artifact JSON (raw payload or persisted record)
        artifact: PathBuf,
    },
    /// Show the event log of a previous run
    Audit {
        /// Run identifier (directory name under the artifacts root)
        run_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Run { input } => cmd::cmd_run(&cli, &project_dir, input)?,
        Commands::List => cmd::cmd_list(&cli, &project_dir)?,
        Commands::Validate { step, artifact } => {
            cmd::cmd_validate(&cli, &project_dir, step, artifact)?
        }
        Commands::Audit { run_id } => cmd::cmd_audit(&cli, &project_dir, run_id)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_directive = if verbose { "fieldwork=debug" } else { "fieldwork=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
