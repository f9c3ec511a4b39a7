use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;
use std::sync::Arc;

use fieldwork::config::Config;
use fieldwork::hitl::{AutoApproveGate, ConsoleGate, HumanGate};
use fieldwork::llm::OpenAiClient;
use fieldwork::orchestrator::{Orchestrator, StepStatus};
use fieldwork::registry::StepRegistry;
use fieldwork::standards::StandardsBundle;
use fieldwork::steps::catalog::register_builtin;

use crate::Cli;

/// `fieldwork run <input.json>` - execute the configured workflow.
pub fn cmd_run(cli: &Cli, project_dir: &Path, input_file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(input_file)
        .with_context(|| format!("Failed to read input file: {}", input_file.display()))?;
    let input: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse input JSON: {}", input_file.display()))?;

    let config = Config::from_env(project_dir.to_path_buf(), cli.verbose, cli.yes)?;
    config.ensure_directories()?;

    let Some(api_key) = config.api_key.as_deref() else {
        bail!("OPENAI_API_KEY is not set. Add it to the environment or a .env file.");
    };
    let client = Arc::new(OpenAiClient::new(
        &config.api_base,
        api_key,
        &config.model_name,
    )?);

    let mut registry = StepRegistry::new();
    register_builtin(&mut registry, client)?;

    let bundle = StandardsBundle::load(&config)?;
    if bundle.schemas.is_empty() {
        tracing::warn!(
            contracts_dir = %config.contracts_dir.display(),
            "no schema contracts loaded; schema validation will pass through"
        );
    }

    let mut gate: Box<dyn HumanGate> = if config.auto_approve {
        Box::new(AutoApproveGate)
    } else {
        Box::new(ConsoleGate)
    };

    let summary = Orchestrator::new(&config, &registry, gate.as_mut()).run(input, bundle)?;

    println!("\n{}", style("Run complete").bold());
    println!("  Run ID: {}", summary.run_id);
    println!("  Artifacts: {}", summary.run_dir.display());
    println!();
    for report in &summary.reports {
        let (icon, label) = match report.status {
            StepStatus::Accepted => (style("✓").green(), "accepted"),
            StepStatus::ForceAccepted => (style("!").yellow(), "force-accepted"),
            StepStatus::Errored => (style("✗").red(), "errored"),
            StepStatus::Skipped => (style("-").dim(), "skipped"),
        };
        let score = report
            .final_score
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {icon} {}  {label}  score={score}  attempts={}  {:.1}s",
            report.step, report.attempts, report.execution_time
        );
    }

    let accepted = summary.accepted_count();
    let total = summary.reports.len();
    if accepted == total {
        println!("\n{}", style(format!("{accepted}/{total} steps accepted")).green());
    } else {
        println!(
            "\n{}",
            style(format!("{accepted}/{total} steps accepted cleanly")).yellow()
        );
    }
    Ok(())
}
