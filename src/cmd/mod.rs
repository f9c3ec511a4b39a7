mod run;

pub use run::cmd_run;

use anyhow::{Context, Result, bail};
use console::style;
use serde_json::Value;
use std::path::Path;

use fieldwork::audit::EventLog;
use fieldwork::config::Config;
use fieldwork::standards::load_contract_schemas;
use fieldwork::steps::catalog;
use fieldwork::validate::Validator;

use crate::Cli;

/// `fieldwork list` - builtin steps and the configured workflow.
pub fn cmd_list(cli: &Cli, project_dir: &Path) -> Result<()> {
    let config = Config::from_env(project_dir.to_path_buf(), cli.verbose, cli.yes)?;
    let builtin = catalog::step_names();

    println!("{}", style("Builtin steps:").bold());
    for name in &builtin {
        println!("  {name}");
    }

    println!("\n{}", style("Configured workflow:").bold());
    for (i, step) in config.workflow_steps.iter().enumerate() {
        let mut markers = Vec::new();
        if !builtin.contains(&step.as_str()) {
            markers.push("unregistered");
        }
        if config.critical_steps.contains(step) {
            markers.push("critical");
        }
        let suffix = if markers.is_empty() {
            String::new()
        } else {
            format!(" ({})", markers.join(", "))
        };
        println!("  {}. {step}{suffix}", i + 1);
    }
    Ok(())
}

/// `fieldwork validate <step> <artifact>` - run the validation stack against
/// an artifact file without executing anything.
pub fn cmd_validate(cli: &Cli, project_dir: &Path, step: &str, artifact: &Path) -> Result<()> {
    let config = Config::from_env(project_dir.to_path_buf(), cli.verbose, cli.yes)?;
    let schemas = load_contract_schemas(&config.contracts_dir)?;
    let validator = Validator::from_schemas(&schemas)?;

    let raw = std::fs::read_to_string(artifact)
        .with_context(|| format!("Failed to read artifact file: {}", artifact.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse artifact JSON: {}", artifact.display()))?;

    // Accept both a raw payload and a persisted artifact record.
    let data = match &parsed {
        Value::Object(map) if map.contains_key("step_name") && map.contains_key("data") => {
            &map["data"]
        }
        other => other,
    };

    let validation = validator.validate(step, data);
    let has_schema = validator.has_schema(step);

    println!("{} {}", style("Step:").bold(), step);
    println!(
        "{} {}",
        style("Schema contract:").bold(),
        if has_schema { "registered" } else { "none" }
    );
    println!(
        "{} {:.2}",
        style("Schema score:").bold(),
        validation.schema_score
    );
    println!(
        "{} {:.2}",
        style("Checklist score:").bold(),
        validation.checklist_score
    );
    println!("{} {}", style("Notes:").bold(), validation.notes);

    if validation.schema_score < 1.0 || validation.checklist_score < 1.0 {
        bail!("Artifact does not fully satisfy the contract for {step}");
    }
    println!("{}", style("OK").green().bold());
    Ok(())
}

/// `fieldwork audit <run_id>` - print the event log of a previous run.
pub fn cmd_audit(cli: &Cli, project_dir: &Path, run_id: &str) -> Result<()> {
    let config = Config::from_env(project_dir.to_path_buf(), cli.verbose, cli.yes)?;
    let run_dir = config.artifacts_root.join(run_id);
    if !run_dir.exists() {
        bail!("No run directory found: {}", run_dir.display());
    }

    let events = EventLog::new(&run_dir).read_events()?;
    if events.is_empty() {
        println!("No events recorded for {run_id}");
        return Ok(());
    }

    for event in &events {
        println!(
            "{}  {}  {}",
            style(event.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            style(&event.event).bold(),
            event.data
        );
    }
    println!("\n{} events", events.len());
    Ok(())
}
