//! Human-in-the-loop approval boundary.
//!
//! The orchestration logic only sees the [`HumanGate`] trait; the console
//! implementation owns all terminal I/O, and scripted doubles replace it in
//! tests and unattended runs.

use anyhow::Result;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use serde_json::Value;

/// A human's decision on a held artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub approved: bool,
    /// Free-text feedback, collected on rejection and fed into reflection.
    pub feedback: Option<String>,
}

impl Approval {
    pub fn approved() -> Self {
        Self {
            approved: true,
            feedback: None,
        }
    }

    pub fn rejected(feedback: impl Into<String>) -> Self {
        Self {
            approved: false,
            feedback: Some(feedback.into()),
        }
    }
}

/// Presents an artifact for review and records the decision.
pub trait HumanGate {
    fn review(&mut self, step_name: &str, reason: &str, artifact: &Value) -> Result<Approval>;
}

/// Interactive console gate. Blocks the run until the reviewer responds;
/// there is no timeout and no cancellation path.
pub struct ConsoleGate;

impl HumanGate for ConsoleGate {
    fn review(&mut self, step_name: &str, reason: &str, artifact: &Value) -> Result<Approval> {
        println!(
            "{} [HITL] Approval required for {}: {}",
            console::style("●").yellow(),
            console::style(step_name).bold(),
            reason
        );
        println!("{}", serde_json::to_string_pretty(artifact)?);

        let approved = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Approve this result?")
            .default(true)
            .interact()?;

        if approved {
            return Ok(Approval::approved());
        }

        let feedback: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Please provide brief feedback for reflection")
            .allow_empty(true)
            .interact_text()?;
        Ok(Approval::rejected(feedback))
    }
}

/// Gate that approves everything. Used for `--yes` and unattended runs.
pub struct AutoApproveGate;

impl HumanGate for AutoApproveGate {
    fn review(&mut self, step_name: &str, reason: &str, _artifact: &Value) -> Result<Approval> {
        tracing::info!(step = step_name, reason, "auto-approving HITL checkpoint");
        Ok(Approval::approved())
    }
}
