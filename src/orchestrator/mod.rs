//! The run controller: a forward-only cursor over the configured workflow.
//!
//! Every step ends in exactly one terminal state (accepted, force-accepted,
//! errored, or skipped) and the cursor then advances. A run never rewinds
//! and never aborts because of a bad step; a finished run always leaves a
//! complete audit trail behind.

pub mod runner;

use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::audit::logger::write_artifact;
use crate::audit::{ArtifactRecord, EventLog};
use crate::config::Config;
use crate::context::{ArtifactStore, RunContext};
use crate::hitl::HumanGate;
use crate::registry::StepRegistry;
use crate::standards::{StandardsBundle, summarize_understanding};
use crate::validate::Validator;

pub use runner::{StepOutcome, StepRunner};

/// Terminal state of one workflow position, for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Accepted,
    ForceAccepted,
    Errored,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: String,
    pub status: StepStatus,
    pub final_score: Option<f64>,
    pub attempts: u32,
    pub execution_time: f64,
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub run_dir: std::path::PathBuf,
    pub reports: Vec<StepReport>,
}

impl RunSummary {
    pub fn accepted_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == StepStatus::Accepted)
            .count()
    }
}

/// Fresh run identifier: timestamp plus a short random suffix so that runs
/// started within the same second never collide.
pub fn new_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "run_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..4]
    )
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    registry: &'a StepRegistry,
    human: &'a mut dyn HumanGate,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a StepRegistry,
        human: &'a mut dyn HumanGate,
    ) -> Self {
        Self {
            config,
            registry,
            human,
        }
    }

    /// Execute the configured workflow over `input` and return the summary.
    pub fn run(&mut self, input: Value, bundle: StandardsBundle) -> Result<RunSummary> {
        let run_id = new_run_id();
        let run_dir = self.config.artifacts_root.join(&run_id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create run directory: {}", run_dir.display()))?;

        let validator = Validator::from_schemas(&bundle.schemas)
            .context("Failed to compile schema contracts")?;
        let mut ctx = RunContext::new(run_id.clone(), input, bundle, run_dir.clone());

        // Written before any step runs so a reviewer can audit what the run
        // believed it was doing, even if every step later fails.
        fs::write(
            run_dir.join("step_00_understanding.md"),
            summarize_understanding(&ctx, &self.config.workflow_steps),
        )
        .context("Failed to write understanding summary")?;

        let events = EventLog::new(&run_dir);
        events.log("RUN_START", json!({"run_id": run_id}))?;
        tracing::info!(%run_id, steps = self.config.workflow_steps.len(), "run started");

        let mut artifacts = ArtifactStore::new();
        let mut runner = StepRunner::new(self.config, &validator, &mut *self.human, &events);
        let mut reports = Vec::with_capacity(self.config.workflow_steps.len());
        let total = self.config.workflow_steps.len();

        for (index, step_name) in self.config.workflow_steps.iter().enumerate() {
            println!(
                "{} [{}/{}] {}",
                console::style("▶").cyan(),
                index + 1,
                total,
                console::style(step_name).bold()
            );

            let step = match self.registry.resolve(step_name) {
                Ok(step) => step,
                Err(error) => {
                    // Unknown step names never abort the run: log once,
                    // advance, and report zero attempts.
                    tracing::error!(step = %step_name, %error, "step not registered, skipping");
                    events.log(
                        format!("{step_name}_SKIPPED"),
                        json!({"error": error.to_string()}),
                    )?;
                    reports.push(StepReport {
                        step: step_name.clone(),
                        status: StepStatus::Skipped,
                        final_score: None,
                        attempts: 0,
                        execution_time: 0.0,
                    });
                    continue;
                }
            };

            ctx.begin_step(step_name);
            let started = Instant::now();
            let outcome = runner.run_step(step, &mut ctx, &artifacts);
            let execution_time = started.elapsed().as_secs_f64();

            let report = match outcome {
                StepOutcome::Accepted {
                    result,
                    final_score,
                    attempts,
                } => {
                    if let Some(target) = &result.rollback_to {
                        // Recorded for audit; the cursor is forward-only.
                        tracing::warn!(step = %step_name, target, "rollback requested, ignoring");
                        events.log(
                            format!("{step_name}_ROLLBACK_REQUESTED"),
                            json!({"target": target}),
                        )?;
                    }
                    artifacts.insert(step_name, result.data.clone());
                    let record = ArtifactRecord::new(step_name, &result, execution_time);
                    write_artifact(&run_dir, step_name, &record)?;
                    events.log(
                        format!("{step_name}_SUCCESS"),
                        serde_json::to_value(&result)?,
                    )?;
                    tracing::info!(step = %step_name, final_score, attempts, "step accepted");
                    StepReport {
                        step: step_name.clone(),
                        status: StepStatus::Accepted,
                        final_score: Some(final_score),
                        attempts,
                        execution_time,
                    }
                }
                StepOutcome::ForceAccepted {
                    result,
                    final_score,
                    attempts,
                    reason,
                } => {
                    // Best-effort artifact: downstream steps may still use
                    // it, but the `_FAILED` marker flags it for triage.
                    artifacts.insert(step_name, result.data.clone());
                    let record = ArtifactRecord::new(step_name, &result, execution_time);
                    write_artifact(&run_dir, &format!("{step_name}_FAILED"), &record)?;
                    events.log(
                        format!("{step_name}_FAIL"),
                        json!({
                            "result": serde_json::to_value(&result)?,
                            "reason": reason,
                        }),
                    )?;
                    tracing::warn!(
                        step = %step_name,
                        final_score,
                        attempts,
                        "retry budget exhausted, force-accepting"
                    );
                    StepReport {
                        step: step_name.clone(),
                        status: StepStatus::ForceAccepted,
                        final_score: Some(final_score),
                        attempts,
                        execution_time,
                    }
                }
                StepOutcome::Errored {
                    attempts,
                    last_error,
                } => {
                    // Per-attempt error events are already in the log; no
                    // artifact is persisted and no store entry is made.
                    tracing::error!(step = %step_name, attempts, %last_error, "step errored out");
                    StepReport {
                        step: step_name.clone(),
                        status: StepStatus::Errored,
                        final_score: None,
                        attempts,
                        execution_time,
                    }
                }
            };
            reports.push(report);
        }

        events.log(
            "RUN_COMPLETE",
            json!({
                "run_id": run_id,
                "accepted": reports
                    .iter()
                    .filter(|r| r.status == StepStatus::Accepted)
                    .count(),
                "total": total,
            }),
        )?;
        tracing::info!(%run_id, "run complete");

        Ok(RunSummary {
            run_id,
            run_dir,
            reports,
        })
    }
}
