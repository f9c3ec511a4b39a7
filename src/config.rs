//! Runtime configuration for fieldwork.
//!
//! One explicit `Config` value is constructed at process start and passed by
//! reference into the orchestrator. There is no ambient global state, so
//! unit tests build their own configurations.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default ordered workflow: AJTBD discovery from scratch.
pub const DEFAULT_WORKFLOW: &[&str] = &[
    "step_02a_guide_compile",
    "step_03_interview_collect",
    "step_04_jtbd",
    "step_05_segments",
    "step_06_decision_mapping",
];

/// Steps that always require human approval before acceptance.
pub const DEFAULT_CRITICAL_STEPS: &[&str] = &["step_06_decision_mapping"];

#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    /// JSON Schema contracts, one `<step>.schema.json` per step.
    pub contracts_dir: PathBuf,
    /// Per-step markdown quality standards.
    pub standards_dir: PathBuf,
    /// Organizational background injected into prompts.
    pub org_context_file: PathBuf,
    /// Root under which per-run artifact directories are created.
    pub artifacts_root: PathBuf,

    pub api_key: Option<String>,
    pub api_base: String,
    pub model_name: String,

    /// Minimum final score for unassisted acceptance.
    pub quality_threshold: f64,
    /// Additional reflection attempts after the first; total attempts per
    /// step are `max_reflection_loops + 1`.
    pub max_reflection_loops: u32,
    /// Uncertainty above this always escalates to a human.
    pub uncertainty_ask_threshold: f64,
    /// Uncertainty above this (but at or below the ask threshold) escalates
    /// with a softer reason.
    pub uncertainty_escalate_threshold: f64,
    /// Passing scores within this margin of the threshold are still held for
    /// human review.
    pub hitl_score_buffer: f64,
    pub critical_steps: Vec<String>,
    pub workflow_steps: Vec<String>,

    pub verbose: bool,
    /// Auto-approve every HITL checkpoint (the `--yes` flag).
    pub auto_approve: bool,
}

impl Config {
    /// Build a configuration from the environment, rooted at `project_dir`.
    ///
    /// Reads a `.env` file when present, then falls back to process
    /// environment variables and the defaults below.
    pub fn from_env(project_dir: PathBuf, verbose: bool, auto_approve: bool) -> Result<Self> {
        dotenvy::dotenv().ok();

        let project_dir = if project_dir.exists() {
            project_dir
                .canonicalize()
                .context("Failed to resolve project directory")?
        } else {
            project_dir
        };

        let workflow_steps = match std::env::var("WORKFLOW_STEPS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_WORKFLOW.iter().map(|s| s.to_string()).collect(),
        };

        let critical_steps = match std::env::var("CRITICAL_STEPS_FOR_HITL") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_CRITICAL_STEPS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            contracts_dir: project_dir.join("contracts"),
            standards_dir: project_dir.join("prompts/standards"),
            org_context_file: project_dir.join("prompts/org_context.md"),
            artifacts_root: project_dir.join("artifacts"),
            project_dir,
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            api_base: env_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
            model_name: env_or("MODEL_NAME", "gpt-4o"),
            quality_threshold: env_f64("QUALITY_THRESHOLD", 0.75)?,
            max_reflection_loops: env_u32("MAX_REFLECTION_LOOPS", 2)?,
            uncertainty_ask_threshold: env_f64("UNCERTAINTY_THRESHOLD_ASK", 0.6)?,
            uncertainty_escalate_threshold: env_f64("HITL_UNCERTAINTY_TRIGGER", 0.3)?,
            hitl_score_buffer: env_f64("HITL_SCORE_BUFFER", 0.05)?,
            critical_steps,
            workflow_steps,
            verbose,
            auto_approve,
        })
    }

    /// A configuration with library defaults, suitable for tests.
    pub fn with_defaults(project_dir: PathBuf) -> Self {
        Self {
            contracts_dir: project_dir.join("contracts"),
            standards_dir: project_dir.join("prompts/standards"),
            org_context_file: project_dir.join("prompts/org_context.md"),
            artifacts_root: project_dir.join("artifacts"),
            project_dir,
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model_name: "gpt-4o".to_string(),
            quality_threshold: 0.75,
            max_reflection_loops: 2,
            uncertainty_ask_threshold: 0.6,
            uncertainty_escalate_threshold: 0.3,
            hitl_score_buffer: 0.05,
            critical_steps: DEFAULT_CRITICAL_STEPS.iter().map(|s| s.to_string()).collect(),
            workflow_steps: DEFAULT_WORKFLOW.iter().map(|s| s.to_string()).collect(),
            verbose: false,
            auto_approve: false,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.artifacts_root)
            .context("Failed to create artifacts directory")?;
        Ok(())
    }

    /// Total attempts allowed per step.
    pub fn max_attempts(&self) -> u32 {
        self.max_reflection_loops + 1
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("Invalid float in env var {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("Invalid integer in env var {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
