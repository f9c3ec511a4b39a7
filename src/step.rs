//! Step contract for the fieldwork orchestrator.
//!
//! A step is any unit exposing `run(context, artifacts) -> StepResult`. Steps
//! fail either by returning an error (caught and retried by the runner) or by
//! returning a low-score/high-uncertainty result (handled by the quality gate
//! and HITL path). Steps must not mutate the context or the artifact store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{ArtifactStore, RunContext};
use crate::errors::StepError;

/// Clamp a quality or uncertainty signal into [0.0, 1.0].
///
/// Out-of-range self-assessments from the model must never leak into gate or
/// HITL comparisons.
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Standardized result of one step execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    /// The artifact payload produced by the step.
    #[serde(default = "empty_object")]
    pub data: Value,
    /// Self-assessed quality in [0.0, 1.0].
    #[serde(default = "default_score")]
    pub score: f64,
    /// Self-assessed confidence complement in [0.0, 1.0].
    #[serde(default)]
    pub uncertainty: f64,
    /// Reasoning, self-critique, or caveats.
    #[serde(default)]
    pub notes: String,
    /// Step identifier the controller should rewind to, if the step decided
    /// an earlier decision was invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_to: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_score() -> f64 {
    1.0
}

impl Default for StepResult {
    fn default() -> Self {
        Self {
            data: empty_object(),
            score: 1.0,
            uncertainty: 0.0,
            notes: String::new(),
            rollback_to: None,
        }
    }
}

impl StepResult {
    /// Return a copy with `score` and `uncertainty` clamped into [0.0, 1.0].
    ///
    /// The `data` payload is carried through untouched: what a step produced
    /// is exactly what gets validated and persisted.
    pub fn clamped(mut self) -> Self {
        self.score = clamp01(self.score);
        self.uncertainty = clamp01(self.uncertainty);
        self
    }
}

/// The step contract consumed by the run controller.
pub trait Step {
    /// Stable identifier used for registry lookup, schema resolution, and
    /// artifact naming.
    fn name(&self) -> &str;

    /// Execute the step against the accumulated context and prior artifacts.
    fn run(&self, context: &RunContext, artifacts: &ArtifactStore) -> Result<StepResult, StepError>;
}
