//! LLM generation boundary.
//!
//! The orchestrator treats generation as an opaque blocking call producing
//! `{data, score, uncertainty, notes}`. The production client lives in
//! [`client`]; steps depend only on the [`Generator`] trait.

pub mod client;

pub use client::OpenAiClient;

use serde_json::Value;

use crate::errors::LlmError;

/// One generation request. Reflection notes, when present, are appended to
/// the user prompt as a critical-feedback block.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: String,
    pub org_context: &'a str,
    pub standard_text: &'a str,
    pub schema: Option<&'a Value>,
    pub reflection_notes: Option<&'a str>,
}

/// A structured generation with the model's self-assessment extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub data: Value,
    pub score: f64,
    pub uncertainty: f64,
    pub notes: String,
}

/// Blocking generation boundary.
pub trait Generator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Generation, LlmError>;
}
