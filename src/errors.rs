//! Typed error hierarchy for the fieldwork orchestrator.
//!
//! Three top-level enums cover the three subsystems:
//! - `LlmError` - provider client failures
//! - `StepError` - per-step execution failures
//! - `RegistryError` - step resolution failures

use thiserror::Error;

/// Errors from the LLM provider client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    #[error("HTTP request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("Malformed response from LLM: {0}")]
    MalformedResponse(String),
}

/// Errors from a single step execution attempt.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("LLM generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Step failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the step registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No step registered under name '{name}'")]
    UnknownStep { name: String },

    #[error("Step '{name}' is already registered")]
    DuplicateStep { name: String },
}

/// Errors from schema loading and compilation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("Failed to read schema file at {path}: {source}")]
    SchemaRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema for step '{step}': {message}")]
    SchemaParse { step: String, message: String },

    #[error("Schema for step '{step}' is not a valid JSON Schema: {message}")]
    SchemaCompile { step: String, message: String },
}
