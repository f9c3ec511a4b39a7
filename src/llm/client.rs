//! OpenAI-compatible chat-completions client.
//!
//! The client owns its internal retry and backoff: transient provider
//! failures are retried with a linear delay and a small per-attempt
//! temperature bump. When every attempt fails it degrades into a zero-score,
//! full-uncertainty generation instead of erroring, so the orchestrator's
//! quality gate handles provider outages the same way it handles bad output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{Generation, GenerationRequest, Generator};
use crate::errors::LlmError;
use crate::step::clamp01;

const MAX_API_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const BASE_TEMPERATURE: f64 = 0.5;
const TEMPERATURE_BUMP_PER_RETRY: f64 = 0.1;
const MAX_TOKENS: u32 = 4000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Result<Self, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn call_api(&self, system: &str, user: &str, attempt: u32) -> Result<Generation, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: BASE_TEMPERATURE + f64::from(attempt) * TEMPERATURE_BUMP_PER_RETRY,
            max_tokens: MAX_TOKENS,
        };

        let response: ChatResponse = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        let payload: Value = serde_json::from_str(&content).map_err(|e| {
            let preview: String = content.chars().take(200).collect();
            LlmError::MalformedResponse(format!("Invalid JSON in LLM response: {e}. Response: {preview}..."))
        })?;

        parse_generation(payload)
    }
}

impl Generator for OpenAiClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Generation, LlmError> {
        let system = build_system_prompt(request);
        let user = build_user_prompt(request);

        let mut last_error = None;
        for attempt in 0..MAX_API_RETRIES {
            match self.call_api(&system, &user, attempt) {
                Ok(generation) => return Ok(generation),
                Err(error) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = MAX_API_RETRIES,
                        %error,
                        "LLM call failed"
                    );
                    last_error = Some(error);
                    if attempt + 1 < MAX_API_RETRIES {
                        std::thread::sleep(RETRY_DELAY * (attempt + 1));
                    }
                }
            }
        }

        // Degrade instead of erroring: a zero-score generation routes the
        // failure through the quality gate and reflection loop.
        let message = format!(
            "LLM failed after {MAX_API_RETRIES} attempts. Last error: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        );
        Ok(Generation {
            data: serde_json::json!({"error": message, "fallback_used": true}),
            score: 0.0,
            uncertainty: 1.0,
            notes: message,
        })
    }
}

/// Build the full system prompt: base instructions, output discipline,
/// organizational context, textual standard, and the JSON Schema contract.
pub fn build_system_prompt(request: &GenerationRequest<'_>) -> String {
    let schema_section = request
        .schema
        .map(|s| serde_json::to_string_pretty(s).unwrap_or_default())
        .unwrap_or_else(|| "No schema provided.".to_string());

    format!(
        r#"{base}

You MUST follow these instructions:
1. Think step-by-step to analyze the user request.
2. Your final output MUST be a single, valid JSON object. Do not include any text, explanations, or markdown formatting before or after the JSON.
3. Your output MUST strictly adhere to the provided JSON Schema (STANDARD section).
4. You MUST also consider the quality guidelines and checklists from the TEXTUAL STANDARD section to ensure the substance of your response is high quality.
5. Include these meta-fields in your JSON response for self-assessment:
   - "self_assessed_score": float between 0.0 and 1.0
   - "uncertainty_score": float between 0.0 and 1.0
   - "reasoning": string with brief explanation of your approach

ORGANIZATIONAL CONTEXT (for background):
---
{org}
---

TEXTUAL STANDARD (Quality Guidelines):
---
{standard}
---

STANDARD (JSON Schema for output format):
---
{schema}
---"#,
        base = request.system_prompt,
        org = non_empty_or(request.org_context, "No organizational context provided."),
        standard = non_empty_or(request.standard_text, "No textual standard provided."),
        schema = schema_section,
    )
}

/// Build the user prompt, appending reflection feedback on retries.
pub fn build_user_prompt(request: &GenerationRequest<'_>) -> String {
    let mut prompt = request.user_prompt.clone();
    if let Some(notes) = request.reflection_notes {
        prompt.push_str(&format!(
            "\n\nCRITICAL FEEDBACK ON PREVIOUS ATTEMPT:\n---\n{notes}\n---\nYou MUST address this feedback in your new response."
        ));
    }
    prompt
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// Split the model's JSON object into the artifact payload and the
/// self-assessment meta-fields.
pub fn parse_generation(payload: Value) -> Result<Generation, LlmError> {
    let Value::Object(mut map) = payload else {
        return Err(LlmError::MalformedResponse(
            "Response is not a valid JSON object".to_string(),
        ));
    };

    let score = map
        .remove("self_assessed_score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.8);
    let uncertainty = map
        .remove("uncertainty_score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.2);
    let notes = map
        .remove("reasoning")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "No reasoning provided by LLM.".to_string());

    Ok(Generation {
        data: Value::Object(map),
        score: clamp01(score),
        uncertainty: clamp01(uncertainty),
        notes,
    })
}
