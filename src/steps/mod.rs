//! LLM-backed workflow steps.
//!
//! Every builtin step is a [`PromptStep`]: a name, a system prompt, and a
//! user-prompt builder over the run input and prior artifacts. The generation
//! call carries the step's schema contract, textual standard, organizational
//! context, and any reflection feedback from the context.

pub mod catalog;

use std::sync::Arc;

use crate::context::{ArtifactStore, RunContext};
use crate::errors::StepError;
use crate::llm::{GenerationRequest, Generator};
use crate::step::{Step, StepResult};

/// Builds the step-specific user prompt from accumulated state.
pub type PromptBuilder = fn(&RunContext, &ArtifactStore) -> String;

pub struct PromptStep {
    name: String,
    system_prompt: &'static str,
    build_prompt: PromptBuilder,
    generator: Arc<dyn Generator>,
}

impl PromptStep {
    pub fn new(
        name: impl Into<String>,
        system_prompt: &'static str,
        build_prompt: PromptBuilder,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt,
            build_prompt,
            generator,
        }
    }
}

impl Step for PromptStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, context: &RunContext, artifacts: &ArtifactStore) -> Result<StepResult, StepError> {
        let request = GenerationRequest {
            system_prompt: self.system_prompt,
            user_prompt: (self.build_prompt)(context, artifacts),
            org_context: &context.org_context,
            standard_text: &context.current_standard_text,
            schema: context.current_schema.as_ref(),
            reflection_notes: context.reflection_notes.as_deref(),
        };
        let generation = self.generator.generate(&request)?;
        Ok(StepResult {
            data: generation.data,
            score: generation.score,
            uncertainty: generation.uncertainty,
            notes: generation.notes,
            rollback_to: None,
        })
    }
}

/// Compact, LLM-friendly preview of a prior artifact. Serializes the payload
/// and truncates it on a character boundary.
pub fn artifact_preview(artifacts: &ArtifactStore, step_name: &str, max_chars: usize) -> String {
    let Some(data) = artifacts.get(step_name) else {
        return format!("(no artifact from {step_name})");
    };
    let serialized = serde_json::to_string(data).unwrap_or_default();
    if serialized.chars().count() <= max_chars {
        serialized
    } else {
        serialized.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::llm::Generation;
    use crate::standards::StandardsBundle;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Generator double that records the request it saw.
    struct RecordingGenerator {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl Generator for RecordingGenerator {
        fn generate(&self, request: &GenerationRequest<'_>) -> Result<Generation, LlmError> {
            self.seen.lock().unwrap().push((
                request.user_prompt.clone(),
                request.reflection_notes.map(str::to_string),
            ));
            Ok(Generation {
                data: json!({"segments": [{"segment_id": "S-1"}]}),
                score: 0.9,
                uncertainty: 0.1,
                notes: "ok".to_string(),
            })
        }
    }

    fn context() -> RunContext {
        let mut ctx = RunContext::new(
            "run_test".into(),
            json!({"product": "crm"}),
            StandardsBundle::default(),
            PathBuf::from("/tmp/run_test"),
        );
        ctx.reflection_notes = Some("tighten the segment lexicon".to_string());
        ctx
    }

    #[test]
    fn prompt_step_forwards_reflection_notes() {
        let generator = Arc::new(RecordingGenerator {
            seen: Mutex::new(Vec::new()),
        });
        let step = PromptStep::new(
            "step_05_segments",
            "You cluster VOC into segments.",
            |ctx, _| format!("INPUT: {}", ctx.input),
            generator.clone(),
        );

        let result = step.run(&context(), &ArtifactStore::new()).unwrap();
        assert_eq!(result.score, 0.9);

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("crm"));
        assert_eq!(seen[0].1.as_deref(), Some("tighten the segment lexicon"));
    }

    #[test]
    fn artifact_preview_truncates() {
        let mut store = ArtifactStore::new();
        store.insert("step_04_jtbd", json!({"text": "a".repeat(5000)}));
        let preview = artifact_preview(&store, "step_04_jtbd", 100);
        assert_eq!(preview.chars().count(), 100);
    }

    #[test]
    fn artifact_preview_notes_missing_artifact() {
        let preview = artifact_preview(&ArtifactStore::new(), "step_04_jtbd", 100);
        assert!(preview.contains("no artifact"));
    }
}
