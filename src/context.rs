//! Mutable run state threaded through every step invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::standards::StandardsBundle;

/// State shared across the whole run.
///
/// Created once at run start and enriched per step. The reference material
/// (`md_standards`, `schemas`, `org_context`) is loaded before the loop
/// begins and never changes; `current_standard_text` and `current_schema`
/// are derived views refreshed at the start of each step iteration.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Unique identifier for this execution, immutable after creation.
    pub run_id: String,
    /// Original user-supplied task payload, immutable.
    pub input: Value,
    /// Per-step markdown quality standards, keyed by step name.
    pub md_standards: BTreeMap<String, String>,
    /// Per-step JSON Schema contracts, keyed by step name.
    pub schemas: BTreeMap<String, Value>,
    /// Organizational background prose injected into every prompt.
    pub org_context: String,
    /// Standard text for the step currently executing.
    pub current_standard_text: String,
    /// Schema for the step currently executing, if one is registered.
    pub current_schema: Option<Value>,
    /// Feedback injected only when a retry follows a rejection. Cleared at
    /// the start of every step; never carried across steps.
    pub reflection_notes: Option<String>,
    /// Directory where this run's artifacts and logs are written.
    pub run_dir: PathBuf,
}

impl RunContext {
    pub fn new(run_id: String, input: Value, bundle: StandardsBundle, run_dir: PathBuf) -> Self {
        Self {
            run_id,
            input,
            md_standards: bundle.md_standards,
            schemas: bundle.schemas,
            org_context: bundle.org_context,
            current_standard_text: String::new(),
            current_schema: None,
            reflection_notes: None,
            run_dir,
        }
    }

    /// Refresh the per-step derived fields and drop any reflection feedback
    /// left over from the previous step.
    pub fn begin_step(&mut self, step_name: &str) {
        self.current_standard_text = self
            .md_standards
            .get(step_name)
            .cloned()
            .unwrap_or_default();
        self.current_schema = self.schemas.get(step_name).cloned();
        self.reflection_notes = None;
    }
}

/// Growing map from step name to that step's accepted artifact payload.
///
/// Entries are added only on acceptance (or exhausted-retry forced
/// acceptance), never removed, never mutated after insertion.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    entries: BTreeMap<String, Value>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted artifact. The first insertion for a step name wins;
    /// a step reaches a terminal state exactly once per run, so a second
    /// insert for the same name indicates a controller bug and is ignored.
    pub fn insert(&mut self, step_name: &str, data: Value) {
        self.entries.entry(step_name.to_string()).or_insert(data);
    }

    pub fn get(&self, step_name: &str) -> Option<&Value> {
        self.entries.get(step_name)
    }

    pub fn contains(&self, step_name: &str) -> bool {
        self.entries.contains_key(step_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
