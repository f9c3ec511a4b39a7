//! Artifact validation: JSON Schema contract, per-step checklist, and the
//! hard evidence-reference rule.
//!
//! Validation is a pure function over its inputs plus the schema set compiled
//! at construction; it has no side effects and never fails an artifact with
//! an error. Failures surface as scores and notes for the quality gate.

pub mod checklist;
pub mod evidence;

use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::ValidateError;

/// Scores and notes produced for one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// 1.0 when the artifact satisfies its schema contract (or none is
    /// registered), 0.0 on any schema violation. No partial credit.
    pub schema_score: f64,
    /// Checklist rule score, already floored by the evidence rule.
    pub checklist_score: f64,
    /// Human-readable description of what failed.
    pub notes: String,
}

/// Compiled schema contracts plus the checklist and evidence rule sets.
pub struct Validator {
    schemas: BTreeMap<String, jsonschema::Validator>,
}

impl Validator {
    /// Compile the raw schema documents into validators.
    pub fn from_schemas(raw: &BTreeMap<String, Value>) -> Result<Self, ValidateError> {
        let mut schemas = BTreeMap::new();
        for (step, schema) in raw {
            let compiled = jsonschema::validator_for(schema).map_err(|e| {
                ValidateError::SchemaCompile {
                    step: step.clone(),
                    message: e.to_string(),
                }
            })?;
            schemas.insert(step.clone(), compiled);
        }
        Ok(Self { schemas })
    }

    /// Validator with no schema contracts; every schema check passes through.
    pub fn empty() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    pub fn has_schema(&self, step_name: &str) -> bool {
        self.schemas.contains_key(step_name)
    }

    /// Validate one artifact.
    pub fn validate(&self, step_name: &str, data: &Value) -> Validation {
        let (schema_score, schema_notes): (f64, String) = match self.schemas.get(step_name) {
            None => (1.0, "no schema".to_string()),
            Some(validator) => match validator.validate(data) {
                Ok(()) => (1.0, "Schema OK".to_string()),
                Err(error) => (0.0, format!("Schema failed: {error}")),
            },
        };

        let (rule_score, rule_notes) = checklist::check(step_name, data);

        let evidence_score = if evidence::requires_evidence(step_name) {
            if evidence::has_evidence_refs(data) {
                1.0
            } else {
                0.0
            }
        } else {
            1.0
        };

        // The evidence rule is a hard floor: untraceable claims veto any
        // checklist partial credit.
        let checklist_score = rule_score.min(evidence_score);

        let mut notes = format!("Schema: {schema_notes} | Checklist: {rule_notes}");
        if evidence_score == 0.0 {
            notes.push_str(" | Evidence: no non-empty evidence_refs found");
        }

        Validation {
            schema_score: schema_score.min(1.0),
            checklist_score,
            notes,
        }
    }
}
