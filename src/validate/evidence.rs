//! Hard evidence-reference rule.
//!
//! Research artifacts that make stakeholder-facing claims must be traceable
//! back to source quotes or observations. For designated steps, the absence
//! of any non-empty `evidence_refs` list anywhere in the payload is a hard
//! fail that overrides every softer signal.

use serde_json::Value;

/// Steps whose artifacts must carry evidence references.
pub const EVIDENCE_REQUIRED_STEPS: &[&str] = &[
    "step_04_jtbd",
    "step_05_segments",
    "step_06_decision_mapping",
];

pub fn requires_evidence(step_name: &str) -> bool {
    EVIDENCE_REQUIRED_STEPS.contains(&step_name)
}

/// Recursively search the data tree for an `evidence_refs` field holding a
/// non-empty list. Matches at any nesting depth.
pub fn has_evidence_refs(data: &Value) -> bool {
    match data {
        Value::Object(map) => {
            if let Some(Value::Array(refs)) = map.get("evidence_refs")
                && !refs.is_empty()
            {
                return true;
            }
            map.values().any(has_evidence_refs)
        }
        Value::Array(items) => items.iter().any(has_evidence_refs),
        _ => false,
    }
}
