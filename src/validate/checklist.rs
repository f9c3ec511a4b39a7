//! Step-specific structural sanity rules.
//!
//! One rule set applies per step name. Rules return a score in [0, 1] with
//! partial credit for near-misses; steps without a rule set pass at 1.0.

use serde_json::Value;

/// Minimum rendered markdown length for the compiled interview guide.
const GUIDE_MIN_MARKDOWN_CHARS: usize = 400;

/// Sections a compiled guide must cover.
const GUIDE_REQUIRED_SECTIONS: &[&str] = &["goals", "questions", "probes"];

/// Run the checklist rule set registered for `step_name` against `data`.
///
/// Returns `(score, notes)`.
pub fn check(step_name: &str, data: &Value) -> (f64, String) {
    match step_name {
        "step_02a_guide_compile" => check_guide_compile(data),
        "step_04_jtbd" => check_jtbd(data),
        "step_05_segments" => check_segments(data),
        "step_06_decision_mapping" => check_decision_mapping(data),
        _ => (1.0, "OK".to_string()),
    }
}

fn check_guide_compile(data: &Value) -> (f64, String) {
    let markdown = data.get("markdown").and_then(Value::as_str).unwrap_or("");
    if markdown.len() < GUIDE_MIN_MARKDOWN_CHARS {
        return (
            0.5,
            format!(
                "Guide markdown too short ({} < {} chars).",
                markdown.len(),
                GUIDE_MIN_MARKDOWN_CHARS
            ),
        );
    }

    let sections = data.get("sections").and_then(Value::as_object);
    let missing: Vec<&str> = GUIDE_REQUIRED_SECTIONS
        .iter()
        .filter(|name| sections.is_none_or(|s| !s.contains_key(**name)))
        .copied()
        .collect();
    if !missing.is_empty() {
        return (0.6, format!("Missing guide sections: {missing:?}"));
    }

    (1.0, "OK".to_string())
}

fn check_jtbd(data: &Value) -> (f64, String) {
    let required = ["big_jobs", "medium_jobs", "small_jobs", "evidence"];
    let missing: Vec<&str> = required
        .iter()
        .filter(|key| data.get(**key).is_none())
        .copied()
        .collect();
    if !missing.is_empty() {
        return (0.4, format!("Missing keys: {missing:?}"));
    }

    if let Some(big_jobs) = data.get("big_jobs").and_then(Value::as_array)
        && big_jobs.len() < 2
    {
        return (0.7, "Too few big_jobs (<2).".to_string());
    }

    (1.0, "OK".to_string())
}

fn check_segments(data: &Value) -> (f64, String) {
    match data.get("segments").and_then(Value::as_array) {
        Some(segments) if !segments.is_empty() => (1.0, "OK".to_string()),
        _ => (0.4, "No segments generated.".to_string()),
    }
}

fn check_decision_mapping(data: &Value) -> (f64, String) {
    let gaps = data
        .get("decision_map")
        .and_then(|m| m.get("gaps"))
        .and_then(Value::as_array);
    match gaps {
        Some(gaps) if !gaps.is_empty() => (1.0, "OK".to_string()),
        _ => (0.5, "Decision map has no gaps.".to_string()),
    }
}
