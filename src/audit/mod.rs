//! Run memory: the append-only event log and persisted artifact records.
//!
//! Both outputs exist for audit and downstream triage. The controller never
//! reads them back for control decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::step::StepResult;

/// One append-only log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub data: Value,
}

impl RunEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event: event.into(),
            data,
        }
    }
}

/// Persisted record for one step's terminal artifact.
///
/// Failed-after-retries artifacts are written under a `_FAILED` suffix
/// rather than overwriting anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub step_name: String,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock seconds from step start to terminal state.
    pub execution_time: f64,
    pub score: f64,
    pub uncertainty: f64,
    pub notes: String,
    pub data: Value,
}

impl ArtifactRecord {
    pub fn new(step_name: &str, result: &StepResult, execution_time: f64) -> Self {
        Self {
            step_name: step_name.to_string(),
            timestamp: Utc::now(),
            execution_time,
            score: result.score,
            uncertainty: result.uncertainty,
            notes: result.notes.clone(),
            data: result.data.clone(),
        }
    }
}

pub mod logger;
pub use logger::EventLog;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artifact_record_carries_result_fields() {
        let result = StepResult {
            data: json!({"segments": [{"segment_id": "S-1"}]}),
            score: 0.82,
            uncertainty: 0.1,
            notes: "clustered 3 interviews".to_string(),
            rollback_to: None,
        };
        let record = ArtifactRecord::new("step_05_segments", &result, 12.5);
        assert_eq!(record.step_name, "step_05_segments");
        assert_eq!(record.score, 0.82);
        assert_eq!(record.execution_time, 12.5);
        // Payload is carried byte-for-byte, no transformation.
        assert_eq!(record.data, result.data);
    }

    #[test]
    fn run_event_serializes_with_timestamp() {
        let event = RunEvent::new("step_04_jtbd_SUCCESS", json!({"score": 0.9}));
        let serialized = serde_json::to_string(&event).unwrap();
        assert!(serialized.contains("step_04_jtbd_SUCCESS"));
        assert!(serialized.contains("timestamp"));
    }
}
