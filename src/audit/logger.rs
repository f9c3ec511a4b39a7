use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{ArtifactRecord, RunEvent};

/// Append-only JSON Lines event log for one run.
pub struct EventLog {
    log_file: PathBuf,
}

impl EventLog {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            log_file: run_dir.join("run_log.jsonl"),
        }
    }

    /// Append one event. Each record is a single JSON line.
    pub fn log(&self, event: impl Into<String>, data: Value) -> Result<()> {
        let record = RunEvent::new(event, data);
        let mut line = serde_json::to_string(&record).context("Failed to serialize run event")?;
        line.push('\n');

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .context("Failed to open run log")?
            .write_all(line.as_bytes())
            .context("Failed to append run event")?;

        Ok(())
    }

    /// Read back all events. Used by the audit CLI surface and tests, never
    /// by the controller.
    pub fn read_events(&self) -> Result<Vec<RunEvent>> {
        if !self.log_file.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.log_file).context("Failed to read run log")?;
        let events = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<RunEvent>, _>>()
            .context("Failed to parse run log")?;
        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }
}

/// Write one artifact record as `<file_stem>.json` under the run directory.
///
/// `file_stem` is the step name, or the step name with a `_FAILED` suffix for
/// exhausted-retry artifacts.
pub fn write_artifact(run_dir: &Path, file_stem: &str, record: &ArtifactRecord) -> Result<PathBuf> {
    let path = run_dir.join(format!("{file_stem}.json"));
    let json =
        serde_json::to_string_pretty(record).context("Failed to serialize artifact record")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write artifact file: {}", path.display()))?;
    Ok(path)
}

/// Append a reflection lesson to `lessons.md` in the run directory.
pub fn append_lesson(run_dir: &Path, lesson: &str) -> Result<()> {
    let lessons_file = run_dir.join("lessons.md");
    let mut content = if lessons_file.exists() {
        fs::read_to_string(&lessons_file).context("Failed to read lessons file")?
    } else {
        "# Lessons Learned\n".to_string()
    };
    content.push_str(&format!(
        "\n## {}\n{}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        lesson
    ));
    fs::write(&lessons_file, content).context("Failed to write lessons file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepResult;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn log_appends_jsonl_records() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path());
        log.log("step_04_jtbd_SUCCESS", json!({"score": 0.9})).unwrap();
        log.log("step_05_segments_FAIL", json!({"score": 0.4})).unwrap();

        let events = log.read_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "step_04_jtbd_SUCCESS");
        assert_eq!(events[1].event, "step_05_segments_FAIL");
        assert_eq!(events[1].data["score"], json!(0.4));
    }

    #[test]
    fn read_events_on_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path());
        assert!(log.read_events().unwrap().is_empty());
    }

    #[test]
    fn write_artifact_roundtrips_data_exactly() {
        let dir = tempdir().unwrap();
        let result = StepResult {
            data: json!({"big_jobs": [{"job_id": "BJ-1", "evidence_refs": ["I-1:q3"]}]}),
            score: 0.88,
            uncertainty: 0.12,
            notes: "ok".to_string(),
            rollback_to: None,
        };
        let record = ArtifactRecord::new("step_04_jtbd", &result, 3.2);
        let path = write_artifact(dir.path(), "step_04_jtbd", &record).unwrap();

        let loaded: ArtifactRecord =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.data, result.data);
        assert_eq!(loaded.step_name, "step_04_jtbd");
    }

    #[test]
    fn failed_artifact_uses_distinct_suffix() {
        let dir = tempdir().unwrap();
        let record = ArtifactRecord::new("step_05_segments", &StepResult::default(), 1.0);
        write_artifact(dir.path(), "step_05_segments", &record).unwrap();
        write_artifact(dir.path(), "step_05_segments_FAILED", &record).unwrap();
        assert!(dir.path().join("step_05_segments.json").exists());
        assert!(dir.path().join("step_05_segments_FAILED.json").exists());
    }

    #[test]
    fn append_lesson_accumulates() {
        let dir = tempdir().unwrap();
        append_lesson(dir.path(), "Lesson from step_04_jtbd (reflection): low score").unwrap();
        append_lesson(dir.path(), "Lesson from step_05_segments (reflection): no segments")
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("lessons.md")).unwrap();
        assert!(content.starts_with("# Lessons Learned"));
        assert!(content.contains("step_04_jtbd"));
        assert!(content.contains("step_05_segments"));
    }
}
