//! Loading of reference material: JSON Schema contracts, markdown quality
//! standards, and organizational context.
//!
//! All three sources are optional. A missing directory or file simply yields
//! an empty section; the validator treats an absent schema as pass-through.

use anyhow::{Context, Result};
use glob::glob;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;
use crate::context::RunContext;

/// Read-only reference material loaded once before the step loop begins.
#[derive(Debug, Clone, Default)]
pub struct StandardsBundle {
    /// Step name → markdown quality standard.
    pub md_standards: BTreeMap<String, String>,
    /// Step name → JSON Schema contract document.
    pub schemas: BTreeMap<String, Value>,
    /// Organizational background prose.
    pub org_context: String,
}

impl StandardsBundle {
    /// Load the bundle from the locations declared in `config`.
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self {
            md_standards: load_md_standards(&config.standards_dir)?,
            schemas: load_contract_schemas(&config.contracts_dir)?,
            org_context: read_optional(&config.org_context_file),
        })
    }
}

/// Load `<standards_dir>/*.md` keyed by file stem.
pub fn load_md_standards(standards_dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut standards = BTreeMap::new();
    if !standards_dir.exists() {
        return Ok(standards);
    }

    let pattern = standards_dir.join("*.md").to_string_lossy().to_string();
    for entry in glob(&pattern).context("Failed to read standards glob pattern")? {
        let path = entry.context("Failed to read standards directory entry")?;
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read standard file: {}", path.display()))?;
        standards.insert(stem.to_string(), content);
    }
    Ok(standards)
}

/// Load `<contracts_dir>/<step>.schema.json` contracts keyed by step name.
pub fn load_contract_schemas(contracts_dir: &Path) -> Result<BTreeMap<String, Value>> {
    let mut schemas = BTreeMap::new();
    if !contracts_dir.exists() {
        return Ok(schemas);
    }

    let pattern = contracts_dir
        .join("*.schema.json")
        .to_string_lossy()
        .to_string();
    for entry in glob(&pattern).context("Failed to read contracts glob pattern")? {
        let path = entry.context("Failed to read contracts directory entry")?;
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let step_name = file_name.trim_end_matches(".schema.json").to_string();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let schema: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schema JSON: {}", path.display()))?;
        schemas.insert(step_name, schema);
    }
    Ok(schemas)
}

fn read_optional(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Render the pre-run understanding summary written to
/// `step_00_understanding.md` before the loop starts.
pub fn summarize_understanding(ctx: &RunContext, workflow: &[String]) -> String {
    let mut out = String::new();
    out.push_str("# Run Understanding\n\n");
    out.push_str(&format!("- Run ID: `{}`\n", ctx.run_id));

    let input_keys: Vec<&str> = ctx
        .input
        .as_object()
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();
    out.push_str(&format!("- Input keys: {}\n", format_list(&input_keys)));
    out.push_str(&format!(
        "- Markdown standards loaded: {}\n",
        ctx.md_standards.len()
    ));
    out.push_str(&format!("- Schema contracts loaded: {}\n", ctx.schemas.len()));
    out.push_str(&format!(
        "- Organizational context: {}\n",
        if ctx.org_context.is_empty() {
            "none"
        } else {
            "loaded"
        }
    ));

    out.push_str("\n## Workflow\n\n");
    for (i, step) in workflow.iter().enumerate() {
        out.push_str(&format!("{}. `{}`\n", i + 1, step));
    }
    out
}

fn format_list(items: &[&str]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
