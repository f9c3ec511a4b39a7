//! Builtin AJTBD discovery steps.
//!
//! The registry is populated from this static table at startup, so the set
//! of valid step names is enumerable without constructing a generator.

use std::sync::Arc;

use crate::context::{ArtifactStore, RunContext};
use crate::errors::RegistryError;
use crate::llm::Generator;
use crate::registry::StepRegistry;
use crate::steps::{PromptBuilder, PromptStep, artifact_preview};

/// Per-artifact preview budget when quoting upstream artifacts in prompts.
const PREVIEW_CHARS: usize = 6000;

struct CatalogEntry {
    name: &'static str,
    system_prompt: &'static str,
    build_prompt: PromptBuilder,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "step_02a_guide_compile",
        system_prompt: "You compile rigorous customer-discovery interview guides \
            from a product brief, following the provided standard and contract.",
        build_prompt: guide_compile_prompt,
    },
    CatalogEntry {
        name: "step_03_interview_collect",
        system_prompt: "You simulate in-depth customer interviews using the compiled \
            guide, producing verbatim-style answers with stable interview and quote ids.",
        build_prompt: interview_collect_prompt,
    },
    CatalogEntry {
        name: "step_04_jtbd",
        system_prompt: "You produce clean JTBD graphs from qualitative VOC according \
            to the provided standard and contract.",
        build_prompt: jtbd_prompt,
    },
    CatalogEntry {
        name: "step_05_segments",
        system_prompt: "You cluster VOC and JTBD evidence into authentic customer \
            segments with their own lexicon, per the provided standard and contract.",
        build_prompt: segments_prompt,
    },
    CatalogEntry {
        name: "step_06_decision_mapping",
        system_prompt: "You build decision maps: stages, triggers, and gaps between \
            segment jobs and current offers, per the provided standard and contract.",
        build_prompt: decision_mapping_prompt,
    },
];

/// Names of all builtin steps, in catalog order.
pub fn step_names() -> Vec<&'static str> {
    CATALOG.iter().map(|e| e.name).collect()
}

/// Register every builtin step against the given generator.
pub fn register_builtin(
    registry: &mut StepRegistry,
    generator: Arc<dyn Generator>,
) -> Result<(), RegistryError> {
    for entry in CATALOG {
        registry.register(Box::new(PromptStep::new(
            entry.name,
            entry.system_prompt,
            entry.build_prompt,
            generator.clone(),
        )))?;
    }
    Ok(())
}

fn guide_compile_prompt(ctx: &RunContext, _artifacts: &ArtifactStore) -> String {
    format!(
        "Compile an interview guide for the product described below. Return ONLY a \
         JSON object with a rendered `markdown` body and a `sections` map covering \
         goals, questions, and probes.\n\nPRODUCT BRIEF:\n{}",
        ctx.input
    )
}

fn interview_collect_prompt(ctx: &RunContext, artifacts: &ArtifactStore) -> String {
    format!(
        "Simulate customer interviews for the product below, following the compiled \
         guide. Return ONLY a JSON object matching the contract.\n\nPRODUCT BRIEF:\n{}\n\n\
         INTERVIEW GUIDE:\n{}",
        ctx.input,
        artifact_preview(artifacts, "step_02a_guide_compile", PREVIEW_CHARS)
    )
}

fn jtbd_prompt(_ctx: &RunContext, artifacts: &ArtifactStore) -> String {
    format!(
        "Build a JTBD graph (Big/Medium/Small jobs) and associated evidence from the \
         VOC preview below. Every job needs evidence_refs pointing at interview quotes. \
         Return ONLY a JSON object matching the contract.\n\nVOC PREVIEW:\n{}",
        artifact_preview(artifacts, "step_03_interview_collect", PREVIEW_CHARS)
    )
}

fn segments_prompt(_ctx: &RunContext, artifacts: &ArtifactStore) -> String {
    format!(
        "Derive authentic customer segments from the JTBD graph and VOC below. Each \
         segment needs big_job, core_job, lexicon, jtbd_links, and evidence_refs. \
         Return ONLY a JSON object matching the contract.\n\nJTBD GRAPH:\n{}\n\nVOC PREVIEW:\n{}",
        artifact_preview(artifacts, "step_04_jtbd", PREVIEW_CHARS),
        artifact_preview(artifacts, "step_03_interview_collect", PREVIEW_CHARS)
    )
}

fn decision_mapping_prompt(ctx: &RunContext, artifacts: &ArtifactStore) -> String {
    format!(
        "Build a decision map for the product below: stages, triggers, and gaps. \
         Each gap needs affected_job_levels and evidence_refs. Return ONLY a JSON \
         object matching the contract.\n\nPRODUCT BRIEF:\n{}\n\nSEGMENTS:\n{}\n\nJTBD GRAPH:\n{}",
        ctx.input,
        artifact_preview(artifacts, "step_05_segments", PREVIEW_CHARS),
        artifact_preview(artifacts, "step_04_jtbd", PREVIEW_CHARS)
    )
}
