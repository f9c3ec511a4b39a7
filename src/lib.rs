//! fieldwork - LLM-driven customer discovery orchestrator.
//!
//! Executes an ordered AJTBD research workflow (interview guide, simulated
//! interviews, JTBD graph, segments, decision map) step by step. Each step's
//! output is validated against a JSON Schema contract, a per-step checklist,
//! and an evidence-traceability rule; a minimum-of-three quality gate decides
//! acceptance, with reflection retries and human-in-the-loop escalation for
//! uncertain or critical results. Every run leaves an append-only audit
//! trail under its own artifact directory.

pub mod audit;
pub mod config;
pub mod context;
pub mod errors;
pub mod gates;
pub mod hitl;
pub mod llm;
pub mod orchestrator;
pub mod registry;
pub mod standards;
pub mod step;
pub mod steps;
pub mod validate;
