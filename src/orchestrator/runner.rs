//! Per-step execution: the reflection loop with quality gating and HITL.
//!
//! Each step moves through an explicit state machine:
//! `ATTEMPTING -> {ACCEPTED, RETRYING, FORCE_ACCEPTED_AFTER_MAX, ERRORED}`.
//! Quality and human rejections retry with reflection feedback injected into
//! the context; execution errors retry the same call unchanged. Exhausting
//! the budget never halts the run.

use serde_json::json;

use crate::audit::EventLog;
use crate::audit::logger::append_lesson;
use crate::config::Config;
use crate::context::{ArtifactStore, RunContext};
use crate::gates::{HitlPolicy, QualityGate};
use crate::hitl::{Approval, HumanGate};
use crate::step::{Step, StepResult};
use crate::validate::Validator;

/// Terminal state of one step's reflection loop.
#[derive(Debug)]
pub enum StepOutcome {
    /// Gate passed and any HITL checkpoint approved.
    Accepted {
        result: StepResult,
        final_score: f64,
        attempts: u32,
    },
    /// Retry budget exhausted; the best-effort artifact is persisted under a
    /// `_FAILED` marker and flagged for downstream triage.
    ForceAccepted {
        result: StepResult,
        final_score: f64,
        attempts: u32,
        reason: String,
    },
    /// Every attempt raised an execution error. Nothing is persisted; the
    /// controller advances regardless.
    Errored { attempts: u32, last_error: String },
}

/// Verdict for one attempt after validation, gating, and HITL review.
enum AttemptVerdict {
    Accept {
        final_score: f64,
    },
    QualityReject {
        final_score: f64,
        reflection: String,
    },
    HumanReject {
        final_score: f64,
        reflection: String,
    },
}

pub struct StepRunner<'a> {
    gate: QualityGate,
    hitl: HitlPolicy,
    max_attempts: u32,
    validator: &'a Validator,
    human: &'a mut dyn HumanGate,
    events: &'a EventLog,
}

impl<'a> StepRunner<'a> {
    pub fn new(
        config: &Config,
        validator: &'a Validator,
        human: &'a mut dyn HumanGate,
        events: &'a EventLog,
    ) -> Self {
        Self {
            gate: QualityGate::new(config.quality_threshold),
            hitl: HitlPolicy {
                quality_threshold: config.quality_threshold,
                score_buffer: config.hitl_score_buffer,
                ask_threshold: config.uncertainty_ask_threshold,
                escalate_threshold: config.uncertainty_escalate_threshold,
                critical_steps: config.critical_steps.clone(),
            },
            max_attempts: config.max_attempts().max(1),
            validator,
            human,
            events,
        }
    }

    /// Drive one step to a terminal state. At least one attempt always runs.
    pub fn run_step(
        &mut self,
        step: &dyn Step,
        ctx: &mut RunContext,
        artifacts: &ArtifactStore,
    ) -> StepOutcome {
        let name = step.name().to_string();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let last_attempt = attempt >= self.max_attempts;

            match step.run(ctx, artifacts) {
                Err(error) => {
                    tracing::error!(step = %name, attempt, %error, "step raised an error");
                    self.record(
                        format!("{name}_ERROR"),
                        json!({"error": error.to_string(), "attempt": attempt}),
                    );
                    if last_attempt {
                        return StepOutcome::Errored {
                            attempts: attempt,
                            last_error: error.to_string(),
                        };
                    }
                    // A raised error is likely a bug or transient dependency
                    // failure, not a content-quality problem: re-run the same
                    // call without reflection feedback.
                }
                Ok(result) => {
                    let result = result.clamped();
                    match self.evaluate(&name, &result) {
                        AttemptVerdict::Accept { final_score } => {
                            return StepOutcome::Accepted {
                                result,
                                final_score,
                                attempts: attempt,
                            };
                        }
                        AttemptVerdict::HumanReject {
                            final_score,
                            reflection,
                        } => {
                            if last_attempt {
                                return StepOutcome::ForceAccepted {
                                    result,
                                    final_score,
                                    attempts: attempt,
                                    reason: reflection,
                                };
                            }
                            tracing::info!(step = %name, attempt, "reviewer rejected; reflecting");
                            ctx.reflection_notes = Some(reflection);
                        }
                        AttemptVerdict::QualityReject {
                            final_score,
                            reflection,
                        } => {
                            if last_attempt {
                                return StepOutcome::ForceAccepted {
                                    result,
                                    final_score,
                                    attempts: attempt,
                                    reason: reflection,
                                };
                            }
                            tracing::info!(
                                step = %name,
                                attempt,
                                next = attempt + 1,
                                budget = self.max_attempts,
                                "quality gate rejected; reflecting"
                            );
                            if let Err(error) = append_lesson(
                                &ctx.run_dir,
                                &format!("Lesson from {name} (reflection): {reflection}"),
                            ) {
                                tracing::warn!(%error, "failed to append lesson");
                            }
                            ctx.reflection_notes = Some(reflection);
                        }
                    }
                }
            }
        }
    }

    /// Validate, gate, and (when triggered) hold the attempt for human review.
    ///
    /// HITL is evaluated before the gate outcome is applied: a human
    /// rejection overrides even a passing score, and its feedback drives the
    /// next reflection.
    fn evaluate(&mut self, step_name: &str, result: &StepResult) -> AttemptVerdict {
        let validation = self.validator.validate(step_name, &result.data);
        let verdict = self.gate.decide(
            result.score,
            validation.schema_score,
            validation.checklist_score,
        );

        if let Some(reason) =
            self.hitl
                .should_trigger(step_name, result.uncertainty, verdict.final_score)
        {
            let approval = self
                .human
                .review(step_name, &reason.to_string(), &result.data)
                .unwrap_or_else(|error| {
                    // A broken review channel must not wedge the run; the
                    // gate outcome still applies below.
                    tracing::warn!(%error, "HITL review failed; falling back to gate outcome");
                    Approval::approved()
                });
            if !approval.approved {
                let feedback = approval.feedback.unwrap_or_default();
                return AttemptVerdict::HumanReject {
                    final_score: verdict.final_score,
                    reflection: format!(
                        "User rejected the output. Feedback: '{feedback}'. Self-critique was: {}",
                        result.notes
                    ),
                };
            }
        }

        if verdict.accept {
            AttemptVerdict::Accept {
                final_score: verdict.final_score,
            }
        } else {
            AttemptVerdict::QualityReject {
                final_score: verdict.final_score,
                reflection: format!(
                    "Score {:.2} < {:.2}. {}. Self-critique: {}",
                    verdict.final_score, self.gate.threshold, validation.notes, result.notes
                ),
            }
        }
    }

    fn record(&self, event: String, data: serde_json::Value) {
        if let Err(error) = self.events.log(event, data) {
            tracing::warn!(%error, "failed to append run event");
        }
    }
}
