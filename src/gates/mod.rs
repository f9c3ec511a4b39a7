//! Acceptance decisions: the quality gate and the HITL trigger evaluator.
//!
//! Both are pure decision functions. The gate computes the final score as a
//! minimum, not an average: a structurally invalid or evidence-less artifact
//! is unusable no matter how confident the step felt about it.

use std::fmt;

use crate::step::clamp01;

/// Outcome of the quality gate for one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateVerdict {
    pub final_score: f64,
    pub accept: bool,
}

/// Minimum-of-three quality gate.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    pub threshold: f64,
}

impl QualityGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Combine the step's self-score with the validation scores and decide.
    /// The self-score is clamped before comparison.
    pub fn decide(&self, self_score: f64, schema_score: f64, checklist_score: f64) -> GateVerdict {
        let final_score = clamp01(self_score).min(schema_score).min(checklist_score);
        GateVerdict {
            final_score,
            accept: final_score >= self.threshold,
        }
    }
}

/// Why a HITL checkpoint fired.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerReason {
    HighUncertainty { uncertainty: f64, threshold: f64 },
    ModerateUncertainty { uncertainty: f64, threshold: f64 },
    CriticalStep { step: String },
    ScoreNearThreshold { final_score: f64, cutoff: f64 },
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighUncertainty {
                uncertainty,
                threshold,
            } => write!(f, "High uncertainty: {uncertainty:.2} > {threshold:.2}"),
            Self::ModerateUncertainty {
                uncertainty,
                threshold,
            } => write!(f, "Moderate uncertainty: {uncertainty:.2} > {threshold:.2}"),
            Self::CriticalStep { step } => {
                write!(f, "Critical step requiring approval: {step}")
            }
            Self::ScoreNearThreshold { final_score, cutoff } => {
                write!(f, "Score near threshold: {final_score:.2} < {cutoff:.2}")
            }
        }
    }
}

/// Threshold-driven HITL escalation policy.
#[derive(Debug, Clone)]
pub struct HitlPolicy {
    pub quality_threshold: f64,
    pub score_buffer: f64,
    pub ask_threshold: f64,
    pub escalate_threshold: f64,
    pub critical_steps: Vec<String>,
}

impl HitlPolicy {
    /// Decide whether a human must approve before acceptance.
    ///
    /// Rules are evaluated in strict priority order; the first match wins:
    /// 1. uncertainty above the ask threshold
    /// 2. uncertainty above the escalate threshold
    /// 3. step is in the critical set
    /// 4. final score within the buffer of the quality threshold
    pub fn should_trigger(
        &self,
        step_name: &str,
        uncertainty: f64,
        final_score: f64,
    ) -> Option<TriggerReason> {
        let uncertainty = clamp01(uncertainty);
        let final_score = clamp01(final_score);

        if uncertainty > self.ask_threshold {
            return Some(TriggerReason::HighUncertainty {
                uncertainty,
                threshold: self.ask_threshold,
            });
        }
        if uncertainty > self.escalate_threshold {
            return Some(TriggerReason::ModerateUncertainty {
                uncertainty,
                threshold: self.escalate_threshold,
            });
        }
        if self.critical_steps.iter().any(|s| s == step_name) {
            return Some(TriggerReason::CriticalStep {
                step: step_name.to_string(),
            });
        }
        let cutoff = self.quality_threshold + self.score_buffer;
        if final_score < cutoff {
            return Some(TriggerReason::ScoreNearThreshold { final_score, cutoff });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> HitlPolicy {
        HitlPolicy {
            quality_threshold: 0.75,
            score_buffer: 0.05,
            ask_threshold: 0.6,
            escalate_threshold: 0.3,
            critical_steps: vec!["step_06_decision_mapping".to_string()],
        }
    }

    #[test]
    fn final_score_is_minimum_of_three() {
        let gate = QualityGate::new(0.75);
        let v = gate.decide(0.9, 0.8, 0.7);
        assert_eq!(v.final_score, 0.7);
        assert!(v.final_score <= 0.9);
        assert!(v.final_score <= 0.8);
        assert!(v.final_score <= 0.7);
        assert!(!v.accept);
    }

    #[test]
    fn single_failing_dimension_vetoes() {
        let gate = QualityGate::new(0.75);
        let v = gate.decide(1.0, 0.0, 1.0);
        assert_eq!(v.final_score, 0.0);
        assert!(!v.accept);
    }

    #[test]
    fn accepts_at_threshold() {
        let gate = QualityGate::new(0.75);
        assert!(gate.decide(0.75, 1.0, 1.0).accept);
        assert!(!gate.decide(0.7499, 1.0, 1.0).accept);
    }

    #[test]
    fn out_of_range_self_score_is_clamped_before_comparison() {
        let gate = QualityGate::new(0.75);
        let inflated = gate.decide(3.5, 1.0, 1.0);
        let clamped = gate.decide(1.0, 1.0, 1.0);
        assert_eq!(inflated, clamped);

        let negative = gate.decide(-2.0, 1.0, 1.0);
        let floored = gate.decide(0.0, 1.0, 1.0);
        assert_eq!(negative, floored);
    }

    #[test]
    fn high_uncertainty_wins_over_everything() {
        // Perfect score, non-critical step: rule 1 still fires first.
        let reason = policy()
            .should_trigger("step_04_jtbd", 0.7, 1.0)
            .expect("must trigger");
        assert!(matches!(reason, TriggerReason::HighUncertainty { .. }));
        assert!(reason.to_string().contains("High uncertainty"));
    }

    #[test]
    fn moderate_uncertainty_fires_between_thresholds() {
        let reason = policy()
            .should_trigger("step_04_jtbd", 0.45, 1.0)
            .expect("must trigger");
        assert!(matches!(reason, TriggerReason::ModerateUncertainty { .. }));
    }

    #[test]
    fn uncertainty_at_ask_threshold_is_moderate_not_high() {
        let reason = policy()
            .should_trigger("step_04_jtbd", 0.6, 1.0)
            .expect("must trigger");
        assert!(matches!(reason, TriggerReason::ModerateUncertainty { .. }));
    }

    #[test]
    fn critical_step_triggers_regardless_of_score() {
        let reason = policy()
            .should_trigger("step_06_decision_mapping", 0.0, 1.0)
            .expect("must trigger");
        assert!(matches!(reason, TriggerReason::CriticalStep { .. }));
    }

    #[test]
    fn score_near_threshold_triggers() {
        // threshold 0.75 + buffer 0.05 = 0.80; 0.78 passes the gate but is
        // held for review.
        let reason = policy()
            .should_trigger("step_04_jtbd", 0.1, 0.78)
            .expect("must trigger");
        match reason {
            TriggerReason::ScoreNearThreshold { final_score, cutoff } => {
                assert_eq!(final_score, 0.78);
                assert_eq!(cutoff, 0.80);
            }
            other => panic!("Expected ScoreNearThreshold, got {other:?}"),
        }
    }

    #[test]
    fn comfortable_pass_does_not_trigger() {
        assert!(policy().should_trigger("step_04_jtbd", 0.1, 0.95).is_none());
    }

    #[test]
    fn out_of_range_uncertainty_is_clamped() {
        // 7.0 clamps to 1.0, which is above the ask threshold.
        let a = policy().should_trigger("step_04_jtbd", 7.0, 1.0);
        let b = policy().should_trigger("step_04_jtbd", 1.0, 1.0);
        assert_eq!(a, b);

        // -1.0 clamps to 0.0: no uncertainty trigger.
        assert!(policy().should_trigger("step_04_jtbd", -1.0, 0.95).is_none());
    }
}
