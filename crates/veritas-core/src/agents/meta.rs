//! Meta evaluation: audits a decision for bias, miscalibration, and
//! error patterns across the analyses.

use std::sync::Arc;

use serde_json::json;

use veritas_types::{
    Decision, Finding, MessageKind, MetaEvaluation, MetaRecommendation, Result, Severity,
    Targets, Verdict,
};

use crate::agents::{JudgeInput, MetaEvaluator, ids};
use crate::broker::MessageBroker;

/// Reviews decisions after the fact and feeds findings back to the judge.
pub struct MetaEvaluatorAgent {
    broker: Arc<MessageBroker>,
}

impl MetaEvaluatorAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl MetaEvaluator for MetaEvaluatorAgent {
    fn evaluate(&self, decision: &Decision, input: &JudgeInput) -> Result<MetaEvaluation> {
        let biases = detect_biases(decision);
        let error_patterns = detect_error_patterns(decision, input);
        let calibration_score = calibration(decision);

        let improvements: Vec<String> = biases
            .iter()
            .chain(error_patterns.iter())
            .map(|f| format!("address {}: {}", f.kind, f.description))
            .collect();

        let overall_quality = (calibration_score
            - 0.10 * biases.len() as f64
            - 0.10 * error_patterns.len() as f64)
            .clamp(0.0, 1.0);

        let has_high = biases
            .iter()
            .chain(error_patterns.iter())
            .any(|f| f.severity == Severity::High);
        let recommendation = if has_high || overall_quality < 0.5 {
            MetaRecommendation::Reject
        } else if !biases.is_empty() || !error_patterns.is_empty() {
            MetaRecommendation::Review
        } else {
            MetaRecommendation::Accept
        };

        let evaluation = MetaEvaluation {
            biases,
            error_patterns,
            calibration_score,
            improvements,
            recommendation,
            overall_quality,
        };

        let message = self.broker.create_message(
            ids::MEA,
            MessageKind::Feedback,
            json!({
                "recommendation": evaluation.recommendation,
                "overall_quality": evaluation.overall_quality,
                "calibration_score": evaluation.calibration_score,
            }),
            Targets::agents([ids::JA]),
        );
        self.broker.publish(message);

        Ok(evaluation)
    }
}

fn detect_biases(decision: &Decision) -> Vec<Finding> {
    let mut biases = Vec::new();
    if decision.confidence > 0.9 && decision.verdict != Verdict::Unsure {
        biases.push(Finding {
            kind: "overconfidence".into(),
            severity: Severity::Medium,
            description: format!(
                "confidence {:.2} leaves no room for the uncertainty the analyses carry",
                decision.confidence
            ),
        });
    }
    if let Some(scores) = &decision.criteria_scores {
        let arr = scores.as_array();
        let max = arr.iter().cloned().fold(f64::MIN, f64::max);
        let min = arr.iter().cloned().fold(f64::MAX, f64::min);
        if max - min > 0.5 {
            biases.push(Finding {
                kind: "criterion_imbalance".into(),
                severity: Severity::Medium,
                description: format!(
                    "criterion spread {:.2} means one signal dominates the verdict",
                    max - min
                ),
            });
        }
    }
    biases
}

fn detect_error_patterns(decision: &Decision, input: &JudgeInput) -> Vec<Finding> {
    let mut patterns = Vec::new();
    if let (Some(visual), Some(textual)) = (&input.analyses.visual, &input.analyses.textual) {
        let gap = (visual.confidence - textual.overall_confidence).abs();
        if gap > 0.4 {
            patterns.push(Finding {
                kind: "contradictory_analyses".into(),
                severity: Severity::High,
                description: format!(
                    "visual and textual confidence disagree by {gap:.2}"
                ),
            });
        }
    }
    if decision.verdict != Verdict::Unsure && decision.confidence < 0.5 {
        patterns.push(Finding {
            kind: "low_confidence_definitive".into(),
            severity: Severity::High,
            description: "definitive verdict issued below 0.5 confidence".into(),
        });
    }
    patterns
}

/// Narrow intervals indicate well-calibrated criteria agreement.
fn calibration(decision: &Decision) -> f64 {
    let width = decision.confidence_interval.width();
    if width > 0.4 {
        0.6
    } else if width > 0.2 {
        0.8
    } else {
        0.9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_types::{ConfidenceInterval, CriteriaScores, TextualAnalysis, VisualAnalysis};

    fn agent() -> MetaEvaluatorAgent {
        MetaEvaluatorAgent::new(Arc::new(MessageBroker::new()))
    }

    fn decision(verdict: Verdict, confidence: f64, lower: f64, upper: f64) -> Decision {
        Decision {
            verdict,
            confidence,
            confidence_interval: ConfidenceInterval::new(lower, upper),
            criteria_scores: Some(CriteriaScores {
                evidence_strength: 0.7,
                source_credibility: 0.7,
                argument_quality: 0.6,
                consistency_score: 0.65,
            }),
            weights: None,
            rationale: String::new(),
        }
    }

    #[test]
    fn balanced_decision_is_accepted() {
        let d = decision(Verdict::Real, 0.72, 0.62, 0.78);
        let eval = agent().evaluate(&d, &JudgeInput::default()).unwrap();
        assert!(eval.biases.is_empty());
        assert!(eval.error_patterns.is_empty());
        assert_eq!(eval.recommendation, MetaRecommendation::Accept);
        assert!((eval.calibration_score - 0.9).abs() < 1e-9);
        assert!((eval.overall_quality - 0.9).abs() < 1e-9);
    }

    #[test]
    fn overconfidence_is_flagged_for_review() {
        let d = decision(Verdict::Real, 0.95, 0.72, 0.88);
        let eval = agent().evaluate(&d, &JudgeInput::default()).unwrap();
        assert!(eval.biases.iter().any(|f| f.kind == "overconfidence"));
        assert_eq!(eval.recommendation, MetaRecommendation::Review);
        assert!(!eval.improvements.is_empty());
    }

    #[test]
    fn criterion_imbalance_is_flagged() {
        let mut d = decision(Verdict::Real, 0.7, 0.45, 0.95);
        d.criteria_scores = Some(CriteriaScores {
            evidence_strength: 0.95,
            source_credibility: 0.3,
            argument_quality: 0.7,
            consistency_score: 0.7,
        });
        let eval = agent().evaluate(&d, &JudgeInput::default()).unwrap();
        assert!(eval.biases.iter().any(|f| f.kind == "criterion_imbalance"));
    }

    #[test]
    fn contradictory_analyses_cause_rejection() {
        let d = decision(Verdict::Real, 0.7, 0.6, 0.8);
        let input = JudgeInput {
            analyses: crate::agents::AnalysisSet {
                visual: Some(VisualAnalysis {
                    image_text_consistency: 0.9,
                    deepfake_probability: 0.0,
                    manipulation_probability: 0.0,
                    confidence: 0.9,
                    is_suspicious: false,
                }),
                textual: Some(TextualAnalysis {
                    inconsistencies: vec![],
                    manipulation_indicators: vec![],
                    has_attribution: false,
                    overall_confidence: 0.3,
                    is_suspicious: true,
                }),
                source: None,
            },
            ..JudgeInput::default()
        };
        let eval = agent().evaluate(&d, &input).unwrap();
        assert!(
            eval.error_patterns
                .iter()
                .any(|f| f.kind == "contradictory_analyses")
        );
        assert_eq!(eval.recommendation, MetaRecommendation::Reject);
    }

    #[test]
    fn low_confidence_definitive_verdict_is_rejected() {
        let d = decision(Verdict::Fake, 0.4, 0.2, 0.7);
        let eval = agent().evaluate(&d, &JudgeInput::default()).unwrap();
        assert!(
            eval.error_patterns
                .iter()
                .any(|f| f.kind == "low_confidence_definitive")
        );
        assert_eq!(eval.recommendation, MetaRecommendation::Reject);
    }

    #[test]
    fn wide_interval_lowers_calibration() {
        let d = decision(Verdict::Unsure, 0.55, 0.2, 0.9);
        let eval = agent().evaluate(&d, &JudgeInput::default()).unwrap();
        assert!((eval.calibration_score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn feedback_is_published() {
        let broker = Arc::new(MessageBroker::new());
        let agent = MetaEvaluatorAgent::new(broker.clone());
        let d = decision(Verdict::Real, 0.72, 0.62, 0.78);
        agent.evaluate(&d, &JudgeInput::default()).unwrap();
        assert_eq!(
            broker.messages_for(ids::JA, Some(MessageKind::Feedback)).len(),
            1
        );
    }
}
