//! Debate phase: a supporting claim, an opposing challenge, and a
//! rebuttal that weighs the two.
//!
//! The arguments are generated from deterministic templates driven by the
//! content analyses, so debate strength varies with the item instead of
//! being canned.

use std::sync::Arc;

use serde_json::json;

use veritas_types::{
    Argument, MessageKind, NewsItem, Refutation, Result, Stance, Targets,
};

use crate::agents::{AnalysisSet, Arguer, Refuter, ids};
use crate::broker::MessageBroker;

/// Hedging vocabulary that weakens an argument.
const HEDGES: [&str; 4] = ["might", "could", "possibly", "unverified"];

/// Fallacy lexicons keyed by fallacy name.
const FALLACIES: [(&str, &[&str]); 3] = [
    ("appeal to fear", &["terrifying", "dangerous", "catastrophic"]),
    ("hasty generalization", &["always", "never", "everyone knows"]),
    ("appeal to popularity", &["everybody is saying", "obviously", "clearly everyone"]),
];

/// Evidence markers counted when ranking argument support.
const EVIDENCE_MARKERS: [&str; 5] = ["evidence", "data", "source", "according", "published"];

// ── Claim ───────────────────────────────────────────────────────────────

/// Argues the item is genuine, citing whatever the analyses support.
pub struct ClaimAgent {
    broker: Arc<MessageBroker>,
}

impl ClaimAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl Arguer for ClaimAgent {
    fn argue(&self, item: &NewsItem, analyses: &AnalysisSet) -> Result<Argument> {
        let mut parts = vec![format!(
            "The report \"{}\" appears genuine because the account is specific and coherent.",
            item.headline
        )];

        if let Some(source) = &analyses.source {
            if source.source_info.is_verified {
                parts.push(format!(
                    "The source {} is an established outlet with a strong credibility record.",
                    source.source_info.domain
                ));
            }
        }
        if let Some(textual) = &analyses.textual {
            if textual.has_attribution {
                parts.push(
                    "The claims are attributed to named parties, according to the text itself."
                        .into(),
                );
            }
            if textual.inconsistencies.is_empty() {
                parts.push("The headline figures match the body data.".into());
            }
        }
        if let Some(visual) = &analyses.visual {
            if !visual.is_suspicious {
                parts.push("The attached image provides visual evidence consistent with the story.".into());
            }
        }

        let argument = Argument {
            stance: Stance::Supporting,
            text: parts.join(" "),
        };
        publish_argument(&self.broker, ids::CA, item, &argument);
        Ok(argument)
    }
}

// ── Challenge ───────────────────────────────────────────────────────────

/// Argues the item is fabricated, hedging where the analyses give it
/// little to work with.
pub struct ChallengeAgent {
    broker: Arc<MessageBroker>,
}

impl ChallengeAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl Arguer for ChallengeAgent {
    fn argue(&self, item: &NewsItem, analyses: &AnalysisSet) -> Result<Argument> {
        let mut parts = Vec::new();
        let mut grounded = false;

        if let Some(textual) = &analyses.textual {
            if !textual.inconsistencies.is_empty() {
                parts.push(format!(
                    "The headline is not verified by the body: {}.",
                    textual.inconsistencies.join("; ")
                ));
                grounded = true;
            }
            if !textual.manipulation_indicators.is_empty() {
                parts.push(format!(
                    "The language shows {} manipulation patterns, which is proof of intent to mislead.",
                    textual.manipulation_indicators.join(", ")
                ));
                grounded = true;
            }
            if !textual.has_attribution {
                parts.push("No claim in the text is attributed to any source.".into());
                grounded = true;
            }
        }
        if let Some(source) = &analyses.source {
            if !source.source_info.is_verified {
                parts.push(format!(
                    "The outlet {} has no verified credibility record.",
                    source.source_info.domain
                ));
                grounded = true;
            }
        }
        if let Some(visual) = &analyses.visual {
            if visual.is_suspicious {
                parts.push("The attached image shows signs of manipulation.".into());
                grounded = true;
            }
        }

        if !grounded {
            parts.push(format!(
                "The report \"{}\" might be fabricated; key details could possibly be unverified and independent confirmation is missing.",
                item.headline
            ));
        }

        let argument = Argument {
            stance: Stance::Opposing,
            text: parts.join(" "),
        };
        publish_argument(&self.broker, ids::CHA, item, &argument);
        Ok(argument)
    }
}

// ── Refuter ─────────────────────────────────────────────────────────────

/// Weighs the claim against the challenge and produces a rebuttal of the
/// weaker side.
pub struct RefuterAgent {
    broker: Arc<MessageBroker>,
}

impl RefuterAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl Refuter for RefuterAgent {
    fn refute(
        &self,
        claim: &Argument,
        challenge: &Argument,
        _analyses: &AnalysisSet,
    ) -> Result<Refutation> {
        let weaknesses = find_weaknesses(challenge);
        let fallacies = find_fallacies(challenge);
        let evidence = evidence_count(claim);

        let confidence = (0.5
            + 0.10 * weaknesses.len() as f64
            + 0.15 * fallacies.len() as f64
            + 0.05 * evidence as f64)
            .clamp(0.0, 1.0);
        let supports_claim = confidence > 0.5;

        let counter_argument = if supports_claim {
            format!(
                "The challenge does not hold: {}. The supporting argument cites {} distinct evidence markers.",
                weaknesses
                    .iter()
                    .chain(fallacies.iter())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("; "),
                evidence
            )
        } else {
            "The challenge raises concrete, unanswered objections that the supporting argument does not address.".to_string()
        };

        let refutation = Refutation {
            counter_argument,
            weaknesses,
            fallacies,
            confidence,
            supports_claim,
        };

        let message = self.broker.create_message(
            ids::RA,
            MessageKind::Argument,
            json!({
                "confidence": refutation.confidence,
                "supports_claim": refutation.supports_claim,
                "weaknesses": refutation.weaknesses,
                "fallacies": refutation.fallacies,
            }),
            Targets::agents([ids::JA]),
        );
        self.broker.publish(message);

        Ok(refutation)
    }
}

fn publish_argument(broker: &MessageBroker, agent_id: &str, item: &NewsItem, argument: &Argument) {
    let message = broker.create_message(
        agent_id,
        MessageKind::Argument,
        json!({
            "item_id": item.id,
            "stance": argument.stance,
            "text": argument.text,
        }),
        Targets::agents([ids::RA, ids::JA]),
    );
    broker.publish(message);
}

fn find_weaknesses(argument: &Argument) -> Vec<String> {
    let lowered = argument.text.to_lowercase();
    let mut weaknesses = Vec::new();
    if HEDGES.iter().any(|h| lowered.contains(h)) {
        weaknesses.push("speculative language".to_string());
    }
    if !lowered.chars().any(|c| c.is_ascii_digit()) {
        weaknesses.push("no concrete figures".to_string());
    }
    if argument.word_count() < 15 {
        weaknesses.push("thin argumentation".to_string());
    }
    weaknesses
}

fn find_fallacies(argument: &Argument) -> Vec<String> {
    let lowered = argument.text.to_lowercase();
    FALLACIES
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lowered.contains(m)))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn evidence_count(argument: &Argument) -> usize {
    let lowered = argument.text.to_lowercase();
    EVIDENCE_MARKERS
        .iter()
        .filter(|m| lowered.contains(*m))
        .count()
}
