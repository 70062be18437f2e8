//! Correction synthesis for items judged FAKE.

use std::sync::Arc;

use serde_json::json;

use veritas_types::{
    Correction, Decision, MessageKind, NewsItem, Result, Targets, Verdict, VeritasError,
};

use crate::agents::{Corrector, JudgeInput, ids};
use crate::broker::MessageBroker;

/// Produces a reader-facing correction: what was claimed, why it is
/// considered false, and what to watch for next time.
pub struct CorrectionAgent {
    broker: Arc<MessageBroker>,
}

impl CorrectionAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl Corrector for CorrectionAgent {
    fn correct(
        &self,
        item: &NewsItem,
        decision: &Decision,
        input: &JudgeInput,
    ) -> Result<Correction> {
        if decision.verdict != Verdict::Fake {
            return Err(VeritasError::agent(
                ids::COA,
                format!("corrections apply only to FAKE verdicts, got {}", decision.verdict),
            ));
        }

        let red_flags = collect_red_flags(input);
        let explanation = build_explanation(decision, &red_flags);

        let correction = Correction {
            original_claim: item.headline.clone(),
            corrected_headline: format!("[CORRECTED] {}", item.headline),
            explanation,
            educational_tips: vec![
                "Check whether the claim is attributed to a named, reachable source.".into(),
                "Compare figures in the headline against the body of the article.".into(),
                "Be wary of urgency and outrage language; it substitutes for evidence.".into(),
                "Search for the same story on an established wire service.".into(),
            ],
            red_flags,
        };

        // Corrections concern every agent; broadcast rather than target.
        let message = self.broker.create_message(
            ids::COA,
            MessageKind::Feedback,
            json!({
                "item_id": item.id,
                "original_claim": correction.original_claim,
                "corrected_headline": correction.corrected_headline,
            }),
            Targets::All,
        );
        self.broker.broadcast(message);

        Ok(correction)
    }
}

fn collect_red_flags(input: &JudgeInput) -> Vec<String> {
    let mut flags = Vec::new();
    if let Some(textual) = &input.analyses.textual {
        for inconsistency in &textual.inconsistencies {
            flags.push(inconsistency.clone());
        }
        for indicator in &textual.manipulation_indicators {
            flags.push(format!("{indicator} language"));
        }
        if !textual.has_attribution {
            flags.push("no source attribution".into());
        }
    }
    if let Some(source) = &input.analyses.source {
        if !source.source_info.is_verified {
            flags.push(format!(
                "unverified outlet {}",
                source.source_info.domain
            ));
        }
    }
    if let Some(visual) = &input.analyses.visual {
        if visual.is_suspicious {
            flags.push("suspicious imagery".into());
        }
    }
    flags
}

fn build_explanation(decision: &Decision, red_flags: &[String]) -> String {
    let mut explanation = format!(
        "This item was judged FAKE with confidence {:.2}. {}",
        decision.confidence, decision.rationale
    );
    if !red_flags.is_empty() {
        explanation.push_str(&format!(" Red flags: {}.", red_flags.join("; ")));
    }
    explanation
}
