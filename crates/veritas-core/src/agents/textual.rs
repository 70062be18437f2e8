//! Textual context analysis: headline/body consistency, manipulation
//! language, and attribution.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::json;
use tracing::debug;

use veritas_types::{MessageKind, NewsItem, Result, Targets, TextualAnalysis};

use crate::agents::{TextualAnalyzer, ids};
use crate::broker::MessageBroker;

static NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,.]*").expect("static regex compiles"));

static ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(according to|said|stated|reported|announced|confirmed|cited)\b")
        .expect("static regex compiles")
});

/// Emotional-manipulation lexicons, grouped by category name.
const MANIPULATION_LEXICONS: [(&str, &[&str]); 4] = [
    (
        "urgency",
        &["act now", "before it's too late", "immediately", "right now", "hurry"],
    ),
    (
        "fear",
        &["terrifying", "dangerous", "deadly", "catastrophic", "horrifying"],
    ),
    (
        "anger",
        &["outrageous", "disgusting", "betrayed", "scandal", "they lied"],
    ),
    (
        "clickbait",
        &["you won't believe", "shocking", "doctors hate", "one weird trick", "secret"],
    ),
];

/// Checks the body text against the headline and scans for emotional
/// manipulation and missing attribution.
pub struct TextualContextAgent {
    broker: Arc<MessageBroker>,
}

impl TextualContextAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl TextualAnalyzer for TextualContextAgent {
    fn analyze_text(&self, item: &NewsItem) -> Result<TextualAnalysis> {
        let inconsistencies = find_inconsistencies(&item.headline, &item.text);
        let manipulation_indicators = find_manipulation(&item.headline, &item.text);
        let has_attribution = ATTRIBUTION.is_match(&item.text);

        let mut confidence: f64 = 0.8;
        confidence -= 0.15 * inconsistencies.len() as f64;
        confidence -= 0.10 * manipulation_indicators.len() as f64;
        if has_attribution {
            confidence += 0.10;
        }
        let overall_confidence = confidence.clamp(0.0, 1.0);

        debug!(
            item_id = %item.id,
            inconsistencies = inconsistencies.len(),
            indicators = manipulation_indicators.len(),
            has_attribution,
            "text analyzed"
        );

        let analysis = TextualAnalysis {
            inconsistencies,
            manipulation_indicators,
            has_attribution,
            overall_confidence,
            is_suspicious: overall_confidence < 0.5,
        };

        let message = self.broker.create_message(
            ids::TCA,
            MessageKind::Analysis,
            json!({
                "item_id": item.id,
                "overall_confidence": analysis.overall_confidence,
                "is_suspicious": analysis.is_suspicious,
            }),
            Targets::agents([ids::JA]),
        );
        self.broker.publish(message);

        Ok(analysis)
    }
}

/// Numbers that appear in the headline but nowhere in the body.
fn find_inconsistencies(headline: &str, text: &str) -> Vec<String> {
    let body_numbers: HashSet<&str> = NUMBERS.find_iter(text).map(|m| m.as_str()).collect();
    NUMBERS
        .find_iter(headline)
        .map(|m| m.as_str())
        .filter(|n| !body_numbers.contains(n))
        .map(|n| format!("headline figure {n} not found in body"))
        .collect()
}

fn find_manipulation(headline: &str, text: &str) -> Vec<String> {
    let haystack = format!("{} {}", headline, text).to_lowercase();
    MANIPULATION_LEXICONS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| haystack.contains(p)))
        .map(|(category, _)| category.to_string())
        .collect()
}
