//! Visual verification of attached imagery.
//!
//! Without an actual vision model this agent applies deterministic
//! URL-level heuristics, which is enough to exercise the decision engine's
//! consistency criterion and keeps runs reproducible.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use veritas_types::{MessageKind, NewsItem, Result, Targets, VisualAnalysis};

use crate::agents::{VisualAnalyzer, ids};
use crate::broker::MessageBroker;

/// Scores image/text consistency and manipulation likelihood for items
/// that carry an image. Items without one are skipped entirely.
pub struct VisualVerifierAgent {
    broker: Arc<MessageBroker>,
}

impl VisualVerifierAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl VisualAnalyzer for VisualVerifierAgent {
    fn analyze_visual(&self, item: &NewsItem) -> Result<Option<VisualAnalysis>> {
        let Some(image_url) = item.image_url.as_deref() else {
            debug!(item_id = %item.id, "no image attached, skipping visual check");
            return Ok(None);
        };

        let lowered = image_url.to_lowercase();
        let mut image_text_consistency: f64 = 0.7;
        let mut deepfake_probability: f64 = 0.1;
        let mut manipulation_probability: f64 = 0.2;

        // Screenshots and memes correlate strongly with recycled imagery.
        if lowered.contains("meme") || lowered.contains("screenshot") {
            manipulation_probability += 0.3;
            image_text_consistency -= 0.2;
        }
        if lowered.ends_with(".gif") {
            manipulation_probability += 0.1;
        }
        // Images hosted on the publishing domain tend to be original.
        if let Some(link) = item.link.as_deref() {
            let same_host = host_of(link)
                .zip(host_of(image_url))
                .is_some_and(|(a, b)| a == b);
            if same_host {
                image_text_consistency += 0.1;
                deepfake_probability -= 0.05;
            }
        }

        let image_text_consistency = image_text_consistency.clamp(0.0, 1.0);
        let deepfake_probability = deepfake_probability.clamp(0.0, 1.0);
        let manipulation_probability = manipulation_probability.clamp(0.0, 1.0);

        let confidence = (image_text_consistency
            - 0.5 * deepfake_probability
            - 0.3 * manipulation_probability)
            .clamp(0.0, 1.0);

        let analysis = VisualAnalysis {
            image_text_consistency,
            deepfake_probability,
            manipulation_probability,
            confidence,
            is_suspicious: confidence < 0.5,
        };

        let message = self.broker.create_message(
            ids::VVA,
            MessageKind::Analysis,
            json!({
                "item_id": item.id,
                "confidence": analysis.confidence,
                "is_suspicious": analysis.is_suspicious,
            }),
            Targets::agents([ids::JA]),
        );
        self.broker.publish(message);

        Ok(Some(analysis))
    }
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    rest.split('/').next().map(|h| h.strip_prefix("www.").unwrap_or(h))
}
