//! Preprocessing: normalization, spam filtering, duplicate suppression.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::json;
use tracing::debug;

use veritas_types::{
    MessageKind, NewsItem, PreprocessOutcome, Preprocessed, Result, Targets,
};

use crate::agents::{Preprocessor, ids};
use crate::broker::MessageBroker;

/// How many recently seen item ids are remembered for duplicate detection.
const RECENT_IDS: usize = 512;

/// Minimum body length below which an item is treated as spam.
const MIN_TEXT_LEN: usize = 50;

/// Normalizes text, rejects spam, suppresses recently seen items, and
/// detects the language. Passes any upstream fact-check through untouched.
pub struct PreprocessAgent {
    broker: Arc<MessageBroker>,
    seen: Mutex<LruCache<String, ()>>,
}

impl PreprocessAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self {
            broker,
            seen: Mutex::new(LruCache::new(
                NonZeroUsize::new(RECENT_IDS).expect("cache size is nonzero"),
            )),
        }
    }

    fn is_duplicate(&self, item: &NewsItem) -> bool {
        let mut seen = self.seen.lock();
        seen.put(item.id.clone(), ()).is_some()
    }

    fn publish_outcome(&self, item: &NewsItem, outcome: PreprocessOutcome, language: &str) {
        let message = self.broker.create_message(
            ids::PP_A,
            MessageKind::Analysis,
            json!({
                "item_id": item.id,
                "outcome": outcome,
                "language": language,
            }),
            Targets::agents([ids::VVA, ids::TCA, ids::STA]),
        );
        self.broker.publish(message);
    }
}

impl Preprocessor for PreprocessAgent {
    fn preprocess(&self, item: &NewsItem) -> Result<Preprocessed> {
        if self.is_duplicate(item) {
            debug!(item_id = %item.id, "duplicate item suppressed");
            self.publish_outcome(item, PreprocessOutcome::Duplicate, "unknown");
            return Ok(Preprocessed {
                outcome: PreprocessOutcome::Duplicate,
                cleaned: item.clone(),
                language: "unknown".into(),
            });
        }

        if is_spam(item) {
            debug!(item_id = %item.id, "item matched spam heuristics");
            self.publish_outcome(item, PreprocessOutcome::Spam, "unknown");
            return Ok(Preprocessed {
                outcome: PreprocessOutcome::Spam,
                cleaned: item.clone(),
                language: "unknown".into(),
            });
        }

        let language = detect_language(&item.text);
        let mut cleaned = item.clone();
        cleaned.headline = normalize_whitespace(&item.headline);
        cleaned.text = normalize_whitespace(&item.text);
        cleaned.detected_language = Some(language.clone());

        self.publish_outcome(&cleaned, PreprocessOutcome::Processed, &language);

        Ok(Preprocessed {
            outcome: PreprocessOutcome::Processed,
            cleaned,
            language,
        })
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cheap spam heuristics over the raw body text.
fn is_spam(item: &NewsItem) -> bool {
    let text = item.text.trim();
    if text.len() < MIN_TEXT_LEN {
        return true;
    }
    if text.matches('!').count() > 5 {
        return true;
    }
    if text.matches("http").count() > 3 {
        return true;
    }
    let lowered = text.to_lowercase();
    if lowered.contains("click here") || lowered.contains("free money") {
        return true;
    }
    let unique_words: std::collections::HashSet<&str> = lowered.split_whitespace().collect();
    unique_words.len() < 10
}

/// Crude language detection over stopword hits. Recognizes Turkish and
/// English; everything else is `unknown`.
fn detect_language(text: &str) -> String {
    const TURKISH: [&str; 8] = ["ve", "bir", "bu", "için", "ile", "olarak", "daha", "çok"];
    const ENGLISH: [&str; 8] = ["the", "and", "is", "of", "to", "in", "that", "for"];

    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let hits = |stopwords: &[&str]| {
        words
            .iter()
            .filter(|w| stopwords.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
            .count()
    };

    let tr = hits(&TURKISH);
    let en = hits(&ENGLISH);
    if tr == 0 && en == 0 {
        "unknown".into()
    } else if tr > en {
        "tr".into()
    } else {
        "en".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> PreprocessAgent {
        PreprocessAgent::new(Arc::new(MessageBroker::new()))
    }

    fn legit_item(id: &str) -> NewsItem {
        NewsItem::new(
            id,
            "Quarterly inflation report released",
            "The statistics office published the quarterly inflation report on \
             Thursday. According to the data, consumer prices rose moderately and \
             the trend is expected to continue for the rest of the year.",
        )
    }

    #[test]
    fn clean_item_is_processed_and_normalized() {
        let agent = agent();
        let mut item = legit_item("001");
        item.text = format!("  {}\n\n extra   spacing ", item.text);

        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Processed);
        assert!(!result.cleaned.text.contains('\n'));
        assert!(!result.cleaned.text.contains("  "));
        assert_eq!(result.language, "en");
        assert_eq!(result.cleaned.detected_language.as_deref(), Some("en"));
    }

    #[test]
    fn short_text_is_spam() {
        let agent = agent();
        let item = NewsItem::new("001", "headline", "too short");
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Spam);
    }

    #[test]
    fn excessive_exclamations_are_spam() {
        let agent = agent();
        let mut item = legit_item("001");
        item.text.push_str(" amazing!!!!!! unbelievable!!!");
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Spam);
    }

    #[test]
    fn link_farms_are_spam() {
        let agent = agent();
        let mut item = legit_item("001");
        item.text.push_str(
            " see http://a.example http://b.example http://c.example http://d.example",
        );
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Spam);
    }

    #[test]
    fn clickbait_phrases_are_spam() {
        let agent = agent();
        let mut item = legit_item("001");
        item.text.push_str(" Click HERE to learn the secret.");
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Spam);
    }

    #[test]
    fn low_vocabulary_is_spam() {
        let agent = agent();
        let item = NewsItem::new(
            "001",
            "headline",
            "buy buy buy buy buy buy buy buy buy buy buy buy buy buy buy buy",
        );
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Spam);
    }

    #[test]
    fn repeated_id_is_duplicate() {
        let agent = agent();
        let item = legit_item("001");
        assert_eq!(
            agent.preprocess(&item).unwrap().outcome,
            PreprocessOutcome::Processed
        );
        assert_eq!(
            agent.preprocess(&item).unwrap().outcome,
            PreprocessOutcome::Duplicate
        );
    }

    #[test]
    fn fact_check_passes_through() {
        let agent = agent();
        let mut item = legit_item("001");
        item.fact_check = Some(veritas_types::FactCheck {
            verdict: veritas_types::Verdict::Fake,
            confidence: 0.95,
            source: "factcheck.example".into(),
        });
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Processed);
        assert!(result.cleaned.fact_check.is_some());
    }

    #[test]
    fn turkish_text_is_detected() {
        let agent = agent();
        let item = NewsItem::new(
            "001",
            "Merkez bankası kararı",
            "Merkez bankası bu hafta faiz kararını açıkladı ve bir süre daha mevcut \
             politikanın devam edeceğini belirtti. Karar için yapılan açıklamada \
             enflasyon verileri ile uyumlu olarak hareket edildiği vurgulandı.",
        );
        let result = agent.preprocess(&item).unwrap();
        assert_eq!(result.outcome, PreprocessOutcome::Processed);
        assert_eq!(result.language, "tr");
    }

    #[test]
    fn outcome_is_published_to_analysis_agents() {
        let broker = Arc::new(MessageBroker::new());
        let agent = PreprocessAgent::new(broker.clone());
        agent.preprocess(&legit_item("001")).unwrap();

        let for_vva = broker.messages_for(ids::VVA, Some(MessageKind::Analysis));
        assert_eq!(for_vva.len(), 1);
        assert_eq!(for_vva[0].agent_id, ids::PP_A);
        assert_eq!(for_vva[0].content["outcome"], "processed");
    }
}
