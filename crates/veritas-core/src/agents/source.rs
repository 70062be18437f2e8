//! Source tracking: domain extraction and credibility scoring.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use veritas_types::{
    MessageKind, NewsItem, Result, SourceAnalysis, SourceInfo, SourceType, Targets,
};

use crate::agents::{SourceAnalyzer, ids};
use crate::broker::MessageBroker;

/// Credibility prior for domains not in the trusted table.
const DEFAULT_CREDIBILITY: f64 = 0.65;

/// Credibility above which a source counts as verified.
const VERIFIED_BAR: f64 = 0.7;

/// Known-domain credibility priors.
const TRUSTED_DOMAINS: [(&str, f64); 10] = [
    ("reuters.com", 0.95),
    ("apnews.com", 0.95),
    ("bbc.com", 0.95),
    ("nasa.gov", 0.95),
    ("nature.com", 0.92),
    ("nytimes.com", 0.88),
    ("theguardian.com", 0.87),
    ("aa.com.tr", 0.85),
    ("medium.com", 0.50),
    ("twitter.com", 0.30),
];

/// Extracts the publishing domain from the item's URL and scores its
/// credibility and authority.
pub struct SourceTrackerAgent {
    broker: Arc<MessageBroker>,
}

impl SourceTrackerAgent {
    pub fn new(broker: Arc<MessageBroker>) -> Self {
        Self { broker }
    }
}

impl SourceAnalyzer for SourceTrackerAgent {
    fn analyze_source(&self, item: &NewsItem) -> Result<SourceAnalysis> {
        let url = item.source_url();
        let domain = extract_domain(url);
        let credibility = credibility_for(&domain);
        let source_type = classify(&domain);
        let authority_score = (credibility * type_weight(source_type)).clamp(0.0, 1.0);

        debug!(item_id = %item.id, %domain, credibility, "source analyzed");

        let analysis = SourceAnalysis {
            source_info: SourceInfo {
                domain: domain.clone(),
                url: url.to_string(),
                credibility_score: credibility,
                source_type,
                is_verified: credibility > VERIFIED_BAR,
            },
            authority_score,
        };

        let message = self.broker.create_message(
            ids::STA,
            MessageKind::Analysis,
            json!({
                "item_id": item.id,
                "domain": domain,
                "credibility_score": credibility,
                "authority_score": authority_score,
            }),
            Targets::agents([ids::PP_A, ids::TCA, ids::JA]),
        );
        self.broker.publish(message);

        Ok(analysis)
    }
}

/// Lowercased registered host without scheme, path, port, or `www.` prefix.
/// Non-URL input yields an empty domain.
fn extract_domain(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("");
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.contains('.') { host.to_string() } else { String::new() }
}

fn credibility_for(domain: &str) -> f64 {
    TRUSTED_DOMAINS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_CREDIBILITY)
}

fn classify(domain: &str) -> SourceType {
    if domain.is_empty() {
        return SourceType::Unknown;
    }
    let social = ["twitter.com", "x.com", "facebook.com", "t.me", "tiktok.com"];
    if social.contains(&domain) {
        return SourceType::SocialMedia;
    }
    let blogs = ["medium.com", "substack.com", "wordpress.com", "blogspot.com"];
    if blogs.contains(&domain) || domain.starts_with("blog.") {
        return SourceType::Blog;
    }
    if domain.ends_with(".gov") || domain.ends_with(".edu") || domain.ends_with(".org") {
        return SourceType::EstablishedMedia;
    }
    if credibility_for(domain) > VERIFIED_BAR {
        return SourceType::NewsAgency;
    }
    SourceType::Unknown
}

fn type_weight(source_type: SourceType) -> f64 {
    match source_type {
        SourceType::NewsAgency => 1.0,
        SourceType::EstablishedMedia => 0.9,
        SourceType::Blog => 0.5,
        SourceType::SocialMedia => 0.3,
        SourceType::Unknown => 0.4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> SourceTrackerAgent {
        SourceTrackerAgent::new(Arc::new(MessageBroker::new()))
    }

    fn item_with_link(link: &str) -> NewsItem {
        NewsItem {
            link: Some(link.into()),
            ..NewsItem::new("001", "h", "t")
        }
    }

    #[test]
    fn domain_extraction_strips_scheme_www_and_path() {
        assert_eq!(
            extract_domain("https://www.bbc.com/news/article?id=1"),
            "bbc.com"
        );
        assert_eq!(extract_domain("http://reuters.com:8080/x"), "reuters.com");
        assert_eq!(extract_domain("not a url"), "");
    }

    #[test]
    fn trusted_domain_is_verified_news_agency() {
        let analysis = agent()
            .analyze_source(&item_with_link("https://reuters.com/story"))
            .unwrap();
        assert_eq!(analysis.source_info.credibility_score, 0.95);
        assert_eq!(analysis.source_info.source_type, SourceType::NewsAgency);
        assert!(analysis.source_info.is_verified);
        assert!((analysis.authority_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn gov_domain_is_established_media() {
        let analysis = agent()
            .analyze_source(&item_with_link("https://nasa.gov/mars"))
            .unwrap();
        assert_eq!(
            analysis.source_info.source_type,
            SourceType::EstablishedMedia
        );
        assert!((analysis.authority_score - 0.95 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn unknown_domain_gets_default_prior() {
        let analysis = agent()
            .analyze_source(&item_with_link("https://obscure-site.example/post"))
            .unwrap();
        assert_eq!(analysis.source_info.credibility_score, DEFAULT_CREDIBILITY);
        assert_eq!(analysis.source_info.source_type, SourceType::Unknown);
        assert!(!analysis.source_info.is_verified);
        assert!((analysis.authority_score - DEFAULT_CREDIBILITY * 0.4).abs() < 1e-9);
    }

    #[test]
    fn social_media_is_down_weighted() {
        let analysis = agent()
            .analyze_source(&item_with_link("https://twitter.com/someone/status/1"))
            .unwrap();
        assert_eq!(analysis.source_info.source_type, SourceType::SocialMedia);
        assert!((analysis.authority_score - 0.30 * 0.3).abs() < 1e-9);
    }

    #[test]
    fn missing_link_falls_back_to_id() {
        let item = NewsItem::new("https://bbc.com/x", "h", "t");
        let analysis = agent().analyze_source(&item).unwrap();
        assert_eq!(analysis.source_info.domain, "bbc.com");
    }

    #[test]
    fn analysis_is_published_to_judge() {
        let broker = Arc::new(MessageBroker::new());
        let agent = SourceTrackerAgent::new(broker.clone());
        agent
            .analyze_source(&item_with_link("https://bbc.com/news"))
            .unwrap();
        let messages = broker.messages_for(ids::JA, Some(MessageKind::Analysis));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content["domain"], "bbc.com");
    }
}
