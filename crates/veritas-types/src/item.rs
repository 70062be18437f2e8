//! News items entering the pipeline.

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// An authoritative fact-check determination attached to an item by an
/// upstream collaborator (e.g. a fact-check site extractor).
///
/// When present, the decision engine returns this verdict directly and
/// skips heuristic scoring entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    /// The verdict published by the fact-checking source.
    pub verdict: Verdict,
    /// The source's own confidence, in `[0, 1]`.
    pub confidence: f64,
    /// Name or domain of the fact-checking source.
    #[serde(default)]
    pub source: String,
}

/// A candidate news item, the single unit of work for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Stable identifier (often the source URL).
    pub id: String,

    /// Link to the original publication, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Headline text.
    #[serde(default)]
    pub headline: String,

    /// Body text.
    #[serde(default)]
    pub text: String,

    /// URL of an attached image, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Language detected during preprocessing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,

    /// Upstream fact-check result, carried through preprocessing untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_check: Option<FactCheck>,
}

impl NewsItem {
    /// Create a minimal item from id, headline and body text.
    pub fn new(
        id: impl Into<String>,
        headline: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            headline: headline.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// The URL used for source analysis: the link when present, else the id.
    pub fn source_url(&self) -> &str {
        self.link.as_deref().unwrap_or(&self.id)
    }
}
