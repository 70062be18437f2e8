//! Agent roles and their concrete implementations.
//!
//! Every pipeline stage is a small trait with exactly one operation, so the
//! orchestrator holds `Arc<dyn Trait>` fields and tests can swap any stage
//! for a stub. Concrete agents get a shared [`MessageBroker`](crate::broker::MessageBroker)
//! handle at construction and publish their findings as they produce them.

pub mod correction;
pub mod debate;
pub mod meta;
pub mod preprocess;
pub mod source;
pub mod textual;
pub mod visual;

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use veritas_types::{
    Argument, Correction, Decision, MetaEvaluation, NewsItem, Preprocessed, Refutation, Result,
    SourceAnalysis, TextualAnalysis, VisualAnalysis,
};

pub use correction::CorrectionAgent;
pub use debate::{ChallengeAgent, ClaimAgent, RefuterAgent};
pub use meta::MetaEvaluatorAgent;
pub use preprocess::PreprocessAgent;
pub use source::SourceTrackerAgent;
pub use textual::TextualContextAgent;
pub use visual::VisualVerifierAgent;

/// Well-known agent identifiers used as broker addresses and metrics keys.
pub mod ids {
    /// Item crawler / source feed.
    pub const CRA: &str = "CRA";
    /// Source tracker.
    pub const STA: &str = "STA";
    /// Preprocessor.
    pub const PP_A: &str = "PP-A";
    /// Visual verifier.
    pub const VVA: &str = "VVA";
    /// Textual context analyzer.
    pub const TCA: &str = "TCA";
    /// Claim (supporting) debater.
    pub const CA: &str = "CA";
    /// Challenge (opposing) debater.
    pub const CHA: &str = "CHA";
    /// Refuter.
    pub const RA: &str = "RA";
    /// Judge.
    pub const JA: &str = "JA";
    /// Meta evaluator.
    pub const MEA: &str = "MEA";
    /// Correction agent.
    pub const COA: &str = "COA";
}

// ── Role traits ─────────────────────────────────────────────────────────

/// Supplies candidate items when the caller has none of its own.
pub trait ItemSource: Send + Sync {
    /// Next candidate item, or `None` when the source is exhausted.
    fn fetch(&self) -> Result<Option<NewsItem>>;
}

/// Normalizes an item and filters spam and duplicates.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, item: &NewsItem) -> Result<Preprocessed>;
}

/// Extracts and scores the publishing source.
pub trait SourceAnalyzer: Send + Sync {
    fn analyze_source(&self, item: &NewsItem) -> Result<SourceAnalysis>;
}

/// Checks attached imagery. Returns `Ok(None)` for items without an image.
pub trait VisualAnalyzer: Send + Sync {
    fn analyze_visual(&self, item: &NewsItem) -> Result<Option<VisualAnalysis>>;
}

/// Checks headline/body consistency and manipulation language.
pub trait TextualAnalyzer: Send + Sync {
    fn analyze_text(&self, item: &NewsItem) -> Result<TextualAnalysis>;
}

/// Produces one side of the debate.
pub trait Arguer: Send + Sync {
    fn argue(&self, item: &NewsItem, analyses: &AnalysisSet) -> Result<Argument>;
}

/// Weighs both debate arguments and produces a rebuttal.
pub trait Refuter: Send + Sync {
    fn refute(
        &self,
        claim: &Argument,
        challenge: &Argument,
        analyses: &AnalysisSet,
    ) -> Result<Refutation>;
}

/// The decision engine.
pub trait Decider: Send + Sync {
    fn decide(&self, input: &JudgeInput) -> Result<Decision>;
}

/// Audits a decision for biases and calibration problems.
pub trait MetaEvaluator: Send + Sync {
    fn evaluate(&self, decision: &Decision, input: &JudgeInput) -> Result<MetaEvaluation>;
}

/// Produces a correction artifact for items judged FAKE.
pub trait Corrector: Send + Sync {
    fn correct(&self, item: &NewsItem, decision: &Decision, input: &JudgeInput)
    -> Result<Correction>;
}

// ── Shared inputs ───────────────────────────────────────────────────────

/// The content-analysis outputs available downstream. Each field is
/// optional because a stage may legitimately produce nothing (no image)
/// or the orchestrator may run a reduced pipeline in tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisSet {
    /// Visual verification, absent for text-only items.
    pub visual: Option<VisualAnalysis>,
    /// Textual context analysis.
    pub textual: Option<TextualAnalysis>,
    /// Source credibility analysis.
    pub source: Option<SourceAnalysis>,
}

/// Everything the decision engine may consider. All fields are optional;
/// the judge substitutes neutral defaults for whatever is missing.
#[derive(Debug, Clone, Default)]
pub struct JudgeInput {
    /// The item under judgment.
    pub item: Option<NewsItem>,
    /// The supporting argument.
    pub claim: Option<Argument>,
    /// The opposing argument.
    pub challenge: Option<Argument>,
    /// The rebuttal over both arguments.
    pub refutation: Option<Refutation>,
    /// Content-analysis outputs.
    pub analyses: AnalysisSet,
}

impl JudgeInput {
    /// Input carrying only the item itself.
    pub fn for_item(item: NewsItem) -> Self {
        Self {
            item: Some(item),
            ..Self::default()
        }
    }
}

// ── Built-in item source ────────────────────────────────────────────────

/// Deterministic in-memory item source for demos and tests. Cycles
/// through a fixed sample set and never exhausts.
pub struct MockSource {
    samples: Vec<NewsItem>,
    cursor: AtomicUsize,
}

impl MockSource {
    /// Source over the built-in sample items.
    pub fn new() -> Self {
        Self::with_items(sample_items())
    }

    /// Source over a caller-provided sample set.
    pub fn with_items(samples: Vec<NewsItem>) -> Self {
        Self {
            samples,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemSource for MockSource {
    fn fetch(&self) -> Result<Option<NewsItem>> {
        if self.samples.is_empty() {
            return Ok(None);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.samples.len();
        Ok(Some(self.samples[i].clone()))
    }
}

fn sample_items() -> Vec<NewsItem> {
    vec![
        NewsItem {
            id: "001".into(),
            link: Some("https://nasa.gov/mars-discovery".into()),
            headline: "NASA confirms evidence of ancient water flows on Mars".into(),
            text: "Scientists at NASA announced today that rover data shows mineral \
                   deposits consistent with long-standing surface water on ancient Mars. \
                   The findings, published after peer review, are based on two years of \
                   spectrometry data collected in Jezero crater."
                .into(),
            image_url: Some("https://nasa.gov/images/mars-delta.jpg".into()),
            detected_language: None,
            fact_check: None,
        },
        NewsItem {
            id: "002".into(),
            link: Some("https://dailybuzz.example/miracle-cure".into()),
            headline: "SHOCKING miracle cure doctors don't want you to know!!!".into(),
            text: "Click here now! This one weird trick will change your life forever. \
                   Act now before they take this down! Free money awaits those who share \
                   this with ten friends immediately!!!"
                .into(),
            image_url: None,
            detected_language: None,
            fact_check: None,
        },
        NewsItem {
            id: "003".into(),
            link: Some("https://reuters.com/markets-report".into()),
            headline: "Central bank holds interest rates steady for third quarter".into(),
            text: "The central bank kept its benchmark rate unchanged on Thursday, \
                   citing stable inflation data. According to the official statement, \
                   policymakers expect to revisit the decision at the next quarterly \
                   meeting based on employment figures."
                .into(),
            image_url: None,
            detected_language: None,
            fact_check: None,
        },
    ]
}
