//! Pipeline orchestration: fixed phase sequence, timing, result assembly.
//!
//! The orchestrator owns one handle to every agent role as an `Arc<dyn
//! Trait>` field, so any stage can be swapped for a stub in tests. Phases
//! run in a fixed order; spam and duplicate items short-circuit after
//! preprocessing, and the correction phase runs only for FAKE verdicts.
//!
//! Every agent call and every phase is timed into the shared
//! [`MetricsCollector`], and a pipeline record is emitted whether the run
//! succeeds or an agent fails.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use veritas_types::{
    Correction, Decision, MetaEvaluation, NewsItem, PreprocessOutcome, Preprocessed, Result,
    ThresholdPolicy, Verdict, VeritasError,
};

use crate::agents::{
    AnalysisSet, Arguer, ChallengeAgent, ClaimAgent, CorrectionAgent, Corrector, Decider,
    ItemSource, JudgeInput, MetaEvaluator, MetaEvaluatorAgent, MockSource, PreprocessAgent,
    Preprocessor, RefuterAgent, Refuter, SourceAnalyzer, SourceTrackerAgent, TextualAnalyzer,
    TextualContextAgent, VisualAnalyzer, VisualVerifierAgent, ids,
};
use crate::broker::MessageBroker;
use crate::judge::JudgeAgent;
use crate::metrics::{MetricsCollector, MetricsSummary, PipelineRecord};

/// Phase names, in execution order. Also the metrics keys.
pub mod phases {
    pub const DATA_COLLECTION: &str = "data_collection";
    pub const CONTENT_ANALYSIS: &str = "content_analysis";
    pub const DEBATE: &str = "debate";
    pub const DECISION_MAKING: &str = "decision_making";
    pub const CORRECTION: &str = "correction";
}

/// How many completed results are retained for lookup by item id.
const RESULT_CACHE_SIZE: usize = 256;

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// All phases ran and a verdict was reached.
    Completed,
    /// Preprocessing classified the item as spam.
    Spam,
    /// Preprocessing suppressed a recently seen item.
    Duplicate,
}

/// Everything a finished run produced, phase by phase. Early exits leave
/// the later fields empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseOutputs {
    /// Preprocessing output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessed: Option<Preprocessed>,
    /// Content-analysis outputs.
    pub analyses: AnalysisSet,
    /// The supporting argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<veritas_types::Argument>,
    /// The opposing argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<veritas_types::Argument>,
    /// The rebuttal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refutation: Option<veritas_types::Refutation>,
    /// The judge's decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// The meta-evaluation of the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaEvaluation>,
    /// The correction, for FAKE verdicts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<Correction>,
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// How the run ended.
    pub status: PipelineStatus,
    /// The item as it entered the pipeline (normalized for completed runs).
    pub item: NewsItem,
    /// Final verdict (UNSURE for early exits).
    pub verdict: Verdict,
    /// Decision confidence (0.0 for early exits).
    pub confidence: f64,
    /// Wall-clock duration of the run.
    #[serde(rename = "total_time", with = "crate::metrics::duration_secs")]
    pub total: Duration,
    /// Per-phase outputs.
    pub phases: PhaseOutputs,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate view over the retained completed results.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    /// Results currently retained.
    pub retained_results: usize,
    /// Retained results per verdict.
    pub verdict_distribution: BTreeMap<String, u64>,
    /// Mean wall-clock duration of the retained runs (zero when none).
    #[serde(
        rename = "average_processing_time",
        with = "crate::metrics::duration_secs"
    )]
    pub average_duration: Duration,
}

/// Coordinates the fixed agent pipeline over single items.
pub struct Orchestrator {
    /// Item source used when the caller supplies no item.
    pub source: Arc<dyn ItemSource>,
    /// Preprocessing stage.
    pub preprocessor: Arc<dyn Preprocessor>,
    /// Source credibility stage.
    pub source_analyzer: Arc<dyn SourceAnalyzer>,
    /// Visual verification stage.
    pub visual: Arc<dyn VisualAnalyzer>,
    /// Textual context stage.
    pub textual: Arc<dyn TextualAnalyzer>,
    /// Supporting debater.
    pub claim: Arc<dyn Arguer>,
    /// Opposing debater.
    pub challenge: Arc<dyn Arguer>,
    /// Rebuttal stage.
    pub refuter: Arc<dyn Refuter>,
    /// Decision engine.
    pub judge: Arc<dyn Decider>,
    /// Decision auditor.
    pub meta: Arc<dyn MetaEvaluator>,
    /// Correction synthesizer.
    pub corrector: Arc<dyn Corrector>,

    broker: Arc<MessageBroker>,
    metrics: Arc<MetricsCollector>,
    results: Mutex<LruCache<String, PipelineResult>>,
}

impl Orchestrator {
    /// Wire the default agents to the given broker and metrics collector.
    pub fn new(
        broker: Arc<MessageBroker>,
        metrics: Arc<MetricsCollector>,
        policy: ThresholdPolicy,
    ) -> Self {
        Self {
            source: Arc::new(MockSource::new()),
            preprocessor: Arc::new(PreprocessAgent::new(broker.clone())),
            source_analyzer: Arc::new(SourceTrackerAgent::new(broker.clone())),
            visual: Arc::new(VisualVerifierAgent::new(broker.clone())),
            textual: Arc::new(TextualContextAgent::new(broker.clone())),
            claim: Arc::new(ClaimAgent::new(broker.clone())),
            challenge: Arc::new(ChallengeAgent::new(broker.clone())),
            refuter: Arc::new(RefuterAgent::new(broker.clone())),
            judge: Arc::new(JudgeAgent::new(broker.clone()).with_policy(policy)),
            meta: Arc::new(MetaEvaluatorAgent::new(broker.clone())),
            corrector: Arc::new(CorrectionAgent::new(broker.clone())),
            broker,
            metrics,
            results: Mutex::new(LruCache::new(
                NonZeroUsize::new(RESULT_CACHE_SIZE).expect("cache size is nonzero"),
            )),
        }
    }

    /// Replace the item source.
    pub fn with_source(mut self, source: Arc<dyn ItemSource>) -> Self {
        self.source = source;
        self
    }

    /// The shared broker.
    pub fn broker(&self) -> &Arc<MessageBroker> {
        &self.broker
    }

    /// Run the full pipeline over `item`, or over the next item from the
    /// configured source when `None`.
    ///
    /// A pipeline record is emitted even when an agent fails; the error is
    /// then propagated to the caller.
    pub fn process_item(&self, item: Option<NewsItem>) -> Result<PipelineResult> {
        let started = Instant::now();
        let mut trace = RunTrace::default();

        let outcome = self.run_phases(item, &mut trace);

        let (verdict, success) = match &outcome {
            Ok(result) => (result.verdict, true),
            Err(e) => {
                warn!(item_id = %trace.item_id, error = %e, "pipeline run failed");
                (Verdict::Unsure, false)
            }
        };
        self.metrics.record_pipeline(PipelineRecord {
            item_id: trace.item_id.clone(),
            verdict,
            total: started.elapsed(),
            phase_durations: trace.phase_durations.clone(),
            success,
            timestamp: Utc::now(),
        });

        let result = outcome?;
        // Only completed runs are retained; a later spam or duplicate exit
        // for the same id must not displace a real verdict.
        if result.status == PipelineStatus::Completed {
            self.results
                .lock()
                .put(result.item.id.clone(), result.clone());
        }
        Ok(result)
    }

    /// The retained result for `item_id`, when still cached.
    pub fn result_for(&self, item_id: &str) -> Option<PipelineResult> {
        self.results.lock().get(item_id).cloned()
    }

    /// Aggregate counts and mean duration over the retained results.
    pub fn statistics(&self) -> OrchestratorStats {
        let results = self.results.lock();
        let mut verdict_distribution = BTreeMap::new();
        let mut total = Duration::ZERO;
        for (_, result) in results.iter() {
            *verdict_distribution
                .entry(result.verdict.to_string())
                .or_insert(0) += 1;
            total += result.total;
        }
        let average_duration = match results.len() {
            0 => Duration::ZERO,
            n => total / n as u32,
        };
        OrchestratorStats {
            retained_results: results.len(),
            verdict_distribution,
            average_duration,
        }
    }

    /// The shared metrics collector's summary.
    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    // ── Phases ──────────────────────────────────────────────────────────

    fn run_phases(
        &self,
        item: Option<NewsItem>,
        trace: &mut RunTrace,
    ) -> Result<PipelineResult> {
        let run_started = Instant::now();

        // Phase 1: data collection, source tracking, preprocessing.
        let phase_started = Instant::now();
        let item = match item {
            Some(item) => item,
            None => self
                .timed(ids::CRA, || self.source.fetch())?
                .ok_or_else(|| VeritasError::agent(ids::CRA, "item source exhausted"))?,
        };
        trace.item_id.clone_from(&item.id);
        info!(item_id = %item.id, "pipeline started");

        let source_analysis =
            self.timed(ids::STA, || self.source_analyzer.analyze_source(&item))?;
        let preprocessed = self.timed(ids::PP_A, || self.preprocessor.preprocess(&item))?;
        trace.finish_phase(phases::DATA_COLLECTION, phase_started);

        match preprocessed.outcome {
            PreprocessOutcome::Spam => {
                info!(item_id = %item.id, "item rejected as spam");
                return Ok(early_exit(
                    PipelineStatus::Spam,
                    item,
                    preprocessed,
                    run_started,
                ));
            }
            PreprocessOutcome::Duplicate => {
                info!(item_id = %item.id, "duplicate item skipped");
                return Ok(early_exit(
                    PipelineStatus::Duplicate,
                    item,
                    preprocessed,
                    run_started,
                ));
            }
            PreprocessOutcome::Processed => {}
        }
        let item = preprocessed.cleaned.clone();

        // Phase 2: content analysis.
        let phase_started = Instant::now();
        let analyses = AnalysisSet {
            source: Some(source_analysis),
            visual: self.timed(ids::VVA, || self.visual.analyze_visual(&item))?,
            textual: Some(self.timed(ids::TCA, || self.textual.analyze_text(&item))?),
        };
        trace.finish_phase(phases::CONTENT_ANALYSIS, phase_started);

        // Phase 3: debate.
        let phase_started = Instant::now();
        let claim = self.timed(ids::CA, || self.claim.argue(&item, &analyses))?;
        let challenge = self.timed(ids::CHA, || self.challenge.argue(&item, &analyses))?;
        let refutation =
            self.timed(ids::RA, || self.refuter.refute(&claim, &challenge, &analyses))?;
        trace.finish_phase(phases::DEBATE, phase_started);

        // Phase 4: decision making and meta evaluation.
        let phase_started = Instant::now();
        let judge_input = JudgeInput {
            item: Some(item.clone()),
            claim: Some(claim.clone()),
            challenge: Some(challenge.clone()),
            refutation: Some(refutation.clone()),
            analyses: analyses.clone(),
        };
        let decision = self.timed(ids::JA, || self.judge.decide(&judge_input))?;
        let meta = self.timed(ids::MEA, || self.meta.evaluate(&decision, &judge_input))?;
        trace.finish_phase(phases::DECISION_MAKING, phase_started);

        // Phase 5: correction, for FAKE verdicts only.
        let correction = if decision.verdict == Verdict::Fake {
            let phase_started = Instant::now();
            let correction =
                self.timed(ids::COA, || self.corrector.correct(&item, &decision, &judge_input))?;
            trace.finish_phase(phases::CORRECTION, phase_started);
            Some(correction)
        } else {
            None
        };

        info!(
            item_id = %item.id,
            verdict = %decision.verdict,
            confidence = decision.confidence,
            "pipeline completed"
        );

        Ok(PipelineResult {
            status: PipelineStatus::Completed,
            verdict: decision.verdict,
            confidence: decision.confidence,
            item,
            total: run_started.elapsed(),
            phases: PhaseOutputs {
                preprocessed: Some(preprocessed),
                analyses,
                claim: Some(claim),
                challenge: Some(challenge),
                refutation: Some(refutation),
                decision: Some(decision),
                meta: Some(meta),
                correction,
            },
            timestamp: Utc::now(),
        })
    }

    /// Run one agent call, timing it into the metrics collector whether it
    /// succeeds or fails.
    fn timed<T>(&self, agent_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let result = f();
        self.metrics
            .record_agent_call(agent_id, started.elapsed(), result.is_ok());
        result
    }
}

/// Timing scratchpad for one run; feeds the pipeline record.
#[derive(Default)]
struct RunTrace {
    item_id: String,
    phase_durations: BTreeMap<String, Duration>,
}

impl RunTrace {
    fn finish_phase(&mut self, name: &str, started: Instant) {
        self.phase_durations
            .insert(name.to_string(), started.elapsed());
    }
}

fn early_exit(
    status: PipelineStatus,
    item: NewsItem,
    preprocessed: Preprocessed,
    run_started: Instant,
) -> PipelineResult {
    PipelineResult {
        status,
        item,
        verdict: Verdict::Unsure,
        confidence: 0.0,
        total: run_started.elapsed(),
        phases: PhaseOutputs {
            preprocessed: Some(preprocessed),
            ..PhaseOutputs::default()
        },
        timestamp: Utc::now(),
    }
}
