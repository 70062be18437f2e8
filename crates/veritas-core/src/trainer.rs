//! Adaptive feedback: turns recorded metrics into per-agent adjustments.
//!
//! The trainer reads the shared [`MetricsCollector`], flags agents whose
//! success rate, error rate, or composite performance score falls below
//! fixed thresholds, and persists suggested adjustments to a JSON training
//! file. The judge picks its [`ThresholdPolicy`] from that file at
//! construction, which closes the feedback loop.
//!
//! Persistence is explicit: [`AgentTrainer::save`] returns a `Result` and
//! callers decide what a failed write means. Loading an absent or corrupt
//! file falls back to an empty state with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use veritas_types::policy::{INCREASE_SENSITIVITY, THRESHOLD_ADJUSTMENT_KEY};
use veritas_types::{Result, ThresholdPolicy};

use crate::agents::ids;
use crate::metrics::{CallStats, MetricsCollector};

/// Success rate below which an agent is underperforming.
const MIN_SUCCESS_RATE: f64 = 0.70;

/// Error rate above which an agent is underperforming, once it has seen
/// enough calls for the rate to mean anything.
const MAX_ERROR_RATE: f64 = 0.30;
const ERROR_RATE_MIN_CALLS: u64 = 10;

/// Composite performance score below which an agent is underperforming.
const MIN_PERFORMANCE: f64 = 0.60;

/// Composite score at or above which an agent counts as well-performing.
const WELL_PERFORMING: f64 = 0.85;

/// Retained error records per agent.
const MAX_ERRORS_PER_AGENT: usize = 100;

/// Window and share used for dominant-error detection.
const DOMINANT_WINDOW: usize = 20;
const DOMINANT_SHARE: f64 = 0.5;
const DOMINANT_MIN_ERRORS: usize = 5;

/// One recorded agent error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Coarse error category (e.g. `timeout`, `parse`).
    pub error_type: String,
    /// Free-form description.
    pub description: String,
    /// When the error was recorded.
    pub timestamp: DateTime<Utc>,
}

/// The persisted training file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrainingState {
    /// Per-agent adjustment bags.
    #[serde(default)]
    adjustments: BTreeMap<String, BTreeMap<String, Value>>,
    /// Per-agent recent error records.
    #[serde(default)]
    error_patterns: BTreeMap<String, Vec<ErrorRecord>>,
    /// When the state was last written.
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// How urgently a recommendation should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Medium,
    High,
}

/// One per-agent performance assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AgentAssessment {
    /// The assessed agent.
    pub agent_id: String,
    /// Success rate over recorded calls.
    pub success_rate: f64,
    /// Error rate over recorded calls.
    pub error_rate: f64,
    /// Mean call duration in seconds.
    pub average_time: f64,
    /// Composite performance score in `[0, 1]`.
    pub performance_score: f64,
}

/// A suggested adjustment for one underperforming agent.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// The agent the recommendation targets.
    pub agent_id: String,
    /// How urgent the adjustment is.
    pub priority: Priority,
    /// Suggested actions, human-readable.
    pub actions: Vec<String>,
    /// Machine-readable adjustments to persist for the agent.
    pub adjustments: BTreeMap<String, Value>,
}

/// Output of one training analysis pass.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingAnalysis {
    /// Agents below the performance thresholds.
    pub underperforming: Vec<AgentAssessment>,
    /// Agents comfortably above them.
    pub well_performing: Vec<AgentAssessment>,
    /// Adjustments suggested for the underperformers.
    pub recommendations: Vec<Recommendation>,
    /// When the analysis ran.
    pub timestamp: DateTime<Utc>,
}

/// Analyzes recorded metrics and persists per-agent adjustments.
pub struct AgentTrainer {
    metrics: Arc<MetricsCollector>,
    training_file: PathBuf,
    state: Mutex<TrainingState>,
}

impl AgentTrainer {
    /// Trainer over the given metrics, persisting to `training_file`.
    /// An existing file is loaded; a missing or corrupt one starts empty.
    pub fn new(metrics: Arc<MetricsCollector>, training_file: impl Into<PathBuf>) -> Self {
        let training_file = training_file.into();
        let state = load_state(&training_file);
        Self {
            metrics,
            training_file,
            state: Mutex::new(state),
        }
    }

    /// Composite performance score for one agent's call record.
    ///
    /// Success rate, penalized by the error rate, with a small bonus for
    /// a proven track record and a penalty for slow agents.
    pub fn performance_score(stats: &CallStats) -> f64 {
        let mut score = stats.success_rate() - 0.3 * stats.error_rate();
        if stats.call_count > 20 {
            score += 0.1;
        }
        if stats.average().as_secs_f64() > 5.0 {
            score -= 0.1;
        }
        score.clamp(0.0, 1.0)
    }

    /// Assess every agent with recorded calls and suggest adjustments for
    /// the underperformers. Does not persist anything; see
    /// [`apply`](Self::apply).
    pub fn analyze(&self) -> TrainingAnalysis {
        let mut underperforming = Vec::new();
        let mut well_performing = Vec::new();
        let mut recommendations = Vec::new();

        for (agent_id, stats) in self.metrics.all_agent_stats() {
            let assessment = AgentAssessment {
                agent_id: agent_id.clone(),
                success_rate: stats.success_rate(),
                error_rate: stats.error_rate(),
                average_time: stats.average().as_secs_f64(),
                performance_score: Self::performance_score(&stats),
            };

            if is_underperforming(&stats, assessment.performance_score) {
                recommendations.push(self.recommend(&assessment));
                underperforming.push(assessment);
            } else if assessment.performance_score >= WELL_PERFORMING {
                well_performing.push(assessment);
            }
        }

        info!(
            underperforming = underperforming.len(),
            well_performing = well_performing.len(),
            "training analysis complete"
        );

        TrainingAnalysis {
            underperforming,
            well_performing,
            recommendations,
            timestamp: Utc::now(),
        }
    }

    /// Merge the recommendations into the persisted state and save it.
    pub fn apply(&self, analysis: &TrainingAnalysis) -> Result<()> {
        {
            let mut state = self.state.lock();
            for rec in &analysis.recommendations {
                state
                    .adjustments
                    .entry(rec.agent_id.clone())
                    .or_default()
                    .extend(rec.adjustments.clone());
            }
            state.last_updated = Some(Utc::now());
        }
        self.save()
    }

    /// Record one agent error. When one error type dominates the recent
    /// window, a suggested fix is written into the agent's adjustments.
    pub fn record_error(
        &self,
        agent_id: &str,
        error_type: impl Into<String>,
        description: impl Into<String>,
    ) {
        let error_type = error_type.into();
        let mut state = self.state.lock();
        let records = state.error_patterns.entry(agent_id.to_string()).or_default();
        records.push(ErrorRecord {
            error_type: error_type.clone(),
            description: description.into(),
            timestamp: Utc::now(),
        });
        if records.len() > MAX_ERRORS_PER_AGENT {
            let excess = records.len() - MAX_ERRORS_PER_AGENT;
            records.drain(..excess);
        }

        if let Some(dominant) = dominant_error(records) {
            warn!(agent = agent_id, error_type = %dominant, "dominant error pattern detected");
            state
                .adjustments
                .entry(agent_id.to_string())
                .or_default()
                .insert("error_fix".to_string(), json!(dominant));
        }
    }

    /// The persisted adjustment bag for one agent.
    pub fn adjustments_for(&self, agent_id: &str) -> Option<BTreeMap<String, Value>> {
        self.state.lock().adjustments.get(agent_id).cloned()
    }

    /// The threshold policy implied by the judge's persisted adjustments.
    pub fn policy(&self) -> ThresholdPolicy {
        ThresholdPolicy::from_adjustments(self.adjustments_for(ids::JA).as_ref())
    }

    /// Write the training state to the training file.
    pub fn save(&self) -> Result<()> {
        let state = self.state.lock().clone();
        if let Some(parent) = self.training_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.training_file, contents)?;
        Ok(())
    }

    fn recommend(&self, assessment: &AgentAssessment) -> Recommendation {
        let mut actions = Vec::new();
        let mut adjustments = BTreeMap::new();

        match assessment.agent_id.as_str() {
            ids::JA => {
                actions.push("loosen the verdict thresholds to reduce missed calls".into());
                adjustments.insert(
                    THRESHOLD_ADJUSTMENT_KEY.to_string(),
                    json!(INCREASE_SENSITIVITY),
                );
            }
            ids::TCA => {
                actions.push("expand the manipulation lexicons".into());
                adjustments.insert("lexicon_update".to_string(), json!("expand"));
            }
            ids::VVA => {
                actions.push("recalibrate the visual baselines".into());
                adjustments.insert("visual_baseline".to_string(), json!("recalibrate"));
            }
            ids::STA => {
                actions.push("refresh the trusted-domain table".into());
                adjustments.insert("domain_table".to_string(), json!("refresh"));
            }
            ids::CA | ids::CHA => {
                actions.push("rebalance the argument templates".into());
                adjustments.insert("argument_templates".to_string(), json!("rebalance"));
            }
            _ => {}
        }

        if assessment.error_rate > 0.15 {
            actions.push("add input validation before processing".into());
        }
        if assessment.average_time > 3.0 {
            actions.push("profile and cache slow paths".into());
        }

        let priority = if assessment.performance_score < 0.50 {
            Priority::High
        } else {
            Priority::Medium
        };

        Recommendation {
            agent_id: assessment.agent_id.clone(),
            priority,
            actions,
            adjustments,
        }
    }
}

fn is_underperforming(stats: &CallStats, performance_score: f64) -> bool {
    stats.success_rate() < MIN_SUCCESS_RATE
        || (stats.error_rate() > MAX_ERROR_RATE && stats.call_count > ERROR_RATE_MIN_CALLS)
        || performance_score < MIN_PERFORMANCE
}

/// The error type covering at least half the recent window, when the
/// agent has accumulated enough errors to call it a pattern.
fn dominant_error(records: &[ErrorRecord]) -> Option<String> {
    if records.len() < DOMINANT_MIN_ERRORS {
        return None;
    }
    let window: Vec<&ErrorRecord> = records.iter().rev().take(DOMINANT_WINDOW).collect();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &window {
        *counts.entry(record.error_type.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .find(|(_, count)| *count as f64 >= DOMINANT_SHARE * window.len() as f64)
        .map(|(error_type, _)| error_type.to_string())
}

fn load_state(path: &Path) -> TrainingState {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt training file, starting fresh");
                TrainingState::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => TrainingState::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable training file, starting fresh");
            TrainingState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn trainer_with(metrics: Arc<MetricsCollector>) -> (AgentTrainer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let trainer = AgentTrainer::new(metrics, dir.path().join("training.json"));
        (trainer, dir)
    }

    fn record_calls(metrics: &MetricsCollector, agent: &str, ok: usize, failed: usize) {
        for _ in 0..ok {
            metrics.record_agent_call(agent, Duration::from_millis(10), true);
        }
        for _ in 0..failed {
            metrics.record_agent_call(agent, Duration::from_millis(10), false);
        }
    }

    #[test]
    fn performance_score_formula() {
        let metrics = MetricsCollector::new();
        record_calls(&metrics, "JA", 8, 2);
        let stats = metrics.agent_stats("JA").unwrap();
        // 0.8 success, 0.2 error, 10 calls, fast.
        let expected = 0.8 - 0.3 * 0.2;
        assert!((AgentTrainer::performance_score(&stats) - expected).abs() < 1e-9);
    }

    #[test]
    fn track_record_bonus_applies_past_twenty_calls() {
        let metrics = MetricsCollector::new();
        record_calls(&metrics, "TCA", 25, 0);
        let stats = metrics.agent_stats("TCA").unwrap();
        assert!((AgentTrainer::performance_score(&stats) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_success_rate_is_flagged() {
        let metrics = Arc::new(MetricsCollector::new());
        record_calls(&metrics, "TCA", 6, 4); // 0.6 success rate
        record_calls(&metrics, "JA", 30, 0);
        let (trainer, _dir) = trainer_with(metrics);

        let analysis = trainer.analyze();
        assert!(
            analysis
                .underperforming
                .iter()
                .any(|a| a.agent_id == "TCA")
        );
        assert!(analysis.well_performing.iter().any(|a| a.agent_id == "JA"));
    }

    #[test]
    fn judge_recommendation_switches_threshold_policy() {
        let metrics = Arc::new(MetricsCollector::new());
        record_calls(&metrics, ids::JA, 5, 5);
        let (trainer, _dir) = trainer_with(metrics);

        let analysis = trainer.analyze();
        let rec = analysis
            .recommendations
            .iter()
            .find(|r| r.agent_id == ids::JA)
            .expect("judge must be flagged");
        assert_eq!(
            rec.adjustments[THRESHOLD_ADJUSTMENT_KEY],
            json!(INCREASE_SENSITIVITY)
        );

        trainer.apply(&analysis).unwrap();
        assert_eq!(trainer.policy(), ThresholdPolicy::Sensitive);
    }

    #[test]
    fn very_low_score_is_high_priority() {
        let metrics = Arc::new(MetricsCollector::new());
        record_calls(&metrics, "VVA", 2, 8);
        let (trainer, _dir) = trainer_with(metrics);
        let analysis = trainer.analyze();
        let rec = &analysis.recommendations[0];
        assert_eq!(rec.priority, Priority::High);
    }

    #[test]
    fn state_round_trips_through_the_file() {
        let metrics = Arc::new(MetricsCollector::new());
        record_calls(&metrics, ids::JA, 5, 5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");

        let trainer = AgentTrainer::new(metrics.clone(), &path);
        let analysis = trainer.analyze();
        trainer.apply(&analysis).unwrap();

        // A fresh trainer over the same file sees the adjustments.
        let reloaded = AgentTrainer::new(metrics, &path);
        assert_eq!(reloaded.policy(), ThresholdPolicy::Sensitive);
        assert!(reloaded.adjustments_for(ids::JA).is_some());
    }

    #[test]
    fn corrupt_training_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");
        std::fs::write(&path, "not json at all").unwrap();
        let trainer = AgentTrainer::new(Arc::new(MetricsCollector::new()), &path);
        assert_eq!(trainer.policy(), ThresholdPolicy::Normal);
    }

    #[test]
    fn unwritable_path_surfaces_an_error() {
        let trainer = AgentTrainer::new(
            Arc::new(MetricsCollector::new()),
            "/proc/veritas/training.json",
        );
        assert!(trainer.save().is_err());
    }

    #[test]
    fn dominant_error_pattern_writes_a_fix() {
        let metrics = Arc::new(MetricsCollector::new());
        let (trainer, _dir) = trainer_with(metrics);
        for i in 0..6 {
            trainer.record_error("TCA", "timeout", format!("request {i} timed out"));
        }
        let adjustments = trainer.adjustments_for("TCA").expect("fix recorded");
        assert_eq!(adjustments["error_fix"], json!("timeout"));
    }

    #[test]
    fn mixed_errors_below_half_share_write_no_fix() {
        let metrics = Arc::new(MetricsCollector::new());
        let (trainer, _dir) = trainer_with(metrics);
        for (i, kind) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            trainer.record_error("TCA", *kind, format!("error {i}"));
        }
        assert!(trainer.adjustments_for("TCA").is_none());
    }

    #[test]
    fn error_records_are_capped() {
        let metrics = Arc::new(MetricsCollector::new());
        let (trainer, _dir) = trainer_with(metrics);
        for i in 0..(MAX_ERRORS_PER_AGENT + 20) {
            trainer.record_error("STA", "fetch", format!("error {i}"));
        }
        let state = trainer.state.lock();
        assert_eq!(state.error_patterns["STA"].len(), MAX_ERRORS_PER_AGENT);
    }
}
