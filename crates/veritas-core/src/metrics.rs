//! Thread-safe call/phase/pipeline metrics collection.
//!
//! [`MetricsCollector`] is the single source of truth for performance
//! aggregates: per-agent call records, per-phase execution records, and a
//! capped ring of pipeline-level records. Every mutating method is O(1)
//! amortized behind one mutex; summary figures are computed on read.
//!
//! Pipeline records are additionally appended as one JSON line each to an
//! append-only log file. The write is best-effort telemetry: failures are
//! logged at `warn` and never surface to the pipeline.

use std::collections::{BTreeMap, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use veritas_types::Verdict;

/// Serde helpers mapping [`Duration`] to fractional seconds on the wire.
pub(crate) mod duration_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// Same as [`duration_secs`] for `BTreeMap<String, Duration>` values.
mod duration_map_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        m: &BTreeMap<String, Duration>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_map(m.iter().map(|(k, v)| (k, v.as_secs_f64())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<String, Duration>, D::Error> {
        let m = BTreeMap::<String, f64>::deserialize(d)?;
        Ok(m.into_iter()
            .map(|(k, v)| (k, Duration::from_secs_f64(v.max(0.0))))
            .collect())
    }
}

// ── Records ─────────────────────────────────────────────────────────────

/// Aggregate statistics for one agent (or one phase, keyed by phase name).
///
/// Created lazily on first call; mutated on every call; removed only by
/// [`MetricsCollector::reset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStats {
    /// Agent id or phase name.
    pub id: String,
    /// Number of recorded calls.
    pub call_count: u64,
    /// Sum of all call durations.
    #[serde(rename = "total_time", with = "duration_secs")]
    pub total: Duration,
    /// Shortest recorded call.
    #[serde(rename = "min_time", with = "duration_secs")]
    pub min: Duration,
    /// Longest recorded call.
    #[serde(rename = "max_time", with = "duration_secs")]
    pub max: Duration,
    /// Calls that completed successfully.
    pub success_count: u64,
    /// Calls that failed.
    pub error_count: u64,
    /// Timestamp of the most recent call.
    pub last_call: Option<DateTime<Utc>>,
}

impl CallStats {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            call_count: 0,
            total: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
            success_count: 0,
            error_count: 0,
            last_call: None,
        }
    }

    fn record(&mut self, duration: Duration, success: bool) {
        if self.call_count == 0 {
            self.min = duration;
            self.max = duration;
        } else {
            self.min = self.min.min(duration);
            self.max = self.max.max(duration);
        }
        self.call_count += 1;
        self.total += duration;
        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.last_call = Some(Utc::now());
    }

    /// Arithmetic mean of recorded durations.
    pub fn average(&self) -> Duration {
        if self.call_count == 0 {
            Duration::ZERO
        } else {
            self.total / self.call_count as u32
        }
    }

    /// `success_count / (success_count + error_count)`, or 1.0 before any
    /// call is recorded.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.error_count;
        if total == 0 {
            1.0
        } else {
            self.success_count as f64 / total as f64
        }
    }

    /// `error_count / call_count`, or 0.0 before any call is recorded.
    pub fn error_rate(&self) -> f64 {
        if self.call_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.call_count as f64
        }
    }
}

/// One complete pipeline execution, also the shape of one metrics log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// Id of the processed item.
    pub item_id: String,
    /// Verdict reached (UNSURE when the run aborted before a decision).
    pub verdict: Verdict,
    /// Wall-clock duration of the whole run.
    #[serde(rename = "total_time", with = "duration_secs")]
    pub total: Duration,
    /// Wall-clock duration per executed phase.
    #[serde(rename = "phase_times", with = "duration_map_secs")]
    pub phase_durations: BTreeMap<String, Duration>,
    /// Whether the run completed without an agent failure.
    pub success: bool,
    /// When the record was emitted.
    pub timestamp: DateTime<Utc>,
}

// ── Summary ─────────────────────────────────────────────────────────────

/// An entry in the slowest-agents / slowest-phases tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowestEntry {
    /// Agent id or phase name.
    pub id: String,
    /// Average duration in seconds.
    pub average_time: f64,
    /// Number of recorded calls.
    pub call_count: u64,
}

/// Overall system performance summary, computed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Pipeline executions currently retained in the ring.
    pub total_pipelines_executed: usize,
    /// Sum of agent call counts.
    pub total_agent_calls: u64,
    /// Sum of phase execution counts.
    pub total_phase_executions: u64,
    /// Mean pipeline duration in seconds over the ring.
    pub average_pipeline_time: f64,
    /// Count of retained pipelines per verdict.
    pub verdict_distribution: BTreeMap<String, u64>,
    /// Top 5 agents by average duration, slowest first.
    pub slowest_agents: Vec<SlowestEntry>,
    /// Top 5 phases by average duration, slowest first.
    pub slowest_phases: Vec<SlowestEntry>,
    /// When the summary was computed.
    pub timestamp: DateTime<Utc>,
}

// ── Collector ───────────────────────────────────────────────────────────

/// Cap on retained pipeline records.
const MAX_PIPELINE_RECORDS: usize = 1000;

#[derive(Default)]
struct MetricsState {
    agents: BTreeMap<String, CallStats>,
    phases: BTreeMap<String, CallStats>,
    pipelines: VecDeque<PipelineRecord>,
}

/// Centralized, thread-safe metrics registry.
pub struct MetricsCollector {
    state: Mutex<MetricsState>,
    log_path: Option<PathBuf>,
}

impl MetricsCollector {
    /// Create a collector without a log file (in-memory only).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MetricsState::default()),
            log_path: None,
        }
    }

    /// Enable the append-only pipeline log at `path`, creating parent
    /// directories best-effort.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "failed to create metrics log directory");
            }
        }
        self.log_path = Some(path);
        self
    }

    /// Record one agent call.
    pub fn record_agent_call(&self, agent_id: &str, duration: Duration, success: bool) {
        let mut state = self.state.lock();
        state
            .agents
            .entry(agent_id.to_string())
            .or_insert_with(|| CallStats::new(agent_id))
            .record(duration, success);
    }

    /// Record one phase execution. Phase executions carry no failure flag;
    /// they measure the wall-clock cost of a batch of agent calls.
    pub fn record_phase(&self, phase_name: &str, duration: Duration) {
        let mut state = self.state.lock();
        state
            .phases
            .entry(phase_name.to_string())
            .or_insert_with(|| CallStats::new(phase_name))
            .record(duration, true);
    }

    /// Record one complete pipeline execution and append it to the log
    /// file when one is configured.
    pub fn record_pipeline(&self, record: PipelineRecord) {
        {
            let mut state = self.state.lock();
            state.pipelines.push_back(record.clone());
            while state.pipelines.len() > MAX_PIPELINE_RECORDS {
                state.pipelines.pop_front();
            }
        }
        if let Some(path) = &self.log_path {
            if let Err(e) = append_log_line(path, &record) {
                warn!(path = %path.display(), error = %e, "failed to append metrics log line");
            }
        }
    }

    /// Snapshot of one agent's aggregate record.
    pub fn agent_stats(&self, agent_id: &str) -> Option<CallStats> {
        self.state.lock().agents.get(agent_id).cloned()
    }

    /// Snapshot of all agent records.
    pub fn all_agent_stats(&self) -> BTreeMap<String, CallStats> {
        self.state.lock().agents.clone()
    }

    /// Snapshot of one phase's aggregate record.
    pub fn phase_stats(&self, phase_name: &str) -> Option<CallStats> {
        self.state.lock().phases.get(phase_name).cloned()
    }

    /// Snapshot of all phase records.
    pub fn all_phase_stats(&self) -> BTreeMap<String, CallStats> {
        self.state.lock().phases.clone()
    }

    /// Snapshot of the retained pipeline records, oldest first.
    pub fn pipeline_records(&self) -> Vec<PipelineRecord> {
        self.state.lock().pipelines.iter().cloned().collect()
    }

    /// Compute the overall performance summary.
    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.lock();

        let total_pipelines = state.pipelines.len();
        let average_pipeline_time = if total_pipelines == 0 {
            0.0
        } else {
            state
                .pipelines
                .iter()
                .map(|r| r.total.as_secs_f64())
                .sum::<f64>()
                / total_pipelines as f64
        };

        let mut verdict_distribution = BTreeMap::new();
        for record in &state.pipelines {
            *verdict_distribution
                .entry(record.verdict.to_string())
                .or_insert(0) += 1;
        }

        MetricsSummary {
            total_pipelines_executed: total_pipelines,
            total_agent_calls: state.agents.values().map(|s| s.call_count).sum(),
            total_phase_executions: state.phases.values().map(|s| s.call_count).sum(),
            average_pipeline_time,
            verdict_distribution,
            slowest_agents: slowest(&state.agents),
            slowest_phases: slowest(&state.phases),
            timestamp: Utc::now(),
        }
    }

    /// Clear all aggregates (testing only).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.agents.clear();
        state.phases.clear();
        state.pipelines.clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn slowest(stats: &BTreeMap<String, CallStats>) -> Vec<SlowestEntry> {
    let mut entries: Vec<SlowestEntry> = stats
        .values()
        .map(|s| SlowestEntry {
            id: s.id.clone(),
            average_time: s.average().as_secs_f64(),
            call_count: s.call_count,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.average_time
            .partial_cmp(&a.average_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(5);
    entries
}

fn append_log_line(path: &Path, record: &PipelineRecord) -> std::io::Result<()> {
    let mut line = serde_json::to_string(record).map_err(std::io::Error::other)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}
