//! Subcommand implementations for the `veritas` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use comfy_table::{Table, presets::UTF8_FULL};
use tracing::info;

use veritas_core::metrics::MetricsSummary;
use veritas_core::orchestrator::PipelineResult;
use veritas_core::trainer::TrainingAnalysis;
use veritas_core::{AgentTrainer, MessageBroker, MetricsCollector, Orchestrator};
use veritas_types::NewsItem;

/// Shared wiring for every subcommand: one broker, one metrics collector,
/// and the trainer-selected threshold policy.
pub struct Context {
    metrics_log: Option<PathBuf>,
    training_file: PathBuf,
}

impl Context {
    pub fn new(metrics_log: Option<PathBuf>, training_file: PathBuf) -> Self {
        Self {
            metrics_log,
            training_file,
        }
    }

    /// Build the pipeline. The judge's threshold policy comes from the
    /// training file, so a prior `train` run changes later verdicts.
    fn build(&self) -> (Orchestrator, Arc<MetricsCollector>, AgentTrainer) {
        let mut metrics = MetricsCollector::new();
        if let Some(path) = &self.metrics_log {
            metrics = metrics.with_log_file(path);
        }
        let metrics = Arc::new(metrics);
        let trainer = AgentTrainer::new(metrics.clone(), &self.training_file);
        let policy = trainer.policy();
        info!(?policy, "threshold policy selected");

        let orchestrator =
            Orchestrator::new(Arc::new(MessageBroker::new()), metrics.clone(), policy);
        (orchestrator, metrics, trainer)
    }
}

/// `veritas run`: verify one item and print the verdict.
pub fn run(ctx: &Context, input: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (orchestrator, _metrics, _trainer) = ctx.build();

    let item = match input {
        Some(path) => Some(load_item(path)?),
        None => None,
    };
    let result = orchestrator.process_item(item)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result_line(&result);
        if let Some(decision) = &result.phases.decision {
            println!("  {}", decision.rationale);
        }
        if let Some(correction) = &result.phases.correction {
            println!("  correction: {}", correction.corrected_headline);
        }
    }
    Ok(())
}

/// `veritas demo`: run a batch of sample items and show metrics tables.
pub fn demo(ctx: &Context, count: usize) -> anyhow::Result<()> {
    let (orchestrator, metrics, _trainer) = ctx.build();

    for _ in 0..count {
        let result = orchestrator.process_item(None)?;
        print_result_line(&result);
    }

    let stats = orchestrator.statistics();
    println!(
        "\ncompleted {} item(s), average {:.3}s",
        stats.retained_results,
        stats.average_duration.as_secs_f64()
    );
    for (verdict, n) in &stats.verdict_distribution {
        println!("  {verdict}: {n}");
    }

    print_summary_tables(&metrics.summary());
    Ok(())
}

/// `veritas train`: run a batch, analyze performance, persist adjustments.
pub fn train(ctx: &Context, count: usize) -> anyhow::Result<()> {
    let (orchestrator, _metrics, trainer) = ctx.build();

    for _ in 0..count {
        let result = orchestrator.process_item(None)?;
        print_result_line(&result);
    }

    let analysis = trainer.analyze();
    print_training_report(&analysis);
    trainer
        .apply(&analysis)
        .context("failed to persist training adjustments")?;
    println!(
        "\nadjustments written to {}",
        ctx.training_file.display()
    );
    Ok(())
}

fn load_item(path: &Path) -> anyhow::Result<NewsItem> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid news item", path.display()))
}

fn print_result_line(result: &PipelineResult) {
    println!(
        "[{}] {:?} verdict={} confidence={:.2} ({:.3}s)",
        result.item.id,
        result.status,
        result.verdict,
        result.confidence,
        result.total.as_secs_f64()
    );
}

fn print_summary_tables(summary: &MetricsSummary) {
    println!(
        "\npipelines: {}  agent calls: {}  avg pipeline time: {:.3}s",
        summary.total_pipelines_executed, summary.total_agent_calls, summary.average_pipeline_time
    );

    let mut agents = Table::new();
    agents.load_preset(UTF8_FULL);
    agents.set_header(vec!["agent", "avg time (s)", "calls"]);
    for entry in &summary.slowest_agents {
        agents.add_row(vec![
            entry.id.clone(),
            format!("{:.4}", entry.average_time),
            entry.call_count.to_string(),
        ]);
    }
    println!("{agents}");

    let mut phases = Table::new();
    phases.load_preset(UTF8_FULL);
    phases.set_header(vec!["phase", "avg time (s)", "runs"]);
    for entry in &summary.slowest_phases {
        phases.add_row(vec![
            entry.id.clone(),
            format!("{:.4}", entry.average_time),
            entry.call_count.to_string(),
        ]);
    }
    println!("{phases}");
}

fn print_training_report(analysis: &TrainingAnalysis) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["agent", "success", "errors", "score", "standing"]);
    for a in &analysis.well_performing {
        table.add_row(vec![
            a.agent_id.clone(),
            format!("{:.2}", a.success_rate),
            format!("{:.2}", a.error_rate),
            format!("{:.2}", a.performance_score),
            "ok".into(),
        ]);
    }
    for a in &analysis.underperforming {
        table.add_row(vec![
            a.agent_id.clone(),
            format!("{:.2}", a.success_rate),
            format!("{:.2}", a.error_rate),
            format!("{:.2}", a.performance_score),
            "underperforming".into(),
        ]);
    }
    println!("{table}");

    if analysis.recommendations.is_empty() {
        println!("no adjustments recommended");
    }
    for rec in &analysis.recommendations {
        println!("{} ({:?}):", rec.agent_id, rec.priority);
        for action in &rec.actions {
            println!("  - {action}");
        }
    }
}
