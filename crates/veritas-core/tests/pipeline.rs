//! End-to-end pipeline tests wiring real agents, a real broker, and a
//! real metrics collector together.

use std::sync::Arc;

use veritas_core::agents::{Decider, JudgeInput, ids};
use veritas_core::orchestrator::{PipelineStatus, phases};
use veritas_core::{AgentTrainer, MessageBroker, MetricsCollector, Orchestrator};
use veritas_types::{
    Decision, FactCheck, MessageKind, NewsItem, Result, ThresholdPolicy, Verdict, VeritasError,
};

fn pipeline() -> (Orchestrator, Arc<MessageBroker>, Arc<MetricsCollector>) {
    let broker = Arc::new(MessageBroker::new());
    let metrics = Arc::new(MetricsCollector::new());
    let orchestrator = Orchestrator::new(broker.clone(), metrics.clone(), ThresholdPolicy::Normal);
    (orchestrator, broker, metrics)
}

fn credible_item(id: &str) -> NewsItem {
    NewsItem {
        link: Some("https://reuters.com/economy/rates".into()),
        ..NewsItem::new(
            id,
            "Central bank holds rates at 4.5 percent",
            "The central bank held its benchmark rate at 4.5 percent on Thursday, \
             according to the official statement. Policymakers said the decision \
             reflects stable inflation data and steady employment figures.",
        )
    }
}

#[test]
fn spam_item_short_circuits_before_content_analysis() {
    let (orchestrator, _broker, metrics) = pipeline();
    let spam = NewsItem::new("spam-1", "You won't believe this", "Click here! Free money!");

    let result = orchestrator.process_item(Some(spam)).unwrap();
    assert_eq!(result.status, PipelineStatus::Spam);
    assert_eq!(result.verdict, Verdict::Unsure);
    assert_eq!(result.confidence, 0.0);

    let records = metrics.pipeline_records();
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert!(records[0].phase_durations.contains_key(phases::DATA_COLLECTION));
    assert!(!records[0].phase_durations.contains_key(phases::CONTENT_ANALYSIS));
}

#[test]
fn fact_checked_fake_item_is_overridden_and_corrected() {
    let (orchestrator, broker, _metrics) = pipeline();
    let mut item = credible_item("fc-1");
    item.fact_check = Some(FactCheck {
        verdict: Verdict::Fake,
        confidence: 0.75,
        source: "factcheck.example".into(),
    });

    let result = orchestrator.process_item(Some(item)).unwrap();
    assert_eq!(result.status, PipelineStatus::Completed);
    assert_eq!(result.verdict, Verdict::Fake);
    assert!(result.confidence >= 0.90);

    let decision = result.phases.decision.as_ref().unwrap();
    assert!(decision.criteria_scores.is_none());
    assert!(decision.rationale.contains("factcheck.example"));

    // FAKE verdicts produce a correction and broadcast it.
    let correction = result.phases.correction.as_ref().unwrap();
    assert!(correction.corrected_headline.starts_with("[CORRECTED]"));
    assert!(
        !broker
            .messages_for(ids::STA, Some(MessageKind::Feedback))
            .is_empty()
    );
}

#[test]
fn completed_run_records_every_executed_phase_and_agent() {
    let (orchestrator, broker, metrics) = pipeline();
    let result = orchestrator.process_item(Some(credible_item("ok-1"))).unwrap();
    assert_eq!(result.status, PipelineStatus::Completed);
    assert_ne!(result.verdict, Verdict::Fake);

    for agent in [ids::PP_A, ids::STA, ids::VVA, ids::TCA, ids::CA, ids::CHA, ids::RA, ids::JA, ids::MEA] {
        let stats = metrics.agent_stats(agent).unwrap_or_else(|| panic!("no stats for {agent}"));
        assert_eq!(stats.error_count, 0, "agent {agent} recorded errors");
    }
    // No correction for a non-FAKE verdict.
    assert!(metrics.agent_stats(ids::COA).is_none());

    // The judge's decision went over the broker to the meta evaluator.
    assert_eq!(
        broker.messages_for(ids::MEA, Some(MessageKind::Decision)).len(),
        1
    );

    let summary = metrics.summary();
    assert_eq!(summary.total_pipelines_executed, 1);
    assert_eq!(summary.verdict_distribution[&result.verdict.to_string()], 1);
}

#[test]
fn failing_stage_propagates_but_still_records_the_run() {
    struct Flaky;
    impl Decider for Flaky {
        fn decide(&self, _input: &JudgeInput) -> Result<Decision> {
            Err(VeritasError::agent(ids::JA, "model unavailable"))
        }
    }

    let (mut orchestrator, _broker, metrics) = pipeline();
    orchestrator.judge = Arc::new(Flaky);

    let err = orchestrator
        .process_item(Some(credible_item("fail-1")))
        .unwrap_err();
    assert!(err.to_string().contains("model unavailable"));

    let records = metrics.pipeline_records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert_eq!(records[0].item_id, "fail-1");
    // The earlier phases still ran and were timed.
    assert!(records[0].phase_durations.contains_key(phases::DEBATE));
}

#[test]
fn trainer_closes_the_loop_from_metrics_to_policy() {
    let (mut orchestrator, broker, metrics) = pipeline();

    // A judge that fails most of the time drives its success rate down.
    struct Flaky(std::sync::atomic::AtomicU32);
    impl Decider for Flaky {
        fn decide(&self, _input: &JudgeInput) -> Result<Decision> {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(VeritasError::agent(
                ids::JA,
                format!("induced failure {n}"),
            ))
        }
    }
    orchestrator.judge = Arc::new(Flaky(std::sync::atomic::AtomicU32::new(0)));

    for i in 0..10 {
        let _ = orchestrator.process_item(Some(credible_item(&format!("loop-{i}"))));
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("training.json");
    let trainer = AgentTrainer::new(metrics.clone(), &path);

    let analysis = trainer.analyze();
    assert!(analysis.underperforming.iter().any(|a| a.agent_id == ids::JA));
    trainer.apply(&analysis).unwrap();

    // A fresh trainer over the same file yields the sensitive policy,
    // which a rebuilt pipeline would then be constructed with.
    let reloaded = AgentTrainer::new(metrics, &path);
    assert_eq!(reloaded.policy(), ThresholdPolicy::Sensitive);
    let _ = Orchestrator::new(
        broker,
        Arc::new(MetricsCollector::new()),
        reloaded.policy(),
    );
}
