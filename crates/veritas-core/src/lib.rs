//! Core engine for the veritas news verification pipeline.
//!
//! The pipeline coordinates a fixed sequence of analysis agents over a
//! single news item and produces a weighted multi-criteria verdict:
//!
//! - [`broker`] — in-memory publish/subscribe message broker
//! - [`metrics`] — thread-safe call/phase/pipeline metrics collector
//! - [`agents`] — per-role agent traits and the concrete analysis agents
//! - [`judge`] — the decision engine (weighted criteria, threshold tables)
//! - [`orchestrator`] — phase sequencing, timing, result assembly
//! - [`trainer`] — adaptive feedback loop over recorded metrics
//!
//! Everything is constructed with explicit dependency injection: one
//! [`broker::MessageBroker`] and one [`metrics::MetricsCollector`] per
//! process (or per test), passed by `Arc` into the orchestrator and agents.

pub mod agents;
pub mod broker;
pub mod judge;
pub mod metrics;
pub mod orchestrator;
pub mod trainer;

pub use broker::MessageBroker;
pub use judge::JudgeAgent;
pub use metrics::MetricsCollector;
pub use orchestrator::{Orchestrator, PipelineResult, PipelineStatus};
pub use trainer::AgentTrainer;
