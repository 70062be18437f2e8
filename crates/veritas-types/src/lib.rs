//! Core types for the veritas news verification pipeline.
//!
//! This crate defines the data model shared by the broker, the
//! orchestrator, the decision engine and the trainer:
//!
//! - [`message`] — inter-agent messages and target resolution
//! - [`item`] — news items and authoritative fact-check results
//! - [`verdict`] — verdicts and confidence intervals
//! - [`analysis`] — typed per-phase analysis outputs
//! - [`policy`] — threshold tables for verdict determination
//! - [`error`] — the crate-wide error type

pub mod analysis;
pub mod error;
pub mod item;
pub mod message;
pub mod policy;
pub mod verdict;

pub use analysis::{
    Argument, Correction, CriteriaScores, CriteriaWeights, Decision, Finding, MetaEvaluation,
    MetaRecommendation, PreprocessOutcome, Preprocessed, Refutation, Severity, SourceAnalysis,
    SourceInfo, SourceType, Stance, TextualAnalysis, VisualAnalysis,
};
pub use error::{Result, VeritasError};
pub use item::{FactCheck, NewsItem};
pub use message::{AgentMessage, MessageKind, Targets};
pub use policy::{ThresholdPolicy, ThresholdTable};
pub use verdict::{ConfidenceInterval, Verdict};
