//! Error types for the veritas pipeline.
//!
//! [`VeritasError`] is the top-level error type. Only failures that must
//! abort a pipeline run are represented here: agent failures and
//! data-contract violations. Subscriber callback errors and telemetry
//! write failures are logged and swallowed at their call sites and never
//! cross the pipeline boundary.

use thiserror::Error;

/// Top-level error type for the veritas pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VeritasError {
    /// An agent's processing step failed. Fatal to the current pipeline
    /// run; the run is still recorded as a failed pipeline execution.
    #[error("agent {agent} failed: {reason}")]
    Agent {
        /// Identifier of the failing agent (e.g. "TCA").
        agent: String,
        /// What went wrong.
        reason: String,
    },

    /// Malformed input to the decision engine (weights that are not
    /// finite, scores outside `[0, 1]`, ...). Distinct from a merely
    /// *missing* optional analysis, which is never an error.
    #[error("validation failed: {reason}")]
    Validation {
        /// What contract was violated.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VeritasError {
    /// Convenience constructor for agent failures.
    pub fn agent(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Agent {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for validation failures.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, VeritasError>;
