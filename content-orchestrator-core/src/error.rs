//! Error types for the orchestration core.
//!
//! Only two kinds of failure ever reach a caller of the orchestrator: a rejected submission
//! ([`ValidationError`]) and a pipeline that could not even create its records
//! ([`OrchestrationError::Pipeline`]). Optimizer and distribution failures are isolated inside
//! their stages, and a run that fails after its records exist comes back as a normal result with
//! `status = failed`.

use serde::{Deserialize, Serialize};

/// Boxed error returned by every collaborator (optimizers, poster, scheduler).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons a submission is rejected before any record is written.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    MissingTitle,

    #[error("at least one target platform is required")]
    NoTargetPlatforms,

    #[error("target platform listed more than once: {0}")]
    DuplicatePlatform(String),

    #[error("target platform identifier must not be empty")]
    BlankPlatform,

    #[error("scheduled publishing requires a schedule time")]
    MissingScheduleTime,

    #[error("schedule time {0} is not in the future")]
    ScheduleInPast(String),

    #[error("schedule time is only allowed with scheduled publishing")]
    UnexpectedScheduleTime,
}

/// Storage failures raised by a [`crate::contract::LedgerStore`].
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger record not found: {0}")]
    NotFound(String),

    #[error("ledger conflict: {0}")]
    Conflict(String),

    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// Errors propagated out of [`crate::orchestrator::Orchestrator`].
#[derive(thiserror::Error, Debug)]
pub enum OrchestrationError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("pipeline failure: {0}")]
    Pipeline(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A ledger read outside a pipeline run failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Why a run ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// An uncaught error inside the pipeline stages.
    Pipeline,
    /// The caller's cancellation token fired before the run settled.
    Cancelled,
    /// The run was found stuck in `running` by the reconciliation sweep.
    Stale,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Pipeline => "pipeline",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Stale => "stale",
        };
        f.write_str(s)
    }
}
