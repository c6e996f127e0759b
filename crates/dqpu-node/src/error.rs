//! Error handling for the node layer.

use std::time::Duration;

use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Result type for ledger calls.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result type for blob store calls.
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors returned by a [`Ledger`](crate::ledger::Ledger).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// No job with this id.
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// The job is not in a state that allows the requested change.
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    /// The calling account may not perform this action.
    #[error("Account {account} is not allowed to {action} job {id}")]
    NotAuthorized {
        account: String,
        action: &'static str,
        id: JobId,
    },

    /// A job was submitted without a reward.
    #[error("Job reward must be greater than zero")]
    ZeroReward,

    /// Sampler deposit below a tenth of the reward.
    #[error("Insufficient deposit: required {required}, got {got}")]
    InsufficientDeposit { required: u128, got: u128 },

    /// Account cannot cover the attached amount.
    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: String,
        required: u128,
        available: u128,
    },

    /// Transaction rejected or lost by the ledger backend.
    #[error("Ledger transaction failed: {0}")]
    Transaction(String),
}

/// Errors returned by a [`BlobStore`](crate::blob::BlobStore).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BlobError {
    /// The content did not arrive within the read timeout.
    #[error("Timed out after {after:?} fetching {cid}")]
    Timeout { cid: String, after: Duration },

    /// The store does not know this content id.
    #[error("Content not found: {0}")]
    NotFound(String),

    /// Local IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store answered with an error or could not be reached.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for BlobError {
    fn from(err: reqwest::Error) -> Self {
        BlobError::Http(err.to_string())
    }
}

/// Errors that can occur while running a node.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NodeError {
    /// Result counts do not add up to the requested shots.
    #[error("Shot count mismatch for job {job}: expected {expected}, got {got}")]
    ShotCountMismatch { job: JobId, expected: u64, got: u64 },

    /// No trap metadata stored for a job this verifier trapped.
    #[error("Missing trap metadata for job {0}")]
    MissingTrapMetadata(JobId),

    /// Sampler failed its start-up self-test.
    #[error("Sampler {0} failed its self-test")]
    SelfTestFailed(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Circuit text could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] dqpu_qasm::ParseError),

    /// Trap insertion or metadata error.
    #[error("Trap error: {0}")]
    Trap(#[from] dqpu_trap::TrapError),

    /// Sampler error.
    #[error("Sampler error: {0}")]
    Sampler(#[from] dqpu_hal::HalError),

    /// Ledger call failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Blob store call failed.
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl NodeError {
    /// Whether the job should simply be retried on a later poll.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NodeError::Blob(BlobError::Timeout { .. }) | NodeError::Ledger(LedgerError::Transaction(_))
        )
    }
}
