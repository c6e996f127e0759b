//! Ledger job records and their lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount;

/// Ledger-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a job id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for JobId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Status of a job on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// Submitted, waiting for a verifier to check and trap the circuit.
    PendingValidation,
    /// Trapped circuit published, waiting for a sampler.
    Waiting,
    /// Result submitted, waiting for the assigned verifier.
    ValidatingResult,
    /// Result accepted.
    Executed,
    /// Circuit or result rejected.
    Invalid,
}

impl JobStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [JobStatus; 5] = [
        JobStatus::PendingValidation,
        JobStatus::Waiting,
        JobStatus::ValidatingResult,
        JobStatus::Executed,
        JobStatus::Invalid,
    ];

    /// Wire name of the status.
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::PendingValidation => "pending-validation",
            JobStatus::Waiting => "waiting",
            JobStatus::ValidatingResult => "validating-result",
            JobStatus::Executed => "executed",
            JobStatus::Invalid => "invalid",
        }
    }

    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Executed | JobStatus::Invalid)
    }

    /// Check if the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (PendingValidation, Waiting)
                | (PendingValidation, Invalid)
                | (Waiting, ValidatingResult)
                | (ValidatingResult, Executed)
                | (ValidatingResult, Invalid)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A job as stored on the ledger.
///
/// Nodes only read jobs; every change goes through a ledger call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job id.
    pub id: JobId,
    /// Account that submitted the job.
    pub owner_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Qubits of the submitted circuit.
    pub qubits: u32,
    /// Gate count of the submitted circuit.
    pub depth: u32,
    /// Requested shots.
    pub shots: u64,
    /// Reward escrowed by the owner, in subunits.
    #[serde(with = "amount::as_string")]
    pub reward_amount: u128,
    /// Deposit escrowed by the sampler, in subunits.
    #[serde(with = "amount::as_string", default)]
    pub sampler_deposit: u128,
    /// Content id of the circuit to sample. Replaced by the trapped circuit
    /// once a verifier accepts the job.
    pub job_file: String,
    /// Content id of the submitted counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file: Option<String>,
    /// Content id of the published trap metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trap_file: Option<String>,
    /// Account that submitted the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler_id: Option<String>,
    /// Account that trapped the job and must check its result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_id: Option<String>,
}

impl Job {
    /// Minimum sampler deposit: a tenth of the reward.
    pub fn required_deposit(&self) -> u128 {
        self.reward_amount / 10
    }

    /// Check if `account` is the verifier assigned to this job.
    pub fn is_verified_by(&self, account: &str) -> bool {
        self.verifier_id.as_deref() == Some(account)
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobStats {
    #[serde(default)]
    pub pending_validation: u64,
    #[serde(default)]
    pub waiting: u64,
    #[serde(default)]
    pub validating_result: u64,
    #[serde(default)]
    pub executed: u64,
    #[serde(default)]
    pub invalid: u64,
}

impl JobStats {
    /// Count jobs by status.
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut stats = Self::default();
        for job in jobs {
            *stats.count_mut(job.status) += 1;
        }
        stats
    }

    /// Jobs in `status`.
    pub fn count(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::PendingValidation => self.pending_validation,
            JobStatus::Waiting => self.waiting,
            JobStatus::ValidatingResult => self.validating_result,
            JobStatus::Executed => self.executed,
            JobStatus::Invalid => self.invalid,
        }
    }

    fn count_mut(&mut self, status: JobStatus) -> &mut u64 {
        match status {
            JobStatus::PendingValidation => &mut self.pending_validation,
            JobStatus::Waiting => &mut self.waiting,
            JobStatus::ValidatingResult => &mut self.validating_result,
            JobStatus::Executed => &mut self.executed,
            JobStatus::Invalid => &mut self.invalid,
        }
    }

    /// Total number of jobs.
    pub fn total(&self) -> u64 {
        JobStatus::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        let allowed = [
            (PendingValidation, Waiting),
            (PendingValidation, Invalid),
            (Waiting, ValidatingResult),
            (ValidatingResult, Executed),
            (ValidatingResult, Invalid),
        ];
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for status in JobStatus::ALL.into_iter().filter(JobStatus::is_terminal) {
            assert!(JobStatus::ALL.iter().all(|next| !status.can_transition_to(*next)));
        }
    }

    #[test]
    fn test_status_wire_names() {
        for status in JobStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.name()));
        }
    }

    #[test]
    fn test_job_from_ledger_json() {
        let json = r#"{
            "id": "1",
            "owner_id": "alice.testnet",
            "status": "validating-result",
            "qubits": 2,
            "depth": 8,
            "shots": 128,
            "reward_amount": "1000000000000000000000000",
            "sampler_deposit": "100010000000000000000000",
            "job_file": "QmTrapped",
            "result_file": "QmResult",
            "sampler_id": "bob.testnet",
            "verifier_id": "owner.testnet"
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, JobId::from(1));
        assert_eq!(job.status, JobStatus::ValidatingResult);
        assert_eq!(job.reward_amount, crate::amount::SUBUNITS_PER_UNIT);
        assert_eq!(job.required_deposit(), crate::amount::SUBUNITS_PER_UNIT / 10);
        assert!(job.is_verified_by("owner.testnet"));
        assert!(!job.is_verified_by("bob.testnet"));
        assert_eq!(job.trap_file, None);
    }

    #[test]
    fn test_stats() {
        let stats: JobStats = serde_json::from_str(r#"{"waiting": 3, "executed": 2}"#).unwrap();
        assert_eq!(stats.count(JobStatus::Waiting), 3);
        assert_eq!(stats.total(), 5);
    }
}
