//! The ledger interface and an in-memory ledger.
//!
//! The ledger owns every job record. Status changes are requested through
//! calls and the ledger decides whether they apply, so concurrent nodes race
//! on the ledger rather than on shared state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::job::{Job, JobId, JobStats, JobStatus};

/// Ledger operations used by requesters, verifiers and samplers.
///
/// Calls act on behalf of [`account_id`](Ledger::account_id). Amounts are in
/// subunits.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The account this handle signs calls with.
    fn account_id(&self) -> &str;

    /// Submit a new job, escrowing `reward`.
    async fn submit_job(
        &self,
        qubits: u32,
        depth: u32,
        shots: u64,
        job_file: &str,
        reward: u128,
    ) -> LedgerResult<JobId>;

    /// Get a job by id.
    async fn get_job(&self, id: &JobId) -> LedgerResult<Job>;

    /// Get the status of a job.
    async fn get_job_status(&self, id: &JobId) -> LedgerResult<JobStatus>;

    /// Remove a job that no sampler has picked up yet. Owner only.
    async fn remove_job(&self, id: &JobId) -> LedgerResult<()>;

    /// Accept or reject a `pending-validation` job. Accepting publishes the
    /// trapped circuit and assigns the caller as the job's verifier.
    async fn set_job_validity(
        &self,
        id: &JobId,
        valid: bool,
        trapped_file: Option<&str>,
    ) -> LedgerResult<()>;

    /// Accept or reject the result of a `validating-result` job. Assigned
    /// verifier only.
    async fn set_result_validity(
        &self,
        id: &JobId,
        valid: bool,
        trap_file: Option<&str>,
    ) -> LedgerResult<()>;

    /// Submit a result for a `waiting` job, escrowing `deposit`.
    async fn submit_job_result(&self, id: &JobId, result_file: &str, deposit: u128)
    -> LedgerResult<()>;

    /// The most recent `limit` jobs, newest first.
    async fn get_latest_jobs(&self, limit: usize) -> LedgerResult<Vec<Job>>;

    /// Jobs in submission order, starting at `offset`.
    async fn get_jobs(&self, offset: usize, limit: usize) -> LedgerResult<Vec<Job>>;

    /// Job counts per status.
    async fn get_jobs_stats(&self) -> LedgerResult<JobStats>;

    /// Balance of the calling account.
    async fn balance(&self) -> LedgerResult<u128>;
}

#[derive(Debug, Default)]
struct LedgerState {
    jobs: BTreeMap<u64, Job>,
    next_id: u64,
    balances: FxHashMap<String, u128>,
    verifiers: FxHashSet<String>,
}

impl LedgerState {
    fn job_mut(&mut self, id: &JobId) -> LedgerResult<&mut Job> {
        id.as_str()
            .parse::<u64>()
            .ok()
            .and_then(|key| self.jobs.get_mut(&key))
            .ok_or_else(|| LedgerError::JobNotFound(id.clone()))
    }

    fn credit(&mut self, account: &str, amount: u128) {
        let balance = self.balances.entry(account.to_string()).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, account: &str, amount: u128) -> LedgerResult<()> {
        let available = self.balances.get(account).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                required: amount,
                available,
            });
        }
        self.balances.insert(account.to_string(), available - amount);
        Ok(())
    }
}

fn check_transition(job: &Job, to: JobStatus) -> LedgerResult<()> {
    if job.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransition {
            id: job.id.clone(),
            from: job.status,
            to,
        })
    }
}

/// In-process ledger with escrow accounting.
///
/// Handles created with [`handle`](MemoryLedger::handle) share state and act
/// for different accounts. Rewards and deposits move through escrow:
///
/// - an invalid circuit refunds the owner
/// - an executed job pays reward and deposit to the sampler
/// - an invalid result refunds the owner and forfeits the deposit to the
///   verifier
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    account: String,
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    /// Create an empty ledger acting for `account`.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            state: Arc::new(Mutex::new(LedgerState {
                next_id: 1,
                ..LedgerState::default()
            })),
        }
    }

    /// A handle on the same ledger acting for another account.
    pub fn handle(&self, account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Credit `amount` to `account`.
    pub fn fund(&self, account: &str, amount: u128) {
        self.lock().credit(account, amount);
    }

    /// Allow `account` to validate jobs.
    pub fn add_verifier(&self, account: impl Into<String>) {
        self.lock().verifiers.insert(account.into());
    }

    /// Check if `account` may validate jobs.
    pub fn is_verifier(&self, account: &str) -> bool {
        self.lock().verifiers.contains(account)
    }

    /// Balance of any account.
    pub fn balance_of(&self, account: &str) -> u128 {
        self.lock().balances.get(account).copied().unwrap_or(0)
    }

    /// Number of jobs ever submitted and not removed.
    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn account_id(&self) -> &str {
        &self.account
    }

    async fn submit_job(
        &self,
        qubits: u32,
        depth: u32,
        shots: u64,
        job_file: &str,
        reward: u128,
    ) -> LedgerResult<JobId> {
        if reward == 0 {
            return Err(LedgerError::ZeroReward);
        }
        let mut state = self.lock();
        state.debit(&self.account, reward)?;

        let key = state.next_id;
        state.next_id += 1;
        let id = JobId::from(key);
        state.jobs.insert(
            key,
            Job {
                id: id.clone(),
                owner_id: self.account.clone(),
                status: JobStatus::PendingValidation,
                qubits,
                depth,
                shots,
                reward_amount: reward,
                sampler_deposit: 0,
                job_file: job_file.to_string(),
                result_file: None,
                trap_file: None,
                sampler_id: None,
                verifier_id: None,
            },
        );
        debug!(job_id = %id, owner = %self.account, "Job submitted");
        Ok(id)
    }

    async fn get_job(&self, id: &JobId) -> LedgerResult<Job> {
        self.lock().job_mut(id).map(|job| job.clone())
    }

    async fn get_job_status(&self, id: &JobId) -> LedgerResult<JobStatus> {
        self.lock().job_mut(id).map(|job| job.status)
    }

    async fn remove_job(&self, id: &JobId) -> LedgerResult<()> {
        let mut state = self.lock();
        let job = state.job_mut(id)?;
        if job.owner_id != self.account {
            return Err(LedgerError::NotAuthorized {
                account: self.account.clone(),
                action: "remove",
                id: id.clone(),
            });
        }
        if !matches!(job.status, JobStatus::PendingValidation | JobStatus::Waiting) {
            return Err(LedgerError::Transaction(format!(
                "job {id} is {} and can no longer be removed",
                job.status
            )));
        }
        let refund = job.reward_amount;
        let owner = job.owner_id.clone();
        state.jobs.retain(|_, j| &j.id != id);
        state.credit(&owner, refund);
        debug!(job_id = %id, "Job removed");
        Ok(())
    }

    async fn set_job_validity(
        &self,
        id: &JobId,
        valid: bool,
        trapped_file: Option<&str>,
    ) -> LedgerResult<()> {
        let mut state = self.lock();
        if !state.verifiers.contains(&self.account) {
            return Err(LedgerError::NotAuthorized {
                account: self.account.clone(),
                action: "validate",
                id: id.clone(),
            });
        }
        let account = self.account.clone();
        let job = state.job_mut(id)?;
        if valid {
            check_transition(job, JobStatus::Waiting)?;
            let Some(trapped) = trapped_file else {
                return Err(LedgerError::Transaction(format!(
                    "job {id} accepted without a trapped file"
                )));
            };
            job.job_file = trapped.to_string();
            job.verifier_id = Some(account);
            job.status = JobStatus::Waiting;
        } else {
            check_transition(job, JobStatus::Invalid)?;
            job.verifier_id = Some(account);
            job.status = JobStatus::Invalid;
            let (owner, refund) = (job.owner_id.clone(), job.reward_amount);
            state.credit(&owner, refund);
        }
        debug!(job_id = %id, valid, "Job validity set");
        Ok(())
    }

    async fn set_result_validity(
        &self,
        id: &JobId,
        valid: bool,
        trap_file: Option<&str>,
    ) -> LedgerResult<()> {
        let mut state = self.lock();
        let account = self.account.clone();
        let job = state.job_mut(id)?;
        if !job.is_verified_by(&account) {
            return Err(LedgerError::NotAuthorized {
                account,
                action: "check the result of",
                id: id.clone(),
            });
        }
        let to = if valid {
            JobStatus::Executed
        } else {
            JobStatus::Invalid
        };
        check_transition(job, to)?;
        job.status = to;
        job.trap_file = trap_file.map(str::to_string);

        let escrow = job.reward_amount + job.sampler_deposit;
        let owner = job.owner_id.clone();
        let (reward, deposit) = (job.reward_amount, job.sampler_deposit);
        let sampler = job.sampler_id.clone().unwrap_or_default();
        if valid {
            state.credit(&sampler, escrow);
        } else {
            state.credit(&owner, reward);
            state.credit(&account, deposit);
        }
        debug!(job_id = %id, valid, "Result validity set");
        Ok(())
    }

    async fn submit_job_result(
        &self,
        id: &JobId,
        result_file: &str,
        deposit: u128,
    ) -> LedgerResult<()> {
        let mut state = self.lock();
        let job = state.job_mut(id)?;
        check_transition(job, JobStatus::ValidatingResult)?;
        let required = job.required_deposit();
        if deposit < required {
            return Err(LedgerError::InsufficientDeposit {
                required,
                got: deposit,
            });
        }
        state.debit(&self.account, deposit)?;

        let job = state.job_mut(id)?;
        job.status = JobStatus::ValidatingResult;
        job.result_file = Some(result_file.to_string());
        job.sampler_id = Some(self.account.clone());
        job.sampler_deposit = deposit;
        debug!(job_id = %id, sampler = %self.account, "Result submitted");
        Ok(())
    }

    async fn get_latest_jobs(&self, limit: usize) -> LedgerResult<Vec<Job>> {
        Ok(self.lock().jobs.values().rev().take(limit).cloned().collect())
    }

    async fn get_jobs(&self, offset: usize, limit: usize) -> LedgerResult<Vec<Job>> {
        Ok(self
            .lock()
            .jobs
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_jobs_stats(&self) -> LedgerResult<JobStats> {
        Ok(JobStats::from_jobs(self.lock().jobs.values()))
    }

    async fn balance(&self) -> LedgerResult<u128> {
        Ok(self.balance_of(&self.account))
    }
}
