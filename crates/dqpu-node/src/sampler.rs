//! The sampler node.
//!
//! A sampler picks up `waiting` jobs it can afford and run, samples the
//! (trapped) circuit and submits the counts with a deposit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use dqpu_hal::Sampler;

use crate::amount::from_subunits;
use crate::blob::BlobStore;
use crate::config::SamplerConfig;
use crate::error::{NodeError, NodeResult};
use crate::job::{Job, JobStatus};
use crate::ledger::Ledger;
use crate::poll::{PollWindow, jitter_sleep};
use crate::retry::{RetryPolicy, retry_read, submit_logged};

/// Counters of a sampler node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Results submitted.
    pub sampled_jobs: u64,
}

/// Keep `waiting` jobs whose deposit and size fit `config`.
pub fn filter_jobs(jobs: Vec<Job>, config: &SamplerConfig) -> Vec<Job> {
    let max_deposit = config.max_deposit_subunits();
    jobs.into_iter()
        .filter(|job| {
            if job.status != JobStatus::Waiting {
                return false;
            }
            if job.required_deposit() > max_deposit {
                debug!(job_id = %job.id, "Required deposit above max_deposit, skipping");
                return false;
            }
            if job.qubits > config.max_qubits || job.qubits < config.min_qubits {
                debug!(
                    job_id = %job.id,
                    qubits = job.qubits,
                    "Qubit count outside [{}, {}], skipping",
                    config.min_qubits,
                    config.max_qubits
                );
                return false;
            }
            true
        })
        .collect()
}

/// Polls the ledger for jobs to sample.
pub struct SamplerNode {
    ledger: Arc<dyn Ledger>,
    blobs: Arc<dyn BlobStore>,
    sampler: Box<dyn Sampler>,
    config: SamplerConfig,
    retry: RetryPolicy,
    cache_dir: PathBuf,
    window: PollWindow,
    rng: StdRng,
    waiting: u64,
    stats: SamplerStats,
}

impl SamplerNode {
    /// Self-test `sampler` and create a node around it. A sampler that
    /// fails its self-test is refused.
    pub async fn start(
        ledger: Arc<dyn Ledger>,
        blobs: Arc<dyn BlobStore>,
        sampler: Box<dyn Sampler>,
        config: SamplerConfig,
        retry: RetryPolicy,
        cache_dir: impl Into<PathBuf>,
    ) -> NodeResult<Self> {
        info!(sampler = sampler.name(), "Testing sampler");
        if !sampler.self_test().await {
            return Err(NodeError::SelfTestFailed(sampler.name().to_string()));
        }
        info!(sampler = sampler.name(), "Sampler is working correctly");

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            ledger,
            blobs,
            sampler,
            window: PollWindow::new(config.initial_window, config.steady_window),
            config,
            retry,
            cache_dir: cache_dir.into(),
            rng,
            waiting: 0,
            stats: SamplerStats::default(),
        })
    }

    /// Counters so far.
    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Run one polling cycle. Returns the number of results submitted.
    pub async fn poll_once(&mut self) -> NodeResult<usize> {
        if !self.window.is_first() {
            self.wait_for_new_jobs().await?;
        }
        let limit = self.window.next_limit();
        let ledger = Arc::clone(&self.ledger);
        let jobs = retry_read(&self.retry, "get_latest_jobs", || ledger.get_latest_jobs(limit)).await?;
        self.waiting = retry_read(&self.retry, "get_jobs_stats", || ledger.get_jobs_stats())
            .await?
            .waiting;

        let mut jobs = filter_jobs(jobs, &self.config);
        jobs.shuffle(&mut self.rng);
        info!(count = jobs.len(), "Found jobs matching sampler criteria");

        let total = jobs.len();
        let mut submitted = 0;
        for (i, job) in jobs.iter().enumerate() {
            info!(
                job_id = %job.id,
                qubits = job.qubits,
                shots = job.shots,
                "[{}/{}] Processing job",
                i + 1,
                total
            );
            match self.handle_job(job).await {
                Ok(true) => {
                    submitted += 1;
                    self.stats.sampled_jobs += 1;
                    self.waiting = self.waiting.saturating_sub(1);
                }
                Ok(false) => {}
                Err(e) if e.is_transient() => warn!(job_id = %job.id, "Skipping job for now: {e}"),
                Err(e) => warn!(job_id = %job.id, "Failed to handle job: {e}"),
            }
        }
        Ok(submitted)
    }

    /// Poll forever.
    pub async fn run(&mut self) -> NodeResult<()> {
        info!(account = self.ledger.account_id(), "Sampler node started");
        loop {
            if let Err(e) = self.poll_once().await {
                error!("Sampler cycle failed: {e}");
                jitter_sleep(self.config.max_sleep_secs, &mut self.rng).await;
            }
            self.log_balance().await;
            tokio::task::yield_now().await;
        }
    }

    async fn log_balance(&self) {
        let ledger = Arc::clone(&self.ledger);
        if let Ok(balance) = retry_read(&self.retry, "balance", || ledger.balance()).await {
            info!(
                balance = format!("{:.5}", from_subunits(balance)),
                sampled_jobs = self.stats.sampled_jobs,
                "Sampler status"
            );
        }
    }

    /// Pause until the ledger's waiting-job count moves away from the last
    /// one seen, for at most `stats_wait_rounds` jittered pauses. With no
    /// rounds configured this is a single jittered pause.
    async fn wait_for_new_jobs(&mut self) -> NodeResult<()> {
        if self.config.stats_wait_rounds == 0 {
            jitter_sleep(self.config.max_sleep_secs, &mut self.rng).await;
            return Ok(());
        }
        let ledger = Arc::clone(&self.ledger);
        for _ in 0..self.config.stats_wait_rounds {
            let stats = retry_read(&self.retry, "get_jobs_stats", || ledger.get_jobs_stats()).await?;
            if stats.waiting != self.waiting {
                break;
            }
            jitter_sleep(self.config.max_sleep_secs, &mut self.rng).await;
        }
        Ok(())
    }

    /// Sample one job and submit its result. Returns whether the ledger
    /// accepted the submission.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn handle_job(&mut self, job: &Job) -> NodeResult<bool> {
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        let bytes = self.blobs.get(&job.job_file, timeout).await?;
        debug!(file = %job.job_file, "Got circuit");

        let circuit = match dqpu_qasm::parse(&String::from_utf8_lossy(&bytes)) {
            Ok(circuit) => circuit,
            Err(e) => {
                warn!("Failed to parse circuit, skipping: {e}");
                return Ok(false);
            }
        };

        let started = Instant::now();
        let counts = self.sampler.sample(&circuit, job.shots).await?;
        info!(
            sampler = self.sampler.name(),
            elapsed_secs = started.elapsed().as_secs(),
            "Sampling done"
        );

        let path = self.cache_dir.join(format!("{}_result.json", job.id));
        fs::write(&path, counts.to_json()?).await?;
        let cid = self.blobs.upload(&path).await?;
        debug!(cid = %cid, "Result uploaded");

        let deposit = job.required_deposit() + self.config.epsilon_subunits();
        let submit = self
            .ledger
            .submit_job_result(&job.id, cid.as_str(), deposit);
        Ok(submit_logged("submit_job_result", &job.id, submit)
            .await
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobId;

    fn job(id: u64, status: JobStatus, qubits: u32, reward: u128) -> Job {
        Job {
            id: JobId::from(id),
            owner_id: "alice".into(),
            status,
            qubits,
            depth: 1,
            shots: 100,
            reward_amount: reward,
            sampler_deposit: 0,
            job_file: "Qm".into(),
            result_file: None,
            trap_file: None,
            sampler_id: None,
            verifier_id: Some("vera".into()),
        }
    }

    #[test]
    fn test_filter_jobs() {
        let config = SamplerConfig {
            max_deposit: 0.1,
            min_qubits: 2,
            max_qubits: 5,
            ..SamplerConfig::default()
        };
        let affordable = config.max_deposit_subunits() * 10;
        let jobs = vec![
            job(1, JobStatus::Waiting, 3, affordable),
            job(2, JobStatus::PendingValidation, 3, affordable),
            job(3, JobStatus::Waiting, 6, affordable),
            job(4, JobStatus::Waiting, 1, affordable),
            job(5, JobStatus::Waiting, 5, affordable + 10),
            job(6, JobStatus::Waiting, 2, 1),
        ];
        let ids: Vec<_> = filter_jobs(jobs, &config)
            .into_iter()
            .map(|j| j.id.0)
            .collect();
        assert_eq!(ids, ["1", "6"]);
    }
}
