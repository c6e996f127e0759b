//! The verifier node.
//!
//! A verifier traps incoming circuits before samplers see them, and later
//! checks the traps in the results of the jobs it trapped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use dqpu_hal::ExperimentResult;
use dqpu_trap::{Trapper, trapper_for};

use crate::amount::from_subunits;
use crate::blob::BlobStore;
use crate::config::VerifierConfig;
use crate::error::{NodeError, NodeResult};
use crate::job::{Job, JobId, JobStatus};
use crate::ledger::Ledger;
use crate::poll::{PollWindow, jitter_sleep};
use crate::retry::{RetryPolicy, retry_read, submit_logged};
use crate::trap_store::TrapStore;

/// Counters of a verifier node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierStats {
    /// Jobs trapped and published.
    pub verified_jobs: u64,
    /// Jobs rejected because their circuit did not parse.
    pub rejected_jobs: u64,
    /// Results voted on.
    pub verified_results: u64,
}

/// Polls the ledger for jobs to trap and results to check.
pub struct VerifierNode {
    ledger: Arc<dyn Ledger>,
    blobs: Arc<dyn BlobStore>,
    traps: Arc<dyn TrapStore>,
    trapper: Box<dyn Trapper>,
    config: VerifierConfig,
    retry: RetryPolicy,
    cache_dir: PathBuf,
    window: PollWindow,
    rng: StdRng,
    stats: VerifierStats,
}

impl VerifierNode {
    /// Create a verifier writing trapped circuits to `cache_dir`.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        blobs: Arc<dyn BlobStore>,
        traps: Arc<dyn TrapStore>,
        config: VerifierConfig,
        retry: RetryPolicy,
        cache_dir: impl Into<PathBuf>,
    ) -> NodeResult<Self> {
        let trapper = trapper_for(&config.trap_method)?;
        Ok(Self {
            ledger,
            blobs,
            traps,
            trapper,
            window: PollWindow::new(config.initial_window, config.steady_window),
            config,
            retry,
            cache_dir: cache_dir.into(),
            rng: StdRng::from_entropy(),
            stats: VerifierStats::default(),
        })
    }

    /// Fix the seed used for trap placement.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Counters so far.
    pub fn stats(&self) -> VerifierStats {
        self.stats
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.config.fetch_timeout_secs)
    }

    /// Run one polling cycle. Returns the number of jobs this node acted on.
    pub async fn poll_once(&mut self) -> NodeResult<usize> {
        let limit = self.window.next_limit();
        let ledger = Arc::clone(&self.ledger);
        let jobs = retry_read(&self.retry, "get_latest_jobs", || ledger.get_latest_jobs(limit)).await?;
        debug!(count = jobs.len(), limit, "Fetched latest jobs");

        let account = self.ledger.account_id().to_string();
        let mut handled = 0;
        for job in jobs {
            let outcome = match job.status {
                JobStatus::PendingValidation => self.handle_pending(&job).await,
                JobStatus::ValidatingResult if job.is_verified_by(&account) => {
                    self.handle_validating(&job).await
                }
                _ => continue,
            };
            match outcome {
                Ok(()) => handled += 1,
                Err(NodeError::MissingTrapMetadata(id)) => {
                    warn!(job_id = %id, "No trap metadata for job, skipping");
                }
                Err(e) if e.is_transient() => {
                    warn!(job_id = %job.id, "Deferring job: {e}");
                }
                Err(e) => {
                    warn!(job_id = %job.id, "Skipping job: {e}");
                }
            }
        }
        Ok(handled)
    }

    /// Poll forever, pausing a random time between cycles.
    pub async fn run(&mut self) -> NodeResult<()> {
        info!(account = self.ledger.account_id(), "Verifier node started");
        loop {
            if let Err(e) = self.poll_once().await {
                error!("Verifier cycle failed: {e}");
            }
            self.log_balance().await;
            jitter_sleep(self.config.max_sleep_secs, &mut self.rng).await;
        }
    }

    async fn log_balance(&self) {
        let ledger = Arc::clone(&self.ledger);
        if let Ok(balance) = retry_read(&self.retry, "balance", || ledger.balance()).await {
            info!(
                balance = format!("{:.5}", from_subunits(balance)),
                verified_jobs = self.stats.verified_jobs,
                verified_results = self.stats.verified_results,
                "Verifier status"
            );
        }
    }

    /// Trap a `pending-validation` job and publish the trapped circuit, or
    /// reject it if its circuit does not parse.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn handle_pending(&mut self, job: &Job) -> NodeResult<()> {
        info!(owner = %job.owner_id, "Processing pending-validation job");
        let bytes = self.blobs.get(&job.job_file, self.fetch_timeout()).await?;

        let circuit = match dqpu_qasm::parse(&String::from_utf8_lossy(&bytes)) {
            Ok(circuit) => circuit,
            Err(e) => {
                warn!("Failed to parse circuit: {e}");
                let ledger = &self.ledger;
                let vote = ledger.set_job_validity(&job.id, false, None);
                if submit_logged("set_job_validity", &job.id, vote).await.is_some() {
                    self.stats.rejected_jobs += 1;
                }
                return Ok(());
            }
        };

        let trapped = self
            .trapper
            .trap(&circuit, self.config.trap_level, &mut self.rng)?;
        debug!(
            qubits = trapped.circuit.num_qubits(),
            traps = trapped.traps.len(),
            "Circuit trapped"
        );

        // Traps must be on disk before the trapped circuit becomes visible.
        self.traps.save(&job.id, &trapped.traps).await?;

        let path = self.cache_dir.join(format!("{}_trapped.qasm", job.id));
        fs::write(&path, dqpu_qasm::serialize(&trapped.circuit)).await?;
        let cid = self.blobs.upload(&path).await?;
        debug!(cid = %cid, "Trapped circuit uploaded");

        let vote = self.ledger.set_job_validity(&job.id, true, Some(cid.as_str()));
        if submit_logged("set_job_validity", &job.id, vote).await.is_some() {
            self.stats.verified_jobs += 1;
            info!("Job trapped and published");
        } else if let Err(e) = self.traps.remove(&job.id).await {
            warn!("Failed to remove trap metadata: {e}");
        }
        Ok(())
    }

    /// Check a sampler's result against the traps of a job this node
    /// trapped.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn handle_validating(&mut self, job: &Job) -> NodeResult<()> {
        info!(sampler = job.sampler_id.as_deref().unwrap_or(""), "Processing validating-result job");

        let Some(result_file) = job.result_file.as_deref() else {
            warn!("Job has no result file");
            return self.vote_result(&job.id, false).await;
        };
        let bytes = self.blobs.get(result_file, self.fetch_timeout()).await?;

        let counts = match ExperimentResult::from_json(&bytes) {
            Ok(counts) => counts,
            Err(e) => {
                warn!("Malformed result data: {e}");
                return self.vote_result(&job.id, false).await;
            }
        };

        if counts.checked_total() != Some(job.shots) {
            let mismatch = NodeError::ShotCountMismatch {
                job: job.id.clone(),
                expected: job.shots,
                got: counts.total(),
            };
            warn!("{mismatch}");
            return self.vote_result(&job.id, false).await;
        }

        let traps = self
            .traps
            .load(&job.id)
            .await?
            .ok_or_else(|| NodeError::MissingTrapMetadata(job.id.clone()))?;

        let valid = self.trapper.verify(&traps, &counts);
        debug!(valid, traps = traps.len(), "Traps checked");
        self.vote_result(&job.id, valid).await
    }

    async fn vote_result(&mut self, id: &JobId, valid: bool) -> NodeResult<()> {
        let trap_file = if valid && self.config.publish_traps {
            self.publish_traps(id).await
        } else {
            None
        };

        let vote = self
            .ledger
            .set_result_validity(id, valid, trap_file.as_deref());
        if submit_logged("set_result_validity", id, vote).await.is_none() {
            return Ok(());
        }
        self.stats.verified_results += 1;
        info!(job_id = %id, valid, "Result voted");

        if let Err(e) = self.traps.remove(id).await {
            warn!(job_id = %id, "Failed to remove trap metadata: {e}");
        }
        Ok(())
    }

    async fn publish_traps(&self, id: &JobId) -> Option<String> {
        let path = self.traps.file_path(id)?;
        match self.blobs.upload(&path).await {
            Ok(cid) => Some(cid.0),
            Err(e) => {
                warn!(job_id = %id, "Failed to upload trap file: {e}");
                None
            }
        }
    }
}
