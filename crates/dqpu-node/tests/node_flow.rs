//! End-to-end job lifecycle tests against the in-memory ledger and a local
//! blob store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use dqpu_adapter_sim::StatevectorSampler;
use dqpu_hal::{ExperimentResult, HalResult, Sampler};
use dqpu_ir::Circuit;
use dqpu_node::{
    BlobError, BlobResult, BlobStore, ContentId, Job, JobId, JobStats, JobStatus, JsonTrapStore,
    Ledger, LedgerError, LedgerResult, LocalBlobStore, MemoryLedger, NodeError, RetryPolicy,
    SamplerConfig, SamplerNode, TrapStore, VerifierConfig, VerifierNode, to_subunits,
};
use dqpu_trap::TrapInfo;

const OWNER: &str = "alice";
const VERIFIER: &str = "vera";
const SAMPLER: &str = "bob";

fn no_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 1,
        delay_secs: 0,
    }
}

fn verifier_config() -> VerifierConfig {
    VerifierConfig {
        max_sleep_secs: 0,
        fetch_timeout_secs: 5,
        ..VerifierConfig::default()
    }
}

fn sampler_config() -> SamplerConfig {
    SamplerConfig {
        seed: Some(11),
        max_sleep_secs: 0,
        stats_wait_rounds: 1,
        fetch_timeout_secs: 5,
        ..SamplerConfig::default()
    }
}

struct Devnet {
    dir: TempDir,
    ledger: MemoryLedger,
    blobs: Arc<LocalBlobStore>,
    traps: Arc<JsonTrapStore>,
}

impl Devnet {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger = MemoryLedger::new(OWNER);
        ledger.fund(OWNER, to_subunits(10.0));
        ledger.fund(SAMPLER, to_subunits(10.0));
        ledger.add_verifier(VERIFIER);
        let blobs = Arc::new(LocalBlobStore::new(dir.path().join("blobs")).await.unwrap());
        let traps = Arc::new(JsonTrapStore::new(dir.path().join("traps")).await.unwrap());
        Self {
            dir,
            ledger,
            blobs,
            traps,
        }
    }

    fn cache(&self) -> &Path {
        self.dir.path()
    }

    async fn submit_text(&self, text: &str, qubits: u32, shots: u64) -> JobId {
        let cid = self.blobs.put(text.as_bytes()).await.unwrap();
        self.ledger
            .submit_job(qubits, 2, shots, cid.as_str(), to_subunits(0.5))
            .await
            .unwrap()
    }

    async fn submit_bell(&self, shots: u64) -> JobId {
        let text = dqpu_qasm::serialize(&Circuit::bell().unwrap());
        self.submit_text(&text, 2, shots).await
    }

    fn verifier(&self) -> VerifierNode {
        self.verifier_with(verifier_config(), Arc::new(self.ledger.handle(VERIFIER)))
    }

    fn verifier_with(&self, config: VerifierConfig, ledger: Arc<dyn Ledger>) -> VerifierNode {
        VerifierNode::new(
            ledger,
            self.blobs.clone(),
            self.traps.clone(),
            config,
            no_retry(),
            self.cache(),
        )
        .unwrap()
        .with_seed(5)
    }

    async fn sampler_node(&self, sampler: Box<dyn Sampler>) -> SamplerNode {
        SamplerNode::start(
            Arc::new(self.ledger.handle(SAMPLER)),
            self.blobs.clone(),
            sampler,
            sampler_config(),
            no_retry(),
            self.cache(),
        )
        .await
        .unwrap()
    }

    async fn status(&self, id: &JobId) -> JobStatus {
        self.ledger.get_job_status(id).await.unwrap()
    }

    /// Act as a sampler by hand: publish `counts` as the result of `id`.
    async fn submit_counts(&self, id: &JobId, counts: &ExperimentResult) {
        let cid = self.blobs.put(counts.to_json().unwrap().as_bytes()).await.unwrap();
        let sampler = self.ledger.handle(SAMPLER);
        let job = sampler.get_job(id).await.unwrap();
        sampler
            .submit_job_result(id, cid.as_str(), job.required_deposit())
            .await
            .unwrap();
    }
}

/// Counts for a trapped circuit of `width` bits where every shot reads zero
/// on the non-trap qubits and `trap_value` on each trap.
fn counts_with_traps(
    width: usize,
    traps: &[TrapInfo],
    trap_value: impl Fn(&TrapInfo) -> bool,
    shots: u64,
) -> ExperimentResult {
    let mut bits = vec!['0'; width];
    for trap in traps {
        if trap_value(trap) {
            bits[width - 1 - trap.qubit as usize] = '1';
        }
    }
    [(bits.into_iter().collect::<String>(), shots)]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn test_honest_round_trip_executes() {
    let net = Devnet::new().await;
    let id = net.submit_bell(1000).await;

    let mut verifier = net.verifier();
    assert_eq!(verifier.poll_once().await.unwrap(), 1);
    assert_eq!(net.status(&id).await, JobStatus::Waiting);
    let job = net.ledger.get_job(&id).await.unwrap();
    assert!(job.is_verified_by(VERIFIER));
    assert_eq!(net.traps.load(&id).await.unwrap().map(|t| t.len()), Some(1));

    let mut sampler = net
        .sampler_node(Box::new(StatevectorSampler::seeded(3)))
        .await;
    assert_eq!(sampler.poll_once().await.unwrap(), 1);
    assert_eq!(net.status(&id).await, JobStatus::ValidatingResult);
    assert_eq!(sampler.stats().sampled_jobs, 1);
    assert!(net.cache().join(format!("{id}_result.json")).exists());

    assert_eq!(verifier.poll_once().await.unwrap(), 1);
    assert_eq!(net.status(&id).await, JobStatus::Executed);
    assert_eq!(verifier.stats().verified_jobs, 1);
    assert_eq!(verifier.stats().verified_results, 1);
    assert_eq!(net.traps.load(&id).await.unwrap(), None);

    // Reward plus returned deposit.
    assert_eq!(
        net.ledger.balance_of(SAMPLER),
        to_subunits(10.0) + to_subunits(0.5)
    );
}

#[tokio::test]
async fn test_untrapped_counts_match_original_register() {
    let net = Devnet::new().await;
    let id = net.submit_bell(512).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let job = net.ledger.get_job(&id).await.unwrap();
    let trapped = net.blobs.get(&job.job_file, Duration::from_secs(1)).await.unwrap();
    let circuit = dqpu_qasm::parse(std::str::from_utf8(&trapped).unwrap()).unwrap();
    assert_eq!(circuit.num_qubits(), 3);

    let counts = StatevectorSampler::seeded(1)
        .sample(&circuit, 512)
        .await
        .unwrap();
    let traps = net.traps.load(&id).await.unwrap().unwrap();
    let untrapped = dqpu_trap::untrap_results(&traps, &counts);
    assert_eq!(untrapped.total(), 512);
    assert!(untrapped.iter().all(|(key, _)| key == "00" || key == "11"));
}

#[tokio::test]
async fn test_verifier_run_until_stopped() {
    let net = Devnet::new().await;
    let id = net.submit_bell(100).await;
    let mut verifier = net.verifier();

    let stopped = tokio::time::timeout(Duration::from_millis(200), verifier.run()).await;
    assert!(stopped.is_err());
    assert_eq!(net.status(&id).await, JobStatus::Waiting);
    assert_eq!(verifier.stats().verified_jobs, 1);
}

#[tokio::test]
async fn test_unparseable_circuit_is_invalid() {
    let net = Devnet::new().await;
    let id = net
        .submit_text("OPENQASM 2.0;\nqreg q[2];\nfoo q[0];", 2, 100)
        .await;

    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();
    assert_eq!(net.status(&id).await, JobStatus::Invalid);
    assert_eq!(verifier.stats().rejected_jobs, 1);
    assert_eq!(net.traps.load(&id).await.unwrap(), None);
    assert_eq!(net.ledger.balance_of(OWNER), to_subunits(10.0));
}

#[tokio::test]
async fn test_shot_count_mismatch_is_invalid() {
    let net = Devnet::new().await;
    let id = net.submit_bell(1000).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    let short = counts_with_traps(3, &traps, |t| t.value_expected, 900);
    net.submit_counts(&id, &short).await;

    verifier.poll_once().await.unwrap();
    assert_eq!(net.status(&id).await, JobStatus::Invalid);
    assert_eq!(net.traps.load(&id).await.unwrap(), None);
    // Forfeited deposit goes to the verifier.
    assert!(net.ledger.balance_of(VERIFIER) > 0);
}

#[tokio::test]
async fn test_matching_shot_count_with_correct_traps_executes() {
    let net = Devnet::new().await;
    let id = net.submit_bell(1000).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    let mut counts = counts_with_traps(3, &traps, |t| t.value_expected, 500);
    // Same trap bits, different payload bits.
    let key = counts.iter().next().unwrap().0.to_string();
    let flipped: String = key
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let qubit = (2 - i) as u32;
            if traps.iter().any(|t| t.qubit == qubit) {
                c
            } else {
                '1'
            }
        })
        .collect();
    counts.insert(flipped, 500);
    assert_eq!(counts.total(), 1000);
    net.submit_counts(&id, &counts).await;

    verifier.poll_once().await.unwrap();
    assert_eq!(net.status(&id).await, JobStatus::Executed);
}

#[tokio::test]
async fn test_tampered_traps_are_invalid() {
    let net = Devnet::new().await;
    let id = net.submit_bell(1000).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    let lying = counts_with_traps(3, &traps, |t| !t.value_expected, 1000);
    net.submit_counts(&id, &lying).await;

    verifier.poll_once().await.unwrap();
    assert_eq!(net.status(&id).await, JobStatus::Invalid);
    assert_eq!(net.ledger.balance_of(OWNER), to_subunits(10.0));
}

#[tokio::test]
async fn test_malformed_result_is_invalid() {
    let net = Devnet::new().await;
    let id = net.submit_bell(100).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let cid = net.blobs.put(b"{\"00\": \"many\"}").await.unwrap();
    let sampler = net.ledger.handle(SAMPLER);
    let deposit = sampler.get_job(&id).await.unwrap().required_deposit();
    sampler
        .submit_job_result(&id, cid.as_str(), deposit)
        .await
        .unwrap();

    verifier.poll_once().await.unwrap();
    assert_eq!(net.status(&id).await, JobStatus::Invalid);
}

#[tokio::test]
async fn test_overflowing_counts_are_invalid() {
    let net = Devnet::new().await;
    let overflowing = net.submit_bell(1000).await;
    let honest = net.submit_bell(1000).await;
    let mut verifier = net.verifier();
    assert_eq!(verifier.poll_once().await.unwrap(), 2);

    let cid = net
        .blobs
        .put(br#"{"000": 18446744073709551615, "111": 1001}"#)
        .await
        .unwrap();
    let sampler = net.ledger.handle(SAMPLER);
    let deposit = sampler.get_job(&overflowing).await.unwrap().required_deposit();
    sampler
        .submit_job_result(&overflowing, cid.as_str(), deposit)
        .await
        .unwrap();

    let traps = net.traps.load(&honest).await.unwrap().unwrap();
    let counts = counts_with_traps(3, &traps, |t| t.value_expected, 1000);
    net.submit_counts(&honest, &counts).await;

    assert_eq!(verifier.poll_once().await.unwrap(), 2);
    assert_eq!(net.status(&overflowing).await, JobStatus::Invalid);
    assert_eq!(net.status(&honest).await, JobStatus::Executed);
}

#[tokio::test]
async fn test_missing_trap_metadata_skips_job() {
    let net = Devnet::new().await;
    let id = net.submit_bell(1000).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    let counts = counts_with_traps(3, &traps, |t| t.value_expected, 1000);
    net.submit_counts(&id, &counts).await;
    assert!(net.traps.remove(&id).await.unwrap());

    assert_eq!(verifier.poll_once().await.unwrap(), 0);
    assert_eq!(net.status(&id).await, JobStatus::ValidatingResult);
    assert_eq!(verifier.stats().verified_results, 0);
}

#[tokio::test]
async fn test_missing_trap_metadata_error() {
    let net = Devnet::new().await;
    let id = net.submit_bell(10).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    net.submit_counts(&id, &counts_with_traps(3, &traps, |_| true, 10))
        .await;
    net.traps.remove(&id).await.unwrap();

    let job = net.ledger.get_job(&id).await.unwrap();
    let err = verifier.handle_validating(&job).await.unwrap_err();
    assert!(matches!(err, NodeError::MissingTrapMetadata(ref j) if *j == id));
}

#[tokio::test]
async fn test_results_of_other_verifiers_are_ignored() {
    let net = Devnet::new().await;
    net.ledger.add_verifier("victor");
    let id = net.submit_bell(1000).await;
    let mut verifier = net.verifier();
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    net.submit_counts(&id, &counts_with_traps(3, &traps, |t| t.value_expected, 1000))
        .await;

    let mut other = net.verifier_with(verifier_config(), Arc::new(net.ledger.handle("victor")));
    assert_eq!(other.poll_once().await.unwrap(), 0);
    assert_eq!(net.status(&id).await, JobStatus::ValidatingResult);
}

#[tokio::test]
async fn test_missing_blob_leaves_job_pending() {
    let net = Devnet::new().await;
    let id = net
        .ledger
        .submit_job(2, 2, 100, &"ab".repeat(32), to_subunits(0.5))
        .await
        .unwrap();

    let mut verifier = net.verifier();
    assert_eq!(verifier.poll_once().await.unwrap(), 0);
    assert_eq!(net.status(&id).await, JobStatus::PendingValidation);
}

/// Blob store that never answers reads.
struct StalledBlobs;

#[async_trait]
impl BlobStore for StalledBlobs {
    async fn upload(&self, _path: &Path) -> BlobResult<ContentId> {
        Ok(ContentId("stalled".into()))
    }

    async fn get(&self, cid: &str, timeout: Duration) -> BlobResult<Vec<u8>> {
        match tokio::time::timeout(timeout, std::future::pending::<Vec<u8>>()).await {
            Ok(bytes) => Ok(bytes),
            Err(_) => Err(BlobError::Timeout {
                cid: cid.to_string(),
                after: timeout,
            }),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetch_timeout_defers_job() {
    let ledger = MemoryLedger::new(OWNER);
    ledger.fund(OWNER, 1_000);
    ledger.add_verifier(VERIFIER);
    let id = ledger.submit_job(2, 2, 100, "Qm", 100).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let traps = Arc::new(JsonTrapStore::new(dir.path()).await.unwrap());
    let mut verifier = VerifierNode::new(
        Arc::new(ledger.handle(VERIFIER)),
        Arc::new(StalledBlobs),
        traps,
        verifier_config(),
        no_retry(),
        dir.path(),
    )
    .unwrap();

    let job = ledger.get_job(&id).await.unwrap();
    let err = verifier.handle_pending(&job).await.unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(err, NodeError::Blob(BlobError::Timeout { .. })));

    assert_eq!(verifier.poll_once().await.unwrap(), 0);
    assert_eq!(
        ledger.get_job_status(&id).await.unwrap(),
        JobStatus::PendingValidation
    );
}

/// Ledger that rejects every validity vote for one job.
struct RejectingLedger {
    inner: MemoryLedger,
    reject: JobId,
}

#[async_trait]
impl Ledger for RejectingLedger {
    fn account_id(&self) -> &str {
        self.inner.account_id()
    }

    async fn submit_job(
        &self,
        qubits: u32,
        depth: u32,
        shots: u64,
        job_file: &str,
        reward: u128,
    ) -> LedgerResult<JobId> {
        self.inner
            .submit_job(qubits, depth, shots, job_file, reward)
            .await
    }

    async fn get_job(&self, id: &JobId) -> LedgerResult<Job> {
        self.inner.get_job(id).await
    }

    async fn get_job_status(&self, id: &JobId) -> LedgerResult<JobStatus> {
        self.inner.get_job_status(id).await
    }

    async fn remove_job(&self, id: &JobId) -> LedgerResult<()> {
        self.inner.remove_job(id).await
    }

    async fn set_job_validity(
        &self,
        id: &JobId,
        valid: bool,
        trapped_file: Option<&str>,
    ) -> LedgerResult<()> {
        if *id == self.reject {
            return Err(LedgerError::Transaction("out of gas".into()));
        }
        self.inner.set_job_validity(id, valid, trapped_file).await
    }

    async fn set_result_validity(
        &self,
        id: &JobId,
        valid: bool,
        trap_file: Option<&str>,
    ) -> LedgerResult<()> {
        self.inner.set_result_validity(id, valid, trap_file).await
    }

    async fn submit_job_result(
        &self,
        id: &JobId,
        result_file: &str,
        deposit: u128,
    ) -> LedgerResult<()> {
        self.inner.submit_job_result(id, result_file, deposit).await
    }

    async fn get_latest_jobs(&self, limit: usize) -> LedgerResult<Vec<Job>> {
        self.inner.get_latest_jobs(limit).await
    }

    async fn get_jobs(&self, offset: usize, limit: usize) -> LedgerResult<Vec<Job>> {
        self.inner.get_jobs(offset, limit).await
    }

    async fn get_jobs_stats(&self) -> LedgerResult<JobStats> {
        self.inner.get_jobs_stats().await
    }

    async fn balance(&self) -> LedgerResult<u128> {
        self.inner.balance().await
    }
}

#[tokio::test]
async fn test_failed_submission_does_not_abort_batch() {
    let net = Devnet::new().await;
    let first = net.submit_bell(100).await;
    let second = net.submit_bell(100).await;

    let ledger = Arc::new(RejectingLedger {
        inner: net.ledger.handle(VERIFIER),
        reject: first.clone(),
    });
    let mut verifier = net.verifier_with(verifier_config(), ledger);
    verifier.poll_once().await.unwrap();

    assert_eq!(net.status(&first).await, JobStatus::PendingValidation);
    assert_eq!(net.status(&second).await, JobStatus::Waiting);
    assert_eq!(verifier.stats().verified_jobs, 1);

    // Traps of the rejected vote are dropped, those of the accepted one kept.
    assert_eq!(net.traps.load(&first).await.unwrap(), None);
    assert!(net.traps.load(&second).await.unwrap().is_some());
    assert_eq!(net.traps.len().await, 1);
    assert!(!net.dir.path().join("traps").join(format!("{first}_trap.json")).exists());
}

#[tokio::test]
async fn test_published_trap_file() {
    let net = Devnet::new().await;
    let id = net.submit_bell(1000).await;
    let config = VerifierConfig {
        publish_traps: true,
        ..verifier_config()
    };
    let mut verifier = net.verifier_with(config, Arc::new(net.ledger.handle(VERIFIER)));
    verifier.poll_once().await.unwrap();

    let traps = net.traps.load(&id).await.unwrap().unwrap();
    net.submit_counts(&id, &counts_with_traps(3, &traps, |t| t.value_expected, 1000))
        .await;
    verifier.poll_once().await.unwrap();

    let job = net.ledger.get_job(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Executed);
    let trap_file = job.trap_file.unwrap();
    let bytes = net.blobs.get(&trap_file, Duration::from_secs(1)).await.unwrap();
    assert_eq!(dqpu_trap::load_traps(&bytes).unwrap(), traps);
}

/// Sampler that always reports the same counts.
struct Broken;

#[async_trait]
impl Sampler for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn max_qubits(&self) -> u32 {
        32
    }

    async fn sample(&self, _circuit: &Circuit, shots: u64) -> HalResult<ExperimentResult> {
        Ok([("01", shots)].into_iter().collect())
    }
}

#[tokio::test]
async fn test_sampler_refuses_to_start_on_failed_self_test() {
    let net = Devnet::new().await;
    let result = SamplerNode::start(
        Arc::new(net.ledger.handle(SAMPLER)),
        net.blobs.clone(),
        Box::new(Broken),
        sampler_config(),
        no_retry(),
        net.cache(),
    )
    .await;
    assert!(matches!(result, Err(NodeError::SelfTestFailed(name)) if name == "broken"));
}

#[tokio::test]
async fn test_sampler_skips_unparseable_and_oversized_jobs() {
    let net = Devnet::new().await;
    let verifier_ledger = net.ledger.handle(VERIFIER);

    let garbage = net.submit_text("not a circuit", 2, 100).await;
    let garbage_cid = net.blobs.put(b"still not").await.unwrap();
    verifier_ledger
        .set_job_validity(&garbage, true, Some(garbage_cid.as_str()))
        .await
        .unwrap();

    let ghz = net.submit_bell(100).await;
    let cid = net
        .blobs
        .put(dqpu_qasm::serialize(&Circuit::ghz(4).unwrap()).as_bytes())
        .await
        .unwrap();
    verifier_ledger
        .set_job_validity(&ghz, true, Some(cid.as_str()))
        .await
        .unwrap();

    let mut sampler = net
        .sampler_node(Box::new(StatevectorSampler::seeded(2)))
        .await;
    assert_eq!(sampler.poll_once().await.unwrap(), 1);
    assert_eq!(net.status(&garbage).await, JobStatus::Waiting);
    assert_eq!(net.status(&ghz).await, JobStatus::ValidatingResult);

    // Claims more qubits than the node accepts.
    let huge = net.submit_text("OPENQASM 2.0;", 40, 100).await;
    verifier_ledger
        .set_job_validity(&huge, true, Some(cid.as_str()))
        .await
        .unwrap();
    assert_eq!(sampler.poll_once().await.unwrap(), 0);
    assert_eq!(net.status(&huge).await, JobStatus::Waiting);
}

#[tokio::test]
async fn test_sampler_deposit_covers_minimum() {
    let net = Devnet::new().await;
    let id = net.submit_bell(64).await;
    net.verifier().poll_once().await.unwrap();

    let mut sampler = net
        .sampler_node(Box::new(StatevectorSampler::seeded(4)))
        .await;
    sampler.poll_once().await.unwrap();

    let job = net.ledger.get_job(&id).await.unwrap();
    assert_eq!(job.sampler_id.as_deref(), Some(SAMPLER));
    assert_eq!(
        job.sampler_deposit,
        job.required_deposit() + to_subunits(0.00001)
    );
}

#[tokio::test(start_paused = true)]
async fn test_sampler_pauses_between_cycles_without_stats_wait() {
    let net = Devnet::new().await;
    let config = SamplerConfig {
        stats_wait_rounds: 0,
        max_sleep_secs: 1000,
        ..sampler_config()
    };
    let mut sampler = SamplerNode::start(
        Arc::new(net.ledger.handle(SAMPLER)),
        net.blobs.clone(),
        Box::new(StatevectorSampler::seeded(3)),
        config,
        no_retry(),
        net.cache(),
    )
    .await
    .unwrap();

    let start = tokio::time::Instant::now();
    assert_eq!(sampler.poll_once().await.unwrap(), 0);
    assert_eq!(start.elapsed(), Duration::ZERO);

    assert_eq!(sampler.poll_once().await.unwrap(), 0);
    assert!(start.elapsed() >= Duration::from_secs(1));
}
