//! Devnet command implementation.
//!
//! Runs a requester, a verifier and a sampler in one process against an
//! in-memory ledger and the configured blob store, then prints what
//! happened to each submitted circuit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use tracing::{info, warn};

use dqpu_hal::ExperimentResult;
use dqpu_node::{
    BlobStore, JobId, JobStatus, JsonTrapStore, Ledger, MemoryLedger, NodeConfig,
    SamplerNode, VerifierNode, from_subunits, to_subunits,
};

use super::common::{load_circuit, print_counts, sampler_registry};

const REQUESTER: &str = "requester";
const VERIFIER: &str = "verifier";
const SAMPLER: &str = "sampler";
const FUNDING: f64 = 100.0;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Options of the devnet command.
#[derive(Debug, Clone)]
pub struct DevnetOptions {
    pub circuits: Vec<PathBuf>,
    pub shots: u64,
    pub reward: f64,
    pub sampler: Option<String>,
    pub seed: Option<u64>,
    pub max_cycles: u32,
    pub state_dir: Option<PathBuf>,
}

/// Final state of one submitted circuit.
#[derive(Debug, Clone)]
pub struct DevnetOutcome {
    pub path: PathBuf,
    pub id: JobId,
    pub status: JobStatus,
    pub counts: Option<ExperimentResult>,
}

/// Drive every circuit through the job lifecycle.
pub async fn run(config: Option<&Path>, options: &DevnetOptions) -> Result<Vec<DevnetOutcome>> {
    let mut config = NodeConfig::load(config).await?;
    if let Some(dir) = &options.state_dir {
        config.state_dir.clone_from(dir);
    }
    if let Some(name) = &options.sampler {
        config.sampler.sampler.clone_from(name);
    }
    config.sampler.seed = options.seed.or(config.sampler.seed);
    config.sampler.max_sleep_secs = 0;
    config.sampler.stats_wait_rounds = 0;
    config.verifier.max_sleep_secs = 0;
    config.verifier.publish_traps = true;
    config.ensure_dirs().await?;
    info!(state_dir = %config.state_dir.display(), "Starting devnet");

    let requester = MemoryLedger::new(REQUESTER);
    requester.fund(REQUESTER, to_subunits(FUNDING));
    requester.fund(SAMPLER, to_subunits(FUNDING));
    requester.add_verifier(VERIFIER);

    let blobs = config.blob_store().await?;
    let traps = Arc::new(JsonTrapStore::new(config.verifier_dir()).await?);

    let mut submitted = Vec::with_capacity(options.circuits.len());
    for path in &options.circuits {
        let circuit = load_circuit(path)?;
        let cid = blobs.upload(path).await?;
        let id = requester
            .submit_job(
                circuit.num_qubits(),
                u32::try_from(circuit.depth()).unwrap_or(u32::MAX),
                options.shots,
                cid.as_str(),
                to_subunits(options.reward),
            )
            .await
            .with_context(|| format!("Failed to submit {}", path.display()))?;
        info!(job_id = %id, path = %path.display(), "Submitted job");
        submitted.push((path.clone(), id));
    }

    let mut verifier = VerifierNode::new(
        Arc::new(requester.handle(VERIFIER)),
        blobs.clone(),
        traps,
        config.verifier.clone(),
        config.retry,
        config.verifier_cache_dir(),
    )?;
    if let Some(seed) = options.seed {
        verifier = verifier.with_seed(seed);
    }

    let mut backend = dqpu_hal::SamplerConfig::new(config.sampler.sampler.as_str());
    backend.seed = config.sampler.seed;
    let mut sampler = SamplerNode::start(
        Arc::new(requester.handle(SAMPLER)),
        blobs.clone(),
        sampler_registry().create(backend)?,
        config.sampler.clone(),
        config.retry,
        config.sampler_cache_dir(),
    )
    .await?;

    let drive = async {
        for cycle in 1..=options.max_cycles {
            verifier.poll_once().await?;
            sampler.poll_once().await?;
            let stats = requester.get_jobs_stats().await?;
            if stats.executed + stats.invalid == stats.total() {
                return Ok::<_, anyhow::Error>(cycle);
            }
        }
        Ok(options.max_cycles)
    };
    tokio::select! {
        cycles = drive => {
            info!(cycles = cycles?, "Devnet finished");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, reporting current state");
        }
    }

    let mut outcomes = Vec::with_capacity(submitted.len());
    for (path, id) in submitted {
        let job = requester.get_job(&id).await?;
        let counts = match job.status {
            JobStatus::Executed => Some(untrapped_counts(blobs.as_ref(), &job).await?),
            _ => None,
        };
        outcomes.push(DevnetOutcome {
            path,
            id,
            status: job.status,
            counts,
        });
    }

    info!(
        requester = from_subunits(requester.balance_of(REQUESTER)),
        verifier = from_subunits(requester.balance_of(VERIFIER)),
        sampler = from_subunits(requester.balance_of(SAMPLER)),
        "Final balances"
    );
    Ok(outcomes)
}

async fn untrapped_counts(blobs: &dyn BlobStore, job: &dqpu_node::Job) -> Result<ExperimentResult> {
    let result_file = job
        .result_file
        .as_deref()
        .with_context(|| format!("Job {} has no result file", job.id))?;
    let trap_file = job
        .trap_file
        .as_deref()
        .with_context(|| format!("Job {} has no trap file", job.id))?;

    let counts = ExperimentResult::from_json(&blobs.get(result_file, FETCH_TIMEOUT).await?)?;
    let traps = dqpu_trap::load_traps(&blobs.get(trap_file, FETCH_TIMEOUT).await?)?;
    Ok(dqpu_trap::untrap_results(&traps, &counts))
}

/// Execute the devnet command.
pub async fn execute(config: Option<&Path>, options: DevnetOptions) -> Result<()> {
    if options.circuits.is_empty() {
        anyhow::bail!("No circuits given");
    }

    eprintln!(
        "{} Running {} circuit(s) on a local devnet ({} shots each)",
        style("→").cyan().bold(),
        options.circuits.len(),
        options.shots
    );

    let outcomes = run(config, &options).await?;

    for outcome in &outcomes {
        let status = match outcome.status {
            JobStatus::Executed => style(outcome.status.name()).green(),
            JobStatus::Invalid => style(outcome.status.name()).red(),
            _ => style(outcome.status.name()).yellow(),
        };
        println!();
        println!(
            "Job {} {} {}",
            style(&outcome.id).bold(),
            outcome.path.display(),
            status
        );
        if let Some(counts) = &outcome.counts {
            print_counts(counts);
        }
    }
    Ok(())
}
