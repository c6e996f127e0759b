//! Node configuration.
//!
//! Settings come from defaults, then an optional YAML file, then the
//! `DQPU_*` environment variables. The binary applies its flags last.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;

use dqpu_trap::BASIC_METHOD;

use crate::amount::to_subunits;
use crate::blob::{BlobStore, DEFAULT_IPFS_API, DEFAULT_IPFS_GATEWAY, IpfsGateway, LocalBlobStore};
use crate::error::{NodeError, NodeResult};
use crate::retry::RetryPolicy;

/// Verifier node settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Jobs fetched on the first cycle.
    pub initial_window: usize,
    /// Jobs fetched on later cycles.
    pub steady_window: usize,
    /// Upper bound of the random pause between cycles, in seconds.
    pub max_sleep_secs: u64,
    /// Timeout for blob reads, in seconds.
    pub fetch_timeout_secs: u64,
    /// Traps inserted per job.
    pub trap_level: u32,
    /// Trap strategy.
    pub trap_method: String,
    /// Publish the trap file along with an accepted result.
    pub publish_traps: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            initial_window: 256,
            steady_window: 48,
            max_sleep_secs: 60,
            fetch_timeout_secs: 10,
            trap_level: 1,
            trap_method: BASIC_METHOD.to_string(),
            publish_traps: false,
        }
    }
}

/// Sampler node settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Registry name of the sampler to run.
    pub sampler: String,
    /// Seed for the sampler and the node's shuffling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Largest deposit the node will lock per job, in units.
    pub max_deposit: f64,
    /// Smallest job accepted, in qubits.
    pub min_qubits: u32,
    /// Largest job accepted, in qubits.
    pub max_qubits: u32,
    /// Added on top of the minimum deposit, in units.
    pub deposit_epsilon: f64,
    /// Upper bound of the random pause while waiting for new jobs, in seconds.
    pub max_sleep_secs: u64,
    /// Pauses spent waiting for the waiting-job count to change.
    pub stats_wait_rounds: u32,
    /// Timeout for blob reads, in seconds.
    pub fetch_timeout_secs: u64,
    /// Jobs fetched on the first cycle.
    pub initial_window: usize,
    /// Jobs fetched on later cycles.
    pub steady_window: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sampler: "statevector".to_string(),
            seed: None,
            max_deposit: 0.1,
            min_qubits: 1,
            max_qubits: 21,
            deposit_epsilon: 0.00001,
            max_sleep_secs: 5,
            stats_wait_rounds: 5,
            fetch_timeout_secs: 10,
            initial_window: 256,
            steady_window: 50,
        }
    }
}

impl SamplerConfig {
    /// Largest deposit in subunits.
    pub fn max_deposit_subunits(&self) -> u128 {
        to_subunits(self.max_deposit)
    }

    /// Deposit epsilon in subunits.
    pub fn epsilon_subunits(&self) -> u128 {
        to_subunits(self.deposit_epsilon)
    }
}

/// Where blobs are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobConfig {
    /// Content-addressed directory under the state directory.
    #[default]
    Local,
    /// IPFS daemon. Addresses default to a daemon on localhost.
    Ipfs {
        #[serde(default = "default_ipfs_api")]
        api_url: String,
        #[serde(default = "default_ipfs_gateway")]
        gateway_url: String,
    },
}

fn default_ipfs_api() -> String {
    DEFAULT_IPFS_API.to_string()
}

fn default_ipfs_gateway() -> String {
    DEFAULT_IPFS_GATEWAY.to_string()
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Ledger account the node acts for.
    pub account: String,
    /// Directory for caches and trap metadata.
    pub state_dir: PathBuf,
    /// Blob store backend.
    pub blob: BlobConfig,
    /// Retry policy for ledger reads.
    pub retry: RetryPolicy,
    /// Verifier settings.
    pub verifier: VerifierConfig,
    /// Sampler settings.
    pub sampler: SamplerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            state_dir: default_state_dir(),
            blob: BlobConfig::default(),
            retry: RetryPolicy::default(),
            verifier: VerifierConfig::default(),
            sampler: SamplerConfig::default(),
        }
    }
}

/// `$DQPU_STATE_DIR`, else `~/.dqpu`, else a directory under the system
/// temp dir.
pub fn default_state_dir() -> PathBuf {
    std::env::var("DQPU_STATE_DIR")
        .map(PathBuf::from)
        .ok()
        .or_else(|| dirs::home_dir().map(|home| home.join(".dqpu")))
        .unwrap_or_else(|| std::env::temp_dir().join("dqpu"))
}

impl NodeConfig {
    /// Parse a YAML configuration.
    pub fn from_yaml(text: &str) -> NodeResult<Self> {
        let config: NodeConfig = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> NodeResult<Self> {
        let text = fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml(&text)
    }

    /// Defaults or `path`, then environment overrides.
    pub async fn load(path: Option<&Path>) -> NodeResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    fn merge_env(mut self) -> Self {
        if let Ok(account) = std::env::var("DQPU_ACCOUNT") {
            self.account = account;
        }
        if let Ok(dir) = std::env::var("DQPU_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("DQPU_SAMPLER") {
            self.sampler.sampler = name;
        }
        self
    }

    /// Check ranges that serde cannot.
    pub fn validate(&self) -> NodeResult<()> {
        let s = &self.sampler;
        if s.min_qubits > s.max_qubits {
            return Err(NodeError::Config(format!(
                "min_qubits {} is greater than max_qubits {}",
                s.min_qubits, s.max_qubits
            )));
        }
        if !(s.max_deposit.is_finite() && s.max_deposit >= 0.0) {
            return Err(NodeError::Config(format!(
                "Invalid max_deposit: {}",
                s.max_deposit
            )));
        }
        if !(s.deposit_epsilon.is_finite() && s.deposit_epsilon >= 0.0) {
            return Err(NodeError::Config(format!(
                "Invalid deposit_epsilon: {}",
                s.deposit_epsilon
            )));
        }
        if self.verifier.trap_level == 0 {
            return Err(NodeError::Config("trap_level must be at least 1".into()));
        }
        Ok(())
    }

    /// Directory for verifier files.
    pub fn verifier_dir(&self) -> PathBuf {
        self.state_dir.join("verifier")
    }

    /// Directory for trapped circuits written by the verifier.
    pub fn verifier_cache_dir(&self) -> PathBuf {
        self.verifier_dir().join("cache")
    }

    /// Directory for result files written by the sampler.
    pub fn sampler_cache_dir(&self) -> PathBuf {
        self.state_dir.join("sampler").join("cache")
    }

    /// Directory of the local blob store.
    pub fn blob_dir(&self) -> PathBuf {
        self.state_dir.join("blobs")
    }

    /// Open the configured blob store.
    pub async fn blob_store(&self) -> NodeResult<Arc<dyn BlobStore>> {
        let store: Arc<dyn BlobStore> = match &self.blob {
            BlobConfig::Local => Arc::new(LocalBlobStore::new(self.blob_dir()).await?),
            BlobConfig::Ipfs {
                api_url,
                gateway_url,
            } => Arc::new(IpfsGateway::new(api_url.as_str(), gateway_url.as_str())?),
        };
        Ok(store)
    }

    /// Create every state directory.
    pub async fn ensure_dirs(&self) -> NodeResult<()> {
        for dir in [
            self.verifier_cache_dir(),
            self.sampler_cache_dir(),
            self.state_dir.join("cache"),
        ] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}
