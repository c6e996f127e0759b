//! DQPU job lifecycle and node loops.
//!
//! Jobs live on a [`Ledger`]; circuits and results travel through a
//! [`BlobStore`]. Two kinds of node drive a job through its states:
//!
//! ```text
//!  requester          verifier                  sampler
//!  submit_job ──→ pending-validation
//!                  trap + upload ──→ waiting
//!                                      sample + upload ──→ validating-result
//!                  verify traps ──────────────────────────→ executed | invalid
//! ```
//!
//! # Example
//!
//! ```rust
//! use dqpu_node::{Ledger, MemoryLedger};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ledger = MemoryLedger::new("alice");
//! ledger.fund("alice", 1_000);
//! ledger.submit_job(2, 2, 1024, "Qm...", 100).await.unwrap();
//! assert_eq!(ledger.balance().await.unwrap(), 900);
//! # }
//! ```

pub mod amount;
pub mod blob;
pub mod config;
pub mod error;
pub mod job;
pub mod ledger;
pub mod poll;
pub mod retry;
pub mod sampler;
pub mod trap_store;
pub mod verifier;

pub use amount::{SUBUNITS_PER_UNIT, from_subunits, to_subunits};
pub use blob::{BlobStore, ContentId, IpfsGateway, LocalBlobStore};
pub use config::{BlobConfig, NodeConfig, SamplerConfig, VerifierConfig};
pub use error::{BlobError, BlobResult, LedgerError, LedgerResult, NodeError, NodeResult};
pub use job::{Job, JobId, JobStats, JobStatus};
pub use ledger::{Ledger, MemoryLedger};
pub use poll::PollWindow;
pub use retry::{RetryPolicy, retry_read, submit_logged};
pub use sampler::{SamplerNode, SamplerStats, filter_jobs};
pub use trap_store::{JsonTrapStore, TrapStore};
pub use verifier::{VerifierNode, VerifierStats};
