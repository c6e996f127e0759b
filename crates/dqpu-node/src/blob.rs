//! Content-addressed blob storage.
//!
//! Circuits, results and trap files travel between nodes as blobs named by
//! content id. Reads take a timeout: a slow store defers a job to the next
//! poll instead of stalling the node.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{BlobError, BlobResult};

/// Default IPFS HTTP API address.
pub const DEFAULT_IPFS_API: &str = "http://localhost:5001";

/// Default IPFS gateway address.
pub const DEFAULT_IPFS_GATEWAY: &str = "http://127.0.0.1:8080";

/// Identifier of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A store of immutable blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the file at `path` and return its content id.
    async fn upload(&self, path: &Path) -> BlobResult<ContentId>;

    /// Fetch a blob, failing with [`BlobError::Timeout`] if it does not
    /// arrive within `timeout` and [`BlobError::NotFound`] if it does not
    /// exist.
    async fn get(&self, cid: &str, timeout: Duration) -> BlobResult<Vec<u8>>;
}

/// Blob store on the local filesystem, addressed by SHA-256.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Open a store rooted at `root`, creating the directory.
    pub async fn new(root: impl AsRef<Path>) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Content id of `bytes`.
    pub fn content_id(bytes: &[u8]) -> ContentId {
        let digest = Sha256::digest(bytes);
        ContentId(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Store `bytes` directly.
    pub async fn put(&self, bytes: &[u8]) -> BlobResult<ContentId> {
        let cid = Self::content_id(bytes);
        let path = self.blob_path(cid.as_str());
        if !fs::try_exists(&path).await? {
            fs::write(&path, bytes).await?;
        }
        debug!(cid = %cid, size = bytes.len(), "Stored blob");
        Ok(cid)
    }

    fn blob_path(&self, cid: &str) -> PathBuf {
        self.root.join(cid)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &Path) -> BlobResult<ContentId> {
        let bytes = fs::read(path).await?;
        self.put(&bytes).await
    }

    async fn get(&self, cid: &str, timeout: Duration) -> BlobResult<Vec<u8>> {
        if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BlobError::NotFound(cid.to_string()));
        }
        let read = fs::read(self.blob_path(cid));
        match tokio::time::timeout(timeout, read).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(cid.to_string()))
            }
            Ok(Err(e)) => Err(BlobError::Io(e)),
            Err(_) => Err(BlobError::Timeout {
                cid: cid.to_string(),
                after: timeout,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Blob store backed by an IPFS node: uploads go to the HTTP API, reads go
/// through the gateway.
#[derive(Debug, Clone)]
pub struct IpfsGateway {
    client: Client,
    api_url: String,
    gateway_url: String,
}

impl IpfsGateway {
    /// Create a client for the given API and gateway addresses.
    pub fn new(api_url: impl Into<String>, gateway_url: impl Into<String>) -> BlobResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for IpfsGateway {
    #[instrument(skip(self))]
    async fn upload(&self, path: &Path) -> BlobResult<ContentId> {
        let bytes = fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blob".to_string());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let url = format!("{}/api/v0/add", self.api_url);
        debug!("POST {}", url);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BlobError::Http(format!("{status}: {message}")));
        }
        let added: AddResponse = response.json().await?;
        Ok(ContentId(added.hash))
    }

    #[instrument(skip(self))]
    async fn get(&self, cid: &str, timeout: Duration) -> BlobResult<Vec<u8>> {
        let url = format!("{}/ipfs/{}", self.gateway_url, cid);
        debug!("GET {}", url);

        let timed_out = || BlobError::Timeout {
            cid: cid.to_string(),
            after: timeout,
        };
        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(timed_out()),
            Err(e) => return Err(e.into()),
        };

        match response.status() {
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(cid.to_string())),
            status if status.is_success() => match response.bytes().await {
                Ok(body) => Ok(body.to_vec()),
                Err(e) if e.is_timeout() => Err(timed_out()),
                Err(e) => Err(e.into()),
            },
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(BlobError::Http(format!("{status}: {message}")))
            }
        }
    }
}
