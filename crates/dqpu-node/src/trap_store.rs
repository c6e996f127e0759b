//! Persistence of trap metadata between trapping a job and checking its
//! result.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::fs;
use tokio::sync::RwLock;

use dqpu_trap::{TrapInfo, dump_traps, load_traps};

use crate::error::NodeResult;
use crate::job::JobId;

const TRAP_SUFFIX: &str = "_trap.json";

/// Storage for the traps of jobs a verifier is responsible for.
#[async_trait]
pub trait TrapStore: Send + Sync {
    /// Persist the traps of `job`, replacing earlier ones.
    async fn save(&self, job: &JobId, traps: &[TrapInfo]) -> NodeResult<()>;

    /// Load the traps of `job`.
    async fn load(&self, job: &JobId) -> NodeResult<Option<Vec<TrapInfo>>>;

    /// Forget the traps of `job`. Returns whether anything was stored.
    async fn remove(&self, job: &JobId) -> NodeResult<bool>;

    /// File holding the traps of `job`, for stores that keep one.
    fn file_path(&self, _job: &JobId) -> Option<PathBuf> {
        None
    }
}

/// Trap store writing one JSON file per job.
pub struct JsonTrapStore {
    dir: PathBuf,
    cache: RwLock<FxHashMap<JobId, Vec<TrapInfo>>>,
}

impl JsonTrapStore {
    /// Open a store in `dir`, loading traps already on disk.
    pub async fn new(dir: impl AsRef<Path>) -> NodeResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        let store = Self {
            dir,
            cache: RwLock::new(FxHashMap::default()),
        };
        store.load_all().await?;
        Ok(store)
    }

    fn trap_path(&self, job: &JobId) -> PathBuf {
        self.dir.join(format!("{job}{TRAP_SUFFIX}"))
    }

    /// Number of jobs with stored traps.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Check if no traps are stored.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    async fn load_all(&self) -> NodeResult<()> {
        let mut cache = self.cache.write().await;

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(TRAP_SUFFIX))
            else {
                continue;
            };
            match fs::read(&path).await {
                Ok(bytes) => match load_traps(&bytes) {
                    Ok(traps) => {
                        cache.insert(JobId::new(id), traps);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse trap file {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read trap file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TrapStore for JsonTrapStore {
    async fn save(&self, job: &JobId, traps: &[TrapInfo]) -> NodeResult<()> {
        let json = dump_traps(traps)?;
        fs::write(self.trap_path(job), json).await?;

        let mut cache = self.cache.write().await;
        cache.insert(job.clone(), traps.to_vec());
        Ok(())
    }

    async fn load(&self, job: &JobId) -> NodeResult<Option<Vec<TrapInfo>>> {
        let cache = self.cache.read().await;
        if let Some(traps) = cache.get(job) {
            return Ok(Some(traps.clone()));
        }
        drop(cache);

        match fs::read(self.trap_path(job)).await {
            Ok(bytes) => {
                let traps = load_traps(&bytes)?;
                let mut cache = self.cache.write().await;
                cache.insert(job.clone(), traps.clone());
                Ok(Some(traps))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, job: &JobId) -> NodeResult<bool> {
        let mut cache = self.cache.write().await;
        let was_present = cache.remove(job).is_some();

        match fs::remove_file(self.trap_path(job)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(was_present),
            Err(e) => Err(e.into()),
        }
    }

    fn file_path(&self, job: &JobId) -> Option<PathBuf> {
        Some(self.trap_path(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traps() -> Vec<TrapInfo> {
        vec![
            TrapInfo::new("basic", 0, true, 1.0),
            TrapInfo::new("basic", 3, false, 1.0),
        ]
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTrapStore::new(dir.path()).await.unwrap();
        let id = JobId::from(7);

        assert_eq!(store.load(&id).await.unwrap(), None);
        store.save(&id, &traps()).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(traps()));
        assert!(store.file_path(&id).unwrap().exists());

        assert!(store.remove(&id).await.unwrap());
        assert!(!store.remove(&id).await.unwrap());
        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reopen_restores_traps() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonTrapStore::new(dir.path()).await.unwrap();
            store.save(&JobId::from(1), &traps()).await.unwrap();
        }
        std::fs::write(dir.path().join("2_trap.json"), "not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = JsonTrapStore::new(dir.path()).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.load(&JobId::from(1)).await.unwrap(), Some(traps()));
    }
}
