//! # State Storage
//!
//! Durable persistence for [`ServerState`]. The file-backed implementation
//! keeps one JSON document per server identity under the state directory and
//! writes atomically (unique temp file in the same directory, then rename),
//! so a crash mid-write never leaves a truncated state file behind.
//!
//! Loads are cached per server id. `clear_cache` drops the cache so the next
//! load re-reads from disk, which is how restarts are simulated in tests.
//!
//! Mutations go through [`StateRepository::update`], which holds the
//! repository lock across the whole read-modify-write. Two operations
//! mutating different containers of the same server therefore never
//! overwrite each other's persisted records.

use crate::config::ServerEnvConfig;
use crate::constants::{
    CFG_JOBS_DISABLED, CFG_JOBS_INTERVAL, CFG_JOBS_POOL_SIZE, CFG_JOBS_QUEUE, CFG_JOBS_RETRIES,
    CFG_JOBS_TIME_UNIT, STATE_FILE_SUFFIX,
};
use crate::error::{Error, Result};
use crate::state::{ServerMode, ServerState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Mutation applied to a state snapshot under the repository lock.
pub type StateMutation = Box<dyn FnOnce(&mut ServerState) + Send>;

/// Persistence seam for server state.
///
/// Implementations must make `store` and `update` atomic with respect to
/// concurrent calls for the same server id.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Loads the state for a server id, creating a default seeded state if
    /// none has been persisted yet.
    async fn load(&self, server_id: &str) -> Result<ServerState>;

    /// Persists a state snapshot.
    async fn store(&self, server_id: &str, state: &ServerState) -> Result<()>;

    /// Applies a mutation to the persisted state, holding the repository
    /// lock across the read-modify-write so concurrent updates for the same
    /// server id serialize instead of clobbering each other. Returns the
    /// state as written.
    async fn update(&self, server_id: &str, mutate: StateMutation) -> Result<ServerState>;

    /// Drops any cached state so the next load re-reads the backing store.
    async fn clear_cache(&self);
}

/// File-backed repository: `<state_dir>/<server_id>.json` per identity.
pub struct FileStateRepository {
    dir: PathBuf,
    default_mode: ServerMode,
    seed_config: Vec<(String, String)>,
    cache: Mutex<HashMap<String, ServerState>>,
}

impl FileStateRepository {
    /// Creates the repository, making the state directory if needed.
    pub async fn new(config: &ServerEnvConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.state_dir)
            .await
            .map_err(|e| Error::StorageInitFailed {
                path: config.state_dir.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            dir: config.state_dir.clone(),
            default_mode: config.mode,
            seed_config: seed_items(config),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn state_path(&self, server_id: &str) -> PathBuf {
        self.dir.join(format!("{server_id}{STATE_FILE_SUFFIX}"))
    }

    /// Default state for an identity that has never been persisted, seeded
    /// with the boot-time job tuning values.
    fn default_state(&self, server_id: &str) -> ServerState {
        let mut state = ServerState::new(server_id, self.default_mode);
        for (key, value) in &self.seed_config {
            state.configuration.set_config_item(key.clone(), value.clone());
        }
        state
    }

    async fn read_state(&self, path: &Path, server_id: &str) -> Result<ServerState> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::StateReadFailed {
                server_id: server_id.to_string(),
                reason: e.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| Error::StateReadFailed {
            server_id: server_id.to_string(),
            reason: format!("corrupt state file: {e}"),
        })
    }

    /// Reads the persisted state, seeding and writing a default one if no
    /// file exists yet. Callers hold the cache lock.
    async fn read_or_seed(&self, server_id: &str) -> Result<ServerState> {
        let path = self.state_path(server_id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.read_state(&path, server_id).await
        } else {
            debug!(server_id, "no persisted state, seeding defaults");
            let state = self.default_state(server_id);
            self.write_state(&path, server_id, &state).await?;
            Ok(state)
        }
    }

    async fn write_state(&self, path: &Path, server_id: &str, state: &ServerState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)?;

        // Unique temp name in the target directory keeps the rename atomic
        // on the same filesystem.
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::now_v7()));
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::StateWriteFailed {
                server_id: server_id.to_string(),
                reason: e.to_string(),
            })?;

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::StateWriteFailed {
                server_id: server_id.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StateRepository for FileStateRepository {
    async fn load(&self, server_id: &str) -> Result<ServerState> {
        let mut cache = self.cache.lock().await;
        if let Some(state) = cache.get(server_id) {
            return Ok(state.clone());
        }

        let state = self.read_or_seed(server_id).await?;
        cache.insert(server_id.to_string(), state.clone());
        Ok(state)
    }

    async fn store(&self, server_id: &str, state: &ServerState) -> Result<()> {
        let mut cache = self.cache.lock().await;
        let path = self.state_path(server_id);
        self.write_state(&path, server_id, state).await?;
        cache.insert(server_id.to_string(), state.clone());
        debug!(server_id, containers = state.containers.len(), "state persisted");
        Ok(())
    }

    async fn update(&self, server_id: &str, mutate: StateMutation) -> Result<ServerState> {
        let mut cache = self.cache.lock().await;
        let mut state = match cache.get(server_id) {
            Some(state) => state.clone(),
            None => self.read_or_seed(server_id).await?,
        };
        mutate(&mut state);

        let path = self.state_path(server_id);
        self.write_state(&path, server_id, &state).await?;
        cache.insert(server_id.to_string(), state.clone());
        debug!(server_id, containers = state.containers.len(), "state updated");
        Ok(state)
    }

    async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        if !cache.is_empty() {
            warn!(entries = cache.len(), "state cache cleared");
        }
        cache.clear();
    }
}

fn seed_items(config: &ServerEnvConfig) -> Vec<(String, String)> {
    let jobs = &config.jobs;
    [
        (CFG_JOBS_INTERVAL, &jobs.interval),
        (CFG_JOBS_RETRIES, &jobs.retries),
        (CFG_JOBS_POOL_SIZE, &jobs.pool_size),
        (CFG_JOBS_TIME_UNIT, &jobs.time_unit),
        (CFG_JOBS_QUEUE, &jobs.queue),
        (CFG_JOBS_DISABLED, &jobs.disabled),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
    .collect()
}
