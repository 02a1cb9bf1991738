//! # Release Scanner
//!
//! A scanner watches a container whose configured coordinate is floating and
//! swaps the loaded artifact when a newer resolution appears. Each started
//! scanner is one background task owned by the [`ScannerScheduler`]; a poll
//! tick takes the same per-container lock as explicit updates, so a tick and
//! a client-driven update can never interleave on one container.
//!
//! Scanner status and interval are persisted with the container record, and
//! the startup layer restarts previously started scanners after a reboot.

use crate::container::ContainerInstance;
use crate::error::Result;
use crate::resolver::ArtifactResolver;
use crate::storage::StateRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requested or reported scanner state.
///
/// As a request, `Started`/`Stopped`/`Disposed` change the scanner lifecycle
/// and `Scanning` triggers a single immediate poll. As a report, a container
/// without a scanner record is implicitly `Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScannerStatus {
    Started,
    Stopped,
    Scanning,
    Disposed,
}

impl std::fmt::Display for ScannerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Started => "STARTED",
            Self::Stopped => "STOPPED",
            Self::Scanning => "SCANNING",
            Self::Disposed => "DISPOSED",
        };
        f.write_str(s)
    }
}

/// Scanner configuration and status attached to a container record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerResource {
    pub status: ScannerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_millis: Option<u64>,
}

impl ScannerResource {
    #[must_use]
    pub fn new(status: ScannerStatus, poll_interval_millis: Option<u64>) -> Self {
        Self {
            status,
            poll_interval_millis,
        }
    }

    /// Poll interval, falling back to the default when unset.
    pub fn interval(&self) -> Duration {
        self.poll_interval_millis
            .map(Duration::from_millis)
            .unwrap_or(crate::constants::DEFAULT_SCANNER_INTERVAL)
    }
}

/// Everything one scanner tick needs.
///
/// Cloned into the background task; all parts are shared handles.
#[derive(Clone)]
pub struct ScanContext {
    pub container: Arc<Mutex<ContainerInstance>>,
    pub resolver: Arc<dyn ArtifactResolver>,
    pub repository: Arc<dyn StateRepository>,
    pub server_id: String,
}

/// Runs one poll: resolve the configured coordinate and swap the loaded
/// artifact if the resolution moved. Returns whether a swap happened.
///
/// The container lock is held across resolve-compare-swap-persist, so a
/// concurrent explicit update observes either the old or the new artifact,
/// never a half-applied swap.
pub async fn poll_once(ctx: &ScanContext) -> Result<bool> {
    let mut container = ctx.container.lock().await;
    let configured = container.resource().release_id.clone();
    let container_id = container.container_id().to_string();

    let resolved = ctx.resolver.resolve(&configured).await?;

    let current_digest = container.artifact().map(|a| a.digest.clone());
    if current_digest.as_deref() == Some(resolved.digest.as_str()) {
        debug!(container_id, "scan found no newer artifact");
        return Ok(false);
    }

    info!(
        container_id,
        version = %resolved.release_id.version,
        "scan swapping to newer artifact"
    );
    container.swap_artifact(resolved);

    let resource = container.resource().clone();
    ctx.repository
        .update(
            &ctx.server_id,
            Box::new(move |state| state.upsert_container(resource)),
        )
        .await?;
    Ok(true)
}

struct ScannerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the background poll task of every started scanner, keyed by
/// container id. At most one task per container.
#[derive(Default)]
pub struct ScannerScheduler {
    tasks: Mutex<HashMap<String, ScannerTask>>,
}

impl ScannerScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts with a new interval) the scanner for a container.
    pub async fn start(&self, container_id: &str, interval: Duration, ctx: ScanContext) {
        let mut tasks = self.tasks.lock().await;
        if let Some(existing) = tasks.remove(container_id) {
            let _ = existing.shutdown.send(true);
            existing.handle.abort();
        }

        let (tx, mut rx) = watch::channel(false);
        let id = container_id.to_string();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        // failed polls are logged and retried on the next tick
                        if let Err(e) = poll_once(&ctx).await {
                            warn!(container_id = %id, error = %e, "scan poll failed");
                        }
                    }
                    _ = rx.changed() => {
                        debug!(container_id = %id, "scanner task stopping");
                        return;
                    }
                }
            }
        });

        tasks.insert(
            container_id.to_string(),
            ScannerTask {
                shutdown: tx,
                handle,
            },
        );
        info!(container_id, interval_ms = interval.as_millis() as u64, "scanner started");
    }

    /// Stops the scanner task for a container. Idempotent.
    pub async fn stop(&self, container_id: &str) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.remove(container_id) {
            let _ = task.shutdown.send(true);
            task.handle.abort();
            info!(container_id, "scanner stopped");
        }
    }

    /// Returns true if a poll task is currently running for the container.
    pub async fn is_running(&self, container_id: &str) -> bool {
        self.tasks.lock().await.contains_key(container_id)
    }

    /// Stops every running scanner. Used on shutdown and dispose-all.
    pub async fn shutdown_all(&self) {
        let mut tasks = self.tasks.lock().await;
        for (container_id, task) in tasks.drain() {
            let _ = task.shutdown.send(true);
            task.handle.abort();
            debug!(container_id, "scanner stopped on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerEnvConfig;
    use crate::container::ContainerResource;
    use crate::release::ReleaseId;
    use crate::resolver::LocalArtifactRepository;
    use crate::storage::FileStateRepository;

    #[test]
    fn test_interval_defaults() {
        let r = ScannerResource::new(ScannerStatus::Started, None);
        assert_eq!(r.interval(), crate::constants::DEFAULT_SCANNER_INTERVAL);

        let r = ScannerResource::new(ScannerStatus::Started, Some(250));
        assert_eq!(r.interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_scheduler_start_stop_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerEnvConfig::new("sched-test").with_state_dir(dir.path());
        let repository = Arc::new(FileStateRepository::new(&config).await.unwrap());
        let resolver = Arc::new(LocalArtifactRepository::new());
        let release = ReleaseId::new("g", "a", "1.0.0-SNAPSHOT");
        resolver.publish(&release, b"one").await;

        let ctx = ScanContext {
            container: Arc::new(Mutex::new(ContainerInstance::new(ContainerResource::new(
                "c1", release,
            )))),
            resolver,
            repository,
            server_id: "sched-test".to_string(),
        };

        let scheduler = ScannerScheduler::new();
        assert!(!scheduler.is_running("c1").await);

        scheduler.start("c1", Duration::from_secs(60), ctx.clone()).await;
        assert!(scheduler.is_running("c1").await);

        // restarting replaces the existing task, it does not duplicate it
        scheduler.start("c1", Duration::from_secs(30), ctx).await;
        assert!(scheduler.is_running("c1").await);

        scheduler.stop("c1").await;
        assert!(!scheduler.is_running("c1").await);

        scheduler.stop("c1").await; // idempotent
    }
}
