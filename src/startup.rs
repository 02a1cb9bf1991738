//! # Startup Strategies
//!
//! A startup strategy decides which container set a booting server installs
//! and who owns the configuration: the controller-based strategy asks a
//! remote controller (and fails the boot if it cannot be reached in time),
//! while the local strategy replays whatever the persisted state holds.
//!
//! Strategies are looked up by selector through [`StartupStrategyProvider`],
//! which caches built strategies until `clear` is called.

use crate::constants::CONTROLLER_CONNECT_TIMEOUT;
use crate::container::ContainerResource;
use crate::error::{Error, Result};
use crate::server::{Server, ServerInfo};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{info, warn};

/// Container set a strategy decided the server should run.
#[derive(Debug, Clone, Default)]
pub struct BootPlan {
    pub containers: Vec<ContainerResource>,
}

/// Decides the boot-time container set.
#[async_trait]
pub trait StartupStrategy: Send + Sync {
    /// Selector this strategy is registered under.
    fn name(&self) -> &str;

    /// Produces the boot plan. A fault here fails the boot.
    async fn bootstrap(&self, server: &Server) -> Result<BootPlan>;
}

/// Configuration pushed down by a controller at connect time.
#[derive(Debug, Clone, Default)]
pub struct ServerSetup {
    pub containers: Vec<ContainerResource>,
    /// Configuration entries merged into the persisted state.
    pub server_config: Vec<(String, String)>,
}

/// Transport seam to the controller.
#[async_trait]
pub trait ControllerClient: Send + Sync {
    /// Announces the server and fetches its setup.
    async fn connect(&self, info: &ServerInfo) -> Result<ServerSetup>;

    /// Best-effort goodbye at shutdown.
    async fn disconnect(&self, info: &ServerInfo) -> Result<()> {
        let _ = info;
        Ok(())
    }
}

/// Boot from a controller-provided setup. The controller is authoritative:
/// its container set is installed as-is, and its configuration entries are
/// merged into the persisted state before any container starts.
pub struct ControllerBasedStartupStrategy {
    client: Arc<dyn ControllerClient>,
}

impl ControllerBasedStartupStrategy {
    #[must_use]
    pub fn new(client: Arc<dyn ControllerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StartupStrategy for ControllerBasedStartupStrategy {
    fn name(&self) -> &str {
        "controller"
    }

    async fn bootstrap(&self, server: &Server) -> Result<BootPlan> {
        let info = server.get_server_info().await;
        let setup = tokio::time::timeout(CONTROLLER_CONNECT_TIMEOUT, self.client.connect(&info))
            .await
            .map_err(|_| {
                Error::ControllerUnavailable(format!(
                    "no controller response within {}s",
                    CONTROLLER_CONNECT_TIMEOUT.as_secs()
                ))
            })??;

        let ServerSetup {
            containers,
            server_config,
        } = setup;
        if !server_config.is_empty() {
            server
                .repository()
                .update(
                    server.server_id(),
                    Box::new(move |state| {
                        for (key, value) in server_config {
                            state.configuration.set_config_item(key, value);
                        }
                    }),
                )
                .await?;
        }

        server.attach_controller(Arc::clone(&self.client)).await;
        info!(containers = containers.len(), "controller provided boot plan");
        Ok(BootPlan { containers })
    }
}

/// Boot from the persisted state: whatever ran before the restart runs
/// again, with statuses and scanner records restored.
#[derive(Default)]
pub struct LocalContainersStartupStrategy;

impl LocalContainersStartupStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StartupStrategy for LocalContainersStartupStrategy {
    fn name(&self) -> &str {
        "local"
    }

    async fn bootstrap(&self, server: &Server) -> Result<BootPlan> {
        let state = server.repository().load(server.server_id()).await?;
        info!(containers = state.containers.len(), "replaying persisted containers");
        Ok(BootPlan {
            containers: state.containers,
        })
    }
}

/// Builds and caches strategies by selector.
pub struct StartupStrategyProvider {
    controller_client: Option<Arc<dyn ControllerClient>>,
    cache: Mutex<HashMap<String, Arc<dyn StartupStrategy>>>,
}

impl StartupStrategyProvider {
    /// Provider without a controller; only the `local` selector resolves.
    #[must_use]
    pub fn local_only() -> Self {
        Self {
            controller_client: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Provider with a controller client backing the `controller` selector.
    #[must_use]
    pub fn with_controller(client: Arc<dyn ControllerClient>) -> Self {
        Self {
            controller_client: Some(client),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a strategy by selector, building it on first use.
    pub fn strategy_for(&self, selector: &str) -> Result<Arc<dyn StartupStrategy>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| Error::Internal("strategy cache poisoned".to_string()))?;
        if let Some(strategy) = cache.get(selector) {
            return Ok(Arc::clone(strategy));
        }

        let strategy: Arc<dyn StartupStrategy> = match selector {
            "local" => Arc::new(LocalContainersStartupStrategy::new()),
            "controller" => match &self.controller_client {
                Some(client) => Arc::new(ControllerBasedStartupStrategy::new(Arc::clone(client))),
                None => {
                    return Err(Error::ControllerUnavailable(
                        "no controller client configured".to_string(),
                    ))
                }
            },
            other => return Err(Error::UnknownStartupStrategy(other.to_string())),
        };

        cache.insert(selector.to_string(), Arc::clone(&strategy));
        Ok(strategy)
    }

    /// Drops cached strategies so the next lookup rebuilds them.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

/// Installs a boot plan's containers one by one.
///
/// Install faults on a single container mark that container failed and the
/// boot continues; only storage faults abort.
pub struct ContainerManager;

impl ContainerManager {
    pub async fn install(server: &Server, containers: Vec<ContainerResource>) -> Result<()> {
        for resource in containers {
            let container_id = resource.container_id.clone();
            if let Err(e) = server.install_container(resource).await {
                // storage faults are not recoverable mid-boot
                if matches!(e, Error::StateReadFailed { .. } | Error::StateWriteFailed { .. }) {
                    return Err(e);
                }
                warn!(container_id, error = %e, "container install failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_selector_rejected() {
        let provider = StartupStrategyProvider::local_only();
        let err = provider.strategy_for("cloud").err().unwrap();
        assert!(matches!(err, Error::UnknownStartupStrategy(_)));
    }

    #[test]
    fn test_controller_selector_needs_client() {
        let provider = StartupStrategyProvider::local_only();
        let err = provider.strategy_for("controller").err().unwrap();
        assert!(matches!(err, Error::ControllerUnavailable(_)));
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let provider = StartupStrategyProvider::local_only();
        let a = provider.strategy_for("local").unwrap();
        let b = provider.strategy_for("local").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        provider.clear();
        let c = provider.strategy_for("local").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
