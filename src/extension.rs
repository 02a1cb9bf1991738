//! # Extension Framework
//!
//! Extensions hook into server and container lifecycle events: they are
//! consulted before a release update (and can veto it), notified after
//! creates, updates and disposes, and polled by the health check. Extensions
//! are registered at boot, initialized in ascending start order and destroyed
//! in the reverse order.
//!
//! Every callback runs under a timeout; a hung extension degrades one
//! operation, never the whole server.

use crate::config::ServerEnvConfig;
use crate::constants::{EXTENSION_CALLBACK_TIMEOUT, MAX_EXTENSIONS};
use crate::container::ContainerResource;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::release::ReleaseId;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Maximum length of an extension name.
pub const MAX_EXTENSION_NAME_LEN: usize = 64;

/// Verdict of the pre-update consultation.
///
/// A single `Deny` from any extension aborts the update before any
/// extension's `prepare_update` or `update_container` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateGate {
    Allow,
    Deny(String),
}

impl UpdateGate {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

/// Context passed to extension callbacks.
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    pub server_id: String,
    pub config: ServerEnvConfig,
}

impl ExtensionContext {
    pub(crate) fn new(config: &ServerEnvConfig) -> Self {
        Self {
            server_id: config.server_id.clone(),
            config: config.clone(),
        }
    }
}

/// Extension interface.
///
/// Implementations must be `Send + Sync`; the server shares them behind
/// `Arc`, so mutable state lives behind interior mutability. `is_initialized`
/// must report false until `init` has completed successfully: the health
/// check treats an active-but-uninitialized extension as a server fault.
#[async_trait]
pub trait ServerExtension: Send + Sync {
    /// Unique extension name (max 64 chars).
    fn name(&self) -> &str;

    /// Capability label advertised in server info.
    fn capability(&self) -> &str;

    /// Position in the init order; lower starts earlier.
    fn start_order(&self) -> i32 {
        0
    }

    /// Inactive extensions are skipped by every dispatch.
    fn is_active(&self) -> bool {
        true
    }

    /// True once `init` has completed successfully.
    fn is_initialized(&self) -> bool;

    /// Called once at boot, in ascending start order.
    async fn init(&self, ctx: &ExtensionContext) -> Result<()>;

    /// Called at shutdown, in descending start order.
    async fn destroy(&self, ctx: &ExtensionContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called after a container has been created and started.
    async fn create_container(&self, container_id: &str, resource: &ContainerResource) -> Result<()> {
        let _ = (container_id, resource);
        Ok(())
    }

    /// Called after a container has been disposed.
    async fn dispose_container(&self, container_id: &str) -> Result<()> {
        let _ = container_id;
        Ok(())
    }

    /// Consulted before a release update is applied.
    async fn update_gate(&self, container_id: &str, release: &ReleaseId) -> UpdateGate {
        let _ = (container_id, release);
        UpdateGate::Allow
    }

    /// Called after the gate passed, before the artifact swap.
    async fn prepare_update(&self, container_id: &str, release: &ReleaseId) -> Result<()> {
        let _ = (container_id, release);
        Ok(())
    }

    /// Called after the artifact swap completed.
    async fn update_container(
        &self,
        container_id: &str,
        resource: &ContainerResource,
        release: &ReleaseId,
    ) -> Result<()> {
        let _ = (container_id, resource, release);
        Ok(())
    }

    /// Health probe. `report` asks for verbose informational messages in
    /// addition to failures.
    async fn health_check(&self, report: bool) -> Vec<Message> {
        let _ = report;
        Vec::new()
    }
}

/// Ordered collection of registered extensions.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn ServerExtension>>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: Vec::with_capacity(MAX_EXTENSIONS),
        }
    }

    /// Registers an extension.
    ///
    /// Rejects duplicate names, over-long names and registrations past the
    /// extension limit.
    pub fn register(&mut self, extension: Arc<dyn ServerExtension>) -> Result<()> {
        let name = extension.name();
        if name.len() > MAX_EXTENSION_NAME_LEN {
            return Err(Error::ExtensionFailed {
                name: name.to_string(),
                callback: "register".to_string(),
                reason: format!("name exceeds max length of {MAX_EXTENSION_NAME_LEN}"),
            });
        }
        if self.extensions.iter().any(|e| e.name() == name) {
            return Err(Error::ExtensionFailed {
                name: name.to_string(),
                callback: "register".to_string(),
                reason: "already registered".to_string(),
            });
        }
        if self.extensions.len() >= MAX_EXTENSIONS {
            return Err(Error::ExtensionFailed {
                name: name.to_string(),
                callback: "register".to_string(),
                reason: format!("too many extensions (max: {MAX_EXTENSIONS})"),
            });
        }
        info!(extension = %name, capability = %extension.capability(), "extension registered");
        self.extensions.push(extension);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Active extensions in ascending start order.
    pub fn in_start_order(&self) -> Vec<Arc<dyn ServerExtension>> {
        let mut sorted: Vec<_> = self
            .extensions
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect();
        sorted.sort_by_key(|e| e.start_order());
        sorted
    }

    /// Active extensions in descending start order, for shutdown.
    pub fn in_shutdown_order(&self) -> Vec<Arc<dyn ServerExtension>> {
        let mut sorted = self.in_start_order();
        sorted.reverse();
        sorted
    }

    /// All registered extensions, including inactive ones.
    pub fn all(&self) -> &[Arc<dyn ServerExtension>] {
        &self.extensions
    }
}

/// Runs an extension callback under the standard timeout.
pub(crate) async fn call_with_timeout<T, F>(name: &str, callback: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(EXTENSION_CALLBACK_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::ExtensionFailed {
            name: name.to_string(),
            callback: callback.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(Error::ExtensionTimeout(name.to_string())),
    }
}
