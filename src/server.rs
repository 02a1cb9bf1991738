//! # Server Core
//!
//! [`Server`] owns the live container registry, the scanner scheduler, the
//! extension registry and the readiness latch, and implements every
//! management operation. Expected business failures (duplicate id, mode
//! conflict, vetoed update, disabled management API) come back as `Failure`
//! responses; `Err` is reserved for storage and extension faults.
//!
//! Locking: the registry map is behind an async `RwLock`; each container has
//! its own `Mutex`. Operations take the registry lock only long enough to
//! find or insert the entry, then work under the per-container lock, so slow
//! work on one container never blocks the rest.

use crate::config::ServerEnvConfig;
use crate::constants::{MAX_CONTAINERS, MAX_CONTAINER_ID_LEN, MIN_SCANNER_INTERVAL};
use crate::container::{
    ContainerFilter, ContainerInstance, ContainerResource, ContainerStatus,
};
use crate::error::{Error, Result};
use crate::extension::{call_with_timeout, ExtensionContext, ExtensionRegistry, UpdateGate};
use crate::message::{Message, ServiceResponse, Severity};
use crate::release::ReleaseId;
use crate::resolver::ArtifactResolver;
use crate::scanner::{ScanContext, ScannerResource, ScannerScheduler, ScannerStatus};
use crate::state::ServerState;
use crate::storage::StateRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Identity and capability summary returned by `get_server_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub server_id: String,
    pub name: String,
    pub version: String,
    pub mode: crate::state::ServerMode,
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

/// Container lifecycle and state-management core.
pub struct Server {
    config: ServerEnvConfig,
    repository: Arc<dyn StateRepository>,
    resolver: Arc<dyn ArtifactResolver>,
    extensions: ExtensionRegistry,
    containers: RwLock<HashMap<String, Arc<Mutex<ContainerInstance>>>>,
    scanners: ScannerScheduler,
    ready: AtomicBool,
    messages: Mutex<Vec<Message>>,
    ext_ctx: ExtensionContext,
    /// Set by the controller-based startup strategy; told goodbye at
    /// shutdown.
    controller: Mutex<Option<Arc<dyn crate::startup::ControllerClient>>>,
}

impl Server {
    /// Creates a server core. Not ready until [`Server::init`] completes.
    #[must_use]
    pub fn new(
        config: ServerEnvConfig,
        repository: Arc<dyn StateRepository>,
        resolver: Arc<dyn ArtifactResolver>,
        extensions: ExtensionRegistry,
    ) -> Self {
        let ext_ctx = ExtensionContext::new(&config);
        Self {
            config,
            repository,
            resolver,
            extensions,
            containers: RwLock::new(HashMap::new()),
            scanners: ScannerScheduler::new(),
            ready: AtomicBool::new(false),
            messages: Mutex::new(Vec::new()),
            ext_ctx,
            controller: Mutex::new(None),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.config.server_id
    }

    pub fn config(&self) -> &ServerEnvConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn StateRepository> {
        &self.repository
    }

    // =========================================================================
    // Readiness
    // =========================================================================

    /// True once boot (including the startup strategy) has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// One-shot latch; never cleared except by shutdown.
    pub fn mark_as_ready(&self) {
        if !self.ready.swap(true, Ordering::Release) {
            info!(server_id = %self.config.server_id, "server ready");
        }
    }

    /// Initializes extensions, runs the startup strategy and flips the
    /// readiness latch. Container install failures are recorded on the
    /// containers, not propagated; only storage and strategy faults fail
    /// the boot.
    pub async fn init(&self, strategy: Arc<dyn crate::startup::StartupStrategy>) -> Result<()> {
        info!(
            server_id = %self.config.server_id,
            strategy = strategy.name(),
            extensions = self.extensions.len(),
            "server booting"
        );

        // extension init failures leave the extension uninitialized and the
        // boot continues; the health check reports them
        for ext in self.extensions.in_start_order() {
            let name = ext.name().to_string();
            match call_with_timeout(&name, "init", ext.init(&self.ext_ctx)).await {
                Ok(()) => debug!(extension = %name, "extension initialized"),
                Err(e) => {
                    error!(extension = %name, error = %e, "extension init failed");
                    self.add_server_message(Message::new(
                        Severity::Error,
                        format!("Extension {name} failed to initialize: {e}"),
                    ))
                    .await;
                }
            }
        }

        // materializes (and seeds) state before the strategy consults it
        self.repository.load(&self.config.server_id).await?;

        let plan = strategy.bootstrap(self).await?;
        crate::startup::ContainerManager::install(self, plan.containers).await?;

        self.mark_as_ready();
        Ok(())
    }

    // =========================================================================
    // Accessibility
    // =========================================================================

    /// Gate applied to every mutating management operation. Returns the
    /// failure to respond with when the management API is disabled.
    fn check_accessibility<T>(&self) -> Option<ServiceResponse<T>> {
        if self.config.management_disabled {
            Some(ServiceResponse::forbidden())
        } else {
            None
        }
    }

    // =========================================================================
    // Container lifecycle
    // =========================================================================

    /// Creates, resolves and starts a container.
    pub async fn create_container(
        &self,
        container_id: &str,
        mut resource: ContainerResource,
    ) -> Result<ServiceResponse<ContainerResource>> {
        if let Some(forbidden) = self.check_accessibility() {
            return Ok(forbidden);
        }
        if let Some(failure) = validate_container_id(container_id) {
            return Ok(failure);
        }
        if let Some(failure) = validate_release_id(&resource.release_id) {
            return Ok(failure);
        }
        resource.container_id = container_id.to_string();

        if !self.config.mode.permits(&resource.release_id) {
            return Ok(ServiceResponse::failure(format!(
                "Container {container_id} with release {} cannot be deployed in {} mode",
                resource.release_id, self.config.mode
            )));
        }

        // a scanner requested at create time is validated before anything
        // is registered
        if let Some(request) = resource.scanner {
            if request.status == ScannerStatus::Started {
                if let Some(failure) = self.validate_scanner_request(&resource, &request) {
                    return Ok(failure.retype());
                }
            }
        }

        // register a placeholder first so concurrent creates with the same
        // id collide here, then resolve outside the registry lock
        let instance = {
            let mut containers = self.containers.write().await;
            if let Some(existing) = containers.get(container_id) {
                let existing = existing.lock().await.resource().clone();
                return Ok(ServiceResponse::failure_with(
                    format!("Container {container_id} already exists"),
                    existing,
                ));
            }
            if containers.len() >= MAX_CONTAINERS {
                return Ok(ServiceResponse::failure(format!(
                    "Container limit reached (max: {MAX_CONTAINERS})"
                )));
            }
            let instance = Arc::new(Mutex::new(ContainerInstance::new(resource.clone())));
            containers.insert(container_id.to_string(), Arc::clone(&instance));
            instance
        };

        let mut locked = instance.lock().await;
        let handle = match self.resolver.resolve(&resource.release_id).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(container_id, error = %e, "container artifact resolution failed");
                locked.set_status(ContainerStatus::Failed);
                locked.resource_mut().set_message(Message::new(
                    Severity::Error,
                    format!("Failed to resolve {}: {e}", resource.release_id),
                ));
                let failed = locked.resource().clone();
                drop(locked);
                self.persist_container(&failed).await?;
                return Ok(ServiceResponse::failure_with(
                    format!("Failed to create container {container_id}: {e}"),
                    failed,
                ));
            }
        };
        locked.start_with(handle);

        // consult extensions after the artifact is loaded; a failing hook
        // fails the container but keeps it registered for inspection
        let started = locked.resource().clone();
        for ext in self.extensions.in_start_order() {
            if !ext.is_initialized() {
                continue;
            }
            let name = ext.name().to_string();
            if let Err(e) = call_with_timeout(
                &name,
                "create_container",
                ext.create_container(container_id, &started),
            )
            .await
            {
                error!(container_id, extension = %name, error = %e, "create hook failed");
                locked.unload();
                locked.set_status(ContainerStatus::Failed);
                locked.resource_mut().set_message(Message::new(
                    Severity::Error,
                    format!("Extension {name} rejected container: {e}"),
                ));
                let failed = locked.resource().clone();
                drop(locked);
                self.persist_container(&failed).await?;
                return Ok(ServiceResponse::failure_with(
                    format!("Failed to create container {container_id}: {e}"),
                    failed,
                ));
            }
        }

        locked.resource_mut().set_message(Message::new(
            Severity::Info,
            format!(
                "Container {container_id} successfully created with {}",
                started
                    .resolved_release_id
                    .as_ref()
                    .unwrap_or(&started.release_id)
            ),
        ));

        let created = locked.resource().clone();
        drop(locked);

        // a scanner requested at create time starts immediately
        if let Some(request) = created.scanner {
            if request.status == ScannerStatus::Started {
                self.scanners
                    .start(container_id, request.interval(), self.scan_context(&instance))
                    .await;
            }
        }

        self.persist_container(&created).await?;
        info!(container_id, release = %created.release_id, "container created");
        Ok(ServiceResponse::success(
            format!("Container {container_id} successfully deployed"),
            created,
        ))
    }

    /// Disposes a container: stops its scanner, notifies extensions and
    /// removes it from the registry and the persisted state.
    ///
    /// Disposing an unknown id succeeds (the target state already holds).
    /// A failing extension hook re-registers the container and reports a
    /// failure.
    pub async fn dispose_container(
        &self,
        container_id: &str,
    ) -> Result<ServiceResponse<()>> {
        if let Some(forbidden) = self.check_accessibility() {
            return Ok(forbidden);
        }

        let instance = {
            let mut containers = self.containers.write().await;
            match containers.remove(container_id) {
                Some(instance) => instance,
                None => {
                    return Ok(ServiceResponse::success_empty(format!(
                        "Container {container_id} was not instantiated"
                    )))
                }
            }
        };

        self.scanners.stop(container_id).await;

        for ext in self.extensions.in_shutdown_order() {
            if !ext.is_initialized() {
                continue;
            }
            let name = ext.name().to_string();
            if let Err(e) = call_with_timeout(
                &name,
                "dispose_container",
                ext.dispose_container(container_id),
            )
            .await
            {
                error!(container_id, extension = %name, error = %e, "dispose hook failed");
                // rollback: the container stays registered
                let mut containers = self.containers.write().await;
                containers.insert(container_id.to_string(), instance);
                return Ok(ServiceResponse::failure(format!(
                    "Failed to dispose container {container_id}: {e}"
                )));
            }
        }

        {
            let mut locked = instance.lock().await;
            locked.unload();
            locked.set_status(ContainerStatus::Stopped);
        }
        self.persist_removal(container_id).await?;
        info!(container_id, "container disposed");
        Ok(ServiceResponse::success_empty(format!(
            "Container {container_id} successfully disposed"
        )))
    }

    /// Updates a container's configured release, swapping the loaded
    /// artifact under the container lock.
    ///
    /// Extensions are consulted first; a single veto aborts the update
    /// before any `update_container` hook runs.
    ///
    /// With `reset_before_update` the container restarts fresh against the
    /// new release: accumulated messages are dropped and a deactivated
    /// container comes back `Started`. Without it the swap preserves status.
    pub async fn update_release_id(
        &self,
        container_id: &str,
        release: ReleaseId,
        reset_before_update: bool,
    ) -> Result<ServiceResponse<ReleaseId>> {
        if let Some(forbidden) = self.check_accessibility() {
            return Ok(forbidden);
        }
        if let Some(failure) = validate_release_id(&release) {
            return Ok(failure);
        }
        let Some(instance) = self.container_instance(container_id).await else {
            return Ok(ServiceResponse::failure(format!(
                "Container {container_id} not found"
            )));
        };
        if !self.config.mode.permits(&release) {
            return Ok(ServiceResponse::failure(format!(
                "Release {release} cannot be deployed in {} mode",
                self.config.mode
            )));
        }
        {
            // only a loaded container can be updated
            let status = instance.lock().await.status();
            if !matches!(
                status,
                ContainerStatus::Started | ContainerStatus::Deactivated
            ) {
                return Ok(ServiceResponse::failure(format!(
                    "Container {container_id} is in {status} status and cannot be updated"
                )));
            }
        }

        for ext in self.extensions.in_start_order() {
            if !ext.is_initialized() {
                continue;
            }
            if let UpdateGate::Deny(reason) = ext.update_gate(container_id, &release).await {
                info!(container_id, extension = ext.name(), %reason, "update vetoed");
                return Ok(ServiceResponse::failure(format!(
                    "Update of container {container_id} rejected by {}: {reason}",
                    ext.name()
                )));
            }
        }

        for ext in self.extensions.in_start_order() {
            if !ext.is_initialized() {
                continue;
            }
            let name = ext.name().to_string();
            call_with_timeout(&name, "prepare_update", ext.prepare_update(container_id, &release))
                .await?;
        }

        // resolve-swap-persist under the container lock; a concurrent scan
        // tick waits here rather than interleaving
        let updated = {
            let mut locked = instance.lock().await;
            let handle = match self.resolver.resolve(&release).await {
                Ok(handle) => handle,
                Err(e) => {
                    return Ok(ServiceResponse::failure(format!(
                        "Failed to update container {container_id} to {release}: {e}"
                    )))
                }
            };
            locked.resource_mut().release_id = release.clone();
            if reset_before_update {
                locked.resource_mut().messages.clear();
                locked.start_with(handle);
            } else {
                locked.swap_artifact(handle);
            }
            locked.resource().clone()
        };
        self.persist_container(&updated).await?;

        for ext in self.extensions.in_start_order() {
            if !ext.is_initialized() {
                continue;
            }
            let name = ext.name().to_string();
            call_with_timeout(
                &name,
                "update_container",
                ext.update_container(container_id, &updated, &release),
            )
            .await?;
        }

        let resolved = updated
            .resolved_release_id
            .clone()
            .unwrap_or(release);
        info!(container_id, release = %resolved, "container release updated");
        Ok(ServiceResponse::success(
            format!("Release id successfully updated for container {container_id}"),
            resolved,
        ))
    }

    /// Deactivates a started container: the artifact stays loaded but the
    /// container refuses work.
    pub async fn deactivate_container(
        &self,
        container_id: &str,
    ) -> Result<ServiceResponse<ContainerResource>> {
        self.switch_status(
            container_id,
            ContainerStatus::Started,
            ContainerStatus::Deactivated,
            "deactivated",
        )
        .await
    }

    /// Reactivates a deactivated container.
    pub async fn activate_container(
        &self,
        container_id: &str,
    ) -> Result<ServiceResponse<ContainerResource>> {
        self.switch_status(
            container_id,
            ContainerStatus::Deactivated,
            ContainerStatus::Started,
            "activated",
        )
        .await
    }

    async fn switch_status(
        &self,
        container_id: &str,
        from: ContainerStatus,
        to: ContainerStatus,
        verb: &str,
    ) -> Result<ServiceResponse<ContainerResource>> {
        if let Some(forbidden) = self.check_accessibility() {
            return Ok(forbidden);
        }
        let Some(instance) = self.container_instance(container_id).await else {
            return Ok(ServiceResponse::failure(format!(
                "Container {container_id} not found"
            )));
        };
        let updated = {
            let mut locked = instance.lock().await;
            if locked.status() != from {
                return Ok(ServiceResponse::failure(format!(
                    "Container {container_id} is in {} status and cannot be {verb}",
                    locked.status()
                )));
            }
            locked.set_status(to);
            locked.resource().clone()
        };
        self.persist_container(&updated).await?;
        info!(container_id, status = %to, "container status changed");
        Ok(ServiceResponse::success(
            format!("Container {container_id} {verb}"),
            updated,
        ))
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Lists container records matching the filter.
    pub async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> Result<ServiceResponse<Vec<ContainerResource>>> {
        let containers = self.containers.read().await;
        let mut matched = Vec::new();
        for instance in containers.values() {
            let resource = instance.lock().await.resource().clone();
            if filter.accepts(&resource) {
                matched.push(resource);
            }
        }
        matched.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        Ok(ServiceResponse::success(
            "List of created containers",
            matched,
        ))
    }

    /// Configured (possibly floating) release of one container.
    pub async fn get_container_release_id(
        &self,
        container_id: &str,
    ) -> Result<ServiceResponse<ReleaseId>> {
        match self.container_instance(container_id).await {
            Some(instance) => {
                let release = instance.lock().await.resource().release_id.clone();
                Ok(ServiceResponse::success(
                    format!("Release id for container {container_id}"),
                    release,
                ))
            }
            None => Ok(ServiceResponse::failure(format!(
                "Container {container_id} not found"
            ))),
        }
    }

    /// Fetches one container record.
    pub async fn get_container_info(
        &self,
        container_id: &str,
    ) -> Result<ServiceResponse<ContainerResource>> {
        match self.container_instance(container_id).await {
            Some(instance) => {
                let resource = instance.lock().await.resource().clone();
                Ok(ServiceResponse::success(
                    format!("Info for container {container_id}"),
                    resource,
                ))
            }
            None => Ok(ServiceResponse::failure(format!(
                "Container {container_id} not found"
            ))),
        }
    }

    /// Server identity, version and advertised capabilities.
    pub async fn get_server_info(&self) -> ServerInfo {
        let capabilities = self
            .extensions
            .all()
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.capability().to_string())
            .collect();
        ServerInfo {
            server_id: self.config.server_id.clone(),
            name: self.config.server_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: self.config.mode,
            capabilities,
            messages: self.messages.lock().await.clone(),
        }
    }

    /// Current persisted state snapshot.
    pub async fn get_server_state(&self) -> Result<ServiceResponse<ServerState>> {
        let state = self.repository.load(&self.config.server_id).await?;
        Ok(ServiceResponse::success(
            format!("Server state for {}", self.config.server_id),
            state,
        ))
    }

    // =========================================================================
    // Scanner operations
    // =========================================================================

    /// Applies a scanner request, dispatching on the requested status:
    /// `Started` starts or reschedules the poll task, `Stopped` halts it,
    /// `Scanning` runs one immediate poll, `Disposed` stops the task and
    /// removes the scanner record.
    pub async fn configure_scanner(
        &self,
        container_id: &str,
        request: ScannerResource,
    ) -> Result<ServiceResponse<ScannerResource>> {
        if let Some(forbidden) = self.check_accessibility() {
            return Ok(forbidden);
        }
        let Some(instance) = self.container_instance(container_id).await else {
            return Ok(ServiceResponse::failure(format!(
                "Container {container_id} not found"
            )));
        };

        match request.status {
            ScannerStatus::Started => {
                {
                    let locked = instance.lock().await;
                    if let Some(failure) = self.validate_scanner_request(locked.resource(), &request)
                    {
                        return Ok(failure);
                    }
                }
                self.scanners
                    .start(container_id, request.interval(), self.scan_context(&instance))
                    .await;
                let record = ScannerResource::new(
                    ScannerStatus::Started,
                    request.poll_interval_millis,
                );
                let updated = {
                    let mut locked = instance.lock().await;
                    locked.resource_mut().scanner = Some(record);
                    locked.resource().clone()
                };
                self.persist_container(&updated).await?;
                Ok(ServiceResponse::success(
                    format!("Scanner started for container {container_id}"),
                    record,
                ))
            }
            ScannerStatus::Stopped => {
                self.scanners.stop(container_id).await;
                let record = ScannerResource::new(
                    ScannerStatus::Stopped,
                    request.poll_interval_millis,
                );
                let updated = {
                    let mut locked = instance.lock().await;
                    locked.resource_mut().scanner = Some(record);
                    locked.resource().clone()
                };
                self.persist_container(&updated).await?;
                Ok(ServiceResponse::success(
                    format!("Scanner stopped for container {container_id}"),
                    record,
                ))
            }
            ScannerStatus::Scanning => {
                // one immediate poll; the background task (if any) keeps
                // its schedule. A resolution failure is a scan outcome,
                // not a fault.
                let swapped = match crate::scanner::poll_once(&self.scan_context(&instance)).await
                {
                    Ok(swapped) => swapped,
                    Err(
                        e @ (Error::ResolutionFailed { .. } | Error::ArtifactNotFound(_)),
                    ) => {
                        return Ok(ServiceResponse::failure(format!(
                            "Scan of container {container_id} failed: {e}"
                        )))
                    }
                    Err(e) => return Err(e),
                };
                let record = {
                    let locked = instance.lock().await;
                    locked
                        .resource()
                        .scanner
                        .unwrap_or(ScannerResource::new(ScannerStatus::Stopped, None))
                };
                let msg = if swapped {
                    format!("Scan of container {container_id} swapped to a newer release")
                } else {
                    format!("Scan of container {container_id} found no newer release")
                };
                Ok(ServiceResponse::success(msg, record))
            }
            ScannerStatus::Disposed => {
                self.scanners.stop(container_id).await;
                let updated = {
                    let mut locked = instance.lock().await;
                    locked.resource_mut().scanner = None;
                    locked.resource().clone()
                };
                self.persist_container(&updated).await?;
                Ok(ServiceResponse::success(
                    format!("Scanner disposed for container {container_id}"),
                    ScannerResource::new(ScannerStatus::Disposed, None),
                ))
            }
        }
    }

    /// Scanner record of a container; a container without one reports
    /// `Disposed`.
    pub async fn get_scanner_info(
        &self,
        container_id: &str,
    ) -> Result<ServiceResponse<ScannerResource>> {
        let Some(instance) = self.container_instance(container_id).await else {
            return Ok(ServiceResponse::failure(format!(
                "Container {container_id} not found"
            )));
        };
        let record = instance
            .lock()
            .await
            .resource()
            .scanner
            .unwrap_or(ScannerResource::new(ScannerStatus::Disposed, None));
        Ok(ServiceResponse::success(
            format!("Scanner info for container {container_id}"),
            record,
        ))
    }

    fn validate_scanner_request(
        &self,
        resource: &ContainerResource,
        request: &ScannerResource,
    ) -> Option<ServiceResponse<ScannerResource>> {
        if !resource.release_id.is_floating() {
            return Some(ServiceResponse::failure(format!(
                "Scanner requires a floating release, {} is concrete",
                resource.release_id
            )));
        }
        if request.interval() < MIN_SCANNER_INTERVAL {
            return Some(ServiceResponse::failure(format!(
                "Poll interval below minimum of {}ms",
                MIN_SCANNER_INTERVAL.as_millis()
            )));
        }
        None
    }

    fn scan_context(&self, instance: &Arc<Mutex<ContainerInstance>>) -> ScanContext {
        ScanContext {
            container: Arc::clone(instance),
            resolver: Arc::clone(&self.resolver),
            repository: Arc::clone(&self.repository),
            server_id: self.config.server_id.clone(),
        }
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Aggregated health probe.
    ///
    /// An unready server, every FAILED container and any
    /// active-but-uninitialized extension produce ERROR messages; an
    /// initialized extension is asked directly. With
    /// `report` set the result is framed by informational header and footer
    /// messages.
    pub async fn health_check(&self, report: bool) -> Vec<Message> {
        let mut messages = Vec::new();
        if report {
            messages.push(Message::with_lines(
                Severity::Info,
                vec![
                    format!("Server {}", self.config.server_id),
                    format!("Started at {}", chrono::Utc::now().to_rfc3339()),
                ],
            ));
        }

        if !self.is_ready() {
            messages.push(Message::new(Severity::Error, "Server is not ready"));
        }

        // one ERROR per failed container, naming it
        {
            let containers = self.containers.read().await;
            for instance in containers.values() {
                let locked = instance.lock().await;
                if locked.status() == ContainerStatus::Failed {
                    messages.push(Message::new(
                        Severity::Error,
                        format!("Container {} is in FAILED status", locked.container_id()),
                    ));
                }
            }
        }

        for ext in self.extensions.in_start_order() {
            let name = ext.name().to_string();
            if !ext.is_initialized() {
                // never call into an uninitialized extension
                messages.push(Message::new(
                    Severity::Error,
                    format!("Extension {name} is not initialized"),
                ));
                continue;
            }
            match tokio::time::timeout(
                crate::constants::EXTENSION_CALLBACK_TIMEOUT,
                ext.health_check(report),
            )
            .await
            {
                Ok(ext_messages) => messages.extend(ext_messages),
                Err(_) => messages.push(Message::new(
                    Severity::Error,
                    format!("Extension {name} health check timed out"),
                )),
            }
        }

        if report {
            messages.push(Message::new(Severity::Info, "Health check done"));
        }
        messages
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops every scanner, destroys extensions in reverse start order,
    /// tells the controller goodbye and clears the readiness latch. Safe to
    /// call once; teardown failures are logged and do not stop the rest.
    pub async fn shutdown(&self) {
        info!(server_id = %self.config.server_id, "server shutting down");
        self.ready.store(false, Ordering::Release);
        self.scanners.shutdown_all().await;

        let controller = self.controller.lock().await.take();
        if let Some(client) = controller {
            let info = self.get_server_info().await;
            if let Err(e) = client.disconnect(&info).await {
                warn!(error = %e, "controller disconnect failed");
            }
        }

        for ext in self.extensions.in_shutdown_order() {
            if !ext.is_initialized() {
                continue;
            }
            let name = ext.name().to_string();
            if let Err(e) = call_with_timeout(&name, "destroy", ext.destroy(&self.ext_ctx)).await {
                warn!(extension = %name, error = %e, "extension destroy failed");
            }
        }
        info!(server_id = %self.config.server_id, "server shutdown complete");
    }

    // =========================================================================
    // Internal plumbing
    // =========================================================================

    async fn container_instance(&self, container_id: &str) -> Option<Arc<Mutex<ContainerInstance>>> {
        self.containers.read().await.get(container_id).cloned()
    }

    /// Appends a server-level diagnostic message.
    pub async fn add_server_message(&self, message: Message) {
        self.messages.lock().await.push(message);
    }

    /// Remembers the controller so shutdown can disconnect from it.
    pub(crate) async fn attach_controller(
        &self,
        client: Arc<dyn crate::startup::ControllerClient>,
    ) {
        *self.controller.lock().await = Some(client);
    }

    async fn persist_container(&self, resource: &ContainerResource) -> Result<()> {
        let resource = resource.clone();
        self.repository
            .update(
                &self.config.server_id,
                Box::new(move |state| state.upsert_container(resource)),
            )
            .await?;
        Ok(())
    }

    async fn persist_removal(&self, container_id: &str) -> Result<()> {
        let container_id = container_id.to_string();
        self.repository
            .update(
                &self.config.server_id,
                Box::new(move |state| {
                    state.remove_container(&container_id);
                }),
            )
            .await?;
        Ok(())
    }

    /// Boot-time install path: not gated by the management API flag, and
    /// restores persisted status and scanner records.
    pub(crate) async fn install_container(&self, resource: ContainerResource) -> Result<()> {
        let container_id = resource.container_id.clone();
        let restore_deactivated = resource.status == ContainerStatus::Deactivated;
        let scanner = resource.scanner;

        let instance = {
            let mut containers = self.containers.write().await;
            if containers.contains_key(&container_id) {
                debug!(container_id, "container already installed, skipping");
                return Ok(());
            }
            let instance = Arc::new(Mutex::new(ContainerInstance::new(resource.clone())));
            containers.insert(container_id.clone(), Arc::clone(&instance));
            instance
        };

        let persisted = {
            let mut locked = instance.lock().await;
            match self.resolver.resolve(&resource.release_id).await {
                Ok(handle) => {
                    locked.start_with(handle);
                    if restore_deactivated {
                        locked.set_status(ContainerStatus::Deactivated);
                    }
                }
                Err(e) => {
                    warn!(container_id, error = %e, "container restore failed");
                    locked.set_status(ContainerStatus::Failed);
                    locked.resource_mut().set_message(Message::new(
                        Severity::Error,
                        format!("Failed to restore {}: {e}", resource.release_id),
                    ));
                }
            }
            locked.resource().clone()
        };
        self.persist_container(&persisted).await?;

        // restart a scanner that was running before the restart
        if persisted.status == ContainerStatus::Started {
            if let Some(record) = scanner {
                if record.status == ScannerStatus::Started {
                    self.scanners
                        .start(&container_id, record.interval(), self.scan_context(&instance))
                        .await;
                }
            }
        }
        info!(container_id, status = %persisted.status, "container installed");
        Ok(())
    }
}

fn validate_container_id<T>(container_id: &str) -> Option<ServiceResponse<T>> {
    if container_id.trim().is_empty() {
        return Some(ServiceResponse::failure("Container id must not be empty"));
    }
    if container_id.len() > MAX_CONTAINER_ID_LEN {
        return Some(ServiceResponse::failure(format!(
            "Container id exceeds max length of {MAX_CONTAINER_ID_LEN}"
        )));
    }
    None
}

fn validate_release_id<T>(release: &ReleaseId) -> Option<ServiceResponse<T>> {
    if release.group_id.trim().is_empty()
        || release.artifact_id.trim().is_empty()
        || release.version.trim().is_empty()
    {
        return Some(ServiceResponse::failure(format!(
            "Release id '{release}' has an empty coordinate segment"
        )));
    }
    None
}
