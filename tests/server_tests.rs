//! Tests for the server core.
//!
//! Covers container lifecycle, the management-API gate (direct and via
//! command scripts), the extension veto, readiness and the health check.

use async_trait::async_trait;
use berth::{
    execute_script, CommandScript, ContainerFilter, ContainerResource, ContainerStatus,
    ExtensionContext, ExtensionRegistry, FileStateRepository, LocalArtifactRepository, Message,
    ReleaseId, ScannerResource, ScannerStatus, Server, ServerCommand, ServerEnvConfig,
    ServerExtension, ServerMode, Severity, UpdateGate,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

async fn server_with(
    config: ServerEnvConfig,
    resolver: Arc<LocalArtifactRepository>,
    extensions: ExtensionRegistry,
) -> Server {
    let repository = Arc::new(FileStateRepository::new(&config).await.unwrap());
    Server::new(config, repository, resolver, extensions)
}

async fn basic_server(dir: &TempDir) -> (Server, Arc<LocalArtifactRepository>) {
    let resolver = Arc::new(LocalArtifactRepository::new());
    let config = ServerEnvConfig::new("test-server").with_state_dir(dir.path());
    let server = server_with(config, Arc::clone(&resolver), ExtensionRegistry::new()).await;
    (server, resolver)
}

fn release(version: &str) -> ReleaseId {
    ReleaseId::new("com.acme", "orders", version)
}

// =============================================================================
// Container Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_create_and_get_container() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"orders-v1").await;

    let response = server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    assert!(response.is_success());
    let created = response.result.unwrap();
    assert_eq!(created.status, ContainerStatus::Started);
    assert_eq!(created.resolved_release_id.unwrap().version, "1.0.0");

    let info = server.get_container_info("orders").await.unwrap();
    assert!(info.is_success());
    assert_eq!(info.result.unwrap().container_id, "orders");
}

#[tokio::test]
async fn test_blank_container_id_rejected() {
    let dir = TempDir::new().unwrap();
    let (server, _resolver) = basic_server(&dir).await;

    let response = server
        .create_container("   ", ContainerResource::new("   ", release("1.0.0")))
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("empty"));

    let long_id = "c".repeat(200);
    let response = server
        .create_container(&long_id, ContainerResource::new(&*long_id, release("1.0.0")))
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("max length"));
}

#[tokio::test]
async fn test_blank_release_segment_rejected() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;

    let blank = ReleaseId::new("com.acme", "orders", "");
    let response = server
        .create_container("orders", ContainerResource::new("orders", blank))
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("empty"));
    // rejected before anything was registered
    assert!(server.get_container_info("orders").await.unwrap().is_failure());

    // the update path validates the same way
    resolver.publish(&release("1.0.0"), b"v1").await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    let response = server
        .update_release_id("orders", ReleaseId::new("com.acme", "orders", " "), false)
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("empty"));
}

#[tokio::test]
async fn test_get_container_release_id() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();

    let response = server.get_container_release_id("orders").await.unwrap();
    assert_eq!(response.result.unwrap().version, "1.0.0");
    assert!(server
        .get_container_release_id("missing")
        .await
        .unwrap()
        .is_failure());
}

#[tokio::test]
async fn test_duplicate_create_fails_with_existing() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;

    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    let second = server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    assert!(second.is_failure());
    // the conflicting container comes back in the failure payload
    assert_eq!(second.result.unwrap().container_id, "orders");
}

#[tokio::test]
async fn test_create_unresolvable_registers_failed_container() {
    let dir = TempDir::new().unwrap();
    let (server, _resolver) = basic_server(&dir).await;

    let response = server
        .create_container("ghost", ContainerResource::new("ghost", release("9.9.9")))
        .await
        .unwrap();
    assert!(response.is_failure());
    assert_eq!(response.result.unwrap().status, ContainerStatus::Failed);

    // failed containers stay registered and inspectable
    let info = server.get_container_info("ghost").await.unwrap();
    assert_eq!(info.result.unwrap().status, ContainerStatus::Failed);
}

#[tokio::test]
async fn test_dispose_unknown_container_succeeds() {
    let dir = TempDir::new().unwrap();
    let (server, _resolver) = basic_server(&dir).await;

    let response = server.dispose_container("never-created").await.unwrap();
    assert!(response.is_success());
    assert!(response.msg.contains("was not instantiated"));
}

#[tokio::test]
async fn test_dispose_removes_container() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;

    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    let response = server.dispose_container("orders").await.unwrap();
    assert!(response.is_success());

    let info = server.get_container_info("orders").await.unwrap();
    assert!(info.is_failure());
}

#[tokio::test]
async fn test_activate_deactivate_cycle() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();

    let deactivated = server.deactivate_container("orders").await.unwrap();
    assert!(deactivated.is_success());
    assert_eq!(
        deactivated.result.unwrap().status,
        ContainerStatus::Deactivated
    );

    // deactivating twice is a status conflict
    assert!(server
        .deactivate_container("orders")
        .await
        .unwrap()
        .is_failure());

    let activated = server.activate_container("orders").await.unwrap();
    assert_eq!(activated.result.unwrap().status, ContainerStatus::Started);

    assert!(server.activate_container("orders").await.unwrap().is_failure());
}

#[tokio::test]
async fn test_production_mode_rejects_snapshots() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(LocalArtifactRepository::new());
    resolver.publish(&release("1.0.0-SNAPSHOT"), b"snap").await;
    let config = ServerEnvConfig::new("prod-server")
        .with_state_dir(dir.path())
        .with_mode(ServerMode::Production);
    let server = server_with(config, Arc::clone(&resolver), ExtensionRegistry::new()).await;

    let response = server
        .create_container(
            "orders",
            ContainerResource::new("orders", release("1.0.0-SNAPSHOT")),
        )
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("PRODUCTION"));
}

#[tokio::test]
async fn test_development_mode_accepts_snapshots() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(LocalArtifactRepository::new());
    resolver.publish(&release("1.0.0-SNAPSHOT"), b"snap").await;
    let config = ServerEnvConfig::new("dev-server")
        .with_state_dir(dir.path())
        .with_mode(ServerMode::Development);
    let server = server_with(config, Arc::clone(&resolver), ExtensionRegistry::new()).await;

    let response = server
        .create_container(
            "orders",
            ContainerResource::new("orders", release("1.0.0-SNAPSHOT")),
        )
        .await
        .unwrap();
    assert!(response.is_success());
    // the resolved coordinate is concrete
    let resolved = response.result.unwrap().resolved_release_id.unwrap();
    assert_eq!(resolved.version, "1.0.0-b1");
}

#[tokio::test]
async fn test_update_release_id_swaps_artifact() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;
    resolver.publish(&release("2.0.0"), b"v2").await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();

    let response = server
        .update_release_id("orders", release("2.0.0"), false)
        .await
        .unwrap();
    assert!(response.is_success());
    assert_eq!(response.result.unwrap().version, "2.0.0");

    let info = server.get_container_info("orders").await.unwrap().result.unwrap();
    assert_eq!(info.release_id.version, "2.0.0");
    assert_eq!(info.resolved_release_id.unwrap().version, "2.0.0");
}

#[tokio::test]
async fn test_update_to_unresolvable_keeps_old_artifact() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();

    let response = server
        .update_release_id("orders", release("3.0.0"), false)
        .await
        .unwrap();
    assert!(response.is_failure());

    let info = server.get_container_info("orders").await.unwrap().result.unwrap();
    assert_eq!(info.release_id.version, "1.0.0");
    assert_eq!(info.status, ContainerStatus::Started);
}

#[tokio::test]
async fn test_update_rejected_for_failed_container() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    server
        .create_container("ghost", ContainerResource::new("ghost", release("9.9.9")))
        .await
        .unwrap();
    resolver.publish(&release("1.0.0"), b"v1").await;

    let response = server
        .update_release_id("ghost", release("1.0.0"), false)
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("FAILED"));
}

#[tokio::test]
async fn test_update_with_reset_restarts_container() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"v1").await;
    resolver.publish(&release("2.0.0"), b"v2").await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    server.deactivate_container("orders").await.unwrap();

    // without reset the swap preserves the deactivated status
    let response = server
        .update_release_id("orders", release("2.0.0"), false)
        .await
        .unwrap();
    assert!(response.is_success());
    let info = server.get_container_info("orders").await.unwrap().result.unwrap();
    assert_eq!(info.status, ContainerStatus::Deactivated);

    // with reset the container comes back started against the new release
    let response = server
        .update_release_id("orders", release("1.0.0"), true)
        .await
        .unwrap();
    assert!(response.is_success());
    let info = server.get_container_info("orders").await.unwrap().result.unwrap();
    assert_eq!(info.status, ContainerStatus::Started);
    assert_eq!(info.resolved_release_id.unwrap().version, "1.0.0");
    assert!(info.messages.is_empty());
}

#[tokio::test]
async fn test_concurrent_creates_all_persisted() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    let server = Arc::new(server);

    let mut handles = Vec::new();
    for i in 0..16 {
        let id = format!("svc-{i}");
        let rel = ReleaseId::new("com.acme", &id, "1.0.0");
        resolver.publish(&rel, id.as_bytes()).await;
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            server
                .create_container(&id, ContainerResource::new(&*id, rel))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    // a restart must see every container, not whichever write landed last
    server.repository().clear_cache().await;
    let state = server.get_server_state().await.unwrap().result.unwrap();
    assert_eq!(state.containers.len(), 16);
}

// =============================================================================
// Listing Tests
// =============================================================================

#[tokio::test]
async fn test_list_containers_with_filter() {
    let dir = TempDir::new().unwrap();
    let (server, resolver) = basic_server(&dir).await;
    resolver.publish(&release("1.0.0"), b"orders").await;
    resolver
        .publish(&ReleaseId::new("com.acme", "billing", "1.0.0"), b"billing")
        .await;

    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    server
        .create_container(
            "billing",
            ContainerResource::new("billing", ReleaseId::new("com.acme", "billing", "1.0.0")),
        )
        .await
        .unwrap();
    server.deactivate_container("billing").await.unwrap();

    let all = server
        .list_containers(&ContainerFilter::any())
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(all.len(), 2);

    let started = server
        .list_containers(&ContainerFilter::with_statuses(vec![ContainerStatus::Started]))
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].container_id, "orders");

    let by_artifact = server
        .list_containers(&ContainerFilter::with_release(
            None,
            Some("billing".to_string()),
            None,
        ))
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(by_artifact.len(), 1);
    assert_eq!(by_artifact[0].container_id, "billing");
}

// =============================================================================
// Management Gate Tests
// =============================================================================

#[tokio::test]
async fn test_management_disabled_rejects_mutations() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(LocalArtifactRepository::new());
    resolver.publish(&release("1.0.0"), b"v1").await;
    let config = ServerEnvConfig::new("locked-server")
        .with_state_dir(dir.path())
        .with_management_disabled(true);
    let server = server_with(config, Arc::clone(&resolver), ExtensionRegistry::new()).await;

    let forbidden = "Server management api is disabled";
    let create = server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    assert!(create.is_failure());
    assert_eq!(create.msg, forbidden);

    assert_eq!(server.dispose_container("orders").await.unwrap().msg, forbidden);
    assert_eq!(
        server
            .update_release_id("orders", release("2.0.0"), false)
            .await
            .unwrap()
            .msg,
        forbidden
    );
    assert_eq!(
        server
            .configure_scanner(
                "orders",
                ScannerResource::new(ScannerStatus::Started, Some(1000)),
            )
            .await
            .unwrap()
            .msg,
        forbidden
    );

    // read operations stay available
    assert!(server
        .list_containers(&ContainerFilter::any())
        .await
        .unwrap()
        .is_success());
}

#[tokio::test]
async fn test_management_disabled_rejects_script_commands() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(LocalArtifactRepository::new());
    let config = ServerEnvConfig::new("locked-server")
        .with_state_dir(dir.path())
        .with_management_disabled(true);
    let server = server_with(config, resolver, ExtensionRegistry::new()).await;

    let script = CommandScript::new(vec![
        ServerCommand::CreateContainer {
            container_id: "orders".to_string(),
            container: ContainerResource::new("orders", release("1.0.0")),
        },
        ServerCommand::UpdateScanner {
            container_id: "orders".to_string(),
            scanner: ScannerResource::new(ScannerStatus::Started, Some(1000)),
        },
        ServerCommand::UpdateReleaseId {
            container_id: "orders".to_string(),
            release_id: release("2.0.0"),
            reset_before_update: false,
        },
        ServerCommand::DisposeContainer {
            container_id: "orders".to_string(),
        },
    ]);

    let responses = execute_script(&server, script).await.unwrap();
    assert_eq!(responses.len(), 4);
    for response in responses {
        assert!(response.is_failure());
        assert_eq!(response.msg, "Server management api is disabled");
    }
}

// =============================================================================
// Extension Tests
// =============================================================================

struct VetoExtension {
    update_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ServerExtension for VetoExtension {
    fn name(&self) -> &str {
        "veto"
    }

    fn capability(&self) -> &str {
        "Veto"
    }

    fn is_initialized(&self) -> bool {
        true
    }

    async fn init(&self, _ctx: &ExtensionContext) -> berth::Result<()> {
        Ok(())
    }

    async fn update_gate(&self, _container_id: &str, _release: &ReleaseId) -> UpdateGate {
        UpdateGate::Deny("frozen for release window".to_string())
    }

    async fn update_container(
        &self,
        _container_id: &str,
        _resource: &ContainerResource,
        _release: &ReleaseId,
    ) -> berth::Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_extension_veto_blocks_update_without_hooks() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(LocalArtifactRepository::new());
    resolver.publish(&release("1.0.0"), b"v1").await;
    resolver.publish(&release("2.0.0"), b"v2").await;

    let update_calls = Arc::new(AtomicUsize::new(0));
    let mut extensions = ExtensionRegistry::new();
    extensions
        .register(Arc::new(VetoExtension {
            update_calls: Arc::clone(&update_calls),
        }))
        .unwrap();

    let config = ServerEnvConfig::new("veto-server").with_state_dir(dir.path());
    let server = server_with(config, Arc::clone(&resolver), extensions).await;
    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();

    let response = server
        .update_release_id("orders", release("2.0.0"), false)
        .await
        .unwrap();
    assert!(response.is_failure());
    assert!(response.msg.contains("frozen for release window"));
    // the veto fires before any update hook runs
    assert_eq!(update_calls.load(Ordering::SeqCst), 0);

    let info = server.get_container_info("orders").await.unwrap().result.unwrap();
    assert_eq!(info.release_id.version, "1.0.0");
}

// =============================================================================
// Readiness & Health Tests
// =============================================================================

struct HealthExtension {
    initialized: AtomicBool,
    probe_calls: Arc<AtomicUsize>,
    messages: Vec<Message>,
}

#[async_trait]
impl ServerExtension for HealthExtension {
    fn name(&self) -> &str {
        "health"
    }

    fn capability(&self) -> &str {
        "Health"
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn init(&self, _ctx: &ExtensionContext) -> berth::Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self, _report: bool) -> Vec<Message> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.messages.clone()
    }
}

#[tokio::test]
async fn test_health_check_reports_unready_server() {
    let dir = TempDir::new().unwrap();
    let (server, _resolver) = basic_server(&dir).await;

    let messages = server.health_check(false).await;
    assert!(messages
        .iter()
        .any(|m| m.is_error() && m.messages[0].contains("not ready")));

    server.mark_as_ready();
    let messages = server.health_check(false).await;
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_health_check_flags_failed_container() {
    let dir = TempDir::new().unwrap();
    let (server, _resolver) = basic_server(&dir).await;
    server.mark_as_ready();

    // resolution failure registers the container as FAILED
    server
        .create_container("ghost", ContainerResource::new("ghost", release("9.9.9")))
        .await
        .unwrap();

    let messages = server.health_check(false).await;
    let errors: Vec<_> = messages.iter().filter(|m| m.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].messages[0].contains("ghost"));
}

#[tokio::test]
async fn test_health_check_one_error_per_fault() {
    // one FAILED container plus one unhealthy extension: exactly two ERRORs,
    // each naming its own fault
    let dir = TempDir::new().unwrap();
    let mut extensions = ExtensionRegistry::new();
    extensions
        .register(Arc::new(HealthExtension {
            initialized: AtomicBool::new(true),
            probe_calls: Arc::new(AtomicUsize::new(0)),
            messages: vec![Message::new(Severity::Error, "backend unreachable")],
        }))
        .unwrap();

    let resolver = Arc::new(LocalArtifactRepository::new());
    resolver.publish(&release("1.0.0"), b"v1").await;
    let config = ServerEnvConfig::new("health-server").with_state_dir(dir.path());
    let server = server_with(config, Arc::clone(&resolver), extensions).await;
    server.mark_as_ready();

    server
        .create_container("orders", ContainerResource::new("orders", release("1.0.0")))
        .await
        .unwrap();
    server
        .create_container("ghost", ContainerResource::new("ghost", release("9.9.9")))
        .await
        .unwrap();

    let errors: Vec<_> = server
        .health_check(false)
        .await
        .into_iter()
        .filter(|m| m.is_error())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|m| m.messages[0].contains("ghost")));
    assert!(errors
        .iter()
        .any(|m| m.messages[0].contains("backend unreachable")));
    // the healthy container contributes nothing
    assert!(!errors.iter().any(|m| m.messages[0].contains("orders")));
}

#[tokio::test]
async fn test_health_check_skips_uninitialized_extension() {
    let dir = TempDir::new().unwrap();
    let probe_calls = Arc::new(AtomicUsize::new(0));
    let mut extensions = ExtensionRegistry::new();
    extensions
        .register(Arc::new(HealthExtension {
            initialized: AtomicBool::new(false),
            probe_calls: Arc::clone(&probe_calls),
            messages: vec![],
        }))
        .unwrap();

    let resolver = Arc::new(LocalArtifactRepository::new());
    let config = ServerEnvConfig::new("health-server").with_state_dir(dir.path());
    let server = server_with(config, resolver, extensions).await;
    server.mark_as_ready();

    let messages = server.health_check(false).await;
    assert!(messages
        .iter()
        .any(|m| m.is_error() && m.messages[0].contains("not initialized")));
    // an uninitialized extension is never probed
    assert_eq!(probe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health_check_report_frames_extension_messages() {
    let dir = TempDir::new().unwrap();
    let probe_calls = Arc::new(AtomicUsize::new(0));
    let mut extensions = ExtensionRegistry::new();
    extensions
        .register(Arc::new(HealthExtension {
            initialized: AtomicBool::new(true),
            probe_calls: Arc::clone(&probe_calls),
            messages: vec![Message::new(Severity::Info, "extension healthy")],
        }))
        .unwrap();

    let resolver = Arc::new(LocalArtifactRepository::new());
    let config = ServerEnvConfig::new("health-server").with_state_dir(dir.path());
    let server = server_with(config, resolver, extensions).await;
    server.mark_as_ready();

    let messages = server.health_check(true).await;
    assert!(messages.len() >= 3);
    // header first, footer last, extension messages in between
    assert_eq!(messages.first().unwrap().severity, Severity::Info);
    assert!(messages.last().unwrap().messages[0].contains("done"));
    assert!(messages
        .iter()
        .any(|m| m.messages[0].contains("extension healthy")));
    assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_info_lists_capabilities() {
    let dir = TempDir::new().unwrap();
    let mut extensions = ExtensionRegistry::new();
    extensions
        .register(Arc::new(HealthExtension {
            initialized: AtomicBool::new(true),
            probe_calls: Arc::new(AtomicUsize::new(0)),
            messages: vec![],
        }))
        .unwrap();

    let resolver = Arc::new(LocalArtifactRepository::new());
    let config = ServerEnvConfig::new("info-server").with_state_dir(dir.path());
    let server = server_with(config, resolver, extensions).await;

    let info = server.get_server_info().await;
    assert_eq!(info.server_id, "info-server");
    assert_eq!(info.capabilities, vec!["Health".to_string()]);
    assert!(!info.version.is_empty());
}
