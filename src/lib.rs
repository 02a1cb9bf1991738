//! # berth
//!
//! **Container Lifecycle and State-Management Core**
//!
//! This crate implements the management core of a deployment server: named
//! containers bind release coordinates to loaded artifacts, survive restarts
//! through a persisted state record, and track moving (snapshot / `LATEST`)
//! releases with background scanners. Transport layers (REST, messaging) sit
//! above this crate; everything here is in-process API.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            berth                                 │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                       Server Core                          │  │
//! │  │  create → update / scan → activate / deactivate → dispose  │  │
//! │  │        readiness latch │ health check │ command scripts    │  │
//! │  └───────────────┬──────────────────────┬─────────────────────┘  │
//! │                  │                      │                        │
//! │  ┌───────────────┴───────┐   ┌──────────┴──────────────────┐     │
//! │  │  Extension Registry   │   │     Scanner Scheduler        │     │
//! │  │  ordered init/destroy │   │  one poll task per container │     │
//! │  │  update veto gate     │   │  swap-on-newer-resolution    │     │
//! │  └───────────────────────┘   └──────────┬──────────────────┘     │
//! │                                         │                        │
//! │  ┌──────────────────────┐   ┌───────────┴──────────────────┐     │
//! │  │   State Repository   │   │      Artifact Resolver       │     │
//! │  │  one JSON per server │   │  LATEST / SNAPSHOT → concrete│     │
//! │  │  atomic temp+rename  │   │  digest-addressed handles    │     │
//! │  └──────────────────────┘   └──────────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Container Lifecycle
//!
//! ```text
//!  ┌──────────┐ resolve+start ┌─────────┐  deactivate  ┌─────────────┐
//!  │ Creating │ ────────────► │ Started │ ───────────► │ Deactivated │
//!  └────┬─────┘               └────┬────┘ ◄─────────── └──────┬──────┘
//!       │ resolve/hook failure     │        activate          │
//!       ▼                          │ dispose                  │ dispose
//!  ┌────────┐                      ▼                          ▼
//!  │ Failed │                 ┌─────────┐ ◄──────────────────┘
//!  └────────┘                 │ Stopped │   (deregistered)
//!                             └─────────┘
//! ```
//!
//! # Key Properties
//!
//! - **Durable registry**: every successful mutation persists the full
//!   container record; a restart with the local startup strategy replays it,
//!   including deactivated statuses and running scanners.
//! - **Serialized per-container mutation**: explicit updates and scanner
//!   ticks share one lock per container, so an artifact swap is atomic with
//!   respect to readers of that container.
//! - **Extension veto**: release updates consult every extension before any
//!   post-update hook runs; one denial aborts the update untouched.
//! - **Business failure is not a fault**: duplicate ids, mode conflicts and the
//!   disabled-management gate come back as `Failure` responses; `Err` is
//!   reserved for storage and extension faults.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::{
//!     ContainerResource, ExtensionRegistry, FileStateRepository,
//!     LocalArtifactRepository, ReleaseId, Server, ServerEnvConfig,
//!     StartupStrategyProvider,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> berth::Result<()> {
//!     let config = ServerEnvConfig::from_env();
//!     let repository = Arc::new(FileStateRepository::new(&config).await?);
//!     let resolver = Arc::new(LocalArtifactRepository::new());
//!     let server = Server::new(config, repository, resolver, ExtensionRegistry::new());
//!
//!     let provider = StartupStrategyProvider::local_only();
//!     server.init(provider.strategy_for("local")?).await?;
//!
//!     let resource = ContainerResource::new("orders", ReleaseId::parse("com.acme:orders:1.0.0")?);
//!     let response = server.create_container("orders", resource).await?;
//!     assert!(response.is_success());
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod constants;
pub mod container;
pub mod deployment;
pub mod error;
pub mod extension;
pub mod message;
pub mod release;
pub mod resolver;
pub mod scanner;
pub mod server;
pub mod startup;
pub mod state;
pub mod storage;

// Re-exports
pub use command::{execute_script, CommandScript, ServerCommand};
pub use config::{JobsConfig, ServerEnvConfig};
pub use constants::*;
pub use container::{
    ConfigItem, ContainerFilter, ContainerInstance, ContainerResource, ContainerStatus,
    PayloadCodec, WireFormat,
};
pub use deployment::DeploymentSpec;
pub use error::{Error, Result};
pub use extension::{ExtensionContext, ExtensionRegistry, ServerExtension, UpdateGate};
pub use message::{Message, ResponseType, ServiceResponse, Severity};
pub use release::{compare_versions, ReleaseId};
pub use resolver::{ArtifactHandle, ArtifactResolver, LocalArtifactRepository};
pub use scanner::{ScanContext, ScannerResource, ScannerScheduler, ScannerStatus};
pub use server::{Server, ServerInfo};
pub use startup::{
    BootPlan, ContainerManager, ControllerBasedStartupStrategy, ControllerClient,
    LocalContainersStartupStrategy, ServerSetup, StartupStrategy, StartupStrategyProvider,
};
pub use state::{ServerConfig, ServerMode, ServerState};
pub use storage::{FileStateRepository, StateMutation, StateRepository};
