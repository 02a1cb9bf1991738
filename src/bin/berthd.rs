//! Standalone server daemon.
//!
//! Boots a server core from the process environment, replays persisted
//! containers with the local startup strategy and runs until SIGINT. A
//! controller transport is wired in by embedding crates; standalone the
//! `controller` selector falls back to `local`.

use berth::{
    ExtensionRegistry, FileStateRepository, LocalArtifactRepository, Server, ServerEnvConfig,
    StartupStrategyProvider,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> berth::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerEnvConfig::from_env();
    info!(
        server_id = %config.server_id,
        mode = %config.mode,
        state_dir = %config.state_dir.display(),
        "starting berthd"
    );

    let mut selector = config.startup_strategy.clone();
    if selector == "controller" {
        warn!("no controller transport in standalone mode, using local startup strategy");
        selector = "local".to_string();
    }

    let repository = Arc::new(FileStateRepository::new(&config).await?);
    let resolver = Arc::new(LocalArtifactRepository::new());
    let server = Server::new(config, repository, resolver, ExtensionRegistry::new());

    let provider = StartupStrategyProvider::local_only();
    server.init(provider.strategy_for(&selector)?).await?;

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}
