//! Boot configuration.
//!
//! [`ServerEnvConfig`] is the explicit configuration struct handed to the
//! server and repository constructors. [`ServerEnvConfig::from_env`] is the
//! single place that reads the process environment; everything downstream
//! takes the struct, which keeps tests free of ambient globals.

use crate::constants::{
    DEFAULT_SERVER_ID, DEFAULT_STARTUP_STRATEGY, ENV_JOBS_DISABLED, ENV_JOBS_INTERVAL,
    ENV_JOBS_POOL_SIZE, ENV_JOBS_QUEUE, ENV_JOBS_RETRIES, ENV_JOBS_TIME_UNIT,
    ENV_MGMT_API_DISABLED, ENV_SERVER_ID, ENV_SERVER_MODE, ENV_SERVER_NAME, ENV_STARTUP_STRATEGY,
    ENV_STATE_DIR, STATE_DIR_NAME,
};
use crate::state::ServerMode;
use std::path::PathBuf;

/// Tuning values for the background-job executor.
///
/// These are opaque to the lifecycle layer: whatever is present is persisted
/// verbatim into the state's configuration map the first time state is
/// created for a server identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobsConfig {
    pub interval: Option<String>,
    pub retries: Option<String>,
    pub pool_size: Option<String>,
    pub time_unit: Option<String>,
    pub queue: Option<String>,
    pub disabled: Option<String>,
}

impl JobsConfig {
    fn from_env() -> Self {
        Self {
            interval: std::env::var(ENV_JOBS_INTERVAL).ok(),
            retries: std::env::var(ENV_JOBS_RETRIES).ok(),
            pool_size: std::env::var(ENV_JOBS_POOL_SIZE).ok(),
            time_unit: std::env::var(ENV_JOBS_TIME_UNIT).ok(),
            queue: std::env::var(ENV_JOBS_QUEUE).ok(),
            disabled: std::env::var(ENV_JOBS_DISABLED).ok(),
        }
    }
}

/// Process-wide boot configuration, immutable after construction.
#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    /// Server identity; names the persisted state record.
    pub server_id: String,
    /// Human-readable server name.
    pub server_name: String,
    /// Deployment policy mode.
    pub mode: ServerMode,
    /// When set, every mutating management operation is rejected.
    pub management_disabled: bool,
    /// Startup strategy selector (`controller` or `local`).
    pub startup_strategy: String,
    /// Directory holding per-server state files.
    pub state_dir: PathBuf,
    /// Background-job tuning, persisted verbatim on first state creation.
    pub jobs: JobsConfig,
}

impl ServerEnvConfig {
    /// Configuration with defaults for the given server identity.
    pub fn new(server_id: impl Into<String>) -> Self {
        let server_id = server_id.into();
        Self {
            server_name: server_id.clone(),
            server_id,
            mode: ServerMode::Production,
            management_disabled: false,
            startup_strategy: DEFAULT_STARTUP_STRATEGY.to_string(),
            state_dir: default_state_dir(),
            jobs: JobsConfig::default(),
        }
    }

    /// Reads configuration from the process environment.
    ///
    /// Unset keys fall back to defaults; an unrecognized mode value falls
    /// back to `PRODUCTION` (mode is a policy gate, never silently widened).
    pub fn from_env() -> Self {
        let server_id =
            std::env::var(ENV_SERVER_ID).unwrap_or_else(|_| DEFAULT_SERVER_ID.to_string());
        let server_name = std::env::var(ENV_SERVER_NAME).unwrap_or_else(|_| server_id.clone());
        let mode = std::env::var(ENV_SERVER_MODE)
            .ok()
            .and_then(|v| ServerMode::parse(&v))
            .unwrap_or(ServerMode::Production);
        let management_disabled = std::env::var(ENV_MGMT_API_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let startup_strategy = std::env::var(ENV_STARTUP_STRATEGY)
            .unwrap_or_else(|_| DEFAULT_STARTUP_STRATEGY.to_string());
        let state_dir = std::env::var(ENV_STATE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir());

        Self {
            server_id,
            server_name,
            mode,
            management_disabled,
            startup_strategy,
            state_dir,
            jobs: JobsConfig::from_env(),
        }
    }

    /// Returns a copy with the given mode.
    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns a copy with the given state directory.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Returns a copy with the management API disabled flag set.
    pub fn with_management_disabled(mut self, disabled: bool) -> Self {
        self.management_disabled = disabled;
        self
    }

    /// Returns a copy with the given startup strategy selector.
    pub fn with_startup_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.startup_strategy = strategy.into();
        self
    }

    /// Returns a copy with the given job tuning values.
    pub fn with_jobs(mut self, jobs: JobsConfig) -> Self {
        self.jobs = jobs;
        self
    }
}

fn default_state_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(STATE_DIR_NAME),
        None => PathBuf::from(STATE_DIR_NAME),
    }
}
