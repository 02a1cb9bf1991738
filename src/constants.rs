//! # Server Constants
//!
//! Environment keys, bounds and timeouts for the container lifecycle layer.
//! These constants are the single source of truth for every configurable
//! knob; [`crate::config::ServerEnvConfig::from_env`] is the only code that
//! reads the keys from the process environment.

use std::time::Duration;

// =============================================================================
// Environment Keys
// =============================================================================
//
// Consumed once at boot by `ServerEnvConfig::from_env`. The job-tuning family
// is additionally persisted verbatim into the server state's configuration
// map the first time state is materialized for a server identity.
// =============================================================================

/// Server identity; names the persisted state record.
pub const ENV_SERVER_ID: &str = "BERTH_SERVER_ID";

/// Human-readable server name. Defaults to the server id.
pub const ENV_SERVER_NAME: &str = "BERTH_SERVER_NAME";

/// Server mode: `PRODUCTION` (default) or `DEVELOPMENT`.
pub const ENV_SERVER_MODE: &str = "BERTH_SERVER_MODE";

/// When `true`, every mutating management operation is rejected.
pub const ENV_MGMT_API_DISABLED: &str = "BERTH_MGMT_API_DISABLED";

/// Startup strategy selector: `controller` or `local`.
pub const ENV_STARTUP_STRATEGY: &str = "BERTH_STARTUP_STRATEGY";

/// Directory holding per-server state files.
pub const ENV_STATE_DIR: &str = "BERTH_STATE_DIR";

/// Background-job poll interval (persisted verbatim).
pub const ENV_JOBS_INTERVAL: &str = "BERTH_JOBS_INTERVAL";

/// Background-job retry count (persisted verbatim).
pub const ENV_JOBS_RETRIES: &str = "BERTH_JOBS_RETRIES";

/// Background-job executor pool size (persisted verbatim).
pub const ENV_JOBS_POOL_SIZE: &str = "BERTH_JOBS_POOL_SIZE";

/// Background-job interval time unit (persisted verbatim).
pub const ENV_JOBS_TIME_UNIT: &str = "BERTH_JOBS_TIME_UNIT";

/// Background-job queue name (persisted verbatim).
pub const ENV_JOBS_QUEUE: &str = "BERTH_JOBS_QUEUE";

/// Background-job disabled flag (persisted verbatim).
pub const ENV_JOBS_DISABLED: &str = "BERTH_JOBS_DISABLED";

// =============================================================================
// Configuration Map Keys
// =============================================================================

/// State-config key for the job poll interval.
pub const CFG_JOBS_INTERVAL: &str = "jobs.interval";
/// State-config key for the job retry count.
pub const CFG_JOBS_RETRIES: &str = "jobs.retries";
/// State-config key for the executor pool size.
pub const CFG_JOBS_POOL_SIZE: &str = "jobs.pool-size";
/// State-config key for the interval time unit.
pub const CFG_JOBS_TIME_UNIT: &str = "jobs.time-unit";
/// State-config key for the job queue name.
pub const CFG_JOBS_QUEUE: &str = "jobs.queue";
/// State-config key for the job disabled flag.
pub const CFG_JOBS_DISABLED: &str = "jobs.disabled";

// =============================================================================
// Defaults
// =============================================================================

/// Server id used when `BERTH_SERVER_ID` is unset.
pub const DEFAULT_SERVER_ID: &str = "berth-server";

/// Startup strategy used when the selector is unset.
pub const DEFAULT_STARTUP_STRATEGY: &str = "controller";

/// Directory under the home directory for state files.
pub const STATE_DIR_NAME: &str = ".berth/state";

/// Suffix of per-server state files.
pub const STATE_FILE_SUFFIX: &str = ".json";

// =============================================================================
// Bounds
// =============================================================================

/// Maximum number of containers a single server will register.
///
/// Bounds registry memory; a create beyond this limit is rejected as a
/// conflict rather than allowed to grow the map without limit.
pub const MAX_CONTAINERS: usize = 1024;

/// Maximum number of extensions that can be registered.
pub const MAX_EXTENSIONS: usize = 16;

/// Maximum length of a container id.
///
/// Container ids become file-system-adjacent identifiers in logs and state
/// records; pathological lengths are rejected at validation time.
pub const MAX_CONTAINER_ID_LEN: usize = 128;

// =============================================================================
// Timeouts & Intervals
// =============================================================================

/// Default scanner poll interval when a start request omits one.
pub const DEFAULT_SCANNER_INTERVAL: Duration = Duration::from_secs(60);

/// Minimum accepted scanner poll interval.
///
/// Protects the artifact repository from sub-second polling loops.
pub const MIN_SCANNER_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on a single controller connect attempt during boot.
///
/// A hung controller must not wedge the boot sequence indefinitely; after
/// this deadline the controller-based startup strategy fails the boot.
pub const CONTROLLER_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on any single extension lifecycle callback.
pub const EXTENSION_CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Version suffix marking a floating, mutable snapshot release.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Floating version marker resolving to the highest available release.
pub const LATEST_VERSION: &str = "LATEST";
