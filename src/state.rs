//! # Server State
//!
//! The durable record of a server's identity, policy mode, configuration map
//! and container set. State is what survives a restart: the startup layer
//! replays `containers` back into the live registry, and every successful
//! mutating operation writes an updated snapshot back through
//! [`crate::storage`].

use crate::container::ContainerResource;
use crate::release::ReleaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deployment policy mode.
///
/// `Production` refuses floating snapshot versions at create and update time;
/// `Development` accepts them. The mode is fixed at boot and persisted with
/// the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerMode {
    Production,
    Development,
}

impl ServerMode {
    /// Parses a mode name, case-insensitively. Returns `None` for anything
    /// other than `PRODUCTION` or `DEVELOPMENT`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "PRODUCTION" => Some(Self::Production),
            "DEVELOPMENT" => Some(Self::Development),
            _ => None,
        }
    }

    /// Returns true if this mode permits deploying the given coordinate.
    pub fn permits(&self, release: &ReleaseId) -> bool {
        match self {
            Self::Production => !release.is_snapshot(),
            Self::Development => true,
        }
    }
}

impl std::fmt::Display for ServerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "PRODUCTION"),
            Self::Development => write!(f, "DEVELOPMENT"),
        }
    }
}

/// Free-form string configuration map carried by the server state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerConfig {
    items: BTreeMap<String, String>,
}

impl ServerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a configuration value.
    pub fn config_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Sets a configuration value, returning the previous one if any.
    pub fn set_config_item(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.items.insert(key.into(), value.into())
    }

    /// Removes a configuration value.
    pub fn remove_config_item(&mut self, key: &str) -> Option<String> {
        self.items.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Durable server state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    /// Identity this state belongs to.
    pub server_id: String,
    /// Policy mode the server was booted with.
    pub mode: ServerMode,
    /// Free-form configuration map.
    pub configuration: ServerConfig,
    /// Persisted container records, one per registered container id.
    pub containers: Vec<ContainerResource>,
    /// Last successful write.
    pub updated_at: DateTime<Utc>,
}

impl ServerState {
    /// Empty state for a server identity.
    #[must_use]
    pub fn new(server_id: impl Into<String>, mode: ServerMode) -> Self {
        Self {
            server_id: server_id.into(),
            mode,
            configuration: ServerConfig::new(),
            containers: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Looks up a persisted container record.
    pub fn container(&self, container_id: &str) -> Option<&ContainerResource> {
        self.containers
            .iter()
            .find(|c| c.container_id == container_id)
    }

    /// Inserts or replaces a container record and refreshes `updated_at`.
    pub fn upsert_container(&mut self, resource: ContainerResource) {
        match self
            .containers
            .iter_mut()
            .find(|c| c.container_id == resource.container_id)
        {
            Some(existing) => *existing = resource,
            None => self.containers.push(resource),
        }
        self.updated_at = Utc::now();
    }

    /// Removes a container record; returns it if present.
    pub fn remove_container(&mut self, container_id: &str) -> Option<ContainerResource> {
        let idx = self
            .containers
            .iter()
            .position(|c| c.container_id == container_id)?;
        self.updated_at = Utc::now();
        Some(self.containers.remove(idx))
    }
}
