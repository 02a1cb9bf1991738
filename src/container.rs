//! # Container Model
//!
//! Containers are the unit of deployment: a named binding of a release
//! coordinate to loaded artifact content. [`ContainerResource`] is the
//! serializable record (used for create requests, listings and the persisted
//! state), while [`ContainerInstance`] is the live in-memory object that
//! additionally owns the loaded artifact handle and the per-format payload
//! codec cache.

use crate::error::Result;
use crate::message::Message;
use crate::release::ReleaseId;
use crate::resolver::ArtifactHandle;
use crate::scanner::ScannerResource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle state of a container.
///
/// `Creating` is transient and never persisted. A loaded container is
/// `Started` (serving) or `Deactivated` (loaded, refusing work). `Failed`
/// marks a container whose artifact could not be resolved or whose extension
/// hooks rejected it; it stays registered so the failure is inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerStatus {
    Creating,
    Started,
    Deactivated,
    Failed,
    Stopped,
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Creating => "CREATING",
            Self::Started => "STARTED",
            Self::Deactivated => "DEACTIVATED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// Typed configuration entry attached to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItem {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub item_type: String,
}

impl ConfigItem {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            item_type: item_type.into(),
        }
    }
}

/// Serializable container record.
///
/// Doubles as the create-request body, the list/get payload, and the
/// persisted state entry. `release_id` is the configured (possibly floating)
/// coordinate; `resolved_release_id` is the concrete coordinate actually
/// loaded, present once the container reached `Started` at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResource {
    pub container_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_alias: Option<String>,
    pub release_id: ReleaseId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_release_id: Option<ReleaseId>,
    pub status: ContainerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_items: Vec<ConfigItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl ContainerResource {
    /// New record in `Creating` status.
    #[must_use]
    pub fn new(container_id: impl Into<String>, release_id: ReleaseId) -> Self {
        Self {
            container_id: container_id.into(),
            container_alias: None,
            release_id,
            resolved_release_id: None,
            status: ContainerStatus::Creating,
            scanner: None,
            config_items: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Returns a copy with an alias set.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.container_alias = Some(alias.into());
        self
    }

    /// Returns a copy with a scanner request attached.
    pub fn with_scanner(mut self, scanner: ScannerResource) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Looks up a config item by name.
    pub fn config_item(&self, name: &str) -> Option<&ConfigItem> {
        self.config_items.iter().find(|i| i.name == name)
    }

    /// Replaces the message list with a single message.
    pub fn set_message(&mut self, message: Message) {
        self.messages = vec![message];
    }
}

/// Predicate for container listings.
///
/// An unset field matches everything; set fields must all match. The release
/// fields compare against the configured coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerFilter {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub statuses: Option<Vec<ContainerStatus>>,
}

impl ContainerFilter {
    /// Matches every container.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches containers in any of the given statuses.
    #[must_use]
    pub fn with_statuses(statuses: Vec<ContainerStatus>) -> Self {
        Self {
            statuses: Some(statuses),
            ..Self::default()
        }
    }

    /// Matches containers by coordinate parts; `None` parts are wildcards.
    #[must_use]
    pub fn with_release(
        group_id: Option<String>,
        artifact_id: Option<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id,
            artifact_id,
            version,
            statuses: None,
        }
    }

    /// Returns true if the container matches every set field.
    pub fn accepts(&self, resource: &ContainerResource) -> bool {
        if let Some(g) = &self.group_id {
            if &resource.release_id.group_id != g {
                return false;
            }
        }
        if let Some(a) = &self.artifact_id {
            if &resource.release_id.artifact_id != a {
                return false;
            }
        }
        if let Some(v) = &self.version {
            if &resource.release_id.version != v {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&resource.status) {
                return false;
            }
        }
        true
    }
}

/// Payload formats a container can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireFormat {
    Json,
    Yaml,
}

/// Payload codec for one wire format.
///
/// Codecs are cached per container and rebuilt after an artifact swap, so a
/// payload is never interpreted against a stale artifact version.
#[derive(Debug)]
pub struct PayloadCodec {
    format: WireFormat,
    /// Concrete coordinate the codec was built against.
    release: ReleaseId,
}

impl PayloadCodec {
    fn new(format: WireFormat, release: ReleaseId) -> Self {
        Self { format, release }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Coordinate this codec was built for.
    pub fn release(&self) -> &ReleaseId {
        &self.release
    }

    /// Encodes a value into the codec's wire format.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        match self.format {
            WireFormat::Json => Ok(serde_json::to_string(value)?),
            WireFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    /// Decodes a value from the codec's wire format.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self, text: &str) -> Result<T> {
        match self.format {
            WireFormat::Json => Ok(serde_json::from_str(text)?),
            WireFormat::Yaml => Ok(serde_yaml::from_str(text)?),
        }
    }
}

/// Live container: the serializable record plus loaded runtime parts.
///
/// Invariant: `artifact` is `Some` exactly while the status is `Started` or
/// `Deactivated`. The codec cache only ever holds codecs built against the
/// currently loaded artifact.
#[derive(Debug)]
pub struct ContainerInstance {
    resource: ContainerResource,
    artifact: Option<ArtifactHandle>,
    codecs: HashMap<WireFormat, Arc<PayloadCodec>>,
}

impl ContainerInstance {
    /// Wraps a record; no artifact loaded yet.
    #[must_use]
    pub fn new(resource: ContainerResource) -> Self {
        Self {
            resource,
            artifact: None,
            codecs: HashMap::new(),
        }
    }

    pub fn resource(&self) -> &ContainerResource {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut ContainerResource {
        &mut self.resource
    }

    pub fn container_id(&self) -> &str {
        &self.resource.container_id
    }

    pub fn status(&self) -> ContainerStatus {
        self.resource.status
    }

    pub fn set_status(&mut self, status: ContainerStatus) {
        self.resource.status = status;
    }

    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.artifact.as_ref()
    }

    /// Marks the container started with the given loaded artifact.
    pub fn start_with(&mut self, artifact: ArtifactHandle) {
        self.resource.resolved_release_id = Some(artifact.release_id.clone());
        self.artifact = Some(artifact);
        self.codecs.clear();
        self.resource.status = ContainerStatus::Started;
    }

    /// Atomically replaces the loaded artifact and clears the codec cache.
    ///
    /// Status is unchanged: an update on a deactivated container leaves it
    /// deactivated.
    pub fn swap_artifact(&mut self, artifact: ArtifactHandle) {
        self.resource.resolved_release_id = Some(artifact.release_id.clone());
        self.artifact = Some(artifact);
        self.codecs.clear();
    }

    /// Drops the loaded artifact, used by dispose and failed creates. The
    /// resolved coordinate stays on the record as a historical fact.
    pub fn unload(&mut self) {
        self.artifact = None;
        self.codecs.clear();
    }

    /// Returns the cached codec for a format, building it on first use.
    ///
    /// Only valid while an artifact is loaded.
    pub fn codec(&mut self, format: WireFormat) -> Option<Arc<PayloadCodec>> {
        let release = self.resource.resolved_release_id.clone()?;
        if self.artifact.is_none() {
            return None;
        }
        let codec = self
            .codecs
            .entry(format)
            .or_insert_with(|| Arc::new(PayloadCodec::new(format, release)));
        Some(Arc::clone(codec))
    }

    /// Number of cached codecs, visible for swap verification.
    pub fn cached_codecs(&self) -> usize {
        self.codecs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(version: &str) -> ArtifactHandle {
        ArtifactHandle {
            release_id: ReleaseId::new("g", "a", version),
            digest: format!("sha256:{version}"),
            size: 16,
        }
    }

    #[test]
    fn test_start_sets_resolved_and_status() {
        let mut inst = ContainerInstance::new(ContainerResource::new(
            "c1",
            ReleaseId::new("g", "a", "LATEST"),
        ));
        inst.start_with(handle("1.2.0"));
        assert_eq!(inst.status(), ContainerStatus::Started);
        assert_eq!(
            inst.resource().resolved_release_id.as_ref().unwrap().version,
            "1.2.0"
        );
    }

    #[test]
    fn test_swap_clears_codec_cache() {
        let mut inst = ContainerInstance::new(ContainerResource::new(
            "c1",
            ReleaseId::new("g", "a", "1.0.0-SNAPSHOT"),
        ));
        inst.start_with(handle("1.0.0-b1"));
        let codec = inst.codec(WireFormat::Json).unwrap();
        assert_eq!(codec.release().version, "1.0.0-b1");
        assert_eq!(inst.cached_codecs(), 1);

        inst.swap_artifact(handle("1.0.0-b2"));
        assert_eq!(inst.cached_codecs(), 0);
        let codec = inst.codec(WireFormat::Json).unwrap();
        assert_eq!(codec.release().version, "1.0.0-b2");
    }

    #[test]
    fn test_codec_roundtrip_both_formats() {
        let mut inst = ContainerInstance::new(ContainerResource::new(
            "c1",
            ReleaseId::new("g", "a", "1.0.0"),
        ));
        inst.start_with(handle("1.0.0"));
        for format in [WireFormat::Json, WireFormat::Yaml] {
            let codec = inst.codec(format).unwrap();
            let text = codec.encode(&vec![1u32, 2, 3]).unwrap();
            let back: Vec<u32> = codec.decode(&text).unwrap();
            assert_eq!(back, vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_filter_matches() {
        let mut r = ContainerResource::new("c1", ReleaseId::new("com.acme", "orders", "1.0.0"));
        r.status = ContainerStatus::Started;

        assert!(ContainerFilter::any().accepts(&r));
        assert!(ContainerFilter::with_statuses(vec![ContainerStatus::Started]).accepts(&r));
        assert!(!ContainerFilter::with_statuses(vec![ContainerStatus::Failed]).accepts(&r));
        assert!(ContainerFilter::with_release(
            Some("com.acme".into()),
            None,
            None
        )
        .accepts(&r));
        assert!(!ContainerFilter::with_release(None, Some("billing".into()), None).accepts(&r));
    }
}
