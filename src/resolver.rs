//! # Artifact Resolution
//!
//! Resolution turns a configured (possibly floating) release coordinate into
//! a loadable artifact with a concrete version. [`ArtifactResolver`] is the
//! seam the lifecycle layer and the scanner poll through;
//! [`LocalArtifactRepository`] is the in-process implementation backing the
//! local startup strategy and the test suite.

use crate::error::{Error, Result};
use crate::release::{compare_versions, ReleaseId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// A resolved, loadable artifact.
///
/// `release_id` is always concrete: `LATEST` and `-SNAPSHOT` markers never
/// survive resolution. Two handles with the same digest carry identical
/// content, which is what the scanner compares to decide whether a swap is
/// needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactHandle {
    pub release_id: ReleaseId,
    /// `sha256:<hex>` digest of the artifact content.
    pub digest: String,
    pub size: u64,
}

/// Resolves coordinates against an artifact source.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Resolves a coordinate to a concrete artifact.
    ///
    /// A floating coordinate (`LATEST`, `-SNAPSHOT`) resolves to the newest
    /// matching artifact; a concrete coordinate must match exactly.
    async fn resolve(&self, release: &ReleaseId) -> Result<ArtifactHandle>;
}

#[derive(Debug, Clone)]
struct PublishedArtifact {
    /// Concrete version, build-qualified for snapshot publishes.
    version: String,
    /// Version the artifact was published under (snapshot publishes keep
    /// the `-SNAPSHOT` marker here).
    published_as: String,
    digest: String,
    size: u64,
}

/// In-process artifact repository.
///
/// Publishing a snapshot coordinate assigns an increasing build number, so
/// `1.0.0-SNAPSHOT` published three times yields `1.0.0-b1` through
/// `1.0.0-b3` and resolution always sees a fresh concrete version after each
/// publish. Concrete coordinates overwrite in place.
#[derive(Default)]
pub struct LocalArtifactRepository {
    artifacts: Mutex<HashMap<(String, String), Vec<PublishedArtifact>>>,
}

impl LocalArtifactRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes artifact content under a coordinate and returns the
    /// concrete handle it is now resolvable as.
    pub async fn publish(&self, release: &ReleaseId, content: &[u8]) -> ArtifactHandle {
        let digest = format!("sha256:{}", hex::encode(Sha256::digest(content)));
        let size = content.len() as u64;

        let mut artifacts = self.artifacts.lock().await;
        let entries = artifacts
            .entry((release.group_id.clone(), release.artifact_id.clone()))
            .or_default();

        let version = if release.is_snapshot() {
            let base = release
                .version
                .strip_suffix(crate::constants::SNAPSHOT_SUFFIX)
                .unwrap_or(&release.version);
            let build = entries
                .iter()
                .filter(|e| e.published_as == release.version)
                .count()
                + 1;
            format!("{base}-b{build}")
        } else {
            // republishing a concrete version replaces it
            entries.retain(|e| e.version != release.version);
            release.version.clone()
        };

        entries.push(PublishedArtifact {
            version: version.clone(),
            published_as: release.version.clone(),
            digest: digest.clone(),
            size,
        });
        debug!(release = %release, concrete = %version, "artifact published");

        ArtifactHandle {
            release_id: ReleaseId::new(&release.group_id, &release.artifact_id, version),
            digest,
            size,
        }
    }
}

#[async_trait]
impl ArtifactResolver for LocalArtifactRepository {
    async fn resolve(&self, release: &ReleaseId) -> Result<ArtifactHandle> {
        let artifacts = self.artifacts.lock().await;
        let entries = artifacts
            .get(&(release.group_id.clone(), release.artifact_id.clone()))
            .ok_or_else(|| Error::ArtifactNotFound(release.to_string()))?;

        let chosen = if release.version == crate::constants::LATEST_VERSION {
            entries
                .iter()
                .max_by(|a, b| compare_versions(&a.version, &b.version))
        } else if release.is_snapshot() {
            // newest build published under this snapshot marker
            entries
                .iter()
                .filter(|e| e.published_as == release.version)
                .max_by(|a, b| compare_versions(&a.version, &b.version))
        } else {
            entries.iter().find(|e| e.version == release.version)
        };

        let chosen = chosen.ok_or_else(|| Error::ResolutionFailed {
            release: release.to_string(),
            reason: "no matching artifact published".to_string(),
        })?;

        Ok(ArtifactHandle {
            release_id: ReleaseId::new(&release.group_id, &release.artifact_id, &chosen.version),
            digest: chosen.digest.clone(),
            size: chosen.size,
        })
    }
}
