//! Release coordinates.
//!
//! A [`ReleaseId`] is a group/artifact/version (GAV) coordinate identifying a
//! packaged artifact. Two flavors of a coordinate matter throughout the
//! crate: the *configured* coordinate a client asked for, which may carry a
//! floating marker (`LATEST`, a `-SNAPSHOT` version), and the *resolved*
//! coordinate actually loaded, which is always concrete.

use crate::constants::{LATEST_VERSION, SNAPSHOT_SUFFIX};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Group/artifact/version coordinate for a packaged artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseId {
    /// Group the artifact belongs to.
    pub group_id: String,
    /// Artifact name within the group.
    pub artifact_id: String,
    /// Version, possibly floating (`LATEST` or `-SNAPSHOT`).
    pub version: String,
}

impl ReleaseId {
    /// Creates a release id from its parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Parses a `group:artifact:version` coordinate.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split(':');
        let (group, artifact, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(a), Some(v)) => (g.trim(), a.trim(), v.trim()),
            _ => {
                return Err(Error::InvalidReleaseId {
                    text: text.to_string(),
                    reason: "expected group:artifact:version".to_string(),
                })
            }
        };
        if parts.next().is_some() {
            return Err(Error::InvalidReleaseId {
                text: text.to_string(),
                reason: "too many ':' separators".to_string(),
            });
        }
        if group.is_empty() || artifact.is_empty() || version.is_empty() {
            return Err(Error::InvalidReleaseId {
                text: text.to_string(),
                reason: "empty coordinate segment".to_string(),
            });
        }
        Ok(Self::new(group, artifact, version))
    }

    /// Returns true if the version is a mutable `-SNAPSHOT` release.
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// Returns true if the version is floating (snapshot or `LATEST`) and
    /// must be re-resolved against the artifact repository to become
    /// concrete.
    pub fn is_floating(&self) -> bool {
        self.is_snapshot() || self.version == LATEST_VERSION
    }

    /// Returns true if this coordinate names the same group and artifact.
    pub fn same_artifact(&self, other: &ReleaseId) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Compares two version strings segment by segment.
///
/// Segments are split on `.` and `-`; embedded digit runs compare
/// numerically, so `1.0.10` sorts above `1.0.9` and build qualifier `b10`
/// above `b2`. `2.0.0` sorts above `2.0.0-SNAPSHOT` (a qualifier sorts below
/// the bare release with the same prefix).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| -> Vec<String> {
        v.split(['.', '-']).map(str::to_string).collect()
    };
    let sa = split(a);
    let sb = split(b);
    let len = sa.len().max(sb.len());

    for i in 0..len {
        match (sa.get(i), sb.get(i)) {
            (Some(x), Some(y)) => {
                let ord = compare_segment(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            // "1.0" vs "1.0.1": shorter sorts first
            (None, Some(y)) => {
                // unless the extra segment is a qualifier: "2.0" > "2.0-SNAPSHOT"
                if y.parse::<u64>().is_err() {
                    return Ordering::Greater;
                }
                return Ordering::Less;
            }
            (Some(x), None) => {
                if x.parse::<u64>().is_err() {
                    return Ordering::Less;
                }
                return Ordering::Greater;
            }
            (None, None) => break,
        }
    }
    Ordering::Equal
}

/// Natural comparison of one version segment: digit runs compare as numbers,
/// everything else byte-wise.
fn compare_segment(a: &str, b: &str) -> Ordering {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);
    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let si = i;
            while i < ab.len() && ab[i].is_ascii_digit() {
                i += 1;
            }
            let sj = j;
            while j < bb.len() && bb[j].is_ascii_digit() {
                j += 1;
            }
            let na: u128 = a[si..i].parse().unwrap_or(u128::MAX);
            let nb: u128 = b[sj..j].parse().unwrap_or(u128::MAX);
            match na.cmp(&nb) {
                Ordering::Equal => {}
                ord => return ord,
            }
        } else {
            match ab[i].cmp(&bb[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                ord => return ord,
            }
        }
    }
    (ab.len() - i).cmp(&(bb.len() - j))
}
