//! Deployment sets.
//!
//! A deployment set is the canonical external representation of a group of
//! container deployments: a `|`-delimited list of
//! `alias=group:artifact:version` entries, optionally with a parenthesized
//! display name (`alias(display)=group:artifact:version`).
//!
//! Parsing never fails on duplicate aliases. The caller chooses *filtered*
//! mode (only the highest version per alias survives) or *unfiltered* mode
//! (all entries kept). Serialization sorts by alias, ties broken by display
//! name, so the canonical form is deterministic and diff-friendly; in
//! filtered mode `serialize` is a left inverse of `parse`.

use crate::error::{Error, Result};
use crate::release::{compare_versions, ReleaseId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One entry of a deployment set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Alias the deployment is addressed by.
    pub alias: String,
    /// Optional display name distinct from the alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Artifact coordinate.
    pub release_id: ReleaseId,
}

impl DeploymentSpec {
    /// Parses a single `alias=g:a:v` or `alias(display)=g:a:v` entry.
    pub fn parse(entry: &str) -> Result<Self> {
        let (head, gav) = entry.split_once('=').ok_or_else(|| {
            Error::InvalidDeploymentEntry {
                entry: entry.to_string(),
                reason: "missing '='".to_string(),
            }
        })?;
        let head = head.trim();
        let (alias, name) = match head.split_once('(') {
            Some((alias, rest)) => {
                let display = rest.strip_suffix(')').ok_or_else(|| {
                    Error::InvalidDeploymentEntry {
                        entry: entry.to_string(),
                        reason: "unterminated display name".to_string(),
                    }
                })?;
                (alias.trim(), Some(display.trim().to_string()))
            }
            None => (head, None),
        };
        if alias.is_empty() {
            return Err(Error::InvalidDeploymentEntry {
                entry: entry.to_string(),
                reason: "empty alias".to_string(),
            });
        }
        Ok(Self {
            alias: alias.to_string(),
            name,
            release_id: ReleaseId::parse(gav.trim())?,
        })
    }

    /// Display name, falling back to the alias.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.alias)
    }
}

impl std::fmt::Display for DeploymentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})={}", self.alias, name, self.release_id),
            None => write!(f, "{}={}", self.alias, self.release_id),
        }
    }
}

// Canonical ordering: alias first, display name breaks ties, release id
// keeps distinct unfiltered duplicates apart.
impl Ord for DeploymentSpec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.alias
            .cmp(&other.alias)
            .then_with(|| self.display_name().cmp(other.display_name()))
            .then_with(|| {
                compare_versions(&self.release_id.version, &other.release_id.version)
            })
            .then_with(|| self.release_id.to_string().cmp(&other.release_id.to_string()))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for DeploymentSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses a `|`-delimited deployment-set text.
///
/// With `filtered` set, entries sharing an alias are deduplicated and only
/// the highest version under each alias survives. Empty segments are
/// skipped, so trailing delimiters are harmless.
pub fn parse(text: &str, filtered: bool) -> Result<BTreeSet<DeploymentSpec>> {
    let mut set: BTreeSet<DeploymentSpec> = BTreeSet::new();

    for entry in text.split('|') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let spec = DeploymentSpec::parse(entry)?;

        if filtered {
            let shadowed = set
                .iter()
                .find(|existing| existing.alias == spec.alias)
                .cloned();
            match shadowed {
                Some(existing)
                    if compare_versions(
                        &existing.release_id.version,
                        &spec.release_id.version,
                    ) == Ordering::Less =>
                {
                    set.remove(&existing);
                    set.insert(spec);
                }
                Some(_) => {} // existing entry wins
                None => {
                    set.insert(spec);
                }
            }
        } else {
            set.insert(spec);
        }
    }

    Ok(set)
}

/// Serializes a deployment set into its canonical text form.
///
/// The `BTreeSet` ordering (alias, then display name) makes the output
/// deterministic; `serialize(parse(x, filtered))` is a fixed point under
/// re-parsing.
pub fn serialize(set: &BTreeSet<DeploymentSpec>) -> String {
    set.iter()
        .map(DeploymentSpec::to_string)
        .collect::<Vec<_>>()
        .join("|")
}
