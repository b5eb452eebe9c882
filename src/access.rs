//! Access resolution
//!
//! Maps a person's access specification to the set of server identifiers
//! they may reach. Group expansion is single-level: an entry that names a
//! group unions in that group's members, anything else is carried as a
//! literal server identifier. Unknown names are not an error in normal
//! operation; [`unknown_targets`] surfaces them for `fleetkey check`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, Person};

/// Per-person access specification.
///
/// The document accepts either a flat list of target names or a split form
/// with separate `servers` and `groups` lists. The split is cosmetic for the
/// author; both forms normalize to one entry list before expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessSpec {
    /// Flat list of target names (servers or groups, mixed)
    Flat(Vec<String>),
    /// Servers and groups written out separately
    Split {
        /// Explicit server identifiers
        #[serde(default)]
        servers: Vec<String>,
        /// Group names to expand
        #[serde(default)]
        groups: Vec<String>,
    },
}

impl Default for AccessSpec {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

impl AccessSpec {
    /// Entries to expand, in declaration order (servers before groups for
    /// the split form)
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        let (flat, servers, groups) = match self {
            Self::Flat(items) => (Some(items), None, None),
            Self::Split { servers, groups } => (None, Some(servers), Some(groups)),
        };
        flat.into_iter()
            .flatten()
            .chain(servers.into_iter().flatten())
            .chain(groups.into_iter().flatten())
            .map(String::as_str)
    }
}

/// Resolve an access specification to the set of reachable server identifiers.
///
/// Each entry is looked up in the group mapping: a match unions in the
/// group's members, a miss unions in the entry itself as a literal server
/// identifier. Duplicates collapse; the result is order-independent.
#[must_use]
pub fn resolve_access(access: &AccessSpec, groups: &[(String, Vec<String>)]) -> BTreeSet<String> {
    let mut targets = BTreeSet::new();
    for entry in access.entries() {
        match groups.iter().find(|(name, _)| name == entry) {
            Some((name, members)) => {
                debug!(group = %name, members = members.len(), "expanding group");
                targets.extend(members.iter().cloned());
            }
            None => {
                targets.insert(entry.to_string());
            }
        }
    }
    targets
}

/// Whether a person may log in to a server.
///
/// True iff the person is enabled and the server is in their resolved
/// access set. The deployment identity is handled separately and is never
/// subject to this check.
#[must_use]
pub fn is_authorized(person: &Person, server_id: &str, groups: &[(String, Vec<String>)]) -> bool {
    person.enabled && resolve_access(&person.access, groups).contains(server_id)
}

/// A reference in an access specification or group that resolves to nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTarget {
    /// Person or group the dangling reference was found in
    pub owner: String,
    /// The entry that names neither a known group nor a known server
    pub entry: String,
}

impl std::fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: \"{}\" names neither a known group nor a known server",
            self.owner, self.entry
        )
    }
}

/// Strict validation pass behind `fleetkey check`.
///
/// Normal generation deliberately lets unknown names degrade to inert
/// literals, so a typo becomes a silent no-op grant. This pass reports every
/// access entry and every group member that matches nothing, without
/// changing generation semantics.
#[must_use]
pub fn unknown_targets(config: &Config) -> Vec<UnknownTarget> {
    let known_server = |id: &str| config.servers.iter().any(|(name, _)| name == id);
    let known_group = |id: &str| config.groups.iter().any(|(name, _)| name == id);

    let mut findings = Vec::new();
    for (name, person) in &config.people {
        for entry in person.access.entries() {
            if !known_group(entry) && !known_server(entry) {
                findings.push(UnknownTarget {
                    owner: format!("person {name}"),
                    entry: entry.to_string(),
                });
            }
        }
    }
    // Group members expand as literal server ids, never as nested groups
    for (name, members) in &config.groups {
        for member in members {
            if !known_server(member) {
                findings.push(UnknownTarget {
                    owner: format!("group {name}"),
                    entry: member.clone(),
                });
            }
        }
    }
    findings
}
