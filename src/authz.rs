//! Roles and wildcard permissions resolved for an authenticated subject.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

const WILDCARD: &str = "*";
const PART_DIVIDER: char = ':';
const SUBPART_DIVIDER: char = ',';

/// A wildcard permission such as `newsletter:read,write:*`.
///
/// A permission is a colon-separated list of parts; each part is a
/// comma-separated set of sub-parts. `*` matches any sub-part. When a granted
/// permission has fewer parts than the one being checked, the missing
/// trailing parts are implied to be `*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    parts: Vec<BTreeSet<String>>,
}

impl Permission {
    /// Parses a permission string. Parts are case-insensitive.
    ///
    /// Returns `None` for an empty string or one that contains an empty part.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        for part in value.split(PART_DIVIDER) {
            let subparts: BTreeSet<String> = part
                .split(SUBPART_DIVIDER)
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if subparts.is_empty() {
                return None;
            }
            parts.push(subparts);
        }

        Some(Self { parts })
    }

    /// Returns true if this (granted) permission implies `other`.
    pub fn implies(&self, other: &Permission) -> bool {
        for (i, other_part) in other.parts.iter().enumerate() {
            match self.parts.get(i) {
                // Granted permission is shorter: remaining parts are implied.
                None => return true,
                Some(part) => {
                    if !part.contains(WILDCARD) && !other_part.is_subset(part) {
                        return false;
                    }
                }
            }
        }

        // Extra granted parts must all be wildcards.
        self.parts
            .iter()
            .skip(other.parts.len())
            .all(|part| part.contains(WILDCARD))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .parts
            .iter()
            .map(|p| p.iter().cloned().collect::<Vec<_>>().join(","))
            .collect();
        f.write_str(&rendered.join(":"))
    }
}

/// Roles and permissions for a principal.
///
/// Recomputed from [`AuthenticationInfo`](crate::AuthenticationInfo) by the
/// scheme's authorizer on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationInfo {
    roles: BTreeSet<String>,
    permissions: BTreeSet<Permission>,
}

impl AuthorizationInfo {
    /// Creates an empty authorization info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds roles.
    pub fn add_role<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Adds permissions from their string form; unparsable entries are skipped.
    pub fn add_permission_str<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for p in permissions {
            match Permission::parse(p.as_ref()) {
                Some(perm) => {
                    self.permissions.insert(perm);
                }
                None => tracing::warn!(permission = p.as_ref(), "skipping invalid permission"),
            }
        }
        self
    }

    /// Returns the granted roles.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Returns the granted permissions.
    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// Returns true if the role is granted.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if any of the roles is granted.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }

    /// Returns true if all of the roles are granted.
    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        roles.iter().all(|r| self.has_role(r))
    }

    /// Returns true if any granted permission implies `permission`.
    pub fn is_permitted(&self, permission: &str) -> bool {
        match Permission::parse(permission) {
            Some(wanted) => self.permissions.iter().any(|p| p.implies(&wanted)),
            None => false,
        }
    }

    /// Returns true if every permission is implied.
    pub fn is_permitted_all(&self, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| self.is_permitted(p))
    }
}
