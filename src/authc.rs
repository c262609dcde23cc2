//! Authentication tokens and verified identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Credential;

/// Credentials extracted from a request, not yet verified.
///
/// Produced by [`extract_authentication_token`] and consumed by
/// `do_authenticate`.
///
/// [`extract_authentication_token`]: crate::AuthScheme::extract_authentication_token
#[derive(Debug, Default)]
pub struct AuthenticationToken {
    /// Kind of the scheme that extracted the token (`form`, `basic`, ...)
    pub scheme: String,
    /// Claimed identity (username, client id); empty for opaque tokens
    pub identity: String,
    /// Submitted secret (password or bearer token)
    pub credential: Credential,
}

impl AuthenticationToken {
    /// Creates a token for the given scheme kind.
    pub fn new(
        scheme: impl Into<String>,
        identity: impl Into<String>,
        credential: impl Into<Credential>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            identity: identity.into(),
            credential: credential.into(),
        }
    }
}

/// One identifying attribute of an authenticated subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Realm or scheme name that produced the principal
    pub realm: String,
    /// Attribute name, e.g. `username` or `email`
    pub claim: String,
    /// Attribute value
    pub value: String,
    /// Marks the principal that identifies the subject
    #[serde(default)]
    pub is_primary: bool,
}

impl Principal {
    /// Creates a non-primary principal.
    pub fn new(
        realm: impl Into<String>,
        claim: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            realm: realm.into(),
            claim: claim.into(),
            value: value.into(),
            is_primary: false,
        }
    }

    /// Marks this principal as primary.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.realm, self.claim, self.value)
    }
}

/// Verified identity of a subject.
///
/// The `credential` holds the stored secret (typically a password hash) that
/// an authenticator returns for comparison. It MUST be scrubbed before the
/// info is written into a session; [`cacheable`](Self::cacheable) produces the
/// scrubbed copy the dispatcher persists.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuthenticationInfo {
    /// Identifying attributes of the subject
    pub principals: Vec<Principal>,
    /// Stored secret material; empty once scrubbed
    #[serde(default)]
    pub credential: Credential,
    /// Account locked by the identity backend
    #[serde(default)]
    pub is_locked: bool,
    /// Account or credential expired
    #[serde(default)]
    pub is_expired: bool,
}

impl AuthenticationInfo {
    /// Creates an info with a single primary principal.
    pub fn new(principal: Principal, credential: impl Into<Credential>) -> Self {
        Self {
            principals: vec![principal.primary()],
            credential: credential.into(),
            is_locked: false,
            is_expired: false,
        }
    }

    /// Returns the primary principal, falling back to the first one.
    pub fn primary_principal(&self) -> Option<&Principal> {
        self.principals
            .iter()
            .find(|p| p.is_primary)
            .or_else(|| self.principals.first())
    }

    /// Zeroes and clears the credential.
    pub fn scrub_credential(&mut self) {
        self.credential.scrub();
    }

    /// Returns a copy with an empty credential, safe to persist.
    pub fn cacheable(&self) -> Self {
        Self {
            principals: self.principals.clone(),
            credential: Credential::empty(),
            is_locked: self.is_locked,
            is_expired: self.is_expired,
        }
    }
}

impl fmt::Display for AuthenticationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthenticationInfo[principals=")?;
        for (i, p) in self.principals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(
            f,
            ", locked={}, expired={}]",
            self.is_locked, self.is_expired
        )
    }
}
