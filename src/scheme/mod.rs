//! Authentication schemes.
//!
//! A scheme extracts an [`AuthenticationToken`] from a request, verifies it
//! through an [`Authenticator`], and derives an [`AuthorizationInfo`] through
//! an [`Authorizer`]. The verification backends are pluggable; this module
//! owns only the flow around them.
//!
//! Schemes are resolved once per request into a [`Scheme`]. The variant
//! decides which dispatch flow runs: `Form` owns a navigation flow with
//! redirects, `Stateless` authenticates every call on its own.

mod basic;
mod form;
mod token;

use std::sync::Arc;

use crate::authc::{AuthenticationInfo, AuthenticationToken};
use crate::authz::AuthorizationInfo;
use crate::error::{Error, Result};
use crate::request::Request;

pub use basic::BasicAuth;
pub use form::FormAuth;
pub use token::TokenAuth;

/// Looks up the stored identity for a token.
///
/// Implementations typically query a user database or token service and may
/// block. Return `Ok(None)` when the subject is unknown; reserve `Err` for
/// backend failures, which are surfaced separately from failed logins.
pub trait Authenticator: Send + Sync {
    /// Returns the stored identity (including the stored credential).
    fn authentication_info(&self, token: &AuthenticationToken)
        -> Result<Option<AuthenticationInfo>>;
}

/// Resolves roles and permissions for an authenticated identity.
pub trait Authorizer: Send + Sync {
    /// Returns the authorization info for `info`.
    fn authorization_info(&self, info: &AuthenticationInfo) -> AuthorizationInfo;
}

/// Compares a stored credential hash against a submitted password.
///
/// No hashing algorithm is provided by this crate.
pub trait PasswordEncoder: Send + Sync {
    /// Returns true if `password` matches `hash`.
    fn compare(&self, hash: &[u8], password: &[u8]) -> bool;
}

/// Capability shared by every scheme variant.
pub trait AuthScheme: Send + Sync {
    /// Configured name of this scheme (the route `auth` value).
    fn name(&self) -> &str;

    /// Scheme kind discriminator, e.g. `form`, `basic`, `token`.
    fn kind(&self) -> &str;

    /// Extracts the submitted credentials from the request.
    fn extract_authentication_token(&self, req: &Request) -> AuthenticationToken;

    /// Verifies the token.
    ///
    /// # Errors
    ///
    /// [`Error::AuthenticationFailed`] when the credentials are invalid, and
    /// only then. Backend failures use other variants.
    fn do_authenticate(&self, token: &AuthenticationToken) -> Result<AuthenticationInfo>;

    /// Derives authorization info for a verified identity.
    fn do_authorization_info(&self, info: &AuthenticationInfo) -> AuthorizationInfo;

    /// `WWW-Authenticate` value sent with an unauthorized response, if this
    /// is a challenge scheme.
    fn challenge(&self) -> Option<String> {
        None
    }
}

/// A resolved scheme, tagged by the dispatch flow it requires.
pub enum Scheme {
    /// Stateful form login with redirects
    Form(FormAuth),
    /// Per-call challenge/response or token scheme
    Stateless(Box<dyn AuthScheme>),
}

impl Scheme {
    /// Wraps a stateless scheme.
    pub fn stateless(scheme: impl AuthScheme + 'static) -> Self {
        Scheme::Stateless(Box::new(scheme))
    }

    /// Common capability view of the scheme.
    pub fn as_auth_scheme(&self) -> &dyn AuthScheme {
        match self {
            Scheme::Form(form) => form as &dyn AuthScheme,
            Scheme::Stateless(scheme) => scheme.as_ref(),
        }
    }

    /// Scheme kind discriminator.
    pub fn kind(&self) -> &str {
        self.as_auth_scheme().kind()
    }

    /// Configured scheme name.
    pub fn name(&self) -> &str {
        self.as_auth_scheme().name()
    }
}

impl From<FormAuth> for Scheme {
    fn from(form: FormAuth) -> Self {
        Scheme::Form(form)
    }
}

impl From<BasicAuth> for Scheme {
    fn from(basic: BasicAuth) -> Self {
        Scheme::stateless(basic)
    }
}

impl From<TokenAuth> for Scheme {
    fn from(token: TokenAuth) -> Self {
        Scheme::stateless(token)
    }
}

/// Backends shared by the built-in schemes.
#[derive(Clone)]
pub(crate) struct Backends {
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
}

impl Backends {
    /// Looks up the subject and rejects locked or expired accounts.
    pub(crate) fn lookup(&self, token: &AuthenticationToken) -> Result<AuthenticationInfo> {
        let Some(info) = self.authenticator.authentication_info(token)? else {
            tracing::debug!(scheme = %token.scheme, "subject not found");
            return Err(Error::AuthenticationFailed);
        };
        if info.is_locked || info.is_expired {
            tracing::debug!(scheme = %token.scheme, "subject locked or expired");
            return Err(Error::AuthenticationFailed);
        }
        Ok(info)
    }

    /// Looks up the subject and compares the submitted password.
    pub(crate) fn verify_password(
        &self,
        encoder: &dyn PasswordEncoder,
        token: &AuthenticationToken,
    ) -> Result<AuthenticationInfo> {
        if token.identity.is_empty() || token.credential.is_empty() {
            return Err(Error::AuthenticationFailed);
        }
        let info = self.lookup(token)?;
        if !encoder.compare(info.credential.expose_secret(), token.credential.expose_secret()) {
            return Err(Error::AuthenticationFailed);
        }
        Ok(info)
    }
}
