//! Per-request identity.

use crate::authc::{AuthenticationInfo, Principal};
use crate::authz::AuthorizationInfo;
use crate::session::Session;

/// The identity a request acts as.
///
/// A `Subject` is created fresh for every request and never reused. It owns
/// the request's [`Session`] until the context is torn down, and holds at
/// most one authentication/authorization pair.
///
/// # Example
///
/// ```
/// use route_auth::{Session, Subject};
///
/// let subject = Subject::new(Session::new());
/// assert!(!subject.is_authenticated());
/// assert!(!subject.has_role("admin"));
/// ```
#[derive(Debug)]
pub struct Subject {
    /// Verified identity, once authenticated or restored from the session
    pub authentication_info: Option<AuthenticationInfo>,
    /// Roles and permissions derived from `authentication_info`
    pub authorization_info: Option<AuthorizationInfo>,
    session: Session,
}

impl Subject {
    /// Creates an anonymous subject bound to `session`.
    pub fn new(session: Session) -> Self {
        Self {
            authentication_info: None,
            authorization_info: None,
            session,
        }
    }

    /// Session owned by the current request.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session owned by the current request.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Returns the session flag; the session is the source of truth.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated
    }

    /// Primary principal of the authenticated identity.
    pub fn primary_principal(&self) -> Option<&Principal> {
        self.authentication_info
            .as_ref()
            .and_then(AuthenticationInfo::primary_principal)
    }

    /// All principals of the authenticated identity.
    pub fn all_principals(&self) -> &[Principal] {
        self.authentication_info
            .as_ref()
            .map(|info| info.principals.as_slice())
            .unwrap_or_default()
    }

    /// Returns true if the subject holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.authz(|a| a.has_role(role))
    }

    /// Returns true if the subject holds any of `roles`.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.authz(|a| a.has_any_role(roles))
    }

    /// Returns true if the subject holds all of `roles`.
    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        self.authz(|a| a.has_all_roles(roles))
    }

    /// Returns true if the subject is permitted `permission`.
    pub fn is_permitted(&self, permission: &str) -> bool {
        self.authz(|a| a.is_permitted(permission))
    }

    /// Returns true if the subject is permitted every one of `permissions`.
    pub fn is_permitted_all(&self, permissions: &[&str]) -> bool {
        self.authz(|a| a.is_permitted_all(permissions))
    }

    /// Drops the identity and clears the session, including the
    /// authenticated flag.
    pub fn logout(&mut self) {
        self.authentication_info = None;
        self.authorization_info = None;
        self.session.clear();
    }

    /// Gives the session back, consuming the subject.
    pub fn into_session(self) -> Session {
        self.session
    }

    fn authz(&self, check: impl FnOnce(&AuthorizationInfo) -> bool) -> bool {
        self.authorization_info.as_ref().is_some_and(check)
    }
}
