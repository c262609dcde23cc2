//! Event schema.

use std::fmt;

/// Point in the authentication flow an event was published at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    /// Before credentials are verified
    PreAuth,
    /// After the subject was authenticated
    PostAuth,
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthEventKind::PreAuth => write!(f, "pre_auth"),
            AuthEventKind::PostAuth => write!(f, "post_auth"),
        }
    }
}

/// An authentication event containing only safe, non-sensitive metadata.
///
/// # Safety Invariants
///
/// - No credentials or tokens
/// - No request bodies or form values
/// - The path is the route path, without the query string
///
/// # Example
///
/// ```
/// use route_auth::events::{AuthEvent, AuthEventKind};
///
/// let event = AuthEvent::new("req-123", AuthEventKind::PostAuth)
///     .with_route("POST", "/login")
///     .with_scheme("form_auth")
///     .with_principal("alice");
///
/// assert_eq!(event.request_id(), "req-123");
/// assert_eq!(event.principal(), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    request_id: String,
    kind: AuthEventKind,
    method: Option<String>,
    path: Option<String>,
    scheme: Option<String>,
    /// Only set on post-auth events
    principal: Option<String>,
}

impl AuthEvent {
    /// Creates an event with the required fields.
    pub fn new(request_id: impl Into<String>, kind: AuthEventKind) -> Self {
        Self {
            request_id: request_id.into(),
            kind,
            method: None,
            path: None,
            scheme: None,
            principal: None,
        }
    }

    /// Sets the matched route method and path.
    pub fn with_route(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.path = Some(path.into());
        self
    }

    /// Sets the auth scheme name.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Sets the authenticated principal.
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the event kind.
    pub fn kind(&self) -> AuthEventKind {
        self.kind
    }

    /// Returns the route method, if set.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns the route path, if set.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the scheme name, if set.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Returns the principal, if authenticated.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuthEvent[kind={}, request_id={}, principal={}",
            self.kind,
            self.request_id,
            self.principal.as_deref().unwrap_or("<none>")
        )?;
        if let Some(scheme) = &self.scheme {
            write!(f, ", scheme={}", scheme)?;
        }
        if let (Some(method), Some(path)) = (&self.method, &self.path) {
            write!(f, ", route={} {}", method, path)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(AuthEventKind::PreAuth.to_string(), "pre_auth");
        assert_eq!(AuthEventKind::PostAuth.to_string(), "post_auth");
    }

    #[test]
    fn builder_sets_fields() {
        let event = AuthEvent::new("req-1", AuthEventKind::PreAuth)
            .with_route("GET", "/api/items")
            .with_scheme("api_basic");

        assert_eq!(event.kind(), AuthEventKind::PreAuth);
        assert_eq!(event.method(), Some("GET"));
        assert_eq!(event.path(), Some("/api/items"));
        assert_eq!(event.scheme(), Some("api_basic"));
        assert!(event.principal().is_none());
    }

    #[test]
    fn display_without_principal() {
        let event = AuthEvent::new("req-anon", AuthEventKind::PreAuth).with_route("POST", "/login");
        let display = event.to_string();
        assert!(display.contains("<none>"));
        assert!(display.contains("route=POST /login"));
    }
}
