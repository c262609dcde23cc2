//! Matched route descriptor.

use http::Method;

/// Auth policy value that disables authentication for a route.
pub const ANONYMOUS: &str = "anonymous";

/// The route the router matched for a request.
///
/// Route matching happens elsewhere; the dispatcher only reads the path,
/// method and auth policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Route path pattern, e.g. `/login`
    pub path: String,
    /// HTTP verb the route is bound to
    pub method: Method,
    /// Auth scheme name, or [`ANONYMOUS`]
    pub auth: String,
}

impl Route {
    /// Creates a route with the given auth policy.
    pub fn new(method: Method, path: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            auth: auth.into(),
        }
    }

    /// Creates a route that requires no authentication.
    pub fn anonymous(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, ANONYMOUS)
    }

    /// Returns true if the route opts out of authentication.
    pub fn is_anonymous(&self) -> bool {
        self.auth == ANONYMOUS
    }
}
