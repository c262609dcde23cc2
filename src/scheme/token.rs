use std::sync::Arc;

use http::header::{HeaderName, AUTHORIZATION};

use super::{AuthScheme, Authenticator, Authorizer, Backends};
use crate::authc::{AuthenticationInfo, AuthenticationToken};
use crate::authz::AuthorizationInfo;
use crate::error::{Error, Result};
use crate::request::Request;

/// Kind discriminator of [`TokenAuth`].
pub const KIND: &str = "token";

/// Opaque bearer-token authentication.
///
/// The token is read from `header_name` after stripping `prefix`, and handed
/// to the authenticator as the credential; there is no password comparison.
/// A locked or expired subject fails like an unknown token.
pub struct TokenAuth {
    name: String,
    /// Header carrying the token
    pub header_name: HeaderName,
    /// Scheme prefix in front of the token, matched case-insensitively
    pub prefix: String,
    backends: Backends,
}

impl TokenAuth {
    /// Creates a token scheme reading `Authorization: Bearer <token>`.
    pub fn new(
        name: impl Into<String>,
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            name: name.into(),
            header_name: AUTHORIZATION,
            prefix: "Bearer".to_string(),
            backends: Backends {
                authenticator,
                authorizer,
            },
        }
    }

    /// Reads the token from a different header.
    pub fn with_header(mut self, header_name: HeaderName, prefix: impl Into<String>) -> Self {
        self.header_name = header_name;
        self.prefix = prefix.into();
        self
    }

    fn strip_prefix<'a>(&self, value: &'a str) -> Option<&'a str> {
        let value = value.trim();
        if self.prefix.is_empty() {
            return Some(value);
        }
        let head = value.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        let rest = &value[self.prefix.len()..];
        // Require a separator between prefix and token.
        rest.starts_with(' ').then(|| rest.trim())
    }
}

impl AuthScheme for TokenAuth {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        KIND
    }

    fn extract_authentication_token(&self, req: &Request) -> AuthenticationToken {
        let token = req
            .headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| self.strip_prefix(v))
            .unwrap_or_default();
        AuthenticationToken::new(KIND, "", token)
    }

    fn do_authenticate(&self, token: &AuthenticationToken) -> Result<AuthenticationInfo> {
        if token.credential.is_empty() {
            return Err(Error::AuthenticationFailed);
        }
        self.backends.lookup(token)
    }

    fn do_authorization_info(&self, info: &AuthenticationInfo) -> AuthorizationInfo {
        self.backends.authorizer.authorization_info(info)
    }
}
