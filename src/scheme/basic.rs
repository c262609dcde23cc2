use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::AUTHORIZATION;

use super::{AuthScheme, Authenticator, Authorizer, Backends, PasswordEncoder};
use crate::authc::{AuthenticationInfo, AuthenticationToken};
use crate::authz::AuthorizationInfo;
use crate::error::Result;
use crate::request::Request;

/// Kind discriminator of [`BasicAuth`].
pub const KIND: &str = "basic";

const PREFIX: &str = "Basic ";

/// HTTP Basic authentication (RFC 7617).
pub struct BasicAuth {
    name: String,
    /// Realm advertised in the `WWW-Authenticate` challenge
    pub realm_name: String,
    backends: Backends,
    password_encoder: Arc<dyn PasswordEncoder>,
}

impl BasicAuth {
    /// Creates a basic scheme with the default realm.
    pub fn new(
        name: impl Into<String>,
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn Authorizer>,
        password_encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        Self {
            name: name.into(),
            realm_name: "Authentication Required".to_string(),
            backends: Backends {
                authenticator,
                authorizer,
            },
            password_encoder,
        }
    }

    /// Sets the realm name.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm_name = realm.into();
        self
    }

    /// Decodes `Basic base64(user:password)`.
    fn decode(header: &str) -> Option<(String, String)> {
        let header = header.trim();
        if !header.get(..PREFIX.len())?.eq_ignore_ascii_case(PREFIX) {
            return None;
        }
        let decoded = STANDARD.decode(header[PREFIX.len()..].trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl AuthScheme for BasicAuth {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        KIND
    }

    /// A missing or malformed header yields an empty token, which fails
    /// authentication.
    fn extract_authentication_token(&self, req: &Request) -> AuthenticationToken {
        let decoded = req
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::decode);
        match decoded {
            Some((user, password)) => AuthenticationToken::new(KIND, user, password),
            None => AuthenticationToken::new(KIND, "", ""),
        }
    }

    fn do_authenticate(&self, token: &AuthenticationToken) -> Result<AuthenticationInfo> {
        self.backends
            .verify_password(self.password_encoder.as_ref(), token)
    }

    fn do_authorization_info(&self, info: &AuthenticationInfo) -> AuthorizationInfo {
        self.backends.authorizer.authorization_info(info)
    }

    fn challenge(&self) -> Option<String> {
        Some(format!(r#"Basic realm="{}""#, self.realm_name))
    }
}
