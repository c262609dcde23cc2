use std::sync::Arc;

use super::{AuthScheme, Authenticator, Authorizer, Backends, PasswordEncoder};
use crate::authc::{AuthenticationInfo, AuthenticationToken};
use crate::authz::AuthorizationInfo;
use crate::error::Result;
use crate::request::Request;

/// Kind discriminator of [`FormAuth`].
pub const KIND: &str = "form";

/// Stateful form login.
///
/// Unauthenticated requests are redirected to `login_url`; the login form
/// posts to `login_submit_url`. Successful logins land on the submitted
/// `_rt` target or on `default_target_url`.
pub struct FormAuth {
    name: String,
    /// Login page
    pub login_url: String,
    /// Route path the login form posts to
    pub login_submit_url: String,
    /// Where failed logins are sent; `&_rt=` is appended to it
    pub login_failure_url: String,
    /// Landing page after login when no `_rt` was submitted
    pub default_target_url: String,
    /// Ignore `_rt` and always land on `default_target_url`
    pub always_redirect_to_default_target: bool,
    /// Form field carrying the identity
    pub field_identity: String,
    /// Form field carrying the password
    pub field_credential: String,
    backends: Backends,
    password_encoder: Arc<dyn PasswordEncoder>,
}

impl FormAuth {
    /// Creates a form scheme with default URLs and field names.
    pub fn new(
        name: impl Into<String>,
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn Authorizer>,
        password_encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        Self {
            name: name.into(),
            login_url: "/login.html".to_string(),
            login_submit_url: "/login".to_string(),
            login_failure_url: "/login.html?error=true".to_string(),
            default_target_url: "/".to_string(),
            always_redirect_to_default_target: false,
            field_identity: "username".to_string(),
            field_credential: "password".to_string(),
            backends: Backends {
                authenticator,
                authorizer,
            },
            password_encoder,
        }
    }
}

impl AuthScheme for FormAuth {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        KIND
    }

    fn extract_authentication_token(&self, req: &Request) -> AuthenticationToken {
        AuthenticationToken::new(
            KIND,
            req.form_value(&self.field_identity).unwrap_or_default(),
            req.form_value(&self.field_credential).unwrap_or_default(),
        )
    }

    fn do_authenticate(&self, token: &AuthenticationToken) -> Result<AuthenticationInfo> {
        self.backends
            .verify_password(self.password_encoder.as_ref(), token)
    }

    fn do_authorization_info(&self, info: &AuthenticationInfo) -> AuthorizationInfo {
        self.backends.authorizer.authorization_info(info)
    }
}
