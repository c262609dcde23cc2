//! Security configuration.
//!
//! ```toml
//! [session]
//! store_type = "memory"
//!
//! [auth_schemes.form_auth]
//! scheme = "form"
//! authenticator = "users"
//! authorizer = "users"
//! password_encoder = "bcrypt"
//! ```
//!
//! Scheme entries name their backends; the backends themselves are code and
//! are handed to [`SecurityManager::from_config`](crate::SecurityManager::from_config)
//! through [`Components`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::scheme::{Authenticator, Authorizer, PasswordEncoder};
use crate::session::{SameSite, SessionOptions, MEMORY_STORE};

/// Root of the security configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecurityConfig {
    /// Session cookie and store settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Auth schemes keyed by the name routes refer to
    #[serde(default)]
    pub auth_schemes: BTreeMap<String, SchemeConfig>,
}

impl SecurityConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it
    /// cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] on malformed TOML, a missing field or an unknown
    /// scheme kind.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Name of a store registered in the [`StoreRegistry`](crate::StoreRegistry)
    #[serde(default = "default_store_type")]
    pub store_type: String,
    /// Session cookie name
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Cookie path
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Cookie domain
    #[serde(default)]
    pub domain: Option<String>,
    /// `HttpOnly` attribute
    #[serde(default = "default_true")]
    pub http_only: bool,
    /// `Secure` attribute
    #[serde(default)]
    pub secure: bool,
    /// `Max-Age` in seconds; 0 makes it a browser-session cookie
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// `SameSite` attribute
    #[serde(default)]
    pub same_site: SameSite,
}

impl SessionConfig {
    /// Cookie options for the session manager.
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            cookie_name: self.cookie_name.clone(),
            path: self.path.clone(),
            domain: self.domain.clone(),
            http_only: self.http_only,
            secure: self.secure,
            max_age: (self.max_age_secs > 0).then(|| Duration::from_secs(self.max_age_secs)),
            same_site: self.same_site,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_type: default_store_type(),
            cookie_name: default_cookie_name(),
            path: default_cookie_path(),
            domain: None,
            http_only: true,
            secure: false,
            max_age_secs: default_max_age_secs(),
            same_site: SameSite::default(),
        }
    }
}

/// One `[auth_schemes.<name>]` entry, tagged by its `scheme` kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum SchemeConfig {
    /// `scheme = "form"`
    Form(FormConfig),
    /// `scheme = "basic"`
    Basic(BasicConfig),
    /// `scheme = "token"`
    Token(TokenConfig),
}

/// Form scheme settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormConfig {
    /// Authenticator component name
    pub authenticator: String,
    /// Authorizer component name
    pub authorizer: String,
    /// Password encoder component name
    pub password_encoder: String,
    /// Login page
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Path the login form posts to
    #[serde(default = "default_login_submit_url")]
    pub login_submit_url: String,
    /// Destination after a failed login
    #[serde(default = "default_login_failure_url")]
    pub login_failure_url: String,
    /// Destination after login without `_rt`
    #[serde(default = "default_target_url")]
    pub default_target_url: String,
    /// Ignore `_rt` after login
    #[serde(default)]
    pub always_redirect_to_default_target: bool,
    /// Identity form field
    #[serde(default = "default_field_identity")]
    pub field_identity: String,
    /// Password form field
    #[serde(default = "default_field_credential")]
    pub field_credential: String,
}

/// Basic scheme settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BasicConfig {
    /// Authenticator component name
    pub authenticator: String,
    /// Authorizer component name
    pub authorizer: String,
    /// Password encoder component name
    pub password_encoder: String,
    /// Challenge realm
    #[serde(default = "default_realm_name")]
    pub realm_name: String,
}

/// Token scheme settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenConfig {
    /// Authenticator component name
    pub authenticator: String,
    /// Authorizer component name
    pub authorizer: String,
    /// Header carrying the token
    #[serde(default = "default_token_header")]
    pub header_name: String,
    /// Prefix in front of the token; empty for none
    #[serde(default = "default_token_prefix")]
    pub prefix: String,
}

/// Named backends that scheme entries refer to.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use route_auth::{Authenticator, Authorizer, Components, PasswordEncoder};
/// # fn build(
/// #     users: Arc<dyn Authenticator>,
/// #     roles: Arc<dyn Authorizer>,
/// #     bcrypt: Arc<dyn PasswordEncoder>,
/// # ) {
/// let components = Components::new()
///     .with_authenticator("users", users)
///     .with_authorizer("users", roles)
///     .with_password_encoder("bcrypt", bcrypt);
/// # }
/// ```
#[derive(Default, Clone)]
pub struct Components {
    authenticators: HashMap<String, Arc<dyn Authenticator>>,
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    password_encoders: HashMap<String, Arc<dyn PasswordEncoder>>,
}

impl Components {
    /// Creates an empty component set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authenticator.
    pub fn with_authenticator(
        mut self,
        name: impl Into<String>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        self.authenticators.insert(name.into(), authenticator);
        self
    }

    /// Registers an authorizer.
    pub fn with_authorizer(
        mut self,
        name: impl Into<String>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        self.authorizers.insert(name.into(), authorizer);
        self
    }

    /// Registers a password encoder.
    pub fn with_password_encoder(
        mut self,
        name: impl Into<String>,
        encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        self.password_encoders.insert(name.into(), encoder);
        self
    }

    pub(crate) fn authenticator(&self, name: &str) -> Result<Arc<dyn Authenticator>> {
        lookup(&self.authenticators, "authenticator", name)
    }

    pub(crate) fn authorizer(&self, name: &str) -> Result<Arc<dyn Authorizer>> {
        lookup(&self.authorizers, "authorizer", name)
    }

    pub(crate) fn password_encoder(&self, name: &str) -> Result<Arc<dyn PasswordEncoder>> {
        lookup(&self.password_encoders, "password encoder", name)
    }
}

fn lookup<T: ?Sized>(map: &HashMap<String, Arc<T>>, what: &str, name: &str) -> Result<Arc<T>> {
    map.get(name)
        .cloned()
        .ok_or_else(|| Error::Config(format!("unknown {}: {}", what, name)))
}

fn default_store_type() -> String {
    MEMORY_STORE.to_string()
}

fn default_cookie_name() -> String {
    "aah_session".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_age_secs() -> u64 {
    30 * 60
}

fn default_login_url() -> String {
    "/login.html".to_string()
}

fn default_login_submit_url() -> String {
    "/login".to_string()
}

fn default_login_failure_url() -> String {
    "/login.html?error=true".to_string()
}

fn default_target_url() -> String {
    "/".to_string()
}

fn default_field_identity() -> String {
    "username".to_string()
}

fn default_field_credential() -> String {
    "password".to_string()
}

fn default_realm_name() -> String {
    "Authentication Required".to_string()
}

fn default_token_header() -> String {
    "authorization".to_string()
}

fn default_token_prefix() -> String {
    "Bearer".to_string()
}
