//! Application security manager.

use std::collections::HashMap;
use std::fmt;

use http::header::HeaderName;

use crate::config::{Components, SchemeConfig, SecurityConfig};
use crate::error::{Error, Result};
use crate::events::EventHooks;
use crate::route::Route;
use crate::scheme::{BasicAuth, FormAuth, Scheme, TokenAuth};
use crate::session::{SessionManager, StoreRegistry};

/// Holds the configured auth schemes, the session manager and the event
/// hooks.
///
/// Built once at startup and shared read-only (typically as
/// `Arc<SecurityManager>`) by every request. There is no global instance;
/// whoever builds request contexts is handed the manager explicitly.
///
/// # Example
///
/// ```
/// use route_auth::{SecurityManager, SessionManager};
///
/// let manager = SecurityManager::new(SessionManager::in_memory());
/// assert!(manager.get_auth_scheme("form_auth").is_none());
/// ```
pub struct SecurityManager {
    schemes: HashMap<String, Scheme>,
    session_manager: SessionManager,
    hooks: EventHooks,
}

impl SecurityManager {
    /// Creates a manager with no schemes and no hooks.
    pub fn new(session_manager: SessionManager) -> Self {
        Self {
            schemes: HashMap::new(),
            session_manager,
            hooks: EventHooks::new(),
        }
    }

    /// Builds a manager from configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the session store type is not registered or a
    /// scheme names an unknown component or header.
    pub fn from_config(
        cfg: &SecurityConfig,
        components: &Components,
        stores: &StoreRegistry,
    ) -> Result<Self> {
        let store = stores.get(&cfg.session.store_type).ok_or_else(|| {
            Error::Config(format!("unknown session store: {}", cfg.session.store_type))
        })?;
        let mut manager = Self::new(SessionManager::new(store, cfg.session.options()));

        for (name, scheme_cfg) in &cfg.auth_schemes {
            let scheme = build_scheme(name, scheme_cfg, components)?;
            manager.add_auth_scheme(scheme)?;
        }

        tracing::info!(
            schemes = manager.schemes.len(),
            store = %cfg.session.store_type,
            "security manager initialized"
        );
        Ok(manager)
    }

    /// Registers a scheme under its name.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the name is taken.
    pub fn add_auth_scheme(&mut self, scheme: impl Into<Scheme>) -> Result<()> {
        let scheme = scheme.into();
        let name = scheme.name().to_string();
        if self.schemes.contains_key(&name) {
            return Err(Error::Config(format!("auth scheme already exists: {}", name)));
        }
        self.schemes.insert(name, scheme);
        Ok(())
    }

    /// Resolves a route's auth policy name.
    pub fn get_auth_scheme(&self, name: &str) -> Option<&Scheme> {
        self.schemes.get(name)
    }

    /// Resolves a scheme name that must exist, e.g. when validating a route
    /// table at startup.
    ///
    /// # Errors
    ///
    /// [`Error::SchemeUnresolved`] if no scheme has that name.
    pub fn require_auth_scheme(&self, name: &str) -> Result<&Scheme> {
        self.get_auth_scheme(name)
            .ok_or_else(|| Error::SchemeUnresolved(name.to_string()))
    }

    /// Returns true if `route` is the login-submit route of its form scheme.
    pub fn is_form_auth_login_route(&self, route: &Route) -> bool {
        match self.get_auth_scheme(&route.auth) {
            Some(Scheme::Form(form)) => form.login_submit_url == route.path,
            _ => false,
        }
    }

    /// Session manager.
    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    /// Mutable session manager, e.g. to force secure cookies under TLS.
    pub fn session_manager_mut(&mut self) -> &mut SessionManager {
        &mut self.session_manager
    }

    /// Event hooks.
    pub fn hooks(&self) -> &EventHooks {
        &self.hooks
    }

    /// Mutable event hooks, for registering subscribers at startup.
    pub fn hooks_mut(&mut self) -> &mut EventHooks {
        &mut self.hooks
    }
}

impl fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.schemes.keys().collect();
        names.sort();
        f.debug_struct("SecurityManager")
            .field("schemes", &names)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn build_scheme(name: &str, cfg: &SchemeConfig, components: &Components) -> Result<Scheme> {
    let scheme = match cfg {
        SchemeConfig::Form(c) => {
            let mut form = FormAuth::new(
                name,
                components.authenticator(&c.authenticator)?,
                components.authorizer(&c.authorizer)?,
                components.password_encoder(&c.password_encoder)?,
            );
            form.login_url = c.login_url.clone();
            form.login_submit_url = c.login_submit_url.clone();
            form.login_failure_url = c.login_failure_url.clone();
            form.default_target_url = c.default_target_url.clone();
            form.always_redirect_to_default_target = c.always_redirect_to_default_target;
            form.field_identity = c.field_identity.clone();
            form.field_credential = c.field_credential.clone();
            Scheme::Form(form)
        }
        SchemeConfig::Basic(c) => BasicAuth::new(
            name,
            components.authenticator(&c.authenticator)?,
            components.authorizer(&c.authorizer)?,
            components.password_encoder(&c.password_encoder)?,
        )
        .with_realm(c.realm_name.as_str())
        .into(),
        SchemeConfig::Token(c) => {
            let header = HeaderName::from_bytes(c.header_name.as_bytes())
                .map_err(|_| Error::Config(format!("invalid token header: {}", c.header_name)))?;
            TokenAuth::new(
                name,
                components.authenticator(&c.authenticator)?,
                components.authorizer(&c.authorizer)?,
            )
            .with_header(header, c.prefix.as_str())
            .into()
        }
    };
    tracing::debug!(name, kind = scheme.kind(), "auth scheme configured");
    Ok(scheme)
}
