use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{Session, Storer};
use crate::error::Result;
use crate::request::Request;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    #[default]
    Lax,
    /// `SameSite=None`
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Session cookie options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Cookie carrying the session id
    pub cookie_name: String,
    /// Cookie path
    pub path: String,
    /// Cookie domain, host-only when `None`
    pub domain: Option<String>,
    /// `HttpOnly` attribute
    pub http_only: bool,
    /// `Secure` attribute
    pub secure: bool,
    /// `Max-Age`; session cookie when `None`
    pub max_age: Option<Duration>,
    /// `SameSite` attribute
    pub same_site: SameSite,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cookie_name: "aah_session".to_string(),
            path: "/".to_string(),
            domain: None,
            http_only: true,
            secure: false,
            max_age: Some(Duration::from_secs(30 * 60)),
            same_site: SameSite::default(),
        }
    }
}

/// Loads sessions for incoming requests and flushes them afterwards.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Storer>,
    options: SessionOptions,
}

impl SessionManager {
    /// Creates a manager over `store`.
    pub fn new(store: Arc<dyn Storer>, options: SessionOptions) -> Self {
        Self { store, options }
    }

    /// Manager over a fresh [`MemoryStore`](super::MemoryStore) with default options.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::MemoryStore::new()), SessionOptions::default())
    }

    /// Cookie options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Mutable cookie options (e.g. to force `secure` when TLS is enabled).
    pub fn options_mut(&mut self) -> &mut SessionOptions {
        &mut self.options
    }

    /// Restores the session named by the request cookie, or starts a new one.
    ///
    /// A missing cookie, a malformed id or an id unknown to the store yields
    /// a fresh, unauthenticated session. Store failures propagate.
    pub fn get_session(&self, req: &Request) -> Result<Session> {
        let Some(cookie) = req.cookie(&self.options.cookie_name) else {
            return Ok(self.new_session());
        };

        if uuid::Uuid::parse_str(&cookie.value).is_err() {
            tracing::debug!("ignoring malformed session cookie");
            return Ok(self.new_session());
        }

        match self.store.load(&cookie.value)? {
            Some(session) => Ok(session),
            None => {
                tracing::debug!("session not found in store, starting a new one");
                Ok(self.new_session())
            }
        }
    }

    /// Starts an empty, unauthenticated session.
    pub fn new_session(&self) -> Session {
        Session::new()
    }

    /// Flushes the session to the store in a single write.
    pub fn save(&self, session: &Session) -> Result<()> {
        self.store.save(session).inspect_err(|e| {
            tracing::error!(error = %e, "failed to save session");
        })
    }

    /// Removes the session from the store.
    pub fn delete(&self, session: &Session) -> Result<()> {
        self.store.delete(&session.id)
    }

    /// `Set-Cookie` header value carrying the session id.
    pub fn set_cookie_value(&self, session: &Session) -> String {
        self.cookie(&session.id, self.options.max_age)
    }

    /// `Set-Cookie` header value that expires the session cookie.
    pub fn expire_cookie_value(&self) -> String {
        self.cookie("", Some(Duration::ZERO))
    }

    fn cookie(&self, value: &str, max_age: Option<Duration>) -> String {
        let opts = &self.options;
        let mut cookie = format!("{}={}; Path={}", opts.cookie_name, value, opts.path);
        if let Some(domain) = &opts.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        if opts.http_only {
            cookie.push_str("; HttpOnly");
        }
        if opts.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", opts.same_site));
        cookie
    }
}
