//! Response decisions made during dispatch.

use http::header::{HeaderName, HeaderValue, LOCATION};
use http::{HeaderMap, StatusCode};

use crate::error::{Error, Result};

/// What the response should look like.
///
/// The dispatcher only sets status, headers and the redirect target, then
/// marks the reply [`done`](Self::done). Writing it to the wire is up to the
/// server.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    redirect_url: Option<String>,
    done: bool,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            redirect_url: None,
            done: false,
        }
    }
}

impl Reply {
    /// Creates a `200 OK` reply with no headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirects with `302 Found`.
    ///
    /// A target that is not a valid header value leaves the reply unchanged.
    pub fn redirect(&mut self, url: impl Into<String>) -> &mut Self {
        let url = url.into();
        match HeaderValue::from_str(&url) {
            Ok(value) => {
                self.status = StatusCode::FOUND;
                self.headers.insert(LOCATION, value);
                self.redirect_url = Some(url);
            }
            Err(_) => tracing::warn!("redirect target is not a valid header value, ignored"),
        }
        self
    }

    /// Responds with `401 Unauthorized`.
    pub fn unauthorized(&mut self) -> &mut Self {
        self.status = StatusCode::UNAUTHORIZED;
        self
    }

    /// Sets a response status.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets (replaces) a response header.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the name or value is not valid HTTP.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidArgument("invalid header name"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidArgument("invalid header value"))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Marks the reply as written; request handling stops here.
    pub fn done(&mut self) -> &mut Self {
        self.done = true;
        self
    }

    /// Response status.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Redirect target, if any.
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    /// Returns true once the reply was marked written.
    pub fn is_done(&self) -> bool {
        self.done
    }
}
