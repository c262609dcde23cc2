//! Pooled request wrapper.
//!
//! [`RawRequest`] is the transport-level request handed over by the hosting
//! HTTP server. [`Request`] wraps it with derived fields and lazily memoized
//! negotiation results that authentication logic may consult. Instances are
//! recycled through a [`RequestPool`], which resets every field before a
//! wrapper is reused.

mod negotiate;
mod params;
mod pool;

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri, Version};

use crate::error::{Error, Result};

pub use negotiate::{
    negotiate_content_type, negotiate_locale, parse_accept_encoding, parse_content_type,
    AcceptSpec, AcceptSpecs, ContentType, Locale,
};
pub use params::{URLParam, URLParams};
pub use pool::{PooledRequest, RequestPool};

const JSONP_PARAM: &str = "callback";
const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A file part of a multipart upload, already extracted by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client supplied file name
    pub file_name: String,
    /// Declared content type of the part
    pub content_type: Option<String>,
    /// File contents
    pub data: Vec<u8>,
}

/// A request cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

/// Transport-level request as handed over by the HTTP server.
#[derive(Debug, Default)]
pub struct RawRequest {
    /// HTTP verb
    pub method: Method,
    /// Request target
    pub uri: Uri,
    /// Protocol version
    pub version: Version,
    /// Request headers
    pub headers: HeaderMap,
    /// Peer address, if known
    pub remote_addr: Option<SocketAddr>,
    /// True when the connection is TLS-terminated by this server
    pub is_tls: bool,
    /// Request body
    pub body: Vec<u8>,
    /// Multipart text parts keyed by form field
    pub fields: HashMap<String, Vec<String>>,
    /// Multipart file parts keyed by form field
    pub files: HashMap<String, Vec<UploadedFile>>,
}

impl RawRequest {
    /// Creates a request with no headers or body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            ..Default::default()
        }
    }

    /// Appends a header. Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => tracing::warn!(header = name, "skipping invalid request header"),
        }
        self
    }

    /// Sets an `application/x-www-form-urlencoded` body from key/value pairs.
    pub fn with_form<'a, I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(FORM_URLENCODED),
        );
        self.body = body.into_bytes();
        self
    }

    /// Sets the raw body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches a multipart text part under `key`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Attaches an uploaded file part under `key`.
    pub fn with_file(mut self, key: impl Into<String>, file: UploadedFile) -> Self {
        self.files.entry(key.into()).or_default().push(file);
        self
    }

    /// Sets the peer address.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Marks the connection as TLS.
    pub fn with_tls(mut self, is_tls: bool) -> Self {
        self.is_tls = is_tls;
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn is_form_body(&self) -> bool {
        self.header(header::CONTENT_TYPE.as_str())
            .and_then(ContentType::parse)
            .is_some_and(|ct| ct.is_equal(FORM_URLENCODED))
    }

    fn query_pairs(&self) -> impl Iterator<Item = (String, String)> + '_ {
        url::form_urlencoded::parse(self.uri.query().unwrap_or("").as_bytes()).into_owned()
    }

    /// Body form values first, then multipart text parts, then query values.
    fn form_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let has_body = matches!(self.method, Method::POST | Method::PUT | Method::PATCH);
        if has_body && self.is_form_body() {
            pairs.extend(url::form_urlencoded::parse(&self.body).into_owned());
        }
        if has_body {
            for (key, values) in &self.fields {
                pairs.extend(values.iter().map(|v| (key.clone(), v.clone())));
            }
        }
        pairs.extend(self.query_pairs());
        pairs
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Cookie {
                    name: name.to_string(),
                    value: value.trim().trim_matches('"').to_string(),
                })
            })
            .collect()
    }
}

/// Request wrapper with derived fields and memoized negotiation.
///
/// After [`reset`](Self::reset) every field equals its value in
/// `Request::default()`, including the memoized negotiation results.
#[derive(Debug, Default)]
pub struct Request {
    /// `http` or `https`, honoring forwarding headers
    pub scheme: String,
    /// Effective host, e.g. `example.com:8080`
    pub host: String,
    /// Protocol, e.g. `HTTP/1.1`
    pub proto: String,
    /// HTTP verb
    pub method: Method,
    /// Request path, e.g. `/app/login.html`
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
    /// URL path parameters set by the router
    pub url_params: URLParams,
    /// True if the first `Accept-Encoding` value mentions gzip
    pub is_gzip_accepted: bool,

    raw: Option<RawRequest>,
    locale: OnceCell<Option<Locale>>,
    content_type: OnceCell<ContentType>,
    accept_content_type: OnceCell<ContentType>,
    accept_encoding: OnceCell<Option<AcceptSpec>>,
}

impl Request {
    /// Builds a wrapper from a raw request.
    pub fn populate(raw: RawRequest) -> Self {
        let mut req = Self::default();
        req.populate_into(raw);
        req
    }

    /// Resets this wrapper and fills it from a raw request.
    pub fn populate_into(&mut self, raw: RawRequest) {
        self.reset();
        self.scheme = derive_scheme(&raw).to_string();
        self.host = derive_host(&raw);
        self.proto = format!("{:?}", raw.version);
        self.method = raw.method.clone();
        self.path = raw.uri.path().to_string();
        self.headers = raw.headers.clone();
        self.is_gzip_accepted = raw
            .headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("gzip"));
        self.raw = Some(raw);
    }

    /// Returns the underlying raw request. Direct use is discouraged.
    pub fn unwrap(&self) -> Option<&RawRequest> {
        self.raw.as_ref()
    }

    /// Negotiated response content type, computed once.
    ///
    /// Resolution order: URL extension, then the `Accept` header; plain text otherwise.
    pub fn accept_content_type(&self) -> &ContentType {
        self.accept_content_type.get_or_init(|| match &self.raw {
            Some(raw) => negotiate_content_type(raw),
            None => ContentType::plain_text(),
        })
    }

    /// Overrides the negotiated response content type.
    pub fn set_accept_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.accept_content_type = OnceCell::from(content_type);
        self
    }

    /// Most qualified `Accept-Encoding` entry, computed once.
    pub fn accept_encoding(&self) -> Option<&AcceptSpec> {
        self.accept_encoding
            .get_or_init(|| {
                self.raw
                    .as_ref()
                    .and_then(parse_accept_encoding)
                    .and_then(|specs| specs.most_qualified().cloned())
            })
            .as_ref()
    }

    /// Overrides the negotiated encoding.
    pub fn set_accept_encoding(&mut self, encoding: Option<AcceptSpec>) -> &mut Self {
        self.accept_encoding = OnceCell::from(encoding);
        self
    }

    /// Parsed `Content-Type` of the request body, computed once.
    pub fn content_type(&self) -> &ContentType {
        self.content_type.get_or_init(|| match &self.raw {
            Some(raw) => parse_content_type(raw),
            None => ContentType::html(),
        })
    }

    /// Overrides the request content type.
    pub fn set_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.content_type = OnceCell::from(content_type);
        self
    }

    /// Negotiated locale from `Accept-Language`, computed once.
    pub fn locale(&self) -> Option<&Locale> {
        self.locale
            .get_or_init(|| self.raw.as_ref().and_then(negotiate_locale))
            .as_ref()
    }

    /// Overrides the negotiated locale.
    pub fn set_locale(&mut self, locale: Option<Locale>) -> &mut Self {
        self.locale = OnceCell::from(locale);
        self
    }

    /// Returns true if the negotiation results have been computed or set.
    pub fn is_negotiation_cached(&self) -> bool {
        self.locale.get().is_some()
            || self.content_type.get().is_some()
            || self.accept_content_type.get().is_some()
            || self.accept_encoding.get().is_some()
    }

    /// Remote client IP: `X-Forwarded-For`, then `X-Real-IP`, then the peer address.
    pub fn client_ip(&self) -> Option<IpAddr> {
        let forwarded = self
            .header_value("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok());
        forwarded
            .or_else(|| {
                self.header_value("x-real-ip")
                    .and_then(|ip| ip.trim().parse().ok())
            })
            .or_else(|| self.raw.as_ref()?.remote_addr.map(|a| a.ip()))
    }

    /// Returns the named cookie.
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies().into_iter().find(|c| c.name == name)
    }

    /// Returns all request cookies.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.raw.as_ref().map(RawRequest::cookies).unwrap_or_default()
    }

    /// True if the query string carries a JSONP `callback`.
    pub fn is_jsonp(&self) -> bool {
        self.query_value(JSONP_PARAM).is_some_and(|v| !v.is_empty())
    }

    /// True if `X-Requested-With: XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.header_value("x-requested-with") == Some(AJAX_HEADER_VALUE)
    }

    /// `Referer` header, accepting the `Referrer` spelling too.
    pub fn referer(&self) -> Option<&str> {
        self.header_value(header::REFERER.as_str())
            .or_else(|| self.header_value("referrer"))
    }

    /// `User-Agent` header.
    pub fn user_agent(&self) -> Option<&str> {
        self.header_value(header::USER_AGENT.as_str())
    }

    /// Path parameter value, `""` if absent.
    pub fn path_value(&self, key: &str) -> &str {
        self.url_params.get(key)
    }

    /// First query parameter value for `key`.
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.raw
            .as_ref()?
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// All query parameter values for `key`.
    pub fn query_array_value(&self, key: &str) -> Vec<String> {
        match &self.raw {
            Some(raw) => raw
                .query_pairs()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First form value for `key`; body values take precedence over query values.
    pub fn form_value(&self, key: &str) -> Option<String> {
        self.raw
            .as_ref()?
            .form_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// All form values for `key`.
    pub fn form_array_value(&self, key: &str) -> Vec<String> {
        match &self.raw {
            Some(raw) => raw
                .form_pairs()
                .into_iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First uploaded file for `key`.
    pub fn form_file(&self, key: &str) -> Result<&UploadedFile> {
        self.raw
            .as_ref()
            .and_then(|raw| raw.files.get(key))
            .and_then(|files| files.first())
            .ok_or_else(|| Error::Multipart(format!("no such file: {}", key)))
    }

    /// Request body bytes.
    pub fn body(&self) -> &[u8] {
        self.raw.as_ref().map(|r| r.body.as_slice()).unwrap_or(&[])
    }

    /// Original request target, path plus query, e.g. `/orders?page=2`.
    pub fn request_uri(&self) -> &str {
        self.raw
            .as_ref()
            .and_then(|r| r.uri.path_and_query())
            .map(|pq| pq.as_str())
            .unwrap_or(&self.path)
    }

    /// Saves the uploaded file for `key` into `dst`.
    ///
    /// The destination must not exist yet; it is created exclusively.
    /// Returns the number of bytes written.
    pub fn save_file(&self, key: &str, dst: impl AsRef<Path>) -> Result<u64> {
        let dst = dst.as_ref();
        if key.is_empty() || dst.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("key or destination file is empty"));
        }
        if dst.is_dir() {
            return Err(Error::InvalidArgument(
                "destination file should not be a directory",
            ));
        }

        let upload = self.form_file(key)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dst)?;
        file.write_all(&upload.data)?;
        file.flush()?;
        Ok(upload.data.len() as u64)
    }

    /// Drops uploaded multipart parts held by the raw request.
    pub fn cleanup_multipart(&mut self) {
        if let Some(raw) = self.raw.as_mut() {
            raw.fields.clear();
            raw.files.clear();
        }
    }

    /// Returns every field to its zero value for reuse.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn derive_scheme(raw: &RawRequest) -> &'static str {
    for name in ["x-forwarded-proto", "x-forwarded-protocol", "x-url-scheme"] {
        if let Some(v) = raw.header(name) {
            return if v.trim().eq_ignore_ascii_case("https") {
                "https"
            } else {
                "http"
            };
        }
    }
    if raw
        .header("x-forwarded-ssl")
        .is_some_and(|v| v.eq_ignore_ascii_case("on"))
        || raw.is_tls
    {
        return "https";
    }
    "http"
}

fn derive_host(raw: &RawRequest) -> String {
    if let Some(h) = raw.header("x-forwarded-host") {
        return h.to_string();
    }
    if let Some(authority) = raw.uri.authority() {
        return authority.to_string();
    }
    raw.header(header::HOST.as_str())
        .unwrap_or_default()
        .to_string()
}
