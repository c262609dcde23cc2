//! Content negotiation for `Accept`, `Accept-Encoding`, `Accept-Language`
//! and `Content-Type` headers (RFC 7231).

use std::cmp::Ordering;
use std::fmt;

use http::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE};
use mime::Mime;

use super::RawRequest;

/// A parsed media type.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType {
    mime: Mime,
}

impl ContentType {
    /// Wraps a parsed media type.
    pub fn new(mime: Mime) -> Self {
        Self { mime }
    }

    /// Parses a media type string, returning `None` if it is malformed.
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<Mime>().ok().map(Self::new)
    }

    /// `text/plain; charset=utf-8`
    pub fn plain_text() -> Self {
        Self::new(mime::TEXT_PLAIN_UTF_8)
    }

    /// `text/html; charset=utf-8`
    pub fn html() -> Self {
        Self::new(mime::TEXT_HTML_UTF_8)
    }

    /// `application/json`
    pub fn json() -> Self {
        Self::new(mime::APPLICATION_JSON)
    }

    /// Returns the underlying media type.
    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    /// Returns the `type/subtype` essence without parameters.
    pub fn essence(&self) -> &str {
        self.mime.essence_str()
    }

    /// Returns the `charset` parameter, if present.
    pub fn charset(&self) -> Option<&str> {
        self.mime.get_param(mime::CHARSET).map(|c| c.as_str())
    }

    /// Compares the essence case-insensitively with `value`.
    pub fn is_equal(&self, value: &str) -> bool {
        self.essence().eq_ignore_ascii_case(value.trim())
    }

    fn from_extension(ext: &str) -> Option<Self> {
        let mime = match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => mime::TEXT_HTML_UTF_8,
            "json" => mime::APPLICATION_JSON,
            "xml" => mime::TEXT_XML,
            "txt" | "text" => mime::TEXT_PLAIN_UTF_8,
            "js" => mime::APPLICATION_JAVASCRIPT_UTF_8,
            _ => return None,
        };
        Some(Self::new(mime))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime)
    }
}

/// One entry of an `Accept*` header with its quality factor.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptSpec {
    /// Entry exactly as sent
    pub raw: String,
    /// Value without parameters, e.g. `gzip` or `en-US`
    pub value: String,
    /// Quality factor in `[0, 1]`, default 1
    pub q: f32,
    /// Remaining `key=value` parameters
    pub params: Vec<(String, String)>,
}

impl AcceptSpec {
    fn parse(raw: &str) -> Option<Self> {
        let mut pieces = raw.split(';');
        let value = pieces.next()?.trim();
        if value.is_empty() {
            return None;
        }

        let mut q = 1.0_f32;
        let mut params = Vec::new();
        for piece in pieces {
            let Some((k, v)) = piece.split_once('=') else {
                continue;
            };
            let (k, v) = (k.trim(), v.trim());
            if k.eq_ignore_ascii_case("q") {
                q = v.parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
            } else {
                params.push((k.to_string(), v.to_string()));
            }
        }

        Some(Self {
            raw: raw.trim().to_string(),
            value: value.to_string(),
            q,
            params,
        })
    }
}

/// Parsed `Accept*` entries ordered by descending quality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptSpecs(Vec<AcceptSpec>);

impl AcceptSpecs {
    /// Parses a comma-separated header value; entries with `q=0` are dropped.
    pub fn parse(header: &str) -> Self {
        let mut specs: Vec<AcceptSpec> = header
            .split(',')
            .filter_map(AcceptSpec::parse)
            .filter(|s| s.q > 0.0)
            .collect();
        // Stable sort keeps header order between equal qualities.
        specs.sort_by(|a, b| b.q.partial_cmp(&a.q).unwrap_or(Ordering::Equal));
        Self(specs)
    }

    /// Returns the highest-quality entry.
    pub fn most_qualified(&self) -> Option<&AcceptSpec> {
        self.0.first()
    }

    /// Returns all entries.
    pub fn specs(&self) -> &[AcceptSpec] {
        &self.0
    }

    /// Returns true if no entries were parsed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A negotiated locale such as `en-US`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    /// Tag as sent by the client
    pub raw: String,
    /// Lowercase primary language
    pub language: String,
    /// Lowercase region, empty if absent
    pub region: String,
}

impl Locale {
    /// Parses a language tag. Returns `None` for empty tags and `*`.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.is_empty() || tag == "*" {
            return None;
        }
        let mut parts = tag.splitn(2, ['-', '_']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts.next().unwrap_or_default().to_ascii_lowercase();
        Some(Self {
            raw: tag.to_string(),
            language,
            region,
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.region.is_empty() {
            f.write_str(&self.language)
        } else {
            write!(f, "{}-{}", self.language, self.region)
        }
    }
}

fn header_str<'a>(raw: &'a RawRequest, name: http::HeaderName) -> Option<&'a str> {
    raw.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parses `Content-Type`, defaulting to `text/html; charset=utf-8`.
pub fn parse_content_type(raw: &RawRequest) -> ContentType {
    header_str(raw, CONTENT_TYPE)
        .and_then(ContentType::parse)
        .unwrap_or_else(ContentType::html)
}

/// Negotiates the response content type.
///
/// The URL path extension wins over the `Accept` header. A missing `Accept`
/// header, or one whose best entry is `*/*`, yields plain text.
pub fn negotiate_content_type(raw: &RawRequest) -> ContentType {
    let path = raw.uri.path();
    if let Some((_, ext)) = path.rsplit_once('.') {
        if !ext.contains('/') {
            if let Some(ct) = ContentType::from_extension(ext) {
                return ct;
            }
        }
    }

    header_str(raw, ACCEPT)
        .map(AcceptSpecs::parse)
        .and_then(|specs| specs.most_qualified().cloned())
        .filter(|spec| spec.value != "*/*")
        .and_then(|spec| ContentType::parse(&spec.value))
        .unwrap_or_else(ContentType::plain_text)
}

/// Parses `Accept-Encoding`, `None` when absent or empty.
pub fn parse_accept_encoding(raw: &RawRequest) -> Option<AcceptSpecs> {
    let specs = AcceptSpecs::parse(header_str(raw, ACCEPT_ENCODING)?);
    (!specs.is_empty()).then_some(specs)
}

/// Negotiates a locale from `Accept-Language`.
pub fn negotiate_locale(raw: &RawRequest) -> Option<Locale> {
    let specs = AcceptSpecs::parse(header_str(raw, ACCEPT_LANGUAGE)?);
    specs
        .specs()
        .iter()
        .find_map(|spec| Locale::parse(&spec.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};

    fn raw(path: &'static str, headers: &[(&str, &str)]) -> RawRequest {
        let mut r = RawRequest::new(Method::GET, Uri::from_static(path));
        for (k, v) in headers {
            r = r.with_header(k, v);
        }
        r
    }

    #[test]
    fn accept_specs_sorted_by_quality() {
        let specs = AcceptSpecs::parse("deflate;q=0.5, gzip, br;q=0.8, identity;q=0");
        let values: Vec<_> = specs.specs().iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, ["gzip", "br", "deflate"]);
    }

    #[test]
    fn accept_spec_keeps_params() {
        let specs = AcceptSpecs::parse("application/json; version=2; q=0.9");
        let best = specs.most_qualified().unwrap();
        assert_eq!(best.value, "application/json");
        assert_eq!(best.params, vec![("version".to_string(), "2".to_string())]);
        assert!((best.q - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn content_type_extension_wins() {
        let r = raw("/users.json", &[("accept", "text/html")]);
        assert!(negotiate_content_type(&r).is_equal("application/json"));
    }

    #[test]
    fn content_type_from_accept() {
        let r = raw("/users", &[("accept", "text/html;q=0.8, application/xml")]);
        assert!(negotiate_content_type(&r).is_equal("application/xml"));
    }

    #[test]
    fn content_type_defaults_to_plain_text() {
        assert!(negotiate_content_type(&raw("/", &[])).is_equal("text/plain"));
        let any = raw("/", &[("accept", "*/*")]);
        assert!(negotiate_content_type(&any).is_equal("text/plain"));
    }

    #[test]
    fn request_content_type_parsed() {
        let r = raw("/", &[("content-type", "application/json; charset=utf-8")]);
        let ct = parse_content_type(&r);
        assert!(ct.is_equal("application/json"));
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn locale_negotiated() {
        let r = raw("/", &[("accept-language", "fr;q=0.5, en-US")]);
        let locale = negotiate_locale(&r).unwrap();
        assert_eq!(locale.language, "en");
        assert_eq!(locale.region, "us");
        assert_eq!(locale.to_string(), "en-us");
    }

    #[test]
    fn locale_absent() {
        assert!(negotiate_locale(&raw("/", &[])).is_none());
        assert!(negotiate_locale(&raw("/", &[("accept-language", "*")])).is_none());
    }

    #[test]
    fn accept_encoding_absent() {
        assert!(parse_accept_encoding(&raw("/", &[])).is_none());
    }
}
