//! The finalized request value handed to interceptors and the transport.
//!
//! # Design
//! `Request` is produced once by `RequestBuilder::send` and then passed by
//! value down the interceptor chain. Fields are public so an interceptor can
//! rewrite any part of it before calling `proceed`. Query parameters, headers
//! and cookies are ordered lists of owned pairs; duplicates are kept in the
//! order they were added.

use std::fmt;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use url::Url;

use crate::body::{self, Body};

/// `User-Agent` sent when neither the builder nor a header overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!("requests-core/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether a request body may be attached to this method.
    pub fn allows_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request transport settings.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirect: bool,
    pub max_redirects: u32,
    /// When false, TLS certificate and hostname validation is skipped.
    pub verify: bool,
    pub user_agent: String,
    /// Charset used to percent-encode query parameters and form bodies.
    pub request_charset: &'static Encoding,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            follow_redirect: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verify: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_charset: UTF_8,
        }
    }
}

/// A fully built HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Body,
    pub config: RequestConfig,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            params: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: Body::Empty,
            config: RequestConfig::default(),
        }
    }

    /// The URL with `params` appended to any query already present.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if self.params.is_empty() {
            return url;
        }
        let encoded = body::encode_pairs(&self.params, self.config.request_charset);
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
            _ => encoded,
        };
        url.set_query(Some(&query));
        url
    }

    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }

    /// The `Cookie` header value for `cookies`, if there are any.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(rendered.join("; "))
    }
}
