//! Fluent request builder.
//!
//! # Design
//! Setters take and return the builder by value so calls can be chained.
//! Anything that can go wrong while configuring (bad URL, unknown charset,
//! two body variants, unserializable JSON) is remembered and returned from
//! `send()`; the first such problem wins. `params`, `headers` and `cookies`
//! only ever append. Basic-auth credentials are turned into an
//! `Authorization` header when the request is finalized, and conflict with an
//! explicit `Authorization` header instead of silently replacing it.

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use encoding_rs::Encoding;
use serde::Serialize;
use tracing::debug;
use ureq::http::{HeaderName, HeaderValue};
use url::Url;

use crate::body::{self, Body, Part};
use crate::error::{Error, Result};
use crate::http::{Method, Request, RequestConfig};
use crate::interceptor::{Interceptor, InvocationTarget};
use crate::response::RawResponse;
use crate::transport::{Transport, UreqTransport};

pub fn get(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Get, url)
}

pub fn head(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Head, url)
}

pub fn post(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Post, url)
}

pub fn put(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Put, url)
}

pub fn patch(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Patch, url)
}

pub fn delete(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Delete, url)
}

pub fn options(url: impl Into<String>) -> RequestBuilder {
    RequestBuilder::new(Method::Options, url)
}

enum PendingBody {
    Empty,
    Form(Vec<(String, String)>),
    Multipart(Vec<Part>),
    Json(Vec<u8>),
    Raw {
        content: Vec<u8>,
        content_type: String,
    },
}

impl PendingBody {
    fn is_empty(&self) -> bool {
        matches!(self, PendingBody::Empty)
    }

    fn finish(self) -> Result<Body> {
        Ok(match self {
            PendingBody::Empty => Body::Empty,
            PendingBody::Form(pairs) => Body::Form(pairs),
            PendingBody::Multipart(parts) => {
                let fields = parts
                    .into_iter()
                    .map(|part| {
                        let name = part.name().to_string();
                        part.load().map_err(|err| {
                            Error::configuration(format!("cannot read multipart field {name:?}: {err}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Body::Multipart {
                    boundary: body::new_boundary(),
                    fields,
                }
            }
            PendingBody::Json(content) => Body::Json(content),
            PendingBody::Raw {
                content,
                content_type,
            } => Body::Raw {
                content,
                content_type,
            },
        })
    }
}

/// Accumulates a request and sends it through the interceptor chain.
pub struct RequestBuilder {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: PendingBody,
    basic_auth: Option<(String, String)>,
    config: RequestConfig,
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Option<Arc<dyn Transport>>,
    error: Option<Error>,
}

impl RequestBuilder {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: PendingBody::Empty,
            basic_auth: None,
            config: RequestConfig::default(),
            interceptors: Vec::new(),
            transport: None,
            error: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.params.extend(collect_pairs(params));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.headers.extend(collect_pairs(headers));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.cookies.push((name.into(), value.to_string()));
        self
    }

    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.cookies.extend(collect_pairs(cookies));
        self
    }

    /// Form-encoded (`application/x-www-form-urlencoded`) body.
    pub fn body<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let pairs = collect_pairs(pairs);
        self.set_body(PendingBody::Form(pairs))
    }

    pub fn text_body(self, text: impl Into<String>) -> Self {
        self.set_body(PendingBody::Raw {
            content: text.into().into_bytes(),
            content_type: "text/plain; charset=UTF-8".to_string(),
        })
    }

    pub fn bytes_body(self, content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        self.set_body(PendingBody::Raw {
            content: content.into(),
            content_type: content_type.into(),
        })
    }

    /// Body read from `reader` now; failures are reported by `send()`.
    pub fn stream_body(mut self, mut reader: impl Read, content_type: impl Into<String>) -> Self {
        let mut content = Vec::new();
        match reader.read_to_end(&mut content) {
            Ok(_) => self.bytes_body(content, content_type),
            Err(err) => {
                self.record(Error::configuration(format!("cannot read request body: {err}")));
                self
            }
        }
    }

    pub fn json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(content) => self.set_body(PendingBody::Json(content)),
            Err(err) => {
                self.record(Error::configuration(format!("cannot serialize JSON body: {err}")));
                self
            }
        }
    }

    pub fn multi_part_body(self, parts: impl IntoIterator<Item = Part>) -> Self {
        self.set_body(PendingBody::Multipart(parts.into_iter().collect()))
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    /// Skip TLS certificate and hostname checks when `false`.
    pub fn verify(mut self, verify: bool) -> Self {
        self.config.verify = verify;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Charset used to encode query parameters and form bodies, by WHATWG
    /// label (`"utf-8"`, `"gbk"`, `"latin1"`, ...).
    pub fn request_charset(mut self, label: &str) -> Self {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => self.config.request_charset = encoding,
            None => self.record(Error::configuration(format!("unsupported charset {label:?}"))),
        }
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Sets both the connect and the read timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.connect_timeout(timeout).read_timeout(timeout)
    }

    pub fn follow_redirect(mut self, follow: bool) -> Self {
        self.config.follow_redirect = follow;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn interceptors(mut self, interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    /// Replace the default `UreqTransport`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Finalize the request and run it through the interceptors and the
    /// transport. Blocks until the chain completes.
    pub fn send(self) -> Result<RawResponse> {
        let (request, interceptors, transport) = self.finalize()?;
        debug!(
            method = %request.method,
            url = %request.url,
            interceptors = interceptors.len(),
            "sending request"
        );
        let method = request.method;
        let response = InvocationTarget::new(&interceptors, transport.as_ref()).proceed(request)?;
        if method == Method::Head {
            return Ok(response.without_body());
        }
        Ok(response)
    }

    fn set_body(mut self, body: PendingBody) -> Self {
        if self.body.is_empty() {
            self.body = body;
        } else {
            self.record(Error::configuration("more than one request body was set"));
        }
        self
    }

    fn record(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn finalize(self) -> Result<(Request, Vec<Arc<dyn Interceptor>>, Arc<dyn Transport>)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let url = Url::parse(&self.url)
            .map_err(|err| Error::configuration(format!("invalid url {:?}: {err}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "unsupported url scheme {:?}",
                url.scheme()
            )));
        }
        if !self.body.is_empty() && !self.method.allows_body() {
            return Err(Error::configuration(format!(
                "{} requests cannot carry a body",
                self.method
            )));
        }

        let mut headers = self.headers;
        if let Some((user, password)) = self.basic_auth {
            if headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            {
                return Err(Error::configuration(
                    "basic auth conflicts with an explicit Authorization header",
                ));
            }
            headers.push(("Authorization".to_string(), basic_auth_value(&user, &password)));
        }

        let request = Request {
            method: self.method,
            url,
            params: self.params,
            headers,
            cookies: self.cookies,
            body: self.body.finish()?,
            config: self.config,
        };
        for (name, value) in &request.headers {
            check_header(name, value)?;
        }
        if let Some(cookie) = request.cookie_header() {
            check_header("Cookie", &cookie)?;
        }
        check_header("User-Agent", &request.config.user_agent)?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));
        Ok((request, self.interceptors, transport))
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

fn collect_pairs<I, K, V>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.to_string()))
        .collect()
}

fn check_header(name: &str, value: &str) -> Result<()> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::configuration(format!("invalid header name {name:?}")))?;
    HeaderValue::from_str(value)
        .map_err(|_| Error::configuration(format!("invalid value for header {name:?}")))?;
    Ok(())
}

fn basic_auth_value(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}
