//! The terminal link of every interceptor chain: the actual network exchange.
//!
//! # Design
//! `Transport` is the only seam that touches the network. `UreqTransport`
//! builds a blocking ureq agent from the request's `RequestConfig`, disables
//! ureq's own redirect handling and follows redirects itself so that the
//! headers, cookies and user agent of the first request are re-sent on
//! every same-origin hop. `Authorization` and `Cookie` are dropped once a
//! redirect leaves the origin. Non-2xx statuses are returned as data, never
//! as errors.

use tracing::debug;
use ureq::http::Response as HttpResponse;
use ureq::tls::TlsConfig;
use ureq::typestate::WithBody;
use ureq::{Agent, Body as UreqBody, RequestBuilder as UreqRequest};
use url::Url;

use crate::error::{Error, Result};
use crate::http::{Method, Request, RequestConfig};
use crate::response::RawResponse;

/// Performs one request/response exchange for a finalized request.
pub trait Transport: Send + Sync {
    fn execute(&self, request: Request) -> Result<RawResponse>;
}

/// Blocking HTTP/HTTPS transport backed by `ureq`.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(config: &RequestConfig) -> Agent {
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_recv_response(Some(config.read_timeout))
            .timeout_recv_body(Some(config.read_timeout));
        if !config.verify {
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        builder.build().new_agent()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: Request) -> Result<RawResponse> {
        let agent = Self::agent(&request.config);
        let charset = request.config.request_charset;

        let mut headers = request.headers.clone();
        if request.header("user-agent").is_none() {
            headers.push(("User-Agent".to_string(), request.config.user_agent.clone()));
        }
        if let Some(cookie) = request.cookie_header() {
            headers.push(("Cookie".to_string(), cookie));
        }
        let mut payload = None;
        if !request.body.is_empty() {
            if let Some(content_type) = request.body.content_type(charset) {
                if request.header("content-type").is_none() {
                    headers.push(("Content-Type".to_string(), content_type));
                }
            }
            payload = Some(request.body.encode(charset));
        }

        let mut method = request.method;
        if payload.is_some() && !method.allows_body() {
            return Err(Error::configuration(format!(
                "{method} requests cannot carry a body"
            )));
        }
        let mut url = request.full_url();
        let mut redirects = 0;
        loop {
            let response = send_once(&agent, method, &url, &headers, payload.as_deref())?;
            let status = response.status().as_u16();
            debug!(%method, %url, status, "exchange complete");

            let location = response
                .headers()
                .get("location")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let location = match location {
                Some(location) if request.config.follow_redirect && is_redirect(status) => location,
                _ => return Ok(into_raw_response(response, method, &url)),
            };

            if redirects >= request.config.max_redirects {
                return Err(Error::connection(
                    url.as_str(),
                    format!("too many redirects (limit {})", request.config.max_redirects),
                ));
            }
            redirects += 1;

            let next = url
                .join(&location)
                .map_err(|err| Error::connection(url.as_str(), err))?;
            let downgrade = matches!(status, 301 | 302) && !matches!(method, Method::Get | Method::Head);
            if status == 303 || downgrade {
                method = Method::Get;
                payload = None;
                headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
            }
            let same_origin = next.host_str() == url.host_str()
                && next.port_or_known_default() == url.port_or_known_default();
            if !same_origin {
                headers.retain(|(name, _)| {
                    !name.eq_ignore_ascii_case("authorization") && !name.eq_ignore_ascii_case("cookie")
                });
            }
            debug!(from = %url, to = %next, status, "following redirect");
            url = next;
        }
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn send_once(
    agent: &Agent,
    method: Method,
    url: &Url,
    headers: &[(String, String)],
    payload: Option<&[u8]>,
) -> Result<HttpResponse<UreqBody>> {
    let uri = url.as_str();
    let outcome = match method {
        Method::Get => with_headers(agent.get(uri), headers).call(),
        Method::Head => with_headers(agent.head(uri), headers).call(),
        Method::Delete => with_headers(agent.delete(uri), headers).call(),
        Method::Options => with_headers(agent.options(uri), headers).call(),
        Method::Post => send_payload(with_headers(agent.post(uri), headers), payload),
        Method::Put => send_payload(with_headers(agent.put(uri), headers), payload),
        Method::Patch => send_payload(with_headers(agent.patch(uri), headers), payload),
    };
    outcome.map_err(|err| Error::connection(uri, err))
}

fn with_headers<B>(mut builder: UreqRequest<B>, headers: &[(String, String)]) -> UreqRequest<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_payload(
    builder: UreqRequest<WithBody>,
    payload: Option<&[u8]>,
) -> std::result::Result<HttpResponse<UreqBody>, ureq::Error> {
    match payload {
        Some(bytes) => builder.send(bytes),
        None => builder.send_empty(),
    }
}

fn into_raw_response(response: HttpResponse<UreqBody>, method: Method, url: &Url) -> RawResponse {
    let (parts, body) = response.into_parts();
    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let reason = parts.status.canonical_reason().unwrap_or("");
    let status_line = format!("{:?} {} {}", parts.version, parts.status.as_u16(), reason)
        .trim_end()
        .to_string();

    let raw = if method == Method::Head {
        RawResponse::new(parts.status.as_u16(), headers, std::io::empty())
    } else {
        RawResponse::new(parts.status.as_u16(), headers, body.into_reader())
    };
    raw.with_status_line(status_line).with_url(url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status), "{status}");
        }
        for status in [200, 204, 300, 304, 404] {
            assert!(!is_redirect(status), "{status}");
        }
    }

    #[test]
    fn unreachable_host_is_a_connection_error() {
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let mut request = Request::new(Method::Get, url);
        request.config.connect_timeout = std::time::Duration::from_millis(500);

        let err = UreqTransport::new().execute(request).unwrap_err();
        assert!(err.is_connection(), "{err}");
    }

    #[test]
    fn body_on_a_bodiless_method_is_rejected_before_sending() {
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let mut request = Request::new(Method::Delete, url);
        request.body = Body::Json(b"[1]".to_vec());

        let err = UreqTransport::new().execute(request).unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }
}
