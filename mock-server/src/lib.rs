//! Echo server used by the `requests-core` integration tests.
//!
//! Every endpoint reflects some part of the incoming request back in the
//! response body (query string, headers, cookies, raw body) so the client can
//! assert on what actually went over the wire.

use std::{net::SocketAddr, thread::JoinHandle};

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{any, get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::{net::TcpListener, sync::oneshot};

/// Credentials accepted by `/basicAuth`.
pub const BASIC_AUTH_USER: &str = "test";
pub const BASIC_AUTH_PASSWORD: &str = "password";

pub fn app() -> Router {
    Router::new()
        .route("/", get(echo_request).post(echo_request))
        .route("/post", post(echo_body))
        .route("/echo_body", any(echo_body))
        .route("/echo_header", any(echo_headers))
        .route("/multi_part", post(echo_body))
        .route("/cookie", get(echo_cookies))
        .route("/basicAuth", get(basic_auth))
        .route("/redirect", any(redirect))
        .route("/redirect_loop", any(redirect_loop))
        .route("/redirected", any(echo_request))
        .route("/redirect_to/{port}", any(redirect_to))
        .route("/status/{code}", any(status))
        .route("/latin1", get(latin1))
        .route("/unknown_charset", get(unknown_charset))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A mock server bound to a random local port, running on its own thread.
///
/// Each test owns its instance; dropping it shuts the server down and joins
/// the thread.
pub struct MockServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start() -> Result<Self, std::io::Error> {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let handle = std::thread::spawn(move || {
            let served = runtime.block_on(async move {
                let listener = TcpListener::from_std(std_listener)?;
                axum::serve(listener, app())
                    .with_graceful_shutdown(async {
                        let _ = signal.await;
                    })
                    .await
            });
            if let Err(err) = served {
                tracing::error!(%err, "mock server stopped");
            }
        });

        Ok(Self {
            addr,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute `http://` URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {}\n", String::from_utf8_lossy(value.as_bytes())))
        .collect()
}

async fn echo_request(method: Method, uri: Uri, headers: HeaderMap) -> String {
    format!("{method} {uri}\n{}", render_headers(&headers))
}

async fn echo_headers(headers: HeaderMap) -> String {
    render_headers(&headers)
}

async fn echo_body(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn echo_cookies(headers: HeaderMap) -> impl IntoResponse {
    let cookies: Vec<(String, String)> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let body: String = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}\n"))
        .collect();
    let set_cookies: Vec<_> = cookies
        .into_iter()
        .map(|(name, value)| (header::SET_COOKIE, format!("{name}={value}; Path=/; HttpOnly")))
        .collect();
    (AppendHeaders(set_cookies), body)
}

async fn basic_auth(headers: HeaderMap) -> Response {
    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{BASIC_AUTH_USER}:{BASIC_AUTH_PASSWORD}"))
    );
    match headers.get(header::AUTHORIZATION) {
        Some(value) if value.as_bytes() == expected.as_bytes() => {
            (StatusCode::OK, "authorized").into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"mock\"")],
            "unauthorized",
        )
            .into_response(),
    }
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/redirected")])
}

async fn redirect_loop() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/redirect_loop")])
}

/// Redirect to `/redirected` on another local port, i.e. another origin.
async fn redirect_to(Path(port): Path<u16>) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("http://127.0.0.1:{port}/redirected"))],
    )
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        Bytes::from_static(b"caf\xe9"),
    )
}

async fn unknown_charset() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=x-no-such-charset")],
        "hello",
    )
}
