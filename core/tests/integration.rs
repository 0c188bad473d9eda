//! End-to-end tests against the live mock server.
//!
//! # Design
//! Every test starts its own `MockServer` on a random port and talks to it
//! through the default `UreqTransport`, so the builder, body encoders,
//! redirect handling and response readers are exercised over real HTTP.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use mock_server::MockServer;
use requests_core::{Error, Interceptor, InvocationTarget, Part, RawResponse, Request, Result};

fn server() -> MockServer {
    MockServer::start().expect("mock server failed to start")
}

// ---------------------------------------------------------------------------
// GET / HEAD / POST
// ---------------------------------------------------------------------------

#[test]
fn get_returns_text() {
    let server = server();

    let text = requests_core::get(server.url("/"))
        .request_charset("utf-8")
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(!text.is_empty());
    assert!(text.starts_with("GET /"));
}

#[test]
fn get_with_params() {
    let server = server();

    let mut params = HashMap::new();
    params.insert("wd", "test");
    let text = requests_core::get(server.url("/"))
        .params(params)
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(text.contains("wd=test"));
    assert_eq!(text.matches("wd=test").count(), 1);
}

#[test]
fn params_keep_their_order_on_the_wire() {
    let server = server();

    let text = requests_core::get(server.url("/?fixed=0"))
        .param("b", 2)
        .param("a", 1)
        .param("b", 3)
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(text.starts_with("GET /?fixed=0&b=2&a=1&b=3"), "{text}");
}

#[test]
fn head_has_status_and_empty_body() {
    let server = server();

    let mut resp = requests_core::head(server.url("/"))
        .request_charset("utf-8")
        .send()
        .unwrap();
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.status_line(), "HTTP/1.1 200 OK");
    assert!(resp.read_to_text().unwrap().is_empty());
}

#[test]
fn post_form_body() {
    let server = server();

    let text = requests_core::post(server.url("/post"))
        .body([("wd", "test")])
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(text.contains("wd=test"));
}

#[test]
fn non_success_status_is_returned_as_data() {
    let server = server();

    let resp = requests_core::get(server.url("/status/404"))
        .send()
        .unwrap()
        .to_text_response()
        .unwrap();
    assert_eq!(resp.status_code(), 404);
    assert_eq!(resp.status_line(), "HTTP/1.1 404 Not Found");
    assert_eq!(resp.body(), "status 404");
}

// ---------------------------------------------------------------------------
// Cookies, auth, headers
// ---------------------------------------------------------------------------

#[test]
fn cookies_are_sent_and_parsed_back() {
    let server = server();

    let resp = requests_core::get(server.url("/cookie"))
        .cookies([("test", "value")])
        .send()
        .unwrap()
        .to_text_response()
        .unwrap();
    let cookie = resp.cookie("test").expect("test cookie");
    assert_eq!(cookie.value, "value");
    assert_eq!(cookie.path.as_deref(), Some("/"));
    assert!(cookie.http_only);
}

#[test]
fn basic_auth() {
    let server = server();

    let resp = requests_core::get(server.url("/basicAuth"))
        .basic_auth(mock_server::BASIC_AUTH_USER, mock_server::BASIC_AUTH_PASSWORD)
        .send()
        .unwrap()
        .to_text_response()
        .unwrap();
    assert_eq!(resp.status_code(), 200);

    let resp = requests_core::get(server.url("/basicAuth"))
        .basic_auth("test", "wrong")
        .send()
        .unwrap();
    assert_eq!(resp.status_code(), 401);
}

#[test]
fn headers_are_sent() {
    let server = server();

    let text = requests_core::get(server.url("/echo_header"))
        .headers([("TestHeader", 1)])
        .header("X-Second", "two")
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    let lower = text.to_ascii_lowercase();
    assert!(lower.contains("testheader: 1"), "{text}");
    assert!(lower.contains("x-second: two"), "{text}");
}

#[test]
fn default_user_agent_is_sent() {
    let server = server();

    let text = requests_core::get(server.url("/echo_header"))
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(text.contains(requests_core::http::DEFAULT_USER_AGENT), "{text}");
}

// ---------------------------------------------------------------------------
// Redirects
// ---------------------------------------------------------------------------

#[test]
fn redirect_is_followed_with_user_agent() {
    let server = server();

    let resp = requests_core::get(server.url("/redirect"))
        .user_agent("my-user-agent")
        .send()
        .unwrap()
        .to_text_response()
        .unwrap();
    assert_eq!(resp.status_code(), 200);
    assert!(resp.body().contains("/redirected"));
    assert!(resp.body().contains("my-user-agent"));
    assert!(resp.url().ends_with("/redirected"));
}

#[test]
fn same_origin_redirect_keeps_credentials() {
    let server = server();

    let text = requests_core::get(server.url("/redirect"))
        .cookie("session", "secret")
        .basic_auth("test", "password")
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    let lower = text.to_ascii_lowercase();
    assert!(lower.contains("cookie: session=secret"), "{text}");
    assert!(lower.contains("authorization: basic"), "{text}");
}

#[test]
fn cross_origin_redirect_drops_credentials() {
    let origin = server();
    let target = server();

    let text = requests_core::get(origin.url(&format!("/redirect_to/{}", target.addr().port())))
        .cookie("session", "secret")
        .basic_auth("test", "password")
        .header("X-Kept", "yes")
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    let lower = text.to_ascii_lowercase();
    assert!(lower.starts_with("get /redirected"), "{text}");
    assert!(lower.contains("x-kept: yes"), "{text}");
    assert!(!lower.contains("cookie:"), "{text}");
    assert!(!lower.contains("authorization:"), "{text}");
}

#[test]
fn redirect_can_be_disabled() {
    let server = server();

    let resp = requests_core::get(server.url("/redirect"))
        .follow_redirect(false)
        .send()
        .unwrap();
    assert_eq!(resp.status_code(), 302);
    assert_eq!(resp.header("location"), Some("/redirected"));
}

#[test]
fn redirect_loop_hits_the_limit() {
    let server = server();

    let err = requests_core::get(server.url("/redirect_loop"))
        .max_redirects(3)
        .send()
        .unwrap_err();
    assert!(err.is_connection(), "{err}");
}

// ---------------------------------------------------------------------------
// Multipart and JSON bodies
// ---------------------------------------------------------------------------

#[test]
fn multipart_file() {
    let server = server();

    let keystore = Cursor::new(b"not really a keystore".to_vec());
    let body = requests_core::post(server.url("/multi_part"))
        .multi_part_body([
            Part::file("writeTo", "keystore", keystore).content_type("application/octem-stream"),
        ])
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(body.contains("writeTo"));
    assert!(body.contains("filename=\"keystore\""));
    assert!(body.contains("application/octem-stream"));
    assert!(body.contains("not really a keystore"));
}

#[test]
fn multipart_text() {
    let server = server();

    let body = requests_core::post(server.url("/multi_part"))
        .multi_part_body([Part::text("test", "this is test value")])
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(body.contains("this is test value"));
    assert!(body.contains("plain/text; charset=utf-8"));
}

#[test]
fn send_json() {
    let server = server();

    let text = requests_core::post(server.url("/echo_body"))
        .json_body(&[1, 2, 3])
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(text.starts_with('['));
    assert!(text.ends_with(']'));
}

#[test]
fn receive_json() {
    let server = server();

    let list: Vec<i32> = requests_core::post(server.url("/echo_body"))
        .json_body(&vec![1, 2, 3])
        .send()
        .unwrap()
        .read_to_json()
        .unwrap();
    assert_eq!(list, vec![1, 2, 3]);
}

#[test]
fn json_response_round_trip() {
    let server = server();

    let resp = requests_core::put(server.url("/echo_body"))
        .json_body(&serde_json::json!({"name": "requests", "tags": ["a", "b"]}))
        .send()
        .unwrap()
        .to_json_response::<serde_json::Value>()
        .unwrap();
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.body()["tags"][1], "b");
}

// ---------------------------------------------------------------------------
// Reading the body
// ---------------------------------------------------------------------------

#[test]
fn reading_twice_fails() {
    let server = server();

    let mut resp = requests_core::post(server.url("/echo_body"))
        .json_body(&[1, 2, 3])
        .send()
        .unwrap();
    resp.read_to_text().unwrap();
    let err = resp.read_to_json::<Vec<i32>>().unwrap_err();
    assert!(matches!(err, Error::AlreadyConsumed));
}

#[test]
fn declared_charset_is_honoured() {
    let server = server();

    let text = requests_core::get(server.url("/latin1"))
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert_eq!(text, "café");
}

#[test]
fn unknown_declared_charset_is_a_decoding_error() {
    let server = server();

    let err = requests_core::get(server.url("/unknown_charset"))
        .send()
        .unwrap()
        .read_to_text()
        .unwrap_err();
    assert!(err.is_decoding(), "{err}");
}

#[test]
fn body_can_be_written_to_file() {
    let server = server();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("body.json");

    let written = requests_core::post(server.url("/echo_body"))
        .json_body(&[1, 2, 3])
        .send()
        .unwrap()
        .write_to_file(&path)
        .unwrap();
    assert_eq!(written, 7);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2,3]");
}

// ---------------------------------------------------------------------------
// Interceptors and failures
// ---------------------------------------------------------------------------

struct StatusCapture(Arc<AtomicU16>);

impl Interceptor for StatusCapture {
    fn intercept(&self, target: &InvocationTarget<'_>, request: Request) -> Result<RawResponse> {
        let response = target.proceed(request)?;
        self.0.store(response.status_code(), Ordering::SeqCst);
        Ok(response)
    }
}

#[test]
fn interceptor_sees_status_code() {
    let server = server();
    let status = Arc::new(AtomicU16::new(0));

    let text = requests_core::get(server.url("/echo_header"))
        .interceptor(StatusCapture(status.clone()))
        .send()
        .unwrap()
        .read_to_text()
        .unwrap();
    assert!(!text.is_empty());
    assert_eq!(status.load(Ordering::SeqCst), 200);
}

#[test]
fn closed_port_is_a_connection_error() {
    let addr = {
        let server = server();
        server.addr()
    };

    let err = requests_core::get(format!("http://{addr}/"))
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .unwrap_err();
    assert!(err.is_connection(), "{err}");
}
