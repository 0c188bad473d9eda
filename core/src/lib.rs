//! Blocking HTTP client with a fluent request builder and an interceptor
//! chain around the transport call.
//!
//! # Overview
//! ```no_run
//! let text = requests_core::get("http://127.0.0.1:8080/")
//!     .param("wd", "test")
//!     .send()?
//!     .read_to_text()?;
//! # Ok::<(), requests_core::Error>(())
//! ```
//!
//! # Design
//! - `RequestBuilder` accumulates configuration and produces an immutable
//!   `Request` in `send()`.
//! - `send()` runs the request through the registered `Interceptor`s in
//!   order, ending in a `Transport` (`UreqTransport` by default).
//! - The transport returns a `RawResponse` whose body can be read exactly
//!   once, as text, JSON, bytes or into a file.

pub mod body;
pub mod builder;
pub mod cookie;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod response;
pub mod transport;

pub use body::{Body, MultipartField, Part};
pub use builder::{delete, get, head, options, patch, post, put, RequestBuilder};
pub use cookie::Cookie;
pub use error::{Error, Result};
pub use http::{Method, Request, RequestConfig};
pub use interceptor::{from_fn, Interceptor, InvocationTarget, LoggingInterceptor};
pub use response::{RawResponse, Response};
pub use transport::{Transport, UreqTransport};
pub use url::Url;
