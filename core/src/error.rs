//! Error types for the request builder, interceptor chain and response
//! readers.
//!
//! # Design
//! Builder misuse is recorded while the builder is being configured and only
//! reported by `send()` as `Configuration`, so a chain of builder calls never
//! has to be interrupted with `?`. Everything that goes wrong on the wire lands
//! in `Connection` with the failing URL and the transport's own error as the
//! source.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by `RequestBuilder::send` and the `RawResponse` readers.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not complete the exchange (DNS, TCP, TLS, timeout,
    /// redirect limit).
    #[error("request to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The body could not be decoded with the effective charset.
    #[error("failed to decode response body: {0}")]
    Decoding(String),

    /// The body was valid text but not the requested JSON shape.
    #[error("failed to parse response body as JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// A read method was called after the body stream had been consumed.
    #[error("response body has already been consumed")]
    AlreadyConsumed,

    /// The request could not be built from the supplied configuration.
    #[error("invalid request: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised by interceptors or custom transports.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn connection<E>(url: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Connection {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// True for both charset and JSON decoding failures.
    pub fn is_decoding(&self) -> bool {
        matches!(self, Error::Decoding(_) | Error::Json(_))
    }

    pub fn is_already_consumed(&self) -> bool {
        matches!(self, Error::AlreadyConsumed)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
