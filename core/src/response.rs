//! Response handles returned by the transport.
//!
//! # Design
//! `RawResponse` owns the body stream until one of its read methods takes it.
//! Every reader moves the stream out first, so the connection is released on
//! every exit path (including decode failures), and a second read reports
//! `Error::AlreadyConsumed` instead of an empty body. `Response<T>` is the
//! eagerly materialized form for repeated inspection.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use serde::de::DeserializeOwned;
use ureq::http::StatusCode;

use crate::cookie::Cookie;
use crate::error::{Error, Result};

/// A response whose body has not been read yet.
pub struct RawResponse {
    status_code: u16,
    status_line: String,
    url: String,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    charset: Option<String>,
    body: Option<Box<dyn Read>>,
}

impl RawResponse {
    /// Build a response from parts. `Set-Cookie` headers are parsed into
    /// cookies; the status line defaults to `HTTP/1.1 <code> <reason>`.
    pub fn new(status_code: u16, headers: Vec<(String, String)>, body: impl Read + 'static) -> Self {
        let cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| Cookie::parse(value))
            .collect();
        let reason = StatusCode::from_u16(status_code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("");
        let status_line = format!("HTTP/1.1 {status_code} {reason}")
            .trim_end()
            .to_string();
        Self {
            status_code,
            status_line,
            url: String::new(),
            headers,
            cookies,
            charset: None,
            body: Some(Box::new(body)),
        }
    }

    pub fn with_status_line(mut self, status_line: impl Into<String>) -> Self {
        self.status_line = status_line.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace an unread body with an empty one. HEAD responses never carry
    /// content, whatever the transport handed back.
    pub(crate) fn without_body(mut self) -> Self {
        if self.body.is_some() {
            self.body = Some(Box::new(std::io::empty()));
        }
        self
    }

    /// Decode text with `charset` instead of the one the server declared.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// URL of the exchange that produced this response, after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|cookie| cookie.name == name)
    }

    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }

    pub fn read_to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut reader = self.take_body()?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Decode the body using the override charset, else the `Content-Type`
    /// charset, else UTF-8.
    pub fn read_to_text(&mut self) -> Result<String> {
        let encoding = self.resolve_charset(None)?;
        let bytes = self.read_to_bytes()?;
        decode(&bytes, encoding)
    }

    pub fn read_to_text_with(&mut self, charset: &str) -> Result<String> {
        let encoding = self.resolve_charset(Some(charset))?;
        let bytes = self.read_to_bytes()?;
        decode(&bytes, encoding)
    }

    pub fn read_to_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let text = self.read_to_text()?;
        serde_json::from_str(&text).map_err(Error::Json)
    }

    /// Stream the body into `path`, returning the number of bytes written.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> Result<u64> {
        let mut reader = self.take_body()?;
        let mut file = File::create(path)?;
        Ok(io::copy(&mut reader, &mut file)?)
    }

    /// Read and drop the body so the connection can be released.
    pub fn discard_body(&mut self) -> Result<()> {
        let mut reader = self.take_body()?;
        io::copy(&mut reader, &mut io::sink())?;
        Ok(())
    }

    pub fn to_text_response(mut self) -> Result<Response<String>> {
        let body = self.read_to_text()?;
        Ok(self.into_response(body))
    }

    pub fn to_json_response<T: DeserializeOwned>(mut self) -> Result<Response<T>> {
        let body = self.read_to_json()?;
        Ok(self.into_response(body))
    }

    pub fn to_bytes_response(mut self) -> Result<Response<Vec<u8>>> {
        let body = self.read_to_bytes()?;
        Ok(self.into_response(body))
    }

    fn take_body(&mut self) -> Result<Box<dyn Read>> {
        self.body.take().ok_or(Error::AlreadyConsumed)
    }

    fn into_response<T>(self, body: T) -> Response<T> {
        Response {
            status_code: self.status_code,
            status_line: self.status_line,
            url: self.url,
            headers: self.headers,
            cookies: self.cookies,
            body,
        }
    }

    fn resolve_charset(&self, explicit: Option<&str>) -> Result<&'static Encoding> {
        if let Some(label) = explicit.or(self.charset.as_deref()) {
            return Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| Error::configuration(format!("unsupported charset {label:?}")));
        }
        match self.declared_charset() {
            Some(label) => Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                Error::Decoding(format!("server declared unsupported charset {label:?}"))
            }),
            None => Ok(UTF_8),
        }
    }

    fn declared_charset(&self) -> Option<String> {
        let content_type: mime::Mime = self.header("content-type")?.parse().ok()?;
        content_type
            .get_param("charset")
            .map(|charset| charset.as_str().to_string())
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status_line", &self.status_line)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// A response with its body fully read and decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    status_code: u16,
    status_line: String,
    url: String,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    body: T,
}

impl<T> Response<T> {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|cookie| cookie.name == name)
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn into_body(self) -> T {
        self.body
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Strict decode: a BOM overrides `encoding`, malformed input is an error.
fn decode(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (encoding, bytes) = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) => (bom_encoding, &bytes[bom_len..]),
        None => (encoding, bytes),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| Error::Decoding(format!("body is not valid {}", encoding.name())))
}
