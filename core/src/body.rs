//! Request body variants and their wire encodings.
//!
//! # Design
//! A request carries exactly one `Body`. Multipart parts may be backed by a
//! stream or a file when they are handed to the builder; the builder loads
//! them into memory when the request is finalized, so the finished `Request`
//! is `Clone` and an interceptor can send it more than once.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use url::form_urlencoded;
use uuid::Uuid;

/// Content type of a text part that does not set one.
pub const TEXT_PART_CONTENT_TYPE: &str = "plain/text; charset=utf-8";

/// Content type of a file part that does not set one.
pub const FILE_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// The body of a finalized request.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs, in order.
    Form(Vec<(String, String)>),
    Multipart {
        boundary: String,
        fields: Vec<MultipartField>,
    },
    /// Serialized JSON document.
    Json(Vec<u8>),
    Raw {
        content: Vec<u8>,
        content_type: String,
    },
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn content_type(&self, charset: &'static Encoding) -> Option<String> {
        match self {
            Body::Empty => None,
            Body::Form(_) => Some(format!(
                "application/x-www-form-urlencoded; charset={}",
                charset.name()
            )),
            Body::Multipart { boundary, .. } => {
                Some(format!("multipart/form-data; boundary={boundary}"))
            }
            Body::Json(_) => Some("application/json; charset=UTF-8".to_string()),
            Body::Raw { content_type, .. } => Some(content_type.clone()),
        }
    }

    /// Bytes as they go on the wire.
    pub fn encode(&self, charset: &'static Encoding) -> Vec<u8> {
        match self {
            Body::Empty => Vec::new(),
            Body::Form(pairs) => encode_pairs(pairs, charset).into_bytes(),
            Body::Multipart { boundary, fields } => encode_multipart(boundary, fields),
            Body::Json(content) | Body::Raw { content, .. } => content.clone(),
        }
    }
}

/// One field of a multipart body, loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub content: Vec<u8>,
}

enum PartSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Bytes(Vec<u8>),
    Text(String),
}

/// A named field or file for `RequestBuilder::multi_part_body`.
pub struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    source: PartSource,
}

impl Part {
    /// A file part whose content is read from `reader` when the request is
    /// sent.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: None,
            source: PartSource::Reader(Box::new(reader)),
        }
    }

    /// A file part read from disk; the file name is taken from `path`.
    pub fn file_path(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: name.into(),
            file_name: Some(file_name),
            content_type: None,
            source: PartSource::File(path.to_path_buf()),
        }
    }

    pub fn bytes(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: None,
            source: PartSource::Bytes(content.into()),
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            source: PartSource::Text(value.into()),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn load(self) -> io::Result<MultipartField> {
        let default_type = match self.source {
            PartSource::Text(_) => TEXT_PART_CONTENT_TYPE,
            _ => FILE_PART_CONTENT_TYPE,
        };
        let content_type = self
            .content_type
            .unwrap_or_else(|| default_type.to_string());
        let content = match self.source {
            PartSource::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                buf
            }
            PartSource::File(path) => {
                let mut buf = Vec::new();
                File::open(&path)?.read_to_end(&mut buf)?;
                buf
            }
            PartSource::Bytes(bytes) => bytes,
            PartSource::Text(text) => text.into_bytes(),
        };
        Ok(MultipartField {
            name: self.name,
            file_name: self.file_name,
            content_type,
            content,
        })
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

pub(crate) fn new_boundary() -> String {
    format!("----RequestsCoreBoundary{}", Uuid::new_v4().simple())
}

/// Percent-encode `pairs` as `k=v&k=v` after converting them to `charset`.
pub(crate) fn encode_pairs(pairs: &[(String, String)], charset: &'static Encoding) -> String {
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_component(key, charset),
                encode_component(value, charset)
            )
        })
        .collect();
    encoded.join("&")
}

fn encode_component(text: &str, charset: &'static Encoding) -> String {
    let (bytes, _, _) = charset.encode(text);
    form_urlencoded::byte_serialize(&bytes).collect()
}

fn encode_multipart(boundary: &str, fields: &[MultipartField]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quoted(&field.name)
        );
        if let Some(file_name) = &field.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
        }
        out.extend_from_slice(disposition.as_bytes());
        out.extend_from_slice(format!("\r\nContent-Type: {}\r\n\r\n", field.content_type).as_bytes());
        out.extend_from_slice(&field.content);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    out
}

// Quotes and line breaks inside quoted-string parameters.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
