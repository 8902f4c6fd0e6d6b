//! HTTP request and response types as plain data.
//!
//! # Design
//! `NeocitiesClient::build_*` produces an `HttpRequest` describing one call
//! and `parse_*` consumes an `HttpResponse`; the executor sits in between and
//! is the only part that touches the network or the filesystem. Keeping the
//! request as data makes every operation testable without I/O.
//!
//! `RequestBody` is an enum so a request carries a form body or multipart
//! parts, never both.

use std::fmt;
use std::path::PathBuf;

use crate::buffer::ResponseBuffer;

/// HTTP method for a request. The Neocities API only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A bearer API key, supplied per call and never persisted.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// One multipart form part: the form field `name` and the local file whose
/// contents become the part body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Already `application/x-www-form-urlencoded`.
    Form(String),
    /// Read from disk by the executor when the request is sent.
    Multipart(Vec<MultipartPart>),
}

/// One API call described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub credentials: Option<Credentials>,
    pub body: RequestBody,
}

/// A successful (status < 400) response with its fully buffered body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBuffer,
}

impl HttpResponse {
    /// Build a response from a complete body, mostly for tests and vectors.
    pub fn from_text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: ResponseBuffer::from(body.as_bytes()),
        }
    }
}
