//! Error types for the Neocities API client.
//!
//! # Design
//! Every failure collapses into one of four kinds: transport, out-of-memory,
//! protocol and auth. Lower layers map their own failures into one of these
//! and return immediately, so callers match on a single enum and never get a
//! partial result next to an error.
//!
//! HTTP status failures live under `Transport` and deliberately do not carry
//! the response body: an error body is dropped together with its buffer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by every `NeocitiesClient` operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, timeout or HTTP status failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response buffer could not grow to hold the next chunk.
    #[error("out of memory while buffering the response body")]
    OutOfMemory,

    /// The body is not JSON, or lacks a required field or shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Credentials were required but missing, empty or malformed.
    #[error("authentication error: {0}")]
    Auth(String),
}

/// The failure modes folded into `ApiError::Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect or total transfer timeout expired.
    #[error("request timed out")]
    Timeout,

    /// DNS, TCP, TLS or socket I/O failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a status code >= 400.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// A multipart part's local file could not be read.
    #[error("could not read {}: {message}", path.display())]
    LocalFile { path: PathBuf, message: String },
}

/// Discriminant of `ApiError`, handy for FFI codes and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    OutOfMemory,
    Protocol,
    Auth,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::OutOfMemory => ErrorKind::OutOfMemory,
            ApiError::Protocol(_) => ErrorKind::Protocol,
            ApiError::Auth(_) => ErrorKind::Auth,
        }
    }

    /// HTTP status of a `TransportError::Status` failure, if that is what this is.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Transport(TransportError::Status { status }) => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        ApiError::Protocol(msg.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Protocol(format!("invalid JSON: {err}"))
    }
}
