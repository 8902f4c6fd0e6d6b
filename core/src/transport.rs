//! The network seam.
//!
//! # Design
//! The executor hands a `PreparedRequest` (final URL, headers, encoded body)
//! to a `Transport` together with a sink callback. The transport delivers
//! response bytes to the sink as they arrive and returns the status code.
//! A sink error aborts the transfer on the spot: the transport returns that
//! error without reading further.
//!
//! `UreqTransport` builds a fresh blocking agent for each call, so no
//! connection state is shared between calls.

use std::io::{self, Read};
use std::time::Duration;

use tracing::{debug, trace};
use ureq::tls::TlsConfig;

use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::HttpMethod;

const CHUNK_SIZE: usize = 16 * 1024;

/// A request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Receives each response chunk; returning an error aborts the transfer.
pub type ChunkSink<'a> = dyn FnMut(&[u8]) -> Result<(), ApiError> + 'a;

/// Performs one HTTP exchange.
pub trait Transport {
    /// Send `request`, stream the response body into `sink`, and return the
    /// HTTP status. Statuses >= 400 are returned, not treated as errors.
    fn perform(&self, request: &PreparedRequest, sink: &mut ChunkSink<'_>) -> Result<u16, ApiError>;
}

/// Blocking transport backed by `ureq`, with TLS verification always on and
/// redirects never followed.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    connect_timeout: Duration,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            timeout: config.timeout,
        }
    }

    fn agent(&self) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .timeout_connect(Some(self.connect_timeout))
            .timeout_global(Some(self.timeout))
            .tls_config(TlsConfig::builder().disable_verification(false).build())
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn perform(&self, request: &PreparedRequest, sink: &mut ChunkSink<'_>) -> Result<u16, ApiError> {
        let agent = self.agent();

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_slice()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        debug!(status, "response headers received");

        let mut reader = response.body_mut().as_reader();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(map_io_error(err)),
            };
            trace!(bytes = n, "response chunk");
            sink(&chunk[..n])?;
        }
        Ok(status)
    }
}

fn map_ureq_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout.into(),
        ureq::Error::StatusCode(status) => TransportError::Status { status }.into(),
        ureq::Error::Io(err) => map_io_error(err),
        other => TransportError::Connection(other.to_string()).into(),
    }
}

fn map_io_error(err: io::Error) -> ApiError {
    if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
        return TransportError::Timeout.into();
    }
    // Body reads report ureq's own errors (global timeout included) wrapped
    // in an io::Error.
    let message = err.to_string();
    match err.into_inner().map(|inner| inner.downcast::<ureq::Error>()) {
        Some(Ok(inner)) => map_ureq_error(*inner),
        _ => TransportError::Connection(message).into(),
    }
}
