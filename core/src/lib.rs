//! Synchronous client core for the Neocities static-site-hosting API.
//!
//! # Overview
//! `NeocitiesClient` exposes the four API operations (info, list, delete,
//! upload). Each one builds an `HttpRequest` as plain data, runs it through
//! the `RequestExecutor`, and either decodes the JSON body into a typed
//! record (`SiteInfo`, `FileList`) or returns the raw response text.
//!
//! # Design
//! - `build_*` / `parse_*` pairs are pure, so request construction and
//!   response decoding are tested without a network.
//! - The executor streams the body into a `ResponseBuffer` through the
//!   `Transport` seam and keeps it only for status < 400.
//! - Every failure is one of four `ApiError` kinds.
//! - TLS verification is always on and redirects are never followed.
//! - Nothing is logged unless the host installs a `tracing` subscriber, and
//!   API keys are never logged at all.

pub mod buffer;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod executor;
pub mod http;
pub mod transport;
pub mod types;

pub use buffer::ResponseBuffer;
pub use client::NeocitiesClient;
pub use config::ClientConfig;
pub use error::{ApiError, ErrorKind, TransportError};
pub use executor::RequestExecutor;
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse, MultipartPart, RequestBody};
pub use transport::{ChunkSink, PreparedRequest, Transport, UreqTransport};
pub use types::{FileList, SiteInfo, UploadFile};
