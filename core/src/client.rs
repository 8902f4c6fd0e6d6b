//! The four Neocities API operations.
//!
//! # Design
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`; both
//! are pure. `info`, `list`, `delete` and `upload` join them through the
//! `RequestExecutor`, which is the only place that does I/O.
//!
//! Credentials are checked in `build_*`, so an operation that needs them
//! fails with `ApiError::Auth` before any network or file access.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::config::ClientConfig;
use crate::decode;
use crate::error::{ApiError, TransportError};
use crate::executor::RequestExecutor;
use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse, MultipartPart, RequestBody};
use crate::transport::{Transport, UreqTransport};
use crate::types::{FileList, SiteInfo, UploadFile};

/// Characters left as-is in query values and form values. `/` stays
/// readable since site paths are full of it.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Synchronous client for the Neocities API.
///
/// Holds configuration and a transport only; no state carries over from one
/// call to the next.
#[derive(Debug, Clone)]
pub struct NeocitiesClient<T = UreqTransport> {
    base_url: String,
    executor: RequestExecutor<T>,
}

impl NeocitiesClient<UreqTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_transport(config, transport)
    }
}

impl Default for NeocitiesClient<UreqTransport> {
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

impl<T: Transport> NeocitiesClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            executor: RequestExecutor::new(transport, config.max_response_bytes),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    // -- Info ---------------------------------------------------------------

    /// `GET /api/info`, for `sitename` or, without one, the public default.
    pub fn info(&self, sitename: Option<&str>) -> Result<SiteInfo, ApiError> {
        let request = self.build_info(sitename);
        self.parse_info(self.executor.execute(&request)?)
    }

    pub fn build_info(&self, sitename: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url_with_query("/api/info", "sitename", sitename),
            credentials: None,
            body: RequestBody::Empty,
        }
    }

    pub fn parse_info(&self, response: HttpResponse) -> Result<SiteInfo, ApiError> {
        check_status(&response)?;
        let root = decode::parse_json(response.body.as_bytes())?;
        decode::decode_site_info(&root)
    }

    // -- List ---------------------------------------------------------------

    /// `GET /api/list`, optionally limited to the directory `path`.
    pub fn list(&self, credentials: Option<&Credentials>, path: Option<&str>) -> Result<FileList, ApiError> {
        let request = self.build_list(credentials, path)?;
        self.parse_list(self.executor.execute(&request)?)
    }

    pub fn build_list(&self, credentials: Option<&Credentials>, path: Option<&str>) -> Result<HttpRequest, ApiError> {
        let credentials = require_credentials(credentials)?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.url_with_query("/api/list", "path", path),
            credentials: Some(credentials),
            body: RequestBody::Empty,
        })
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<FileList, ApiError> {
        check_status(&response)?;
        let root = decode::parse_json(response.body.as_bytes())?;
        decode::decode_file_list(&root)
    }

    // -- Delete -------------------------------------------------------------

    /// `POST /api/delete`. Returns the server's response text unchanged.
    pub fn delete<S: AsRef<str>>(
        &self,
        credentials: Option<&Credentials>,
        filenames: &[S],
    ) -> Result<String, ApiError> {
        let request = self.build_delete(credentials, filenames)?;
        self.parse_delete(self.executor.execute(&request)?)
    }

    pub fn build_delete<S: AsRef<str>>(
        &self,
        credentials: Option<&Credentials>,
        filenames: &[S],
    ) -> Result<HttpRequest, ApiError> {
        let credentials = require_credentials(credentials)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/api/delete", self.base_url),
            credentials: Some(credentials),
            body: RequestBody::Form(encode_delete_form(filenames)),
        })
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body.into_text())
    }

    // -- Upload -------------------------------------------------------------

    /// `POST /api/upload` with one multipart part per file. Returns the
    /// server's response text unchanged.
    pub fn upload(&self, credentials: Option<&Credentials>, files: &[UploadFile]) -> Result<String, ApiError> {
        let request = self.build_upload(credentials, files)?;
        debug!(files = files.len(), "uploading");
        self.parse_upload(self.executor.execute(&request)?)
    }

    pub fn build_upload(&self, credentials: Option<&Credentials>, files: &[UploadFile]) -> Result<HttpRequest, ApiError> {
        let credentials = require_credentials(credentials)?;
        let parts = files
            .iter()
            .map(|file| MultipartPart {
                name: file.remote_name.clone(),
                path: file.local_path.clone(),
            })
            .collect();
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/api/upload", self.base_url),
            credentials: Some(credentials),
            body: RequestBody::Multipart(parts),
        })
    }

    pub fn parse_upload(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body.into_text())
    }

    fn url_with_query(&self, path: &str, key: &str, value: Option<&str>) -> String {
        match value {
            Some(value) => format!(
                "{}{path}?{key}={}",
                self.base_url,
                utf8_percent_encode(value, COMPONENT)
            ),
            None => format!("{}{path}", self.base_url),
        }
    }
}

/// `filenames[]=<name>&` for every name, names percent-encoded.
pub fn encode_delete_form<S: AsRef<str>>(filenames: &[S]) -> String {
    filenames
        .iter()
        .map(|name| format!("filenames[]={}&", utf8_percent_encode(name.as_ref(), COMPONENT)))
        .collect()
}

fn require_credentials(credentials: Option<&Credentials>) -> Result<Credentials, ApiError> {
    match credentials {
        Some(credentials) if !credentials.is_empty() => Ok(credentials.clone()),
        _ => Err(ApiError::Auth("an API key is required".to_string())),
    }
}

/// Reject a response a host built from a failed exchange.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status >= 400 {
        return Err(TransportError::Status {
            status: response.status,
        }
        .into());
    }
    Ok(())
}
