//! Executes one `HttpRequest` and classifies the outcome.
//!
//! # Design
//! A call moves through `Built -> Sent -> Succeeded | Failed` exactly once:
//! `prepare` turns the request into wire form (headers, form body, multipart
//! body read from disk), the transport streams the response into a
//! `ResponseBuffer`, and the status decides who owns that buffer. On any
//! failure, status >= 400 included, the buffer is dropped here and the
//! caller only sees the error.

use std::fs;
use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use crate::buffer::ResponseBuffer;
use crate::error::{ApiError, TransportError};
use crate::http::{Credentials, HttpRequest, HttpResponse, MultipartPart, RequestBody};
use crate::transport::{PreparedRequest, Transport};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct RequestExecutor<T> {
    transport: T,
    max_response_bytes: Option<usize>,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T, max_response_bytes: Option<usize>) -> Self {
        Self {
            transport,
            max_response_bytes,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let prepared = prepare(request)?;
        debug!(
            method = prepared.method.as_str(),
            url = %prepared.url,
            body_bytes = prepared.body.as_ref().map_or(0, Vec::len),
            "sending request"
        );

        let mut buffer = match self.max_response_bytes {
            Some(limit) => ResponseBuffer::with_limit(limit),
            None => ResponseBuffer::new(),
        };
        let status = {
            let mut sink = |chunk: &[u8]| buffer.append(chunk);
            self.transport.perform(&prepared, &mut sink)
        };
        let status = match status {
            Ok(status) => status,
            Err(err) => {
                debug!(error = %err, "request failed");
                return Err(err);
            }
        };

        if status >= 400 {
            debug!(status, "request rejected by server");
            return Err(TransportError::Status { status }.into());
        }
        debug!(status, bytes = buffer.len(), "request succeeded");
        Ok(HttpResponse {
            status,
            body: buffer,
        })
    }
}

/// Turn a request into its wire form.
///
/// Multipart files are read here, so a missing file fails before any
/// network I/O.
pub fn prepare(request: &HttpRequest) -> Result<PreparedRequest, ApiError> {
    let mut headers = Vec::new();
    if let Some(credentials) = request.credentials.as_ref().filter(|c| !c.is_empty()) {
        headers.push(bearer_header(credentials)?);
    }

    let body = match &request.body {
        RequestBody::Empty => None,
        RequestBody::Form(form) => {
            headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
            Some(form.as_bytes().to_vec())
        }
        RequestBody::Multipart(parts) => {
            let boundary = format!("------------------------{}", Uuid::new_v4().simple());
            let body = encode_multipart(parts, &boundary)?;
            headers.push((
                "Content-Type".to_string(),
                format!("multipart/form-data; boundary={boundary}"),
            ));
            Some(body)
        }
    };

    Ok(PreparedRequest {
        method: request.method,
        url: request.url.clone(),
        headers,
        body,
    })
}

/// `Authorization: Bearer <token>`, rejecting tokens that cannot form a
/// valid header value.
pub fn bearer_header(credentials: &Credentials) -> Result<(String, String), ApiError> {
    let token = credentials.token();
    if token.chars().any(char::is_control) {
        return Err(ApiError::Auth(
            "API key contains control characters".to_string(),
        ));
    }
    if !token.is_ascii() {
        return Err(ApiError::Auth("API key contains non-ASCII characters".to_string()));
    }
    Ok(("Authorization".to_string(), format!("Bearer {token}")))
}

/// Build a `multipart/form-data` body, one part per file.
pub fn encode_multipart(parts: &[MultipartPart], boundary: &str) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    for part in parts {
        let contents = fs::read(&part.path).map_err(|err| TransportError::LocalFile {
            path: part.path.clone(),
            message: err.to_string(),
        })?;
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_disposition(&part.name),
                escape_disposition(&file_name(&part.path)),
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(body)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Quote-safe form of a name inside a `Content-Disposition` parameter.
fn escape_disposition(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::ChunkSink;

    /// Replays a canned response in fixed-size chunks.
    struct CannedTransport {
        status: u16,
        body: Vec<u8>,
        chunk: usize,
        chunks_sent: Cell<usize>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.as_bytes().to_vec(),
                chunk: 3,
                chunks_sent: Cell::new(0),
            }
        }
    }

    impl Transport for CannedTransport {
        fn perform(&self, _request: &PreparedRequest, sink: &mut ChunkSink<'_>) -> Result<u16, ApiError> {
            for chunk in self.body.chunks(self.chunk) {
                self.chunks_sent.set(self.chunks_sent.get() + 1);
                sink(chunk)?;
            }
            Ok(self.status)
        }
    }

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            credentials: None,
            body: RequestBody::Empty,
        }
    }

    #[test]
    fn success_hands_over_the_whole_body() {
        let executor = RequestExecutor::new(CannedTransport::new(200, "{\"result\":\"success\"}"), None);
        let response = executor.execute(&get("http://x/api/info")).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_bytes(), b"{\"result\":\"success\"}");
        assert!(executor.transport().chunks_sent.get() > 1);
    }

    #[test]
    fn redirect_status_is_not_an_error() {
        let executor = RequestExecutor::new(CannedTransport::new(302, ""), None);
        let response = executor.execute(&get("http://x/")).unwrap();
        assert_eq!(response.status, 302);
    }

    #[test]
    fn error_status_drops_the_body() {
        let executor = RequestExecutor::new(CannedTransport::new(404, "{\"result\":\"error\"}"), None);
        let err = executor.execute(&get("http://x/api/info")).unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Status { status: 404 })));
    }

    #[test]
    fn status_400_is_the_first_failure() {
        let ok = RequestExecutor::new(CannedTransport::new(399, ""), None);
        assert!(ok.execute(&get("http://x/")).is_ok());
        let failed = RequestExecutor::new(CannedTransport::new(400, ""), None);
        assert!(failed.execute(&get("http://x/")).is_err());
    }

    #[test]
    fn append_failure_aborts_transfer() {
        let executor = RequestExecutor::new(CannedTransport::new(200, "0123456789abcdef"), Some(5));
        let err = executor.execute(&get("http://x/")).unwrap_err();
        assert!(matches!(err, ApiError::OutOfMemory));
        // The second 3-byte chunk pushes the body past the limit.
        assert_eq!(executor.transport().chunks_sent.get(), 2);
    }

    #[test]
    fn bearer_header_only_when_token_present() {
        let mut request = get("http://x/api/list");
        assert!(prepare(&request).unwrap().headers.is_empty());

        request.credentials = Some(Credentials::new(""));
        assert!(prepare(&request).unwrap().headers.is_empty());

        request.credentials = Some(Credentials::new("abc123"));
        let prepared = prepare(&request).unwrap();
        assert_eq!(
            prepared.headers,
            vec![("Authorization".to_string(), "Bearer abc123".to_string())]
        );
    }

    #[test]
    fn long_tokens_are_not_truncated() {
        let token = "k".repeat(4096);
        let (_, value) = bearer_header(&Credentials::new(token.clone())).unwrap();
        assert_eq!(value, format!("Bearer {token}"));
    }

    #[test]
    fn tokens_with_newlines_are_rejected() {
        let err = bearer_header(&Credentials::new("abc\r\nX-Evil: 1")).unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[test]
    fn non_ascii_tokens_are_rejected() {
        let err = bearer_header(&Credentials::new("clé")).unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[test]
    fn form_body_sets_content_type() {
        let mut request = get("http://x/api/delete");
        request.method = HttpMethod::Post;
        request.body = RequestBody::Form("filenames[]=a.txt&".to_string());
        let prepared = prepare(&request).unwrap();
        assert_eq!(prepared.body.as_deref(), Some(&b"filenames[]=a.txt&"[..]));
        assert!(prepared
            .headers
            .contains(&("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())));
    }

    #[test]
    fn multipart_body_carries_each_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<h1>hello</h1>").unwrap();

        let parts = vec![MultipartPart {
            name: "dir/index.html".to_string(),
            path: file.path().to_path_buf(),
        }];
        let body = encode_multipart(&parts, "BOUNDARY").unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--BOUNDARY\r\n"));
        assert!(text.contains("name=\"dir/index.html\""));
        assert!(text.contains("\r\n\r\n<h1>hello</h1>\r\n"));
        assert!(text.ends_with("--BOUNDARY--\r\n"));
    }

    #[test]
    fn multipart_quotes_are_escaped() {
        assert_eq!(escape_disposition("a\"b\r\n"), "a%22b%0D%0A");
    }

    #[test]
    fn missing_multipart_file_fails_before_sending() {
        let transport = CannedTransport::new(200, "ok");
        let executor = RequestExecutor::new(transport, None);
        let mut request = get("http://x/api/upload");
        request.method = HttpMethod::Post;
        request.body = RequestBody::Multipart(vec![MultipartPart {
            name: "index.html".to_string(),
            path: "/definitely/not/here.html".into(),
        }]);
        let err = executor.execute(&request).unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::LocalFile { .. })));
        assert_eq!(executor.transport().chunks_sent.get(), 0);
    }

    #[test]
    fn multipart_request_gets_boundary_header() {
        let mut request = get("http://x/api/upload");
        request.method = HttpMethod::Post;
        request.body = RequestBody::Multipart(Vec::new());
        let prepared = prepare(&request).unwrap();
        let (_, content_type) = prepared
            .headers
            .iter()
            .find(|(name, _)| name == "Content-Type")
            .unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = String::from_utf8(prepared.body.unwrap()).unwrap();
        assert_eq!(body, format!("--{boundary}--\r\n"));
    }
}
