//! JSON decoding of response bodies into the client's output records.
//!
//! Bodies are parsed into a generic `serde_json::Value` tree first and the
//! typed fields are pulled out by hand, because the server's records are
//! loose: most info fields may be absent or `null`, and only a few shapes
//! (`result`, `info`, `files`, `path`) are hard requirements.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::types::{FileList, SiteInfo};

/// Parse a complete body into a JSON tree.
pub fn parse_json(body: &[u8]) -> Result<Value, ApiError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode an `/api/info` envelope.
///
/// Non-string tag elements are skipped rather than kept as empty slots.
pub fn decode_site_info(root: &Value) -> Result<SiteInfo, ApiError> {
    require_success(root)?;
    let info = root
        .get("info")
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::protocol("missing \"info\" object"))?;

    let tags = match info.get("tags") {
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(SiteInfo {
        sitename: optional_string(info, "sitename"),
        created_at: optional_string(info, "created_at"),
        last_updated: optional_string(info, "last_updated"),
        domain: optional_string(info, "domain"),
        hits: info.get("hits").and_then(Value::as_i64).unwrap_or(0),
        tags,
    })
}

/// Decode an `/api/list` envelope. Every entry must carry a string `path`.
pub fn decode_file_list(root: &Value) -> Result<FileList, ApiError> {
    let files = root
        .get("files")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::protocol("missing \"files\" array"))?;

    let paths = files
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .get("path")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::protocol(format!("file entry {i} has no string \"path\"")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FileList { paths })
}

fn require_success(root: &Value) -> Result<(), ApiError> {
    match root.get("result").and_then(Value::as_str) {
        Some("success") => Ok(()),
        Some(other) => Err(ApiError::protocol(format!("result is \"{other}\""))),
        None => Err(ApiError::protocol("missing \"result\" field")),
    }
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}
