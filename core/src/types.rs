//! Output records and operation inputs.
//!
//! # Design
//! Each record owns all of its nested strings, so dropping it releases
//! everything at once, however far decoding got. The `Serialize` /
//! `Deserialize` derives exist for test vectors and for hosts that want to
//! re-emit the records; decoding from the wire goes through `decode`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Public information about a site, from `/api/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteInfo {
    pub sitename: Option<String>,
    pub created_at: Option<String>,
    pub last_updated: Option<String>,
    pub domain: Option<String>,
    #[serde(default)]
    pub hits: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// File paths on a site, from `/api/list`, in server order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileList {
    pub paths: Vec<String>,
}

impl FileList {
    pub fn count(&self) -> usize {
        self.paths.len()
    }
}

/// A local file and the site path it is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub local_path: PathBuf,
    pub remote_name: String,
}

impl UploadFile {
    pub fn new(local_path: impl Into<PathBuf>, remote_name: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_name: remote_name.into(),
        }
    }
}
