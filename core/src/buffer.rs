//! Growable buffer that accumulates a streamed response body.
//!
//! # Design
//! The storage always ends in a single NUL byte, so the accumulated body is a
//! valid C string at every point of the transfer. `len()` counts only the
//! meaningful bytes.
//! Growth goes through `Vec::try_reserve`, so an allocation failure surfaces
//! as `ApiError::OutOfMemory` instead of aborting the process. An optional
//! byte limit fails the same way.

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    /// Body bytes followed by exactly one NUL terminator.
    data: Vec<u8>,
    limit: Option<usize>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            data: vec![0],
            limit: None,
        }
    }

    /// A buffer that refuses to hold more than `limit` body bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: vec![0],
            limit: Some(limit),
        }
    }

    /// Append one chunk, keeping everything received so far.
    ///
    /// On failure the buffer keeps its previous contents and the caller must
    /// abort the transfer.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), ApiError> {
        if chunk.is_empty() {
            return Ok(());
        }
        let new_len = self
            .len()
            .checked_add(chunk.len())
            .ok_or(ApiError::OutOfMemory)?;
        if self.limit.is_some_and(|limit| new_len > limit) {
            return Err(ApiError::OutOfMemory);
        }
        self.data
            .try_reserve(chunk.len())
            .map_err(|_| ApiError::OutOfMemory)?;

        // Overwrite the old terminator, then re-terminate.
        self.data.pop();
        self.data.extend_from_slice(chunk);
        self.data.push(0);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The body without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.data
    }

    /// The body as text; invalid UTF-8 sequences are replaced.
    pub fn into_text(self) -> String {
        let mut data = self.data;
        data.pop();
        match String::from_utf8(data) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }
}

/// An unlimited buffer holding a body that is already in memory.
impl From<&[u8]> for ResponseBuffer {
    fn from(body: &[u8]) -> Self {
        let mut data = Vec::with_capacity(body.len() + 1);
        data.extend_from_slice(body);
        data.push(0);
        Self { data, limit: None }
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}
