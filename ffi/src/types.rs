//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core record with C-compatible fields: nullable
//! `*mut c_char` for `Option<String>`, pointer + count for `Vec<String>`.
//! Empty arrays are null with a zero count. Conversion and the matching
//! release routines live here so `lib.rs` stays focused on the `extern "C"`
//! surface. The release routines accept partially populated records (any
//! pointer may be null).

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use neogities_core::{ApiError, ErrorKind, FileList, NeocitiesClient, SiteInfo};

/// Opaque handle to a `NeocitiesClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiNeocitiesClient {
    pub(crate) inner: NeocitiesClient,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Site information from `neocities_info`. String fields are null when the
/// server omitted them or sent a non-string.
///
/// Every string (tags included) is cut at its first NUL: a `\u0000` escape
/// in the JSON ends the C string there.
#[repr(C)]
pub struct FfiSiteInfo {
    pub sitename: *mut c_char,
    pub created_at: *mut c_char,
    pub last_updated: *mut c_char,
    pub domain: *mut c_char,
    pub hits: i64,
    pub tags: *mut *mut c_char,
    pub tag_count: usize,
}

/// File paths from `neocities_list`. A path containing a NUL is cut there.
#[repr(C)]
pub struct FfiFileList {
    pub paths: *mut *mut c_char,
    pub count: usize,
}

impl FfiSiteInfo {
    pub(crate) fn from_core(info: SiteInfo) -> Self {
        let (tags, tag_count) = c_string_array(info.tags);
        FfiSiteInfo {
            sitename: optional_c_string(info.sitename),
            created_at: optional_c_string(info.created_at),
            last_updated: optional_c_string(info.last_updated),
            domain: optional_c_string(info.domain),
            hits: info.hits,
            tags,
            tag_count,
        }
    }

    /// Release every owned field, leaving the struct itself alone.
    pub(crate) fn free_fields(&mut self) {
        for field in [
            &mut self.sitename,
            &mut self.created_at,
            &mut self.last_updated,
            &mut self.domain,
        ] {
            free_c_string(*field);
            *field = std::ptr::null_mut();
        }
        free_c_string_array(self.tags, self.tag_count);
        self.tags = std::ptr::null_mut();
        self.tag_count = 0;
    }
}

impl FfiFileList {
    pub(crate) fn from_core(list: FileList) -> Self {
        let (paths, count) = c_string_array(list.paths);
        FfiFileList { paths, count }
    }

    pub(crate) fn free_fields(&mut self) {
        free_c_string_array(self.paths, self.count);
        self.paths = std::ptr::null_mut();
        self.count = 0;
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiNeocitiesResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    OutOfMemory = 2,
    Protocol = 3,
    Auth = 4,
    Panic = 5,
    NullArg = 6,
    InvalidArg = 7,
}

/// Tag that tells `neocities_free_result` what `FfiNeocitiesResult::data`
/// points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a `FfiSiteInfo*`.
    SiteInfo = 1,
    /// `data` is a `FfiFileList*`.
    FileList = 2,
    /// `data` is a NUL-terminated `char*` with the raw response text. A
    /// response containing NUL bytes reads as ending at the first one.
    Text = 3,
}

/// Result envelope for every operation.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload described by `data_tag`.
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, `http_status` is set for HTTP status failures,
/// and `data` is null.
#[repr(C)]
pub struct FfiNeocitiesResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiNeocitiesResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiNeocitiesResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn error(error_code: FfiErrorCode, http_status: u16, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiNeocitiesResult {
            error_code,
            error_message: c_string(msg).into_raw(),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_site_info(info: SiteInfo) -> *mut Self {
        let data = Box::into_raw(Box::new(FfiSiteInfo::from_core(info)));
        Self::ok(FfiDataTag::SiteInfo, data as *mut c_void)
    }

    pub(crate) fn ok_file_list(list: FileList) -> *mut Self {
        let data = Box::into_raw(Box::new(FfiFileList::from_core(list)));
        Self::ok(FfiDataTag::FileList, data as *mut c_void)
    }

    pub(crate) fn ok_text(text: &str) -> *mut Self {
        Self::ok(FfiDataTag::Text, c_string(text).into_raw() as *mut c_void)
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = match err.kind() {
            ErrorKind::Transport => FfiErrorCode::Transport,
            ErrorKind::OutOfMemory => FfiErrorCode::OutOfMemory,
            ErrorKind::Protocol => FfiErrorCode::Protocol,
            ErrorKind::Auth => FfiErrorCode::Auth,
        };
        Self::error(code, err.http_status().unwrap_or(0), &err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, 0, &format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::InvalidArg, 0, &format!("argument is not valid UTF-8: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, 0, msg)
    }
}

// ---------------------------------------------------------------------------
// C string helpers
// ---------------------------------------------------------------------------

/// A C string that ends where the first NUL would, as C would read it.
pub(crate) fn c_string(s: &str) -> CString {
    let bytes = s.as_bytes();
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}

fn optional_c_string(s: Option<String>) -> *mut c_char {
    match s {
        Some(s) => c_string(&s).into_raw(),
        None => std::ptr::null_mut(),
    }
}

fn c_string_array(items: Vec<String>) -> (*mut *mut c_char, usize) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len();
    let ptrs: Box<[*mut c_char]> = items.iter().map(|s| c_string(s).into_raw()).collect();
    (Box::into_raw(ptrs) as *mut *mut c_char, len)
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

fn free_c_string_array(items: *mut *mut c_char, len: usize) {
    if items.is_null() {
        return;
    }
    let items = unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(items, len)) };
    for item in items.iter() {
        free_c_string(*item);
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn c_string_stops_at_interior_nul() {
        assert_eq!(c_string("ab\0cd").as_bytes(), b"ab");
        assert_eq!(c_string("plain").as_bytes(), b"plain");
    }

    #[test]
    fn text_payload_ends_at_first_nul() {
        let result = FfiNeocitiesResult::ok_text("{\"message\":\"a\0b\"}");
        let r = unsafe { Box::from_raw(result) };
        assert_eq!(r.data_tag, FfiDataTag::Text);
        let text = unsafe { CString::from_raw(r.data as *mut c_char) };
        assert_eq!(text.as_bytes(), b"{\"message\":\"a");
    }

    #[test]
    fn tags_with_nul_are_cut() {
        let info = SiteInfo {
            tags: vec!["art\0ist".to_string()],
            ..SiteInfo::default()
        };
        let mut ffi = FfiSiteInfo::from_core(info);
        let tags = unsafe { std::slice::from_raw_parts(ffi.tags, ffi.tag_count) };
        assert_eq!(unsafe { CStr::from_ptr(tags[0]) }.to_str().unwrap(), "art");
        ffi.free_fields();
    }

    #[test]
    fn site_info_round_trips_fields() {
        let info = SiteInfo {
            sitename: Some("youpi".to_string()),
            domain: None,
            hits: 7,
            tags: vec!["art".to_string(), "music".to_string()],
            ..SiteInfo::default()
        };
        let mut ffi = FfiSiteInfo::from_core(info);
        assert_eq!(unsafe { CStr::from_ptr(ffi.sitename) }.to_str().unwrap(), "youpi");
        assert!(ffi.domain.is_null());
        assert_eq!(ffi.hits, 7);
        assert_eq!(ffi.tag_count, 2);
        let tags = unsafe { std::slice::from_raw_parts(ffi.tags, ffi.tag_count) };
        assert_eq!(unsafe { CStr::from_ptr(tags[1]) }.to_str().unwrap(), "music");

        ffi.free_fields();
        assert!(ffi.sitename.is_null());
        assert!(ffi.tags.is_null());
        // A second release finds nothing left to free.
        ffi.free_fields();
    }

    #[test]
    fn empty_lists_are_null() {
        let mut ffi = FfiFileList::from_core(FileList::default());
        assert!(ffi.paths.is_null());
        assert_eq!(ffi.count, 0);
        ffi.free_fields();
    }

    #[test]
    fn partially_populated_info_frees_cleanly() {
        let mut ffi = FfiSiteInfo {
            sitename: c_string("half").into_raw(),
            created_at: std::ptr::null_mut(),
            last_updated: std::ptr::null_mut(),
            domain: std::ptr::null_mut(),
            hits: 0,
            tags: std::ptr::null_mut(),
            tag_count: 3,
        };
        ffi.free_fields();
        assert!(ffi.sitename.is_null());
    }
}
