//! C-ABI wrapper around `neogities-core`.
//!
//! # Overview
//! Exposes the Neocities client (info, list, delete, upload) through
//! `extern "C"` functions, so C programs can drive the Rust request
//! pipeline directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiNeocitiesResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - Nullable inputs (`sitename`, `path`) mean "omit"; a null API key is the
//!   same as a missing one and yields `Auth`.
//! - The C caller owns all returned pointers and must call the matching
//!   `neocities_*_free` / `neocities_free_result` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::catch_unwind;

use neogities_core::{Credentials, NeocitiesClient, UploadFile};

use types::*;

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Borrow a nullable C string as UTF-8; `Err` carries the ready-made
/// `InvalidArg` result.
fn optional_str<'a>(ptr: *const c_char, name: &str) -> Result<Option<&'a str>, *mut FfiNeocitiesResult> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(Some)
        .map_err(|_| FfiNeocitiesResult::invalid_arg(name))
}

/// Borrow `count` C strings. A null array (with a non-zero count) or a null
/// element is a `NullArg` failure.
fn str_array<'a>(
    ptr: *const *const c_char,
    count: usize,
    name: &str,
) -> Result<Vec<&'a str>, *mut FfiNeocitiesResult> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(FfiNeocitiesResult::null_arg(name));
    }
    let items = unsafe { std::slice::from_raw_parts(ptr, count) };
    items
        .iter()
        .map(|item| match optional_str(*item, name)? {
            Some(s) => Ok(s),
            None => Err(FfiNeocitiesResult::null_arg(name)),
        })
        .collect()
}

fn credentials(api_key: *const c_char) -> Result<Option<Credentials>, *mut FfiNeocitiesResult> {
    Ok(optional_str(api_key, "api_key")?.map(Credentials::new))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`, or to `https://neocities.org` when
/// `base_url` is null.
///
/// Returns null if `base_url` is not UTF-8 or if an internal panic occurs.
/// The caller must free the returned pointer with `neocities_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_client_new(base_url: *const c_char) -> *mut FfiNeocitiesClient {
    catch_unwind(|| {
        let client = if base_url.is_null() {
            NeocitiesClient::default()
        } else {
            match unsafe { CStr::from_ptr(base_url) }.to_str() {
                Ok(url) => NeocitiesClient::new(url),
                Err(_) => return std::ptr::null_mut(),
            }
        };
        Box::into_raw(Box::new(FfiNeocitiesClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `neocities_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_client_free(client: *mut FfiNeocitiesClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// `GET /api/info`. `sitename` may be null.
///
/// Returns a result with `data_tag = SiteInfo` on success.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_info(
    client: *const FfiNeocitiesClient,
    sitename: *const c_char,
) -> *mut FfiNeocitiesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiNeocitiesResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let sitename = match optional_str(sitename, "sitename") {
            Ok(s) => s,
            Err(result) => return result,
        };
        match client.inner.info(sitename) {
            Ok(info) => FfiNeocitiesResult::ok_site_info(info),
            Err(e) => FfiNeocitiesResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiNeocitiesResult::panic("panic in neocities_info"))
}

/// `GET /api/list`. `path` may be null to list the whole site.
///
/// Returns a result with `data_tag = FileList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_list(
    client: *const FfiNeocitiesClient,
    api_key: *const c_char,
    path: *const c_char,
) -> *mut FfiNeocitiesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiNeocitiesResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let args = credentials(api_key).and_then(|key| Ok((key, optional_str(path, "path")?)));
        let (key, path) = match args {
            Ok(args) => args,
            Err(result) => return result,
        };
        match client.inner.list(key.as_ref(), path) {
            Ok(list) => FfiNeocitiesResult::ok_file_list(list),
            Err(e) => FfiNeocitiesResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiNeocitiesResult::panic("panic in neocities_list"))
}

/// `POST /api/delete` for `count` file names.
///
/// Returns a result with `data_tag = Text` (the raw response) on success.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_delete(
    client: *const FfiNeocitiesClient,
    api_key: *const c_char,
    filenames: *const *const c_char,
    count: usize,
) -> *mut FfiNeocitiesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiNeocitiesResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let args = credentials(api_key).and_then(|key| Ok((key, str_array(filenames, count, "filenames")?)));
        let (key, filenames) = match args {
            Ok(args) => args,
            Err(result) => return result,
        };
        match client.inner.delete(key.as_ref(), &filenames) {
            Ok(text) => FfiNeocitiesResult::ok_text(&text),
            Err(e) => FfiNeocitiesResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiNeocitiesResult::panic("panic in neocities_delete"))
}

/// `POST /api/upload`: `local_files[i]` is uploaded as `remote_names[i]`.
///
/// Fails with `Auth` before touching the network or the files when
/// `api_key` is null or empty. Returns a result with `data_tag = Text` on
/// success.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_upload(
    client: *const FfiNeocitiesClient,
    api_key: *const c_char,
    local_files: *const *const c_char,
    remote_names: *const *const c_char,
    count: usize,
) -> *mut FfiNeocitiesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiNeocitiesResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let args = credentials(api_key).and_then(|key| {
            let locals = str_array(local_files, count, "local_files")?;
            let remotes = str_array(remote_names, count, "remote_names")?;
            Ok((key, locals, remotes))
        });
        let (key, locals, remotes) = match args {
            Ok(args) => args,
            Err(result) => return result,
        };
        let files: Vec<UploadFile> = locals
            .into_iter()
            .zip(remotes)
            .map(|(local, remote)| UploadFile::new(local, remote))
            .collect();
        match client.inner.upload(key.as_ref(), &files) {
            Ok(text) => FfiNeocitiesResult::ok_text(&text),
            Err(e) => FfiNeocitiesResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiNeocitiesResult::panic("panic in neocities_upload"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a result returned by any operation, including its payload.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn neocities_free_result(result: *mut FfiNeocitiesResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::SiteInfo => {
                let mut info = unsafe { Box::from_raw(result.data as *mut FfiSiteInfo) };
                info.free_fields();
            }
            FfiDataTag::FileList => {
                let mut list = unsafe { Box::from_raw(result.data as *mut FfiFileList) };
                list.free_fields();
            }
            FfiDataTag::Text => free_c_string(result.data as *mut c_char),
            FfiDataTag::None => {}
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
