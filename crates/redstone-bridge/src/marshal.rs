//! Boundary marshaling
//!
//! Strings cross the C boundary as NUL-terminated UTF-8. Inputs are borrowed
//! for the duration of one call only; outputs are either caller-owned copies
//! (released with [`free_string`]) or foreign buffers wrapped in
//! [`ForeignText`](redstone_sdk::ForeignText).

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use redstone_sdk::ReplacementText;

/// Borrow a NUL-terminated input string.
///
/// Null reads as the empty string; invalid UTF-8 is replaced.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for `'a`.
pub unsafe fn borrow_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Like [`borrow_str`], but keeps null distinct from empty
///
/// # Safety
/// Same as [`borrow_str`].
pub unsafe fn borrow_opt_str<'a>(ptr: *const c_char) -> Option<Cow<'a, str>> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy())
    }
}

/// Convert to a C string, truncating at the first interior NUL
pub fn to_cstring(s: &str) -> CString {
    let bytes = match s.find('\0') {
        Some(end) => &s.as_bytes()[..end],
        None => s.as_bytes(),
    };
    // No NUL left in `bytes`
    CString::new(bytes).unwrap_or_default()
}

/// Convert a path for a C API, replacing invalid UTF-8
pub fn path_to_cstring(path: &Path) -> CString {
    to_cstring(&path.to_string_lossy())
}

/// Hand a string to a C caller; free it with [`free_string`]
pub fn into_raw_string(s: &str) -> *mut c_char {
    to_cstring(s).into_raw()
}

/// Hand a replacement to a C caller: null for pass-through, else an owned copy
pub fn replacement_into_raw(text: ReplacementText) -> *mut c_char {
    match text.into_string() {
        Some(s) => into_raw_string(&s),
        None => ptr::null_mut(),
    }
}

/// Free a string produced by [`into_raw_string`]. Null is ignored.
///
/// # Safety
/// `ptr` must be null or come from [`into_raw_string`] and not have been
/// freed yet.
pub unsafe fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
