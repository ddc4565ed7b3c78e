//! Ownership-tagged strings returned by message-rewrite handlers
//!
//! Chat and death-message handlers may hand a replacement string back to the
//! host. Who frees that string depends on who allocated it, so the result
//! carries the answer explicitly instead of relying on convention:
//!
//! | Variant       | Allocated by     | Freed by                                  |
//! |---------------|------------------|-------------------------------------------|
//! | `PassThrough` | nobody           | nothing to free                           |
//! | `Owned`       | Rust             | Rust, when the value is dropped           |
//! | `Foreign`     | embedded runtime | embedded runtime, via its release routine |
//!
//! The host side never frees a foreign buffer itself. It copies the bytes
//! into its own string and drops the [`ForeignText`], which hands the buffer
//! back to the embedded side.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::ptr::NonNull;

use crate::abi::TextReleaseCallback;

/// Optional replacement text produced by a handler
#[derive(Debug, Default)]
pub enum ReplacementText {
    /// Keep the host's original text
    #[default]
    PassThrough,
    /// Replacement allocated on the Rust side
    Owned(String),
    /// Replacement allocated by the embedded runtime
    Foreign(ForeignText),
}

impl ReplacementText {
    /// Wrap a raw buffer returned by an embedded callback.
    ///
    /// A null pointer means "no replacement".
    ///
    /// # Safety
    /// A non-null `ptr` must point to a NUL-terminated buffer that stays valid
    /// until `release` is called on it (or forever, when `release` is `None`).
    pub unsafe fn from_foreign(ptr: *mut c_char, release: Option<TextReleaseCallback>) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => ReplacementText::Foreign(ForeignText { ptr, release }),
            None => ReplacementText::PassThrough,
        }
    }

    /// Whether the host should keep its own text
    pub fn is_pass_through(&self) -> bool {
        matches!(self, ReplacementText::PassThrough)
    }

    /// Copy the replacement into an owned string, releasing any foreign buffer
    pub fn into_string(self) -> Option<String> {
        match self {
            ReplacementText::PassThrough => None,
            ReplacementText::Owned(s) => Some(s),
            ReplacementText::Foreign(text) => Some(text.to_string_lossy()),
        }
    }
}

impl From<String> for ReplacementText {
    fn from(s: String) -> Self {
        ReplacementText::Owned(s)
    }
}

impl From<&str> for ReplacementText {
    fn from(s: &str) -> Self {
        ReplacementText::Owned(s.to_string())
    }
}

impl From<Option<String>> for ReplacementText {
    fn from(s: Option<String>) -> Self {
        s.map_or(ReplacementText::PassThrough, ReplacementText::Owned)
    }
}

/// A NUL-terminated buffer owned by the embedded runtime
pub struct ForeignText {
    ptr: NonNull<c_char>,
    release: Option<TextReleaseCallback>,
}

// The buffer is uniquely owned by this handle until it is released.
unsafe impl Send for ForeignText {}

impl ForeignText {
    /// Borrow the raw pointer (still owned by the embedded side)
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    /// Copy the bytes into a Rust string, replacing invalid UTF-8
    pub fn to_string_lossy(&self) -> String {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Debug for ForeignText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignText")
            .field("text", &self.to_string_lossy())
            .field("releasable", &self.release.is_some())
            .finish()
    }
}

impl Drop for ForeignText {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            release(self.ptr.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn release_cstring(ptr: *mut c_char) {
        RELEASED.fetch_add(1, Ordering::SeqCst);
        drop(unsafe { CString::from_raw(ptr) });
    }

    #[test]
    fn test_null_is_pass_through() {
        let text = unsafe { ReplacementText::from_foreign(std::ptr::null_mut(), None) };
        assert!(text.is_pass_through());
        assert_eq!(text.into_string(), None);
    }

    #[test]
    fn test_owned_round_trip() {
        let text = ReplacementText::from("HELLO");
        assert!(!text.is_pass_through());
        assert_eq!(text.into_string().as_deref(), Some("HELLO"));
    }

    #[test]
    fn test_foreign_copied_then_released() {
        let raw = CString::new("custom death").unwrap().into_raw();
        let before = RELEASED.load(Ordering::SeqCst);

        let text = unsafe { ReplacementText::from_foreign(raw, Some(release_cstring)) };
        assert_eq!(text.into_string().as_deref(), Some("custom death"));
        assert_eq!(RELEASED.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_foreign_without_release_is_left_alone() {
        let owner = CString::new("kept").unwrap();
        let text = unsafe { ReplacementText::from_foreign(owner.as_ptr() as *mut c_char, None) };
        assert_eq!(text.into_string().as_deref(), Some("kept"));
        // Still readable: ownership never left `owner`
        assert_eq!(owner.to_str().unwrap(), "kept");
    }

    #[test]
    fn test_option_conversion() {
        assert!(ReplacementText::from(None::<String>).is_pass_through());
        assert!(!ReplacementText::from(Some("x".to_string())).is_pass_through());
    }
}
