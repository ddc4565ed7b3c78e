//! Shared library loading for runtime backends
//!
//! Opens the embedding library (`dart_dll`) at runtime and hands out typed
//! function pointers for its exported symbols. The platform calls live in
//! `sys`; [`Library`] owns the handle and closes it on drop.

use std::ffi::{c_void, CString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use thiserror::Error;

/// Errors that can occur while loading a runtime library
#[derive(Debug, Error)]
pub enum LoadError {
    /// The library could not be opened
    #[error("Cannot open runtime library {path}: {reason}")]
    NotFound {
        /// Path that was attempted
        path: PathBuf,
        /// Loader diagnostic
        reason: String,
    },

    /// A required export is missing
    #[error("Symbol {symbol} not exported by {library}")]
    SymbolNotFound {
        /// Symbol name that was looked up
        symbol: String,
        /// Library path
        library: PathBuf,
    },

    /// A path or symbol name contained a NUL byte
    #[error("Name contains a NUL byte: {0}")]
    InvalidName(String),
}

/// A loaded shared library
pub struct Library {
    raw: NonNull<c_void>,
    path: PathBuf,
}

// Loader handles are process-global and may be used from any thread.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Open a shared library.
    ///
    /// Unix uses `dlopen(RTLD_NOW | RTLD_LOCAL)`, Windows `LoadLibraryW`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = sys::open(path)?;
        Ok(Library {
            raw,
            path: path.to_path_buf(),
        })
    }

    /// Platform file name for a library stem (`dart_dll` → `libdart_dll.so`)
    pub fn file_name(stem: &str) -> PathBuf {
        if cfg!(windows) {
            PathBuf::from(format!("{stem}.dll"))
        } else if cfg!(target_os = "macos") {
            PathBuf::from(format!("lib{stem}.dylib"))
        } else {
            PathBuf::from(format!("lib{stem}.so"))
        }
    }

    /// Resolve an exported function as a pointer of type `T`.
    ///
    /// # Safety
    ///
    /// - `T` must be a function pointer type matching the export's real
    ///   signature
    /// - The library must outlive every copy of the returned pointer
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        let name = CString::new(symbol).map_err(|_| LoadError::InvalidName(symbol.to_string()))?;
        match sys::symbol(self.raw, &name) {
            Some(address) => Ok(std::mem::transmute_copy(&address)),
            None => Err(LoadError::SymbolNotFound {
                symbol: symbol.to_string(),
                library: self.path.clone(),
            }),
        }
    }

    /// Path this library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        sys::close(self.raw);
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}

#[cfg(unix)]
mod sys {
    use super::LoadError;
    use std::ffi::{c_void, CStr, CString};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr::NonNull;

    pub(super) fn open(path: &Path) -> Result<NonNull<c_void>, LoadError> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| LoadError::InvalidName(path.display().to_string()))?;

        // RTLD_LOCAL keeps the VM's symbols out of the JVM's global namespace
        let raw = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        NonNull::new(raw).ok_or_else(|| LoadError::NotFound {
            path: path.to_path_buf(),
            reason: dl_error(),
        })
    }

    pub(super) fn symbol(raw: NonNull<c_void>, name: &CStr) -> Option<*mut c_void> {
        unsafe {
            // Clear stale state so a null export can be told apart from a miss
            libc::dlerror();
            let address = libc::dlsym(raw.as_ptr(), name.as_ptr());
            if address.is_null() || !libc::dlerror().is_null() {
                None
            } else {
                Some(address)
            }
        }
    }

    pub(super) fn close(raw: NonNull<c_void>) {
        unsafe {
            libc::dlclose(raw.as_ptr());
        }
    }

    fn dl_error() -> String {
        let message = unsafe { libc::dlerror() };
        if message.is_null() {
            "dlopen failed".to_string()
        } else {
            unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
        }
    }
}

#[cfg(windows)]
mod sys {
    use super::LoadError;
    use std::ffi::{c_void, CStr};
    use std::os::raw::c_char;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr::NonNull;

    extern "system" {
        fn LoadLibraryW(filename: *const u16) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, name: *const c_char) -> *mut c_void;
        fn FreeLibrary(module: *mut c_void) -> i32;
        fn GetLastError() -> u32;
    }

    pub(super) fn open(path: &Path) -> Result<NonNull<c_void>, LoadError> {
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
        let raw = unsafe { LoadLibraryW(wide.as_ptr()) };
        NonNull::new(raw).ok_or_else(|| LoadError::NotFound {
            path: path.to_path_buf(),
            reason: format!("LoadLibraryW error {}", unsafe { GetLastError() }),
        })
    }

    pub(super) fn symbol(raw: NonNull<c_void>, name: &CStr) -> Option<*mut c_void> {
        let address = unsafe { GetProcAddress(raw.as_ptr(), name.as_ptr()) };
        (!address.is_null()).then_some(address)
    }

    pub(super) fn close(raw: NonNull<c_void>) {
        unsafe {
            FreeLibrary(raw.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_not_found() {
        match Library::open("/nonexistent/libdart_dll.so") {
            Err(LoadError::NotFound { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/libdart_dll.so"))
            }
            Err(other) => panic!("Expected NotFound, got {other}"),
            Ok(lib) => panic!("Unexpectedly opened {:?}", lib),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nul_in_path_is_rejected() {
        assert!(matches!(
            Library::open("lib\0dart.so"),
            Err(LoadError::InvalidName(_))
        ));
    }

    #[test]
    fn test_platform_file_name() {
        let name = Library::file_name("dart_dll");
        assert!(name.to_string_lossy().contains("dart_dll"));
        if cfg!(target_os = "linux") {
            assert_eq!(name, PathBuf::from("libdart_dll.so"));
        }
    }
}
