//! Dart backend over the `dart_dll` embedding library
//!
//! Loads the library at runtime, resolves the small subset of the embedding
//! API the bridge needs, and exposes it as an [`EmbeddedRuntime`].

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use super::loader::Library;
use super::{EmbeddedRuntime, RuntimeFactory};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::marshal;

/// Library stem of the embedding library
pub const DART_LIBRARY_STEM: &str = "dart_dll";

type DartIsolate = *mut c_void;
type DartHandle = *mut c_void;

/// Startup options understood by `DartDll_Initialize`
#[repr(C)]
struct DartDllConfig {
    start_service_isolate: bool,
    service_port: c_int,
}

// ============================================================================
// Resolved symbols
// ============================================================================

struct DartApi {
    initialize: unsafe extern "C" fn(*const DartDllConfig) -> bool,
    load_script: unsafe extern "C" fn(*const c_char, *const c_char) -> DartIsolate,
    drain_microtasks: unsafe extern "C" fn() -> DartHandle,
    dll_shutdown: unsafe extern "C" fn() -> bool,
    enter_isolate: unsafe extern "C" fn(DartIsolate),
    exit_isolate: unsafe extern "C" fn(),
    shutdown_isolate: unsafe extern "C" fn(),
    enter_scope: unsafe extern "C" fn(),
    exit_scope: unsafe extern "C" fn(),
    root_library: unsafe extern "C" fn() -> DartHandle,
    is_error: unsafe extern "C" fn(DartHandle) -> bool,
    get_error: unsafe extern "C" fn(DartHandle) -> *const c_char,
    new_string: unsafe extern "C" fn(*const c_char) -> DartHandle,
    invoke: unsafe extern "C" fn(DartHandle, DartHandle, c_int, *mut DartHandle) -> DartHandle,
}

impl DartApi {
    fn resolve(lib: &Library) -> BridgeResult<Self> {
        // SAFETY: every signature mirrors the embedding library's headers.
        unsafe {
            Ok(DartApi {
                initialize: lib.get("DartDll_Initialize")?,
                load_script: lib.get("DartDll_LoadScript")?,
                drain_microtasks: lib.get("DartDll_DrainMicrotaskQueue")?,
                dll_shutdown: lib.get("DartDll_Shutdown")?,
                enter_isolate: lib.get("Dart_EnterIsolate")?,
                exit_isolate: lib.get("Dart_ExitIsolate")?,
                shutdown_isolate: lib.get("Dart_ShutdownIsolate")?,
                enter_scope: lib.get("Dart_EnterScope")?,
                exit_scope: lib.get("Dart_ExitScope")?,
                root_library: lib.get("Dart_RootLibrary")?,
                is_error: lib.get("Dart_IsError")?,
                get_error: lib.get("Dart_GetError")?,
                new_string: lib.get("Dart_NewStringFromCString")?,
                invoke: lib.get("Dart_Invoke")?,
            })
        }
    }

    /// Error text of `handle`, if it is an error handle
    unsafe fn error_of(&self, handle: DartHandle) -> Option<String> {
        if !(self.is_error)(handle) {
            return None;
        }
        let msg = (self.get_error)(handle);
        if msg.is_null() {
            Some("unknown error".to_string())
        } else {
            Some(CStr::from_ptr(msg).to_string_lossy().into_owned())
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Starts [`DartDllRuntime`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct DartDllFactory;

impl DartDllFactory {
    fn library_path(config: &BridgeConfig) -> PathBuf {
        config
            .runtime_library
            .clone()
            .unwrap_or_else(|| Library::file_name(DART_LIBRARY_STEM))
    }
}

impl RuntimeFactory for DartDllFactory {
    fn start(&self, config: &BridgeConfig) -> BridgeResult<Arc<dyn EmbeddedRuntime>> {
        let path = Self::library_path(config);
        let library = Library::open(&path)?;
        let api = DartApi::resolve(&library)?;

        let dll_config = DartDllConfig {
            start_service_isolate: config.start_service_isolate,
            service_port: c_int::from(config.service_port),
        };

        if !unsafe { (api.initialize)(&dll_config) } {
            return Err(BridgeError::RuntimeStart(format!(
                "DartDll_Initialize failed ({})",
                library.path().display()
            )));
        }

        tracing::debug!(library = %library.path().display(), "Dart VM initialized");

        Ok(Arc::new(DartDllRuntime {
            api,
            isolate: AtomicPtr::new(ptr::null_mut()),
            shut_down: AtomicBool::new(false),
            _library: library,
        }))
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// A started Dart VM hosting one script isolate
pub struct DartDllRuntime {
    api: DartApi,
    isolate: AtomicPtr<c_void>,
    shut_down: AtomicBool,
    // Keeps the resolved symbols valid
    _library: Library,
}

impl EmbeddedRuntime for DartDllRuntime {
    fn load_script(&self, script: &Path, package_config: &Path) -> BridgeResult<()> {
        let script_c = marshal::path_to_cstring(script);
        let packages_c = marshal::path_to_cstring(package_config);

        let isolate = unsafe { (self.api.load_script)(script_c.as_ptr(), packages_c.as_ptr()) };
        if isolate.is_null() {
            return Err(BridgeError::ScriptLoad {
                path: script.to_path_buf(),
                reason: "DartDll_LoadScript returned no isolate".to_string(),
            });
        }

        self.isolate.store(isolate, Ordering::SeqCst);
        Ok(())
    }

    fn enter_isolate(&self) {
        let isolate = self.isolate.load(Ordering::SeqCst);
        if !isolate.is_null() {
            unsafe { (self.api.enter_isolate)(isolate) };
        }
    }

    fn exit_isolate(&self) {
        if !self.isolate.load(Ordering::SeqCst).is_null() {
            unsafe { (self.api.exit_isolate)() };
        }
    }

    fn enter_scope(&self) {
        unsafe { (self.api.enter_scope)() };
    }

    fn exit_scope(&self) {
        unsafe { (self.api.exit_scope)() };
    }

    fn invoke(&self, function: &str) -> BridgeResult<()> {
        let name_c = marshal::to_cstring(function);
        unsafe {
            let library = (self.api.root_library)();
            if let Some(reason) = self.api.error_of(library) {
                return Err(BridgeError::EntryPoint {
                    name: function.to_string(),
                    reason,
                });
            }

            let name = (self.api.new_string)(name_c.as_ptr());
            let result = (self.api.invoke)(library, name, 0, ptr::null_mut());
            match self.api.error_of(result) {
                Some(reason) => Err(BridgeError::EntryPoint {
                    name: function.to_string(),
                    reason,
                }),
                None => Ok(()),
            }
        }
    }

    fn drain_microtasks(&self) -> BridgeResult<()> {
        unsafe {
            let result = (self.api.drain_microtasks)();
            match self.api.error_of(result) {
                Some(reason) => Err(BridgeError::Runtime(reason)),
                None => Ok(()),
            }
        }
    }

    fn shutdown_isolate(&self) {
        if !self.isolate.swap(ptr::null_mut(), Ordering::SeqCst).is_null() {
            unsafe { (self.api.shutdown_isolate)() };
        }
    }

    fn shutdown(&self) -> BridgeResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if unsafe { (self.api.dll_shutdown)() } {
            Ok(())
        } else {
            Err(BridgeError::Runtime("DartDll_Shutdown failed".to_string()))
        }
    }
}
