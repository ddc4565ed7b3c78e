//! Embedded runtime abstraction
//!
//! The bridge never calls the Dart embedding API directly. Everything goes
//! through [`EmbeddedRuntime`], which the production backend in [`dart`]
//! implements over the dynamically loaded `dart_dll` library and which tests
//! replace with a recording mock.

pub mod dart;
pub mod loader;

use std::path::Path;
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::error::BridgeResult;

/// One started VM with (at most) one isolate running the embedded script.
///
/// Methods other than `shutdown` assume the caller holds the execution
/// context guard, so implementations need not serialize them internally.
pub trait EmbeddedRuntime: Send + Sync {
    /// Create the isolate for `script`, resolving packages via `package_config`.
    ///
    /// On success the isolate exists but the current thread is not inside it.
    fn load_script(&self, script: &Path, package_config: &Path) -> BridgeResult<()>;

    /// Make the isolate current on the calling thread
    fn enter_isolate(&self);

    /// Leave the current isolate
    fn exit_isolate(&self);

    /// Open a local handle scope
    fn enter_scope(&self);

    /// Close the innermost handle scope
    fn exit_scope(&self);

    /// Call a top-level function of the root library with no arguments
    fn invoke(&self, function: &str) -> BridgeResult<()>;

    /// Run pending microtasks
    fn drain_microtasks(&self) -> BridgeResult<()>;

    /// Shut the current isolate down. Must be called while entered; on
    /// return no isolate is current.
    fn shutdown_isolate(&self);

    /// Tear the VM down
    fn shutdown(&self) -> BridgeResult<()>;
}

/// Starts a VM for a given configuration
pub trait RuntimeFactory: Send + Sync {
    /// Start the VM (service isolate included, when enabled)
    fn start(&self, config: &BridgeConfig) -> BridgeResult<Arc<dyn EmbeddedRuntime>>;
}

/// Scoped runtime handle scope, closed on drop
pub(crate) struct RuntimeScope<'a> {
    runtime: &'a dyn EmbeddedRuntime,
}

impl<'a> RuntimeScope<'a> {
    pub(crate) fn open(runtime: &'a dyn EmbeddedRuntime) -> Self {
        runtime.enter_scope();
        RuntimeScope { runtime }
    }
}

impl Drop for RuntimeScope<'_> {
    fn drop(&mut self) {
        self.runtime.exit_scope();
    }
}
