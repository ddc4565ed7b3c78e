//! Lifecycle controller
//!
//! [`Bridge`] owns the handler registry, the execution-context guard, and the
//! embedded runtime, and moves them through
//! `Uninitialized → Initializing → Running → ShuttingDown → Uninitialized`.
//! The per-event `dispatch_*` methods are implemented in the dispatch module.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::guard::ContextGuard;
use crate::objects::ObjectHandle;
use crate::registry::HandlerRegistry;
use crate::runtime::{EmbeddedRuntime, RuntimeFactory, RuntimeScope};

/// Host-bound chat delivery: `(player_id, message)`
pub type ChatSink = Arc<dyn Fn(i64, &str) + Send + Sync>;

/// The host process as seen from the bridge
pub trait HostEnvironment: Send + Sync {
    /// Release every host object handle held on behalf of the embedded side.
    ///
    /// Returns how many were released.
    fn release_objects(&self) -> BridgeResult<usize>;

    /// Release a single handle; false if it was not live
    fn release_object(&self, handle: ObjectHandle) -> bool;
}

/// Lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// No runtime
    Uninitialized = 0,
    /// `init` in progress
    Initializing = 1,
    /// Runtime up, events are dispatched
    Running = 2,
    /// `shutdown` in progress
    ShuttingDown = 3,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecycleState::Initializing,
            2 => LifecycleState::Running,
            3 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Uninitialized,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// The callback bridge between the host and one embedded runtime
pub struct Bridge {
    config: BridgeConfig,
    factory: Box<dyn RuntimeFactory>,
    state: AtomicU8,
    /// Serializes `init` and `shutdown`
    lifecycle: Mutex<()>,
    pub(crate) runtime: RwLock<Option<Arc<dyn EmbeddedRuntime>>>,
    pub(crate) registry: HandlerRegistry,
    pub(crate) guard: ContextGuard,
    chat_sink: RwLock<Option<ChatSink>>,
    host: RwLock<Option<Arc<dyn HostEnvironment>>>,
}

impl Bridge {
    /// Create an uninitialized bridge
    pub fn new<F>(config: BridgeConfig, factory: F) -> Self
    where
        F: RuntimeFactory + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
            lifecycle: Mutex::new(()),
            runtime: RwLock::new(None),
            registry: HandlerRegistry::new(),
            guard: ContextGuard::new(),
            chat_sink: RwLock::new(None),
            host: RwLock::new(None),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether events are being dispatched
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    fn set_state(&self, state: LifecycleState) {
        let previous = self.state.swap(state as u8, Ordering::SeqCst);
        tracing::debug!(
            from = %LifecycleState::from_u8(previous),
            to = %state,
            "lifecycle transition"
        );
    }

    /// The handler registry
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The execution-context guard
    pub fn guard(&self) -> &ContextGuard {
        &self.guard
    }

    pub(crate) fn runtime(&self) -> Option<Arc<dyn EmbeddedRuntime>> {
        self.runtime.read().clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the runtime and run the script's entry point.
    ///
    /// The entry point is expected to register handlers. On any failure the
    /// partially started runtime is torn down and the bridge stays
    /// Uninitialized, so `init` may be retried.
    pub fn init(&self, script: &Path) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock();

        if self.state() != LifecycleState::Uninitialized {
            tracing::warn!(state = %self.state(), "init rejected: bridge already initialized");
            return Err(BridgeError::AlreadyInitialized);
        }

        self.set_state(LifecycleState::Initializing);
        tracing::info!(script = %script.display(), "initializing bridge");

        match self.start(script) {
            Ok(runtime) => {
                *self.runtime.write() = Some(runtime);
                self.set_state(LifecycleState::Running);
                tracing::info!(
                    script = %script.display(),
                    handlers = self.registry.registered_count(),
                    "bridge running"
                );
                Ok(())
            }
            Err(e) => {
                self.registry.clear();
                self.set_state(LifecycleState::Uninitialized);
                tracing::error!(script = %script.display(), error = %e, "bridge initialization failed");
                Err(e)
            }
        }
    }

    fn start(&self, script: &Path) -> BridgeResult<Arc<dyn EmbeddedRuntime>> {
        if !script.is_file() {
            return Err(BridgeError::ScriptNotFound(script.to_path_buf()));
        }

        let package_config = self.config.package_config_for(script);
        tracing::info!(package_config = %package_config.display(), "using package config");

        let runtime = self.factory.start(&self.config)?;
        if let Err(e) = self.run_entry_point(&runtime, script, &package_config) {
            if let Err(shutdown_err) = runtime.shutdown() {
                tracing::warn!(error = %shutdown_err, "runtime shutdown after failed init also failed");
            }
            return Err(e);
        }
        Ok(runtime)
    }

    fn run_entry_point(
        &self,
        runtime: &Arc<dyn EmbeddedRuntime>,
        script: &Path,
        package_config: &Path,
    ) -> BridgeResult<()> {
        runtime.load_script(script, package_config)?;

        let entry = self.guard.acquire();
        entry.enter(runtime);

        let result = {
            let _scope = RuntimeScope::open(runtime.as_ref());
            let invoked = runtime.invoke(&self.config.entry_point);
            if invoked.is_ok() {
                if let Err(e) = runtime.drain_microtasks() {
                    tracing::warn!(error = %e, "microtask drain after entry point failed");
                }
            }
            invoked
        };

        if result.is_err() {
            entry.shutdown_isolate();
        }
        result
    }

    /// Run pending asynchronous work of the embedded side. No-op unless Running.
    pub fn tick(&self) {
        if !self.is_running() {
            return;
        }

        let entry = self.guard.acquire();
        if !self.is_running() {
            return;
        }
        let Some(runtime) = self.runtime() else {
            return;
        };
        entry.enter(&runtime);
        if let Err(e) = runtime.drain_microtasks() {
            tracing::warn!(error = %e, "microtask drain failed");
        }
    }

    /// Tear everything down. No-op unless Running, or when called from a
    /// handler while its dispatch still holds the execution context.
    pub fn shutdown(&self) {
        // The outer entry still has the isolate entered
        if self.guard.is_held_by_current_thread() {
            tracing::warn!("shutdown requested from inside a handler, ignoring");
            return;
        }

        let _lifecycle = self.lifecycle.lock();

        if self.state() != LifecycleState::Running {
            tracing::debug!(state = %self.state(), "shutdown ignored");
            return;
        }

        self.set_state(LifecycleState::ShuttingDown);
        tracing::info!("shutting down bridge");

        self.registry.clear();

        let host = self.host.read().clone();
        if let Some(host) = host {
            match host.release_objects() {
                Ok(released) => tracing::debug!(released, "host objects released"),
                Err(e) => tracing::warn!(error = %e, "failed to release host objects"),
            }
        }

        let runtime = self.runtime.write().take();
        if let Some(runtime) = runtime {
            {
                let entry = self.guard.acquire();
                entry.enter(&runtime);
                entry.shutdown_isolate();
            }
            if let Err(e) = runtime.shutdown() {
                tracing::warn!(error = %e, "runtime shutdown failed");
            }
        }

        self.set_state(LifecycleState::Uninitialized);
        tracing::info!("bridge shut down");
    }

    /// Debug/hot-reload service URL while Running
    pub fn service_url(&self) -> Option<String> {
        if self.is_running() && self.config.start_service_isolate {
            Some(format!("http://127.0.0.1:{}/", self.config.service_port))
        } else {
            None
        }
    }

    // ========================================================================
    // Host side
    // ========================================================================

    /// Install the host environment used during shutdown
    pub fn set_host(&self, host: Arc<dyn HostEnvironment>) {
        *self.host.write() = Some(host);
    }

    /// Release one host object on behalf of the embedded side
    pub fn release_object(&self, handle: ObjectHandle) -> bool {
        let host = self.host.read().clone();
        match host {
            Some(host) => host.release_object(handle),
            None => {
                tracing::debug!(handle = handle.as_u64(), "object release without a host");
                false
            }
        }
    }

    /// Register the chat delivery callback, replacing any previous one
    pub fn set_chat_sink(&self, sink: ChatSink) {
        *self.chat_sink.write() = Some(sink);
    }

    /// Remove the chat delivery callback
    pub fn clear_chat_sink(&self) {
        *self.chat_sink.write() = None;
    }

    /// Deliver a chat message to a player through the host
    pub fn send_chat_message(&self, player_id: i64, message: &str) {
        let sink = self.chat_sink.read().clone();
        match sink {
            Some(sink) => sink(player_id, message),
            None => tracing::warn!(player_id, "send_chat_message: no chat callback registered"),
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state())
            .field("handlers", &self.registry.registered_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::dart::DartDllFactory;
    use std::path::PathBuf;

    #[test]
    fn test_state_round_trip() {
        for state in [
            LifecycleState::Uninitialized,
            LifecycleState::Initializing,
            LifecycleState::Running,
            LifecycleState::ShuttingDown,
        ] {
            assert_eq!(LifecycleState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_new_bridge_is_idle() {
        let bridge = Bridge::new(BridgeConfig::default(), DartDllFactory);
        assert_eq!(bridge.state(), LifecycleState::Uninitialized);
        assert!(bridge.service_url().is_none());
        bridge.tick();
        bridge.shutdown();
        assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_missing_script_fails_before_runtime() {
        let bridge = Bridge::new(BridgeConfig::default(), DartDllFactory);
        let err = bridge
            .init(&PathBuf::from("/nonexistent/lib/main.dart"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::ScriptNotFound(_)));
        assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_chat_without_sink_is_noop() {
        let bridge = Bridge::new(BridgeConfig::default(), DartDllFactory);
        bridge.send_chat_message(1, "nobody listens");
    }
}
