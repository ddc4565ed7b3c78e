//! Shared fixtures for bridge integration tests
//!
//! `MockRuntime` stands in for the Dart VM and records every call the bridge
//! makes into it. `Harness` wires a bridge to a mock runtime and a temporary
//! Dart package on disk.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tempfile::TempDir;

use redstone_bridge::{
    Bridge, BridgeConfig, BridgeError, BridgeResult, EmbeddedRuntime, HostEnvironment,
    ObjectHandle, ObjectTable, RuntimeFactory,
};

// ===== Mock Runtime =====

/// One call into the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    LoadScript { script: PathBuf, package_config: PathBuf },
    EnterIsolate,
    ExitIsolate,
    EnterScope,
    ExitScope,
    Invoke(String),
    DrainMicrotasks,
    ShutdownIsolate,
    Shutdown,
}

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MockRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    pub fail_load: AtomicBool,
    pub fail_invoke: AtomicBool,
    pub fail_drain: AtomicBool,
    on_invoke: Mutex<Option<Arc<Hook>>>,
    on_drain: Mutex<Option<Arc<Hook>>>,
    entered_by: Mutex<Option<ThreadId>>,
    /// Times a thread entered while another was inside
    pub overlaps: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count(&self, call: &RuntimeCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Run `hook` when the entry point is invoked (the script's `main`)
    pub fn on_invoke(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_invoke.lock() = Some(Arc::new(Box::new(hook)));
    }

    /// Run `hook` whenever microtasks are drained
    pub fn on_drain(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_drain.lock() = Some(Arc::new(Box::new(hook)));
    }

    pub fn is_entered(&self) -> bool {
        self.entered_by.lock().is_some()
    }
}

impl EmbeddedRuntime for MockRuntime {
    fn load_script(&self, script: &Path, package_config: &Path) -> BridgeResult<()> {
        self.record(RuntimeCall::LoadScript {
            script: script.to_path_buf(),
            package_config: package_config.to_path_buf(),
        });
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(BridgeError::ScriptLoad {
                path: script.to_path_buf(),
                reason: "mock load failure".to_string(),
            });
        }
        Ok(())
    }

    fn enter_isolate(&self) {
        self.record(RuntimeCall::EnterIsolate);
        let mut entered = self.entered_by.lock();
        if entered.is_some() {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        *entered = Some(thread::current().id());
    }

    fn exit_isolate(&self) {
        self.record(RuntimeCall::ExitIsolate);
        *self.entered_by.lock() = None;
    }

    fn enter_scope(&self) {
        self.record(RuntimeCall::EnterScope);
    }

    fn exit_scope(&self) {
        self.record(RuntimeCall::ExitScope);
    }

    fn invoke(&self, function: &str) -> BridgeResult<()> {
        self.record(RuntimeCall::Invoke(function.to_string()));
        let hook = self.on_invoke.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_invoke.load(Ordering::SeqCst) {
            return Err(BridgeError::EntryPoint {
                name: function.to_string(),
                reason: "mock main() threw".to_string(),
            });
        }
        Ok(())
    }

    fn drain_microtasks(&self) -> BridgeResult<()> {
        self.record(RuntimeCall::DrainMicrotasks);
        let hook = self.on_drain.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_drain.load(Ordering::SeqCst) {
            return Err(BridgeError::Runtime("mock microtask failure".to_string()));
        }
        Ok(())
    }

    fn shutdown_isolate(&self) {
        self.record(RuntimeCall::ShutdownIsolate);
        *self.entered_by.lock() = None;
    }

    fn shutdown(&self) -> BridgeResult<()> {
        self.record(RuntimeCall::Shutdown);
        Ok(())
    }
}

// ===== Mock Factory =====

#[derive(Clone)]
pub struct MockFactory {
    pub runtime: Arc<MockRuntime>,
    pub fail_start: Arc<AtomicBool>,
    pub starts: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new(runtime: Arc<MockRuntime>) -> Self {
        Self {
            runtime,
            fail_start: Arc::new(AtomicBool::new(false)),
            starts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RuntimeFactory for MockFactory {
    fn start(&self, _config: &BridgeConfig) -> BridgeResult<Arc<dyn EmbeddedRuntime>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(BridgeError::RuntimeStart("mock VM refused to start".to_string()));
        }
        Ok(self.runtime.clone())
    }
}

// ===== Mock Host =====

#[derive(Default)]
pub struct MockHost {
    pub objects: ObjectTable<String>,
    pub release_calls: AtomicUsize,
}

impl HostEnvironment for MockHost {
    fn release_objects(&self) -> BridgeResult<usize> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.drain().len())
    }

    fn release_object(&self, handle: ObjectHandle) -> bool {
        self.objects.remove(handle).is_some()
    }
}

// ===== Harness =====

pub struct Harness {
    pub bridge: Arc<Bridge>,
    pub runtime: Arc<MockRuntime>,
    pub factory: MockFactory,
    pub script: PathBuf,
    pub package_root: PathBuf,
    _dir: TempDir,
}

/// Lay out `my_mod/pubspec.yaml` and `my_mod/lib/main.dart`
fn dart_package() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path().join("my_mod");
    let lib = root.join("lib");
    std::fs::create_dir_all(&lib).expect("create lib dir");
    std::fs::write(root.join("pubspec.yaml"), "name: my_mod\n").expect("write pubspec");
    let script = lib.join("main.dart");
    std::fs::write(&script, "void main() {}\n").expect("write script");
    (dir, root, script)
}

/// A bridge that has not been initialized
pub fn harness() -> Harness {
    harness_with(BridgeConfig::default())
}

pub fn harness_with(config: BridgeConfig) -> Harness {
    let runtime = MockRuntime::new();
    let factory = MockFactory::new(runtime.clone());
    let bridge = Arc::new(Bridge::new(config, factory.clone()));
    let (dir, package_root, script) = dart_package();
    Harness {
        bridge,
        runtime,
        factory,
        script,
        package_root,
        _dir: dir,
    }
}

/// A bridge that is Running, with the init calls cleared from the log
pub fn running() -> Harness {
    let h = harness();
    h.bridge.init(&h.script).expect("init");
    h.runtime.clear_calls();
    h
}
