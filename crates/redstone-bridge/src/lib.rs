//! Redstone Bridge - callback bridge between a Minecraft host and an embedded Dart runtime
//!
//! The host dispatches game events into handlers registered by the embedded
//! script, and the script pushes chat messages and decisions back to the
//! host. This crate provides:
//!
//! - **Registry**: one handler slot per event kind, with documented defaults
//! - **Guard**: reentrant ownership of the runtime's single execution context
//! - **Dispatch**: one guarded entry point per event kind
//! - **Lifecycle**: init / tick / shutdown of the embedded runtime
//! - **Boundaries**: a flat C ABI for the embedded side ([`ffi`]) and JNI
//!   entry points for the Java host ([`jvm`])
//!
//! # Example
//!
//! ```ignore
//! use redstone_bridge::{Bridge, BridgeConfig, DartDllFactory};
//! use redstone_sdk::{BlockBreakResult, BlockPos};
//!
//! let bridge = Bridge::new(BridgeConfig::from_env()?, DartDllFactory);
//! bridge.init("mods/my_mod/lib/main.dart".as_ref())?;
//!
//! bridge.registry().set_block_break(|pos, _player| {
//!     if pos == BlockPos::ORIGIN {
//!         BlockBreakResult::Cancel
//!     } else {
//!         BlockBreakResult::Allow
//!     }
//! });
//! assert_eq!(
//!     bridge.dispatch_block_break(BlockPos::ORIGIN, 7),
//!     BlockBreakResult::Cancel
//! );
//! ```

#![warn(missing_docs)]

mod bridge;
pub mod config;
mod dispatch;
mod error;
pub mod ffi;
pub mod guard;
pub mod jvm;
pub mod logging;
pub mod marshal;
pub mod objects;
pub mod registry;
pub mod runtime;

pub use bridge::{Bridge, ChatSink, HostEnvironment, LifecycleState};
pub use config::{resolve_package_config, BridgeConfig};
pub use error::{BridgeError, BridgeResult};
pub use guard::{ContextEntry, ContextGuard, Ownership};
pub use objects::{ObjectHandle, ObjectTable};
pub use registry::{Handler, HandlerRegistry};
pub use runtime::dart::DartDllFactory;
pub use runtime::loader::{Library, LoadError};
pub use runtime::{EmbeddedRuntime, RuntimeFactory};
