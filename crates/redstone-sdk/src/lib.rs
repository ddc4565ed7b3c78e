//! Redstone SDK - ABI types shared by the game host and the embedded runtime
//!
//! This crate holds the vocabulary of the callback surface without any of the
//! machinery that drives it:
//! - The closed set of event channels ([`EventKind`])
//! - Per-event result codes and their defaults ([`BlockBreakResult`], ...)
//! - Explicit ownership for strings that cross the boundary ([`ReplacementText`])
//! - Raw `extern "C"` callback signatures used by the embedded side ([`abi`])
//!
//! # Example
//!
//! ```ignore
//! use redstone_sdk::{BlockBreakResult, BlockPos};
//!
//! fn on_break(pos: BlockPos, _player: i64) -> BlockBreakResult {
//!     if pos == BlockPos::ORIGIN {
//!         BlockBreakResult::Cancel
//!     } else {
//!         BlockBreakResult::Allow
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod abi;
mod error;
mod event;
mod results;
mod text;
mod types;

pub use error::{AbiError, AbiResult};
pub use event::EventKind;
pub use results::{ActionResult, BlockBreakResult, EventResult, InteractResult};
pub use text::{ForeignText, ReplacementText};
pub use types::{BlockPos, ProxyTarget};
