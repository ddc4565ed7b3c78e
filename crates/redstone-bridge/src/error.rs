//! Bridge error types.

use std::path::PathBuf;

use crate::runtime::loader::LoadError;

/// Result alias used throughout the bridge
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by the bridge's Rust API.
///
/// None of these cross the C or JNI boundary: exported functions log the
/// error and answer with `false`, null, or the event default instead.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// `init` called while the bridge is not Uninitialized
    #[error("Bridge already initialized")]
    AlreadyInitialized,

    /// The embedded script does not exist
    #[error("Script not found: {0}")]
    ScriptNotFound(PathBuf),

    /// The runtime could not load the script into a new isolate
    #[error("Failed to load script {path}: {reason}")]
    ScriptLoad {
        /// Script that was being loaded
        path: PathBuf,
        /// Runtime-provided reason
        reason: String,
    },

    /// Invoking the script entry point failed
    #[error("Failed to invoke {name}(): {reason}")]
    EntryPoint {
        /// Entry point name
        name: String,
        /// Runtime-provided reason
        reason: String,
    },

    /// The embedded VM could not be started
    #[error("Failed to start runtime: {0}")]
    RuntimeStart(String),

    /// Runtime call failed after startup
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Runtime shared library could not be loaded
    #[error("{0}")]
    Library(#[from] LoadError),

    /// Could not attach the calling thread to the host environment
    #[error("Failed to attach thread to host: {0}")]
    BoundaryAttachment(String),

    /// A call into the host environment failed
    #[error("Host call failed: {0}")]
    Host(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
