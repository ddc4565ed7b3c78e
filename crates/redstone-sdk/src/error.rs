//! Error types for the Redstone ABI

use crate::EventKind;

/// Result type for ABI conversions
pub type AbiResult<T> = Result<T, AbiError>;

/// ABI conversion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// A raw callback returned a code outside the event's result range
    #[error("Unknown result code {code} for {kind} (expected 0..={max})")]
    UnknownResultCode {
        /// Event the code was returned for
        kind: EventKind,
        /// The offending code
        code: i32,
        /// Highest valid code
        max: i32,
    },
}
