//! Result codes returned by event handlers
//!
//! Events that need more than allow/deny answer with a small enumerated
//! outcome. Each enum carries the wire code the host expects and a default
//! that applies whenever no handler is registered. One enum may serve
//! several events, so decoding takes the event kind for diagnostics.

use crate::{AbiError, AbiResult, EventKind};

macro_rules! result_codes {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[repr(i32)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $code,
            )+
        }

        impl $name {
            const MAX_CODE: i32 = {
                let codes = [$($code),+];
                codes[codes.len() - 1]
            };

            /// Wire code sent across the boundary
            #[inline]
            pub fn code(self) -> i32 {
                self as i32
            }

            fn lookup(code: i32) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Decode a wire code returned for `kind`
            pub fn from_code(kind: EventKind, code: i32) -> AbiResult<Self> {
                Self::lookup(code).ok_or(AbiError::UnknownResultCode {
                    kind,
                    code,
                    max: Self::MAX_CODE,
                })
            }

            /// Decode a wire code, falling back to the default
            pub fn from_code_or_default(code: i32) -> Self {
                Self::lookup(code).unwrap_or_default()
            }
        }
    };
}

result_codes! {
    /// Outcome of a block break
    BlockBreakResult {
        /// Cancel the break
        Cancel = 0,
        /// Let the block break normally
        #[default]
        Allow = 1,
        /// Break the block without dropping items
        AllowWithoutDrops = 2,
    }
}

result_codes! {
    /// Outcome of a block interaction
    InteractResult {
        /// Cancel the interaction
        Cancel = 0,
        /// Continue with vanilla handling
        #[default]
        Allow = 1,
        /// Handled; stop vanilla processing
        Consume = 2,
    }
}

result_codes! {
    /// Interaction outcome for proxy blocks, mirroring the host's action result ordinals
    ActionResult {
        /// Interaction succeeded, arm swings
        Success = 0,
        /// Interaction consumed
        Consume = 1,
        /// Interaction partially consumed
        ConsumePartial = 2,
        /// Neither consumed nor denied; the host continues its own handling
        #[default]
        Pass = 3,
        /// Interaction failed
        Fail = 4,
    }
}

result_codes! {
    /// Two-valued outcome for item use on blocks and entities
    EventResult {
        /// Deny the use
        Deny = 0,
        /// Allow the use
        #[default]
        Allow = 1,
    }
}

impl EventResult {
    /// Whether the event may proceed
    pub fn is_allowed(self) -> bool {
        self == EventResult::Allow
    }
}
