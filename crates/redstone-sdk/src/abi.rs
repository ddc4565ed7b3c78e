//! Raw callback signatures of the C boundary
//!
//! The embedded runtime registers plain function pointers with these shapes.
//! Integer results are wire codes (see [`crate::BlockBreakResult`] and
//! friends); `*mut c_char` results are NUL-terminated buffers owned by the
//! embedded side, or null for "no replacement".

use std::os::raw::c_char;

// ============================================================================
// Block events
// ============================================================================

/// `(x, y, z, player_id) -> BlockBreakResult code`
pub type BlockBreakCallback = extern "C" fn(i32, i32, i32, i64) -> i32;

/// `(x, y, z, player_id, hand) -> InteractResult code`
pub type BlockInteractCallback = extern "C" fn(i32, i32, i32, i64, i32) -> i32;

/// `(tick)`
pub type TickCallback = extern "C" fn(i64);

/// `(handler_id, world_id, x, y, z, player_id) -> allow`
pub type ProxyBlockBreakCallback = extern "C" fn(i64, i64, i32, i32, i32, i64) -> bool;

/// `(handler_id, world_id, x, y, z, player_id, hand) -> ActionResult code`
pub type ProxyBlockUseCallback = extern "C" fn(i64, i64, i32, i32, i32, i64, i32) -> i32;

/// `(player_id, x, y, z, block_id) -> allow`
pub type BlockPlaceCallback = extern "C" fn(i32, i32, i32, i32, *const c_char) -> bool;

// ============================================================================
// Player and entity events
// ============================================================================

/// `(player_id)`
pub type PlayerJoinCallback = extern "C" fn(i32);

/// `(player_id)`
pub type PlayerLeaveCallback = extern "C" fn(i32);

/// `(player_id, end_conquered)`
pub type PlayerRespawnCallback = extern "C" fn(i32, bool);

/// `(player_id, damage_source) -> replacement death message or null`
pub type PlayerDeathCallback = extern "C" fn(i32, *const c_char) -> *mut c_char;

/// `(entity_id, damage_source, amount) -> allow`
pub type EntityDamageCallback = extern "C" fn(i32, *const c_char, f64) -> bool;

/// `(entity_id, damage_source)`
pub type EntityDeathCallback = extern "C" fn(i32, *const c_char);

/// `(player_id, target_id) -> allow`
pub type PlayerAttackEntityCallback = extern "C" fn(i32, i32) -> bool;

/// `(player_id, message) -> replacement message or null`
pub type PlayerChatCallback = extern "C" fn(i32, *const c_char) -> *mut c_char;

/// `(player_id, command) -> allow`
pub type PlayerCommandCallback = extern "C" fn(i32, *const c_char) -> bool;

// ============================================================================
// Item events
// ============================================================================

/// `(player_id, item_id, count, hand) -> allow`
pub type ItemUseCallback = extern "C" fn(i32, *const c_char, i32, i32) -> bool;

/// `(player_id, item_id, count, hand, x, y, z, face) -> EventResult code`
pub type ItemUseOnBlockCallback =
    extern "C" fn(i32, *const c_char, i32, i32, i32, i32, i32, i32) -> i32;

/// `(player_id, item_id, count, hand, target_id) -> EventResult code`
pub type ItemUseOnEntityCallback = extern "C" fn(i32, *const c_char, i32, i32, i32) -> i32;

/// `(player_id, item_entity_id) -> allow`
pub type PlayerPickupItemCallback = extern "C" fn(i32, i32) -> bool;

/// `(player_id, item_id, count) -> allow`
pub type PlayerDropItemCallback = extern "C" fn(i32, *const c_char, i32) -> bool;

// ============================================================================
// Server lifecycle
// ============================================================================

/// Server is starting
pub type ServerStartingCallback = extern "C" fn();

/// Server has started
pub type ServerStartedCallback = extern "C" fn();

/// Server is stopping
pub type ServerStoppingCallback = extern "C" fn();

// ============================================================================
// Outbound and ownership
// ============================================================================

/// Host-bound chat delivery: `(player_id, message)`
pub type SendChatMessageCallback = extern "C" fn(i64, *const c_char);

/// Returns a buffer previously handed out by an embedded callback
pub type TextReleaseCallback = extern "C" fn(*mut c_char);
