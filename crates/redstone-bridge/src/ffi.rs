//! C ABI consumed by the embedded runtime
//!
//! The embedded side (Dart, through `dart:ffi`) registers plain function
//! pointers here and the native host calls the `dispatch_*` functions. All
//! functions operate on one process-wide [`Bridge`], created on first use
//! from the environment configuration.
//!
//! Conventions:
//! - A null callback pointer unregisters the slot
//! - Input strings are borrowed for the duration of the call
//! - Strings returned by `dispatch_*` are owned by the caller and must be
//!   freed with [`redstone_string_free`]
//! - Strings returned by registered callbacks stay owned by the embedded
//!   side and are handed back through the routine installed with
//!   [`register_text_release_handler`]
//! - Errors never cross the boundary; they are logged and mapped to `false`,
//!   null, or the event default

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ffi::CString;
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use redstone_sdk::abi::*;
use redstone_sdk::{
    AbiResult, ActionResult, BlockBreakResult, BlockPos, EventKind, EventResult, InteractResult,
    ProxyTarget, ReplacementText,
};

use crate::bridge::{Bridge, ChatSink};
use crate::config::BridgeConfig;
use crate::logging;
use crate::marshal;
use crate::objects::ObjectHandle;
use crate::runtime::dart::DartDllFactory;

static BRIDGE: Lazy<Bridge> = Lazy::new(|| {
    logging::init_tracing();
    let config = BridgeConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid bridge configuration, using defaults");
        BridgeConfig::default()
    });
    Bridge::new(config, DartDllFactory)
});

/// Service URLs handed out so far; kept alive for the process lifetime
static SERVICE_URLS: Lazy<Mutex<Vec<CString>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// The process-wide bridge behind the C and JNI entry points
pub fn bridge() -> &'static Bridge {
    &BRIDGE
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decode a raw result code, falling back to the event default
fn decode<T: Default>(decoded: AbiResult<T>) -> T {
    decoded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "raw handler returned an unknown code, using default");
        T::default()
    })
}

/// Wrap a buffer returned by a raw handler with the current release routine
fn foreign_text(ptr: *mut c_char) -> ReplacementText {
    let release = bridge().registry().text_release();
    // SAFETY: raw handlers return null or a NUL-terminated buffer they own
    unsafe { ReplacementText::from_foreign(ptr, release) }
}

macro_rules! register {
    ($handler:expr, $kind:ident, $set:ident, |$f:ident| $wrap:expr) => {
        match $handler {
            Some($f) => bridge().registry().$set($wrap),
            None => {
                bridge().registry().unset(EventKind::$kind);
            }
        }
    };
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Start the embedded runtime and run the script's entry point
///
/// # Arguments
/// * `script_path` - NUL-terminated path of the Dart script
///
/// # Returns
/// * `true` once the bridge is Running, `false` on any failure (logged)
///
/// # Safety
/// `script_path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dart_bridge_init(script_path: *const c_char) -> bool {
    logging::init_tracing();
    let Some(script) = marshal::borrow_opt_str(script_path) else {
        tracing::error!("dart_bridge_init: null script path");
        return false;
    };
    bridge().init(Path::new(script.as_ref())).is_ok()
}

/// Tear the bridge down. Safe to call more than once.
#[no_mangle]
pub extern "C" fn dart_bridge_shutdown() {
    bridge().shutdown();
}

/// Drain pending asynchronous work of the embedded side
#[no_mangle]
pub extern "C" fn dart_bridge_tick() {
    bridge().tick();
}

/// Debug/hot-reload service URL
///
/// # Returns
/// * Null unless Running with the service isolate enabled
/// * Otherwise a string owned by the library; do not free it
#[no_mangle]
pub extern "C" fn get_dart_service_url() -> *const c_char {
    let Some(url) = bridge().service_url() else {
        return ptr::null();
    };
    let mut urls = SERVICE_URLS.lock();
    if let Some(existing) = urls.iter().find(|known| known.to_bytes() == url.as_bytes()) {
        return existing.as_ptr();
    }
    let url = marshal::to_cstring(&url);
    let ptr = url.as_ptr();
    urls.push(url);
    ptr
}

// ============================================================================
// Ownership
// ============================================================================

/// Install the routine used to hand text buffers back to the embedded side
#[no_mangle]
pub extern "C" fn register_text_release_handler(release: Option<TextReleaseCallback>) {
    bridge().registry().set_text_release(release);
}

/// Free a string returned by a `dispatch_*` function
///
/// # Safety
/// `ptr` must be null or a string returned by this library that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn redstone_string_free(ptr: *mut c_char) {
    marshal::free_string(ptr);
}

/// Release one host object handle held by the embedded side
///
/// # Returns
/// * `true` if the handle was live
#[no_mangle]
pub extern "C" fn redstone_object_release(handle: u64) -> bool {
    bridge().release_object(ObjectHandle::from_u64(handle))
}

// ============================================================================
// Outbound chat
// ============================================================================

/// Register the host's chat delivery callback (null clears it)
#[no_mangle]
pub extern "C" fn set_send_chat_message_callback(callback: Option<SendChatMessageCallback>) {
    match callback {
        Some(f) => {
            let sink: ChatSink = Arc::new(move |player_id: i64, message: &str| {
                let message = marshal::to_cstring(message);
                f(player_id, message.as_ptr());
            });
            bridge().set_chat_sink(sink);
        }
        None => bridge().clear_chat_sink(),
    }
}

/// Send a chat message to a player through the host
///
/// # Safety
/// `message` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn send_chat_message(player_id: i64, message: *const c_char) {
    let message = marshal::borrow_str(message);
    bridge().send_chat_message(player_id, &message);
}

// ============================================================================
// Handler Registration
// ============================================================================

/// Register (or with null, clear) the block break handler
#[no_mangle]
pub extern "C" fn register_block_break_handler(handler: Option<BlockBreakCallback>) {
    register!(handler, BlockBreak, set_block_break, |f| move |pos: BlockPos, player_id| {
        decode(BlockBreakResult::from_code(EventKind::BlockBreak, f(pos.x, pos.y, pos.z, player_id)))
    });
}

/// Register (or with null, clear) the block interact handler
#[no_mangle]
pub extern "C" fn register_block_interact_handler(handler: Option<BlockInteractCallback>) {
    register!(handler, BlockInteract, set_block_interact, |f| move |pos: BlockPos,
                                                                    player_id,
                                                                    hand| {
        decode(InteractResult::from_code(EventKind::BlockInteract, f(pos.x, pos.y, pos.z, player_id, hand)))
    });
}

/// Register (or with null, clear) the tick handler
#[no_mangle]
pub extern "C" fn register_tick_handler(handler: Option<TickCallback>) {
    register!(handler, Tick, set_tick, |f| move |tick| f(tick));
}

/// Register (or with null, clear) the proxy block break handler
#[no_mangle]
pub extern "C" fn register_proxy_block_break_handler(handler: Option<ProxyBlockBreakCallback>) {
    register!(handler, ProxyBlockBreak, set_proxy_block_break, |f| move |t: ProxyTarget,
                                                                           player_id| {
        f(t.handler_id, t.world_id, t.pos.x, t.pos.y, t.pos.z, player_id)
    });
}

/// Register (or with null, clear) the proxy block use handler
#[no_mangle]
pub extern "C" fn register_proxy_block_use_handler(handler: Option<ProxyBlockUseCallback>) {
    register!(handler, ProxyBlockUse, set_proxy_block_use, |f| move |t: ProxyTarget,
                                                                       player_id,
                                                                       hand| {
        decode(ActionResult::from_code(EventKind::ProxyBlockUse, f(
            t.handler_id,
            t.world_id,
            t.pos.x,
            t.pos.y,
            t.pos.z,
            player_id,
            hand,
        )))
    });
}

/// Register (or with null, clear) the player join handler
#[no_mangle]
pub extern "C" fn register_player_join_handler(handler: Option<PlayerJoinCallback>) {
    register!(handler, PlayerJoin, set_player_join, |f| move |player_id| f(player_id));
}

/// Register (or with null, clear) the player leave handler
#[no_mangle]
pub extern "C" fn register_player_leave_handler(handler: Option<PlayerLeaveCallback>) {
    register!(handler, PlayerLeave, set_player_leave, |f| move |player_id| f(player_id));
}

/// Register (or with null, clear) the player respawn handler
#[no_mangle]
pub extern "C" fn register_player_respawn_handler(handler: Option<PlayerRespawnCallback>) {
    register!(handler, PlayerRespawn, set_player_respawn, |f| move |player_id, end_conquered| {
        f(player_id, end_conquered)
    });
}

/// Register (or with null, clear) the player death handler
#[no_mangle]
pub extern "C" fn register_player_death_handler(handler: Option<PlayerDeathCallback>) {
    register!(handler, PlayerDeath, set_player_death, |f| move |player_id, source: &str| {
        let source = marshal::to_cstring(source);
        foreign_text(f(player_id, source.as_ptr()))
    });
}

/// Register (or with null, clear) the entity damage handler
#[no_mangle]
pub extern "C" fn register_entity_damage_handler(handler: Option<EntityDamageCallback>) {
    register!(handler, EntityDamage, set_entity_damage, |f| move |entity_id,
                                                                 source: &str,
                                                                 amount| {
        let source = marshal::to_cstring(source);
        f(entity_id, source.as_ptr(), amount)
    });
}

/// Register (or with null, clear) the entity death handler
#[no_mangle]
pub extern "C" fn register_entity_death_handler(handler: Option<EntityDeathCallback>) {
    register!(handler, EntityDeath, set_entity_death, |f| move |entity_id, source: &str| {
        let source = marshal::to_cstring(source);
        f(entity_id, source.as_ptr())
    });
}

/// Register (or with null, clear) the player attack entity handler
#[no_mangle]
pub extern "C" fn register_player_attack_entity_handler(handler: Option<PlayerAttackEntityCallback>) {
    register!(handler, PlayerAttackEntity, set_player_attack_entity, |f| move |player_id,
                                                                              target_id| {
        f(player_id, target_id)
    });
}

/// Register (or with null, clear) the player chat handler
#[no_mangle]
pub extern "C" fn register_player_chat_handler(handler: Option<PlayerChatCallback>) {
    register!(handler, PlayerChat, set_player_chat, |f| move |player_id, message: &str| {
        let message = marshal::to_cstring(message);
        foreign_text(f(player_id, message.as_ptr()))
    });
}

/// Register (or with null, clear) the player command handler
#[no_mangle]
pub extern "C" fn register_player_command_handler(handler: Option<PlayerCommandCallback>) {
    register!(handler, PlayerCommand, set_player_command, |f| move |player_id, command: &str| {
        let command = marshal::to_cstring(command);
        f(player_id, command.as_ptr())
    });
}

/// Register (or with null, clear) the item use handler
#[no_mangle]
pub extern "C" fn register_item_use_handler(handler: Option<ItemUseCallback>) {
    register!(handler, ItemUse, set_item_use, |f| move |player_id,
                                                       item_id: &str,
                                                       count,
                                                       hand| {
        let item_id = marshal::to_cstring(item_id);
        f(player_id, item_id.as_ptr(), count, hand)
    });
}

/// Register (or with null, clear) the item use on block handler
#[no_mangle]
pub extern "C" fn register_item_use_on_block_handler(handler: Option<ItemUseOnBlockCallback>) {
    register!(handler, ItemUseOnBlock, set_item_use_on_block, |f| move |player_id,
                                                                       item_id: &str,
                                                                       count,
                                                                       hand,
                                                                       pos: BlockPos,
                                                                       face| {
        let item_id = marshal::to_cstring(item_id);
        decode(EventResult::from_code(EventKind::ItemUseOnBlock, f(
            player_id,
            item_id.as_ptr(),
            count,
            hand,
            pos.x,
            pos.y,
            pos.z,
            face,
        )))
    });
}

/// Register (or with null, clear) the item use on entity handler
#[no_mangle]
pub extern "C" fn register_item_use_on_entity_handler(handler: Option<ItemUseOnEntityCallback>) {
    register!(handler, ItemUseOnEntity, set_item_use_on_entity, |f| move |player_id,
                                                                         item_id: &str,
                                                                         count,
                                                                         hand,
                                                                         target_id| {
        let item_id = marshal::to_cstring(item_id);
        decode(EventResult::from_code(
            EventKind::ItemUseOnEntity,
            f(player_id, item_id.as_ptr(), count, hand, target_id),
        ))
    });
}

/// Register (or with null, clear) the block place handler
#[no_mangle]
pub extern "C" fn register_block_place_handler(handler: Option<BlockPlaceCallback>) {
    register!(handler, BlockPlace, set_block_place, |f| move |player_id,
                                                             pos: BlockPos,
                                                             block_id: &str| {
        let block_id = marshal::to_cstring(block_id);
        f(player_id, pos.x, pos.y, pos.z, block_id.as_ptr())
    });
}

/// Register (or with null, clear) the player pickup item handler
#[no_mangle]
pub extern "C" fn register_player_pickup_item_handler(handler: Option<PlayerPickupItemCallback>) {
    register!(handler, PlayerPickupItem, set_player_pickup_item, |f| move |player_id,
                                                                          item_entity_id| {
        f(player_id, item_entity_id)
    });
}

/// Register (or with null, clear) the player drop item handler
#[no_mangle]
pub extern "C" fn register_player_drop_item_handler(handler: Option<PlayerDropItemCallback>) {
    register!(handler, PlayerDropItem, set_player_drop_item, |f| move |player_id,
                                                                      item_id: &str,
                                                                      count| {
        let item_id = marshal::to_cstring(item_id);
        f(player_id, item_id.as_ptr(), count)
    });
}

/// Register (or with null, clear) the server starting handler
#[no_mangle]
pub extern "C" fn register_server_starting_handler(handler: Option<ServerStartingCallback>) {
    register!(handler, ServerStarting, set_server_starting, |f| move || f());
}

/// Register (or with null, clear) the server started handler
#[no_mangle]
pub extern "C" fn register_server_started_handler(handler: Option<ServerStartedCallback>) {
    register!(handler, ServerStarted, set_server_started, |f| move || f());
}

/// Register (or with null, clear) the server stopping handler
#[no_mangle]
pub extern "C" fn register_server_stopping_handler(handler: Option<ServerStoppingCallback>) {
    register!(handler, ServerStopping, set_server_stopping, |f| move || f());
}

// ============================================================================
// Dispatch
// ============================================================================

/// Dispatch a block break; returns a `BlockBreakResult` code
#[no_mangle]
pub extern "C" fn dispatch_block_break(x: i32, y: i32, z: i32, player_id: i64) -> i32 {
    bridge()
        .dispatch_block_break(BlockPos::new(x, y, z), player_id)
        .code()
}

/// Dispatch a block interaction; returns an `InteractResult` code
#[no_mangle]
pub extern "C" fn dispatch_block_interact(x: i32, y: i32, z: i32, player_id: i64, hand: i32) -> i32 {
    bridge()
        .dispatch_block_interact(BlockPos::new(x, y, z), player_id, hand)
        .code()
}

/// Dispatch a server tick
#[no_mangle]
pub extern "C" fn dispatch_tick(tick: i64) {
    bridge().dispatch_tick(tick);
}

/// Dispatch a proxy block break
#[no_mangle]
pub extern "C" fn dispatch_proxy_block_break(
    handler_id: i64,
    world_id: i64,
    x: i32,
    y: i32,
    z: i32,
    player_id: i64,
) -> bool {
    let target = ProxyTarget::new(handler_id, world_id, BlockPos::new(x, y, z));
    bridge().dispatch_proxy_block_break(target, player_id)
}

/// Dispatch a proxy block use; returns an `ActionResult` code
#[no_mangle]
pub extern "C" fn dispatch_proxy_block_use(
    handler_id: i64,
    world_id: i64,
    x: i32,
    y: i32,
    z: i32,
    player_id: i64,
    hand: i32,
) -> i32 {
    let target = ProxyTarget::new(handler_id, world_id, BlockPos::new(x, y, z));
    bridge()
        .dispatch_proxy_block_use(target, player_id, hand)
        .code()
}

/// Dispatch a player join
#[no_mangle]
pub extern "C" fn dispatch_player_join(player_id: i32) {
    bridge().dispatch_player_join(player_id);
}

/// Dispatch a player leave
#[no_mangle]
pub extern "C" fn dispatch_player_leave(player_id: i32) {
    bridge().dispatch_player_leave(player_id);
}

/// Dispatch a player respawn
#[no_mangle]
pub extern "C" fn dispatch_player_respawn(player_id: i32, end_conquered: bool) {
    bridge().dispatch_player_respawn(player_id, end_conquered);
}

/// Dispatch a player death
///
/// # Returns
/// * Null to keep the host's death message
/// * Otherwise a replacement; free it with [`redstone_string_free`]
///
/// # Safety
/// `damage_source` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_player_death(player_id: i32, damage_source: *const c_char) -> *mut c_char {
    let source = marshal::borrow_str(damage_source);
    marshal::replacement_into_raw(bridge().dispatch_player_death(player_id, &source))
}

/// Dispatch entity damage
///
/// # Safety
/// `damage_source` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_entity_damage(entity_id: i32, damage_source: *const c_char, amount: f64) -> bool {
    let source = marshal::borrow_str(damage_source);
    bridge().dispatch_entity_damage(entity_id, &source, amount)
}

/// Dispatch an entity death
///
/// # Safety
/// `damage_source` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_entity_death(entity_id: i32, damage_source: *const c_char) {
    let source = marshal::borrow_str(damage_source);
    bridge().dispatch_entity_death(entity_id, &source);
}

/// Dispatch a player attacking an entity
#[no_mangle]
pub extern "C" fn dispatch_player_attack_entity(player_id: i32, target_id: i32) -> bool {
    bridge().dispatch_player_attack_entity(player_id, target_id)
}

/// Dispatch a chat message
///
/// # Returns
/// * Null to keep the original message
/// * Otherwise a replacement; free it with [`redstone_string_free`]
///
/// # Safety
/// `message` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_player_chat(player_id: i32, message: *const c_char) -> *mut c_char {
    let message = marshal::borrow_str(message);
    marshal::replacement_into_raw(bridge().dispatch_player_chat(player_id, &message))
}

/// Dispatch a player command
///
/// # Safety
/// `command` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_player_command(player_id: i32, command: *const c_char) -> bool {
    let command = marshal::borrow_str(command);
    bridge().dispatch_player_command(player_id, &command)
}

/// Dispatch an item use
///
/// # Safety
/// `item_id` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_item_use(player_id: i32, item_id: *const c_char, count: i32, hand: i32) -> bool {
    let item_id = marshal::borrow_str(item_id);
    bridge().dispatch_item_use(player_id, &item_id, count, hand)
}

/// Dispatch an item use on a block; returns an `EventResult` code
///
/// # Safety
/// `item_id` must be null or a valid NUL-terminated string.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn dispatch_item_use_on_block(
    player_id: i32,
    item_id: *const c_char,
    count: i32,
    hand: i32,
    x: i32,
    y: i32,
    z: i32,
    face: i32,
) -> i32 {
    let item_id = marshal::borrow_str(item_id);
    bridge()
        .dispatch_item_use_on_block(player_id, &item_id, count, hand, BlockPos::new(x, y, z), face)
        .code()
}

/// Dispatch an item use on an entity; returns an `EventResult` code
///
/// # Safety
/// `item_id` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_item_use_on_entity(
    player_id: i32,
    item_id: *const c_char,
    count: i32,
    hand: i32,
    target_id: i32,
) -> i32 {
    let item_id = marshal::borrow_str(item_id);
    bridge()
        .dispatch_item_use_on_entity(player_id, &item_id, count, hand, target_id)
        .code()
}

/// Dispatch a block placement
///
/// # Safety
/// `block_id` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_block_place(player_id: i32, x: i32, y: i32, z: i32, block_id: *const c_char) -> bool {
    let block_id = marshal::borrow_str(block_id);
    bridge().dispatch_block_place(player_id, BlockPos::new(x, y, z), &block_id)
}

/// Dispatch an item pickup
#[no_mangle]
pub extern "C" fn dispatch_player_pickup_item(player_id: i32, item_entity_id: i32) -> bool {
    bridge().dispatch_player_pickup_item(player_id, item_entity_id)
}

/// Dispatch an item drop
///
/// # Safety
/// `item_id` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn dispatch_player_drop_item(player_id: i32, item_id: *const c_char, count: i32) -> bool {
    let item_id = marshal::borrow_str(item_id);
    bridge().dispatch_player_drop_item(player_id, &item_id, count)
}

/// Dispatch server starting
#[no_mangle]
pub extern "C" fn dispatch_server_starting() {
    bridge().dispatch_server_starting();
}

/// Dispatch server started
#[no_mangle]
pub extern "C" fn dispatch_server_started() {
    bridge().dispatch_server_started();
}

/// Dispatch server stopping
#[no_mangle]
pub extern "C" fn dispatch_server_stopping() {
    bridge().dispatch_server_stopping();
}
