//! Dispatch layer
//!
//! One method per event kind. Every dispatch has the same shape:
//!
//! 1. Not Running, or no handler registered: return the event's default
//!    without touching the runtime.
//! 2. Acquire the execution-context guard and re-check Running (a shutdown
//!    may have won the race for the guard).
//! 3. Enter the isolate (outermost entry only) and open a handle scope.
//! 4. Run the registered handler.
//! 5. Close the scope and release the guard.
//!
//! Tick skips the registration check in step 1: while Running it always
//! enters the runtime and drains the microtask queue, running the handler
//! first when one is registered.

use redstone_sdk::{
    ActionResult, BlockBreakResult, BlockPos, EventKind, EventResult, InteractResult, ProxyTarget,
    ReplacementText,
};

use crate::bridge::Bridge;
use crate::registry::HandlerRegistry;
use crate::runtime::{EmbeddedRuntime, RuntimeScope};

impl Bridge {
    fn guarded<R>(
        &self,
        kind: EventKind,
        default: R,
        call: impl FnOnce(&HandlerRegistry, &dyn EmbeddedRuntime) -> R,
    ) -> R {
        if !self.registry.is_registered(kind) {
            return default;
        }
        self.entered(kind, default, call)
    }

    fn entered<R>(
        &self,
        kind: EventKind,
        default: R,
        call: impl FnOnce(&HandlerRegistry, &dyn EmbeddedRuntime) -> R,
    ) -> R {
        if !self.is_running() {
            return default;
        }

        let entry = self.guard.acquire();
        if !self.is_running() {
            return default;
        }
        let Some(runtime) = self.runtime() else {
            return default;
        };

        entry.enter(&runtime);
        let _scope = RuntimeScope::open(runtime.as_ref());
        tracing::trace!(event = %kind, depth = entry.depth(), "dispatching");
        call(&self.registry, runtime.as_ref())
    }

    // ========================================================================
    // Block events
    // ========================================================================

    /// A player broke the block at `pos`. Default: `Allow`.
    pub fn dispatch_block_break(&self, pos: BlockPos, player_id: i64) -> BlockBreakResult {
        self.guarded(EventKind::BlockBreak, BlockBreakResult::default(), |registry, _| {
            registry.dispatch_block_break(pos, player_id)
        })
    }

    /// A player interacted with the block at `pos`. Default: `Allow`.
    pub fn dispatch_block_interact(&self, pos: BlockPos, player_id: i64, hand: i32) -> InteractResult {
        self.guarded(EventKind::BlockInteract, InteractResult::default(), |registry, _| {
            registry.dispatch_block_interact(pos, player_id, hand)
        })
    }

    /// Server tick; drains microtasks whether or not a handler is registered
    pub fn dispatch_tick(&self, tick: i64) {
        self.entered(EventKind::Tick, (), |registry, runtime| {
            registry.dispatch_tick(tick);
            if let Err(e) = runtime.drain_microtasks() {
                tracing::warn!(tick, error = %e, "microtask drain after tick failed");
            }
        })
    }

    /// A proxy block was broken. Default: `true`.
    pub fn dispatch_proxy_block_break(&self, target: ProxyTarget, player_id: i64) -> bool {
        self.guarded(EventKind::ProxyBlockBreak, true, |registry, _| {
            registry.dispatch_proxy_block_break(target, player_id)
        })
    }

    /// A proxy block was used. Default: `Pass`.
    pub fn dispatch_proxy_block_use(&self, target: ProxyTarget, player_id: i64, hand: i32) -> ActionResult {
        self.guarded(EventKind::ProxyBlockUse, ActionResult::default(), |registry, _| {
            registry.dispatch_proxy_block_use(target, player_id, hand)
        })
    }

    /// A player placed `block_id` at `pos`. Default: `true`.
    pub fn dispatch_block_place(&self, player_id: i32, pos: BlockPos, block_id: &str) -> bool {
        self.guarded(EventKind::BlockPlace, true, |registry, _| {
            registry.dispatch_block_place(player_id, pos, block_id)
        })
    }

    // ========================================================================
    // Player and entity events
    // ========================================================================

    /// A player joined
    pub fn dispatch_player_join(&self, player_id: i32) {
        self.guarded(EventKind::PlayerJoin, (), |registry, _| {
            registry.dispatch_player_join(player_id)
        })
    }

    /// A player left
    pub fn dispatch_player_leave(&self, player_id: i32) {
        self.guarded(EventKind::PlayerLeave, (), |registry, _| {
            registry.dispatch_player_leave(player_id)
        })
    }

    /// A player respawned
    pub fn dispatch_player_respawn(&self, player_id: i32, end_conquered: bool) {
        self.guarded(EventKind::PlayerRespawn, (), |registry, _| {
            registry.dispatch_player_respawn(player_id, end_conquered)
        })
    }

    /// A player died.
    ///
    /// The returned text is either pass-through (keep the host's message) or
    /// a replacement the caller copies; a foreign buffer goes back to the
    /// embedded side when the value is dropped.
    pub fn dispatch_player_death(&self, player_id: i32, damage_source: &str) -> ReplacementText {
        self.guarded(EventKind::PlayerDeath, ReplacementText::PassThrough, |registry, _| {
            registry.dispatch_player_death(player_id, damage_source)
        })
    }

    /// An entity is about to take damage. Default: `true`.
    pub fn dispatch_entity_damage(&self, entity_id: i32, damage_source: &str, amount: f64) -> bool {
        self.guarded(EventKind::EntityDamage, true, |registry, _| {
            registry.dispatch_entity_damage(entity_id, damage_source, amount)
        })
    }

    /// An entity died
    pub fn dispatch_entity_death(&self, entity_id: i32, damage_source: &str) {
        self.guarded(EventKind::EntityDeath, (), |registry, _| {
            registry.dispatch_entity_death(entity_id, damage_source)
        })
    }

    /// A player attacked an entity. Default: `true`.
    pub fn dispatch_player_attack_entity(&self, player_id: i32, target_id: i32) -> bool {
        self.guarded(EventKind::PlayerAttackEntity, true, |registry, _| {
            registry.dispatch_player_attack_entity(player_id, target_id)
        })
    }

    /// A player sent a chat message. Same ownership rules as
    /// [`dispatch_player_death`](Self::dispatch_player_death).
    pub fn dispatch_player_chat(&self, player_id: i32, message: &str) -> ReplacementText {
        self.guarded(EventKind::PlayerChat, ReplacementText::PassThrough, |registry, _| {
            registry.dispatch_player_chat(player_id, message)
        })
    }

    /// A player ran a command. Default: `true`.
    pub fn dispatch_player_command(&self, player_id: i32, command: &str) -> bool {
        self.guarded(EventKind::PlayerCommand, true, |registry, _| {
            registry.dispatch_player_command(player_id, command)
        })
    }

    // ========================================================================
    // Item events
    // ========================================================================

    /// A player used an item in the air. Default: `true`.
    pub fn dispatch_item_use(&self, player_id: i32, item_id: &str, count: i32, hand: i32) -> bool {
        self.guarded(EventKind::ItemUse, true, |registry, _| {
            registry.dispatch_item_use(player_id, item_id, count, hand)
        })
    }

    /// A player used an item on a block face. Default: `Allow`.
    pub fn dispatch_item_use_on_block(
        &self,
        player_id: i32,
        item_id: &str,
        count: i32,
        hand: i32,
        pos: BlockPos,
        face: i32,
    ) -> EventResult {
        self.guarded(EventKind::ItemUseOnBlock, EventResult::default(), |registry, _| {
            registry.dispatch_item_use_on_block(player_id, item_id, count, hand, pos, face)
        })
    }

    /// A player used an item on an entity. Default: `Allow`.
    pub fn dispatch_item_use_on_entity(
        &self,
        player_id: i32,
        item_id: &str,
        count: i32,
        hand: i32,
        target_id: i32,
    ) -> EventResult {
        self.guarded(EventKind::ItemUseOnEntity, EventResult::default(), |registry, _| {
            registry.dispatch_item_use_on_entity(player_id, item_id, count, hand, target_id)
        })
    }

    /// A player picked up an item entity. Default: `true`.
    pub fn dispatch_player_pickup_item(&self, player_id: i32, item_entity_id: i32) -> bool {
        self.guarded(EventKind::PlayerPickupItem, true, |registry, _| {
            registry.dispatch_player_pickup_item(player_id, item_entity_id)
        })
    }

    /// A player dropped an item stack. Default: `true`.
    pub fn dispatch_player_drop_item(&self, player_id: i32, item_id: &str, count: i32) -> bool {
        self.guarded(EventKind::PlayerDropItem, true, |registry, _| {
            registry.dispatch_player_drop_item(player_id, item_id, count)
        })
    }

    // ========================================================================
    // Server lifecycle
    // ========================================================================

    /// The server is starting
    pub fn dispatch_server_starting(&self) {
        self.guarded(EventKind::ServerStarting, (), |registry, _| {
            registry.dispatch_server_starting()
        })
    }

    /// The server finished starting
    pub fn dispatch_server_started(&self) {
        self.guarded(EventKind::ServerStarted, (), |registry, _| {
            registry.dispatch_server_started()
        })
    }

    /// The server is stopping
    pub fn dispatch_server_stopping(&self) {
        self.guarded(EventKind::ServerStopping, (), |registry, _| {
            registry.dispatch_server_stopping()
        })
    }
}
