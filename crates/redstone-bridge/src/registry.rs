//! Handler registry
//!
//! One slot per [`EventKind`], each holding at most one handler. Registering
//! overwrites; nothing composes. Dispatching an empty slot yields the event's
//! default.
//!
//! The registry lock is held for the whole handler call, so at most one
//! handler runs at a time process-wide. The lock is reentrant: a handler may
//! register handlers or dispatch further events on its own thread.

use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use redstone_sdk::abi::TextReleaseCallback;
use redstone_sdk::{
    ActionResult, BlockBreakResult, BlockPos, EventKind, EventResult, InteractResult, ProxyTarget,
    ReplacementText,
};

macro_rules! handler_table {
    ($(
        $(#[$doc:meta])*
        $variant:ident => $set:ident, $dispatch:ident ( $($arg:ident : $ty:ty),* ) -> $ret:ty = $default:expr;
    )*) => {
        /// A registered handler, tagged with its event kind
        #[derive(Clone)]
        pub enum Handler {
            $(
                $(#[$doc])*
                $variant(Arc<dyn Fn($($ty),*) -> $ret + Send + Sync>),
            )*
        }

        impl Handler {
            /// Event kind this handler serves
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Handler::$variant(_) => EventKind::$variant,)*
                }
            }
        }

        impl HandlerRegistry {
            $(
                #[doc = concat!("Register the `", stringify!($variant), "` handler, replacing any previous one")]
                pub fn $set<F>(&self, handler: F)
                where
                    F: Fn($($ty),*) -> $ret + Send + Sync + 'static,
                {
                    self.set(Handler::$variant(Arc::new(handler)));
                }

                #[doc = concat!("Run the `", stringify!($variant), "` handler, or return its default")]
                pub fn $dispatch(&self, $($arg: $ty),*) -> $ret {
                    let slots = self.slots.lock();
                    let handler = slots.borrow().handlers[EventKind::$variant.index()].clone();
                    match handler {
                        Some(Handler::$variant(f)) => f($($arg),*),
                        _ => $default,
                    }
                }
            )*
        }
    };
}

handler_table! {
    /// `(pos, player_id) -> BlockBreakResult`, default `Allow`
    BlockBreak => set_block_break, dispatch_block_break(pos: BlockPos, player_id: i64)
        -> BlockBreakResult = BlockBreakResult::default();
    /// `(pos, player_id, hand) -> InteractResult`, default `Allow`
    BlockInteract => set_block_interact, dispatch_block_interact(pos: BlockPos, player_id: i64, hand: i32)
        -> InteractResult = InteractResult::default();
    /// `(tick)`
    Tick => set_tick, dispatch_tick(tick: i64) -> () = ();
    /// `(target, player_id) -> allow`, default `true`
    ProxyBlockBreak => set_proxy_block_break, dispatch_proxy_block_break(target: ProxyTarget, player_id: i64)
        -> bool = true;
    /// `(target, player_id, hand) -> ActionResult`, default `Pass`
    ProxyBlockUse => set_proxy_block_use, dispatch_proxy_block_use(target: ProxyTarget, player_id: i64, hand: i32)
        -> ActionResult = ActionResult::default();
    /// `(player_id)`
    PlayerJoin => set_player_join, dispatch_player_join(player_id: i32) -> () = ();
    /// `(player_id)`
    PlayerLeave => set_player_leave, dispatch_player_leave(player_id: i32) -> () = ();
    /// `(player_id, end_conquered)`
    PlayerRespawn => set_player_respawn, dispatch_player_respawn(player_id: i32, end_conquered: bool)
        -> () = ();
    /// `(player_id, damage_source) -> replacement death message`
    PlayerDeath => set_player_death, dispatch_player_death(player_id: i32, damage_source: &str)
        -> ReplacementText = ReplacementText::PassThrough;
    /// `(entity_id, damage_source, amount) -> allow`, default `true`
    EntityDamage => set_entity_damage, dispatch_entity_damage(entity_id: i32, damage_source: &str, amount: f64)
        -> bool = true;
    /// `(entity_id, damage_source)`
    EntityDeath => set_entity_death, dispatch_entity_death(entity_id: i32, damage_source: &str) -> () = ();
    /// `(player_id, target_id) -> allow`, default `true`
    PlayerAttackEntity => set_player_attack_entity, dispatch_player_attack_entity(player_id: i32, target_id: i32)
        -> bool = true;
    /// `(player_id, message) -> replacement message`
    PlayerChat => set_player_chat, dispatch_player_chat(player_id: i32, message: &str)
        -> ReplacementText = ReplacementText::PassThrough;
    /// `(player_id, command) -> allow`, default `true`
    PlayerCommand => set_player_command, dispatch_player_command(player_id: i32, command: &str) -> bool = true;
    /// `(player_id, item_id, count, hand) -> allow`, default `true`
    ItemUse => set_item_use, dispatch_item_use(player_id: i32, item_id: &str, count: i32, hand: i32)
        -> bool = true;
    /// `(player_id, item_id, count, hand, pos, face) -> EventResult`, default `Allow`
    ItemUseOnBlock => set_item_use_on_block, dispatch_item_use_on_block(
        player_id: i32, item_id: &str, count: i32, hand: i32, pos: BlockPos, face: i32
    ) -> EventResult = EventResult::default();
    /// `(player_id, item_id, count, hand, target_id) -> EventResult`, default `Allow`
    ItemUseOnEntity => set_item_use_on_entity, dispatch_item_use_on_entity(
        player_id: i32, item_id: &str, count: i32, hand: i32, target_id: i32
    ) -> EventResult = EventResult::default();
    /// `(player_id, pos, block_id) -> allow`, default `true`
    BlockPlace => set_block_place, dispatch_block_place(player_id: i32, pos: BlockPos, block_id: &str)
        -> bool = true;
    /// `(player_id, item_entity_id) -> allow`, default `true`
    PlayerPickupItem => set_player_pickup_item, dispatch_player_pickup_item(player_id: i32, item_entity_id: i32)
        -> bool = true;
    /// `(player_id, item_id, count) -> allow`, default `true`
    PlayerDropItem => set_player_drop_item, dispatch_player_drop_item(player_id: i32, item_id: &str, count: i32)
        -> bool = true;
    /// Server is starting
    ServerStarting => set_server_starting, dispatch_server_starting() -> () = ();
    /// Server has started
    ServerStarted => set_server_started, dispatch_server_started() -> () = ();
    /// Server is stopping
    ServerStopping => set_server_stopping, dispatch_server_stopping() -> () = ();
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}

#[derive(Default)]
struct Slots {
    handlers: [Option<Handler>; EventKind::COUNT],
    text_release: Option<TextReleaseCallback>,
}

/// Table of handlers, one slot per event kind
pub struct HandlerRegistry {
    slots: ReentrantMutex<RefCell<Slots>>,
}

impl HandlerRegistry {
    /// Create a registry with every slot empty
    pub fn new() -> Self {
        Self {
            slots: ReentrantMutex::new(RefCell::new(Slots::default())),
        }
    }

    /// Install a handler in its kind's slot
    pub fn set(&self, handler: Handler) {
        let kind = handler.kind();
        let slots = self.slots.lock();
        let previous = slots.borrow_mut().handlers[kind.index()].replace(handler);
        tracing::debug!(event = %kind, replaced = previous.is_some(), "handler registered");
    }

    /// Empty one slot, returning the handler it held
    pub fn unset(&self, kind: EventKind) -> Option<Handler> {
        let slots = self.slots.lock();
        let previous = slots.borrow_mut().handlers[kind.index()].take();
        previous
    }

    /// Whether a handler is installed for `kind`
    pub fn is_registered(&self, kind: EventKind) -> bool {
        let slots = self.slots.lock();
        let registered = slots.borrow().handlers[kind.index()].is_some();
        registered
    }

    /// Number of occupied slots
    pub fn registered_count(&self) -> usize {
        let slots = self.slots.lock();
        let count = slots.borrow().handlers.iter().filter(|slot| slot.is_some()).count();
        count
    }

    /// Empty every slot, including the text release routine
    pub fn clear(&self) {
        let slots = self.slots.lock();
        *slots.borrow_mut() = Slots::default();
        tracing::debug!("handler registry cleared");
    }

    /// Install the routine that frees text buffers returned by raw handlers
    pub fn set_text_release(&self, release: Option<TextReleaseCallback>) {
        let slots = self.slots.lock();
        slots.borrow_mut().text_release = release;
    }

    /// Currently installed text release routine
    pub fn text_release(&self) -> Option<TextReleaseCallback> {
        let slots = self.slots.lock();
        let release = slots.borrow().text_release;
        release
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
