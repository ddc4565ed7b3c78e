//! The closed set of event channels

use std::fmt;

/// Every event the host can dispatch into the embedded runtime.
///
/// The set is fixed at compile time. Each kind owns exactly one handler slot
/// in the registry, addressed by [`EventKind::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A player broke a block
    BlockBreak,
    /// A player right-clicked a block
    BlockInteract,
    /// Server tick
    Tick,
    /// A proxy block was broken
    ProxyBlockBreak,
    /// A proxy block was used
    ProxyBlockUse,
    /// A player joined
    PlayerJoin,
    /// A player left
    PlayerLeave,
    /// A player respawned
    PlayerRespawn,
    /// A player died
    PlayerDeath,
    /// An entity is about to take damage
    EntityDamage,
    /// An entity died
    EntityDeath,
    /// A player attacked an entity
    PlayerAttackEntity,
    /// A player sent a chat message
    PlayerChat,
    /// A player ran a command
    PlayerCommand,
    /// A player used an item in the air
    ItemUse,
    /// A player used an item on a block
    ItemUseOnBlock,
    /// A player used an item on an entity
    ItemUseOnEntity,
    /// A player placed a block
    BlockPlace,
    /// A player picked up an item entity
    PlayerPickupItem,
    /// A player dropped an item
    PlayerDropItem,
    /// The server is starting
    ServerStarting,
    /// The server finished starting
    ServerStarted,
    /// The server is stopping
    ServerStopping,
}

impl EventKind {
    /// Number of event kinds (and handler slots)
    pub const COUNT: usize = 23;

    /// All event kinds in slot order
    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::BlockBreak,
        EventKind::BlockInteract,
        EventKind::Tick,
        EventKind::ProxyBlockBreak,
        EventKind::ProxyBlockUse,
        EventKind::PlayerJoin,
        EventKind::PlayerLeave,
        EventKind::PlayerRespawn,
        EventKind::PlayerDeath,
        EventKind::EntityDamage,
        EventKind::EntityDeath,
        EventKind::PlayerAttackEntity,
        EventKind::PlayerChat,
        EventKind::PlayerCommand,
        EventKind::ItemUse,
        EventKind::ItemUseOnBlock,
        EventKind::ItemUseOnEntity,
        EventKind::BlockPlace,
        EventKind::PlayerPickupItem,
        EventKind::PlayerDropItem,
        EventKind::ServerStarting,
        EventKind::ServerStarted,
        EventKind::ServerStopping,
    ];

    /// Dense slot index in `0..COUNT`
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Identifier used in logs and symbol names
    pub fn name(self) -> &'static str {
        match self {
            EventKind::BlockBreak => "block_break",
            EventKind::BlockInteract => "block_interact",
            EventKind::Tick => "tick",
            EventKind::ProxyBlockBreak => "proxy_block_break",
            EventKind::ProxyBlockUse => "proxy_block_use",
            EventKind::PlayerJoin => "player_join",
            EventKind::PlayerLeave => "player_leave",
            EventKind::PlayerRespawn => "player_respawn",
            EventKind::PlayerDeath => "player_death",
            EventKind::EntityDamage => "entity_damage",
            EventKind::EntityDeath => "entity_death",
            EventKind::PlayerAttackEntity => "player_attack_entity",
            EventKind::PlayerChat => "player_chat",
            EventKind::PlayerCommand => "player_command",
            EventKind::ItemUse => "item_use",
            EventKind::ItemUseOnBlock => "item_use_on_block",
            EventKind::ItemUseOnEntity => "item_use_on_entity",
            EventKind::BlockPlace => "block_place",
            EventKind::PlayerPickupItem => "player_pickup_item",
            EventKind::PlayerDropItem => "player_drop_item",
            EventKind::ServerStarting => "server_starting",
            EventKind::ServerStarted => "server_started",
            EventKind::ServerStopping => "server_stopping",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
