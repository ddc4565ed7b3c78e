//! Plain value types passed to handlers

/// Integer block coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl BlockPos {
    /// The world origin
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    /// Create a block position
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

/// Addresses one proxy block instance.
///
/// Proxy blocks are host-side placeholders whose behavior lives entirely in
/// the embedded runtime. `handler_id` selects the embedded-side handler that
/// was bound to the block type when it was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProxyTarget {
    /// Embedded-side handler bound to the block type
    pub handler_id: i64,
    /// Host world identifier
    pub world_id: i64,
    /// Block position inside that world
    pub pos: BlockPos,
}

impl ProxyTarget {
    /// Address a proxy block
    pub const fn new(handler_id: i64, world_id: i64, pos: BlockPos) -> Self {
        Self {
            handler_id,
            world_id,
            pos,
        }
    }
}
