//! The eighteen geometries by which one wire can reach another, and the
//! ordering tables that make neighbor updates deterministic.

use crate::math::{Direction, GridVector};
use crate::wire::node::NodeId;

/// How one wire cell reaches another: directly, across a horizontal
/// diagonal, or along a staircase step up or down.
///
/// The discriminant order groups the six direct sides first; it is also the
/// index into the flow tables below.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, exhaust::Exhaust)]
#[allow(missing_docs, clippy::exhaustive_enums)]
#[repr(u8)]
pub enum ConnectionSide {
    Down = 0,
    Up = 1,
    North = 2,
    South = 3,
    West = 4,
    East = 5,
    NorthDown = 6,
    SouthUp = 7,
    SouthDown = 8,
    NorthUp = 9,
    WestDown = 10,
    EastUp = 11,
    EastDown = 12,
    WestUp = 13,
    NorthWest = 14,
    SouthEast = 15,
    NorthEast = 16,
    SouthWest = 17,
}

/// The component structure of a [`ConnectionSide`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SideShape {
    /// One step in the given direction.
    Direct(Direction),
    /// One step along each of two cardinal directions.
    Diagonal(Direction, Direction),
    /// One cardinal step and one vertical step.
    Staircase {
        /// The horizontal component.
        cardinal: Direction,
        /// [`Direction::Up`] or [`Direction::Down`].
        vertical: Direction,
    },
}

impl ConnectionSide {
    /// Number of distinct sides.
    pub const COUNT: usize = 18;

    /// All sides, in index order.
    pub const ALL: [ConnectionSide; Self::COUNT] = [
        ConnectionSide::Down,
        ConnectionSide::Up,
        ConnectionSide::North,
        ConnectionSide::South,
        ConnectionSide::West,
        ConnectionSide::East,
        ConnectionSide::NorthDown,
        ConnectionSide::SouthUp,
        ConnectionSide::SouthDown,
        ConnectionSide::NorthUp,
        ConnectionSide::WestDown,
        ConnectionSide::EastUp,
        ConnectionSide::EastDown,
        ConnectionSide::WestUp,
        ConnectionSide::NorthWest,
        ConnectionSide::SouthEast,
        ConnectionSide::NorthEast,
        ConnectionSide::SouthWest,
    ];

    /// This side's index, equal to its discriminant.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The side by which the peer wire sees this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        use ConnectionSide::*;
        match self {
            Down => Up,
            Up => Down,
            North => South,
            South => North,
            West => East,
            East => West,
            NorthDown => SouthUp,
            SouthUp => NorthDown,
            SouthDown => NorthUp,
            NorthUp => SouthDown,
            WestDown => EastUp,
            EastUp => WestDown,
            EastDown => WestUp,
            WestUp => EastDown,
            NorthWest => SouthEast,
            SouthEast => NorthWest,
            NorthEast => SouthWest,
            SouthWest => NorthEast,
        }
    }

    pub(crate) const fn shape(self) -> SideShape {
        use ConnectionSide::*;
        use Direction as D;
        match self {
            Down => SideShape::Direct(D::Down),
            Up => SideShape::Direct(D::Up),
            North => SideShape::Direct(D::North),
            South => SideShape::Direct(D::South),
            West => SideShape::Direct(D::West),
            East => SideShape::Direct(D::East),
            NorthDown => SideShape::Staircase { cardinal: D::North, vertical: D::Down },
            SouthUp => SideShape::Staircase { cardinal: D::South, vertical: D::Up },
            SouthDown => SideShape::Staircase { cardinal: D::South, vertical: D::Down },
            NorthUp => SideShape::Staircase { cardinal: D::North, vertical: D::Up },
            WestDown => SideShape::Staircase { cardinal: D::West, vertical: D::Down },
            EastUp => SideShape::Staircase { cardinal: D::East, vertical: D::Up },
            EastDown => SideShape::Staircase { cardinal: D::East, vertical: D::Down },
            WestUp => SideShape::Staircase { cardinal: D::West, vertical: D::Up },
            NorthWest => SideShape::Diagonal(D::North, D::West),
            SouthEast => SideShape::Diagonal(D::South, D::East),
            NorthEast => SideShape::Diagonal(D::North, D::East),
            SouthWest => SideShape::Diagonal(D::South, D::West),
        }
    }

    /// Displacement from a wire to its peer across this side.
    pub fn offset(self) -> GridVector {
        match self.shape() {
            SideShape::Direct(d) => d.vector(),
            SideShape::Diagonal(a, b) => a.vector() + b.vector(),
            SideShape::Staircase { cardinal, vertical } => cardinal.vector() + vertical.vector(),
        }
    }

    /// The cardinal flow bits attributed to power moving across this side,
    /// one bit per direction in index order (west = bit 0).
    ///
    /// Vertical sides carry no cardinal flow; diagonal sides carry both of
    /// their components.
    pub(crate) const fn flow_in(self) -> u8 {
        use ConnectionSide::*;
        match self {
            Down | Up => 0b0000,
            North | NorthDown | NorthUp => 0b0010,
            South | SouthUp | SouthDown => 0b1000,
            West | WestDown | WestUp => 0b0001,
            East | EastUp | EastDown => 0b0100,
            NorthWest => 0b0011,
            SouthEast => 0b1100,
            NorthEast => 0b0110,
            SouthWest => 0b1001,
        }
    }
}

/// Converts a 4-bit cardinal flow mask (west = bit 0, in index order) to the
/// implied outgoing flow direction.
///
/// One bit picks its own direction. Two non-opposing bits pick the one that
/// is a single clockwise turn from the other. Three bits pick the direction
/// whose opposite is absent. Everything else is ambiguous.
pub(crate) const FLOW_IN_TO_FLOW_OUT: [Option<Direction>; 16] = {
    use Direction::*;
    [
        None,        // 0b0000
        Some(West),  // 0b0001: west
        Some(North), // 0b0010: north
        Some(North), // 0b0011: west+north
        Some(East),  // 0b0100: east
        None,        // 0b0101: west+east
        Some(East),  // 0b0110: north+east
        Some(North), // 0b0111: west+north+east
        Some(South), // 0b1000: south
        Some(West),  // 0b1001: south+west
        None,        // 0b1010: north+south
        Some(West),  // 0b1011: west+north+south
        Some(South), // 0b1100: east+south
        Some(South), // 0b1101: west+east+south
        Some(East),  // 0b1110: north+east+south
        None,        // 0b1111
    ]
};

/// Cardinal update orders. Indexed by the direction considered "forward",
/// each row is `{front, back, right, left}`.
pub(crate) const CARDINAL_UPDATE_ORDERS: [[Direction; 4]; 4] = {
    use Direction::*;
    [
        [West, East, North, South],
        [North, South, East, West],
        [East, West, South, North],
        [South, North, West, East],
    ]
};

/// Update orders over all six directions. Indexed by the direction
/// considered "forward", each row is `{front, back, right, left, down, up}`.
pub(crate) const FULL_UPDATE_ORDERS: [[Direction; 6]; 4] = {
    use Direction::*;
    [
        [West, East, North, South, Down, Up],
        [North, South, East, West, Down, Up],
        [East, West, South, North, Down, Up],
        [South, North, West, East, Down, Up],
    ]
};

/// The update order used when no flow direction applies; west is "forward".
pub(crate) const DEFAULT_FULL_UPDATE_ORDER: [Direction; 6] = FULL_UPDATE_ORDERS[0];

/// Connection iteration orders. Indexed by the direction considered
/// "forward"; within each row sides appear grouped direct, then diagonal,
/// then staircase, pairs mirrored across the forward axis.
pub(crate) const CONNECTION_UPDATE_ORDERS: [[ConnectionSide; ConnectionSide::COUNT]; 4] = {
    use ConnectionSide::*;
    [
        [
            West, East, North, South, Down, Up, //
            NorthWest, SouthEast, SouthWest, NorthEast, //
            WestDown, EastUp, WestUp, EastDown, NorthDown, SouthUp, NorthUp, SouthDown,
        ],
        [
            North, South, East, West, Down, Up, //
            NorthEast, SouthWest, NorthWest, SouthEast, //
            NorthDown, SouthUp, NorthUp, SouthDown, EastDown, WestUp, EastUp, WestDown,
        ],
        [
            East, West, South, North, Down, Up, //
            SouthEast, NorthWest, NorthEast, SouthWest, //
            EastDown, WestUp, EastUp, WestDown, SouthDown, NorthUp, SouthUp, NorthDown,
        ],
        [
            South, North, West, East, Down, Up, //
            SouthWest, NorthEast, SouthEast, NorthWest, //
            SouthDown, NorthUp, SouthUp, NorthDown, WestDown, EastUp, WestUp, EastDown,
        ],
    ]
};

/// The directional capability of a connection between two wires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum ConnectionType {
    /// The peer can feed this wire but not the reverse.
    In,
    /// This wire can feed the peer but not the reverse.
    Out,
    /// Power may flow either way.
    Both,
}

impl ConnectionType {
    pub(crate) fn from_capabilities(out: bool, in_: bool) -> Option<Self> {
        match (out, in_) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Out),
            (false, true) => Some(Self::In),
            (false, false) => None,
        }
    }

    /// Whether the peer can feed this wire.
    #[inline]
    pub fn inbound(self) -> bool {
        matches!(self, Self::In | Self::Both)
    }

    /// Whether this wire can feed the peer.
    #[inline]
    pub fn outbound(self) -> bool {
        matches!(self, Self::Out | Self::Both)
    }
}

/// One established connection from a wire to a peer wire.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WireConnection {
    pub side: ConnectionSide,
    pub peer: NodeId,
    pub ty: ConnectionType,
}

/// The connection set of one wire, indexed by side.
///
/// Alongside the connections themselves this tracks `total` and the cardinal
/// flow direction implied purely by which sides are connected, which serves
/// as a deterministic fallback when runtime flow information is ambiguous.
#[derive(Clone, Debug)]
pub(crate) struct Connections {
    by_side: [Option<WireConnection>; ConnectionSide::COUNT],
    total: usize,
    mask: u8,
}

impl Connections {
    pub fn new() -> Self {
        Self {
            by_side: [None; ConnectionSide::COUNT],
            total: 0,
            mask: 0,
        }
    }

    pub fn add(&mut self, side: ConnectionSide, peer: NodeId, ty: ConnectionType) {
        debug_assert!(self.by_side[side.index()].is_none());
        self.by_side[side.index()] = Some(WireConnection { side, peer, ty });
        self.total += 1;
        self.mask |= side.flow_in();
    }

    pub fn get(&self, side: ConnectionSide) -> Option<WireConnection> {
        self.by_side[side.index()]
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// The flow direction implied by the connection layout, if unambiguous.
    pub fn flow(&self) -> Option<Direction> {
        FLOW_IN_TO_FLOW_OUT[usize::from(self.mask)]
    }

    /// Connections in canonical (side-index) order.
    pub fn iter(&self) -> impl Iterator<Item = WireConnection> + '_ {
        self.by_side.iter().flatten().copied()
    }
}
