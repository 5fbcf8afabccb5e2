//! The transient graph the engine builds over cells it touches during a
//! settle: flat node records in a reusable arena, linked by index.

use core::ops;

use crate::block::{BlockState, Power, WireType, AIR};
use crate::math::{Cell, Direction};
use crate::wire::connection::{Connections, ConnectionSide};

/// Index of a [`Node`] in the [`NodeArena`].
///
/// Plain index, not an owning handle: links between nodes are `NodeId`s, so
/// discarding a node never touches its neighbors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct NodeId(pub(crate) u32);

/// The engine's view of one cell during a settle.
#[derive(Debug)]
pub(crate) struct Node {
    pub pos: Cell,
    /// Snapshot of the block state, possibly stale when `invalid`.
    pub state: BlockState,
    /// Lazily built links to adjacent nodes, kept symmetric.
    pub neighbors: [Option<NodeId>; 6],
    /// Snapshot may be stale; re-read the world before trusting it.
    pub invalid: bool,
    /// The wire whose power change queued this block update.
    pub neighbor_wire: Option<NodeId>,
    /// Whether this (non-wire) cell already received its block update in the
    /// current settle.
    pub block_updated: bool,
    /// `Some` iff the snapshot state is a wire.
    pub wire: Option<WireState>,
}

/// [`Node`] fields that only wire cells have.
#[derive(Debug)]
pub(crate) struct WireState {
    pub wire_type: &'static WireType,
    /// Power as last written to (or read from) the world.
    pub current_power: Power,
    /// In-flight candidate power; below `min` means "not yet offered any".
    pub virtual_power: Power,
    /// Power from non-wire sources; `min - 1` until computed.
    pub external_power: Power,
    /// Cardinal bitmask of the flow that produced `virtual_power`.
    pub flow_in: u8,
    /// Resolved outgoing flow direction; starts at the backup set on enqueue.
    pub flow_dir: Option<Direction>,
    pub connections: Connections,
    pub discovered: bool,
    pub searched: bool,
    pub root: bool,
    pub added: bool,
    pub removed: bool,
    pub should_break: bool,
    /// Intrusive link for the search queue.
    pub next_search: Option<NodeId>,
}

impl WireState {
    fn new(wire_type: &'static WireType, state: BlockState) -> Self {
        let current_power = wire_type.signal().clamp(state.power());
        Self {
            wire_type,
            current_power,
            virtual_power: current_power,
            external_power: wire_type.min() - 1,
            flow_in: 0,
            flow_dir: None,
            connections: Connections::new(),
            discovered: false,
            searched: false,
            root: false,
            added: false,
            removed: false,
            should_break: false,
            next_search: None,
        }
    }

    /// The cardinal index of the flow direction, defaulting to west.
    pub fn flow_index(&self) -> usize {
        self.flow_dir.map_or(0, Direction::index)
    }

    /// Accepts an offer of power arriving across `side`. A strictly higher
    /// offer replaces the virtual power and the flow; an equal offer merges
    /// its flow bits. Returns whether the virtual power rose.
    pub fn offer_power(&mut self, power: Power, side: ConnectionSide) -> bool {
        if self.removed || self.should_break {
            return false;
        }
        match power.cmp(&self.virtual_power) {
            core::cmp::Ordering::Greater => {
                self.virtual_power = power;
                self.flow_in = side.flow_in();
                true
            }
            core::cmp::Ordering::Equal => {
                self.flow_in |= side.flow_in();
                false
            }
            core::cmp::Ordering::Less => false,
        }
    }
}

impl Node {
    fn blank() -> Self {
        Self {
            pos: Cell::ORIGIN,
            state: AIR.default_state(),
            neighbors: [None; 6],
            invalid: false,
            neighbor_wire: None,
            block_updated: false,
            wire: None,
        }
    }

    /// Re-initializes this node for a cell. `fresh` clears the neighbor
    /// links and per-settle bookkeeping; revalidation passes `false` so that
    /// links (and the already-updated mark) survive across re-entry.
    pub fn set(&mut self, pos: Cell, state: BlockState, fresh: bool) {
        self.pos = pos;
        self.state = state;
        self.invalid = false;
        self.neighbor_wire = None;
        if fresh {
            self.neighbors = [None; 6];
            self.block_updated = false;
        }
        self.wire = state
            .wire_type()
            .map(|wire_type| WireState::new(wire_type, state));
    }

    pub fn is_wire(&self) -> bool {
        self.wire.is_some()
    }

    /// The wire refinement of this node. Panics on non-wire nodes; callers
    /// are expected to have checked [`Node::is_wire()`].
    #[track_caller]
    pub fn wire(&self) -> &WireState {
        self.wire.as_ref().unwrap()
    }

    #[track_caller]
    pub fn wire_mut(&mut self) -> &mut WireState {
        self.wire.as_mut().unwrap()
    }
}

/// Pool of [`Node`]s reused across settles.
///
/// Slots are initialized eagerly and handed out by bumping a counter, so
/// allocation inside a settle is constant-time; [`NodeArena::reset()`] just
/// rewinds the counter.
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
    in_use: usize,
}

impl NodeArena {
    const INITIAL_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self {
            nodes: (0..Self::INITIAL_CAPACITY).map(|_| Node::blank()).collect(),
            in_use: 0,
        }
    }

    /// Takes the next free node, grows the pool if it is exhausted, and
    /// initializes the node for the given cell.
    pub fn alloc(&mut self, pos: Cell, state: BlockState) -> NodeId {
        if self.in_use == self.nodes.len() {
            let grown = self.nodes.len() * 2;
            self.nodes.resize_with(grown, Node::blank);
        }
        let id = NodeId(self.in_use as u32);
        self.in_use += 1;
        self.nodes[id.0 as usize].set(pos, state, true);
        id
    }

    /// Returns every slot to the pool. Node contents are retained for reuse;
    /// all outstanding [`NodeId`]s become meaningless.
    pub fn reset(&mut self) {
        self.in_use = 0;
    }
}

impl ops::Index<NodeId> for NodeArena {
    type Output = Node;
    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }
}

impl ops::IndexMut<NodeId> for NodeArena {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{LEVER, STONE, WIRE};

    #[test]
    fn arena_grows_by_doubling() {
        let mut arena = NodeArena::new();
        let ids: Vec<NodeId> = (0..40)
            .map(|i| arena.alloc(Cell::new(i, 0, 0), STONE.default_state()))
            .collect();
        assert_eq!(arena.nodes.len(), 64);
        // Ids are dense and distinct.
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.0 as usize, i);
        }
    }

    #[test]
    fn reset_reuses_slots() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(Cell::new(1, 2, 3), WIRE.default_state().with_power(7));
        assert!(arena[a].is_wire());
        assert_eq!(arena[a].wire().current_power, 7);

        arena.reset();
        let b = arena.alloc(Cell::new(9, 9, 9), LEVER.default_state());
        assert_eq!(a, b);
        assert!(!arena[b].is_wire());
        assert_eq!(arena[b].pos, Cell::new(9, 9, 9));
        assert_eq!(arena[b].neighbors, [None; 6]);
    }

    #[test]
    fn offers_replace_or_merge_flow() {
        let mut wire = WireState::new(&crate::block::CHARGE_WIRE, WIRE.default_state());
        assert!(wire.offer_power(5, ConnectionSide::East));
        assert_eq!(wire.flow_in, ConnectionSide::East.flow_in());

        // Equal offer: flow accumulates, power does not change.
        assert!(!wire.offer_power(5, ConnectionSide::North));
        assert_eq!(
            wire.flow_in,
            ConnectionSide::East.flow_in() | ConnectionSide::North.flow_in()
        );

        // Higher offer: flow is replaced.
        assert!(wire.offer_power(9, ConnectionSide::South));
        assert_eq!(wire.flow_in, ConnectionSide::South.flow_in());

        // Lower offers are ignored, and removed wires accept nothing.
        assert!(!wire.offer_power(3, ConnectionSide::West));
        wire.removed = true;
        assert!(!wire.offer_power(15, ConnectionSide::West));
    }
}
