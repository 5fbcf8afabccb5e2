//! The settle driver: finds the wires whose power disagrees with their
//! surroundings, settles the whole connected network in three phases, and
//! emits block and shape updates in a deterministic, non-locational order.
//!
//! The driver deliberately avoids the naive recursive spread, where each
//! wire recomputes its power in isolation and can change value many times
//! before the network stabilizes. Instead it builds the network once,
//! finds the wires that receive power from outside it (the roots), empties
//! the network, and then spreads power from the roots — so each wire probes
//! non-wire components at most once and writes the world at most once.
//!
//! The order in which neighbors are updated is derived from the computed
//! direction of power flow through each wire rather than from cell
//! coordinates, which makes the emitted update sequence a pure function of
//! the world contents and the call sequence.

use hashbrown::HashMap;

use crate::block::{BlockState, Power, AIR};
use crate::math::{Cell, Direction, I_EXCEPT, I_EXCEPT_CARDINAL};
use crate::wire::connection::{
    ConnectionSide, ConnectionType, Connections, SideShape, CARDINAL_UPDATE_ORDERS,
    CONNECTION_UPDATE_ORDERS, DEFAULT_FULL_UPDATE_ORDER, FLOW_IN_TO_FLOW_OUT, FULL_UPDATE_ORDERS,
};
use crate::wire::node::{NodeArena, NodeId};
use crate::wire::queue::{Priority, SearchQueue, UpdateQueue};
use crate::world::World;

/// Settles signal networks over a voxel grid.
///
/// One handler serves one world; it owns a transient node graph, a node
/// arena, and the two queues that drive a settle. The handler holds no
/// reference to the world — every operation borrows one for its own
/// duration, and world callbacks made while settling may synchronously
/// re-enter the handler.
pub struct WireHandler {
    /// Map of wires and neighboring blocks touched by the current settle.
    nodes: HashMap<Cell, NodeId>,
    arena: NodeArena,
    /// Queue for the breadth-first search through the network.
    search: SearchQueue,
    /// Queue of updates to wires and neighboring blocks.
    updates: UpdateQueue,
    /// Whether the handler is currently working through the update queue.
    updating: bool,
}

impl WireHandler {
    /// Creates a handler with an empty, pre-filled node arena.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            arena: NodeArena::new(),
            search: SearchQueue::new(),
            updates: UpdateQueue::new(),
            updating: false,
        }
    }

    /// A wire at `pos` was told its surroundings changed. Settles the
    /// network it belongs to if its power no longer matches them.
    pub fn on_wire_update(&mut self, world: &mut dyn World, pos: Cell) {
        self.invalidate();
        self.find_roots(world, pos);
        self.try_settle(world);
    }

    /// A wire was just placed at `pos`.
    pub fn on_wire_added(&mut self, world: &mut dyn World, pos: Cell) {
        let id = self.get_or_add(&*world, pos);
        if !self.arena[id].is_wire() {
            return; // we should never get here
        }
        self.arena[id].wire_mut().added = true;

        self.invalidate();
        let _ = self.revalidate(&*world, id);
        self.find_root(&*world, id);
        self.try_settle(world);
    }

    /// The wire that held `state` was just removed from `pos`.
    pub fn on_wire_removed(&mut self, world: &mut dyn World, pos: Cell, state: BlockState) {
        let id = match self.nodes.remove(&pos) {
            Some(id) if self.arena[id].is_wire() => id,
            _ => self.arena.alloc(pos, state),
        };
        if !self.arena[id].is_wire() {
            return; // we should never get here
        }
        {
            let updating = self.updating;
            let node = &mut self.arena[id];
            node.invalid = true;
            let wire = node.wire_mut();
            wire.removed = true;

            // If the wire is already marked as breaking, its removal is part
            // of power changes that are underway; nothing more to do.
            if updating && wire.should_break {
                return;
            }
        }

        self.invalidate();
        let _ = self.revalidate(&*world, id);
        self.find_root(&*world, id);
        self.try_settle(world);
    }

    // ------------------------------------------------------------------
    // Node graph and arena

    /// The node for `pos`, created or revalidated as needed.
    fn get_or_add(&mut self, world: &dyn World, pos: Cell) -> NodeId {
        match self.nodes.get(&pos).copied() {
            None => {
                let id = self.next_node(world, pos);
                self.nodes.insert(pos, id);
                id
            }
            Some(id) if self.arena[id].invalid => {
                let new_id = self.revalidate(world, id);
                if new_id != id {
                    self.nodes.insert(pos, new_id);
                }
                new_id
            }
            Some(id) => id,
        }
    }

    fn next_node(&mut self, world: &dyn World, pos: Cell) -> NodeId {
        let state = world.block_state(pos);
        self.arena.alloc(pos, state)
    }

    /// Brings a stale node back in sync with the world. If the cell's
    /// wire-ness (or, for wires, the wire block itself) changed, a
    /// replacement node is allocated instead; otherwise the node is
    /// refreshed in place, which keeps its links stable across re-entry.
    fn revalidate(&mut self, world: &dyn World, id: NodeId) -> NodeId {
        if !self.arena[id].invalid {
            return id;
        }

        let pos = self.arena[id].pos;
        let state = world.block_state(pos);
        let was_wire = self.arena[id].is_wire();

        if was_wire != state.is_wire() {
            return self.arena.alloc(pos, state);
        }
        if was_wire && !state.is_of(self.arena[id].state.block()) {
            return self.arena.alloc(pos, state);
        }

        let node = &mut self.arena[id];
        node.invalid = false;
        if node.is_wire() {
            // The block state snapshot is refreshed just before power is
            // written, so only the per-settle flags need resetting here.
            let wire = node.wire_mut();
            wire.root = false;
            wire.discovered = false;
            wire.searched = false;
        } else {
            node.set(pos, state, false);
        }
        id
    }

    /// The adjacent node in the given direction, lazily building and
    /// symmetrizing the link between the two.
    fn neighbor(&mut self, world: &dyn World, id: NodeId, dir: Direction) -> NodeId {
        let cached = self.arena[id].neighbors[dir.index()];
        if let Some(n) = cached {
            if !self.arena[n].invalid {
                return n;
            }
        }

        let pos = self.arena[id].pos.offset(dir);
        let n = self.get_or_add(world, pos);
        if cached != Some(n) {
            self.arena[id].neighbors[dir.index()] = Some(n);
            self.arena[n].neighbors[dir.opposite().index()] = Some(id);
        }
        n
    }

    /// Marks every known node stale. Necessary whenever power changes are
    /// already being carried out: the block and shape updates they emit may
    /// have changed the world under the snapshot.
    fn invalidate(&mut self) {
        if self.updating && !self.nodes.is_empty() {
            for &id in self.nodes.values() {
                self.arena[id].invalid = true;
            }
        }
    }

    // ------------------------------------------------------------------
    // Connection discovery

    /// Computes which neighboring wires the given wire connects to, and in
    /// which directions power may cross each connection.
    fn find_connections(&mut self, world: &dyn World, id: NodeId) {
        let pos = self.arena[id].pos;
        let wire_type = self.arena[id].wire().wire_type;

        let mut connections = Connections::new();
        for side in ConnectionSide::ALL {
            if !self.side_open(world, pos, side) {
                continue;
            }
            let peer = self.get_or_add(world, pos + side.offset());
            let Some(peer_state) = &self.arena[peer].wire else {
                continue;
            };
            let peer_type = peer_state.wire_type;
            let Some(ty) = ConnectionType::from_capabilities(
                wire_type.connects_to(peer_type),
                peer_type.connects_to(wire_type),
            ) else {
                continue;
            };
            connections.add(side, peer, ty);
        }
        self.arena[id].wire_mut().connections = connections;
    }

    /// Whether the geometry of a side permits a connection at all: direct
    /// sides always do, staircase and diagonal sides only when the cells the
    /// signal would cut across are not blocked by conductors.
    fn side_open(&mut self, world: &dyn World, pos: Cell, side: ConnectionSide) -> bool {
        match side.shape() {
            SideShape::Direct(_) => true,
            SideShape::Staircase {
                cardinal: _,
                vertical: Direction::Up,
            } => !self.conducts(world, pos.offset(Direction::Up), Direction::Down),
            SideShape::Staircase { cardinal, .. } => {
                !self.conducts(world, pos.offset(cardinal), Direction::Up)
            }
            SideShape::Diagonal(a, b) => {
                !(self.conducts(world, pos.offset(a), a.opposite())
                    && self.conducts(world, pos.offset(b), b.opposite()))
            }
        }
    }

    fn conducts(&mut self, world: &dyn World, pos: Cell, face: Direction) -> bool {
        let id = self.get_or_add(world, pos);
        let node = &self.arena[id];
        !node.is_wire() && node.state.is_any_signal_conductor(face)
    }

    // ------------------------------------------------------------------
    // Root discovery

    /// Looks for wires at and around `pos` that are in an invalid state and
    /// require power changes.
    ///
    /// Strictly only the wire at `pos` needs checking, but a network can
    /// receive power at several points at once — one source can feed
    /// multiple wires around it. Checking the wires around adjacent
    /// conductors and sources catches the common cases of that without
    /// enumerating the network.
    fn find_roots(&mut self, world: &mut dyn World, pos: Cell) {
        let id = self.get_or_add(&*world, pos);
        if !self.arena[id].is_wire() {
            return; // we should never get here
        }
        self.find_root(&*world, id);

        // Not in an invalid state, or not part of a larger network.
        let (searched, total, flow) = {
            let wire = self.arena[id].wire();
            (wire.searched, wire.connections.total(), wire.flow_index())
        };
        if !searched || total == 0 {
            return;
        }

        for dir in FULL_UPDATE_ORDERS[flow] {
            let neighbor = self.neighbor(&*world, id, dir);
            let opp = dir.opposite();
            let state = self.arena[neighbor].state;

            if state.is_any_signal_conductor(opp) || state.is_any_signal_source() {
                self.find_roots_around(world, neighbor, opp);
            }
        }
    }

    /// Root-checks any wire around the given node, skipping the direction
    /// the node was reached from.
    fn find_roots_around(&mut self, world: &dyn World, id: NodeId, except: Direction) {
        for &dir in I_EXCEPT_CARDINAL[except.index()] {
            let neighbor = self.neighbor(world, id, dir);
            if self.arena[neighbor].is_wire() {
                self.find_root(world, neighbor);
            }
        }
    }

    /// Checks whether the given wire requires power changes, and if so
    /// queues it for the breadth-first search as a root.
    fn find_root(&mut self, world: &dyn World, id: NodeId) {
        // Each wire only needs to be checked once.
        if self.arena[id].wire().discovered {
            return;
        }

        self.discover(world, id);
        self.find_external_power(world, id);

        // Wires that lose no power per hop could power themselves through a
        // loop forever. They consider power from neighboring wires only when
        // power from non-wires already matches their current power, which
        // still lets them correct an invalid state within their network.
        let step = self.arena[id].wire().wire_type.step();
        if step != 0 || !self.needs_update(id) {
            self.find_power(id, false);
        }

        if self.needs_update(id) {
            self.search_root(id);
        }
    }

    /// Prepares the given wire for the search: decides whether it should
    /// break, resets its in-flight power, and finds its connections.
    fn discover(&mut self, world: &dyn World, id: NodeId) {
        if self.arena[id].wire().discovered {
            return;
        }
        {
            let wire = self.arena[id].wire_mut();
            wire.discovered = true;
            wire.searched = false;
        }

        let (pos, state) = {
            let node = &self.arena[id];
            (node.pos, node.state)
        };
        let (removed, breaking) = {
            let wire = self.arena[id].wire();
            (wire.removed, wire.should_break)
        };
        // A wire that can no longer exist in its cell is not broken right
        // away; its disappearance is folded into the power computation.
        if !removed && !breaking && !state.can_exist(world, pos) {
            self.arena[id].wire_mut().should_break = true;
        }

        {
            let wire = self.arena[id].wire_mut();
            wire.virtual_power = wire.current_power;
            wire.external_power = wire.wire_type.min() - 1;
        }

        self.find_connections(world, id);
    }

    // ------------------------------------------------------------------
    // Power computation

    /// Recomputes the given wire's virtual power from its external power and
    /// its connections. With `ignore_searched`, connections to wires already
    /// visited this settle contribute nothing — that is what empties a
    /// network during the depower phase.
    fn find_power(&mut self, id: NodeId, ignore_searched: bool) {
        let (removed, breaking, external, max) = {
            let wire = self.arena[id].wire();
            (
                wire.removed,
                wire.should_break,
                wire.external_power,
                wire.wire_type.max(),
            )
        };

        // As wire power is recomputed, flow information must be reset.
        {
            let wire = self.arena[id].wire_mut();
            wire.virtual_power = wire.external_power;
            wire.flow_in = 0;
        }

        // A wire that is removed or about to break effectively no longer
        // exists, so it holds the minimum and feeds nothing.
        if removed || breaking {
            return;
        }

        // Power from neighboring wires can never exceed the domain maximum,
        // so external power at the maximum makes probing them pointless.
        if external < max {
            self.find_wire_power(id, ignore_searched);
        }
    }

    /// Folds in power offered by connected neighboring wires.
    fn find_wire_power(&mut self, id: NodeId, ignore_searched: bool) {
        let (my_type, connections) = {
            let wire = self.arena[id].wire();
            (wire.wire_type, wire.connections.clone())
        };

        for connection in connections.iter() {
            if !connection.ty.inbound() {
                continue;
            }
            let Some(peer) = &self.arena[connection.peer].wire else {
                continue;
            };
            if ignore_searched && peer.searched {
                continue;
            }

            let step = my_type.step().max(peer.wire_type.step());
            let power = my_type.min().max(peer.virtual_power - step);
            let side = connection.side.opposite();
            self.arena[id].wire_mut().offer_power(power, side);
        }
    }

    /// Computes power from non-wire components once per settle per wire.
    /// A removed or breaking wire holds the minimum regardless, so nothing
    /// is computed for it.
    fn find_external_power(&mut self, world: &dyn World, id: NodeId) {
        let (removed, breaking, external, min) = {
            let wire = self.arena[id].wire();
            (
                wire.removed,
                wire.should_break,
                wire.external_power,
                wire.wire_type.min(),
            )
        };
        if removed || breaking || external >= min {
            return;
        }

        let power = self.external_power(world, id);
        let wire = self.arena[id].wire_mut();
        wire.external_power = power;
        if power > wire.virtual_power {
            wire.virtual_power = power;
        }
    }

    /// The power the given wire receives from non-wire components: signal
    /// from adjacent sources, and direct signal probed through adjacent
    /// conductors.
    fn external_power(&mut self, world: &dyn World, id: NodeId) -> Power {
        let ty = self.arena[id].wire().wire_type;
        let signal = ty.signal();

        let mut power = ty.min();
        for dir in Direction::ALL {
            let neighbor = self.neighbor(world, id, dir);

            // Power from wires is handled separately.
            if self.arena[neighbor].is_wire() {
                continue;
            }

            let opp = dir.opposite();
            let (neighbor_pos, neighbor_state) = {
                let node = &self.arena[neighbor];
                (node.pos, node.state)
            };

            // A block can be a conductor and a signal source at once.
            if neighbor_state.is_signal_conductor(opp, signal) {
                power = power.max(self.direct_signal_to(world, id, neighbor, opp));
            }
            if neighbor_state.is_signal_source(signal) {
                power = power.max(neighbor_state.signal(world, neighbor_pos, dir, signal));
            }

            if power >= ty.max() {
                return ty.max();
            }
        }
        power
    }

    /// The direct signal reaching the given wire through a conductor, probed
    /// from every side of the conductor other than the wire's own.
    fn direct_signal_to(
        &mut self,
        world: &dyn World,
        id: NodeId,
        conductor: NodeId,
        except: Direction,
    ) -> Power {
        let ty = self.arena[id].wire().wire_type;
        let signal = ty.signal();

        let mut power = ty.min();
        for &dir in &I_EXCEPT[except.index()] {
            let neighbor = self.neighbor(world, conductor, dir);
            let (neighbor_pos, neighbor_state) = {
                let node = &self.arena[neighbor];
                (node.pos, node.state)
            };

            if neighbor_state.is_signal_source(signal) {
                power = power.max(neighbor_state.direct_signal(world, neighbor_pos, dir, signal));
                if power >= ty.max() {
                    return ty.max();
                }
            }
        }
        power
    }

    /// Whether the given wire needs to update its state in the world.
    fn needs_update(&self, id: NodeId) -> bool {
        let wire = self.arena[id].wire();
        wire.removed || wire.should_break || wire.virtual_power != wire.current_power
    }

    // ------------------------------------------------------------------
    // The search queue

    fn search_root(&mut self, id: NodeId) {
        let backup = self.arena[id]
            .wire()
            .connections
            .flow()
            .unwrap_or(Direction::West);
        self.enqueue_search(id, true, backup);
    }

    /// Queues a wire for the breadth-first search and sets a backup flow
    /// direction.
    ///
    /// Flow is normally not determined until a wire's power is updated, but
    /// in networks with several power sources the update order between them
    /// would then depend on which was discovered first. The backup — derived
    /// from connection layout for roots, and from the discovery direction
    /// for the rest — keeps the order direction-derived instead.
    fn enqueue_search(&mut self, id: NodeId, root: bool, backup: Direction) {
        self.search.offer(&mut self.arena, id);

        let wire = self.arena[id].wire_mut();
        wire.root = root;
        wire.searched = true;
        wire.flow_dir = Some(backup);
    }

    // ------------------------------------------------------------------
    // The settle driver

    fn try_settle(&mut self, world: &mut dyn World) {
        if !self.search.is_empty() {
            self.settle(world);
        }
        if !self.updating {
            log::trace!("settled; releasing {} nodes", self.nodes.len());
            self.nodes.clear();
            self.arena.reset();
        }
    }

    /// One settle: search for all affected wires, depower them, then drive
    /// the update queue until the network holds its new power assignment.
    ///
    /// When a world callback re-enters the handler during phase 3, the
    /// nested call runs phases 1 and 2 for its own roots and then leaves its
    /// queued updates to be drained by the outer phase 3, which bounds the
    /// total work by the size of the affected network.
    fn settle(&mut self, world: &mut dyn World) {
        self.search_network(&*world);
        log::trace!("settling a network of {} wires", self.search.len());
        self.depower_network();

        if !self.updating {
            self.updating = true;

            // `updating` must be reset even if a world callback panics, or
            // the handler would refuse power changes for the rest of the
            // world's life.
            let guard = ResetUpdating { handler: self };
            guard.handler.power_network(world);
            drop(guard);
        }
    }

    /// Phase 1: breadth-first search from the roots for wires that will be
    /// affected by the power changes. The iteration order here decides the
    /// order in which wires later update their power.
    fn search_network(&mut self, world: &dyn World) {
        let mut cursor = self.search.head();
        while let Some(id) = cursor {
            let flow = self.arena[id].wire().flow_index();

            for side in CONNECTION_UPDATE_ORDERS[flow] {
                let Some(connection) = self.arena[id].wire().connections.get(side) else {
                    continue;
                };
                if !connection.ty.outbound() {
                    continue;
                }
                let peer = connection.peer;
                {
                    let Some(peer_wire) = &self.arena[peer].wire else {
                        continue;
                    };
                    if peer_wire.searched {
                        continue;
                    }
                }

                self.discover(world, peer);

                // The same self-powering guard as in root discovery.
                let step = self.arena[peer].wire().wire_type.step();
                if step != 0 || !self.needs_update(peer) {
                    self.find_power(peer, false);
                }

                // Only if power from wires has decreased can power from
                // non-wire components determine how low it falls.
                {
                    let peer_wire = self.arena[peer].wire();
                    if peer_wire.virtual_power < peer_wire.current_power {
                        self.find_external_power(world, peer);
                    }
                }

                if self.needs_update(peer) {
                    let backup = FLOW_IN_TO_FLOW_OUT[usize::from(connection.side.flow_in())]
                        .unwrap_or(Direction::West);
                    self.enqueue_search(peer, false, backup);
                }
            }

            cursor = self.arena[id].wire().next_search;
        }
    }

    /// Phase 2: empty the network so that power can spread cleanly from the
    /// wires that still receive any.
    fn depower_network(&mut self) {
        while let Some(id) = self.search.poll(&mut self.arena) {
            self.find_power(id, true);

            let keep = {
                let wire = self.arena[id].wire();
                wire.root
                    || wire.removed
                    || wire.should_break
                    || wire.virtual_power > wire.wire_type.min()
            };
            if keep {
                self.queue_wire(id);
            } else {
                // Pushed below the minimum so that any later offer from a
                // neighboring wire strictly raises it and re-queues the wire.
                self.arena[id].wire_mut().virtual_power -= 1;
            }
        }
    }

    /// Phase 3: work through the update queue, setting each wire's new
    /// power, transmitting it onward, and updating neighboring blocks.
    fn power_network(&mut self, world: &mut dyn World) {
        while let Some(id) = self.updates.pop() {
            if self.arena[id].is_wire() {
                if !self.needs_update(id) {
                    continue;
                }

                self.find_power_flow(id);
                self.transmit_power(id);

                if self.set_power(world, id) {
                    self.queue_neighbors(&*world, id);
                    self.update_neighbor_shapes(world, id);
                }
            } else {
                self.update_block(world, id);
            }
        }
    }

    /// Resolves the final flow direction from incoming flow, falling back to
    /// the connection layout, then to the backup set on enqueue.
    fn find_power_flow(&mut self, id: NodeId) {
        let wire = self.arena[id].wire_mut();
        if let Some(dir) = FLOW_IN_TO_FLOW_OUT[usize::from(wire.flow_in)] {
            wire.flow_dir = Some(dir);
        } else if let Some(dir) = wire.connections.flow() {
            wire.flow_dir = Some(dir);
        }
    }

    /// Offers this wire's power to every outgoing connection, queueing peers
    /// whose virtual power rises.
    fn transmit_power(&mut self, id: NodeId) {
        let (flow, my_type, my_power) = {
            let wire = self.arena[id].wire();
            (wire.flow_index(), wire.wire_type, wire.virtual_power)
        };

        for side in CONNECTION_UPDATE_ORDERS[flow] {
            let Some(connection) = self.arena[id].wire().connections.get(side) else {
                continue;
            };
            if !connection.ty.outbound() {
                continue;
            }

            let peer = connection.peer;
            let Some(peer_wire) = &self.arena[peer].wire else {
                continue;
            };
            let step = my_type.step().max(peer_wire.wire_type.step());
            let power = peer_wire.wire_type.min().max(my_power - step);

            if self.arena[peer].wire_mut().offer_power(power, connection.side) {
                self.queue_wire(peer);
            }
        }
    }

    /// Queues a wire for a power change, or — if its power already matches —
    /// passes its power straight on to its neighbors.
    fn queue_wire(&mut self, id: NodeId) {
        if self.needs_update(id) {
            let priority = if self.arena[id].wire().root {
                Priority::Root
            } else {
                Priority::Normal
            };
            self.updates.insert(id, priority);
        } else {
            self.find_power_flow(id);
            self.transmit_power(id);
        }
    }

    /// Writes the wire's settled power to the world. Returns whether
    /// anything observable changed, which decides whether neighbors are
    /// notified.
    fn set_power(&mut self, world: &mut dyn World, id: NodeId) -> bool {
        let pos = self.arena[id].pos;
        {
            let wire = self.arena[id].wire();
            // The world was already changed by whoever removed the wire.
            if wire.removed {
                return true;
            }
            if wire.should_break {
                return world.set_block_state(pos, AIR.default_state());
            }
        }

        let (power, added) = {
            let wire = self.arena[id].wire_mut();
            let power = wire.wire_type.signal().clamp(wire.virtual_power);
            wire.current_power = power;
            (power, wire.added)
        };

        // The snapshot may be stale; the authoritative state is re-read.
        let state = world.block_state(pos);
        if !state.is_wire() {
            return false;
        }
        let new_state = state.with_power(power);
        self.arena[id].state = new_state;

        world.set_block_state(pos, new_state) || added
    }

    /// Queues block updates for all 24 neighbors of a wire that changed.
    fn queue_neighbors(&mut self, world: &dyn World, id: NodeId) {
        for neighbor in self.collect_neighborhood(world, id) {
            self.queue_neighbor(neighbor, id);
        }
    }

    /// The 24 neighbors within two steps of a wire, each exactly once, in
    /// flow-relative order.
    ///
    /// With the flow direction as "forward", neighbors come in three
    /// distance groups — direct, diagonal, then two steps straight out —
    /// pairs on opposite sides of the wire adjacent to each other, built on
    /// the basic order { front, back, right, left, down, up }. When west is
    /// "forward" the direct group matches the default shape update order.
    fn collect_neighborhood(&mut self, world: &dyn World, id: NodeId) -> [NodeId; 24] {
        let forward = self.arena[id].wire().flow_index();
        let [front_d, back_d, right_d, left_d] = CARDINAL_UPDATE_ORDERS[forward];
        let down_d = Direction::Down;
        let up_d = Direction::Up;

        let front = self.neighbor(world, id, front_d);
        let back = self.neighbor(world, id, back_d);
        let right = self.neighbor(world, id, right_d);
        let left = self.neighbor(world, id, left_d);
        let below = self.neighbor(world, id, down_d);
        let above = self.neighbor(world, id, up_d);

        [
            // direct neighbors (6)
            front,
            back,
            right,
            left,
            below,
            above,
            // diagonal neighbors (12)
            self.neighbor(world, front, right_d),
            self.neighbor(world, back, left_d),
            self.neighbor(world, front, left_d),
            self.neighbor(world, back, right_d),
            self.neighbor(world, front, down_d),
            self.neighbor(world, back, up_d),
            self.neighbor(world, front, up_d),
            self.neighbor(world, back, down_d),
            self.neighbor(world, right, down_d),
            self.neighbor(world, left, up_d),
            self.neighbor(world, right, up_d),
            self.neighbor(world, left, down_d),
            // far neighbors (6)
            self.neighbor(world, front, front_d),
            self.neighbor(world, back, back_d),
            self.neighbor(world, right, right_d),
            self.neighbor(world, left, left_d),
            self.neighbor(world, below, down_d),
            self.neighbor(world, above, up_d),
        ]
    }

    /// Queues one neighbor for a block update. Wires queue their own updates
    /// when power is transmitted, and a non-wire cell is updated at most
    /// once per settle.
    fn queue_neighbor(&mut self, id: NodeId, wire: NodeId) {
        let node = &mut self.arena[id];
        if node.is_wire() || node.block_updated {
            return;
        }
        node.neighbor_wire = Some(wire);
        self.updates.insert(id, Priority::Normal);
    }

    /// Emits shape updates to the six direct non-wire neighbors of a wire,
    /// in the default update order.
    fn update_neighbor_shapes(&mut self, world: &mut dyn World, id: NodeId) {
        let (wire_pos, wire_state) = {
            let node = &self.arena[id];
            (node.pos, node.state)
        };

        for dir in DEFAULT_FULL_UPDATE_ORDER {
            let neighbor = self.neighbor(&*world, id, dir);
            if !self.arena[neighbor].is_wire() {
                self.update_shape(world, neighbor, dir.opposite(), wire_pos, wire_state);
            }
        }
    }

    fn update_shape(
        &mut self,
        world: &mut dyn World,
        id: NodeId,
        dir: Direction,
        neighbor_pos: Cell,
        neighbor_state: BlockState,
    ) {
        let pos = self.arena[id].pos;
        let state = world.block_state(pos);

        // Shape updates to wires are pointless here and expensive.
        if !state.is_air() && !state.is_wire() {
            state.update_shape(world, self, pos, dir, neighbor_pos, neighbor_state);
        }
    }

    /// Delivers a block update to a non-wire node.
    fn update_block(&mut self, world: &mut dyn World, id: NodeId) {
        self.arena[id].block_updated = true;

        let pos = self.arena[id].pos;
        if let Some(wire) = self.arena[id].neighbor_wire {
            log::trace!("block update at {pos:?}, caused by the wire at {:?}", self.arena[wire].pos);
        }
        let state = world.block_state(pos);

        // This filter also withholds block updates from wires in *other*
        // networks. In theory that makes no difference; in practice a
        // network can be forced into an invalid state without updating it,
        // though the setups that do so are obscure.
        if !state.is_air() && !state.is_wire() {
            state.update(world, self, pos);
        }
    }
}

impl Default for WireHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the `updating` flag when dropped, so a panicking world callback
/// cannot leave the handler locked.
struct ResetUpdating<'a> {
    handler: &'a mut WireHandler,
}

impl Drop for ResetUpdating<'_> {
    fn drop(&mut self) {
        self.handler.updating = false;
    }
}
