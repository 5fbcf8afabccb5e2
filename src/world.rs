//! The facade through which the signal engine observes and mutates a world.

use crate::block::BlockState;
use crate::math::Cell;
use crate::wire::WireHandler;

/// Block storage plus update dispatch, as seen by the signal engine.
///
/// The engine never retains a world reference; every engine operation takes
/// `&mut dyn World` for its own duration. The two `update_*` methods hand
/// back a [`WireHandler`] because delivering updates may synchronously
/// re-enter the engine, and the engine is written to tolerate that.
pub trait World {
    /// The state of the block at `pos`. Unoccupied cells report air.
    fn block_state(&self, pos: Cell) -> BlockState;

    /// Replaces the block at `pos`, returning whether the stored state
    /// actually changed.
    ///
    /// This performs no update dispatch of its own; notifying neighbors is
    /// the caller's concern.
    fn set_block_state(&mut self, pos: Cell, state: BlockState) -> bool;

    /// Delivers a block update to each direct neighbor of `pos`.
    fn update_neighbors(&mut self, wires: &mut WireHandler, pos: Cell);

    /// Delivers a shape update to each direct neighbor of `pos`, where
    /// `state` is the state of the block at `pos` causing the update.
    fn update_neighbor_shapes(&mut self, wires: &mut WireHandler, pos: Cell, state: BlockState);
}
