//! That which contains many blocks: a minimal sparse world.
//!
//! [`Space`] provides just enough of a world — block storage plus neighbor
//! update dispatch — to host the signal engine. Chunking, persistence, and
//! ticking belong to embedders.

use hashbrown::HashMap;

use crate::block::{BlockState, AIR};
use crate::math::Cell;
use crate::wire::{WireHandler, DEFAULT_FULL_UPDATE_ORDER};
use crate::world::World;

/// Sparse, unbounded block storage implementing the [`World`] facade.
///
/// Cells not present in the map are air; setting a cell to air removes it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Space {
    contents: HashMap<Cell, BlockState>,
}

impl Space {
    /// Constructs a `Space` that is entirely air.
    pub fn new() -> Self {
        Self::default()
    }

    /// The state of the block at `pos`; equivalent to
    /// [`World::block_state()`] without the trait object.
    pub fn get(&self, pos: impl Into<Cell>) -> BlockState {
        self.contents
            .get(&pos.into())
            .copied()
            .unwrap_or_else(|| AIR.default_state())
    }

    /// Stores a block state without any update dispatch. Returns whether the
    /// stored state changed.
    pub fn set(&mut self, pos: impl Into<Cell>, state: BlockState) -> bool {
        let pos = pos.into();
        if state.is_air() {
            self.contents.remove(&pos).is_some()
        } else {
            self.contents.insert(pos, state) != Some(state)
        }
    }

    /// Number of non-air cells.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether the space is entirely air.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl World for Space {
    fn block_state(&self, pos: Cell) -> BlockState {
        self.get(pos)
    }

    fn set_block_state(&mut self, pos: Cell, state: BlockState) -> bool {
        self.set(pos, state)
    }

    fn update_neighbors(&mut self, wires: &mut WireHandler, pos: Cell) {
        for dir in DEFAULT_FULL_UPDATE_ORDER {
            let neighbor_pos = pos.offset(dir);
            let state = self.get(neighbor_pos);
            if state.is_wire() {
                wires.on_wire_update(self, neighbor_pos);
            } else {
                state.update(self, wires, neighbor_pos);
            }
        }
    }

    fn update_neighbor_shapes(&mut self, wires: &mut WireHandler, pos: Cell, state: BlockState) {
        for dir in DEFAULT_FULL_UPDATE_ORDER {
            let neighbor_pos = pos.offset(dir);
            let neighbor_state = self.get(neighbor_pos);
            if !neighbor_state.is_air() && !neighbor_state.is_wire() {
                neighbor_state.update_shape(
                    self,
                    wires,
                    neighbor_pos,
                    dir.opposite(),
                    pos,
                    state,
                );
            }
        }
    }
}
