//! Block kinds and block states, reduced to the capability surface the
//! signal engine consumes.
//!
//! Rather than interface-style dispatch, each block kind is a [`Block`]:
//! a static record of predicates plus function pointers for the dynamic
//! probes and behaviors. The engine depends only on this surface.

use core::fmt;
use core::ptr;

use crate::math::{Cell, Direction};
use crate::wire::WireHandler;
use crate::world::World;

/// Signal strength carried by wires and emitted by sources.
pub type Power = i32;

/// A power domain: the range of signal values and nothing else.
///
/// Signal types have identity; two wires interoperate when they share the
/// same `&'static SignalType`, not merely equal ranges.
#[derive(Debug)]
pub struct SignalType {
    name: &'static str,
    min: Power,
    max: Power,
}

impl SignalType {
    /// Defines a signal type. Panics at compile time if `min > max`.
    pub const fn new(name: &'static str, min: Power, max: Power) -> Self {
        assert!(min <= max);
        Self { name, min, max }
    }

    /// Name for diagnostics.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The lowest power a wire of this type can hold.
    pub const fn min(&self) -> Power {
        self.min
    }

    /// The highest power a wire of this type can hold.
    pub const fn max(&self) -> Power {
        self.max
    }

    /// Restricts `power` to `min..=max`.
    pub const fn clamp(&self, power: Power) -> Power {
        if power < self.min {
            self.min
        } else if power > self.max {
            self.max
        } else {
            power
        }
    }

    /// Identity comparison.
    #[inline]
    pub fn is(&self, other: &SignalType) -> bool {
        ptr::eq(self, other)
    }
}

/// Binds a [`SignalType`] to a kind of wire block, adding the per-hop power
/// decrement.
///
/// A step of zero marks self-referential wires: signal crosses them without
/// loss, and the engine must take care that they do not power themselves.
#[derive(Debug)]
pub struct WireType {
    signal: &'static SignalType,
    step: Power,
}

impl WireType {
    /// Defines a wire type over the given signal domain.
    pub const fn new(signal: &'static SignalType, step: Power) -> Self {
        Self { signal, step }
    }

    /// The signal domain this wire carries.
    pub const fn signal(&self) -> &'static SignalType {
        self.signal
    }

    /// Power lost per hop between wires of this type.
    pub const fn step(&self) -> Power {
        self.step
    }

    /// Shorthand for `self.signal().min()`.
    pub const fn min(&self) -> Power {
        self.signal.min()
    }

    /// Shorthand for `self.signal().max()`.
    pub const fn max(&self) -> Power {
        self.signal.max()
    }

    /// Whether this wire kind can feed power to the other.
    pub fn connects_to(&self, other: &WireType) -> bool {
        self.signal.is(other.signal)
    }

    /// Identity comparison.
    #[inline]
    pub fn is(&self, other: &WireType) -> bool {
        ptr::eq(self, other)
    }
}

/// Probe for the signal a block emits in some direction.
pub type SignalFn =
    fn(world: &dyn World, pos: Cell, state: BlockState, dir: Direction, signal: &'static SignalType) -> Power;

/// Predicate for whether a block can remain in its cell.
pub type CanExistFn = fn(world: &dyn World, pos: Cell, state: BlockState) -> bool;

/// Behavior run when a block receives a block update. May re-enter the engine.
pub type UpdateFn = fn(world: &mut dyn World, wires: &mut WireHandler, pos: Cell, state: BlockState);

/// Behavior run when a block receives a shape update from the neighbor at
/// `neighbor_pos`, reached by going `dir` from `pos`. May re-enter the engine.
pub type ShapeUpdateFn = fn(
    world: &mut dyn World,
    wires: &mut WireHandler,
    pos: Cell,
    state: BlockState,
    dir: Direction,
    neighbor_pos: Cell,
    neighbor_state: BlockState,
);

/// One kind of block, described by its capabilities.
///
/// Instances are expected to be `static`s; block identity is pointer
/// identity. Fields not relevant to a kind stay at their [`Block::new`]
/// defaults.
#[allow(clippy::exhaustive_structs)]
pub struct Block {
    /// Name for diagnostics.
    pub name: &'static str,
    /// Air occupies a cell without any behavior; it never receives updates.
    pub air: bool,
    /// Whether the block conducts direct signal between its faces.
    pub conductor: bool,
    /// `Some` makes this block a wire managed by the signal engine.
    pub wire: Option<&'static WireType>,
    /// `Some` makes this block emit the named signal.
    pub source: Option<&'static SignalType>,
    /// Signal emitted toward a neighbor, probed only on sources.
    pub signal: Option<SignalFn>,
    /// Signal emitted *through* an adjacent conductor, probed only on sources.
    pub direct_signal: Option<SignalFn>,
    /// Placement-survival predicate; absent means the block always survives.
    pub can_exist: Option<CanExistFn>,
    /// Block-update behavior.
    pub on_update: Option<UpdateFn>,
    /// Shape-update behavior.
    pub on_shape_update: Option<ShapeUpdateFn>,
}

impl Block {
    /// A blank, behaviorless block kind to build real kinds from.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            air: false,
            conductor: false,
            wire: None,
            source: None,
            signal: None,
            direct_signal: None,
            can_exist: None,
            on_update: None,
            on_shape_update: None,
        }
    }

    /// The state this block has when first placed.
    pub fn default_state(&'static self) -> BlockState {
        BlockState {
            block: self,
            power: match self.wire {
                Some(wire) => wire.min(),
                None => 0,
            },
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.name)
    }
}

/// The state of one cell: a block kind plus its power value.
///
/// `power` is the held power for wires and the emitted strength for sources;
/// it is meaningless (and zero) for other kinds.
#[derive(Clone, Copy)]
pub struct BlockState {
    block: &'static Block,
    power: Power,
}

impl BlockState {
    /// The block kind.
    pub fn block(&self) -> &'static Block {
        self.block
    }

    /// Whether this is the same block kind.
    pub fn is_of(&self, block: &Block) -> bool {
        ptr::eq(self.block, block)
    }

    /// Whether this cell holds nothing.
    pub fn is_air(&self) -> bool {
        self.block.air
    }

    /// Whether this block is a wire of any kind.
    pub fn is_wire(&self) -> bool {
        self.block.wire.is_some()
    }

    /// Whether this block is a wire carrying the given signal.
    pub fn is_wire_of(&self, signal: &SignalType) -> bool {
        self.block.wire.is_some_and(|w| w.signal().is(signal))
    }

    /// Whether this block is a wire of exactly the given type.
    pub fn is_wire_type(&self, wire: &WireType) -> bool {
        self.block.wire.is_some_and(|w| w.is(wire))
    }

    /// The wire type, if this block is a wire.
    pub fn wire_type(&self) -> Option<&'static WireType> {
        self.block.wire
    }

    /// Whether this block emits the given signal.
    pub fn is_signal_source(&self, signal: &SignalType) -> bool {
        self.block.source.is_some_and(|s| s.is(signal))
    }

    /// Whether this block emits any signal at all.
    pub fn is_any_signal_source(&self) -> bool {
        self.block.source.is_some()
    }

    /// Whether the given signal passes through this block via the face
    /// pointed at by `dir`.
    pub fn is_signal_conductor(&self, dir: Direction, signal: &SignalType) -> bool {
        let _ = (dir, signal);
        self.block.conductor
    }

    /// Whether any signal passes through this block via the given face.
    pub fn is_any_signal_conductor(&self, dir: Direction) -> bool {
        let _ = dir;
        self.block.conductor
    }

    /// The signal this block emits toward the cell it is reached from by
    /// going `dir`.
    pub fn signal(
        &self,
        world: &dyn World,
        pos: Cell,
        dir: Direction,
        signal: &'static SignalType,
    ) -> Power {
        match self.block.signal {
            Some(f) => f(world, pos, *self, dir, signal),
            None => signal.min(),
        }
    }

    /// The signal this block pushes through an adjacent conductor in
    /// direction `dir`.
    pub fn direct_signal(
        &self,
        world: &dyn World,
        pos: Cell,
        dir: Direction,
        signal: &'static SignalType,
    ) -> Power {
        match self.block.direct_signal {
            Some(f) => f(world, pos, *self, dir, signal),
            None => signal.min(),
        }
    }

    /// Whether the block can remain at `pos`.
    pub fn can_exist(&self, world: &dyn World, pos: Cell) -> bool {
        match self.block.can_exist {
            Some(f) => f(world, pos, *self),
            None => true,
        }
    }

    /// Delivers a block update.
    pub fn update(&self, world: &mut dyn World, wires: &mut WireHandler, pos: Cell) {
        if let Some(f) = self.block.on_update {
            f(world, wires, pos, *self);
        }
    }

    /// Delivers a shape update caused by the neighbor at `neighbor_pos`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_shape(
        &self,
        world: &mut dyn World,
        wires: &mut WireHandler,
        pos: Cell,
        dir: Direction,
        neighbor_pos: Cell,
        neighbor_state: BlockState,
    ) {
        if let Some(f) = self.block.on_shape_update {
            f(world, wires, pos, *self, dir, neighbor_pos, neighbor_state);
        }
    }

    /// The stored power value.
    pub fn power(&self) -> Power {
        self.power
    }

    /// The same block with a different power value.
    #[must_use]
    pub fn with_power(&self, power: Power) -> Self {
        Self {
            block: self.block,
            power,
        }
    }
}

impl PartialEq for BlockState {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.block, other.block) && self.power == other.power
    }
}

impl Eq for BlockState {}

impl fmt::Debug for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.block.name, self.power)
    }
}

/// The ordinary signal domain: power 0 to 15.
pub static CHARGE: SignalType = SignalType::new("charge", 0, 15);

/// The ordinary wire kind: loses one power per hop.
pub static CHARGE_WIRE: WireType = WireType::new(&CHARGE, 1);

/// The empty cell.
pub static AIR: Block = Block {
    air: true,
    ..Block::new("air")
};

/// A full solid cube; conducts direct signal.
pub static STONE: Block = Block {
    conductor: true,
    ..Block::new("stone")
};

/// Wire carrying [`CHARGE`] signal. Must rest on a conductor.
pub static WIRE: Block = Block {
    wire: Some(&CHARGE_WIRE),
    can_exist: Some(wire_can_exist),
    ..Block::new("wire")
};

/// A switchable signal source; emits its stored power in every direction,
/// both directly and through conductors.
pub static LEVER: Block = Block {
    source: Some(&CHARGE),
    signal: Some(source_signal),
    direct_signal: Some(source_signal),
    ..Block::new("lever")
};

fn wire_can_exist(world: &dyn World, pos: Cell, _state: BlockState) -> bool {
    world
        .block_state(pos.offset(Direction::Down))
        .is_any_signal_conductor(Direction::Up)
}

fn source_signal(
    _world: &dyn World,
    _pos: Cell,
    state: BlockState,
    _dir: Direction,
    signal: &'static SignalType,
) -> Power {
    signal.clamp(state.power())
}
