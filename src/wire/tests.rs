//! End-to-end settle scenarios for [`WireHandler`], driven through a real
//! [`Space`] with every write and notification recorded.

use std::cell::RefCell;

use pretty_assertions::assert_eq;

use crate::block::{Block, BlockState, Power, WireType, AIR, LEVER, CHARGE, STONE, WIRE};
use crate::math::{Cell, Direction, GridVector};
use crate::space::Space;
use crate::wire::{WireHandler, DEFAULT_FULL_UPDATE_ORDER};
use crate::world::World;

// ---------------------------------------------------------------------
// Observation apparatus

/// One observable effect of a settle, in emission order.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Event {
    /// A block state write that changed the world.
    Set(Cell, &'static str, Power),
    /// A block update delivered to a sensor block.
    Update(Cell),
    /// A shape update delivered to a sensor block.
    Shape(Cell),
}

thread_local! {
    static LOG: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

fn log(event: Event) {
    LOG.with(|log| log.borrow_mut().push(event));
}

fn take_log() -> Vec<Event> {
    LOG.with(|log| log.borrow_mut().split_off(0))
}

/// A [`Space`] that records every state change into the event log, with the
/// same neighbor-dispatch behavior.
struct Recorder {
    space: Space,
}

impl Recorder {
    fn new() -> Self {
        take_log();
        Self {
            space: Space::new(),
        }
    }

    fn power_at(&self, pos: impl Into<Cell>) -> Power {
        self.space.get(pos).power()
    }
}

impl World for Recorder {
    fn block_state(&self, pos: Cell) -> BlockState {
        self.space.get(pos)
    }

    fn set_block_state(&mut self, pos: Cell, state: BlockState) -> bool {
        let changed = self.space.set(pos, state);
        if changed {
            log(Event::Set(pos, state.block().name, state.power()));
        }
        changed
    }

    fn update_neighbors(&mut self, wires: &mut WireHandler, pos: Cell) {
        for dir in DEFAULT_FULL_UPDATE_ORDER {
            let neighbor_pos = pos.offset(dir);
            let state = self.space.get(neighbor_pos);
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
            let neighbor_state = self.space.get(neighbor_pos);
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

/// Non-conducting block that records the updates delivered to it.
static SENSOR: Block = Block {
    on_update: Some(sensor_update),
    on_shape_update: Some(sensor_shape_update),
    ..Block::new("sensor")
};

/// Conducting variant, for cells that must support a wire.
static SENSOR_FLOOR: Block = Block {
    conductor: true,
    on_update: Some(sensor_update),
    on_shape_update: Some(sensor_shape_update),
    ..Block::new("sensor_floor")
};

fn sensor_update(_world: &mut dyn World, _wires: &mut WireHandler, pos: Cell, _state: BlockState) {
    log(Event::Update(pos));
}

#[allow(clippy::too_many_arguments)]
fn sensor_shape_update(
    _world: &mut dyn World,
    _wires: &mut WireHandler,
    pos: Cell,
    _state: BlockState,
    _dir: Direction,
    _neighbor_pos: Cell,
    _neighbor_state: BlockState,
) {
    log(Event::Shape(pos));
}

// ---------------------------------------------------------------------
// Setup helpers

fn lever(power: Power) -> BlockState {
    LEVER.default_state().with_power(power)
}

/// Places a stone floor cell and a wire on top, settling the wire in.
fn place_wire(world: &mut Recorder, wires: &mut WireHandler, pos: impl Into<Cell>) {
    let pos = pos.into();
    world.space.set(pos.offset(Direction::Down), STONE.default_state());
    world.space.set(pos, WIRE.default_state());
    wires.on_wire_added(world, pos);
}

/// Scenario fixture: wires at x = 0..=5 on a stone floor, lever at (6,0,0),
/// settled so that powers run 15 down to 10.
fn settled_straight_run() -> (Recorder, WireHandler) {
    let mut world = Recorder::new();
    let mut wires = WireHandler::new();
    for x in 0..=5 {
        place_wire(&mut world, &mut wires, [x, 0, 0]);
    }
    world.space.set([6, 0, 0], lever(15));
    wires.on_wire_update(&mut world, Cell::new(5, 0, 0));
    take_log();
    (world, wires)
}

fn wire_set(pos: impl Into<Cell>, power: Power) -> Event {
    Event::Set(pos.into(), "wire", power)
}

// ---------------------------------------------------------------------
// End-to-end scenarios

#[test]
fn straight_run_loses_one_power_per_hop() {
    let mut world = Recorder::new();
    let mut wires = WireHandler::new();
    for x in 0..=5 {
        place_wire(&mut world, &mut wires, [x, 0, 0]);
    }
    world.space.set([6, 0, 0], lever(15));
    take_log();

    wires.on_wire_update(&mut world, Cell::new(5, 0, 0));

    for (x, power) in (0..=5).zip([10, 11, 12, 13, 14, 15]) {
        assert_eq!(world.power_at([x, 0, 0]), power, "wire at x = {x}");
    }
    // Each wire is written exactly once, in power-spread order.
    assert_eq!(
        take_log(),
        vec![
            wire_set([5, 0, 0], 15),
            wire_set([4, 0, 0], 14),
            wire_set([3, 0, 0], 13),
            wire_set([2, 0, 0], 12),
            wire_set([1, 0, 0], 11),
            wire_set([0, 0, 0], 10),
        ]
    );
}

#[test]
fn depowering_writes_each_wire_once() {
    let (mut world, mut wires) = settled_straight_run();

    world.space.set([6, 0, 0], AIR.default_state());
    wires.on_wire_update(&mut world, Cell::new(5, 0, 0));

    assert_eq!(
        take_log(),
        vec![
            wire_set([5, 0, 0], 0),
            wire_set([4, 0, 0], 0),
            wire_set([3, 0, 0], 0),
            wire_set([2, 0, 0], 0),
            wire_set([1, 0, 0], 0),
            wire_set([0, 0, 0], 0),
        ]
    );
}

/// Runs the central-source plus scenario with its origin at `origin`;
/// returns the events of the final settle.
fn plus_run(origin: Cell) -> Vec<Event> {
    let mut world = Recorder::new();
    let mut wires = WireHandler::new();
    for offset in [
        GridVector::new(1, 0, 0),
        GridVector::new(-1, 0, 0),
        GridVector::new(0, 0, 1),
        GridVector::new(0, 0, -1),
    ] {
        place_wire(&mut world, &mut wires, origin + offset);
    }
    world.space.set(origin, lever(15));
    take_log();

    wires.on_wire_update(&mut world, origin + GridVector::new(1, 0, 0));
    take_log()
}

#[test]
fn central_source_powers_all_arms_in_fixed_order() {
    // One source feeds four wires at once; the surroundings scan roots all
    // of them, and the write order follows the root discovery order rather
    // than any map iteration or coordinate order.
    assert_eq!(
        plus_run(Cell::ORIGIN),
        vec![
            wire_set([1, 0, 0], 15),
            wire_set([-1, 0, 0], 15),
            wire_set([0, 0, 1], 15),
            wire_set([0, 0, -1], 15),
        ]
    );
}

#[test]
fn settles_are_coordinate_independent() {
    let at_origin = plus_run(Cell::ORIGIN);
    let translation = GridVector::new(100, 16, -47);
    let translated = plus_run(Cell::ORIGIN + translation);

    let expected: Vec<Event> = at_origin
        .into_iter()
        .map(|event| match event {
            Event::Set(pos, name, power) => Event::Set(pos + translation, name, power),
            Event::Update(pos) => Event::Update(pos + translation),
            Event::Shape(pos) => Event::Shape(pos + translation),
        })
        .collect();
    assert_eq!(translated, expected);
}

#[test]
fn settles_are_deterministic() {
    assert_eq!(plus_run(Cell::ORIGIN), plus_run(Cell::ORIGIN));
}

#[test]
fn two_sources_meet_in_the_middle() {
    let mut world = Recorder::new();
    let mut wires = WireHandler::new();
    world.space.set([-1, 0, 0], lever(15));
    world.space.set([3, 0, 0], lever(15));
    for x in 0..=2 {
        place_wire(&mut world, &mut wires, [x, 0, 0]);
    }

    assert_eq!(world.power_at([0, 0, 0]), 15);
    assert_eq!(world.power_at([1, 0, 0]), 14);
    assert_eq!(world.power_at([2, 0, 0]), 15);

    // The middle wire's flow is ambiguous (equal power from west and east);
    // the deterministic fallback keeps further updates idempotent.
    take_log();
    wires.on_wire_update(&mut world, Cell::new(1, 0, 0));
    assert_eq!(take_log(), vec![]);
}

#[test]
fn repeated_update_is_idempotent() {
    let (mut world, mut wires) = settled_straight_run();

    wires.on_wire_update(&mut world, Cell::new(5, 0, 0));
    assert_eq!(take_log(), vec![]);
    wires.on_wire_update(&mut world, Cell::new(0, 0, 0));
    assert_eq!(take_log(), vec![]);
}

#[test]
fn add_then_remove_leaves_the_world_unchanged() {
    let (mut world, mut wires) = settled_straight_run();
    world.space.set([-1, -1, 0], STONE.default_state());
    let before = world.space.clone();

    let pos = Cell::new(-1, 0, 0);
    world.space.set(pos, WIRE.default_state());
    wires.on_wire_added(&mut world, pos);
    assert_eq!(world.power_at(pos), 9);

    let state = world.space.get(pos);
    world.space.set(pos, AIR.default_state());
    wires.on_wire_removed(&mut world, pos, state);

    assert_eq!(world.space, before);
}

/// Wires that lose no power per hop must not latch on to their own signal.
#[test]
fn lossless_wires_do_not_power_themselves() {
    static BUS_WIRE: WireType = WireType::new(&CHARGE, 0);
    static BUS: Block = Block {
        wire: Some(&BUS_WIRE),
        ..Block::new("bus")
    };

    let mut world = Recorder::new();
    let mut wires = WireHandler::new();
    world.space.set([-1, 0, 0], lever(15));
    for x in [0, 1] {
        let pos = Cell::new(x, 0, 0);
        world.space.set(pos, BUS.default_state());
        wires.on_wire_added(&mut world, pos);
    }

    assert_eq!(world.power_at([0, 0, 0]), 15);
    assert_eq!(world.power_at([1, 0, 0]), 15);
}

#[test]
fn unsupported_wire_breaks_during_settle() {
    let (mut world, mut wires) = settled_straight_run();

    world.space.set([2, -1, 0], AIR.default_state());
    wires.on_wire_update(&mut world, Cell::new(2, 0, 0));

    // The unsupported wire is folded into the power math as absent, then
    // actually broken when its turn comes.
    assert!(world.space.get([2, 0, 0]).is_air());
    assert_eq!(world.power_at([3, 0, 0]), 13);
    assert_eq!(world.power_at([4, 0, 0]), 14);
    assert_eq!(world.power_at([5, 0, 0]), 15);
    // West of the break nothing feeds the wires any more.
    assert_eq!(world.power_at([1, 0, 0]), 0);
    assert_eq!(world.power_at([0, 0, 0]), 0);
}

// ---------------------------------------------------------------------
// Update emission order

#[test]
fn neighborhood_updates_follow_the_flow_derived_order() {
    let mut world = Recorder::new();
    let mut wires = WireHandler::new();

    // A lone wire at the origin, lever to its east, every other cell of its
    // 24-cell neighborhood occupied by a sensor.
    let origin = Cell::ORIGIN;
    let lever_pos = Cell::new(1, 0, 0);
    let neighborhood: [[i32; 3]; 24] = [
        // direct
        [-1, 0, 0], [1, 0, 0], [0, 0, 1], [0, 0, -1], [0, -1, 0], [0, 1, 0],
        // diagonal
        [-1, 0, 1], [1, 0, -1], [-1, 0, -1], [1, 0, 1],
        [-1, -1, 0], [1, 1, 0], [-1, 1, 0], [1, -1, 0],
        [0, -1, 1], [0, 1, -1], [0, 1, 1], [0, -1, -1],
        // far
        [-2, 0, 0], [2, 0, 0], [0, 0, 2], [0, 0, -2], [0, -2, 0], [0, 2, 0],
    ];
    for pos in neighborhood {
        let block = if pos == [0, -1, 0] { &SENSOR_FLOOR } else { &SENSOR };
        world.space.set(pos, block.default_state());
    }
    world.space.set(origin, WIRE.default_state());
    wires.on_wire_added(&mut world, origin);
    world.space.set(lever_pos, lever(15));
    take_log();

    wires.on_wire_update(&mut world, origin);

    // With no incoming wire flow and no connections, west is "forward".
    // Shape updates go out immediately after the write, to the six direct
    // neighbors in the default order; block updates drain from the queue in
    // the three distance groups afterwards. The lever cell is updated too,
    // but has no sensor behavior to show it.
    let mut expected = vec![
        wire_set(origin, 15),
        Event::Shape(Cell::new(-1, 0, 0)),
        Event::Shape(Cell::new(0, 0, 1)),
        Event::Shape(Cell::new(0, 0, -1)),
        Event::Shape(Cell::new(0, -1, 0)),
        Event::Shape(Cell::new(0, 1, 0)),
    ];
    expected.extend(
        neighborhood
            .into_iter()
            .map(Cell::from)
            .filter(|&pos| pos != lever_pos)
            .map(Event::Update),
    );
    assert_eq!(take_log(), expected);
}

// ---------------------------------------------------------------------
// Reentrancy

/// A conductor that vanishes the moment anything delivers it a block
/// update, notifying its neighbors in turn.
static BRITTLE: Block = Block {
    conductor: true,
    on_update: Some(brittle_update),
    ..Block::new("brittle")
};

fn brittle_update(world: &mut dyn World, wires: &mut WireHandler, pos: Cell, _state: BlockState) {
    world.set_block_state(pos, AIR.default_state());
    world.update_neighbors(wires, pos);
}

#[test]
fn reentrant_settles_share_the_outer_update_queue() {
    let mut world = Recorder::new();
    let mut wires = WireHandler::new();

    // w1 on the floor, w2 one step up and east on a stone block, a lever
    // east of w2. The brittle conductor above w1 blocks the staircase
    // connection between the two wires.
    let w1 = Cell::new(0, 0, 0);
    let w2 = Cell::new(1, 1, 0);
    let brittle = Cell::new(0, 1, 0);
    place_wire(&mut world, &mut wires, w1);
    world.space.set([1, 0, 0], STONE.default_state());
    world.space.set(w2, WIRE.default_state());
    wires.on_wire_added(&mut world, w2);
    world.space.set(brittle, BRITTLE.default_state());
    world.space.set([2, 1, 0], lever(15));
    take_log();

    // Powering w2 block-updates the brittle conductor, whose removal
    // re-enters the engine mid-settle: with the staircase now open, w1 must
    // be powered from w2. The nested settle runs search and depower for its
    // root and leaves phase 3 to the outer loop.
    wires.on_wire_update(&mut world, w2);

    assert_eq!(
        take_log(),
        vec![
            wire_set(w2, 15),
            Event::Set(brittle, "air", 0),
            wire_set(w1, 14),
        ]
    );
    assert!(world.space.get(brittle).is_air());
    assert_eq!(world.power_at(w2), 15);
    assert_eq!(world.power_at(w1), 14);

    // The handler is fully released: further settles behave normally.
    wires.on_wire_update(&mut world, w1);
    assert_eq!(take_log(), vec![]);
}

fn trap_update(_world: &mut dyn World, _wires: &mut WireHandler, _pos: Cell, _state: BlockState) {
    panic!("trapped");
}

#[test]
fn panicking_callback_releases_the_engine() {
    static TRAP: Block = Block {
        on_update: Some(trap_update),
        ..Block::new("trap")
    };

    let mut world = Recorder::new();
    let mut wires = WireHandler::new();
    place_wire(&mut world, &mut wires, [0, 0, 0]);
    world.space.set([0, 1, 0], TRAP.default_state());
    world.space.set([1, 0, 0], lever(15));

    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        wires.on_wire_update(&mut world, Cell::new(0, 0, 0));
    }));
    assert!(caught.is_err());

    // The power write preceded the panic, and the handler is not locked out
    // of later settles.
    assert_eq!(world.power_at([0, 0, 0]), 15);
    wires.on_wire_update(&mut world, Cell::new(0, 0, 0));
    take_log();
}
