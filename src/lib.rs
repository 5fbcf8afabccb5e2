//! Cubewire is a signal-propagation engine for worlds made of cubical
//! blocks: the component invoked when a "wire" block is placed, removed, or
//! told that its neighborhood changed.
//!
//! Rather than letting each wire recompute its power recursively and in
//! isolation, the engine builds the connected network once, finds the wires
//! receiving power from outside it, and spreads power from there — settling
//! the whole network with each wire probed at most twice and written at most
//! once, and with block and shape updates emitted in a deterministic,
//! non-locational order derived from the direction of power flow.
//!
//! World storage, rendering, and non-wire block behaviors are not this
//! crate's business; the engine sees the world only through the
//! [`world::World`] facade and the capability surface of
//! [`block::BlockState`]. A minimal sparse [`space::Space`] is provided for
//! embedding and tests.

#![forbid(unsafe_code)]

pub mod block;
pub mod math;
pub mod space;
pub mod wire;
pub mod world;
