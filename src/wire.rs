//! The signal-propagation engine.
//!
//! [`WireHandler`] is the component the world invokes when a wire is
//! placed, removed, or told that its neighborhood changed. It settles the
//! entire connected network to a consistent power assignment and emits a
//! minimal, deterministic sequence of block and shape updates to the
//! surrounding non-wire blocks.

mod connection;
pub use connection::{ConnectionSide, ConnectionType};
pub(crate) use connection::DEFAULT_FULL_UPDATE_ORDER;

mod handler;
pub use handler::WireHandler;

mod node;
mod queue;

#[cfg(test)]
mod tests;
