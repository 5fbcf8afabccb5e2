//! Mathematical utilities for the cell grid: positions, vectors, directions.

mod cell;
pub use cell::{Cell, GridCoordinate, GridVector};

mod direction;
pub use direction::{Direction, NotAUnitVector};
pub(crate) use direction::{I_EXCEPT, I_EXCEPT_CARDINAL};
