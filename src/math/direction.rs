//! Axis-aligned unit directions and their iteration orders.
//! This module is private but reexported by its parent.

use crate::math::GridVector;

/// Identifies one of the six axis-aligned unit directions.
///
/// The discriminant encoding is load-bearing: the four cardinal directions
/// occupy indices 0..=3 arranged clockwise when viewed from above, so that
/// `(i + 1) & 0b11` is one clockwise turn, and [`Direction::opposite()`] is
/// pure bit arithmetic. Power-flow bookkeeping relies on this arrangement.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, exhaust::Exhaust)]
#[allow(clippy::exhaustive_enums)]
#[repr(u8)]
pub enum Direction {
    /// Negative X.
    West = 0,
    /// Positive Z.
    North = 1,
    /// Positive X.
    East = 2,
    /// Negative Z.
    South = 3,
    /// Negative Y.
    Down = 4,
    /// Positive Y.
    Up = 5,
}

impl Direction {
    /// All six directions, in index order.
    pub const ALL: [Direction; 6] = [
        Direction::West,
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::Down,
        Direction::Up,
    ];

    /// The four cardinal directions, in clockwise order viewed from above.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::West,
        Direction::North,
        Direction::East,
        Direction::South,
    ];

    /// This direction's index, equal to its discriminant.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse function of `direction as u8`.
    #[inline]
    pub const fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Self::West),
            1 => Some(Self::North),
            2 => Some(Self::East),
            3 => Some(Self::South),
            4 => Some(Self::Down),
            5 => Some(Self::Up),
            _ => None,
        }
    }

    /// Returns the opposite direction.
    ///
    /// ```
    /// use cubewire::math::Direction;
    ///
    /// assert_eq!(Direction::West.opposite(), Direction::East);
    /// assert_eq!(Direction::Up.opposite(), Direction::Down);
    /// ```
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        // Cardinals toggle bit 1; verticals toggle bit 0.
        let i = self as u8;
        match Self::from_index((i ^ (0b10 >> (i >> 2))) as usize) {
            Some(d) => d,
            None => unreachable!(),
        }
    }

    /// Whether this is one of the four horizontal directions.
    #[inline]
    pub const fn is_cardinal(self) -> bool {
        (self as u8) < 4
    }

    /// The unit vector pointing in this direction.
    #[inline]
    pub fn vector(self) -> GridVector {
        match self {
            Direction::West => GridVector::new(-1, 0, 0),
            Direction::North => GridVector::new(0, 0, 1),
            Direction::East => GridVector::new(1, 0, 0),
            Direction::South => GridVector::new(0, 0, -1),
            Direction::Down => GridVector::new(0, -1, 0),
            Direction::Up => GridVector::new(0, 1, 0),
        }
    }
}

impl TryFrom<GridVector> for Direction {
    type Error = NotAUnitVector;

    /// Recovers a [`Direction`] from its unit vector.
    fn try_from(v: GridVector) -> Result<Self, Self::Error> {
        match (v.x, v.y, v.z) {
            (-1, 0, 0) => Ok(Direction::West),
            (0, 0, 1) => Ok(Direction::North),
            (1, 0, 0) => Ok(Direction::East),
            (0, 0, -1) => Ok(Direction::South),
            (0, -1, 0) => Ok(Direction::Down),
            (0, 1, 0) => Ok(Direction::Up),
            _ => Err(NotAUnitVector(v)),
        }
    }
}

/// Error from converting a vector which is not an axis-aligned unit vector
/// to a [`Direction`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{0:?} is not an axis-aligned unit vector")]
pub struct NotAUnitVector(pub GridVector);

/// For each excluded direction, the other five in index order.
///
/// Used when probing the surroundings of a cell that was itself reached from
/// a known direction.
pub(crate) const I_EXCEPT: [[Direction; 5]; 6] = {
    use Direction::*;
    [
        [North, East, South, Down, Up],
        [West, East, South, Down, Up],
        [West, North, South, Down, Up],
        [West, North, East, Down, Up],
        [West, North, East, South, Up],
        [West, North, East, South, Down],
    ]
};

/// For each excluded direction, the cardinal directions other than it.
pub(crate) const I_EXCEPT_CARDINAL: [&[Direction]; 6] = {
    use Direction::*;
    [
        &[North, East, South],
        &[West, East, South],
        &[West, North, South],
        &[West, North, East],
        &[West, North, East, South],
        &[West, North, East, South],
    ]
};
