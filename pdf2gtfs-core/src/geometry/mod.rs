//! Geometry primitives: axis-aligned rectangle algebra used throughout
//! the table-reconstruction pipeline.

mod bbox;

use serde::{Deserialize, Serialize};

pub use bbox::BBox;

/// The four cardinal directions of the quad-linked table grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Direction::North | Direction::South => Orientation::Vertical,
            Direction::East | Direction::West => Orientation::Horizontal,
        }
    }
}

/// Rows are iterated horizontally (`Horizontal`), columns vertically
/// (`Vertical`) — matches §4.3's `get_series(o, cell)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// direction iterated towards when walking a row/column forward:
    /// East for rows, South for columns.
    pub fn forward(self) -> Direction {
        match self {
            Orientation::Horizontal => Direction::East,
            Orientation::Vertical => Direction::South,
        }
    }

    /// direction iterated towards when walking a row/column backward.
    pub fn backward(self) -> Direction {
        self.forward().opposite()
    }

    /// the orientation perpendicular to this one.
    pub fn normal(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];
