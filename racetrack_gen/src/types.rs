// Core types shared across the generator.
//
// Defines grid coordinates (`GridCoord`), the four cardinal headings a flow
// can travel in (`Heading`), the six axis directions used for neighbor
// lookups (`Direction`), the three moves a path step can make (`Move`), and
// the closed set of segment kinds a cell can hold (`NodeType`).
//
// Rotations are degrees counter-clockwise from north: 0 = north (+y),
// 90 = west (-x), 180 = south (-y), 270 = east (+x). A left turn adds 90, a
// right turn subtracts 90. Templates carry rotations as `f32` degrees;
// they are normalized into [0, 360) and must land on one of the four
// cardinal values to become a `Heading`.
//
// See also: `grid.rs` for the arena these coordinates index, `flow.rs` for
// the rotation arithmetic that drives path construction.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A zero-based position in the track grid.
///
/// - X: column, east (positive) / west (negative)
/// - Y: row, north (positive) / south (negative)
/// - Z: layer, above (positive) / below (negative)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert a 1-based template coordinate. `(0, 0, 0)` and partially-zero
    /// coordinates mean "unset" in templates and are rejected here.
    pub fn from_template(one_based: [i32; 3]) -> Option<Self> {
        if one_based.iter().any(|c| *c <= 0) {
            return None;
        }
        Some(Self::new(one_based[0] - 1, one_based[1] - 1, one_based[2] - 1))
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f32) -> f32 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if r >= 360.0 { 0.0 } else { r }
}

/// One of the four cardinal flow directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    #[default]
    North,
    West,
    South,
    East,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::West, Heading::South, Heading::East];

    /// Parse a rotation in degrees. Returns `None` unless the normalized
    /// value is exactly 0, 90, 180, or 270.
    pub fn from_degrees(degrees: f32) -> Option<Self> {
        let d = normalize_degrees(degrees);
        if d == 0.0 {
            Some(Heading::North)
        } else if d == 90.0 {
            Some(Heading::West)
        } else if d == 180.0 {
            Some(Heading::South)
        } else if d == 270.0 {
            Some(Heading::East)
        } else {
            None
        }
    }

    pub fn degrees(self) -> f32 {
        self.quarter() as f32 * 90.0
    }

    /// Counter-clockwise quarter turns from north (0..4).
    pub fn quarter(self) -> i32 {
        match self {
            Heading::North => 0,
            Heading::West => 1,
            Heading::South => 2,
            Heading::East => 3,
        }
    }

    /// Rotate by a number of counter-clockwise quarter turns (negative = clockwise).
    pub fn rotated(self, quarter_turns: i32) -> Self {
        Self::ALL[(self.quarter() + quarter_turns).rem_euclid(4) as usize]
    }

    pub fn opposite(self) -> Self {
        self.rotated(2)
    }

    /// The grid neighbor direction this heading points at.
    pub fn direction(self) -> Direction {
        match self {
            Heading::North => Direction::North,
            Heading::West => Direction::West,
            Heading::South => Direction::South,
            Heading::East => Direction::East,
        }
    }
}

/// The six axis-aligned neighbor directions of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Above,
    Below,
}

impl Direction {
    /// The in-layer directions the adjacency pulse floods through.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 1, 0),
            Direction::East => (1, 0, 0),
            Direction::South => (0, -1, 0),
            Direction::West => (-1, 0, 0),
            Direction::Above => (0, 0, 1),
            Direction::Below => (0, 0, -1),
        }
    }
}

// ---------------------------------------------------------------------------
// Track flow enums
// ---------------------------------------------------------------------------

/// A single path-construction step relative to the incoming flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Straight,
    Left,
    Right,
}

impl Move {
    /// Candidate evaluation order. Changing it changes seeded output.
    pub const ALL: [Move; 3] = [Move::Straight, Move::Left, Move::Right];

    pub fn quarter_turns(self) -> i32 {
        match self {
            Move::Straight => 0,
            Move::Left => 1,
            Move::Right => -1,
        }
    }

    pub fn degrees(self) -> f32 {
        self.quarter_turns() as f32 * 90.0
    }

    pub fn node_type(self) -> NodeType {
        match self {
            Move::Straight => NodeType::Straight,
            Move::Left => NodeType::TurnLeft,
            Move::Right => NodeType::TurnRight,
        }
    }
}

/// What a cell holds. `Blank` is unassigned space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    #[default]
    Blank,
    Start,
    Finish,
    Straight,
    TurnLeft,
    TurnRight,
    /// Gradual 90-degree left turn; replaces a 3-turn left-headed wiggle.
    TurnLeftWide,
    /// Gradual 90-degree right turn; replaces a 3-turn right-headed wiggle.
    TurnRightWide,
    DiagonalLeft5,
    DiagonalRight5,
    DiagonalLeft7,
    DiagonalRight7,
}

impl NodeType {
    pub const ALL: [NodeType; 12] = [
        NodeType::Blank,
        NodeType::Start,
        NodeType::Finish,
        NodeType::Straight,
        NodeType::TurnLeft,
        NodeType::TurnRight,
        NodeType::TurnLeftWide,
        NodeType::TurnRightWide,
        NodeType::DiagonalLeft5,
        NodeType::DiagonalRight5,
        NodeType::DiagonalLeft7,
        NodeType::DiagonalRight7,
    ];

    /// Asset name used by segment catalogs.
    pub fn asset_name(self) -> &'static str {
        match self {
            NodeType::Blank => "Blank1x1",
            NodeType::Start => "Start1x1",
            NodeType::Finish => "Finish1x1",
            NodeType::Straight => "Straight1x1",
            NodeType::TurnLeft => "TurnLeft1x1",
            NodeType::TurnRight => "TurnRight1x1",
            NodeType::TurnLeftWide => "TurnLeft2x2",
            NodeType::TurnRightWide => "TurnRight2x2",
            NodeType::DiagonalLeft5 => "DiagonalLeft5",
            NodeType::DiagonalRight5 => "DiagonalRight5",
            NodeType::DiagonalLeft7 => "DiagonalLeft7",
            NodeType::DiagonalRight7 => "DiagonalRight7",
        }
    }

    /// True for the two single-cell turns the path builder places.
    pub fn is_turn(self) -> bool {
        matches!(self, NodeType::TurnLeft | NodeType::TurnRight)
    }

    /// The segment that replaces a turn heading an alternating chain of
    /// `chain_len` turns. `None` for non-turns and unsupported lengths.
    pub fn smoothed(self, chain_len: u32) -> Option<NodeType> {
        match (self, chain_len) {
            (NodeType::TurnLeft, 3) => Some(NodeType::TurnLeftWide),
            (NodeType::TurnLeft, 5) => Some(NodeType::DiagonalLeft5),
            (NodeType::TurnLeft, 7) => Some(NodeType::DiagonalLeft7),
            (NodeType::TurnRight, 3) => Some(NodeType::TurnRightWide),
            (NodeType::TurnRight, 5) => Some(NodeType::DiagonalRight5),
            (NodeType::TurnRight, 7) => Some(NodeType::DiagonalRight7),
            _ => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset_name())
    }
}
