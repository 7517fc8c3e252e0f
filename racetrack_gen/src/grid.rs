// Fixed-size 3D arena of track cells.
//
// `TrackGrid` stores `Option<Cell>` slots in a flat `Vec` indexed by
// `x + y * columns + z * columns * rows`. A `None` slot is space that does not
// exist (masked out by a `CellMask`, or removed by timeline re-derivation) and
// behaves exactly like out-of-bounds space. Neighbors are never cached: every
// lookup is a bounds-checked offset into the same array.
//
// `relative()` transforms an offset expressed in a cell's own frame
// (`rx` = to the right of the facing, `ry` = ahead) into absolute grid
// coordinates. The diagonal detector uses it to find the lateral cell a
// chain would sweep through.
//
// See also: `cell.rs` for the slot record, `pulse.rs` for the flood fill over
// this arena, `config.rs` for where masks come from.
//
// **Critical constraint: determinism.** Iteration order over the arena is
// always index order, never hash order.

use crate::cell::Cell;
use crate::error::TrackGenError;
use crate::types::{Direction, GridCoord, Heading};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Existence mask
// ---------------------------------------------------------------------------

/// Marks which slots of a grid exist. Absent slots are never allocated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMask {
    pub columns: u32,
    pub rows: u32,
    pub depth: u32,
    /// Flat, same layout as `TrackGrid`.
    pub present: Vec<bool>,
}

impl CellMask {
    /// A mask with every slot present.
    pub fn full(columns: u32, rows: u32, depth: u32) -> Self {
        let total = columns as usize * rows as usize * depth as usize;
        Self {
            columns,
            rows,
            depth,
            present: vec![true; total],
        }
    }

    /// Build a single-layer mask from an ASCII picture, top row first.
    /// `'#'` marks a present slot and `'.'` an absent one.
    pub fn from_rows(picture: &[&str]) -> Result<Self, TrackGenError> {
        let rows = picture.len();
        let columns = picture.first().map_or(0, |r| r.chars().count());
        if rows == 0 || columns == 0 {
            return Err(TrackGenError::configuration("mask picture is empty"));
        }
        let mut present = vec![false; columns * rows];
        for (line_idx, line) in picture.iter().enumerate() {
            if line.chars().count() != columns {
                return Err(TrackGenError::configuration(format!(
                    "mask row {line_idx} has {} columns, expected {columns}",
                    line.chars().count()
                )));
            }
            // The picture's top line is the northernmost row.
            let y = rows - 1 - line_idx;
            for (x, ch) in line.chars().enumerate() {
                present[x + y * columns] = match ch {
                    '#' => true,
                    '.' => false,
                    other => {
                        return Err(TrackGenError::configuration(format!(
                            "mask character {other:?} is not '#' or '.'"
                        )));
                    }
                };
            }
        }
        Ok(Self {
            columns: columns as u32,
            rows: rows as u32,
            depth: 1,
            present,
        })
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        if coord.x < 0 || coord.y < 0 || coord.z < 0 {
            return false;
        }
        let (x, y, z) = (coord.x as u32, coord.y as u32, coord.z as u32);
        if x >= self.columns || y >= self.rows || z >= self.depth {
            return false;
        }
        let i = x as usize
            + y as usize * self.columns as usize
            + z as usize * self.columns as usize * self.rows as usize;
        self.present.get(i).copied().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// The cell arena for one generation attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackGrid {
    cells: Vec<Option<Cell>>,
    pub columns: u32,
    pub rows: u32,
    pub depth: u32,
}

impl TrackGrid {
    /// Allocate a grid, creating a blank cell in every slot the mask allows.
    pub fn new(columns: u32, rows: u32, depth: u32, mask: Option<&CellMask>) -> Self {
        let total = columns as usize * rows as usize * depth as usize;
        let mut cells = Vec::with_capacity(total);
        for z in 0..depth as i32 {
            for y in 0..rows as i32 {
                for x in 0..columns as i32 {
                    let coord = GridCoord::new(x, y, z);
                    let exists = mask.is_none_or(|m| m.contains(coord));
                    cells.push(exists.then(|| Cell::blank(coord)));
                }
            }
        }
        Self {
            cells,
            columns,
            rows,
            depth,
        }
    }

    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.z >= 0
            && (coord.x as u32) < self.columns
            && (coord.y as u32) < self.rows
            && (coord.z as u32) < self.depth
    }

    /// Convert a coordinate to a flat index. Returns `None` if out of bounds.
    pub fn index(&self, coord: GridCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            let cols = self.columns as usize;
            let rows = self.rows as usize;
            Some(coord.x as usize + coord.y as usize * cols + coord.z as usize * cols * rows)
        } else {
            None
        }
    }

    /// Number of slots, present or not.
    pub fn slot_count(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, coord: GridCoord) -> Option<&Cell> {
        self.index(coord).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, coord: GridCoord) -> Option<&mut Cell> {
        self.index(coord).and_then(|i| self.cells[i].as_mut())
    }

    /// Whether a cell exists at `coord` (in bounds and not masked or removed).
    pub fn exists(&self, coord: GridCoord) -> bool {
        self.get(coord).is_some()
    }

    /// Whether `coord` holds a blank, non-ignored cell.
    pub fn is_open(&self, coord: GridCoord) -> bool {
        self.get(coord).is_some_and(Cell::is_open)
    }

    /// Destroy the cell at `coord`, leaving the slot empty.
    pub fn remove(&mut self, coord: GridCoord) -> Option<Cell> {
        self.index(coord).and_then(|i| self.cells[i].take())
    }

    /// Coordinate of the existing neighbor in `dir`, if any.
    pub fn neighbor(&self, coord: GridCoord, dir: Direction) -> Option<GridCoord> {
        let (dx, dy, dz) = dir.offset();
        let n = coord.offset(dx, dy, dz);
        self.exists(n).then_some(n)
    }

    /// Coordinate of the existing neighbor a heading points at, if any.
    pub fn heading_neighbor(&self, coord: GridCoord, heading: Heading) -> Option<GridCoord> {
        self.neighbor(coord, heading.direction())
    }

    /// Resolve an offset in `facing`'s frame to an existing absolute cell.
    ///
    /// `rx` is measured to the right of the facing and `ry` straight ahead;
    /// `rz` is unaffected by rotation.
    pub fn relative(
        &self,
        coord: GridCoord,
        facing: Heading,
        (rx, ry, rz): (i32, i32, i32),
    ) -> Option<GridCoord> {
        let (dx, dy) = match facing {
            Heading::North => (rx, ry),
            Heading::West => (-ry, rx),
            Heading::South => (-rx, -ry),
            Heading::East => (ry, -rx),
        };
        let target = coord.offset(dx, dy, rz);
        self.exists(target).then_some(target)
    }

    /// All present cells in index order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    #[test]
    fn new_grid_allocates_every_slot() {
        let grid = TrackGrid::new(4, 3, 2, None);
        assert_eq!(grid.slot_count(), 24);
        assert_eq!(grid.cells().count(), 24);
        let c = GridCoord::new(3, 2, 1);
        assert_eq!(grid.get(c).map(|cell| cell.position), Some(c));
    }

    #[test]
    fn out_of_bounds_is_none() {
        let grid = TrackGrid::new(4, 4, 1, None);
        assert!(grid.get(GridCoord::new(-1, 0, 0)).is_none());
        assert!(grid.get(GridCoord::new(4, 0, 0)).is_none());
        assert!(grid.get(GridCoord::new(0, 0, 1)).is_none());
        assert_eq!(grid.index(GridCoord::new(0, 4, 0)), None);
    }

    #[test]
    fn neighbors_use_position_arithmetic() {
        let grid = TrackGrid::new(3, 3, 2, None);
        let c = GridCoord::new(1, 1, 0);
        assert_eq!(grid.neighbor(c, Direction::North), Some(GridCoord::new(1, 2, 0)));
        assert_eq!(grid.neighbor(c, Direction::East), Some(GridCoord::new(2, 1, 0)));
        assert_eq!(grid.neighbor(c, Direction::Above), Some(GridCoord::new(1, 1, 1)));
        assert_eq!(grid.neighbor(c, Direction::Below), None);
        assert_eq!(
            grid.heading_neighbor(c, Heading::West),
            Some(GridCoord::new(0, 1, 0))
        );
    }

    #[test]
    fn removed_cell_behaves_like_missing_space() {
        let mut grid = TrackGrid::new(3, 3, 1, None);
        let c = GridCoord::new(1, 1, 0);
        if let Some(cell) = grid.get_mut(c) {
            cell.node_type = NodeType::Straight;
        }
        let removed = grid.remove(c);
        assert_eq!(removed.map(|cell| cell.node_type), Some(NodeType::Straight));
        assert!(!grid.exists(c));
        assert_eq!(grid.neighbor(GridCoord::new(0, 1, 0), Direction::East), None);
    }

    #[test]
    fn relative_offsets_rotate_with_facing() {
        let grid = TrackGrid::new(5, 5, 1, None);
        let c = GridCoord::new(2, 2, 0);
        // One cell ahead.
        assert_eq!(grid.relative(c, Heading::North, (0, 1, 0)), Some(GridCoord::new(2, 3, 0)));
        assert_eq!(grid.relative(c, Heading::West, (0, 1, 0)), Some(GridCoord::new(1, 2, 0)));
        assert_eq!(grid.relative(c, Heading::South, (0, 1, 0)), Some(GridCoord::new(2, 1, 0)));
        assert_eq!(grid.relative(c, Heading::East, (0, 1, 0)), Some(GridCoord::new(3, 2, 0)));
        // One cell to the right.
        assert_eq!(grid.relative(c, Heading::North, (1, 0, 0)), Some(GridCoord::new(3, 2, 0)));
        assert_eq!(grid.relative(c, Heading::West, (1, 0, 0)), Some(GridCoord::new(2, 3, 0)));
        assert_eq!(grid.relative(c, Heading::South, (1, 0, 0)), Some(GridCoord::new(1, 2, 0)));
        assert_eq!(grid.relative(c, Heading::East, (1, 0, 0)), Some(GridCoord::new(2, 1, 0)));
        // Off the edge.
        assert_eq!(grid.relative(GridCoord::new(0, 0, 0), Heading::South, (1, 0, 0)), None);
    }

    #[test]
    fn mask_from_rows_reads_top_row_as_north() {
        let mask = CellMask::from_rows(&["#..", "###"]).unwrap();
        assert_eq!((mask.columns, mask.rows, mask.depth), (3, 2, 1));
        assert!(mask.contains(GridCoord::new(0, 1, 0)));
        assert!(!mask.contains(GridCoord::new(1, 1, 0)));
        assert!(mask.contains(GridCoord::new(2, 0, 0)));
        assert!(!mask.contains(GridCoord::new(3, 0, 0)));
    }

    #[test]
    fn mask_rejects_ragged_or_unknown_rows() {
        assert!(CellMask::from_rows(&["##", "#"]).is_err());
        assert!(CellMask::from_rows(&["#x"]).is_err());
        assert!(CellMask::from_rows(&[]).is_err());
    }

    #[test]
    fn masked_grid_skips_absent_slots() {
        let mask = CellMask::from_rows(&["#.#", "###"]).unwrap();
        let grid = TrackGrid::new(3, 2, 1, Some(&mask));
        assert_eq!(grid.cells().count(), 5);
        assert!(!grid.exists(GridCoord::new(1, 1, 0)));
        assert_eq!(grid.neighbor(GridCoord::new(1, 0, 0), Direction::North), None);
    }
}
