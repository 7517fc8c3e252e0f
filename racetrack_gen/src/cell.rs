// Per-cell flow record.
//
// A `Cell` is one populated slot of the `TrackGrid` arena. Links to the
// previous and next cells of the path are stored as `GridCoord`s and resolved
// through the grid on every use, so replacing or removing a cell can never
// leave a dangling reference behind. A link that points at a removed slot
// simply resolves to `None`.
//
// See also: `grid.rs` for the arena, `flow.rs` for the commit rules that fill
// in the flow fields, `postprocess.rs` for the diagonal and tight-180 markers.

use crate::types::{GridCoord, Heading, NodeType};
use serde::{Deserialize, Serialize};

/// One grid slot holding either blank space or a piece of the track flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub position: GridCoord,
    /// Facing used for orientation bookkeeping. Blank cells face north.
    pub rotation: Heading,
    pub node_type: NodeType,
    /// Heading the flow is travelling when it enters this cell.
    pub inflow_rotation: Heading,
    /// Heading the flow is travelling when it leaves this cell.
    pub outflow_rotation: Heading,
    pub inflow: Option<GridCoord>,
    pub outflow: Option<GridCoord>,
    /// Excluded from pathing and timelines (absorbed by a smoothed diagonal).
    pub ignored: bool,
    /// Length of the alternating-turn chain this cell heads, or 0.
    pub diagonal_chain: u32,
    pub tight_180: bool,
    /// Cells swallowed by this chain head. Emptied once the splice is done.
    pub absorbed: Vec<GridCoord>,
}

impl Cell {
    /// A fresh blank cell at `position`.
    pub fn blank(position: GridCoord) -> Self {
        Self {
            position,
            rotation: Heading::North,
            node_type: NodeType::Blank,
            inflow_rotation: Heading::North,
            outflow_rotation: Heading::North,
            inflow: None,
            outflow: None,
            ignored: false,
            diagonal_chain: 0,
            tight_180: false,
            absorbed: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.node_type == NodeType::Blank
    }

    /// Blank and not excluded: space the path builder may still claim.
    pub fn is_open(&self) -> bool {
        self.is_blank() && !self.ignored
    }
}
