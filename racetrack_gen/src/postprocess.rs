// Passes over a completed path: diagonal chains, tight 180s, and timeline
// re-derivation.
//
// `detect_diagonals()` walks the path in flow order looking for runs of turns
// that strictly alternate direction (left, right, left, ...). Whenever a run
// member turns the same way as the run's head, the lateral cell a smoothed
// segment would sweep through must be blank (or missing from the grid). Odd
// runs of 3 or more, up to the configured maximum, mark their head with the
// run length and the list of cells the smoothed segment absorbs. Even runs
// longer than 2 add one to the diagonal total and are skipped whole.
//
// `smooth_diagonals()` replaces each marked head with its wide-turn or
// diagonal segment, splices the head's outflow past the absorbed cells,
// flags those cells ignored, and re-derives the timeline. Re-derivation walks
// outflow links from the start and destroys every previously-ordered cell the
// walk no longer reaches.
//
// `detect_tight_180s()` flags turns followed directly by a turn the same way.
//
// See also: `grid.rs` for the rotation-aware `relative()` lookup,
// `generator.rs` which runs detection on every completed attempt (for
// scoring) and smoothing only on the winner.
//
// **Critical constraint: determinism.** Passes iterate in flow order only.

use crate::error::TrackGenError;
use crate::grid::TrackGrid;
use crate::types::{GridCoord, NodeType};
use tracing::debug;

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Cells reachable from `start` by following outflow links, in flow order.
/// Stops at a missing link or the first repeated cell (loop closure).
pub fn walk_timeline(grid: &TrackGrid, start: GridCoord) -> Vec<GridCoord> {
    let mut visited = vec![false; grid.slot_count()];
    let mut timeline = Vec::new();
    let mut next = Some(start);
    while let Some(pos) = next {
        let (Some(i), Some(cell)) = (grid.index(pos), grid.get(pos)) else {
            break;
        };
        if visited[i] {
            break;
        }
        visited[i] = true;
        timeline.push(pos);
        next = cell.outflow;
    }
    timeline
}

/// Rebuild the timeline from `start` and destroy every cell of `previous`
/// the new walk does not reach.
pub fn rederive_timeline(
    grid: &mut TrackGrid,
    start: GridCoord,
    previous: &[GridCoord],
) -> Vec<GridCoord> {
    let timeline = walk_timeline(grid, start);
    let mut kept = vec![false; grid.slot_count()];
    for pos in &timeline {
        if let Some(i) = grid.index(*pos) {
            kept[i] = true;
        }
    }
    for pos in previous {
        if grid.index(*pos).is_some_and(|i| !kept[i]) {
            grid.remove(*pos);
        }
    }
    timeline
}

// ---------------------------------------------------------------------------
// Diagonal chains
// ---------------------------------------------------------------------------

/// Result of a diagonal detection pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagonalReport {
    /// Scored diagonal count: each recorded chain adds its length, each
    /// skipped even run adds one.
    pub total: u32,
    /// Chain heads in flow order.
    pub heads: Vec<GridCoord>,
}

/// Length of the alternating run starting at `timeline[i]` and the cells it
/// would absorb. Returns `(1, [])` for a lone turn.
fn measure_chain(grid: &TrackGrid, timeline: &[GridCoord], i: usize) -> (u32, Vec<GridCoord>) {
    let mut absorbed = Vec::new();
    let mut chain = 1u32;
    let Some(head_type) = grid.get(timeline[i]).map(|c| c.node_type) else {
        return (0, absorbed);
    };
    let lateral_offset = if head_type == NodeType::TurnLeft {
        (1, 0, 0)
    } else {
        (-1, 0, 0)
    };

    let mut temp = timeline[i];
    for _ in i..timeline.len() {
        let Some(prev) = grid.get(temp) else { break };
        let Some(next) = prev.outflow.and_then(|pos| grid.get(pos)) else {
            break;
        };
        if !next.node_type.is_turn() || next.node_type == prev.node_type {
            break;
        }
        if next.node_type == head_type {
            if let Some(lateral) = grid.relative(next.position, next.rotation, lateral_offset) {
                if grid.get(lateral).is_some_and(|c| !c.is_blank()) {
                    break;
                }
                absorbed.push(lateral);
            }
        }
        absorbed.push(next.position);
        chain += 1;
        temp = next.position;
    }
    (chain, absorbed)
}

/// Mark smoothable alternating-turn chains along `timeline`.
pub fn detect_diagonals(grid: &mut TrackGrid, timeline: &[GridCoord], max_chain: u32) -> DiagonalReport {
    let mut report = DiagonalReport::default();
    let mut i = 0;
    while i < timeline.len() {
        let is_turn = grid
            .get(timeline[i])
            .is_some_and(|c| c.node_type.is_turn() && !c.ignored);
        if !is_turn {
            i += 1;
            continue;
        }
        let (chain, absorbed) = measure_chain(grid, timeline, i);
        if chain > 2 && chain % 2 == 0 {
            report.total += 1;
            i += chain as usize;
        } else if chain > 2 && chain <= max_chain {
            if let Some(head) = grid.get_mut(timeline[i]) {
                head.diagonal_chain = chain;
                head.absorbed = absorbed;
            }
            report.heads.push(timeline[i]);
            report.total += chain;
            i += chain as usize;
        } else {
            i += 1;
        }
    }
    report
}

/// Replace one marked chain head with its smoothed segment and splice the
/// flow past the absorbed cells. Does not touch the timeline.
fn splice_chain(grid: &mut TrackGrid, head_pos: GridCoord) -> Result<(), TrackGenError> {
    let Some(head) = grid.get(head_pos) else {
        return Ok(());
    };
    let length = head.diagonal_chain;
    let smoothed = head
        .node_type
        .smoothed(length)
        .ok_or(TrackGenError::UnsupportedDiagonal { length })?;
    let absorbed = head.absorbed.clone();
    let Some(last) = absorbed.last().and_then(|pos| grid.get(*pos)) else {
        return Ok(());
    };
    let successor = last.outflow;
    let outflow_rotation = last.outflow_rotation;

    if let Some(head) = grid.get_mut(head_pos) {
        head.node_type = smoothed;
        head.outflow = successor;
        head.outflow_rotation = outflow_rotation;
        head.absorbed.clear();
    }
    if let Some(next) = successor.and_then(|pos| grid.get_mut(pos)) {
        next.inflow = Some(head_pos);
    }
    for pos in &absorbed {
        if let Some(cell) = grid.get_mut(*pos) {
            cell.ignored = true;
        }
    }
    debug!(head = %head_pos, length, segment = %smoothed, "smoothed diagonal chain");
    Ok(())
}

/// Smooth every head in `heads` and return the re-derived timeline.
pub fn smooth_diagonals(
    grid: &mut TrackGrid,
    start: GridCoord,
    timeline: &[GridCoord],
    heads: &[GridCoord],
) -> Result<Vec<GridCoord>, TrackGenError> {
    for head in heads {
        splice_chain(grid, *head)?;
    }
    Ok(rederive_timeline(grid, start, timeline))
}

// ---------------------------------------------------------------------------
// Tight 180s
// ---------------------------------------------------------------------------

/// Flag every turn whose successor turns the same way. Returns the count.
pub fn detect_tight_180s(grid: &mut TrackGrid, timeline: &[GridCoord]) -> u32 {
    let mut total = 0;
    for pos in timeline {
        let tight = grid.get(*pos).is_some_and(|cell| {
            cell.node_type.is_turn()
                && cell
                    .outflow
                    .and_then(|next| grid.get(next))
                    .is_some_and(|next| next.node_type == cell.node_type)
        });
        if tight {
            if let Some(cell) = grid.get_mut(*pos) {
                cell.tight_180 = true;
            }
            total += 1;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::lay_path;
    use crate::types::{Heading, Move};

    const L: Move = Move::Left;
    const R: Move = Move::Right;
    const S: Move = Move::Straight;

    fn laid(columns: u32, rows: u32, start: (i32, i32), moves: &[Move]) -> (TrackGrid, Vec<GridCoord>) {
        let mut grid = TrackGrid::new(columns, rows, 1, None);
        let timeline = lay_path(
            &mut grid,
            GridCoord::new(start.0, start.1, 0),
            Heading::North,
            moves,
        )
        .unwrap();
        (grid, timeline)
    }

    #[test]
    fn walk_stops_at_loop_closure() {
        let (mut grid, timeline) = laid(3, 3, (0, 0), &[S]);
        // Close the path back into the start.
        let last = *timeline.last().unwrap();
        grid.get_mut(last).unwrap().outflow = Some(timeline[0]);
        assert_eq!(walk_timeline(&grid, timeline[0]), timeline);
    }

    #[test]
    fn chain_of_three_is_recorded_with_lateral_cell() {
        // Head at (3,1) turns left; (2,2) turns left again and sweeps (3,2).
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        let report = detect_diagonals(&mut grid, &timeline, 7);
        assert_eq!(report.heads, vec![GridCoord::new(3, 1, 0)]);
        assert_eq!(report.total, 3);
        let head = grid.get(GridCoord::new(3, 1, 0)).unwrap();
        assert_eq!(head.diagonal_chain, 3);
        assert_eq!(
            head.absorbed,
            vec![
                GridCoord::new(2, 1, 0),
                GridCoord::new(3, 2, 0),
                GridCoord::new(2, 2, 0),
            ]
        );
    }

    #[test]
    fn occupied_lateral_cell_breaks_the_chain() {
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        grid.get_mut(GridCoord::new(3, 2, 0)).unwrap().node_type = NodeType::Straight;
        let report = detect_diagonals(&mut grid, &timeline, 7);
        assert!(report.heads.is_empty());
        assert_eq!(report.total, 0);
    }

    #[test]
    fn missing_lateral_cell_does_not_break_the_chain() {
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        grid.remove(GridCoord::new(3, 2, 0));
        let report = detect_diagonals(&mut grid, &timeline, 7);
        assert_eq!(report.heads.len(), 1);
        let head = grid.get(report.heads[0]).unwrap();
        assert_eq!(
            head.absorbed,
            vec![GridCoord::new(2, 1, 0), GridCoord::new(2, 2, 0)]
        );
    }

    #[test]
    fn even_run_counts_once_and_is_skipped() {
        let (mut grid, timeline) = laid(5, 5, (4, 0), &[L, R, L, R, S]);
        let report = detect_diagonals(&mut grid, &timeline, 7);
        assert!(report.heads.is_empty());
        assert_eq!(report.total, 1);
        assert!(grid.cells().all(|c| c.diagonal_chain == 0));
    }

    #[test]
    fn runs_over_the_maximum_are_ignored() {
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        let report = detect_diagonals(&mut grid, &timeline, 2);
        assert!(report.heads.is_empty());
        assert_eq!(report.total, 0);
    }

    #[test]
    fn smoothing_splices_past_absorbed_cells() {
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        let report = detect_diagonals(&mut grid, &timeline, 7);
        let head_pos = report.heads[0];
        let absorbed = grid.get(head_pos).unwrap().absorbed.clone();
        let successor = GridCoord::new(1, 2, 0);

        let rebuilt = smooth_diagonals(&mut grid, timeline[0], &timeline, &report.heads).unwrap();

        let head = grid.get(head_pos).unwrap();
        assert_eq!(head.node_type, NodeType::TurnLeftWide);
        assert_eq!(head.outflow, Some(successor));
        assert_eq!(head.outflow_rotation, Heading::West);
        assert!(head.absorbed.is_empty());
        assert_eq!(grid.get(successor).unwrap().inflow, Some(head_pos));
        for pos in &absorbed {
            assert!(!rebuilt.contains(pos));
        }
        // Chain members are destroyed; the lateral blank stays, ignored.
        assert!(!grid.exists(GridCoord::new(2, 1, 0)));
        assert!(!grid.exists(GridCoord::new(2, 2, 0)));
        assert!(grid.get(GridCoord::new(3, 2, 0)).unwrap().ignored);
        assert_eq!(
            rebuilt,
            vec![
                GridCoord::new(3, 0, 0),
                head_pos,
                successor,
                GridCoord::new(0, 2, 0),
            ]
        );
    }

    #[test]
    fn unsupported_length_is_an_error() {
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        let report = detect_diagonals(&mut grid, &timeline, 7);
        grid.get_mut(report.heads[0]).unwrap().diagonal_chain = 9;
        let err = smooth_diagonals(&mut grid, timeline[0], &timeline, &report.heads);
        assert!(matches!(
            err,
            Err(TrackGenError::UnsupportedDiagonal { length: 9 })
        ));
    }

    #[test]
    fn five_chain_uses_diagonal_segment() {
        // L R L R L heading north then west in a staircase.
        let (mut grid, timeline) = laid(6, 6, (5, 0), &[L, R, L, R, L, S]);
        let report = detect_diagonals(&mut grid, &timeline, 7);
        assert_eq!(report.heads, vec![GridCoord::new(5, 1, 0)]);
        assert_eq!(report.total, 5);
        let rebuilt = smooth_diagonals(&mut grid, timeline[0], &timeline, &report.heads).unwrap();
        assert_eq!(
            grid.get(report.heads[0]).unwrap().node_type,
            NodeType::DiagonalLeft5
        );
        assert_eq!(rebuilt.len(), timeline.len() - 4);
    }

    #[test]
    fn same_direction_turns_are_tight_180s() {
        // Right, right: a U-turn.
        let (mut grid, timeline) = laid(3, 3, (0, 0), &[R, R]);
        let total = detect_tight_180s(&mut grid, &timeline);
        assert_eq!(total, 1);
        assert!(grid.get(GridCoord::new(0, 1, 0)).unwrap().tight_180);
        assert!(!grid.get(GridCoord::new(1, 1, 0)).unwrap().tight_180);
    }

    #[test]
    fn alternating_turns_are_not_tight_180s() {
        let (mut grid, timeline) = laid(5, 5, (3, 0), &[L, R, L, S]);
        assert_eq!(detect_tight_180s(&mut grid, &timeline), 0);
    }
}
