// Adjacency pulse: look-ahead reachability for the path builder.
//
// Before the builder commits a move into `candidate`, it asks whether the
// target cell can still be reached from there. The pulse is a breadth-first
// flood fill over open (blank, non-ignored) cells of the candidate's layer,
// four-connected, with the cell currently being extended from treated as an
// obstacle. It succeeds as soon as the target is the candidate itself or a
// cardinal neighbor of any cell the fill expands.
//
// The visited set is a `Vec<bool>` indexed by grid slot, so each cell is
// expanded at most once and the fill always terminates.
//
// See also: `flow.rs` which calls the pulse from `flow_target()` at the
// strictest relaxation level, `grid.rs` for the arena being searched.
//
// **Critical constraint: determinism.** Pure function of grid state; no
// randomness.

use crate::grid::TrackGrid;
use crate::types::{Direction, GridCoord};
use std::collections::VecDeque;
use tracing::trace;

/// Whether `target` stays reachable if the path moves from `obstacle` into
/// `candidate`.
pub fn path_to_target(
    grid: &TrackGrid,
    candidate: GridCoord,
    target: GridCoord,
    obstacle: GridCoord,
) -> bool {
    if candidate == target {
        return true;
    }
    let Some(start_idx) = grid.index(candidate) else {
        return false;
    };

    let mut visited = vec![false; grid.slot_count()];
    visited[start_idx] = true;
    if let Some(i) = grid.index(obstacle) {
        visited[i] = true;
    }

    let mut queue = VecDeque::new();
    queue.push_back(candidate);
    let mut expanded = 0usize;
    while let Some(current) = queue.pop_front() {
        expanded += 1;
        for dir in Direction::CARDINAL {
            let Some(n) = grid.neighbor(current, dir) else {
                continue;
            };
            if n == target {
                trace!(%candidate, %target, expanded, "pulse found target");
                return true;
            }
            let Some(ni) = grid.index(n) else {
                continue;
            };
            if visited[ni] || !grid.is_open(n) {
                continue;
            }
            visited[ni] = true;
            queue.push_back(n);
        }
    }
    trace!(%candidate, %target, expanded, "pulse exhausted");
    false
}
