// Single-attempt path construction.
//
// `prepare_grid()` allocates the arena for a template and places the fixed
// markers: the finish first (open tracks only), then the start, then the
// auto-complete cell directly behind the end cell (the finish, or the start
// itself when looping). The auto-complete cell stays blank but is pre-linked
// into the end cell; once the path reaches it, the final move into the end
// is forced. Placement is a pure function of the template, so the prepared
// grid is built once per run and cloned for every attempt.
//
// An `Attempt` then grows the path one cell at a time from the cell in front
// of the start:
//
// 1. Evaluate straight, left, and right via `flow_target()` with full
//    validation (occupancy plus the adjacency pulse toward the auto-complete
//    cell).
// 2. If nothing is viable, retry without the pulse but only accept moves
//    that already head the way the end cell is entered.
// 3. If still nothing, accept any open neighbor.
// 4. If all three levels come up empty, the attempt fails.
//
// With two or more viable moves the pick is a ticket draw weighted by the
// active `WeightSchedule` entry. Committing a move fixes the current cell's
// type and flow rotations and pre-links the cell it points into.
//
// See also: `pulse.rs` for the reachability check, `weights.rs` for the
// ticket draw, `generator.rs` which runs many attempts and scores them,
// `postprocess.rs` for the timeline walk used on completed attempts.
//
// **Critical constraint: determinism.** All randomness comes from the
// attempt's own `TrackRng`, and candidates are always evaluated in
// `Move::ALL` order.

use crate::config::TrackTemplate;
use crate::error::TrackGenError;
use crate::grid::TrackGrid;
use crate::postprocess::walk_timeline;
use crate::pulse::path_to_target;
use crate::types::{GridCoord, Heading, Move, NodeType};
use crate::weights::{WeightSchedule, draw_ticketed};
use racetrack_prng::TrackRng;
use smallvec::SmallVec;
use tracing::trace;

// ---------------------------------------------------------------------------
// Marker placement
// ---------------------------------------------------------------------------

/// Fixed cells of a prepared grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub start: GridCoord,
    /// `None` for looping tracks.
    pub finish: Option<GridCoord>,
    /// The cell the path must close into: the finish, or the start when looping.
    pub end: GridCoord,
    /// Blank cell directly behind `end`, pre-linked into it.
    pub auto_complete: GridCoord,
    /// Heading the flow travels when it enters `end`.
    pub end_inflow: Heading,
    /// Cell in front of the start where the path begins.
    pub first: GridCoord,
}

impl Endpoints {
    pub fn is_looping(&self) -> bool {
        self.finish.is_none()
    }
}

/// A grid with its markers placed, ready to be cloned per attempt.
#[derive(Clone, Debug)]
pub struct PreparedGrid {
    pub grid: TrackGrid,
    pub endpoints: Endpoints,
}

/// Place the finish at `pos`, trying `preferred` and then 90-degree steps.
/// The cell behind the finish must be open and must not be `avoid`.
pub fn place_finish(
    grid: &mut TrackGrid,
    pos: GridCoord,
    preferred: Heading,
    avoid: GridCoord,
) -> Result<Heading, TrackGenError> {
    let heading = (0..4).map(|q| preferred.rotated(q)).find(|h| {
        grid.heading_neighbor(pos, h.opposite())
            .is_some_and(|behind| behind != avoid && grid.is_open(behind))
    });
    let (Some(heading), Some(cell)) = (heading, grid.get_mut(pos)) else {
        return Err(TrackGenError::Placement {
            marker: NodeType::Finish,
            position: pos,
        });
    };
    cell.node_type = NodeType::Finish;
    cell.rotation = heading;
    cell.inflow_rotation = heading;
    cell.outflow_rotation = heading;
    Ok(heading)
}

/// Place the start at `pos`, trying `preferred` and then 90-degree steps.
/// The cell ahead must be open; looping starts also need the cell behind.
/// On success the cell ahead is pre-linked as the first path cell.
pub fn place_start(
    grid: &mut TrackGrid,
    pos: GridCoord,
    preferred: Heading,
    looping: bool,
) -> Result<(Heading, GridCoord), TrackGenError> {
    let placement = (0..4).map(|q| preferred.rotated(q)).find_map(|h| {
        let ahead = grid.heading_neighbor(pos, h).filter(|c| grid.is_open(*c))?;
        if looping {
            grid.heading_neighbor(pos, h.opposite())
                .filter(|c| grid.is_open(*c))?;
        }
        Some((h, ahead))
    });
    let err = TrackGenError::Placement {
        marker: NodeType::Start,
        position: pos,
    };
    let Some((heading, first)) = placement else {
        return Err(err);
    };
    let Some(cell) = grid.get_mut(pos) else {
        return Err(err);
    };
    cell.node_type = NodeType::Start;
    cell.rotation = heading;
    cell.inflow_rotation = heading;
    cell.outflow_rotation = heading;
    cell.outflow = Some(first);
    if let Some(first_cell) = grid.get_mut(first) {
        first_cell.inflow = Some(pos);
    }
    Ok((heading, first))
}

/// Build the arena for `template` and place start, finish, and the
/// auto-complete link.
pub fn prepare_grid(template: &TrackTemplate) -> Result<PreparedGrid, TrackGenError> {
    template.validate()?;
    let mut grid = TrackGrid::new(
        template.columns,
        template.rows,
        template.depth,
        template.mask.as_ref(),
    );
    let start = template.start_coord()?;
    let finish = template.finish_coord()?;
    let start_pref = Heading::from_degrees(template.start_rotation).unwrap_or_default();
    let finish_pref = Heading::from_degrees(template.finish_rotation).unwrap_or_default();

    let finish_heading = match finish {
        Some(pos) => Some(place_finish(&mut grid, pos, finish_pref, start)?),
        None => None,
    };
    let (start_heading, first) = place_start(&mut grid, start, start_pref, finish.is_none())?;

    let (end, end_inflow) = match (finish, finish_heading) {
        (Some(pos), Some(heading)) => (pos, heading),
        _ => (start, start_heading),
    };
    let auto_complete = grid
        .heading_neighbor(end, end_inflow.opposite())
        .filter(|c| grid.is_open(*c))
        .ok_or(TrackGenError::Placement {
            marker: if finish.is_some() {
                NodeType::Finish
            } else {
                NodeType::Start
            },
            position: end,
        })?;
    if let Some(cell) = grid.get_mut(auto_complete) {
        cell.outflow = Some(end);
    }
    if let Some(cell) = grid.get_mut(end) {
        cell.inflow = Some(auto_complete);
    }

    Ok(PreparedGrid {
        grid,
        endpoints: Endpoints {
            start,
            finish,
            end,
            auto_complete,
            end_inflow,
            first,
        },
    })
}

/// Lay a fixed move sequence onto `grid`: a start at `start` facing
/// `heading`, one path cell per move, and a finish on the cell the last move
/// flows into. Returns the cells in flow order.
///
/// Used for hand-authored layouts; every cell it claims must be open.
pub fn lay_path(
    grid: &mut TrackGrid,
    start: GridCoord,
    heading: Heading,
    moves: &[Move],
) -> Result<Vec<GridCoord>, TrackGenError> {
    let Some(cell) = grid.get_mut(start).filter(|c| c.is_open()) else {
        return Err(TrackGenError::Placement {
            marker: NodeType::Start,
            position: start,
        });
    };
    cell.node_type = NodeType::Start;
    cell.rotation = heading;
    cell.inflow_rotation = heading;
    cell.outflow_rotation = heading;

    let mut timeline = vec![start];
    let mut prev = start;
    let mut flow = heading;
    let steps = moves
        .iter()
        .map(|mv| (mv.node_type(), mv.quarter_turns()))
        .chain(std::iter::once((NodeType::Finish, 0)));
    for (node_type, quarter_turns) in steps {
        let pos = grid
            .heading_neighbor(prev, flow)
            .filter(|c| grid.is_open(*c))
            .ok_or(TrackGenError::Placement {
                marker: node_type,
                position: prev,
            })?;
        let outflow = flow.rotated(quarter_turns);
        if let Some(cell) = grid.get_mut(pos) {
            cell.node_type = node_type;
            cell.rotation = flow;
            cell.inflow_rotation = flow;
            cell.outflow_rotation = outflow;
            cell.inflow = Some(prev);
        }
        if let Some(cell) = grid.get_mut(prev) {
            cell.outflow = Some(pos);
        }
        timeline.push(pos);
        prev = pos;
        flow = outflow;
    }
    Ok(timeline)
}

// ---------------------------------------------------------------------------
// Attempt state machine
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptState {
    Extending,
    Completed,
    Failed,
}

/// A finished attempt whose path closes into the end cell.
#[derive(Clone, Debug)]
pub struct CompletedAttempt {
    pub grid: TrackGrid,
    pub endpoints: Endpoints,
    /// Path cells in flow order, starting at the start cell.
    pub timeline: Vec<GridCoord>,
    /// Parts placed between start and end.
    pub length: u32,
}

#[derive(Clone, Debug)]
pub enum AttemptOutcome {
    Completed(CompletedAttempt),
    /// No viable move at any relaxation level.
    Failed { parts_placed: u32 },
}

/// One in-progress path construction over its own grid.
#[derive(Clone, Debug)]
pub struct Attempt {
    grid: TrackGrid,
    endpoints: Endpoints,
    current: GridCoord,
    /// Path-closing move claimed during the current step's evaluation.
    forced: Option<GridCoord>,
    parts_placed: u32,
    schedule: WeightSchedule,
    granularity: u32,
    rng: TrackRng,
    state: AttemptState,
}

type Candidates = SmallVec<[(Move, GridCoord); 3]>;

impl Attempt {
    pub fn new(
        prepared: &PreparedGrid,
        schedule: WeightSchedule,
        granularity: u32,
        rng: TrackRng,
    ) -> Self {
        Self {
            grid: prepared.grid.clone(),
            endpoints: prepared.endpoints,
            current: prepared.endpoints.first,
            forced: None,
            parts_placed: 0,
            schedule,
            granularity,
            rng,
            state: AttemptState::Extending,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn parts_placed(&self) -> u32 {
        self.parts_placed
    }

    /// The neighbor that `from`'s facing plus `test_rotation` degrees points
    /// at, optionally validated as a next move.
    ///
    /// With `validate`, a move out of the auto-complete cell that enters the
    /// end cell the right way is claimed as the forced move, and every later
    /// validated query in the same step is refused. Otherwise the target must
    /// be open; with `check_reachability` the pulse must reach `end` from it,
    /// and without it a move must already head the end's way unless an `end`
    /// is given.
    pub fn flow_target(
        &mut self,
        from: GridCoord,
        end: Option<GridCoord>,
        test_rotation: f32,
        validate: bool,
        check_reachability: bool,
    ) -> Option<GridCoord> {
        let cell = self.grid.get(from)?;
        let heading = Heading::from_degrees(cell.rotation.degrees() + test_rotation)?;
        let target = self.grid.heading_neighbor(from, heading)?;
        if !validate {
            return Some(target);
        }
        if self.forced.is_some() {
            return None;
        }
        if heading == self.endpoints.end_inflow && from == self.endpoints.auto_complete {
            trace!(%from, %target, "forcing path-closing move");
            self.forced = Some(target);
            return Some(target);
        }
        if !self.grid.is_open(target) {
            return None;
        }
        if check_reachability {
            let goal = end?;
            if !path_to_target(&self.grid, target, goal, self.current) {
                trace!(%from, %target, "avoiding dead end");
                return None;
            }
        } else if heading != self.endpoints.end_inflow && end.is_none() {
            return None;
        }
        Some(target)
    }

    /// Viable moves out of the current cell at the loosest level needed.
    fn viable_moves(&mut self, inflow_heading: Heading) -> Candidates {
        let base = inflow_heading.degrees();
        let levels = [
            (Some(self.endpoints.auto_complete), true),
            (None, false),
            (Some(self.current), false),
        ];
        let mut viable = Candidates::new();
        for (level, (end, reach)) in levels.into_iter().enumerate() {
            for mv in Move::ALL {
                if let Some(t) = self.flow_target(self.current, end, base + mv.degrees(), true, reach) {
                    viable.push((mv, t));
                }
            }
            if let Some(forced) = self.forced.take() {
                viable.retain(|(_, t)| *t == forced);
            }
            if !viable.is_empty() {
                if level > 0 {
                    trace!(level, at = %self.current, "relaxed validation found moves");
                }
                break;
            }
        }
        viable
    }

    /// Advance by one cell. No-op once the attempt has finished.
    pub fn step(&mut self) -> AttemptState {
        if self.state != AttemptState::Extending {
            return self.state;
        }
        let inflow_heading = self
            .grid
            .get(self.current)
            .and_then(|c| c.inflow)
            .and_then(|pred| self.grid.get(pred))
            .map(|pred| pred.outflow_rotation);
        let Some(inflow_heading) = inflow_heading else {
            self.state = AttemptState::Failed;
            return self.state;
        };

        let viable = self.viable_moves(inflow_heading);
        let pick = match viable.len() {
            0 => {
                trace!(at = %self.current, placed = self.parts_placed, "no viable moves");
                self.state = AttemptState::Failed;
                return self.state;
            }
            1 => 0,
            _ => {
                let weights = self.schedule.weights_at(self.parts_placed);
                let options: SmallVec<[(Move, f32); 3]> = viable
                    .iter()
                    .map(|(mv, _)| (*mv, weights.for_move(*mv)))
                    .collect();
                draw_ticketed(&mut self.rng, &options, self.granularity).unwrap_or(0)
            }
        };
        let (mv, target) = viable[pick];
        trace!(at = %self.current, ?mv, %target, options = viable.len(), "committing move");
        self.commit(mv, inflow_heading);

        if self.state == AttemptState::Extending && target == self.endpoints.end {
            self.state = AttemptState::Completed;
        }
        self.state
    }

    /// Fix the current cell as `mv` and pre-link the cell it flows into.
    fn commit(&mut self, mv: Move, inflow_heading: Heading) {
        let from = self.current;
        let Some(cell) = self.grid.get_mut(from) else {
            self.state = AttemptState::Failed;
            return;
        };
        cell.node_type = mv.node_type();
        cell.inflow_rotation = inflow_heading;
        cell.outflow_rotation = inflow_heading.rotated(mv.quarter_turns());
        cell.rotation = inflow_heading;

        let Some(next) = self.flow_target(from, None, mv.degrees(), false, false) else {
            self.state = AttemptState::Failed;
            return;
        };
        if let Some(cell) = self.grid.get_mut(from) {
            cell.outflow = Some(next);
        }
        if let Some(cell) = self.grid.get_mut(next) {
            cell.inflow = Some(from);
        }
        self.parts_placed += 1;
        self.current = next;
    }

    /// Step until the attempt completes or fails.
    pub fn run(mut self) -> AttemptOutcome {
        while self.step() == AttemptState::Extending {}
        match self.state {
            AttemptState::Completed => {
                let timeline = walk_timeline(&self.grid, self.endpoints.start);
                AttemptOutcome::Completed(CompletedAttempt {
                    grid: self.grid,
                    endpoints: self.endpoints,
                    timeline,
                    length: self.parts_placed,
                })
            }
            _ => AttemptOutcome::Failed {
                parts_placed: self.parts_placed,
            },
        }
    }
}
