// Multi-attempt generation loop and final track output.
//
// `generate()` is the library entry point. It validates the template, places
// the fixed markers once, draws desirability targets from the master RNG, and
// then runs attempts, each on its own clone of the prepared grid with its own
// child RNG forked from the master. Every completed attempt gets the diagonal
// and tight-180 passes for scoring; the best-scoring one (earliest on ties)
// wins and, if enabled, has its diagonal chains smoothed. Losing grids are
// dropped as soon as they are outscored.
//
// The loop stops when `generation_attempts` attempts have completed, when
// `failure_threshold` attempts have failed, or (with
// `stop_at_first_completion`) as soon as one completes. Both caps are
// validated as positive, so the loop always terminates.
//
// `generate_parallel()` fans attempts out over rayon in batches of pre-forked
// child RNGs and consumes the results in fork order under the same caps, so
// its output matches `generate()` for the same seed.
//
// See also: `flow.rs` for a single attempt, `scoring.rs` for desirability,
// `postprocess.rs` for the diagonal and tight-180 passes, `assembly.rs` which
// consumes `GeneratedTrack`.
//
// **Critical constraint: determinism.** The output is a pure function of
// `(template, seed)`. Wall-clock time is recorded for statistics only.

use crate::config::TrackTemplate;
use crate::error::TrackGenError;
use crate::flow::{Attempt, AttemptOutcome, CompletedAttempt, Endpoints, PreparedGrid, prepare_grid};
use crate::grid::TrackGrid;
use crate::postprocess::{DiagonalReport, detect_diagonals, detect_tight_180s, smooth_diagonals};
use crate::scoring::{AttemptMetrics, DesirabilityTargets, score, select_best};
use crate::types::{GridCoord, Heading, NodeType};
use crate::weights::WeightSchedule;
use racetrack_prng::TrackRng;
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One placed piece of the final track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TrackSegment {
    pub node_type: NodeType,
    pub position: GridCoord,
    pub rotation: Heading,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackStats {
    /// Parts placed between the start and the end cell.
    pub length: u32,
    pub diagonal_total: u32,
    pub tight_180_total: u32,
    pub score: f64,
    pub targets: DesirabilityTargets,
    pub attempts_completed: u32,
    pub attempts_failed: u32,
    pub duration: Duration,
}

/// The winning track of a generation run.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedTrack {
    pub seed: u64,
    pub looping: bool,
    /// Segments in flow order, starting with the start marker.
    pub segments: Vec<TrackSegment>,
    pub stats: TrackStats,
    /// Final grid state, for callers that want to inspect links or flags.
    #[serde(skip)]
    pub grid: TrackGrid,
}

impl GeneratedTrack {
    pub fn to_json(&self) -> Result<String, TrackGenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The segment whose type is `Finish`, if the track is open.
    pub fn finish(&self) -> Option<&TrackSegment> {
        self.segments.iter().find(|s| s.node_type == NodeType::Finish)
    }
}

/// A completed attempt after the scoring passes.
#[derive(Clone, Debug)]
pub struct AttemptRecord {
    pub grid: TrackGrid,
    pub endpoints: Endpoints,
    pub timeline: Vec<GridCoord>,
    pub metrics: AttemptMetrics,
    pub diagonals: DiagonalReport,
    pub score: f64,
}

impl AttemptRecord {
    /// Run the diagonal and tight-180 passes over `attempt` and score it.
    pub fn evaluate(
        attempt: CompletedAttempt,
        template: &TrackTemplate,
        targets: &DesirabilityTargets,
    ) -> Self {
        let CompletedAttempt {
            mut grid,
            endpoints,
            timeline,
            length,
        } = attempt;
        let diagonals = detect_diagonals(&mut grid, &timeline, template.diagonal.max_chain);
        let tight_180s = detect_tight_180s(&mut grid, &timeline);
        let metrics = AttemptMetrics {
            length,
            diagonals: diagonals.total,
            tight_180s,
        };
        let score = score(&template.desirability, targets, &metrics);
        Self {
            grid,
            endpoints,
            timeline,
            metrics,
            diagonals,
            score,
        }
    }
}

// ---------------------------------------------------------------------------
// Search bookkeeping
// ---------------------------------------------------------------------------

enum Trial {
    Completed(Box<AttemptRecord>),
    Failed { parts_placed: u32 },
}

struct Search {
    attempts_cap: u32,
    failure_cap: u32,
    stop_at_first: bool,
    completed: u32,
    failed: u32,
    best: Option<AttemptRecord>,
}

impl Search {
    fn new(template: &TrackTemplate) -> Self {
        Self {
            attempts_cap: template.generation_attempts,
            failure_cap: template.failure_threshold,
            stop_at_first: template.stop_at_first_completion,
            completed: 0,
            failed: 0,
            best: None,
        }
    }

    fn wants_more(&self) -> bool {
        if self.stop_at_first && self.completed > 0 {
            return false;
        }
        self.completed < self.attempts_cap && self.failed < self.failure_cap
    }

    fn absorb(&mut self, trial: Trial) {
        match trial {
            Trial::Completed(record) => {
                self.completed += 1;
                debug!(
                    attempt = self.completed + self.failed,
                    length = record.metrics.length,
                    diagonals = record.metrics.diagonals,
                    tight_180s = record.metrics.tight_180s,
                    score = record.score,
                    "attempt completed"
                );
                let replace = match &self.best {
                    Some(best) => select_best(&[best.score, record.score]) == Some(1),
                    None => true,
                };
                if replace {
                    self.best = Some(*record);
                }
            }
            Trial::Failed { parts_placed } => {
                self.failed += 1;
                debug!(attempt = self.completed + self.failed, parts_placed, "attempt failed");
            }
        }
    }
}

fn run_trial(
    prepared: &PreparedGrid,
    template: &TrackTemplate,
    targets: &DesirabilityTargets,
    rng: TrackRng,
) -> Trial {
    let schedule = WeightSchedule::new(
        template.weights,
        template.adaptive_weight_segments.clone(),
        targets.length,
    );
    match Attempt::new(prepared, schedule, template.weight_granularity, rng).run() {
        AttemptOutcome::Completed(attempt) => {
            Trial::Completed(Box::new(AttemptRecord::evaluate(attempt, template, targets)))
        }
        AttemptOutcome::Failed { parts_placed } => Trial::Failed { parts_placed },
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Generate a track from `template`, reproducibly for a given `seed`.
pub fn generate(template: &TrackTemplate, seed: u64) -> Result<GeneratedTrack, TrackGenError> {
    let began = Instant::now();
    let prepared = prepare_grid(template)?;
    let mut rng = TrackRng::new(seed);
    let targets = DesirabilityTargets::draw(&template.desirability, &mut rng);
    debug!(?targets, "desirability targets drawn");

    let mut search = Search::new(template);
    while search.wants_more() {
        let trial = run_trial(&prepared, template, &targets, rng.fork());
        search.absorb(trial);
    }
    finish(search, template, seed, targets, began)
}

/// Same result as [`generate`], with attempts run `batch` at a time on the
/// rayon pool.
pub fn generate_parallel(
    template: &TrackTemplate,
    seed: u64,
    batch: usize,
) -> Result<GeneratedTrack, TrackGenError> {
    let began = Instant::now();
    let prepared = prepare_grid(template)?;
    let mut rng = TrackRng::new(seed);
    let targets = DesirabilityTargets::draw(&template.desirability, &mut rng);
    let batch = batch.max(1);

    let mut search = Search::new(template);
    while search.wants_more() {
        let seeds: Vec<TrackRng> = (0..batch).map(|_| rng.fork()).collect();
        let trials: Vec<Trial> = seeds
            .into_par_iter()
            .map(|child| run_trial(&prepared, template, &targets, child))
            .collect();
        for trial in trials {
            if !search.wants_more() {
                break;
            }
            search.absorb(trial);
        }
    }
    finish(search, template, seed, targets, began)
}

fn finish(
    search: Search,
    template: &TrackTemplate,
    seed: u64,
    targets: DesirabilityTargets,
    began: Instant,
) -> Result<GeneratedTrack, TrackGenError> {
    let Search {
        completed,
        failed,
        best,
        ..
    } = search;
    let Some(mut best) = best else {
        info!(failed, "generation exhausted without a completed track");
        return Err(TrackGenError::Exhausted { completed, failed });
    };

    let timeline = if template.diagonal.smoothing && !best.diagonals.heads.is_empty() {
        smooth_diagonals(
            &mut best.grid,
            best.endpoints.start,
            &best.timeline,
            &best.diagonals.heads,
        )?
    } else {
        best.timeline
    };

    let segments: Vec<TrackSegment> = timeline
        .iter()
        .filter_map(|pos| best.grid.get(*pos))
        .map(|cell| TrackSegment {
            node_type: cell.node_type,
            position: cell.position,
            rotation: cell.rotation,
        })
        .collect();

    let stats = TrackStats {
        length: best.metrics.length,
        diagonal_total: best.metrics.diagonals,
        tight_180_total: best.metrics.tight_180s,
        score: best.score,
        targets,
        attempts_completed: completed,
        attempts_failed: failed,
        duration: began.elapsed(),
    };
    info!(
        seed,
        completed,
        failed,
        length = stats.length,
        segments = segments.len(),
        score = stats.score,
        "track generated"
    );

    Ok(GeneratedTrack {
        seed,
        looping: best.endpoints.is_looping(),
        segments,
        stats,
        grid: best.grid,
    })
}
