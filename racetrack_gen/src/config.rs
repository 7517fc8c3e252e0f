// Data-driven track template.
//
// Every tunable generation parameter lives in `TrackTemplate`, loaded from
// JSON or built from a named preset. The generator never uses magic numbers
// for track shape: grid extents, start/finish markers, attempt caps, move
// weights, the adaptive weight schedule, desirability targets, and diagonal
// smoothing all come from here.
//
// Parameters are grouped into nested structs: `MoveWeights` (straight/left/
// right preference), `AdaptiveWeightSegment` (a piecewise override of those
// weights for part of the target length), `MetricTarget` (one desirability
// metric) grouped in `DesirabilitySettings`, and `DiagonalSettings`. Named
// preset constructors (`TrackTemplate::compact_loop()`,
// `::winding_sprint()`) tune the same parameter set.
//
// Coordinates are 1-based as authored; 0 means "unset", and a finish of
// `[0, 0, 0]` selects a looping track. `validate()` checks everything the
// generator relies on before any grid is allocated.
//
// See also: `generator.rs` which consumes the template, `weights.rs` for how
// the adaptive segments are scheduled, `scoring.rs` for the desirability math.
//
// **Critical constraint: determinism.** The template plus a seed fully
// determines the generated track.

use crate::error::TrackGenError;
use crate::grid::CellMask;
use crate::types::{GridCoord, Heading, Move};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Nested parameter groups
// ---------------------------------------------------------------------------

/// Relative preference for each move when more than one is viable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveWeights {
    pub straight: f32,
    pub left: f32,
    pub right: f32,
}

impl MoveWeights {
    pub fn for_move(&self, mv: Move) -> f32 {
        match mv {
            Move::Straight => self.straight,
            Move::Left => self.left,
            Move::Right => self.right,
        }
    }

    fn validate(&self, what: &str) -> Result<(), TrackGenError> {
        for (name, w) in [("straight", self.straight), ("left", self.left), ("right", self.right)] {
            if !w.is_finite() || w < 0.0 {
                return Err(TrackGenError::configuration(format!(
                    "{what} {name} weight must be a non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Move weights that apply for a stretch of the track.
///
/// A segment stays active until the number of placed parts reaches both the
/// summed `raw_duration` of it and every earlier segment, and
/// `percent_duration` of the target length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWeightSegment {
    /// Minimum parts placed under this segment, counted cumulatively.
    pub raw_duration: u32,
    /// Fraction of the target length (0.0 to 1.0).
    pub percent_duration: f32,
    pub weights: MoveWeights,
}

/// One desirability metric: how much it matters and what value to aim for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricTarget {
    /// Share of the final score.
    pub weight: f32,
    /// Exponent applied to the closeness ratio. Larger values punish misses
    /// harder; 0 ignores distance entirely.
    pub penalty: f32,
    /// Lower bound of the target draw (inclusive).
    pub target_min: u32,
    /// Upper bound of the target draw (exclusive unless equal to `target_min`).
    pub target_max: u32,
}

/// Desirability targets for the three scored metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesirabilitySettings {
    /// Parts placed between start and end.
    pub length: MetricTarget,
    pub diagonals: MetricTarget,
    pub tight_180s: MetricTarget,
}

/// Longest chain with a smoothed segment in `NodeType::smoothed`.
pub const MAX_SMOOTHED_CHAIN: u32 = 7;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagonalSettings {
    /// Replace alternating-turn wiggles with diagonal segments.
    pub smoothing: bool,
    /// Longest odd chain that is recorded for smoothing.
    pub max_chain: u32,
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// Immutable generation parameters for one track layout.
///
/// Presets:
/// - `compact_loop()`: small looping circuit, the default
/// - `winding_sprint()`: point-to-point track that favors turns
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackTemplate {
    pub columns: u32,
    pub rows: u32,
    pub depth: u32,
    /// Optional existence mask. Absent slots act like out-of-bounds space.
    pub mask: Option<CellMask>,
    /// 1-based start coordinate.
    pub start: [i32; 3],
    /// 1-based finish coordinate, or `[0, 0, 0]` for a looping track.
    pub finish: [i32; 3],
    /// Preferred start facing in degrees; corrected in 90-degree steps if blocked.
    pub start_rotation: f32,
    pub finish_rotation: f32,
    /// Cap on completed attempts collected for scoring.
    pub generation_attempts: u32,
    /// Cap on failed attempts before giving up.
    pub failure_threshold: u32,
    /// Stop as soon as one attempt completes instead of filling the cap.
    pub stop_at_first_completion: bool,
    /// Tickets handed out per weighted draw (2 to 100).
    pub weight_granularity: u32,
    pub weights: MoveWeights,
    pub adaptive_weight_segments: Vec<AdaptiveWeightSegment>,
    pub desirability: DesirabilitySettings,
    pub diagonal: DiagonalSettings,
}

impl TrackTemplate {
    /// Compact looping circuit: the default preset. A 6x6 single-layer grid
    /// with a short straight run out of the start line.
    pub fn compact_loop() -> Self {
        Self {
            columns: 6,
            rows: 6,
            depth: 1,
            mask: None,
            start: [2, 2, 1],
            finish: [0, 0, 0],
            start_rotation: 0.0,
            finish_rotation: 0.0,
            generation_attempts: 20,
            failure_threshold: 50,
            stop_at_first_completion: false,
            weight_granularity: 10,
            weights: MoveWeights {
                straight: 0.6,
                left: 0.5,
                right: 0.5,
            },
            adaptive_weight_segments: vec![AdaptiveWeightSegment {
                raw_duration: 2,
                percent_duration: 0.1,
                weights: MoveWeights {
                    straight: 1.0,
                    left: 0.1,
                    right: 0.1,
                },
            }],
            desirability: DesirabilitySettings {
                length: MetricTarget {
                    weight: 1.0,
                    penalty: 0.5,
                    target_min: 14,
                    target_max: 22,
                },
                diagonals: MetricTarget {
                    weight: 0.5,
                    penalty: 0.5,
                    target_min: 1,
                    target_max: 3,
                },
                tight_180s: MetricTarget {
                    weight: 0.25,
                    penalty: 0.5,
                    target_min: 0,
                    target_max: 2,
                },
            },
            diagonal: DiagonalSettings {
                smoothing: true,
                max_chain: 7,
            },
        }
    }

    /// Winding sprint: a point-to-point track across a wide grid, tuned for
    /// long lengths and many turns.
    pub fn winding_sprint() -> Self {
        Self {
            columns: 10,
            rows: 6,
            depth: 1,
            mask: None,
            start: [1, 1, 1],
            finish: [10, 6, 1],
            start_rotation: 270.0,
            finish_rotation: 270.0,
            generation_attempts: 30,
            failure_threshold: 80,
            stop_at_first_completion: false,
            weight_granularity: 20,
            weights: MoveWeights {
                straight: 0.3,
                left: 0.6,
                right: 0.6,
            },
            adaptive_weight_segments: vec![
                AdaptiveWeightSegment {
                    raw_duration: 3,
                    percent_duration: 0.1,
                    weights: MoveWeights {
                        straight: 1.0,
                        left: 0.2,
                        right: 0.2,
                    },
                },
                AdaptiveWeightSegment {
                    raw_duration: 10,
                    percent_duration: 0.6,
                    weights: MoveWeights {
                        straight: 0.2,
                        left: 0.8,
                        right: 0.8,
                    },
                },
            ],
            desirability: DesirabilitySettings {
                length: MetricTarget {
                    weight: 1.0,
                    penalty: 0.6,
                    target_min: 30,
                    target_max: 45,
                },
                diagonals: MetricTarget {
                    weight: 0.6,
                    penalty: 0.4,
                    target_min: 2,
                    target_max: 5,
                },
                tight_180s: MetricTarget {
                    weight: 0.4,
                    penalty: 0.4,
                    target_min: 1,
                    target_max: 4,
                },
            },
            diagonal: DiagonalSettings {
                smoothing: true,
                max_chain: 7,
            },
        }
    }

    /// Parse and validate a template from JSON. Every field except `mask` is
    /// required.
    pub fn from_json(json: &str) -> Result<Self, TrackGenError> {
        let template: TrackTemplate = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    /// Whether the finish is left unset, which selects a looping track.
    pub fn is_looping(&self) -> bool {
        self.finish == [0, 0, 0]
    }

    /// 0-based start coordinate.
    pub fn start_coord(&self) -> Result<GridCoord, TrackGenError> {
        GridCoord::from_template(self.start).ok_or_else(|| {
            TrackGenError::configuration(format!(
                "start {:?} must have every coordinate set (1-based)",
                self.start
            ))
        })
    }

    /// 0-based finish coordinate, or `None` for a looping track.
    pub fn finish_coord(&self) -> Result<Option<GridCoord>, TrackGenError> {
        if self.is_looping() {
            return Ok(None);
        }
        GridCoord::from_template(self.finish).map(Some).ok_or_else(|| {
            TrackGenError::configuration(format!(
                "finish {:?} is partially unset; use [0, 0, 0] for a loop",
                self.finish
            ))
        })
    }

    fn check_in_bounds(&self, what: &str, coord: GridCoord) -> Result<(), TrackGenError> {
        let inside = (coord.x as u32) < self.columns
            && (coord.y as u32) < self.rows
            && (coord.z as u32) < self.depth;
        if !inside {
            return Err(TrackGenError::configuration(format!(
                "{what} {coord} lies outside the {}x{}x{} grid",
                self.columns, self.rows, self.depth
            )));
        }
        if self.mask.as_ref().is_some_and(|mask| !mask.contains(coord)) {
            return Err(TrackGenError::configuration(format!(
                "{what} {coord} is masked out"
            )));
        }
        Ok(())
    }

    /// Check every constraint the generator relies on.
    pub fn validate(&self) -> Result<(), TrackGenError> {
        if self.columns == 0 || self.rows == 0 || self.depth == 0 {
            return Err(TrackGenError::configuration(format!(
                "grid extents must be non-zero, got {}x{}x{}",
                self.columns, self.rows, self.depth
            )));
        }
        if let Some(mask) = &self.mask {
            let expected = self.columns as usize * self.rows as usize * self.depth as usize;
            if (mask.columns, mask.rows, mask.depth) != (self.columns, self.rows, self.depth)
                || mask.present.len() != expected
            {
                return Err(TrackGenError::configuration(format!(
                    "mask extents {}x{}x{} do not match the grid",
                    mask.columns, mask.rows, mask.depth
                )));
            }
        }

        let start = self.start_coord()?;
        self.check_in_bounds("start", start)?;
        if let Some(finish) = self.finish_coord()? {
            self.check_in_bounds("finish", finish)?;
            if finish == start {
                return Err(TrackGenError::configuration(
                    "start and finish share a cell; leave finish unset for a loop",
                ));
            }
        }

        for (what, degrees) in [("start", self.start_rotation), ("finish", self.finish_rotation)] {
            if Heading::from_degrees(degrees).is_none() {
                return Err(TrackGenError::configuration(format!(
                    "{what} rotation {degrees} is not a multiple of 90 degrees"
                )));
            }
        }

        if self.generation_attempts == 0 || self.failure_threshold == 0 {
            return Err(TrackGenError::configuration(
                "generation_attempts and failure_threshold must both be positive",
            ));
        }
        if !(2..=100).contains(&self.weight_granularity) {
            return Err(TrackGenError::configuration(format!(
                "weight_granularity must be within 2..=100, got {}",
                self.weight_granularity
            )));
        }

        self.weights.validate("base")?;
        for (i, segment) in self.adaptive_weight_segments.iter().enumerate() {
            segment.weights.validate(&format!("segment {i}"))?;
            if !(0.0..=1.0).contains(&segment.percent_duration) {
                return Err(TrackGenError::configuration(format!(
                    "segment {i} percent_duration must be within 0..=1, got {}",
                    segment.percent_duration
                )));
            }
        }

        let d = &self.desirability;
        let mut weight_sum = 0.0;
        for (name, metric) in [
            ("length", &d.length),
            ("diagonals", &d.diagonals),
            ("tight_180s", &d.tight_180s),
        ] {
            if !metric.weight.is_finite() || metric.weight < 0.0 {
                return Err(TrackGenError::configuration(format!(
                    "{name} weight must be non-negative, got {}",
                    metric.weight
                )));
            }
            if !(0.0..=1.0).contains(&metric.penalty) {
                return Err(TrackGenError::configuration(format!(
                    "{name} penalty must be within 0..=1, got {}",
                    metric.penalty
                )));
            }
            if metric.target_min > metric.target_max {
                return Err(TrackGenError::configuration(format!(
                    "{name} target_min {} exceeds target_max {}",
                    metric.target_min, metric.target_max
                )));
            }
            weight_sum += metric.weight;
        }
        if weight_sum <= 0.0 {
            return Err(TrackGenError::configuration(
                "at least one desirability weight must be positive",
            ));
        }
        if self.diagonal.smoothing && self.diagonal.max_chain > MAX_SMOOTHED_CHAIN {
            return Err(TrackGenError::configuration(format!(
                "diagonal max_chain must be at most {MAX_SMOOTHED_CHAIN} with smoothing on, got {}",
                self.diagonal.max_chain
            )));
        }
        Ok(())
    }
}

impl Default for TrackTemplate {
    fn default() -> Self {
        Self::compact_loop()
    }
}
