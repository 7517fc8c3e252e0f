// Move weighting for the path builder.
//
// `WeightSchedule` tracks which adaptive weight segment is active as parts are
// placed, and `draw_ticketed` turns a set of weighted viable moves into one
// pick. The draw is coarse: each move receives
// `round(weight / total * granularity)` tickets (ties to even) and one ticket
// is drawn uniformly. Weight ratios finer than `1 / granularity` are not
// honored exactly, and seeded output depends on that rounding.
//
// See also: `config.rs` for `MoveWeights` and `AdaptiveWeightSegment`,
// `flow.rs` which consults the schedule only when two or more moves are
// viable.
//
// **Critical constraint: determinism.** Every draw consumes the RNG the same
// way for the same inputs.

use crate::config::{AdaptiveWeightSegment, MoveWeights};
use crate::types::Move;
use racetrack_prng::TrackRng;

/// Active-segment tracker for one attempt.
#[derive(Clone, Debug)]
pub struct WeightSchedule {
    base: MoveWeights,
    segments: Vec<AdaptiveWeightSegment>,
    target_length: u32,
    current: usize,
}

impl WeightSchedule {
    pub fn new(base: MoveWeights, segments: Vec<AdaptiveWeightSegment>, target_length: u32) -> Self {
        Self {
            base,
            segments,
            target_length,
            current: 0,
        }
    }

    /// Index of the active segment, or `None` once every segment has ended.
    pub fn active_segment(&self) -> Option<usize> {
        (self.current < self.segments.len()).then_some(self.current)
    }

    /// Advance past finished segments and return the weights in effect after
    /// `parts_placed` parts.
    pub fn weights_at(&mut self, parts_placed: u32) -> MoveWeights {
        while let Some(segment) = self.segments.get(self.current) {
            let raw_end: u32 = self.segments[..=self.current]
                .iter()
                .map(|s| s.raw_duration)
                .sum();
            let percent_end = segment.percent_duration * self.target_length as f32;
            if parts_placed >= raw_end && parts_placed as f32 >= percent_end {
                self.current += 1;
            } else {
                break;
            }
        }
        self.segments
            .get(self.current)
            .map_or(self.base, |segment| segment.weights)
    }
}

/// Pick one of `options` by ticket draw. Returns the chosen index, or `None`
/// when `options` is empty.
///
/// Falls back to a uniform pick when the weights sum to zero or every move
/// rounds down to zero tickets.
pub fn draw_ticketed(rng: &mut TrackRng, options: &[(Move, f32)], granularity: u32) -> Option<usize> {
    if options.is_empty() {
        return None;
    }
    let total: f32 = options.iter().map(|(_, w)| w.max(0.0)).sum();
    let tickets: Vec<u32> = if total > 0.0 {
        options
            .iter()
            .map(|(_, w)| (w.max(0.0) / total * granularity as f32).round_ties_even() as u32)
            .collect()
    } else {
        vec![0; options.len()]
    };
    let ticket_total: u32 = tickets.iter().sum();
    if ticket_total == 0 {
        return Some(rng.range_usize(0, options.len()));
    }

    let mut ticket = rng.range_u32_or_low(0, ticket_total);
    for (i, count) in tickets.iter().enumerate() {
        if ticket < *count {
            return Some(i);
        }
        ticket -= count;
    }
    // Unreachable: the ticket is below the sum of counts.
    Some(options.len() - 1)
}
