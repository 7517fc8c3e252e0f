// Desirability scoring for completed attempts.
//
// Each run draws one target per metric (length, diagonal count, tight-180
// count) from the template's `[target_min, target_max)` range. A completed
// attempt's distance from a target is `d = |actual - target| + 1`, its
// closeness is `1 / d` (1 on target, shrinking with distance), and the metric
// contributes `closeness ^ penalty * weight`. The score is the weighted sum
// divided by the sum of weights, so it always lies in (0, 1].
//
// See also: `config.rs` for `DesirabilitySettings`, `generator.rs` which
// scores every completed attempt and keeps the best.
//
// **Critical constraint: determinism.** Targets are drawn from the run's
// master RNG before any attempt starts.

use crate::config::{DesirabilitySettings, MetricTarget};
use racetrack_prng::TrackRng;
use serde::{Deserialize, Serialize};

/// Per-run targets drawn from the template ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesirabilityTargets {
    pub length: u32,
    pub diagonals: u32,
    pub tight_180s: u32,
}

impl DesirabilityTargets {
    /// Draw length, then diagonals, then tight 180s.
    pub fn draw(settings: &DesirabilitySettings, rng: &mut TrackRng) -> Self {
        let mut pick = |m: &MetricTarget| rng.range_u32_or_low(m.target_min, m.target_max);
        Self {
            length: pick(&settings.length),
            diagonals: pick(&settings.diagonals),
            tight_180s: pick(&settings.tight_180s),
        }
    }
}

/// Measured values of one completed attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMetrics {
    pub length: u32,
    pub diagonals: u32,
    pub tight_180s: u32,
}

/// Closeness of `actual` to `target`, raised to `penalty`. In (0, 1].
///
/// Floored at `f64::MIN_POSITIVE` so a steep penalty never collapses a far
/// miss to zero.
pub fn metric_desirability(actual: u32, target: u32, penalty: f32) -> f64 {
    let d = f64::from(actual.abs_diff(target)) + 1.0;
    (1.0 / d)
        .min(1.0)
        .powf(f64::from(penalty))
        .max(f64::MIN_POSITIVE)
}

/// Weighted desirability of `metrics` against `targets`.
pub fn score(
    settings: &DesirabilitySettings,
    targets: &DesirabilityTargets,
    metrics: &AttemptMetrics,
) -> f64 {
    let parts = [
        (&settings.length, metrics.length, targets.length),
        (&settings.diagonals, metrics.diagonals, targets.diagonals),
        (&settings.tight_180s, metrics.tight_180s, targets.tight_180s),
    ];
    let mut weighted = 0.0;
    let mut weights = 0.0;
    for (metric, actual, target) in parts {
        let w = f64::from(metric.weight);
        weighted += metric_desirability(actual, target, metric.penalty) * w;
        weights += w;
    }
    if weights > 0.0 { weighted / weights } else { 0.0 }
}

/// Index of the highest score. Ties keep the earliest.
pub fn select_best(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in scores.iter().enumerate() {
        if best.is_none_or(|(_, b)| *s > b) {
            best = Some((i, *s));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackTemplate;
    use proptest::prelude::*;

    fn metric(weight: f32, penalty: f32) -> MetricTarget {
        MetricTarget {
            weight,
            penalty,
            target_min: 0,
            target_max: 0,
        }
    }

    #[test]
    fn on_target_scores_one() {
        let settings = TrackTemplate::compact_loop().desirability;
        let targets = DesirabilityTargets {
            length: 16,
            diagonals: 2,
            tight_180s: 1,
        };
        let metrics = AttemptMetrics {
            length: 16,
            diagonals: 2,
            tight_180s: 1,
        };
        assert_eq!(score(&settings, &targets, &metrics), 1.0);
    }

    #[test]
    fn distance_lowers_the_score() {
        assert_eq!(metric_desirability(10, 10, 1.0), 1.0);
        assert_eq!(metric_desirability(13, 10, 1.0), 0.25);
        assert_eq!(metric_desirability(7, 10, 1.0), 0.25);
        assert_eq!(metric_desirability(13, 10, 0.0), 1.0);
        assert!((metric_desirability(13, 10, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn steep_penalty_stays_positive() {
        let settings = DesirabilitySettings {
            length: metric(1.0, 2000.0),
            diagonals: metric(1.0, 2000.0),
            tight_180s: metric(1.0, 2000.0),
        };
        let targets = DesirabilityTargets {
            length: 10,
            diagonals: 1,
            tight_180s: 0,
        };
        let metrics = AttemptMetrics {
            length: 11,
            diagonals: 2,
            tight_180s: 1,
        };
        let s = score(&settings, &targets, &metrics);
        assert!(s > 0.0 && s <= 1.0, "score {s}");
        assert!(metric_desirability(10_000, 0, 2000.0) > 0.0);
    }

    #[test]
    fn zero_target_is_well_defined() {
        assert_eq!(metric_desirability(0, 0, 0.7), 1.0);
        assert_eq!(metric_desirability(1, 0, 1.0), 0.5);
    }

    #[test]
    fn zero_weight_metrics_do_not_count() {
        let settings = DesirabilitySettings {
            length: metric(1.0, 1.0),
            diagonals: metric(0.0, 1.0),
            tight_180s: metric(0.0, 1.0),
        };
        let targets = DesirabilityTargets {
            length: 10,
            diagonals: 0,
            tight_180s: 0,
        };
        let metrics = AttemptMetrics {
            length: 10,
            diagonals: 40,
            tight_180s: 40,
        };
        assert_eq!(score(&settings, &targets, &metrics), 1.0);
    }

    #[test]
    fn targets_come_from_ranges() {
        let settings = TrackTemplate::winding_sprint().desirability;
        let mut rng = TrackRng::new(8);
        for _ in 0..200 {
            let t = DesirabilityTargets::draw(&settings, &mut rng);
            assert!((30..45).contains(&t.length));
            assert!((2..5).contains(&t.diagonals));
            assert!((1..4).contains(&t.tight_180s));
        }
    }

    #[test]
    fn fixed_range_yields_its_minimum() {
        let settings = DesirabilitySettings {
            length: MetricTarget {
                weight: 1.0,
                penalty: 1.0,
                target_min: 12,
                target_max: 12,
            },
            diagonals: metric(0.0, 1.0),
            tight_180s: metric(0.0, 1.0),
        };
        let t = DesirabilityTargets::draw(&settings, &mut TrackRng::new(1));
        assert_eq!(t.length, 12);
        assert_eq!(t.diagonals, 0);
    }

    #[test]
    fn select_best_keeps_first_of_ties() {
        assert_eq!(select_best(&[]), None);
        assert_eq!(select_best(&[0.2, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(select_best(&[0.5]), Some(0));
    }

    proptest! {
        #[test]
        fn score_is_within_unit_interval(
            actual in (0u32..10_000, 0u32..10_000, 0u32..10_000),
            target in (0u32..10_000, 0u32..10_000, 0u32..10_000),
            weights in (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0),
            penalties in (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0),
        ) {
            prop_assume!(weights.0 + weights.1 + weights.2 > 0.0);
            let settings = DesirabilitySettings {
                length: metric(weights.0, penalties.0),
                diagonals: metric(weights.1, penalties.1),
                tight_180s: metric(weights.2, penalties.2),
            };
            let targets = DesirabilityTargets {
                length: target.0,
                diagonals: target.1,
                tight_180s: target.2,
            };
            let metrics = AttemptMetrics {
                length: actual.0,
                diagonals: actual.1,
                tight_180s: actual.2,
            };
            let s = score(&settings, &targets, &metrics);
            prop_assert!(s > 0.0 && s <= 1.0, "score {s}");
        }
    }
}
