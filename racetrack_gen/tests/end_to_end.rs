// End-to-end scenarios through the public API: open and looping generation
// runs, hand-laid diagonal chains, and sequential/parallel agreement.

use racetrack_gen::config::{MoveWeights, TrackTemplate};
use racetrack_gen::flow::lay_path;
use racetrack_gen::generator::{GeneratedTrack, generate, generate_parallel};
use racetrack_gen::grid::TrackGrid;
use racetrack_gen::postprocess::{detect_diagonals, smooth_diagonals, walk_timeline};
use racetrack_gen::types::{GridCoord, Heading, Move, NodeType};

fn open_5x5() -> TrackTemplate {
    let mut t = TrackTemplate::compact_loop();
    t.columns = 5;
    t.rows = 5;
    t.depth = 1;
    t.start = [1, 1, 1];
    t.finish = [5, 5, 1];
    t.start_rotation = 0.0;
    t.finish_rotation = 0.0;
    t.generation_attempts = 20;
    t.failure_threshold = 50;
    t.weights = MoveWeights {
        straight: 1.0,
        left: 1.0,
        right: 1.0,
    };
    t.adaptive_weight_segments.clear();
    t
}

/// Every placed, non-ignored cell of the grid appears exactly once in the
/// segment list, and consecutive segments are linked.
fn assert_single_path(track: &GeneratedTrack) {
    let placed = track
        .grid
        .cells()
        .filter(|c| !c.is_blank() && !c.ignored)
        .count();
    assert_eq!(placed, track.segments.len());
    for pair in track.segments.windows(2) {
        let cell = track.grid.get(pair[0].position).unwrap();
        assert_eq!(cell.outflow, Some(pair[1].position));
    }
    let walked = walk_timeline(&track.grid, track.segments[0].position);
    assert_eq!(walked.len(), track.segments.len());
}

#[test]
fn open_track_connects_start_to_finish() {
    let template = open_5x5();
    for seed in [0, 1, 2, 99, 12345] {
        let track = generate(&template, seed).unwrap();
        assert!(!track.looping);
        assert!(track.stats.length >= 5);

        let first = track.segments[0];
        assert_eq!(first.node_type, NodeType::Start);
        assert_eq!(first.position, GridCoord::new(0, 0, 0));
        let last = track.segments.last().unwrap();
        assert_eq!(last.node_type, NodeType::Finish);
        assert_eq!(last.position, GridCoord::new(4, 4, 0));
        assert_eq!(track.grid.get(last.position).unwrap().outflow, None);

        assert_single_path(&track);
    }
}

#[test]
fn open_track_is_reproducible() {
    let template = open_5x5();
    let a = generate(&template, 2024).unwrap();
    let b = generate(&template, 2024).unwrap();
    assert_eq!(a.segments, b.segments);
    assert_eq!(a.stats.targets, b.stats.targets);
    assert_eq!(a.stats.attempts_completed, b.stats.attempts_completed);
    assert_eq!(a.stats.attempts_failed, b.stats.attempts_failed);
}

#[test]
fn zero_finish_generates_a_loop() {
    let mut template = open_5x5();
    template.start = [2, 2, 1];
    template.finish = [0, 0, 0];
    assert!(template.is_looping());
    for seed in [3, 4, 5] {
        let track = generate(&template, seed).unwrap();
        assert!(track.looping);
        assert!(track.finish().is_none());
        let start = track.segments[0].position;
        let last = track.segments.last().unwrap().position;
        assert_eq!(track.grid.get(last).unwrap().outflow, Some(start));
        assert_eq!(track.grid.get(start).unwrap().inflow, Some(last));
        assert_single_path(&track);
    }
}

#[test]
fn chain_of_three_is_smoothed() {
    let mut grid = TrackGrid::new(5, 5, 1, None);
    let timeline = lay_path(
        &mut grid,
        GridCoord::new(3, 0, 0),
        Heading::North,
        &[Move::Left, Move::Right, Move::Left, Move::Straight],
    )
    .unwrap();
    let report = detect_diagonals(&mut grid, &timeline, 7);
    assert_eq!(report.total, 3);
    assert_eq!(report.heads.len(), 1);

    let rebuilt = smooth_diagonals(&mut grid, timeline[0], &timeline, &report.heads).unwrap();
    let head = grid.get(report.heads[0]).unwrap();
    assert_eq!(head.node_type, NodeType::TurnLeftWide);
    // Start, head, the cell after the chain, and the finish.
    assert_eq!(rebuilt.len(), 4);
    assert_eq!(walk_timeline(&grid, timeline[0]), rebuilt);
    assert_eq!(
        grid.get(*rebuilt.last().unwrap()).unwrap().node_type,
        NodeType::Finish
    );
}

#[test]
fn chain_of_four_is_counted_but_not_smoothed() {
    let mut grid = TrackGrid::new(5, 5, 1, None);
    let timeline = lay_path(
        &mut grid,
        GridCoord::new(4, 0, 0),
        Heading::North,
        &[Move::Left, Move::Right, Move::Left, Move::Right, Move::Straight],
    )
    .unwrap();
    let report = detect_diagonals(&mut grid, &timeline, 7);
    assert_eq!(report.total, 1);
    assert!(report.heads.is_empty());

    let rebuilt = smooth_diagonals(&mut grid, timeline[0], &timeline, &report.heads).unwrap();
    assert_eq!(rebuilt, timeline);
    for pos in &timeline {
        let cell = grid.get(*pos).unwrap();
        assert_eq!(cell.diagonal_chain, 0);
        assert!(!cell.ignored);
        assert!(matches!(
            cell.node_type,
            NodeType::Start
                | NodeType::Finish
                | NodeType::Straight
                | NodeType::TurnLeft
                | NodeType::TurnRight
        ));
    }
}

#[test]
fn smoothed_generation_keeps_a_single_path() {
    let template = TrackTemplate::compact_loop();
    assert!(template.diagonal.smoothing);
    for seed in 0..10 {
        let track = generate(&template, seed).unwrap();
        assert_single_path(&track);
        assert!(track.segments.iter().all(|s| s.node_type != NodeType::Blank));
    }
}

#[test]
fn parallel_generation_matches_sequential() {
    let template = TrackTemplate::winding_sprint();
    let sequential = generate(&template, 77).unwrap();
    let parallel = generate_parallel(&template, 77, 6).unwrap();
    assert_eq!(parallel.segments, sequential.segments);
    assert_eq!(parallel.stats.score, sequential.stats.score);
}

#[test]
fn template_json_drives_generation() {
    let json = serde_json::to_string(&open_5x5()).unwrap();
    let template = TrackTemplate::from_json(&json).unwrap();
    let track = generate(&template, 8).unwrap();
    assert_eq!(track.segments, generate(&open_5x5(), 8).unwrap().segments);
}
