// racetrack_gen: procedural racetrack flow generation on a 3D cell grid.
//
// Given a `TrackTemplate` (grid extents, start and finish markers, move
// weights, desirability targets), the engine grows a single unbranched path
// of track pieces from the start to the finish, or back around to the start
// for looping templates. Many randomized attempts are run and scored; the
// best one is post-processed (diagonal smoothing) and returned as an ordered
// list of `(node type, grid position, rotation)` segments.
//
// Module overview:
// - `types.rs`:       GridCoord, Heading, Direction, Move, NodeType.
// - `cell.rs`:        Cell record (type, rotations, flow links, post-process flags).
// - `grid.rs`:        TrackGrid arena and CellMask (custom shapes).
// - `config.rs`:      TrackTemplate and nested parameter groups, presets, JSON loading.
// - `error.rs`:       TrackGenError.
// - `weights.rs`:     Adaptive weight schedule and ticket draw.
// - `pulse.rs`:       Adjacency pulse (look-ahead reachability flood fill).
// - `flow.rs`:        Marker placement, flow targeting, single-attempt state machine.
// - `postprocess.rs`: Timeline walk, diagonal chains and smoothing, tight 180s.
// - `scoring.rs`:     Desirability targets and attempt scoring.
// - `generator.rs`:   Multi-attempt loop, GeneratedTrack output, parallel fan-out.
// - `assembly.rs`:    Asset catalog and placement sink boundary.
// - `prng`:           Re-exported from `racetrack_prng`.
//
// The crate never renders or instantiates anything itself; `assembly.rs`
// drives caller-supplied traits.
//
// **Critical constraint: determinism.** A generation run is a pure function
// of `(template, seed)`. All randomness comes from `racetrack_prng`; no
// `HashMap` iteration order, system time, or OS entropy influences output.

pub mod assembly;
pub mod cell;
pub mod config;
pub mod error;
pub mod flow;
pub mod generator;
pub mod grid;
pub mod postprocess;
pub use racetrack_prng as prng;
pub mod pulse;
pub mod scoring;
pub mod types;
pub mod weights;
