// Error taxonomy for track generation.
//
// Every failure a caller can observe is a `TrackGenError` value. A failed
// attempt (no viable move at any relaxation level) is not an error: it is an
// `AttemptOutcome::Failed` inside the generator loop, counted against the
// failure cap, and only surfaces as `Exhausted` if no attempt ever completes.
//
// See also: `config.rs` (`Configuration`, `Parse`), `flow.rs` (`Placement`),
// `generator.rs` (`Exhausted`), `postprocess.rs` (`UnsupportedDiagonal`),
// `assembly.rs` (`AssetMismatch`).

use crate::types::{GridCoord, NodeType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackGenError {
    /// The template is missing data or contradicts itself.
    #[error("invalid track template: {reason}")]
    Configuration { reason: String },

    /// The template JSON is ill-formed or incomplete.
    #[error("failed to parse track template: {0}")]
    Parse(#[from] serde_json::Error),

    /// No rotation of the start or finish cell has the neighbor it needs.
    #[error("cannot place {marker} at {position}: no rotation has a free connecting neighbor")]
    Placement {
        marker: NodeType,
        position: GridCoord,
    },

    /// The attempt or failure cap was reached without a completed track.
    #[error("no track completed ({completed} completed, {failed} failed attempts)")]
    Exhausted { completed: u32, failed: u32 },

    /// The track uses a segment the asset catalog cannot provide.
    #[error("asset catalog has no segment for {node_type}")]
    AssetMismatch { node_type: NodeType },

    /// A diagonal chain length with no matching segment.
    #[error("no smoothed segment exists for a diagonal chain of length {length}")]
    UnsupportedDiagonal { length: u32 },
}

impl TrackGenError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        TrackGenError::Configuration {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = TrackGenError::Placement {
            marker: NodeType::Finish,
            position: GridCoord::new(4, 4, 0),
        };
        assert_eq!(
            err.to_string(),
            "cannot place Finish1x1 at (4, 4, 0): no rotation has a free connecting neighbor"
        );
        let err = TrackGenError::AssetMismatch {
            node_type: NodeType::DiagonalLeft5,
        };
        assert!(err.to_string().contains("DiagonalLeft5"));
    }

    #[test]
    fn json_errors_convert() {
        let parse: Result<u32, _> = serde_json::from_str("{");
        let err: TrackGenError = parse.unwrap_err().into();
        assert!(matches!(err, TrackGenError::Parse(_)));
    }
}
