// Error taxonomy shared by the scoring, recommendation and drafting core.

use thiserror::Error;

use crate::players::position::Position;

/// Failures raised by the analysis and drafting operations.
///
/// Everything here is surfaced to the caller. The one exception is
/// `CapExceeded`, which the drafter records per slot and then moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("player not found: {name}")]
    NotFound { name: String },

    #[error("missing column `{column}`")]
    Schema { column: String },

    #[error("metric `{metric}` has zero variance across the population")]
    DegenerateMetric { metric: String },

    #[error("no {position} candidate fits under ${remaining_cap} with ${reserve} reserved")]
    CapExceeded {
        position: Position,
        remaining_cap: u64,
        reserve: u64,
    },

    #[error(
        "roster composition unsatisfied: {forwards}F/{defense}D/{goalies}G \
         (required {required_forwards}F/{required_defense}D/{required_goalies}G)"
    )]
    CompositionUnsatisfied {
        forwards: usize,
        defense: usize,
        goalies: usize,
        required_forwards: usize,
        required_defense: usize,
        required_goalies: usize,
    },

    #[error("population is empty")]
    EmptyPopulation,

    #[error("{name} is a {actual}, expected a {expected}")]
    PositionMismatch {
        name: String,
        expected: Position,
        actual: Position,
    },

    #[error("scaling factor must be finite and positive, got {0}")]
    InvalidScalingFactor(f64),

    #[error("eigen decomposition failed: {0}")]
    Decomposition(String),
}
