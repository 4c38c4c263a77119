use pmks_solver::SolverError;
use thiserror::Error;

use crate::expression::Symbol;

/// Errors from synthesis, data collection and solving.
#[derive(Debug, Clone, Error)]
pub enum SolveError {
    #[error("wrong number of input parameters: {given} inputs for a mechanism with {dof} DOF")]
    InvalidInputCount { given: usize, dof: i32 },

    #[error("wrong driver definition: Point{base} and Point{target} are both grounded")]
    InvalidDriverDefinition { base: usize, target: usize },

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("result contains failure: Point{joint}")]
    GeometricFailure { joint: usize },

    #[error("result contains failure from sketch solve")]
    FallbackSolverFailure(#[source] SolverError),

    #[error("symbol {0} does not name a joint of the mechanism")]
    UnknownSymbol(Symbol),

    #[error("no value of the expected type for {0}")]
    MissingValue(Symbol),

    #[error("cannot read mechanism expression at byte {offset}: {reason}")]
    InvalidMechanism { offset: usize, reason: String },

    #[error("expected {expected} input angles, got {given}")]
    AngleCountMismatch { expected: usize, given: usize },
}

impl From<SolverError> for SolveError {
    fn from(err: SolverError) -> Self {
        SolveError::FallbackSolverFailure(err)
    }
}
