//! Error type shared by the area detector and the coverage planner.

use thiserror::Error;

/// Errors that abort a planning run.
///
/// Empty results (no detected area, no candidate waypoints, nothing fits in
/// the time budget) are not errors and are reported through the result types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlannerError {
    #[error("coverage planner has no algorithm configured")]
    MissingAlgorithm,

    #[error("coverage planner has no starting point configured")]
    MissingStart,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("need at least {required} points, got {actual}")]
    NotEnoughPoints { required: usize, actual: usize },

    #[error("raster source failed: {0}")]
    RasterSource(String),

    #[error("raster source returned {actual} pixels, expected {expected}")]
    RasterShape { expected: usize, actual: usize },

    #[error("projection failed: {0}")]
    Projection(String),
}

impl PlannerError {
    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PlannerError::MissingAlgorithm
                | PlannerError::MissingStart
                | PlannerError::InvalidConfig(_)
                | PlannerError::NotEnoughPoints { .. }
        )
    }
}
