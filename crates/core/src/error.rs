//! Error types for the feedback engine
//!
//! Setup and configuration problems are surfaced immediately as
//! [`FeedbackError`]. Per-step numerical edge cases (negative temperatures,
//! zero photon rates, degenerate source parameters) are clamped where they
//! occur and never reach this type.

use thiserror::Error;

/// Errors produced by the integrator, its physics modules and snapshot I/O.
#[derive(Error, Debug)]
pub enum FeedbackError {
    /// A grid-mutating operation ran before `setup` completed.
    #[error("Grid not initialised: call Integrator::setup first")]
    NotReady,

    /// Snapshot grid parameters disagree with the live grid.
    #[error("Grid mismatch in {field}: grid has {expected}, snapshot has {found}")]
    GridMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    /// A configuration that exists in the API but has no implementation.
    #[error("Unimplemented mode: {0}")]
    UnimplementedMode(String),

    /// A second integrator was constructed while another is still alive.
    #[error("An integrator already owns the hydro solver on this thread")]
    IntegratorAlreadyLive,

    /// Invalid user-supplied parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The solver produced cell positions that are not evenly spaced.
    #[error("Grid is not evenly spaced (cell {cell}: width {width}, expected {expected})")]
    NonUniformGrid {
        cell: usize,
        width: f64,
        expected: f64,
    },

    /// The hydro solver failed to advance.
    #[error("Hydro solver error: {0}")]
    Solver(String),

    /// Filesystem failure while saving or loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or config could not be (de)serialised.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot written by a newer format than this build understands.
    #[error("Unsupported snapshot version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeedbackError {
    /// Create a grid mismatch error.
    pub fn grid_mismatch(
        field: &'static str,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::GridMismatch {
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl From<serde_json::Error> for FeedbackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_mismatch_message() {
        let err = FeedbackError::grid_mismatch("ncells", 256, 128);
        assert_eq!(
            err.to_string(),
            "Grid mismatch in ncells: grid has 256, snapshot has 128"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FeedbackError = io.into();
        assert!(matches!(err, FeedbackError::Io(_)));
    }
}
