//! Error types for the bl-app service layer.

use bl_params::ParamError;
use bl_results::ResultsError;
use bl_sim::SimError;

/// Application error type shared by the HTTP server and the CLI.
///
/// Backend errors are folded into the few classes a caller can act on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unsupported chemistry: {name}")]
    UnsupportedChemistry { name: String },

    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    SolverFailure(String),

    #[error("Simulation timed out after {elapsed_s:.1} s")]
    SolverTimeout { elapsed_s: f64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for bl-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Only timeouts may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::SolverTimeout { .. })
    }
}

impl From<ParamError> for AppError {
    fn from(err: ParamError) -> Self {
        match err {
            ParamError::UnsupportedChemistry { name } => AppError::UnsupportedChemistry { name },
            other => AppError::InvalidParameter(other.to_string()),
        }
    }
}

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::Timeout { elapsed_s } => AppError::SolverTimeout { elapsed_s },
            SimError::Params(p) => p.into(),
            e @ (SimError::InvalidArg { .. }
            | SimError::InvalidExperiment { .. }
            | SimError::InvalidRate { .. }
            | SimError::UnknownVariable { .. }) => AppError::InvalidInput(e.to_string()),
            e @ (SimError::NonPhysical { .. }
            | SimError::ConvergenceFailed { .. }
            | SimError::MaxStepsExceeded { .. }) => AppError::SolverFailure(e.to_string()),
        }
    }
}

impl From<ResultsError> for AppError {
    fn from(err: ResultsError) -> Self {
        match err {
            ResultsError::Sim(e) => e.into(),
            other => AppError::SolverFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}
