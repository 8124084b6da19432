//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while building or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Invalid experiment: {what}")]
    InvalidExperiment { what: String },

    #[error("Invalid rate {rate}: {what}")]
    InvalidRate { rate: f64, what: &'static str },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Maximum number of internal steps ({max_steps}) exceeded")]
    MaxStepsExceeded { max_steps: usize },

    #[error("Simulation timed out after {elapsed_s:.1} s")]
    Timeout { elapsed_s: f64 },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Parameter error: {0}")]
    Params(#[from] bl_params::ParamError),
}

impl SimError {
    /// Timeouts are worth retrying; everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SimError::Timeout { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;

impl From<bl_core::BlError> for SimError {
    fn from(e: bl_core::BlError) -> Self {
        SimError::NonPhysical {
            what: e.to_string(),
        }
    }
}
