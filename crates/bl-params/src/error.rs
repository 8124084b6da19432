//! Error types for parameter handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParamError {
    #[error("Unsupported chemistry: {name}")]
    UnsupportedChemistry { name: String },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error("Parameter {quantity} does not apply to {set}")]
    NotApplicable {
        quantity: &'static str,
        set: &'static str,
    },
}

pub type ParamResult<T> = Result<T, ParamError>;

impl From<bl_core::BlError> for ParamError {
    fn from(e: bl_core::BlError) -> Self {
        ParamError::InvalidParameter {
            what: e.to_string(),
        }
    }
}
