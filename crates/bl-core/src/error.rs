//! Errors raised by the numeric helpers.

use thiserror::Error;

pub type BlResult<T> = Result<T, BlError>;

#[derive(Error, Debug)]
pub enum BlError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
