//! bl-results: result shaping and the JSON result model.
//!
//! Turns solver output into the block/graph structure the front-end plots:
//! per-cycle concatenation, bucket averaging, monotone downsampling and
//! charge/discharge splitting.

pub mod hash;
pub mod shape;
pub mod types;

pub use hash::{compute_run_id, short_id};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Simulation output error: {0}")]
    Sim(#[from] bl_sim::SimError),

    #[error("Length mismatch for {what}: {left} vs {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
