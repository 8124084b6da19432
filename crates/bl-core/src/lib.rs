//! bl-core: stable foundation for batterylab.
//!
//! Contains:
//! - units (uom SI types for override inputs, physical constants)
//! - numeric (Real, finiteness checks, grids and extrema)
//! - timing (wall-clock timers and deadlines for solver runs)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{BlError, BlResult};
pub use numeric::*;
pub use timing::{Deadline, Timer};
pub use units::*;
