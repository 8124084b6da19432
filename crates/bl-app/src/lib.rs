//! Shared application layer for batterylab.
//!
//! Turns lab request bodies into simulations and shaped results. The HTTP
//! server and the CLI are thin front-ends over this crate.

pub mod config;
pub mod error;
pub mod labs;
pub mod request;

pub use config::{LabSettings, ServiceConfig};
pub use error::{AppError, AppResult};
pub use labs::{
    LabContext, LabDefinition, LabId, LabRequest, SolverPreset, definitions, lab3_protocol,
    run_lab, run_lab1, run_lab2, run_lab3,
};
pub use request::{ChargingProperties, Lab1Request, Lab2Request, Lab3Request};
