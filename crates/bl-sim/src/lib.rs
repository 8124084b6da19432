//! Battery simulation: experiment descriptions, the engine boundary, a
//! reduced-order reference engine and the simulation runner.
//!
//! Provides:
//! - Instruction parsing and rendering for experiment steps
//! - `BatteryEngine` trait with fixed-step RK4 reference engine
//! - Event location (interpolation in fast mode, bisection in safe mode)
//! - Sampled solutions with per-cycle views and summary variables
//! - Parallel batch execution

pub mod cell;
pub mod engine;
pub mod error;
pub mod experiment;
pub mod integrator;
pub mod model;
pub mod runner;
pub mod solution;

mod events;

pub use cell::{CellModel, Control};
pub use engine::{BatteryEngine, DEFAULT_PERIOD_S, Drive, ModelKind, ModelSpec, ReferenceEngine};
pub use error::{SimError, SimResult};
pub use experiment::{
    CyclingProtocol, Experiment, MAX_CYCLES, Mode, Step, VirtualRateFit, clamp_cycles, cycling,
    single_step,
};
pub use integrator::{Heun, Integrator, IntegratorType, RK4};
pub use model::TransientModel;
pub use runner::{
    SimulationRequest, SolverMode, SolverOptions, initial_soc_for, run_batch, run_simulation,
};
pub use solution::{
    CycleSummary, CycleView, SUMMARY_VARIABLES, Sample, Solution, StopReason, Variable,
};
