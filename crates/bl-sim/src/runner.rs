//! Simulation runner: solver options, initial state selection and batch
//! execution.

use std::time::Duration;

use bl_core::Timer;
use bl_params::ParameterSet;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::{BatteryEngine, Drive, ModelSpec};
use crate::error::{SimError, SimResult};
use crate::integrator::IntegratorType;
use crate::solution::Solution;

/// How carefully termination events are located.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SolverMode {
    /// Linear interpolation of event margins
    Fast,
    /// Bisection on the step length
    #[default]
    Safe,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolverOptions {
    pub mode: SolverMode,
    /// Integration steps allowed per solve (event location not included)
    pub max_steps: usize,
    /// Largest integration step [s]
    pub dt_max_s: f64,
    /// Wall-clock budget per solve; `None` never expires
    pub timeout: Option<Duration>,
    pub integrator: IntegratorType,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::safe(600.0)
    }
}

impl SolverOptions {
    pub fn fast(dt_max_s: f64) -> Self {
        Self {
            mode: SolverMode::Fast,
            max_steps: 200_000,
            dt_max_s,
            timeout: None,
            integrator: IntegratorType::RK4,
        }
    }

    pub fn safe(dt_max_s: f64) -> Self {
        Self {
            mode: SolverMode::Safe,
            ..Self::fast(dt_max_s)
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.dt_max_s.is_finite() || self.dt_max_s <= 0.0 {
            return Err(SimError::InvalidArg {
                what: format!("dt_max must be positive, got {}", self.dt_max_s),
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything one solve needs. Owned, so batches can move across threads.
#[derive(Clone, Debug)]
pub struct SimulationRequest {
    pub params: ParameterSet,
    pub model: ModelSpec,
    pub drive: Drive,
    pub options: SolverOptions,
    /// Overrides [`initial_soc_for`]
    pub initial_soc: Option<f64>,
}

impl SimulationRequest {
    pub fn new(params: ParameterSet, model: ModelSpec, drive: Drive, options: SolverOptions) -> Self {
        Self {
            params,
            model,
            drive,
            options,
            initial_soc: None,
        }
    }
}

/// Empty before a charge, full before a discharge, the parameter set's
/// own value otherwise.
pub fn initial_soc_for(drive: &Drive, params: &ParameterSet) -> f64 {
    match drive {
        Drive::Experiment(e) => match e.first_step() {
            Some(step) if step.is_charge() => 0.0,
            Some(step) if step.is_discharge() => 1.0,
            _ => params.initial_soc,
        },
        Drive::ConstantCurrent { .. } => params.initial_soc,
    }
}

pub fn run_simulation(engine: &dyn BatteryEngine, request: &SimulationRequest) -> SimResult<Solution> {
    let soc = request
        .initial_soc
        .unwrap_or_else(|| initial_soc_for(&request.drive, &request.params));
    let timer = Timer::start("simulation");
    let result = engine.solve(
        &request.params,
        request.model,
        &request.drive,
        soc,
        &request.options,
    );
    let elapsed_s = timer.stop();
    match &result {
        Ok(solution) => debug!(
            engine = engine.name(),
            chemistry = %request.params.chemistry,
            model = %request.model.kind,
            initial_soc = soc,
            samples = solution.len(),
            elapsed_s,
            "simulation finished"
        ),
        Err(e) => warn!(
            engine = engine.name(),
            chemistry = %request.params.chemistry,
            elapsed_s,
            error = %e,
            "simulation failed"
        ),
    }
    result
}

/// Solve independent requests in parallel, preserving order. The first
/// failure (in request order) is returned.
pub fn run_batch(
    engine: &dyn BatteryEngine,
    requests: &[SimulationRequest],
) -> SimResult<Vec<Solution>> {
    requests
        .par_iter()
        .map(|r| run_simulation(engine, r))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
