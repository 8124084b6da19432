//! Engine boundary and the reference engine.
//!
//! A [`BatteryEngine`] turns a parameter set, a model choice and a drive
//! (an experiment or a constant current) into a [`Solution`]. Engines are
//! stateless and shared across requests; each solve owns its model.

use std::fmt;

use bl_core::Deadline;
use bl_params::ParameterSet;
use nalgebra::DVector;
use serde::Serialize;
use tracing::{debug, trace};

use crate::cell::{CellModel, Control};
use crate::error::{SimError, SimResult};
use crate::events::{EventSet, Location, locate};
use crate::experiment::{Experiment, Operation, Step};
use crate::model::TransientModel;
use crate::runner::{SolverMode, SolverOptions};
use crate::solution::{CycleSummary, Sample, Solution, StopReason};

/// Default reporting period of experiment steps [s].
pub const DEFAULT_PERIOD_S: f64 = 60.0;

/// Reporting times closer than this are the same time [s].
const TIME_EPS_S: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    /// Single particle model
    Spm,
    /// Single particle model with electrolyte
    Spme,
    /// Doyle-Fuller-Newman
    Dfn,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Spm => "SPM",
            ModelKind::Spme => "SPMe",
            ModelKind::Dfn => "DFN",
        })
    }
}

/// Model family plus options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    /// Particle phases in the (negative, positive) electrode
    pub particle_phases: (usize, usize),
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            particle_phases: (1, 1),
        }
    }

    pub fn spm() -> Self {
        Self::new(ModelKind::Spm)
    }

    pub fn spme() -> Self {
        Self::new(ModelKind::Spme)
    }

    pub fn dfn() -> Self {
        Self::new(ModelKind::Dfn)
    }

    pub fn with_particle_phases(mut self, negative: usize, positive: usize) -> Self {
        self.particle_phases = (negative, positive);
        self
    }
}

/// What the cell is put through.
#[derive(Clone, Debug, PartialEq)]
pub enum Drive {
    Experiment(Experiment),
    /// Fixed current (positive = discharge) reported at `t_eval`; stops at
    /// the parameter set's voltage limits.
    ConstantCurrent { current_a: f64, t_eval: Vec<f64> },
}

pub trait BatteryEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Folded into run ids so results from different engines never collide.
    fn version(&self) -> &'static str;

    fn solve(
        &self,
        params: &ParameterSet,
        spec: ModelSpec,
        drive: &Drive,
        initial_soc: f64,
        options: &SolverOptions,
    ) -> SimResult<Solution>;
}

/// Reduced-order lumped cell model integrated with fixed-step RK4 and
/// event location.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceEngine;

impl BatteryEngine for ReferenceEngine {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn version(&self) -> &'static str {
        concat!("reference-", env!("CARGO_PKG_VERSION"))
    }

    fn solve(
        &self,
        params: &ParameterSet,
        spec: ModelSpec,
        drive: &Drive,
        initial_soc: f64,
        options: &SolverOptions,
    ) -> SimResult<Solution> {
        options.validate()?;
        let model = CellModel::new(params.clone(), spec, initial_soc)?;
        let run = Run::new(model, options);
        match drive {
            Drive::Experiment(experiment) => run.experiment(experiment),
            Drive::ConstantCurrent { current_a, t_eval } => {
                run.constant_current(*current_a, t_eval)
            }
        }
    }
}

/// State of one solve.
struct Run<'a> {
    model: CellModel,
    options: &'a SolverOptions,
    deadline: Deadline,
    location: Location,
    t: f64,
    x: DVector<f64>,
    steps: usize,
    samples: Vec<Sample>,
}

impl<'a> Run<'a> {
    fn new(model: CellModel, options: &'a SolverOptions) -> Self {
        let x = model.initial_state();
        Self {
            location: match options.mode {
                SolverMode::Fast => Location::Interpolate,
                SolverMode::Safe => Location::Bisect,
            },
            deadline: Deadline::after(options.timeout),
            model,
            options,
            t: 0.0,
            x,
            steps: 0,
            samples: Vec::new(),
        }
    }

    fn tick(&mut self) -> SimResult<()> {
        self.steps += 1;
        if self.steps > self.options.max_steps {
            return Err(SimError::MaxStepsExceeded {
                max_steps: self.options.max_steps,
            });
        }
        if self.deadline.expired() {
            return Err(SimError::Timeout {
                elapsed_s: self.deadline.elapsed_s(),
            });
        }
        Ok(())
    }

    fn record(&mut self) {
        self.samples.push(self.model.sample(self.t, &self.x));
    }

    fn check_finite(&self, x: &DVector<f64>) -> SimResult<()> {
        if x.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(SimError::ConvergenceFailed {
                what: format!("non-finite state at t = {:.1} s", self.t),
            })
        }
    }

    /// Integrate through `report_times`, recording at each one, until the
    /// last is reached or an event fires.
    fn advance(&mut self, events: &EventSet, report_times: &[f64]) -> SimResult<Option<StopReason>> {
        let dt_max = self
            .options
            .dt_max_s
            .min(self.model.params().diffusion_time_constant_s * 0.5);
        let integrator = self.options.integrator;
        for &t_report in report_times {
            while self.t < t_report - TIME_EPS_S {
                self.tick()?;
                let dt = (t_report - self.t).min(dt_max);
                let x1 = integrator.step(&mut self.model, self.t, &self.x, dt)?;
                self.check_finite(&x1)?;
                if let Some(reason) = events.triggered(&self.model, &x1) {
                    let hit = locate(
                        events,
                        self.location,
                        integrator,
                        &mut self.model,
                        self.t,
                        &self.x,
                        x1,
                        dt,
                        reason,
                    )?;
                    self.check_finite(&hit.x)?;
                    self.t += hit.dt;
                    self.x = hit.x;
                    self.record();
                    return Ok(Some(hit.reason));
                }
                self.t += dt;
                self.x = x1;
            }
            self.t = t_report;
            self.record();
        }
        Ok(None)
    }

    fn run_step(&mut self, step: &Step) -> SimResult<StopReason> {
        let nominal = self.model.params().nominal_capacity_ah;
        let control = match step.operation {
            Operation::Charge(rate) => Control::Current(-rate.current_a(nominal)),
            Operation::Discharge(rate) => Control::Current(rate.current_a(nominal)),
            Operation::Hold { voltage_v } => Control::Voltage(voltage_v),
            Operation::Rest => Control::Current(0.0),
        };
        self.model.set_control(control);
        let events = EventSet::for_step(step, &self.model);

        self.record();
        if let Some(reason) = events.triggered(&self.model, &self.x) {
            return Ok(reason);
        }

        let period = step.period_s.unwrap_or(DEFAULT_PERIOD_S);
        let t0 = self.t;
        let t_end = t0 + step.max_duration_s();
        let mut report_times = Vec::new();
        let mut k = 1.0;
        while t0 + k * period < t_end - TIME_EPS_S {
            report_times.push(t0 + k * period);
            k += 1.0;
        }
        report_times.push(t_end);

        Ok(self
            .advance(&events, &report_times)?
            .unwrap_or(StopReason::Duration))
    }

    fn experiment(mut self, experiment: &Experiment) -> SimResult<Solution> {
        let mut bounds = Vec::with_capacity(experiment.n_cycles());
        let mut summary = Vec::with_capacity(experiment.n_cycles());
        let mut first_negative_ah = None;
        let mut termination = StopReason::Duration;

        for (index, cycle) in experiment.cycles.iter().enumerate() {
            let start = self.samples.len();
            for step in cycle {
                termination = self.run_step(step)?;
                trace!(cycle = index + 1, %step, %termination, t_s = self.t, "step finished");
            }
            bounds.push(start..self.samples.len());

            let negative_ah = self.model.negative_capacity_ah(&self.x);
            let reference = *first_negative_ah.get_or_insert(negative_ah);
            summary.push(CycleSummary {
                cycle_number: index + 1,
                capacity_ah: self.model.remaining_capacity_ah(&self.x),
                sei_loss_ah: self.x[crate::cell::SEI_LOSS],
                negative_capacity_change_ah: negative_ah - reference,
            });
        }

        debug!(
            model = %self.model.kind(),
            cycles = experiment.n_cycles(),
            samples = self.samples.len(),
            steps = self.steps,
            elapsed_s = self.deadline.elapsed_s(),
            "experiment solved"
        );
        Ok(Solution::new(self.samples, bounds, summary, termination))
    }

    fn constant_current(mut self, current_a: f64, t_eval: &[f64]) -> SimResult<Solution> {
        if !current_a.is_finite() {
            return Err(SimError::InvalidArg {
                what: format!("current must be finite, got {current_a}"),
            });
        }
        let Some((&first, rest)) = t_eval.split_first() else {
            return Err(SimError::InvalidArg {
                what: "t_eval must not be empty".to_string(),
            });
        };
        if first < 0.0 || t_eval.windows(2).any(|w| !(w[1] >= w[0])) {
            return Err(SimError::InvalidArg {
                what: "t_eval must be non-negative and non-decreasing".to_string(),
            });
        }

        self.model.set_control(Control::Current(current_a));
        let events = EventSet::for_current(current_a, &self.model);

        let mut termination = StopReason::FinalTime;
        if let Some(reason) = events.triggered(&self.model, &self.x) {
            self.record();
            termination = reason;
        } else if let Some(reason) = self.advance(&events, &[first])? {
            termination = reason;
        } else if let Some(reason) = self.advance(&events, rest)? {
            termination = reason;
        }

        debug!(
            model = %self.model.kind(),
            current_a,
            samples = self.samples.len(),
            %termination,
            "constant-current run solved"
        );
        Ok(Solution::new(self.samples, Vec::new(), Vec::new(), termination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{Mode, single_step};
    use bl_params::Chemistry;

    fn fast() -> SolverOptions {
        SolverOptions::fast(1000.0)
    }

    #[test]
    fn discharge_ends_at_cutoff() {
        let params = Chemistry::LgM50.base_parameters();
        let drive = Drive::Experiment(single_step(Mode::Discharge, 1.0, 3.0 * 3600.0, 3.0).unwrap());
        let sol = ReferenceEngine
            .solve(&params, ModelSpec::spm(), &drive, 1.0, &fast())
            .unwrap();
        let v = sol.get("Voltage [V]").unwrap();
        assert!((v.last().unwrap() - 3.0).abs() < 0.05);
        assert_eq!(sol.termination(), StopReason::VoltageCutoff);
        let t = sol.get("Time [s]").unwrap();
        assert!(t.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn rest_runs_for_its_duration() {
        let params = Chemistry::Nca.base_parameters();
        let e = Experiment::from_instructions(&["Rest for 10 minutes (30 seconds period)"]).unwrap();
        let sol = ReferenceEngine
            .solve(&params, ModelSpec::spme(), &Drive::Experiment(e), 0.5, &fast())
            .unwrap();
        let t = sol.get("Time [s]").unwrap();
        // start sample plus one every 30 s
        assert_eq!(t.len(), 21);
        assert_eq!(*t.last().unwrap(), 600.0);
        assert_eq!(sol.termination(), StopReason::Duration);
    }

    #[test]
    fn hold_ends_on_current_threshold() {
        let params = Chemistry::Nmc.base_parameters();
        let e = Experiment::from_instructions(&[
            "Charge at 1C until 4.0 V",
            "Hold at 4.0 V until C/10",
        ])
        .unwrap();
        for options in [SolverOptions::fast(1000.0), SolverOptions::safe(1000.0)] {
            let sol = ReferenceEngine
                .solve(&params, ModelSpec::spm(), &Drive::Experiment(e.clone()), 0.0, &options)
                .unwrap();
            assert_eq!(sol.termination(), StopReason::CurrentCutoff);
            let i = sol.get("Current [A]").unwrap();
            let last = i.last().unwrap().abs();
            assert!((last - 0.5).abs() < 0.05, "final hold current {last}");
        }
    }

    #[test]
    fn constant_current_reports_on_t_eval() {
        let params = Chemistry::LgM50.base_parameters();
        let drive = Drive::ConstantCurrent {
            current_a: 5.0,
            t_eval: bl_core::linspace(0.0, 600.0, 11),
        };
        let sol = ReferenceEngine
            .solve(&params, ModelSpec::dfn(), &drive, 1.0, &fast())
            .unwrap();
        assert_eq!(sol.get("Time [s]").unwrap(), bl_core::linspace(0.0, 600.0, 11));
        assert_eq!(sol.n_cycles(), 0);
        assert_eq!(sol.termination(), StopReason::FinalTime);
    }

    #[test]
    fn constant_current_stops_at_voltage_limit() {
        let params = Chemistry::LgM50.base_parameters();
        let drive = Drive::ConstantCurrent {
            current_a: 10.0,
            t_eval: bl_core::linspace(0.0, 10_000.0, 1000),
        };
        let sol = ReferenceEngine
            .solve(&params, ModelSpec::spm(), &drive, 1.0, &SolverOptions::safe(500.0))
            .unwrap();
        assert_eq!(sol.termination(), StopReason::MinimumVoltage);
        assert!(*sol.get("Time [s]").unwrap().last().unwrap() < 10_000.0);
    }

    #[test]
    fn max_steps_is_enforced() {
        let params = Chemistry::Lfp.base_parameters();
        let e = Experiment::from_instructions(&["Rest for 1 hour"]).unwrap();
        let options = SolverOptions {
            max_steps: 3,
            ..SolverOptions::fast(1000.0)
        };
        let err = ReferenceEngine
            .solve(&params, ModelSpec::spm(), &Drive::Experiment(e), 0.5, &options)
            .unwrap_err();
        assert!(matches!(err, SimError::MaxStepsExceeded { max_steps: 3 }));
    }
}
