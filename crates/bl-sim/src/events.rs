//! Termination events and their location inside an integration step.
//!
//! Every event is a margin `g(x)` that is positive while the step may go on
//! and reaches zero when it must stop.

use nalgebra::DVector;

use crate::cell::{CellModel, Control, SOC};
use crate::error::SimResult;
use crate::experiment::{Cutoff, Operation, Step};
use crate::integrator::IntegratorType;
use crate::solution::StopReason;

/// Bisection stops once the bracket is narrower than this [s].
const EVENT_TIME_TOL_S: f64 = 1e-3;
const MAX_BISECTIONS: usize = 60;

/// How an event is pinned down once a step overshoots it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Location {
    /// Linear interpolation of the margins, then one re-integration
    Interpolate,
    Bisect,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EventSet {
    /// Step cut-off, `(voltage, charging)`
    voltage_cutoff: Option<(f64, bool)>,
    current_cutoff_a: Option<f64>,
    lower_limit_v: Option<f64>,
    upper_limit_v: Option<f64>,
    soc_bounds: bool,
}

impl EventSet {
    /// Events of one experiment step.
    pub fn for_step(step: &Step, model: &CellModel) -> Self {
        let p = model.params();
        let nominal = p.nominal_capacity_ah;
        let mut events = EventSet {
            soc_bounds: true,
            ..Default::default()
        };
        match step.operation {
            Operation::Charge(_) => events.upper_limit_v = Some(p.upper_voltage_cutoff_v),
            Operation::Discharge(_) => events.lower_limit_v = Some(p.lower_voltage_cutoff_v),
            Operation::Hold { .. } | Operation::Rest => {}
        }
        match step.until {
            Some(Cutoff::Voltage(v)) => {
                events.voltage_cutoff = Some((v, step.is_charge()));
            }
            Some(Cutoff::CurrentC(c)) => events.current_cutoff_a = Some(c * nominal),
            Some(Cutoff::CurrentAmps(a)) => events.current_cutoff_a = Some(a),
            None => {}
        }
        events
    }

    /// Events of a constant-current run: the voltage limit in the direction
    /// of travel and the SOC bounds.
    pub fn for_current(current_a: f64, model: &CellModel) -> Self {
        let p = model.params();
        EventSet {
            lower_limit_v: (current_a > 0.0).then_some(p.lower_voltage_cutoff_v),
            upper_limit_v: (current_a < 0.0).then_some(p.upper_voltage_cutoff_v),
            soc_bounds: true,
            ..Default::default()
        }
    }

    /// Margins of all active events at `x`.
    pub fn margins(&self, model: &CellModel, x: &DVector<f64>) -> Vec<(StopReason, f64)> {
        let i = model.current(x);
        let v = model.voltage_at(x, i);
        let mut out = Vec::with_capacity(5);
        if let Some((cut, charging)) = self.voltage_cutoff {
            let g = if charging { cut - v } else { v - cut };
            out.push((StopReason::VoltageCutoff, g));
        }
        if let Some(thr) = self.current_cutoff_a
            && matches!(model.control(), Control::Voltage(_))
        {
            out.push((StopReason::CurrentCutoff, i.abs() - thr));
        }
        if let Some(lo) = self.lower_limit_v {
            out.push((StopReason::MinimumVoltage, v - lo));
        }
        if let Some(hi) = self.upper_limit_v {
            out.push((StopReason::MaximumVoltage, hi - v));
        }
        if self.soc_bounds {
            let g = if i > 0.0 {
                x[SOC]
            } else if i < 0.0 {
                1.0 - x[SOC]
            } else {
                1.0
            };
            out.push((StopReason::SocBound, g));
        }
        out
    }

    /// First triggered event at `x`, if any.
    pub fn triggered(&self, model: &CellModel, x: &DVector<f64>) -> Option<StopReason> {
        self.margins(model, x)
            .into_iter()
            .find(|(_, g)| *g <= 0.0)
            .map(|(reason, _)| reason)
    }
}

/// A located event: time into the step, state there, and which event.
pub(crate) struct Hit {
    pub dt: f64,
    pub x: DVector<f64>,
    pub reason: StopReason,
}

/// Locate the earliest event between `x0` (untriggered) and `x1 = step(x0, dt)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn locate(
    events: &EventSet,
    location: Location,
    integrator: IntegratorType,
    model: &mut CellModel,
    t: f64,
    x0: &DVector<f64>,
    x1: DVector<f64>,
    dt: f64,
    reason: StopReason,
) -> SimResult<Hit> {
    match location {
        Location::Interpolate => {
            let g0 = events.margins(model, x0);
            let g1 = events.margins(model, &x1);
            let mut best: Option<(f64, StopReason)> = None;
            for ((r, a), (_, b)) in g0.iter().zip(g1.iter()) {
                if *b <= 0.0 && *a > 0.0 {
                    let theta = a / (a - b);
                    if best.is_none_or(|(t_best, _)| theta < t_best) {
                        best = Some((theta, *r));
                    }
                }
            }
            let Some((theta, reason)) = best else {
                return Ok(Hit { dt, x: x1, reason });
            };
            let dt_hit = (theta * dt).clamp(0.0, dt);
            let x_hit = integrator.step(model, t, x0, dt_hit)?;
            Ok(Hit {
                dt: dt_hit,
                x: x_hit,
                reason,
            })
        }
        Location::Bisect => {
            let (mut lo, mut hi) = (0.0, dt);
            let mut hit = Hit { dt, x: x1, reason };
            for _ in 0..MAX_BISECTIONS {
                if hi - lo < EVENT_TIME_TOL_S {
                    break;
                }
                let mid = 0.5 * (lo + hi);
                let x_mid = integrator.step(model, t, x0, mid)?;
                match events.triggered(model, &x_mid) {
                    Some(r) => {
                        hi = mid;
                        hit = Hit {
                            dt: mid,
                            x: x_mid,
                            reason: r,
                        };
                    }
                    None => lo = mid,
                }
            }
            Ok(hit)
        }
    }
}
