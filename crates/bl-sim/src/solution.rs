//! Simulation output: sampled variables, per-cycle views and summary rows.

use std::fmt;
use std::ops::Range;

use bl_core::constants::{SECONDS_PER_HOUR, ZERO_CELSIUS_K};
use serde::Serialize;

use crate::error::{SimError, SimResult};

/// Every variable a [`Solution`] can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Variable {
    TimeS,
    TimeH,
    Voltage,
    Current,
    DischargeCapacity,
    ThroughputCapacity,
    CellTemperatureK,
    CellTemperatureC,
    StateOfCharge,
    SeiLoss,
    NegativeElectrodeCapacity,
    PrimaryInterfacialCurrent,
    SecondaryInterfacialCurrent,
    TotalLithium,
    NegativeElectrodeLithium,
}

impl Variable {
    pub const ALL: [Variable; 15] = [
        Variable::TimeS,
        Variable::TimeH,
        Variable::Voltage,
        Variable::Current,
        Variable::DischargeCapacity,
        Variable::ThroughputCapacity,
        Variable::CellTemperatureK,
        Variable::CellTemperatureC,
        Variable::StateOfCharge,
        Variable::SeiLoss,
        Variable::NegativeElectrodeCapacity,
        Variable::PrimaryInterfacialCurrent,
        Variable::SecondaryInterfacialCurrent,
        Variable::TotalLithium,
        Variable::NegativeElectrodeLithium,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variable::TimeS => "Time [s]",
            Variable::TimeH => "Time [h]",
            Variable::Voltage => "Voltage [V]",
            Variable::Current => "Current [A]",
            Variable::DischargeCapacity => "Discharge capacity [A.h]",
            Variable::ThroughputCapacity => "Throughput capacity [A.h]",
            Variable::CellTemperatureK => "Cell temperature [K]",
            Variable::CellTemperatureC => "Cell temperature [C]",
            Variable::StateOfCharge => "State of charge",
            Variable::SeiLoss => "Loss of capacity to SEI [A.h]",
            Variable::NegativeElectrodeCapacity => "Negative electrode capacity [A.h]",
            Variable::PrimaryInterfacialCurrent => {
                "X-averaged negative electrode primary interfacial current density [A.m-2]"
            }
            Variable::SecondaryInterfacialCurrent => {
                "X-averaged negative electrode secondary interfacial current density [A.m-2]"
            }
            Variable::TotalLithium => "Total lithium [mol]",
            Variable::NegativeElectrodeLithium => "Total lithium in negative electrode [mol]",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Variable::Voltage => &["Terminal voltage [V]", "Battery voltage [V]"],
            Variable::CellTemperatureK => &["X-averaged cell temperature [K]"],
            Variable::CellTemperatureC => &["Cell Temperature [C]", "X-averaged cell temperature [C]"],
            Variable::SeiLoss => &[
                "Loss of capacity to negative SEI [A.h]",
                "Loss of capacity to positive SEI [A.h]",
            ],
            Variable::TotalLithium => &["Total lithium in particles [mol]"],
            _ => &[],
        }
    }

    /// Resolve a canonical name or one of its aliases.
    pub fn from_name(name: &str) -> SimResult<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == name || v.aliases().contains(&name))
            .ok_or_else(|| SimError::UnknownVariable {
                name: name.to_string(),
            })
    }

    pub fn value(self, s: &Sample) -> f64 {
        match self {
            Variable::TimeS => s.time_s,
            Variable::TimeH => s.time_s / SECONDS_PER_HOUR,
            Variable::Voltage => s.voltage_v,
            Variable::Current => s.current_a,
            Variable::DischargeCapacity => s.discharge_ah,
            Variable::ThroughputCapacity => s.throughput_ah,
            Variable::CellTemperatureK => s.temperature_k,
            Variable::CellTemperatureC => s.temperature_k - ZERO_CELSIUS_K,
            Variable::StateOfCharge => s.soc,
            Variable::SeiLoss => s.sei_loss_ah,
            Variable::NegativeElectrodeCapacity => s.negative_capacity_ah,
            Variable::PrimaryInterfacialCurrent => s.j_primary_a_m2,
            Variable::SecondaryInterfacialCurrent => s.j_secondary_a_m2,
            Variable::TotalLithium => s.lithium_mol,
            Variable::NegativeElectrodeLithium => s.negative_lithium_mol,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Model outputs at one reporting time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub time_s: f64,
    pub current_a: f64,
    pub voltage_v: f64,
    pub soc: f64,
    pub temperature_k: f64,
    pub throughput_ah: f64,
    pub discharge_ah: f64,
    pub sei_loss_ah: f64,
    pub negative_capacity_ah: f64,
    pub j_primary_a_m2: f64,
    pub j_secondary_a_m2: f64,
    pub lithium_mol: f64,
    pub negative_lithium_mol: f64,
}

/// End-of-cycle degradation figures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CycleSummary {
    /// 1-based
    pub cycle_number: usize,
    pub capacity_ah: f64,
    pub sei_loss_ah: f64,
    /// Relative to the first cycle
    pub negative_capacity_change_ah: f64,
}

pub const SUMMARY_VARIABLES: [&str; 4] = [
    "Cycle number",
    "Capacity [A.h]",
    "Loss of capacity to SEI [A.h]",
    "Change in negative electrode capacity [A.h]",
];

/// Why a run (or the step that ended it) stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Duration,
    VoltageCutoff,
    CurrentCutoff,
    MinimumVoltage,
    MaximumVoltage,
    SocBound,
    FinalTime,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Duration => "step duration",
            StopReason::VoltageCutoff => "event: step voltage cut-off",
            StopReason::CurrentCutoff => "event: step current cut-off",
            StopReason::MinimumVoltage => "event: Minimum voltage [V]",
            StopReason::MaximumVoltage => "event: Maximum voltage [V]",
            StopReason::SocBound => "event: state of charge bound",
            StopReason::FinalTime => "final time",
        };
        f.write_str(s)
    }
}

/// Samples of one cycle.
#[derive(Clone, Copy, Debug)]
pub struct CycleView<'a> {
    /// 1-based
    pub number: usize,
    samples: &'a [Sample],
}

impl<'a> CycleView<'a> {
    pub fn samples(&self) -> &'a [Sample] {
        self.samples
    }

    pub fn series(&self, v: Variable) -> Vec<f64> {
        self.samples.iter().map(|s| v.value(s)).collect()
    }

    pub fn get(&self, name: &str) -> SimResult<Vec<f64>> {
        Ok(self.series(Variable::from_name(name)?))
    }
}

/// Output of one solve.
#[derive(Clone, Debug, Serialize)]
pub struct Solution {
    samples: Vec<Sample>,
    cycle_bounds: Vec<Range<usize>>,
    summary: Vec<CycleSummary>,
    termination: StopReason,
}

impl Solution {
    /// Assemble a solution; `cycle_bounds` index into `samples`.
    pub fn new(
        samples: Vec<Sample>,
        cycle_bounds: Vec<Range<usize>>,
        summary: Vec<CycleSummary>,
        termination: StopReason,
    ) -> Self {
        Self {
            samples,
            cycle_bounds,
            summary,
            termination,
        }
    }

    /// Solution whose cycles are the given sample runs, without summary rows.
    pub fn from_cycles(cycles: Vec<Vec<Sample>>, termination: StopReason) -> Self {
        let mut samples = Vec::with_capacity(cycles.iter().map(Vec::len).sum());
        let mut bounds = Vec::with_capacity(cycles.len());
        for cycle in cycles {
            let start = samples.len();
            samples.extend(cycle);
            bounds.push(start..samples.len());
        }
        Self::new(samples, bounds, Vec::new(), termination)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn termination(&self) -> StopReason {
        self.termination
    }

    pub fn series(&self, v: Variable) -> Vec<f64> {
        self.samples.iter().map(|s| v.value(s)).collect()
    }

    /// Full time series of a variable addressed by name or alias.
    pub fn get(&self, name: &str) -> SimResult<Vec<f64>> {
        Ok(self.series(Variable::from_name(name)?))
    }

    /// Number of cycles; experiment-less runs have none.
    pub fn n_cycles(&self) -> usize {
        self.cycle_bounds.len()
    }

    pub fn cycles(&self) -> impl Iterator<Item = CycleView<'_>> + '_ {
        self.cycle_bounds
            .iter()
            .enumerate()
            .map(|(i, r)| CycleView {
                number: i + 1,
                samples: self.samples.get(r.clone()).unwrap_or(&[]),
            })
    }

    /// Cycle by 1-based number.
    pub fn cycle(&self, number: usize) -> Option<CycleView<'_>> {
        let r = self.cycle_bounds.get(number.checked_sub(1)?)?;
        Some(CycleView {
            number,
            samples: self.samples.get(r.clone())?,
        })
    }

    pub fn summary(&self) -> &[CycleSummary] {
        &self.summary
    }

    /// One summary variable across all cycles.
    pub fn summary_variable(&self, name: &str) -> SimResult<Vec<f64>> {
        let pick: fn(&CycleSummary) -> f64 = match name {
            "Cycle number" => |c| c.cycle_number as f64,
            "Capacity [A.h]" => |c| c.capacity_ah,
            "Loss of capacity to SEI [A.h]" | "Loss of capacity to negative SEI [A.h]" => {
                |c| c.sei_loss_ah
            }
            "Change in negative electrode capacity [A.h]" => |c| c.negative_capacity_change_ah,
            other => {
                return Err(SimError::UnknownVariable {
                    name: other.to_string(),
                });
            }
        };
        Ok(self.summary.iter().map(pick).collect())
    }
}
