//! Lab pipelines.
//!
//! Every lab runs the same chain: chemistry lookup, parameter overrides,
//! experiment construction, simulation, then result shaping. What differs
//! per lab (route, model, solver settings) lives in one table.

use std::sync::Arc;
use std::time::Duration;

use bl_core::linspace;
use bl_params::{Chemistry, Overrides, ParameterSet, apply_overrides, lab2_composite_tuning, lookup};
use bl_results::shape::{
    average_array, cap_points, extract, normalize_start, plot_graphs_against_cycle, split_cycle,
};
use bl_results::{GraphEntry, LabOutput, ResultBlock};
use bl_sim::experiment::{Cutoff, Operation, Rate};
use bl_sim::{
    BatteryEngine, CyclingProtocol, Drive, Mode, ModelKind, ModelSpec, ReferenceEngine,
    SimResult, SimulationRequest, Solution, SolverMode, SolverOptions, Step, VirtualRateFit,
    clamp_cycles, cycling, run_batch, run_simulation, single_step,
};
use serde::Serialize;
use tracing::debug;

use crate::config::LabSettings;
use crate::error::{AppError, AppResult};
use crate::request::{ChargingProperties, Lab1Request, Lab2Request, Lab3Request};

/// Longest charge or discharge in the rate sweeps.
const SWEEP_DURATION_S: f64 = 3.0 * 3600.0;
const SWEEP_CHARGE_CUTOFF_V: f64 = 4.3;
const SWEEP_DISCHARGE_CUTOFF_V: f64 = 2.0;

/// Report grid of the two-phase constant-current run.
const LAB2_T_END_S: f64 = 10_000.0;
const LAB2_POINTS: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LabId {
    Lab1,
    Lab2,
    Lab3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverPreset {
    pub mode: SolverMode,
    pub dt_max_s: f64,
}

impl SolverPreset {
    pub fn options(self, timeout: Option<Duration>) -> SolverOptions {
        let options = match self.mode {
            SolverMode::Fast => SolverOptions::fast(self.dt_max_s),
            SolverMode::Safe => SolverOptions::safe(self.dt_max_s),
        };
        options.with_timeout(timeout)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabDefinition {
    pub id: LabId,
    pub route: &'static str,
    pub summary: &'static str,
    pub model: ModelSpec,
    /// Single-step sweeps and constant-current runs
    pub solver: SolverPreset,
    /// Multi-cycle experiments
    pub cycling_solver: SolverPreset,
}

static LABS: [LabDefinition; 3] = [
    LabDefinition {
        id: LabId::Lab1,
        route: "/simulate-lab1",
        summary: "charge and discharge at several C-rates, then cycle",
        model: ModelSpec {
            kind: ModelKind::Spm,
            particle_phases: (1, 1),
        },
        solver: SolverPreset {
            mode: SolverMode::Safe,
            dt_max_s: 600.0,
        },
        cycling_solver: SolverPreset {
            mode: SolverMode::Fast,
            dt_max_s: 100_000.0,
        },
    },
    LabDefinition {
        id: LabId::Lab2,
        route: "/simulate-lab2",
        summary: "graphite and silicon composite electrode under constant current",
        model: ModelSpec {
            kind: ModelKind::Dfn,
            particle_phases: (2, 1),
        },
        solver: SolverPreset {
            mode: SolverMode::Safe,
            dt_max_s: 500.0,
        },
        cycling_solver: SolverPreset {
            mode: SolverMode::Safe,
            dt_max_s: 500.0,
        },
    },
    LabDefinition {
        id: LabId::Lab3,
        route: "/simulate-lab3",
        summary: "user-defined cycling protocol",
        model: ModelSpec {
            kind: ModelKind::Spme,
            particle_phases: (1, 1),
        },
        solver: SolverPreset {
            mode: SolverMode::Fast,
            dt_max_s: 10_000.0,
        },
        cycling_solver: SolverPreset {
            mode: SolverMode::Fast,
            dt_max_s: 10_000.0,
        },
    },
];

pub fn definitions() -> &'static [LabDefinition] {
    &LABS
}

impl LabId {
    pub const ALL: [LabId; 3] = [LabId::Lab1, LabId::Lab2, LabId::Lab3];

    pub fn definition(self) -> &'static LabDefinition {
        &LABS[self as usize]
    }

    pub fn route(self) -> &'static str {
        self.definition().route
    }

    pub fn from_route(route: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.route() == route)
    }
}

impl std::fmt::Display for LabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LabId::Lab1 => "lab1",
            LabId::Lab2 => "lab2",
            LabId::Lab3 => "lab3",
        };
        f.write_str(s)
    }
}

/// Engine and settings shared by all requests.
#[derive(Clone)]
pub struct LabContext {
    pub engine: Arc<dyn BatteryEngine>,
    pub settings: LabSettings,
}

impl LabContext {
    pub fn new(engine: Arc<dyn BatteryEngine>, settings: LabSettings) -> Self {
        Self { engine, settings }
    }

    pub fn reference(settings: LabSettings) -> Self {
        Self::new(Arc::new(ReferenceEngine), settings)
    }

    fn max_cycles(&self, requested: usize) -> usize {
        clamp_cycles(requested.min(self.settings.max_cycles))
    }
}

impl Default for LabContext {
    fn default() -> Self {
        Self::reference(LabSettings::default())
    }
}

/// A parsed request body for one of the labs.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LabRequest {
    Lab1(Lab1Request),
    Lab2(Lab2Request),
    Lab3(Lab3Request),
}

impl LabRequest {
    pub fn parse(id: LabId, body: serde_json::Value) -> AppResult<Self> {
        Ok(match id {
            LabId::Lab1 => LabRequest::Lab1(serde_json::from_value(body)?),
            LabId::Lab2 => LabRequest::Lab2(serde_json::from_value(body)?),
            LabId::Lab3 => LabRequest::Lab3(serde_json::from_value(body)?),
        })
    }

    pub fn id(&self) -> LabId {
        match self {
            LabRequest::Lab1(_) => LabId::Lab1,
            LabRequest::Lab2(_) => LabId::Lab2,
            LabRequest::Lab3(_) => LabId::Lab3,
        }
    }

    /// Number of solves the request will run.
    pub fn simulation_count(&self) -> usize {
        match self {
            LabRequest::Lab1(r) => 2 * r.c_rates.len() + 1,
            LabRequest::Lab2(_) | LabRequest::Lab3(_) => 1,
        }
    }
}

pub fn run_lab(ctx: &LabContext, request: &LabRequest) -> AppResult<LabOutput> {
    match request {
        LabRequest::Lab1(r) => run_lab1(ctx, r),
        LabRequest::Lab2(r) => run_lab2(ctx, r),
        LabRequest::Lab3(r) => run_lab3(ctx, r),
    }
}

fn configured(chemistry: Option<&str>, overrides: &Overrides) -> AppResult<ParameterSet> {
    let entry = lookup(chemistry.unwrap_or_default())?;
    let mut params = entry.chemistry.base_parameters();
    apply_overrides(&mut params, overrides)?;
    Ok(params)
}

fn rate_label(c_rate: f64) -> String {
    format!("{c_rate}C")
}

fn check_rate(c_rate: f64) -> AppResult<f64> {
    if c_rate.is_finite() && c_rate > 0.0 {
        Ok(c_rate)
    } else {
        Err(AppError::InvalidInput(format!(
            "C-rates must be positive, got {c_rate}"
        )))
    }
}

/// `"Cycle"` against a per-cycle summary variable.
fn summary_block(title: &str, solution: &Solution, variable: &str) -> AppResult<ResultBlock> {
    Ok(ResultBlock::new(title).with_pair(
        GraphEntry::new("Cycle", solution.summary_variable("Cycle number")?),
        GraphEntry::new("Capacity [A.h]", solution.summary_variable(variable)?)
            .with_fname("Capacity"),
    )?)
}

fn sweep_block(mode: Mode, rates: &[f64], solutions: &[Solution]) -> AppResult<ResultBlock> {
    let (title, x_name) = match mode {
        Mode::Charge => ("Charging at different C Rates", "Throughput capacity [A.h]"),
        Mode::Discharge => ("Discharging at different C Rates", "Discharge capacity [A.h]"),
    };
    let mut block = ResultBlock::new(title);
    for (&rate, solution) in rates.iter().zip(solutions) {
        block.push_series(
            GraphEntry::new(x_name, extract(solution, x_name)?),
            vec![
                GraphEntry::new("Voltage [V]", extract(solution, "Voltage [V]")?)
                    .with_fname(rate_label(rate)),
            ],
        )?;
    }
    Ok(block)
}

/// Rate sweeps in both directions, then the standard cycling protocol.
pub fn run_lab1(ctx: &LabContext, request: &Lab1Request) -> AppResult<LabOutput> {
    let def = LabId::Lab1.definition();
    let params = configured(request.chemistry.as_deref(), &request.overrides())?;
    if request.c_rates.is_empty() {
        return Err(AppError::InvalidInput("\"C Rates\" must not be empty".to_string()));
    }
    for &rate in &request.c_rates {
        check_rate(rate)?;
    }

    let fit = VirtualRateFit::default();
    let solver_rates = request
        .c_rates
        .iter()
        .map(|&rate| {
            if request.virtual_c_rates {
                fit.apply(rate)
            } else {
                Ok(rate)
            }
        })
        .collect::<SimResult<Vec<_>>>()?;

    let timeout = ctx.settings.simulation_timeout;
    let sweep = def.solver.options(timeout);
    let mut requests = Vec::with_capacity(2 * solver_rates.len() + 1);
    for (mode, cutoff_v) in [
        (Mode::Charge, SWEEP_CHARGE_CUTOFF_V),
        (Mode::Discharge, SWEEP_DISCHARGE_CUTOFF_V),
    ] {
        for &rate in &solver_rates {
            let experiment = single_step(mode, rate, SWEEP_DURATION_S, cutoff_v)?;
            requests.push(SimulationRequest::new(
                params.clone(),
                def.model,
                Drive::Experiment(experiment),
                sweep.clone(),
            ));
        }
    }
    let cycles = ctx.max_cycles(request.cycles);
    requests.push(SimulationRequest::new(
        params,
        def.model,
        Drive::Experiment(cycling(&CyclingProtocol::standard(), cycles)),
        def.cycling_solver.options(timeout),
    ));

    let mut solutions = run_batch(ctx.engine.as_ref(), &requests)?;
    let cycled = solutions
        .pop()
        .ok_or_else(|| AppError::SolverFailure("cycling run returned nothing".to_string()))?;
    let discharges = solutions.split_off(request.c_rates.len());
    let charges = solutions;

    let time = extract(&cycled, "Time [s]")?;
    let temperature = extract(&cycled, "Cell temperature [C]")?;
    let (time, temperature) = cap_points(&time, &temperature, ctx.settings.point_cap)?;

    let mut output = LabOutput::default();
    output.push_block(sweep_block(Mode::Charge, &request.c_rates, &charges)?);
    output.push_block(sweep_block(Mode::Discharge, &request.c_rates, &discharges)?);
    output.push_group(vec![
        summary_block("Cycling", &cycled, "Capacity [A.h]")?,
        ResultBlock::new("Temperature").with_pair(
            GraphEntry::new("Time [s]", time),
            GraphEntry::new("Cell Temperature [C]", temperature).with_fname("C"),
        )?,
    ]);
    debug!(
        chemistry = ?request.chemistry,
        rates = ?request.c_rates,
        cycles,
        "lab1 shaped"
    );
    Ok(output)
}

/// Constant-current discharge of a graphite and silicon composite electrode.
pub fn run_lab2(ctx: &LabContext, request: &Lab2Request) -> AppResult<LabOutput> {
    let def = LabId::Lab2.definition();
    let Some(&rate) = request.c_rates.first() else {
        return Err(AppError::InvalidInput("\"C Rates\" must not be empty".to_string()));
    };
    let rate = check_rate(rate)?;

    let mut params = Chemistry::Silicon.base_parameters();
    lab2_composite_tuning(&mut params)?;
    apply_overrides(&mut params, &request.overrides())?;

    let drive = Drive::ConstantCurrent {
        current_a: params.c_rate_current(rate),
        t_eval: linspace(0.0, LAB2_T_END_S, LAB2_POINTS),
    };
    let solution = run_simulation(
        ctx.engine.as_ref(),
        &SimulationRequest::new(
            params,
            def.model,
            drive,
            def.solver.options(ctx.settings.simulation_timeout),
        ),
    )?;

    let hours = || -> AppResult<GraphEntry> {
        Ok(GraphEntry::new("Time [h]", extract(&solution, "Time [h]")?))
    };
    let series = |name: &str, variable: &str, fname: &str| -> AppResult<GraphEntry> {
        Ok(GraphEntry::new(name, extract(&solution, variable)?).with_fname(fname))
    };
    let density = "Averaged interfacial current density [A.m-2]";

    let mut output = LabOutput::default();
    output.push_block(ResultBlock::new("Loss of capacity to SEI").with_pair(
        hours()?,
        series("Loss of capacity to SEI [A.h]", "Loss of capacity to SEI [A.h]", "V")?,
    )?);
    output.push_block(ResultBlock::new("Graphite").with_pair(
        hours()?,
        series(
            density,
            "X-averaged negative electrode primary interfacial current density [A.m-2]",
            "V",
        )?,
    )?);
    output.push_block(ResultBlock::new("Silicon").with_pair(
        hours()?,
        series(
            density,
            "X-averaged negative electrode secondary interfacial current density [A.m-2]",
            "V",
        )?,
    )?);
    let mut lithium = ResultBlock::new("Lithium inventory");
    lithium.push_series(
        hours()?,
        vec![
            series("Total lithium [mol]", "Total lithium [mol]", "Total")?,
            series(
                "Total lithium [mol]",
                "Total lithium in negative electrode [mol]",
                "Neg Electrode",
            )?,
        ],
    )?;
    output.push_block(lithium);
    debug!(rate, samples = solution.len(), stop = %solution.termination(), "lab2 shaped");
    Ok(output)
}

/// Build the lab 3 cycle from the user's charging properties.
///
/// Rests of zero minutes are left out.
pub fn lab3_protocol(p: &ChargingProperties) -> AppResult<CyclingProtocol> {
    if !(p.hold_c.is_finite() && p.hold_c > 0.0) {
        return Err(AppError::InvalidInput(format!(
            "\"Hold C\" must be positive, got {}",
            p.hold_c
        )));
    }
    let rest = |minutes: f64, key: &str| -> AppResult<Option<Step>> {
        if minutes < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "\"{key}\" must not be negative, got {minutes}"
            )));
        }
        Ok((minutes > 0.0).then(|| Step::new(Operation::Rest).lasting(minutes * 60.0)))
    };

    let mut steps = vec![
        Step::new(Operation::Charge(Rate::C(p.charge_c))).until(Cutoff::Voltage(p.charge_v)),
        Step::new(Operation::Hold {
            voltage_v: p.hold_v,
        })
        .until(Cutoff::CurrentC(p.hold_c)),
    ];
    steps.extend(rest(p.rest_min, "Rest T")?);
    steps.push(
        Step::new(Operation::Discharge(Rate::C(p.discharge_c)))
            .until(Cutoff::Voltage(p.discharge_v)),
    );
    steps.extend(rest(p.rest2_min, "Rest 2T")?);
    Ok(CyclingProtocol::new(steps)?)
}

/// First, second and last cycle, without repeats.
fn curve_cycles(n_cycles: usize) -> Vec<usize> {
    let mut picked = vec![1, 2, n_cycles];
    picked.retain(|c| (1..=n_cycles).contains(c));
    picked.dedup();
    picked
}

/// Charge and discharge voltage curves of selected cycles against the
/// capacity moved since the start of each segment.
fn curve_blocks(solution: &Solution) -> AppResult<(ResultBlock, ResultBlock)> {
    let mut charge = ResultBlock::new("Charge curves");
    let mut discharge = ResultBlock::new("Discharge curves");
    for number in curve_cycles(solution.n_cycles()) {
        let Some(cycle) = solution.cycle(number) else {
            continue;
        };
        let capacity = cycle.get("Throughput capacity [A.h]")?;
        let voltage = cycle.get("Voltage [V]")?;
        let current = cycle.get("Current [A]")?;
        let segments = split_cycle(&capacity, &voltage, &current)?;
        let label = format!("Cycle {number}");
        for (block, segment) in [
            (&mut charge, segments.charge),
            (&mut discharge, segments.discharge),
        ] {
            if segment.x.is_empty() {
                continue;
            }
            block.push_series(
                GraphEntry::new("Capacity [A.h]", normalize_start(&segment.x)),
                vec![GraphEntry::new("Voltage [V]", segment.voltage).with_fname(label.clone())],
            )?;
        }
    }
    Ok((charge, discharge))
}

/// Repeated user-defined cycle with capacity-fade and voltage views.
pub fn run_lab3(ctx: &LabContext, request: &Lab3Request) -> AppResult<LabOutput> {
    let def = LabId::Lab3.definition();
    let params = configured(request.chemistry.as_deref(), &request.overrides())?;
    let protocol = lab3_protocol(&request.charging)?;
    let cycles = ctx.max_cycles(request.charging.cycles);

    let solution = run_simulation(
        ctx.engine.as_ref(),
        &SimulationRequest::new(
            params,
            def.model,
            Drive::Experiment(cycling(&protocol, cycles)),
            def.cycling_solver.options(ctx.settings.simulation_timeout),
        ),
    )?;

    let mut output = LabOutput::default();
    output.push_block(summary_block("Capacity over Cycles", &solution, "Capacity [A.h]")?);
    output.push_block(ResultBlock::new("Voltage over time").with_pair(
        GraphEntry::new("Time [h]", average_array(&extract(&solution, "Time [h]")?)),
        GraphEntry::new(
            "Terminal Voltage [V]",
            average_array(&extract(&solution, "Terminal voltage [V]")?),
        )
        .with_fname("Voltage"),
    )?);
    output.push_block(summary_block(
        "Loss",
        &solution,
        "Change in negative electrode capacity [A.h]",
    )?);

    let (charge, discharge) = curve_blocks(&solution)?;
    output.push_block(charge);
    output.push_block(discharge);

    let mut graphs =
        plot_graphs_against_cycle(&solution, &["Voltage [V]"], ctx.settings.point_cap)?.into_iter();
    let mut over_cycles = ResultBlock::new("Voltage over cycles");
    if let Some(x) = graphs.next() {
        over_cycles.push_series(x, graphs.map(|g| g.with_fname("Voltage")).collect())?;
    }
    output.push_block(over_cycles);

    debug!(
        chemistry = ?request.chemistry,
        cycles,
        samples = solution.len(),
        "lab3 shaped"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn table_is_indexed_by_id() {
        for id in LabId::ALL {
            assert_eq!(id.definition().id, id);
            assert_eq!(LabId::from_route(id.route()), Some(id));
        }
        assert_eq!(LabId::from_route("/simulate-lab4"), None);
        assert_eq!(LabId::Lab2.definition().model.particle_phases, (2, 1));
    }

    #[test]
    fn rate_labels_drop_trailing_zeros() {
        assert_eq!(rate_label(1.0), "1C");
        assert_eq!(rate_label(0.5), "0.5C");
    }

    #[test]
    fn curve_cycles_are_first_second_last() {
        assert_eq!(curve_cycles(0), Vec::<usize>::new());
        assert_eq!(curve_cycles(1), vec![1]);
        assert_eq!(curve_cycles(2), vec![1, 2]);
        assert_eq!(curve_cycles(7), vec![1, 2, 7]);
    }

    #[test]
    fn default_protocol_matches_standard_cycle() {
        let p = lab3_protocol(&ChargingProperties::default()).unwrap();
        assert_eq!(p, CyclingProtocol::standard());
    }

    #[test]
    fn bad_protocols_are_input_errors() {
        let p = ChargingProperties {
            hold_c: 0.0,
            ..Default::default()
        };
        assert!(matches!(lab3_protocol(&p), Err(AppError::InvalidInput(_))));
        let p = ChargingProperties {
            rest_min: -1.0,
            ..Default::default()
        };
        assert!(matches!(lab3_protocol(&p), Err(AppError::InvalidInput(_))));
        let p = ChargingProperties {
            charge_c: -2.0,
            ..Default::default()
        };
        assert!(matches!(lab3_protocol(&p), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn request_parse_dispatches_on_lab() {
        let body = serde_json::json!({"Type": "NCA", "C Rates": [0.5, 1, 2]});
        let r = LabRequest::parse(LabId::Lab1, body.clone()).unwrap();
        assert_eq!(r.id(), LabId::Lab1);
        assert_eq!(r.simulation_count(), 7);
        assert!(matches!(
            LabRequest::parse(LabId::Lab2, body),
            Err(AppError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn protocol_keeps_two_to_five_steps(
            charge_c in 0.1f64..5.0,
            hold_c in 0.01f64..1.0,
            rest_min in 0.0f64..30.0,
            rest2_min in 0.0f64..30.0,
            zero_rest in any::<bool>(),
        ) {
            let p = ChargingProperties {
                charge_c,
                hold_c,
                rest_min: if zero_rest { 0.0 } else { rest_min },
                rest2_min,
                ..Default::default()
            };
            let protocol = lab3_protocol(&p).unwrap();
            let steps = protocol.steps();
            prop_assert!((3..=5).contains(&steps.len()));
            prop_assert!(steps[0].is_charge());
            prop_assert!(steps.iter().any(|s| s.is_discharge()));
        }

        #[test]
        fn cycles_never_exceed_configured_cap(requested in 0usize..1000, cap in 1usize..=100) {
            let ctx = LabContext::reference(LabSettings {
                max_cycles: cap,
                ..Default::default()
            });
            let n = ctx.max_cycles(requested);
            prop_assert!(n >= 1 && n <= cap);
        }
    }
}
