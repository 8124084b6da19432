//! Integration tests: reference engine across the chemistry catalogue.

use bl_params::{Chemistry, catalog};
use bl_sim::{
    CyclingProtocol, Drive, Experiment, IntegratorType, Mode, ModelSpec, ReferenceEngine, SimError,
    SimulationRequest, SolverOptions, StopReason, cycling, run_simulation, single_step,
};

fn charge_request(chemistry: Chemistry, model: ModelSpec) -> SimulationRequest {
    let params = chemistry.base_parameters();
    let cutoff = params.upper_voltage_cutoff_v - 0.1;
    SimulationRequest::new(
        params,
        model,
        Drive::Experiment(single_step(Mode::Charge, 1.0, 3.0 * 3600.0, cutoff).unwrap()),
        SolverOptions::fast(1000.0),
    )
}

#[test]
fn one_c_charge_has_monotone_throughput_for_every_chemistry() {
    for entry in catalog() {
        for model in [ModelSpec::spm(), ModelSpec::spme()] {
            let sol = run_simulation(&ReferenceEngine, &charge_request(entry.chemistry, model))
                .unwrap_or_else(|e| panic!("{} {:?}: {e}", entry.canonical_id, model.kind));
            let q = sol.get("Throughput capacity [A.h]").unwrap();
            assert!(q.len() > 1, "{}: empty solution", entry.canonical_id);
            assert!(
                q.windows(2).all(|w| w[1] >= w[0]),
                "{}: throughput decreased",
                entry.canonical_id
            );
            assert!(*q.last().unwrap() > 0.0);
        }
    }
}

#[test]
fn charge_voltage_rises_to_cutoff() {
    let sol = run_simulation(&ReferenceEngine, &charge_request(Chemistry::LgM50, ModelSpec::spm()))
        .unwrap();
    let v = sol.get("Voltage [V]").unwrap();
    assert_eq!(sol.termination(), StopReason::VoltageCutoff);
    assert!((v.last().unwrap() - 4.1).abs() < 0.05);
    assert!(v.first().unwrap() < v.last().unwrap());
}

#[test]
fn discharge_counts_positive_capacity() {
    let params = Chemistry::Nca.base_parameters();
    let request = SimulationRequest::new(
        params,
        ModelSpec::spm(),
        Drive::Experiment(single_step(Mode::Discharge, 1.0, 3.0 * 3600.0, 3.0).unwrap()),
        SolverOptions::safe(500.0),
    );
    let sol = run_simulation(&ReferenceEngine, &request).unwrap();
    let q = sol.get("Discharge capacity [A.h]").unwrap();
    assert_eq!(q[0], 0.0);
    assert!(*q.last().unwrap() > 0.2 && *q.last().unwrap() < 0.45);
}

#[test]
fn two_cycle_summary_is_one_based() {
    let params = Chemistry::Nmc.base_parameters();
    let request = SimulationRequest::new(
        params,
        ModelSpec::spm(),
        Drive::Experiment(cycling(&CyclingProtocol::standard(), 2)),
        SolverOptions::fast(1000.0),
    );
    let sol = run_simulation(&ReferenceEngine, &request).unwrap();
    assert_eq!(sol.n_cycles(), 2);
    assert_eq!(sol.summary_variable("Cycle number").unwrap(), vec![1.0, 2.0]);

    let capacity = sol.summary_variable("Capacity [A.h]").unwrap();
    assert!(capacity[1] < capacity[0], "SEI should eat capacity");
    let change = sol
        .summary_variable("Change in negative electrode capacity [A.h]")
        .unwrap();
    assert_eq!(change[0], 0.0);
    assert!(change[1] < 0.0);

    let cycle_samples: usize = sol.cycles().map(|c| c.samples().len()).sum();
    assert_eq!(cycle_samples, sol.len());
}

#[test]
fn temperature_rises_under_load() {
    let params = Chemistry::LgM50.base_parameters();
    let ambient = params.ambient_temperature_k;
    let request = SimulationRequest::new(
        params,
        ModelSpec::spme(),
        Drive::Experiment(single_step(Mode::Discharge, 2.0, 3600.0, 3.0).unwrap()),
        SolverOptions::fast(1000.0),
    );
    let sol = run_simulation(&ReferenceEngine, &request).unwrap();
    let t = sol.get("Cell temperature [K]").unwrap();
    assert!(t.iter().copied().fold(f64::MIN, f64::max) > ambient);
}

#[test]
fn silicon_composite_runs_with_two_phases() {
    let params = Chemistry::Silicon.base_parameters();
    let current = params.c_rate_current(1.0);
    let request = SimulationRequest::new(
        params,
        ModelSpec::dfn().with_particle_phases(2, 1),
        Drive::ConstantCurrent {
            current_a: current,
            t_eval: bl_core::linspace(0.0, 10_000.0, 1000),
        },
        SolverOptions::safe(500.0),
    );
    let sol = run_simulation(&ReferenceEngine, &request).unwrap();
    let sei = sol.get("Loss of capacity to SEI [A.h]").unwrap();
    assert!(sei.windows(2).all(|w| w[1] >= w[0]));
    let secondary = sol
        .get("X-averaged negative electrode secondary interfacial current density [A.m-2]")
        .unwrap();
    assert!(secondary.iter().all(|j| *j > 0.0));
    let total = sol.get("Total lithium [mol]").unwrap();
    assert!(total.last().unwrap() < total.first().unwrap());
}

#[test]
fn unknown_variable_is_an_error() {
    let sol = run_simulation(&ReferenceEngine, &charge_request(Chemistry::Lfp, ModelSpec::spm()))
        .unwrap();
    assert!(matches!(
        sol.get("Voltage"),
        Err(SimError::UnknownVariable { .. })
    ));
}

#[test]
fn malformed_experiment_never_reaches_the_engine() {
    let err = Experiment::from_instructions(&["Charge at 1C until lunch"]).unwrap_err();
    assert!(matches!(err, SimError::InvalidExperiment { .. }));
}

#[test]
fn heun_agrees_with_rk4_on_short_steps() {
    let capacity = |integrator| {
        let request = SimulationRequest::new(
            Chemistry::Nca.base_parameters(),
            ModelSpec::spm(),
            Drive::Experiment(single_step(Mode::Discharge, 1.0, 3.0 * 3600.0, 3.0).unwrap()),
            SolverOptions {
                integrator,
                ..SolverOptions::safe(10.0)
            },
        );
        let sol = run_simulation(&ReferenceEngine, &request).unwrap();
        *sol.get("Discharge capacity [A.h]").unwrap().last().unwrap()
    };
    let rk4 = capacity(IntegratorType::RK4);
    let heun = capacity(IntegratorType::Heun);
    assert!((rk4 - heun).abs() / rk4 < 0.01, "rk4 {rk4} heun {heun}");
}
