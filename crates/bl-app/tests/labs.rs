//! End-to-end lab pipelines on the reference engine.

use bl_app::{AppError, LabContext, LabId, LabRequest, run_lab};
use bl_params::Chemistry;
use bl_results::LabOutputItem;
use serde_json::{Value, json};

fn run(id: LabId, body: Value) -> Result<Value, AppError> {
    let request = LabRequest::parse(id, body)?;
    let output = run_lab(&LabContext::default(), &request)?;
    Ok(output.to_json().expect("serializable output"))
}

fn graph<'a>(block: &'a Value, index: usize) -> &'a Value {
    &block[1]["graphs"][index]
}

fn values(graph: &Value) -> Vec<f64> {
    graph["values"]
        .as_array()
        .expect("values array")
        .iter()
        .map(|v| v.as_f64().expect("number"))
        .collect()
}

#[test]
fn lab1_nmc_two_cycles() {
    let out = run(
        LabId::Lab1,
        json!({
            "Type": "NMC",
            "Ambient temperature [K]": 298,
            "Nominal cell capacity [A.h]": 5,
            "C Rates": [1],
            "Cycles": 2
        }),
    )
    .unwrap();

    let items = out.as_array().unwrap();
    assert_eq!(items.len(), 3);

    let charge = &items[0];
    assert_eq!(charge[0]["title"], "Charging at different C Rates");
    assert_eq!(graph(charge, 0)["name"], "Throughput capacity [A.h]");
    assert_eq!(graph(charge, 1)["name"], "Voltage [V]");
    assert_eq!(graph(charge, 1)["fname"], "1C");
    let throughput = values(graph(charge, 0));
    assert!(!throughput.is_empty());
    assert!(throughput.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(throughput.len(), values(graph(charge, 1)).len());

    let discharge = &items[1];
    assert_eq!(discharge[0]["title"], "Discharging at different C Rates");
    assert_eq!(graph(discharge, 0)["name"], "Discharge capacity [A.h]");

    let cycling = &items[2][0];
    assert_eq!(cycling[0]["title"], "Cycling");
    assert_eq!(graph(cycling, 0)["name"], "Cycle");
    assert_eq!(values(graph(cycling, 0)), vec![1.0, 2.0]);
    assert_eq!(graph(cycling, 1)["fname"], "Capacity");
    assert_eq!(values(graph(cycling, 1)).len(), 2);

    let temperature = &items[2][1];
    assert_eq!(temperature[0]["title"], "Temperature");
    assert_eq!(graph(temperature, 1)["name"], "Cell Temperature [C]");
    let t = values(graph(temperature, 0));
    assert!(t.len() <= 8100);
    assert_eq!(t.len(), values(graph(temperature, 1)).len());
}

#[test]
fn lab1_sweeps_every_rate() {
    let out = run(
        LabId::Lab1,
        json!({"Type": "LFP", "C Rates": [0.5, 2]}),
    )
    .unwrap();
    let graphs = out[0][1]["graphs"].as_array().unwrap();
    assert_eq!(graphs.len(), 4);
    assert_eq!(graphs[1]["fname"], "0.5C");
    assert_eq!(graphs[3]["fname"], "2C");

    // legend keeps the requested rate when the solver is driven virtually
    let out = run(
        LabId::Lab1,
        json!({"Type": "LFP", "C Rates": [1, 2], "Virtual C Rates": true}),
    )
    .unwrap();
    let graphs = out[1][1]["graphs"].as_array().unwrap();
    assert_eq!(graphs[1]["fname"], "1C");
    assert_eq!(graphs[3]["fname"], "2C");
}

#[test]
fn lab1_virtual_rate_outside_fit_is_rejected() {
    // 2 * 0.4 - 1 < 0
    let err = run(
        LabId::Lab1,
        json!({"Type": "NCA", "C Rates": [0.4], "Virtual C Rates": true}),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[test]
fn unsupported_or_missing_chemistry() {
    let err = run(LabId::Lab1, json!({"Type": "NiCd"})).unwrap_err();
    assert!(matches!(err, AppError::UnsupportedChemistry { .. }));
    let err = run(LabId::Lab1, json!({})).unwrap_err();
    assert!(matches!(err, AppError::UnsupportedChemistry { .. }));
    let err = run(LabId::Lab3, json!({"Type": "lead acid"})).unwrap_err();
    assert!(matches!(err, AppError::UnsupportedChemistry { .. }));
}

#[test]
fn invalid_inputs_are_classified() {
    let err = run(LabId::Lab1, json!({"Type": "NMC", "C Rates": []})).unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    let err = run(LabId::Lab1, json!({"Type": "NMC", "C Rate": [1]})).unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    let err = run(
        LabId::Lab1,
        json!({"Type": "NMC", "Nominal cell capacity [A.h]": -2}),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidParameter(_)));
    let err = run(LabId::Lab2, json!({"Silicon Percentage": 1.5})).unwrap_err();
    assert!(matches!(err, AppError::InvalidParameter(_)));
}

#[test]
fn lab2_composite_blocks() {
    let out = run(
        LabId::Lab2,
        json!({"Ambient temperature [K]": 300, "C Rates": [1], "Silicon Percentage": 0.2}),
    )
    .unwrap();
    let blocks = out.as_array().unwrap();
    let titles: Vec<&str> = blocks
        .iter()
        .map(|b| b[0]["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec!["Loss of capacity to SEI", "Graphite", "Silicon", "Lithium inventory"]
    );
    let hours = values(graph(&blocks[0], 0));
    assert!(hours.len() > 1 && hours.len() <= 1000);
    assert_eq!(hours[0], 0.0);
    for block in blocks {
        assert_eq!(graph(block, 0)["name"], "Time [h]");
        assert_eq!(values(graph(block, 1)).len(), hours.len());
    }
    let lithium = blocks[3][1]["graphs"].as_array().unwrap();
    assert_eq!(lithium.len(), 3);
    assert_eq!(lithium[1]["fname"], "Total");
    assert_eq!(lithium[2]["fname"], "Neg Electrode");
}

#[test]
fn lab3_cycling_views() {
    let out = run(
        LabId::Lab3,
        json!({
            "Type": "NMC",
            "Ambient temperature [K]": 298.15,
            "Charging Properties": {"Cycles": 3, "Rest 2T": 0}
        }),
    )
    .unwrap();
    let blocks = out.as_array().unwrap();
    let titles: Vec<&str> = blocks
        .iter()
        .map(|b| b[0]["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Capacity over Cycles",
            "Voltage over time",
            "Loss",
            "Charge curves",
            "Discharge curves",
            "Voltage over cycles"
        ]
    );

    assert_eq!(values(graph(&blocks[0], 0)), vec![1.0, 2.0, 3.0]);
    let loss = values(graph(&blocks[2], 1));
    assert_eq!(loss.len(), 3);
    assert_eq!(loss[0], 0.0);

    let averaged = values(graph(&blocks[1], 0));
    assert!(!averaged.is_empty());
    assert_eq!(graph(&blocks[1], 1)["name"], "Terminal Voltage [V]");

    let charge_curves = blocks[3][1]["graphs"].as_array().unwrap();
    assert_eq!(charge_curves.len(), 6);
    assert_eq!(charge_curves[1]["fname"], "Cycle 1");
    assert_eq!(charge_curves[5]["fname"], "Cycle 3");
    assert_eq!(values(&charge_curves[0])[0], 0.0);
    // the constant-voltage hold ends the charge curve at the hold voltage
    let charge_v = values(&charge_curves[1]);
    assert!((charge_v.last().unwrap() - 4.0).abs() < 1e-3);

    let usable_ah = Chemistry::Nmc.base_parameters().usable_capacity_ah();
    let discharge_curves = blocks[4][1]["graphs"].as_array().unwrap();
    assert_eq!(discharge_curves.len(), 6);
    for pair in discharge_curves.chunks(2) {
        let capacity = values(&pair[0]);
        let voltage = values(&pair[1]);
        assert_eq!(capacity[0], 0.0);
        assert!(*capacity.last().unwrap() > 0.5 * usable_ah);
        assert!(*capacity.last().unwrap() <= usable_ah);
        assert!(voltage[0] < 4.0, "discharge starts on the hold plateau");
        assert!(voltage.windows(2).all(|w| w[1] <= w[0] + 1e-3));
        // ends at the cell's own lower limit, which is above "Discharge V"
        assert!(*voltage.last().unwrap() < 3.2);
    }

    assert_eq!(graph(&blocks[5], 0)["name"], "Cycle");
    let x = values(graph(&blocks[5], 0));
    assert!(x.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(*x.last().unwrap(), 3.0);
}

#[test]
fn lab3_cycle_count_is_capped() {
    let request = LabRequest::parse(
        LabId::Lab3,
        json!({"Type": "LG M50", "Charging Properties": {"Cycles": 250}}),
    )
    .unwrap();
    let ctx = LabContext::reference(bl_app::LabSettings {
        max_cycles: 2,
        ..Default::default()
    });
    let output = run_lab(&ctx, &request).unwrap();
    let first = match &output.0[0] {
        LabOutputItem::Block(b) => b,
        LabOutputItem::Group(_) => panic!("lab 3 answers with flat blocks"),
    };
    assert_eq!(first.graphs[0].values, vec![1.0, 2.0]);
}
