//! Property tests for the result shaper.

use bl_results::shape::{
    average_chunks, downsample_monotone, normalize_start, plot_against_cycle,
    plot_graphs_against_cycle,
};
use bl_sim::{Sample, Solution, StopReason};
use proptest::prelude::*;

fn sample(t: f64, v: f64) -> Sample {
    Sample {
        time_s: t,
        current_a: 0.0,
        voltage_v: v,
        soc: 0.5,
        temperature_k: 298.15,
        throughput_ah: 0.0,
        discharge_ah: 0.0,
        sei_loss_ah: 0.0,
        negative_capacity_ah: 0.0,
        j_primary_a_m2: 0.0,
        j_secondary_a_m2: 0.0,
        lithium_mol: 0.0,
        negative_lithium_mol: 0.0,
    }
}

fn cycled(k: usize, m: usize) -> Solution {
    let cycles = (0..k)
        .map(|c| {
            (0..m)
                .map(|j| sample((c * m + j) as f64, 3.0 + j as f64 * 0.01))
                .collect()
        })
        .collect();
    Solution::from_cycles(cycles, StopReason::Duration)
}

proptest! {
    #[test]
    fn average_chunks_length_and_means(
        a in prop::collection::vec(-1e3f64..1e3, 0..300),
        b in 1usize..40,
    ) {
        let avg = average_chunks(&a, b);
        prop_assert_eq!(avg.len(), a.len().div_ceil(b));
        for (i, chunk) in a.chunks(b).enumerate() {
            let m = chunk.iter().sum::<f64>() / chunk.len() as f64;
            prop_assert!((avg[i] - m).abs() <= 1e-9 * (1.0 + m.abs()));
        }
    }

    #[test]
    fn plot_against_cycle_spans_cycles(k in 1usize..6, m in 2usize..30) {
        let sol = cycled(k, m);
        let (x, v) = plot_against_cycle(&sol, "Voltage [V]").unwrap();
        prop_assert_eq!(x.len(), k * m);
        prop_assert_eq!(v.len(), k * m);
        prop_assert!(x.windows(2).all(|w| w[1] >= w[0]));
        prop_assert_eq!(x[0], 0.0);
        prop_assert_eq!(*x.last().unwrap(), k as f64);
    }

    #[test]
    fn normalize_start_subtracts_first(a in prop::collection::vec(-1e3f64..1e3, 1..100)) {
        let n = normalize_start(&a);
        prop_assert_eq!(n[0], 0.0);
        for i in 1..a.len() {
            prop_assert_eq!(n[i], a[i] - a[0]);
        }
    }

    #[test]
    fn downsample_identity_and_endpoints(
        y in prop::collection::vec(-10f64..10.0, 2..200),
        frac in 0.05f64..1.0,
    ) {
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64 * 0.5).collect();
        let same = downsample_monotone(&x, &y, y.len()).unwrap();
        prop_assert_eq!(&same.0, &x);
        prop_assert_eq!(&same.1, &y);

        let target = ((y.len() as f64 * frac) as usize).max(2);
        let (xs, ys) = downsample_monotone(&x, &y, target).unwrap();
        prop_assert_eq!(xs.len(), target);
        prop_assert_eq!(ys[0], y[0]);
        prop_assert_eq!(*ys.last().unwrap(), *y.last().unwrap());
        let lo = y.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(ys.iter().all(|v| *v >= lo - 1e-9 && *v <= hi + 1e-9));
    }
}

#[test]
fn solution_without_cycles_is_one_cycle() {
    let samples: Vec<Sample> = (0..5).map(|i| sample(i as f64, 3.0)).collect();
    let sol = Solution::new(samples, Vec::new(), Vec::new(), StopReason::FinalTime);
    let (x, _) = plot_against_cycle(&sol, "Time [s]").unwrap();
    assert_eq!(x, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn graphs_against_cycle_share_one_axis() {
    let sol = cycled(3, 50);
    let graphs = plot_graphs_against_cycle(&sol, &["Voltage [V]", "Time [s]"], 40).unwrap();
    assert_eq!(graphs.len(), 3);
    assert_eq!(graphs[0].name, "Cycle");
    assert!(graphs.iter().all(|g| g.values.len() == 40));
    assert!(plot_graphs_against_cycle(&sol, &[], 40).is_err());
    assert!(plot_graphs_against_cycle(&sol, &["Nope"], 40).is_err());
}
