//! Shaping of solver output into plot-ready series.

use bl_core::{argmax, argmin, linspace, mean};
use bl_sim::{CycleView, Solution};

use crate::types::GraphEntry;
use crate::{ResultsError, ResultsResult};

/// Largest series the front-end is sent without downsampling.
pub const DEFAULT_POINT_CAP: usize = 8100;

/// One variable's full time series.
pub fn extract(solution: &Solution, name: &str) -> ResultsResult<Vec<f64>> {
    Ok(solution.get(name)?)
}

/// Concatenate a variable over all cycles against a cycle axis.
///
/// The samples of cycle `i` (0-based) are spread evenly over `[i, i + 1]`,
/// so x is non-decreasing and spans `[0, n_cycles]`. A solution without
/// cycles is treated as one cycle.
pub fn plot_against_cycle(solution: &Solution, name: &str) -> ResultsResult<(Vec<f64>, Vec<f64>)> {
    let cycles: Vec<CycleView<'_>> = solution.cycles().collect();
    if cycles.is_empty() {
        let values = extract(solution, name)?;
        let x = linspace(0.0, 1.0, values.len());
        return Ok((x, values));
    }
    let mut x = Vec::with_capacity(solution.len());
    let mut values = Vec::with_capacity(solution.len());
    for (i, cycle) in cycles.iter().enumerate() {
        let v = cycle.get(name)?;
        x.extend(linspace(i as f64, (i + 1) as f64, v.len()));
        values.extend(v);
    }
    Ok((x, values))
}

/// Fritsch-Carlson slopes for unit-spaced knots.
fn pchip_slopes(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let delta: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    if n == 2 {
        return vec![delta[0], delta[0]];
    }
    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (a, b) = (delta[k - 1], delta[k]);
        if a * b > 0.0 {
            d[k] = 2.0 / (1.0 / a + 1.0 / b);
        }
    }
    let end = |d0: f64, d1: f64| {
        let s = (3.0 * d0 - d1) / 2.0;
        if s.signum() != d0.signum() || d0 == 0.0 {
            0.0
        } else if d0.signum() != d1.signum() && s.abs() > 3.0 * d0.abs() {
            3.0 * d0
        } else {
            s
        }
    };
    d[0] = end(delta[0], delta[1]);
    d[n - 1] = end(delta[n - 2], delta[n - 3]);
    d
}

fn pchip_eval(y: &[f64], d: &[f64], u: f64) -> f64 {
    let last = y.len() - 1;
    let k = (u.floor().max(0.0) as usize).min(last - 1);
    let t = u - k as f64;
    if t == 0.0 {
        return y[k];
    }
    if t == 1.0 {
        return y[k + 1];
    }
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * y[k] + h10 * d[k] + h01 * y[k + 1] + h11 * d[k + 1]
}

/// Resample `y` to `target` points along its sample index.
fn resample(y: &[f64], target: usize) -> Vec<f64> {
    match y.len() {
        0 => Vec::new(),
        1 => vec![y[0]; target],
        n => {
            let d = pchip_slopes(y);
            let span = (n - 1) as f64;
            let denom = (target.max(2) - 1) as f64;
            (0..target)
                .map(|k| {
                    if k + 1 == target {
                        y[n - 1]
                    } else {
                        pchip_eval(y, &d, k as f64 * span / denom)
                    }
                })
                .collect()
        }
    }
}

/// Monotone cubic (PCHIP) resampling of a paired series to `target` points.
///
/// Both series are interpolated against sample index, so the pairing is
/// kept. Identity when `target == len`; endpoints are kept exactly and
/// monotone runs stay monotone.
pub fn downsample_monotone(
    x: &[f64],
    y: &[f64],
    target: usize,
) -> ResultsResult<(Vec<f64>, Vec<f64>)> {
    if x.len() != y.len() {
        return Err(ResultsError::LengthMismatch {
            what: "downsample input",
            left: x.len(),
            right: y.len(),
        });
    }
    if target == 0 {
        return Err(ResultsError::InvalidArg {
            what: "downsample target must be positive",
        });
    }
    if target == x.len() {
        return Ok((x.to_vec(), y.to_vec()));
    }
    if target == 1 {
        return Ok((x.first().copied().into_iter().collect(), y.first().copied().into_iter().collect()));
    }
    Ok((resample(x, target), resample(y, target)))
}

/// Downsample only when the series is longer than `cap`.
pub fn cap_points(x: &[f64], y: &[f64], cap: usize) -> ResultsResult<(Vec<f64>, Vec<f64>)> {
    if x.len() > cap {
        downsample_monotone(x, y, cap)
    } else if x.len() != y.len() {
        Err(ResultsError::LengthMismatch {
            what: "cap input",
            left: x.len(),
            right: y.len(),
        })
    } else {
        Ok((x.to_vec(), y.to_vec()))
    }
}

/// Means of consecutive buckets of `bucket` samples; the last bucket may be short.
pub fn average_chunks(a: &[f64], bucket: usize) -> Vec<f64> {
    a.chunks(bucket.max(1)).filter_map(mean).collect()
}

/// [`average_chunks`] with about a hundred buckets.
pub fn average_array(a: &[f64]) -> Vec<f64> {
    average_chunks(a, (a.len() / 100).max(1))
}

/// A shared "Cycle" axis followed by one graph per variable, all capped.
pub fn plot_graphs_against_cycle(
    solution: &Solution,
    names: &[&str],
    cap: usize,
) -> ResultsResult<Vec<GraphEntry>> {
    let Some((first, rest)) = names.split_first() else {
        return Err(ResultsError::InvalidArg {
            what: "at least one variable is needed",
        });
    };
    let (x, y0) = plot_against_cycle(solution, first)?;
    let (x_capped, y0) = cap_points(&x, &y0, cap)?;
    let mut graphs = vec![
        GraphEntry::new("Cycle", x_capped),
        GraphEntry::new(*first, y0),
    ];
    for name in rest {
        let (_, y) = plot_against_cycle(solution, name)?;
        let (_, y) = cap_points(&x, &y, cap)?;
        graphs.push(GraphEntry::new(*name, y));
    }
    Ok(graphs)
}

/// Split at the first maximum; the peak belongs to both halves.
pub fn split_at_peak(a: &[f64]) -> (Vec<f64>, Vec<f64>) {
    match argmax(a) {
        Some(i) => (a[..=i].to_vec(), a[i..].to_vec()),
        None => (Vec::new(), Vec::new()),
    }
}

/// Split at the first minimum; the valley belongs to both halves.
pub fn split_at_valley(a: &[f64]) -> (Vec<f64>, Vec<f64>) {
    match argmin(a) {
        Some(i) => (a[..=i].to_vec(), a[i..].to_vec()),
        None => (Vec::new(), Vec::new()),
    }
}

/// A paired (x, voltage) segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    pub x: Vec<f64>,
    pub voltage: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleSegments {
    pub charge: Segment,
    pub discharge: Segment,
    pub rest: Segment,
}

/// Currents smaller than this carry no charge/discharge sign.
const CURRENT_TOL_A: f64 = 1e-9;

/// Split one cycle into charge, discharge and trailing rest using the sign
/// of the current (positive discharges).
///
/// Charge runs from the first sample to the last charging sample before
/// discharge starts, so a constant-voltage hold and the charge cutoff stay
/// on the charge side. Discharge is the run of discharging samples and the
/// rest is whatever follows it. A trace with no current sign at all is
/// split at its voltage peak and the valley after it.
pub fn split_cycle(x: &[f64], voltage: &[f64], current: &[f64]) -> ResultsResult<CycleSegments> {
    for (what, len) in [("cycle series", x.len()), ("cycle current", current.len())] {
        if len != voltage.len() {
            return Err(ResultsError::LengthMismatch {
                what,
                left: len,
                right: voltage.len(),
            });
        }
    }
    let n = voltage.len();
    if n == 0 {
        return Ok(CycleSegments::default());
    }
    let segment = |from: usize, to: usize| Segment {
        x: x[from..=to].to_vec(),
        voltage: voltage[from..=to].to_vec(),
    };
    let discharging = |i: &usize| current[*i] > CURRENT_TOL_A;
    let last_charging = |before: usize| (0..before).rev().find(|&i| current[i] < -CURRENT_TOL_A);

    let Some(start) = (0..n).find(discharging) else {
        return Ok(match last_charging(n) {
            Some(end) => CycleSegments {
                charge: segment(0, end),
                discharge: Segment::default(),
                rest: segment(end, n - 1),
            },
            None => split_at_extrema(x, voltage),
        });
    };
    let end = (start..n).take_while(discharging).last().unwrap_or(start);
    Ok(CycleSegments {
        charge: last_charging(start)
            .map(|last| segment(0, last))
            .unwrap_or_default(),
        discharge: segment(start, end),
        rest: segment(end, n - 1),
    })
}

/// Peak (end of charge) and the valley after it (end of discharge).
fn split_at_extrema(x: &[f64], voltage: &[f64]) -> CycleSegments {
    let Some(peak) = argmax(voltage) else {
        return CycleSegments::default();
    };
    let valley = peak + argmin(&voltage[peak..]).unwrap_or(0);
    let segment = |from: usize, to: usize| Segment {
        x: x[from..=to].to_vec(),
        voltage: voltage[from..=to].to_vec(),
    };
    CycleSegments {
        charge: segment(0, peak),
        discharge: segment(peak, valley),
        rest: segment(valley, voltage.len() - 1),
    }
}

/// `a[i] - a[0]`.
pub fn normalize_start(a: &[f64]) -> Vec<f64> {
    match a.first() {
        Some(&a0) => a.iter().map(|v| v - a0).collect(),
        None => Vec::new(),
    }
}
