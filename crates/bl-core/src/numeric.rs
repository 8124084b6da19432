use crate::BlError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, BlError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(BlError::NonFinite { what, value: v })
    }
}

/// Finite and strictly positive.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, BlError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(BlError::InvalidArg { what })
    }
}

/// `n` evenly spaced points over `[start, stop]`, both ends included.
///
/// The last point is written as `stop` exactly so callers can rely on the
/// endpoint without float drift.
pub fn linspace(start: Real, stop: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as Real;
            let mut out: Vec<Real> = (0..n).map(|i| start + step * i as Real).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Index of the first maximum, `None` for empty input. NaNs are skipped.
pub fn argmax(values: &[Real]) -> Option<usize> {
    let mut best: Option<(usize, Real)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the first minimum, `None` for empty input. NaNs are skipped.
pub fn argmin(values: &[Real]) -> Option<usize> {
    let mut best: Option<(usize, Real)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn mean(values: &[Real]) -> Option<Real> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<Real>() / values.len() as Real)
    }
}
