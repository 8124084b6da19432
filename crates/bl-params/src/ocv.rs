//! Open-circuit voltage curves.
//!
//! Cell OCV is a smooth function of state of charge with an exponential
//! knee at each end. The silicon OCP fits are the Mark2016 lithiation and
//! delithiation polynomials used for the secondary phase of composite
//! negative electrodes.

use serde::Serialize;

/// `U(s) = e0 + e1*s - a*exp(-s/tau0) + b*exp((s-1)/tau1)`, with `s` clamped to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OcvCurve {
    pub e0: f64,
    pub e1: f64,
    pub a: f64,
    pub tau0: f64,
    pub b: f64,
    pub tau1: f64,
}

impl OcvCurve {
    pub fn eval(&self, soc: f64) -> f64 {
        let s = soc.clamp(0.0, 1.0);
        self.e0 + self.e1 * s - self.a * (-s / self.tau0).exp()
            + self.b * ((s - 1.0) / self.tau1).exp()
    }
}

fn horner(coeffs: &[f64; 8], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, c| acc * x + c)
}

/// Silicon OCP on lithiation [V]; the fit is valid for 0 < sto < 1.
pub fn silicon_ocp_lithiation(sto: f64) -> f64 {
    const P: [f64; 8] = [
        -96.63, 372.6, -587.6, 489.9, -232.8, 62.99, -9.286, 0.8633,
    ];
    horner(&P, sto.clamp(0.0, 1.0))
}

/// Silicon OCP on delithiation [V]; the fit is valid for 0 < sto < 1.
pub fn silicon_ocp_delithiation(sto: f64) -> f64 {
    const P: [f64; 8] = [
        -51.02, 161.3, -205.7, 140.2, -58.76, 16.87, -3.792, 0.9937,
    ];
    horner(&P, sto.clamp(0.0, 1.0))
}

/// Half the lithiation/delithiation gap at `sto`, i.e. the voltage shift a
/// pure silicon phase adds on top of the mean OCP.
pub fn silicon_hysteresis(sto: f64) -> f64 {
    0.5 * (silicon_ocp_delithiation(sto) - silicon_ocp_lithiation(sto))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NMC_LIKE: OcvCurve = OcvCurve {
        e0: 3.45,
        e1: 0.6,
        a: 0.7,
        tau0: 0.04,
        b: 0.15,
        tau1: 0.05,
    };

    #[test]
    fn ocv_is_increasing() {
        let mut prev = NMC_LIKE.eval(0.0);
        for i in 1..=100 {
            let v = NMC_LIKE.eval(i as f64 / 100.0);
            assert!(v > prev);
            prev = v;
        }
    }

    #[test]
    fn ocv_clamps_outside_unit_interval() {
        assert_eq!(NMC_LIKE.eval(-0.5), NMC_LIKE.eval(0.0));
        assert_eq!(NMC_LIKE.eval(1.5), NMC_LIKE.eval(1.0));
    }

    #[test]
    fn silicon_fits_match_reference_points() {
        assert!((silicon_ocp_lithiation(0.0) - 0.8633).abs() < 1e-12);
        assert!((silicon_ocp_delithiation(0.0) - 0.9937).abs() < 1e-12);
        // delithiation sits above lithiation mid-range
        assert!(silicon_hysteresis(0.5) > 0.1);
        assert!(silicon_hysteresis(0.5) < 0.15);
    }
}
