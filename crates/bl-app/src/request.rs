//! Typed request bodies for the three labs.
//!
//! Field names are the bracketed labels the front-end sends. Unknown keys
//! are rejected so a misspelled field fails loudly instead of being ignored.

use bl_core::{ah, k, m, unitless};
use bl_params::Overrides;
use serde::{Deserialize, Serialize};

fn default_rates() -> Vec<f64> {
    vec![1.0]
}

fn one() -> usize {
    1
}

/// Charge and discharge sweeps at several C-rates plus a cycling run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lab1Request {
    /// Chemistry id; missing is treated like an unsupported one
    #[serde(rename = "Type", default)]
    pub chemistry: Option<String>,
    #[serde(rename = "Ambient temperature [K]", default)]
    pub temperature_k: Option<f64>,
    #[serde(rename = "Nominal cell capacity [A.h]", default)]
    pub capacity_ah: Option<f64>,
    #[serde(rename = "Positive electrode thickness [m]", default)]
    pub positive_electrode_thickness_m: Option<f64>,
    #[serde(rename = "C Rates", default = "default_rates")]
    pub c_rates: Vec<f64>,
    #[serde(rename = "Cycles", default = "one")]
    pub cycles: usize,
    /// Drive the solver with the fitted virtual rate instead of the requested one
    #[serde(rename = "Virtual C Rates", default)]
    pub virtual_c_rates: bool,
}

impl Lab1Request {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            temperature: self.temperature_k.map(k),
            capacity: self.capacity_ah.map(ah),
            positive_electrode_thickness: self.positive_electrode_thickness_m.map(m),
            dopant_fraction: None,
        }
    }
}

/// Two-phase (graphite and silicon) negative electrode under constant current.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lab2Request {
    #[serde(rename = "Ambient temperature [K]", default)]
    pub temperature_k: Option<f64>,
    /// Only the first rate is used
    #[serde(rename = "C Rates", default = "default_rates")]
    pub c_rates: Vec<f64>,
    /// Silicon share of the negative electrode as a fraction in [0, 1]
    #[serde(rename = "Silicon Percentage", default)]
    pub silicon_fraction: Option<f64>,
}

impl Default for Lab2Request {
    fn default() -> Self {
        Self {
            temperature_k: None,
            c_rates: default_rates(),
            silicon_fraction: None,
        }
    }
}

impl Lab2Request {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            temperature: self.temperature_k.map(k),
            dopant_fraction: self.silicon_fraction.map(unitless),
            ..Default::default()
        }
    }
}

/// User-defined cycling protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChargingProperties {
    #[serde(rename = "Charge C")]
    pub charge_c: f64,
    #[serde(rename = "Charge V")]
    pub charge_v: f64,
    #[serde(rename = "Hold V")]
    pub hold_v: f64,
    /// Hold ends when the current falls to this C-rate
    #[serde(rename = "Hold C")]
    pub hold_c: f64,
    /// Minutes
    #[serde(rename = "Rest T")]
    pub rest_min: f64,
    #[serde(rename = "Discharge C")]
    pub discharge_c: f64,
    #[serde(rename = "Discharge V")]
    pub discharge_v: f64,
    /// Minutes
    #[serde(rename = "Rest 2T")]
    pub rest2_min: f64,
    #[serde(rename = "Cycles")]
    pub cycles: usize,
}

impl Default for ChargingProperties {
    fn default() -> Self {
        Self {
            charge_c: 1.0,
            charge_v: 4.0,
            hold_v: 4.0,
            hold_c: 0.1,
            rest_min: 5.0,
            discharge_c: 1.0,
            discharge_v: 2.2,
            rest2_min: 5.0,
            cycles: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lab3Request {
    #[serde(rename = "Type", default)]
    pub chemistry: Option<String>,
    #[serde(rename = "Ambient temperature [K]", default)]
    pub temperature_k: Option<f64>,
    #[serde(rename = "Charging Properties", default)]
    pub charging: ChargingProperties,
}

impl Lab3Request {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            temperature: self.temperature_k.map(k),
            ..Default::default()
        }
    }
}
