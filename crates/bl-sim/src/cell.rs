//! Reduced-order lumped cell model.
//!
//! Terminal voltage is an OCV source in series with an ohmic resistance, an
//! RC branch for solid diffusion and (for SPMe/DFN) an electrolyte
//! resistance. SEI growth consumes cyclable capacity, and a single thermal
//! node carries the cell temperature.
//!
//! Sign convention: positive current discharges the cell.

use bl_core::constants::{FARADAY, SECONDS_PER_HOUR, arrhenius};
use bl_params::ocv::silicon_hysteresis;
use bl_params::{NegativeElectrode, ParameterSet};
use nalgebra::DVector;

use crate::engine::{ModelKind, ModelSpec};
use crate::error::{SimError, SimResult};
use crate::model::TransientModel;
use crate::solution::Sample;

pub const SOC: usize = 0;
pub const ETA_DIFFUSION: usize = 1;
pub const SEI_LOSS: usize = 2;
pub const TEMPERATURE: usize = 3;
pub const THROUGHPUT: usize = 4;
pub const DISCHARGE: usize = 5;
pub const N_STATES: usize = 6;

/// Largest hold current as a multiple of 1C.
const MAX_HOLD_C_RATE: f64 = 5.0;

/// What the cell is being driven with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    Current(f64),
    Voltage(f64),
}

pub struct CellModel {
    params: ParameterSet,
    kind: ModelKind,
    control: Control,
    initial_soc: f64,
    usable_ah: f64,
    r0_ref_ohm: f64,
    rd_ohm: f64,
    re_ohm: f64,
    thermal_mass_j_per_k: f64,
    heat_transfer_w_per_k: f64,
    max_hold_current_a: f64,
    /// Storage shares of (primary, secondary) phases
    shares: (f64, f64),
    hysteresis_weight: f64,
    secondary_fraction: f64,
    initial_lithium_mol: f64,
}

impl CellModel {
    pub fn new(params: ParameterSet, spec: ModelSpec, initial_soc: f64) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&initial_soc) {
            return Err(SimError::InvalidArg {
                what: format!("initial SOC must lie in [0, 1], got {initial_soc}"),
            });
        }
        let (neg_phases, pos_phases) = spec.particle_phases;
        if !(1..=2).contains(&neg_phases) || pos_phases != 1 {
            return Err(SimError::InvalidArg {
                what: format!("unsupported particle phases ({neg_phases}, {pos_phases})"),
            });
        }
        let composite = match params.negative_electrode {
            NegativeElectrode::Composite(c) => Some(c),
            NegativeElectrode::Single(_) => None,
        };
        if neg_phases == 2 && composite.is_none() {
            return Err(SimError::InvalidArg {
                what: format!(
                    "two negative particle phases need a composite electrode, {} has one",
                    params.name
                ),
            });
        }

        let usable_ah = params.usable_capacity_ah();
        if !usable_ah.is_finite() || usable_ah <= 0.0 {
            return Err(SimError::NonPhysical {
                what: format!("usable capacity {usable_ah} A.h"),
            });
        }
        // resistances fall and heat capacity grows with electrode area
        let area_ratio = params.electrode_height_m / params.reference_height_m;
        let re_ohm = match spec.kind {
            ModelKind::Spm => 0.0,
            ModelKind::Spme | ModelKind::Dfn => params.electrolyte_resistance_ohm / area_ratio,
        };
        let (shares, hysteresis_weight) = match composite {
            Some(c) if neg_phases == 2 => {
                let shares = c.storage_shares();
                (shares, shares.1)
            }
            _ => ((1.0, 0.0), 0.0),
        };

        Ok(Self {
            kind: spec.kind,
            control: Control::Current(0.0),
            initial_soc,
            usable_ah,
            r0_ref_ohm: params.ohmic_resistance_ohm / area_ratio,
            rd_ohm: params.effective_diffusion_resistance_ohm() / area_ratio,
            re_ohm,
            thermal_mass_j_per_k: params.thermal_mass_j_per_k * area_ratio,
            heat_transfer_w_per_k: params.heat_transfer_w_per_k * area_ratio,
            max_hold_current_a: MAX_HOLD_C_RATE * params.nominal_capacity_ah,
            shares,
            hysteresis_weight,
            secondary_fraction: params.negative_electrode.secondary_fraction(),
            initial_lithium_mol: params.initial_lithium_mol(),
            params,
        })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn set_control(&mut self, control: Control) {
        self.control = control;
    }

    /// Capacity still available for cycling [A.h].
    pub fn remaining_capacity_ah(&self, x: &DVector<f64>) -> f64 {
        self.usable_ah - x[SEI_LOSS]
    }

    /// Negative electrode capacity [A.h]; SEI cracking takes half its loss
    /// out of the active material.
    pub fn negative_capacity_ah(&self, x: &DVector<f64>) -> f64 {
        1.1 * self.usable_ah - 0.5 * x[SEI_LOSS]
    }

    pub fn ocv(&self, x: &DVector<f64>) -> f64 {
        self.params.ocv.eval(x[SOC])
    }

    /// Ohmic resistance at temperature `t_k`.
    pub fn r0(&self, t_k: f64) -> f64 {
        self.r0_ref_ohm / arrhenius(self.params.resistance_activation_energy_j_mol, t_k)
    }

    /// Voltage shift of the silicon phase, signed by current direction.
    fn hysteresis(&self, x: &DVector<f64>, current_a: f64) -> f64 {
        if self.hysteresis_weight == 0.0 || current_a == 0.0 {
            return 0.0;
        }
        let sto = 0.02 + 0.9 * x[SOC].clamp(0.0, 1.0);
        -current_a.signum() * self.hysteresis_weight * silicon_hysteresis(sto)
    }

    /// Current drawn in state `x` under the present control.
    pub fn current(&self, x: &DVector<f64>) -> f64 {
        match self.control {
            Control::Current(i) => i,
            Control::Voltage(v) => {
                let r = self.r0(x[TEMPERATURE]) + self.re_ohm;
                let i = (self.ocv(x) - x[ETA_DIFFUSION] - v) / r;
                i.clamp(-self.max_hold_current_a, self.max_hold_current_a)
            }
        }
    }

    pub fn voltage_at(&self, x: &DVector<f64>, current_a: f64) -> f64 {
        let r = self.r0(x[TEMPERATURE]) + self.re_ohm;
        self.ocv(x) + self.hysteresis(x, current_a) - current_a * r - x[ETA_DIFFUSION]
    }

    pub fn voltage(&self, x: &DVector<f64>) -> f64 {
        self.voltage_at(x, self.current(x))
    }

    /// Interfacial current density of each negative phase [A/m^2].
    fn interfacial_current(&self, current_a: f64) -> (f64, f64) {
        let volume = self.params.electrode_area_m2() * self.params.negative_electrode_thickness_m;
        let per_phase = |share: f64, a: f64| {
            if share == 0.0 || a <= 0.0 {
                0.0
            } else {
                current_a * share / (volume * a)
            }
        };
        let primary = self.params.negative_electrode.primary().surface_area_density();
        let secondary = self
            .params
            .negative_electrode
            .secondary()
            .map(|p| p.surface_area_density())
            .unwrap_or(0.0);
        (
            per_phase(self.shares.0, primary),
            per_phase(self.shares.1, secondary),
        )
    }

    pub fn sample(&self, t: f64, x: &DVector<f64>) -> Sample {
        let current_a = self.current(x);
        let (j_primary, j_secondary) = self.interfacial_current(current_a);
        let to_mol = SECONDS_PER_HOUR / FARADAY;
        Sample {
            time_s: t,
            current_a,
            voltage_v: self.voltage_at(x, current_a),
            soc: x[SOC],
            temperature_k: x[TEMPERATURE],
            throughput_ah: x[THROUGHPUT],
            discharge_ah: x[DISCHARGE],
            sei_loss_ah: x[SEI_LOSS],
            negative_capacity_ah: self.negative_capacity_ah(x),
            j_primary_a_m2: j_primary,
            j_secondary_a_m2: j_secondary,
            lithium_mol: self.initial_lithium_mol - x[SEI_LOSS] * to_mol,
            negative_lithium_mol: x[SOC] * self.remaining_capacity_ah(x) * to_mol,
        }
    }
}

impl TransientModel for CellModel {
    type State = DVector<f64>;

    fn initial_state(&self) -> DVector<f64> {
        let mut x = DVector::zeros(N_STATES);
        x[SOC] = self.initial_soc;
        x[TEMPERATURE] = self.params.initial_temperature_k;
        x
    }

    fn rhs(&mut self, _t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        let remaining = self.remaining_capacity_ah(x);
        if remaining.is_nan() || remaining <= 0.0 {
            return Err(SimError::NonPhysical {
                what: format!("no cyclable capacity left ({remaining} A.h)"),
            });
        }
        let temp = x[TEMPERATURE];
        if temp.is_nan() || temp <= 0.0 {
            return Err(SimError::NonPhysical {
                what: format!("cell temperature {temp} K"),
            });
        }

        let i = self.current(x);
        let v = self.voltage_at(x, i);
        let ocv = self.ocv(x);
        let p = &self.params;

        let mut dx = DVector::zeros(N_STATES);
        dx[SOC] = -i / (SECONDS_PER_HOUR * remaining);
        dx[ETA_DIFFUSION] = (i * self.rd_ohm - x[ETA_DIFFUSION]) / p.diffusion_time_constant_s;

        let one_c = p.nominal_capacity_ah;
        let stress = 1.0 + 0.5 * i.abs() / one_c;
        let dopant = 1.0 + 3.0 * self.secondary_fraction;
        let passivation = 1.0 + x[SEI_LOSS] / (0.01 * self.usable_ah);
        dx[SEI_LOSS] = p.sei_rate_per_s
            * self.usable_ah
            * arrhenius(p.sei_activation_energy_j_mol, temp)
            * stress
            * dopant
            / passivation;

        let heat = i * (ocv - v);
        let cooling = self.heat_transfer_w_per_k * (temp - p.ambient_temperature_k);
        dx[TEMPERATURE] = (heat - cooling) / self.thermal_mass_j_per_k;

        dx[THROUGHPUT] = i.abs() / SECONDS_PER_HOUR;
        dx[DISCHARGE] = i / SECONDS_PER_HOUR;
        Ok(dx)
    }

    fn add(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        a + b
    }

    fn scale(&self, a: &DVector<f64>, scale: f64) -> DVector<f64> {
        a * scale
    }
}
