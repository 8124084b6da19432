//! Typed parameter sets.

use bl_core::constants::{FARADAY, SECONDS_PER_HOUR};
use bl_core::{Temperature, ensure_finite, ensure_positive, k};
use serde::Serialize;

use crate::catalog::Chemistry;
use crate::error::{ParamError, ParamResult};
use crate::ocv::OcvCurve;
use crate::quantity::Quantity;

/// One active-material phase of the negative electrode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Phase {
    pub active_fraction: f64,
    pub max_concentration_mol_m3: f64,
    pub initial_concentration_mol_m3: f64,
    pub diffusivity_m2_s: f64,
    pub particle_radius_m: f64,
}

impl Phase {
    /// Specific interfacial area [m^-1] of spherical particles.
    pub fn surface_area_density(&self) -> f64 {
        3.0 * self.active_fraction / self.particle_radius_m
    }

    /// Lithium storage capacity per unit electrode volume [mol/m^3].
    pub fn storage_density(&self) -> f64 {
        self.active_fraction * self.max_concentration_mol_m3
    }
}

/// Two-phase (e.g. graphite + silicon) negative electrode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CompositeElectrode {
    pub primary: Phase,
    pub secondary: Phase,
}

impl CompositeElectrode {
    /// Fraction of stored lithium held by each phase, `(primary, secondary)`.
    pub fn storage_shares(&self) -> (f64, f64) {
        let p = self.primary.storage_density();
        let s = self.secondary.storage_density();
        let total = p + s;
        if total > 0.0 {
            (p / total, s / total)
        } else {
            (1.0, 0.0)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum NegativeElectrode {
    Single(Phase),
    Composite(CompositeElectrode),
}

impl NegativeElectrode {
    pub fn primary(&self) -> &Phase {
        match self {
            NegativeElectrode::Single(p) => p,
            NegativeElectrode::Composite(c) => &c.primary,
        }
    }

    pub fn secondary(&self) -> Option<&Phase> {
        match self {
            NegativeElectrode::Single(_) => None,
            NegativeElectrode::Composite(c) => Some(&c.secondary),
        }
    }

    /// Volume fraction of the secondary phase, zero for single-phase electrodes.
    pub fn secondary_fraction(&self) -> f64 {
        self.secondary().map(|p| p.active_fraction).unwrap_or(0.0)
    }
}

/// A complete parameter set for one cell.
///
/// Built fresh per request from [`Chemistry::base_parameters`] and mutated
/// only through the configurator or [`ParameterSet::set`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParameterSet {
    pub chemistry: Chemistry,
    /// Name of the base set this was derived from
    pub name: &'static str,
    pub ambient_temperature_k: f64,
    pub initial_temperature_k: f64,
    /// Capacity used to convert C-rates into currents
    pub nominal_capacity_ah: f64,
    pub electrode_height_m: f64,
    pub electrode_width_m: f64,
    pub negative_electrode_thickness_m: f64,
    pub positive_electrode_thickness_m: f64,
    pub negative_electrode: NegativeElectrode,
    pub lower_voltage_cutoff_v: f64,
    pub upper_voltage_cutoff_v: f64,
    /// SOC used when an experiment does not pin one
    pub initial_soc: f64,
    pub ocv: OcvCurve,
    /// Series resistance at the reference temperature
    pub ohmic_resistance_ohm: f64,
    pub resistance_activation_energy_j_mol: f64,
    /// Solid-diffusion polarization branch (R || C)
    pub diffusion_resistance_ohm: f64,
    pub diffusion_time_constant_s: f64,
    /// Electrolyte polarization, ignored by single-particle models
    pub electrolyte_resistance_ohm: f64,
    /// SEI growth rate as a fraction of usable capacity per second
    pub sei_rate_per_s: f64,
    pub sei_activation_energy_j_mol: f64,
    pub thermal_mass_j_per_k: f64,
    pub heat_transfer_w_per_k: f64,
    /// Geometry and capacity the base set was fitted at
    pub reference_height_m: f64,
    pub reference_positive_thickness_m: f64,
    pub reference_usable_capacity_ah: f64,
}

impl ParameterSet {
    pub fn ambient_temperature(&self) -> Temperature {
        k(self.ambient_temperature_k)
    }

    pub fn electrode_area_m2(&self) -> f64 {
        self.electrode_height_m * self.electrode_width_m
    }

    /// Capacity the cell can actually deliver, from its geometry.
    pub fn usable_capacity_ah(&self) -> f64 {
        self.reference_usable_capacity_ah * (self.electrode_height_m / self.reference_height_m)
            * (self.positive_electrode_thickness_m / self.reference_positive_thickness_m)
    }

    /// Current [A] for a C-rate against the nominal capacity.
    pub fn c_rate_current(&self, c_rate: f64) -> f64 {
        c_rate * self.nominal_capacity_ah
    }

    /// Polarization resistance of the diffusion branch after thickness changes.
    pub fn effective_diffusion_resistance_ohm(&self) -> f64 {
        self.diffusion_resistance_ohm
            * (self.positive_electrode_thickness_m / self.reference_positive_thickness_m)
    }

    /// Cyclable lithium at construction [mol], with a 10% inventory excess.
    pub fn initial_lithium_mol(&self) -> f64 {
        1.1 * self.usable_capacity_ah() * SECONDS_PER_HOUR / FARADAY
    }

    pub fn get(&self, q: Quantity) -> Option<f64> {
        let composite = match &self.negative_electrode {
            NegativeElectrode::Composite(c) => Some(c),
            NegativeElectrode::Single(_) => None,
        };
        match q {
            Quantity::AmbientTemperature => Some(self.ambient_temperature_k),
            Quantity::InitialTemperature => Some(self.initial_temperature_k),
            Quantity::NominalCapacity => Some(self.nominal_capacity_ah),
            Quantity::ElectrodeHeight => Some(self.electrode_height_m),
            Quantity::ElectrodeWidth => Some(self.electrode_width_m),
            Quantity::NegativeElectrodeThickness => Some(self.negative_electrode_thickness_m),
            Quantity::PositiveElectrodeThickness => Some(self.positive_electrode_thickness_m),
            Quantity::LowerVoltageCutoff => Some(self.lower_voltage_cutoff_v),
            Quantity::UpperVoltageCutoff => Some(self.upper_voltage_cutoff_v),
            Quantity::NegativeActiveFraction => match &self.negative_electrode {
                NegativeElectrode::Single(p) => Some(p.active_fraction),
                NegativeElectrode::Composite(c) => {
                    Some(c.primary.active_fraction + c.secondary.active_fraction)
                }
            },
            Quantity::PrimaryActiveFraction => composite.map(|c| c.primary.active_fraction),
            Quantity::SecondaryActiveFraction => composite.map(|c| c.secondary.active_fraction),
            Quantity::PrimaryMaxConcentration => {
                composite.map(|c| c.primary.max_concentration_mol_m3)
            }
            Quantity::PrimaryInitialConcentration => {
                composite.map(|c| c.primary.initial_concentration_mol_m3)
            }
            Quantity::PrimaryDiffusivity => composite.map(|c| c.primary.diffusivity_m2_s),
            Quantity::SecondaryMaxConcentration => {
                composite.map(|c| c.secondary.max_concentration_mol_m3)
            }
            Quantity::SecondaryInitialConcentration => {
                composite.map(|c| c.secondary.initial_concentration_mol_m3)
            }
            Quantity::SecondaryDiffusivity => composite.map(|c| c.secondary.diffusivity_m2_s),
        }
    }

    /// Set one scalar quantity, validating its domain.
    ///
    /// Composite-only quantities fail with `NotApplicable` on single-phase
    /// electrodes; use [`ParameterSet::make_composite`] first.
    pub fn set(&mut self, q: Quantity, value: f64) -> ParamResult<()> {
        let value = ensure_finite(value, q.name())?;
        if matches!(
            q,
            Quantity::NegativeActiveFraction
                | Quantity::PrimaryActiveFraction
                | Quantity::SecondaryActiveFraction
        ) {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamError::InvalidParameter {
                    what: format!("{} must lie in [0, 1], got {}", q.name(), value),
                });
            }
        } else {
            ensure_positive(value, q.name())?;
        }

        let set_name = self.name;
        let composite = match &mut self.negative_electrode {
            NegativeElectrode::Composite(c) => Some(c),
            NegativeElectrode::Single(_) => None,
        };
        if q.is_composite_only() && composite.is_none() {
            return Err(ParamError::NotApplicable {
                quantity: q.name(),
                set: set_name,
            });
        }

        match q {
            Quantity::AmbientTemperature => self.ambient_temperature_k = value,
            Quantity::InitialTemperature => self.initial_temperature_k = value,
            Quantity::NominalCapacity => self.nominal_capacity_ah = value,
            Quantity::ElectrodeHeight => self.electrode_height_m = value,
            Quantity::ElectrodeWidth => self.electrode_width_m = value,
            Quantity::NegativeElectrodeThickness => self.negative_electrode_thickness_m = value,
            Quantity::PositiveElectrodeThickness => self.positive_electrode_thickness_m = value,
            Quantity::LowerVoltageCutoff => {
                if value >= self.upper_voltage_cutoff_v {
                    return Err(ParamError::InvalidParameter {
                        what: "lower voltage cut-off must be below the upper cut-off".into(),
                    });
                }
                self.lower_voltage_cutoff_v = value
            }
            Quantity::UpperVoltageCutoff => {
                if value <= self.lower_voltage_cutoff_v {
                    return Err(ParamError::InvalidParameter {
                        what: "upper voltage cut-off must be above the lower cut-off".into(),
                    });
                }
                self.upper_voltage_cutoff_v = value
            }
            Quantity::NegativeActiveFraction => match &mut self.negative_electrode {
                NegativeElectrode::Single(p) => p.active_fraction = value,
                NegativeElectrode::Composite(_) => {
                    return Err(ParamError::NotApplicable {
                        quantity: q.name(),
                        set: set_name,
                    });
                }
            },
            other => {
                // composite-only, presence checked above
                if let Some(c) = composite {
                    match other {
                        Quantity::PrimaryActiveFraction => c.primary.active_fraction = value,
                        Quantity::SecondaryActiveFraction => c.secondary.active_fraction = value,
                        Quantity::PrimaryMaxConcentration => {
                            c.primary.max_concentration_mol_m3 = value
                        }
                        Quantity::PrimaryInitialConcentration => {
                            c.primary.initial_concentration_mol_m3 = value
                        }
                        Quantity::PrimaryDiffusivity => c.primary.diffusivity_m2_s = value,
                        Quantity::SecondaryMaxConcentration => {
                            c.secondary.max_concentration_mol_m3 = value
                        }
                        Quantity::SecondaryInitialConcentration => {
                            c.secondary.initial_concentration_mol_m3 = value
                        }
                        Quantity::SecondaryDiffusivity => c.secondary.diffusivity_m2_s = value,
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// Turn a single-phase negative electrode into a two-phase one.
    ///
    /// The existing phase becomes the primary phase; the secondary phase
    /// gets silicon-like defaults and zero volume fraction. No-op on
    /// electrodes that are already composite.
    pub fn make_composite(&mut self) {
        if let NegativeElectrode::Single(primary) = self.negative_electrode {
            self.negative_electrode = NegativeElectrode::Composite(CompositeElectrode {
                primary,
                secondary: Phase {
                    active_fraction: 0.0,
                    max_concentration_mol_m3: 278_000.0,
                    initial_concentration_mol_m3: 276_610.0,
                    diffusivity_m2_s: 1.67e-14,
                    particle_radius_m: 1.52e-6,
                },
            });
        }
    }
}
