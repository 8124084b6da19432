//! Catalogue of supported cell chemistries and their base parameter sets.

use serde::Serialize;

use crate::error::{ParamError, ParamResult};
use crate::ocv::OcvCurve;
use crate::set::{CompositeElectrode, NegativeElectrode, ParameterSet, Phase};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Chemistry {
    Nmc,
    Nca,
    Lfp,
    LgM50,
    Silicon,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChemistryEntry {
    pub chemistry: Chemistry,
    pub canonical_id: &'static str,
    /// Name of the published parameter set the base values follow
    pub parameter_set: &'static str,
    pub aliases: &'static [&'static str],
    /// Fitted factor applied when a capacity override rescales electrode height
    pub capacity_correction: f64,
}

impl ChemistryEntry {
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.canonical_id.eq_ignore_ascii_case(query)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(query))
    }
}

const CATALOG: [ChemistryEntry; 5] = [
    ChemistryEntry {
        chemistry: Chemistry::Nmc,
        canonical_id: "NMC",
        parameter_set: "Mohtat2020",
        aliases: &["NMC532"],
        // delivered 4.8 A.h against 5 A.h nominal
        capacity_correction: 5.0 / 4.8,
    },
    ChemistryEntry {
        chemistry: Chemistry::Nca,
        canonical_id: "NCA",
        parameter_set: "NCA_Kim2011",
        aliases: &[],
        capacity_correction: 1.0,
    },
    ChemistryEntry {
        chemistry: Chemistry::Lfp,
        canonical_id: "LFP",
        parameter_set: "Prada2013",
        aliases: &[],
        capacity_correction: 1.0,
    },
    ChemistryEntry {
        chemistry: Chemistry::LgM50,
        canonical_id: "LG M50",
        parameter_set: "OKane2022",
        aliases: &["LGM50"],
        capacity_correction: 1.0,
    },
    ChemistryEntry {
        chemistry: Chemistry::Silicon,
        canonical_id: "Silicon",
        parameter_set: "Chen2020_composite",
        aliases: &[],
        capacity_correction: 1.0,
    },
];

pub fn catalog() -> &'static [ChemistryEntry] {
    &CATALOG
}

/// Resolve a user-facing chemistry name.
pub fn lookup(name: &str) -> ParamResult<&'static ChemistryEntry> {
    CATALOG
        .iter()
        .find(|entry| entry.matches(name))
        .ok_or_else(|| ParamError::UnsupportedChemistry {
            name: name.to_string(),
        })
}

const GRAPHITE: Phase = Phase {
    active_fraction: 0.75,
    max_concentration_mol_m3: 33_133.0,
    initial_concentration_mol_m3: 29_866.0,
    diffusivity_m2_s: 3.3e-14,
    particle_radius_m: 5.86e-6,
};

impl Chemistry {
    pub fn entry(self) -> &'static ChemistryEntry {
        let index = match self {
            Chemistry::Nmc => 0,
            Chemistry::Nca => 1,
            Chemistry::Lfp => 2,
            Chemistry::LgM50 => 3,
            Chemistry::Silicon => 4,
        };
        &CATALOG[index]
    }

    pub fn id(self) -> &'static str {
        self.entry().canonical_id
    }

    /// Fresh copy of the base parameter set for this chemistry.
    pub fn base_parameters(self) -> ParameterSet {
        let entry = self.entry();
        match self {
            Chemistry::Nmc => ParameterSet {
                chemistry: self,
                name: entry.parameter_set,
                ambient_temperature_k: 298.15,
                initial_temperature_k: 298.15,
                nominal_capacity_ah: 5.0,
                electrode_height_m: 0.2,
                electrode_width_m: 0.335,
                negative_electrode_thickness_m: 8.2e-5,
                positive_electrode_thickness_m: 6.7e-5,
                negative_electrode: NegativeElectrode::Single(Phase {
                    active_fraction: 0.61,
                    max_concentration_mol_m3: 28_746.0,
                    initial_concentration_mol_m3: 48.8682,
                    diffusivity_m2_s: 5.0e-13,
                    particle_radius_m: 1.0e-5,
                }),
                lower_voltage_cutoff_v: 2.8,
                upper_voltage_cutoff_v: 4.2,
                initial_soc: 0.0,
                ocv: OcvCurve {
                    e0: 3.45,
                    e1: 0.6,
                    a: 0.7,
                    tau0: 0.04,
                    b: 0.15,
                    tau1: 0.05,
                },
                ohmic_resistance_ohm: 0.015,
                resistance_activation_energy_j_mol: 30_000.0,
                diffusion_resistance_ohm: 0.01,
                diffusion_time_constant_s: 400.0,
                electrolyte_resistance_ohm: 0.006,
                sei_rate_per_s: 5.0e-8,
                sei_activation_energy_j_mol: 40_000.0,
                thermal_mass_j_per_k: 110.0,
                heat_transfer_w_per_k: 0.3,
                reference_height_m: 0.2,
                reference_positive_thickness_m: 6.7e-5,
                reference_usable_capacity_ah: 4.8,
            },
            Chemistry::Nca => ParameterSet {
                chemistry: self,
                name: entry.parameter_set,
                ambient_temperature_k: 298.15,
                initial_temperature_k: 298.15,
                nominal_capacity_ah: 0.43,
                electrode_height_m: 0.1,
                electrode_width_m: 0.06,
                negative_electrode_thickness_m: 5.0e-5,
                positive_electrode_thickness_m: 3.6e-5,
                negative_electrode: NegativeElectrode::Single(Phase {
                    active_fraction: 0.51,
                    max_concentration_mol_m3: 28_700.0,
                    initial_concentration_mol_m3: 18_081.0,
                    diffusivity_m2_s: 9.0e-14,
                    particle_radius_m: 2.0e-6,
                }),
                lower_voltage_cutoff_v: 2.7,
                upper_voltage_cutoff_v: 4.2,
                initial_soc: 1.0,
                ocv: OcvCurve {
                    e0: 3.4,
                    e1: 0.65,
                    a: 0.8,
                    tau0: 0.04,
                    b: 0.15,
                    tau1: 0.05,
                },
                ohmic_resistance_ohm: 0.1,
                resistance_activation_energy_j_mol: 28_000.0,
                diffusion_resistance_ohm: 0.08,
                diffusion_time_constant_s: 300.0,
                electrolyte_resistance_ohm: 0.04,
                sei_rate_per_s: 6.0e-8,
                sei_activation_energy_j_mol: 40_000.0,
                thermal_mass_j_per_k: 10.0,
                heat_transfer_w_per_k: 0.05,
                reference_height_m: 0.1,
                reference_positive_thickness_m: 3.6e-5,
                reference_usable_capacity_ah: 0.43,
            },
            Chemistry::Lfp => ParameterSet {
                chemistry: self,
                name: entry.parameter_set,
                ambient_temperature_k: 298.15,
                initial_temperature_k: 298.15,
                nominal_capacity_ah: 2.3,
                electrode_height_m: 0.6,
                electrode_width_m: 0.06,
                negative_electrode_thickness_m: 3.4e-5,
                positive_electrode_thickness_m: 8.0e-5,
                negative_electrode: NegativeElectrode::Single(Phase {
                    active_fraction: 0.58,
                    max_concentration_mol_m3: 30_555.0,
                    initial_concentration_mol_m3: 24_000.0,
                    diffusivity_m2_s: 3.0e-15,
                    particle_radius_m: 5.0e-6,
                }),
                lower_voltage_cutoff_v: 2.0,
                upper_voltage_cutoff_v: 3.6,
                initial_soc: 1.0,
                ocv: OcvCurve {
                    e0: 3.25,
                    e1: 0.1,
                    a: 0.8,
                    tau0: 0.03,
                    b: 0.25,
                    tau1: 0.03,
                },
                ohmic_resistance_ohm: 0.012,
                resistance_activation_energy_j_mol: 25_000.0,
                diffusion_resistance_ohm: 0.01,
                diffusion_time_constant_s: 500.0,
                electrolyte_resistance_ohm: 0.005,
                sei_rate_per_s: 3.0e-8,
                sei_activation_energy_j_mol: 40_000.0,
                thermal_mass_j_per_k: 70.0,
                heat_transfer_w_per_k: 0.2,
                reference_height_m: 0.6,
                reference_positive_thickness_m: 8.0e-5,
                reference_usable_capacity_ah: 2.3,
            },
            Chemistry::LgM50 => ParameterSet {
                chemistry: self,
                name: entry.parameter_set,
                ambient_temperature_k: 298.15,
                initial_temperature_k: 298.15,
                nominal_capacity_ah: 5.0,
                electrode_height_m: 0.065,
                electrode_width_m: 1.58,
                negative_electrode_thickness_m: 8.52e-5,
                positive_electrode_thickness_m: 7.56e-5,
                negative_electrode: NegativeElectrode::Single(GRAPHITE),
                lower_voltage_cutoff_v: 2.5,
                upper_voltage_cutoff_v: 4.2,
                initial_soc: 1.0,
                ocv: OcvCurve {
                    e0: 3.4,
                    e1: 0.65,
                    a: 0.9,
                    tau0: 0.04,
                    b: 0.15,
                    tau1: 0.05,
                },
                ohmic_resistance_ohm: 0.02,
                resistance_activation_energy_j_mol: 30_000.0,
                diffusion_resistance_ohm: 0.012,
                diffusion_time_constant_s: 350.0,
                electrolyte_resistance_ohm: 0.008,
                sei_rate_per_s: 5.0e-8,
                sei_activation_energy_j_mol: 38_000.0,
                thermal_mass_j_per_k: 75.0,
                heat_transfer_w_per_k: 0.25,
                reference_height_m: 0.065,
                reference_positive_thickness_m: 7.56e-5,
                reference_usable_capacity_ah: 5.0,
            },
            Chemistry::Silicon => {
                let mut set = Chemistry::LgM50.base_parameters();
                set.chemistry = self;
                set.name = entry.parameter_set;
                set.negative_electrode = NegativeElectrode::Composite(CompositeElectrode {
                    primary: Phase {
                        active_fraction: 0.735,
                        ..GRAPHITE
                    },
                    secondary: Phase {
                        active_fraction: 0.015,
                        max_concentration_mol_m3: 278_000.0,
                        initial_concentration_mol_m3: 276_610.0,
                        diffusivity_m2_s: 1.67e-14,
                        particle_radius_m: 1.52e-6,
                    },
                });
                set.sei_rate_per_s = 6.0e-8;
                set
            }
        }
    }
}

impl std::fmt::Display for Chemistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id_and_alias() {
        assert_eq!(lookup("NMC").unwrap().chemistry, Chemistry::Nmc);
        assert_eq!(lookup("NMC532").unwrap().chemistry, Chemistry::Nmc);
        assert_eq!(lookup("lg m50").unwrap().chemistry, Chemistry::LgM50);
        assert_eq!(lookup("Silicon").unwrap().parameter_set, "Chen2020_composite");
    }

    #[test]
    fn every_chemistry_resolves_to_its_own_entry() {
        for entry in catalog() {
            assert_eq!(entry.chemistry.entry(), entry);
        }
        assert_eq!(Chemistry::Silicon.id(), "Silicon");
        assert_eq!(Chemistry::Nca.entry().parameter_set, "NCA_Kim2011");
    }

    #[test]
    fn unknown_chemistry_is_unsupported() {
        let err = lookup("Sodium").unwrap_err();
        assert!(matches!(err, ParamError::UnsupportedChemistry { .. }));
    }

    #[test]
    fn base_sets_are_self_consistent() {
        for entry in catalog() {
            let p = entry.chemistry.base_parameters();
            assert_eq!(p.chemistry, entry.chemistry);
            assert_eq!(p.name, entry.parameter_set);
            assert!(p.lower_voltage_cutoff_v < p.upper_voltage_cutoff_v);
            assert!(p.usable_capacity_ah() > 0.0);
            assert!(p.ocv.eval(0.0) < p.ocv.eval(1.0));
        }
    }

    #[test]
    fn only_nmc_has_a_fitted_correction() {
        for entry in catalog() {
            if entry.chemistry == Chemistry::Nmc {
                assert!(entry.capacity_correction > 1.0);
            } else {
                assert_eq!(entry.capacity_correction, 1.0);
            }
        }
    }
}
