//! Closed set of addressable physical quantities.

/// Scalar quantities a [`crate::ParameterSet`] exposes by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    AmbientTemperature,
    InitialTemperature,
    NominalCapacity,
    ElectrodeHeight,
    ElectrodeWidth,
    NegativeElectrodeThickness,
    PositiveElectrodeThickness,
    LowerVoltageCutoff,
    UpperVoltageCutoff,
    NegativeActiveFraction,
    PrimaryActiveFraction,
    SecondaryActiveFraction,
    PrimaryMaxConcentration,
    PrimaryInitialConcentration,
    PrimaryDiffusivity,
    SecondaryMaxConcentration,
    SecondaryInitialConcentration,
    SecondaryDiffusivity,
}

impl Quantity {
    pub const ALL: [Quantity; 18] = [
        Quantity::AmbientTemperature,
        Quantity::InitialTemperature,
        Quantity::NominalCapacity,
        Quantity::ElectrodeHeight,
        Quantity::ElectrodeWidth,
        Quantity::NegativeElectrodeThickness,
        Quantity::PositiveElectrodeThickness,
        Quantity::LowerVoltageCutoff,
        Quantity::UpperVoltageCutoff,
        Quantity::NegativeActiveFraction,
        Quantity::PrimaryActiveFraction,
        Quantity::SecondaryActiveFraction,
        Quantity::PrimaryMaxConcentration,
        Quantity::PrimaryInitialConcentration,
        Quantity::PrimaryDiffusivity,
        Quantity::SecondaryMaxConcentration,
        Quantity::SecondaryInitialConcentration,
        Quantity::SecondaryDiffusivity,
    ];

    /// Canonical bracketed name, units included.
    pub fn name(self) -> &'static str {
        match self {
            Quantity::AmbientTemperature => "Ambient temperature [K]",
            Quantity::InitialTemperature => "Initial temperature [K]",
            Quantity::NominalCapacity => "Nominal cell capacity [A.h]",
            Quantity::ElectrodeHeight => "Electrode height [m]",
            Quantity::ElectrodeWidth => "Electrode width [m]",
            Quantity::NegativeElectrodeThickness => "Negative electrode thickness [m]",
            Quantity::PositiveElectrodeThickness => "Positive electrode thickness [m]",
            Quantity::LowerVoltageCutoff => "Lower voltage cut-off [V]",
            Quantity::UpperVoltageCutoff => "Upper voltage cut-off [V]",
            Quantity::NegativeActiveFraction => {
                "Negative electrode active material volume fraction"
            }
            Quantity::PrimaryActiveFraction => {
                "Primary: Negative electrode active material volume fraction"
            }
            Quantity::SecondaryActiveFraction => {
                "Secondary: Negative electrode active material volume fraction"
            }
            Quantity::PrimaryMaxConcentration => {
                "Primary: Maximum concentration in negative electrode [mol.m-3]"
            }
            Quantity::PrimaryInitialConcentration => {
                "Primary: Initial concentration in negative electrode [mol.m-3]"
            }
            Quantity::PrimaryDiffusivity => "Primary: Negative electrode diffusivity [m2.s-1]",
            Quantity::SecondaryMaxConcentration => {
                "Secondary: Maximum concentration in negative electrode [mol.m-3]"
            }
            Quantity::SecondaryInitialConcentration => {
                "Secondary: Initial concentration in negative electrode [mol.m-3]"
            }
            Quantity::SecondaryDiffusivity => {
                "Secondary: Negative electrode diffusivity [m2.s-1]"
            }
        }
    }

    /// True for quantities that only exist on two-phase negative electrodes.
    pub fn is_composite_only(self) -> bool {
        matches!(
            self,
            Quantity::PrimaryActiveFraction
                | Quantity::SecondaryActiveFraction
                | Quantity::PrimaryMaxConcentration
                | Quantity::PrimaryInitialConcentration
                | Quantity::PrimaryDiffusivity
                | Quantity::SecondaryMaxConcentration
                | Quantity::SecondaryInitialConcentration
                | Quantity::SecondaryDiffusivity
        )
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = Quantity::ALL.iter().map(|q| q.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Quantity::ALL.len());
    }
}
