//! uom quantities and the constants of the cell model.

use uom::si::f64::{
    ElectricCharge as UomElectricCharge, Length as UomLength, Ratio as UomRatio,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Quantities accepted at the parameter override boundary (SI, f64)
pub type Charge = UomElectricCharge;
pub type Length = UomLength;
pub type Ratio = UomRatio;
pub type Temperature = UomThermodynamicTemperature;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn ah(v: f64) -> Charge {
    use uom::si::electric_charge::ampere_hour;
    Charge::new::<ampere_hour>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

/// Amp-hours held by a charge quantity.
#[inline]
pub fn to_ah(q: Charge) -> f64 {
    use uom::si::electric_charge::ampere_hour;
    q.get::<ampere_hour>()
}

#[inline]
pub fn to_kelvin(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    t.get::<kelvin>()
}

#[inline]
pub fn to_meters(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

#[inline]
pub fn to_ratio(r: Ratio) -> f64 {
    use uom::si::ratio::ratio;
    r.get::<ratio>()
}

pub mod constants {
    /// Faraday constant [C/mol]
    pub const FARADAY: f64 = 96_485.332_12;
    /// Molar gas constant [J/(mol K)]
    pub const GAS_CONSTANT: f64 = 8.314_462_618;
    /// Reference temperature for Arrhenius scalings [K]
    pub const T_REF_K: f64 = 298.15;
    /// 0 degC in kelvin
    pub const ZERO_CELSIUS_K: f64 = 273.15;
    pub const SECONDS_PER_HOUR: f64 = 3600.0;

    /// Arrhenius factor relative to `T_REF_K`.
    #[inline]
    pub fn arrhenius(activation_energy_j_mol: f64, t_k: f64) -> f64 {
        (activation_energy_j_mol / GAS_CONSTANT * (1.0 / T_REF_K - 1.0 / t_k)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_accessors() {
        assert!((to_ah(ah(5.0)) - 5.0).abs() < 1e-12);
        assert!((to_kelvin(k(298.0)) - 298.0).abs() < 1e-12);
        assert!((to_meters(m(1e-4)) - 1e-4).abs() < 1e-18);
        assert!((to_ratio(unitless(0.2)) - 0.2).abs() < 1e-15);
    }

    #[test]
    fn arrhenius_is_one_at_reference() {
        assert!((constants::arrhenius(30_000.0, constants::T_REF_K) - 1.0).abs() < 1e-12);
        assert!(constants::arrhenius(30_000.0, 318.15) > 1.0);
    }
}
