//! Property tests for the parameter configurator.

use bl_core::{ah, k, unitless};
use bl_params::{Overrides, Quantity, apply_overrides, catalog};
use proptest::prelude::*;

proptest! {
    #[test]
    fn capacity_override_rescales_height(c in 0.05f64..50.0, idx in 0usize..5) {
        let entry = &catalog()[idx];
        let mut p = entry.chemistry.base_parameters();
        let h0 = p.electrode_height_m;
        let nominal = p.nominal_capacity_ah;
        prop_assume!(!(entry.canonical_id == "NMC" && c == 5.0));

        let o = Overrides { capacity: Some(ah(c)), ..Default::default() };
        apply_overrides(&mut p, &o).unwrap();

        let expected = h0 * (c / nominal) * entry.capacity_correction;
        prop_assert!((p.electrode_height_m - expected).abs() <= 1e-9 * expected.max(1.0));
        prop_assert!((p.nominal_capacity_ah - c).abs() < 1e-12);
    }

    #[test]
    fn dopant_fractions_always_sum_to_one(f in 0.001f64..=1.0) {
        let mut p = catalog()[3].chemistry.base_parameters();
        let o = Overrides { dopant_fraction: Some(unitless(f)), ..Default::default() };
        apply_overrides(&mut p, &o).unwrap();
        let primary = p.get(Quantity::PrimaryActiveFraction).unwrap();
        let secondary = p.get(Quantity::SecondaryActiveFraction).unwrap();
        prop_assert!((primary + secondary - 1.0).abs() < 1e-12);
        prop_assert!((secondary - f / 2.0).abs() < 1e-12);
    }

    #[test]
    fn overrides_are_independent(t in 250.0f64..350.0) {
        let base = catalog()[2].chemistry.base_parameters();
        let mut p = base.clone();
        let o = Overrides { temperature: Some(k(t)), ..Default::default() };
        apply_overrides(&mut p, &o).unwrap();
        prop_assert_eq!(p.nominal_capacity_ah, base.nominal_capacity_ah);
        prop_assert_eq!(p.electrode_height_m, base.electrode_height_m);
        prop_assert_eq!(p.negative_electrode, base.negative_electrode);
    }
}
