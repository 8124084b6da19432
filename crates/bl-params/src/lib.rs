//! bl-params: chemistry catalogue, typed parameter sets and the override
//! configurator.
//!
//! Parameter sets are closed structs with unit-suffixed fields. Physical
//! quantities are addressed through [`Quantity`], whose canonical names
//! match the bracketed labels the front-end and the result shaper use.

pub mod catalog;
pub mod configure;
pub mod error;
pub mod ocv;
pub mod quantity;
pub mod set;

pub use catalog::{Chemistry, ChemistryEntry, catalog, lookup};
pub use configure::{Overrides, apply_overrides, lab2_composite_tuning};
pub use error::{ParamError, ParamResult};
pub use ocv::{OcvCurve, silicon_ocp_delithiation, silicon_ocp_lithiation};
pub use quantity::Quantity;
pub use set::{CompositeElectrode, NegativeElectrode, ParameterSet, Phase};
