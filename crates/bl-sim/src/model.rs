//! TransientModel trait for pluggable cell dynamics.

use crate::error::SimResult;

/// A dynamic system `x' = f(t, x)` integrated between reporting points.
///
/// Algebraic relations (e.g. the current drawn during a voltage hold) are
/// resolved inside [`TransientModel::rhs`] from the current state, so the
/// integrators only ever see an explicit ODE.
pub trait TransientModel {
    type State: Clone;

    fn initial_state(&self) -> Self::State;

    /// Time derivative of `x` under the model's present control.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// `a + b`, element-wise.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// `scale * a`.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}
