//! Fixed-step time integrators.

use serde::Serialize;

use crate::error::SimResult;
use crate::model::TransientModel;

pub trait Integrator {
    /// Advance `x` from `t` by `dt`.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// `x + h * k`, the only state arithmetic the schemes below need.
fn axpy<M: TransientModel>(model: &M, x: &M::State, h: f64, k: &M::State) -> M::State {
    model.add(x, &model.scale(k, h))
}

/// Classical 4th-order Runge-Kutta.
#[derive(Clone, Copy, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let half = 0.5 * dt;
        let k1 = model.rhs(t, x)?;
        let k2 = model.rhs(t + half, &axpy(model, x, half, &k1))?;
        let k3 = model.rhs(t + half, &axpy(model, x, half, &k2))?;
        let k4 = model.rhs(t + dt, &axpy(model, x, dt, &k3))?;

        let inner = model.add(&k2, &k3);
        let outer = model.add(&k1, &k4);
        let weighted = axpy(model, &outer, 2.0, &inner);
        Ok(axpy(model, x, dt / 6.0, &weighted))
    }
}

/// Heun's method (explicit trapezoid): two rhs calls, second order.
#[derive(Clone, Copy, Debug)]
pub struct Heun;

impl Integrator for Heun {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;
        let k2 = model.rhs(t + dt, &axpy(model, x, dt, &k1))?;
        Ok(axpy(model, x, 0.5 * dt, &model.add(&k1, &k2)))
    }
}

/// Scheme used by the engine for every step and every event refinement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum IntegratorType {
    #[default]
    RK4,
    /// Half the rhs evaluations of RK4; only stable for short `dt_max_s`
    Heun,
}

impl IntegratorType {
    pub fn step<M: TransientModel>(
        self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        match self {
            IntegratorType::RK4 => RK4.step(model, t, x, dt),
            IntegratorType::Heun => Heun.step(model, t, x, dt),
        }
    }
}
