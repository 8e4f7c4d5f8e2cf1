//! Double integration: acceleration -> velocity -> position
//!
//! Both steps use the cumulative trapezoidal rule at a fixed step `dt`, starting
//! from rest at the origin. Non-finite inputs propagate untouched.

use log::debug;
use ndarray::{Array1, ArrayView1, Axis};

use crate::types::{AxisColumn, AxisSeries};

/// `out[0] = 0`, `out[i] = out[i-1] + dt * (x[i-1] + x[i]) / 2`.
pub fn cumulative_trapezoid(x: ArrayView1<f64>, dt: f64) -> AxisColumn {
    let mut out = Array1::<f64>::zeros(x.len());
    for i in 1..x.len() {
        out[i] = out[i - 1] + dt * (x[i - 1] + x[i]) / 2.0;
    }
    out
}

/// Velocity and position for every axis of an (n, 3) acceleration series.
#[derive(Clone, Debug)]
pub struct Kinematics {
    pub velocity: AxisSeries,
    pub position: AxisSeries,
}

pub fn integrate_acceleration(accel: &AxisSeries, dt: f64) -> Kinematics {
    let mut velocity = AxisSeries::zeros(accel.dim());
    let mut position = AxisSeries::zeros(accel.dim());

    for (axis, a) in accel.axis_iter(Axis(1)).enumerate() {
        let v = cumulative_trapezoid(a, dt);
        let p = cumulative_trapezoid(v.view(), dt);
        velocity.column_mut(axis).assign(&v);
        position.column_mut(axis).assign(&p);
    }

    debug!("Integrated {} samples at dt={}s", accel.nrows(), dt);
    Kinematics { velocity, position }
}
