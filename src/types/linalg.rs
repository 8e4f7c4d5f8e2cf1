//! Linear algebra type system for motion reconstruction
//!
//! Per-sample triplets are fixed-size nalgebra vectors; whole-sequence
//! batch stages work on n×3 ndarray arrays, one column per spatial axis.

use nalgebra::Vector3;
use ndarray::{Array1, Array2};

// ===== Axis Layout =====
pub const AXIS_COUNT: usize = 3;
pub const AXIS_X: usize = 0;
pub const AXIS_Y: usize = 1;
pub const AXIS_Z: usize = 2;
pub const AXIS_NAMES: [&str; AXIS_COUNT] = ["x", "y", "z"];

// ===== Movement Layout =====
pub const MOVEMENT_DIM: usize = 6; // (x, y, z, roll, pitch, yaw)

/// One gyroscope or accelerometer reading.
pub type Vec3 = Vector3<f64>;

/// A whole sequence of triplets, shape (n, 3).
pub type AxisSeries = Array2<f64>;

/// A single axis of a sequence, shape (n,).
pub type AxisColumn = Array1<f64>;

/// Stack triplets into an (n, 3) array, row per sample.
pub fn series_from_triplets(triplets: &[Vec3]) -> AxisSeries {
    let mut series = Array2::<f64>::zeros((triplets.len(), AXIS_COUNT));
    for (mut row, v) in series.rows_mut().into_iter().zip(triplets) {
        row[AXIS_X] = v.x;
        row[AXIS_Y] = v.y;
        row[AXIS_Z] = v.z;
    }
    series
}
