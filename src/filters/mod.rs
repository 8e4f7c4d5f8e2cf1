/// Signal filters used by the reconstruction pipeline
///
/// `highpass` removes drift from whole acceleration axes (batch, zero-phase);
/// `kalman` is the causal scalar estimator behind the per-axis smoother.
pub mod highpass;
pub mod kalman;

pub use highpass::{DriftFilter, TransferFunction};
pub use kalman::{ScalarKalman, ScalarKalmanState};
