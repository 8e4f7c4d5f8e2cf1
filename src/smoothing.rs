use log::debug;
use ndarray::Array2;

use crate::config::KalmanConfig;
use crate::filters::kalman::{ScalarKalman, ScalarKalmanState};
use crate::types::{AxisSeries, AXIS_COUNT};

/// Per-axis Kalman smoothing of a down-sampled position stream.
///
/// Each axis has its own estimator; the three never share state. Only every
/// `step`-th raw sample reaches the estimators, one update per retained sample.
pub struct AxisSmoother {
    filters: [ScalarKalman; AXIS_COUNT],
    step: usize,
}

impl AxisSmoother {
    pub fn new(config: &KalmanConfig, step: usize) -> Self {
        AxisSmoother {
            filters: [
                ScalarKalman::from_config(config),
                ScalarKalman::from_config(config),
                ScalarKalman::from_config(config),
            ],
            step: step.max(1),
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Feed one position triplet and return the smoothed one.
    pub fn apply(&mut self, position: [f64; AXIS_COUNT]) -> [f64; AXIS_COUNT] {
        let mut out = [0.0; AXIS_COUNT];
        for ((slot, filter), measurement) in out.iter_mut().zip(self.filters.iter_mut()).zip(position) {
            *slot = filter.update(measurement);
        }
        out
    }

    /// Smooth the strided rows `0, step, 2*step, ...` of an (n, 3) position series.
    ///
    /// Returns an (m, 3) series with `m = ceil(n / step)`.
    pub fn smooth(&mut self, position: &AxisSeries) -> AxisSeries {
        let rows: Vec<[f64; AXIS_COUNT]> = strided_indices(position.nrows(), self.step)
            .map(|i| {
                let row = position.row(i);
                self.apply([row[0], row[1], row[2]])
            })
            .collect();

        let mut out = Array2::<f64>::zeros((rows.len(), AXIS_COUNT));
        for (mut dst, src) in out.rows_mut().into_iter().zip(rows.iter()) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = *s;
            }
        }
        debug!(
            "Smoothed {} of {} positions (step {})",
            out.nrows(),
            position.nrows(),
            self.step
        );
        out
    }

    pub fn states(&self) -> [ScalarKalmanState; AXIS_COUNT] {
        [
            self.filters[0].get_state(),
            self.filters[1].get_state(),
            self.filters[2].get_state(),
        ]
    }
}

/// Indices kept by down-sampling with the given stride.
pub fn strided_indices(len: usize, step: usize) -> impl Iterator<Item = usize> {
    (0..len).step_by(step.max(1))
}
