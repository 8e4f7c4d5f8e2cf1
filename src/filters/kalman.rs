use serde::{Deserialize, Serialize};

use crate::config::KalmanConfig;

/// Snapshot of a scalar filter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarKalmanState {
    pub estimate: f64,
    pub covariance: f64,
    pub process_noise: f64,
    pub measurement_noise: f64,
}

/// Random-walk Kalman filter on a single value.
///
/// State is never reset mid-sequence: one instance follows one axis of one run.
#[derive(Clone, Debug)]
pub struct ScalarKalman {
    estimate: f64,
    covariance: f64,
    q: f64, // process noise
    r: f64, // measurement noise
}

impl ScalarKalman {
    pub fn new(q: f64, r: f64, initial_covariance: f64) -> Self {
        Self {
            estimate: 0.0,
            covariance: initial_covariance,
            q,
            r,
        }
    }

    pub fn from_config(config: &KalmanConfig) -> Self {
        Self::new(
            config.process_noise,
            config.measurement_noise,
            config.initial_covariance,
        )
    }

    /// Predict then correct with one measurement; returns the new estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        self.covariance += self.q;

        let gain = self.covariance / (self.covariance + self.r);
        self.estimate += gain * (measurement - self.estimate);
        self.covariance *= 1.0 - gain;

        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn covariance(&self) -> f64 {
        self.covariance
    }

    pub fn get_state(&self) -> ScalarKalmanState {
        ScalarKalmanState {
            estimate: self.estimate,
            covariance: self.covariance,
            process_noise: self.q,
            measurement_noise: self.r,
        }
    }
}

impl Default for ScalarKalman {
    fn default() -> Self {
        Self::from_config(&KalmanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_state() {
        let kf = ScalarKalman::default();
        assert_eq!(kf.estimate(), 0.0);
        assert_eq!(kf.covariance(), 1000.0);
    }

    #[test]
    fn test_first_update_nearly_adopts_measurement() {
        let mut kf = ScalarKalman::default();
        let x = kf.update(2.0);
        // gain = 1000.1 / 1000.2
        assert_relative_eq!(x, 2.0 * 1000.1 / 1000.2, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_measurement_converges_monotonically() {
        let mut kf = ScalarKalman::default();
        let target = 3.5;
        let mut last_error = (kf.estimate() - target).abs();
        let mut last_cov = kf.covariance();

        for _ in 0..200 {
            kf.update(target);
            let error = (kf.estimate() - target).abs();
            assert!(error <= last_error);
            assert!(kf.covariance() <= last_cov);
            last_error = error;
            last_cov = kf.covariance();
        }
        assert!(last_error < 1e-6);
        // Steady state: p = (-q + sqrt(q^2 + 4qr)) / 2 for q = r = 0.1
        let steady = (-0.1 + (0.01f64 + 0.04).sqrt()) / 2.0;
        assert_relative_eq!(kf.covariance(), steady, epsilon = 1e-9);
    }

    #[test]
    fn test_order_dependent() {
        let mut a = ScalarKalman::default();
        let mut b = ScalarKalman::default();
        for m in [1.0, 5.0, -2.0] {
            a.update(m);
        }
        for m in [-2.0, 5.0, 1.0] {
            b.update(m);
        }
        assert!((a.estimate() - b.estimate()).abs() > 1e-3);
    }

    #[test]
    fn test_state_snapshot() {
        let kf = ScalarKalman::new(0.2, 0.3, 10.0);
        let state = kf.get_state();
        assert_eq!(state.process_noise, 0.2);
        assert_eq!(state.measurement_noise, 0.3);
        assert_eq!(state.covariance, 10.0);
    }
}
