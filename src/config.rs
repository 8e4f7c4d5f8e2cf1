// config.rs: Tunable constants for the reconstruction pipeline
//
// Defaults match the recording setup (100 Hz IMU stream) and the reach of the
// target arm. Every field can be overridden from a JSON file; missing keys keep
// their default.

use serde::{Deserialize, Serialize};

use crate::error::{ReconstructError, Result};
use crate::types::{AXIS_COUNT, AXIS_NAMES};

// ─── Drift filter ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighPassConfig {
    pub cutoff_hz: f64,
    pub order: usize,
}

impl Default for HighPassConfig {
    fn default() -> Self {
        Self {
            cutoff_hz: 0.1,
            order: 2,
        }
    }
}

// ─── Axis smoother ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub initial_covariance: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.1,
            measurement_noise: 0.1,
            initial_covariance: 1000.0,
        }
    }
}

// ─── Workspace ───────────────────────────────────────────────────────────────

/// Closed interval for one axis, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> f64 {
        (self.max + self.min) / 2.0
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Reachable envelope of the arm.
///
/// `center` is where the trajectory mean is placed; `None` means the midpoint
/// of each interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceBounds {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
    pub center: Option<[f64; AXIS_COUNT]>,
}

impl Default for WorkspaceBounds {
    fn default() -> Self {
        Self {
            x: AxisRange::new(0.15, 0.35), // depth
            y: AxisRange::new(-0.2, 0.2),  // width
            z: AxisRange::new(0.0, 0.35),  // height
            center: None,
        }
    }
}

impl WorkspaceBounds {
    pub fn ranges(&self) -> [AxisRange; AXIS_COUNT] {
        [self.x, self.y, self.z]
    }

    pub fn centers(&self) -> [f64; AXIS_COUNT] {
        self.center
            .unwrap_or_else(|| [self.x.midpoint(), self.y.midpoint(), self.z.midpoint()])
    }

    pub fn contains(&self, position: &[f64; AXIS_COUNT]) -> bool {
        self.ranges()
            .iter()
            .zip(position.iter())
            .all(|(range, v)| range.contains(*v))
    }
}

/// Largest `round_decimals` still representable as an f64 scale factor.
pub const MAX_ROUND_DECIMALS: u32 = 15;

// ─── Pipeline ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Seconds between consecutive samples.
    pub dt: f64,
    /// Output poses per second; sets the down-sampling stride.
    pub sampling_rate: f64,
    pub high_pass: HighPassConfig,
    pub kalman: KalmanConfig,
    pub workspace: WorkspaceBounds,
    /// Decimal places kept in emitted coordinates.
    pub round_decimals: u32,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            sampling_rate: 1.0,
            high_pass: HighPassConfig::default(),
            kalman: KalmanConfig::default(),
            workspace: WorkspaceBounds::default(),
            round_decimals: 6,
        }
    }
}

impl ReconstructionConfig {
    pub fn nyquist_hz(&self) -> f64 {
        1.0 / (2.0 * self.dt)
    }

    /// Raw samples skipped between two retained ones, at least 1.
    pub fn step(&self) -> usize {
        let step = (1.0 / (self.sampling_rate * self.dt)).round();
        if step.is_finite() && step >= 1.0 {
            step as usize
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ReconstructError::InvalidConfig(msg));

        if !(self.dt.is_finite() && self.dt > 0.0) {
            return invalid(format!("dt must be positive, got {}", self.dt));
        }
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return invalid(format!(
                "sampling_rate must be positive, got {}",
                self.sampling_rate
            ));
        }
        if self.high_pass.order == 0 {
            return invalid("high-pass order must be at least 1".into());
        }
        let nyquist = self.nyquist_hz();
        if !(self.high_pass.cutoff_hz > 0.0 && self.high_pass.cutoff_hz < nyquist) {
            return invalid(format!(
                "high-pass cutoff {} Hz must lie in (0, {}) Hz",
                self.high_pass.cutoff_hz, nyquist
            ));
        }
        let k = &self.kalman;
        if k.process_noise < 0.0 || k.measurement_noise < 0.0 || k.initial_covariance < 0.0 {
            return invalid("Kalman noise terms and covariance must be non-negative".into());
        }
        if k.process_noise + k.measurement_noise <= 0.0 {
            return invalid("Kalman process and measurement noise cannot both be zero".into());
        }
        for (name, range) in AXIS_NAMES.iter().zip(self.workspace.ranges()) {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return invalid(format!(
                    "workspace {} range [{}, {}] is not a valid interval",
                    name, range.min, range.max
                ));
            }
        }
        if let Some(center) = self.workspace.center {
            if center.iter().any(|c| !c.is_finite()) {
                return invalid(format!("workspace center {:?} must be finite", center));
            }
        }
        if self.round_decimals > MAX_ROUND_DECIMALS {
            return invalid(format!(
                "round_decimals {} exceeds {}",
                self.round_decimals, MAX_ROUND_DECIMALS
            ));
        }
        Ok(())
    }
}
