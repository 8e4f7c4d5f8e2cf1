//! Zero-phase Butterworth high-pass filter for drift removal.
//!
//! Accelerometer bias and gravity leakage grow quadratically once integrated twice,
//! so every acceleration axis is high-passed before integration. The filter is run
//! forward then backward over the full recording (no phase shift), which means it
//! needs the whole sequence up front.

use log::debug;
use nalgebra::{Complex, DMatrix, DVector};
use ndarray::{Array1, ArrayView1, Axis};

use crate::config::HighPassConfig;
use crate::error::{ReconstructError, Result};
use crate::types::{AxisColumn, AxisSeries};

type C64 = Complex<f64>;

/// Digital IIR filter as transfer-function coefficients, `a[0] == 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

/// Expand `prod(x - r)` into monic polynomial coefficients, highest power first.
fn poly(roots: &[C64]) -> Vec<C64> {
    let mut coeffs = vec![C64::new(1.0, 0.0)];
    for r in roots {
        let mut next = coeffs.clone();
        next.push(C64::new(0.0, 0.0));
        for i in 1..next.len() {
            next[i] -= *r * coeffs[i - 1];
        }
        coeffs = next;
    }
    coeffs
}

impl TransferFunction {
    /// Butterworth high-pass of the given order.
    ///
    /// `normalized_cutoff` is the cutoff divided by the Nyquist frequency, in (0, 1).
    /// Built from the analog prototype: poles on the unit circle, low-pass to
    /// high-pass substitution, then the bilinear transform with pre-warping.
    pub fn butterworth_high_pass(order: usize, normalized_cutoff: f64) -> Result<Self> {
        if order == 0 {
            return Err(ReconstructError::InvalidConfig(
                "filter order must be at least 1".into(),
            ));
        }
        if !(normalized_cutoff > 0.0 && normalized_cutoff < 1.0) {
            return Err(ReconstructError::InvalidConfig(format!(
                "normalized cutoff {} outside (0, 1)",
                normalized_cutoff
            )));
        }

        let n = order as i64;
        let fs = 2.0;
        let warped = 2.0 * fs * (std::f64::consts::PI * normalized_cutoff / fs).tan();

        // Analog prototype poles, unit gain
        let prototype: Vec<C64> = (0..order as i64)
            .map(|k| {
                let m = (-n + 1 + 2 * k) as f64;
                -C64::from_polar(1.0, std::f64::consts::PI * m / (2.0 * n as f64))
            })
            .collect();

        // Low-pass -> high-pass: poles move to warped/p, zeros land at the origin
        let hp_poles: Vec<C64> = prototype.iter().map(|p| C64::new(warped, 0.0) / *p).collect();
        let prod_neg_p = prototype.iter().fold(C64::new(1.0, 0.0), |acc, p| acc * -*p);
        let hp_gain = (C64::new(1.0, 0.0) / prod_neg_p).re;

        // Bilinear transform
        let fs2 = C64::new(2.0 * fs, 0.0);
        let z_zeros = vec![C64::new(1.0, 0.0); order];
        let z_poles: Vec<C64> = hp_poles.iter().map(|p| (fs2 + *p) / (fs2 - *p)).collect();
        let denom = hp_poles.iter().fold(C64::new(1.0, 0.0), |acc, p| acc * (fs2 - *p));
        let z_gain = hp_gain * (fs2.powi(order as i32) / denom).re;

        let b = poly(&z_zeros).iter().map(|c| z_gain * c.re).collect();
        let a = poly(&z_poles).iter().map(|c| c.re).collect();
        Ok(Self { b, a })
    }

    fn len(&self) -> usize {
        self.a.len().max(self.b.len())
    }

    /// Steady-state initial conditions for a unit step input.
    ///
    /// Solves `(I - A^T) zi = b[1..] - a[1..] * b[0]` with `A` the companion matrix of `a`.
    pub fn initial_state(&self) -> Result<Vec<f64>> {
        let n = self.len();
        if n < 2 {
            return Ok(Vec::new());
        }
        let (b, a) = self.padded();
        let m = n - 1;

        let i_minus_at = DMatrix::from_fn(m, m, |i, j| {
            let identity = if i == j { 1.0 } else { 0.0 };
            // companion(a)[j][i]
            let companion = if j == 0 {
                -a[i + 1]
            } else if i + 1 == j {
                1.0
            } else {
                0.0
            };
            identity - companion
        });
        let rhs = DVector::from_fn(m, |i, _| b[i + 1] - a[i + 1] * b[0]);

        let zi = i_minus_at.lu().solve(&rhs).ok_or_else(|| {
            ReconstructError::InvalidConfig("filter initial-state system is singular".into())
        })?;
        Ok(zi.iter().copied().collect())
    }

    fn padded(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.len();
        let mut b = self.b.clone();
        let mut a = self.a.clone();
        b.resize(n, 0.0);
        a.resize(n, 0.0);
        (b, a)
    }

    /// Direct form II transposed, starting from state `zi`.
    pub fn lfilter(&self, x: &[f64], zi: &[f64]) -> Vec<f64> {
        let (b, a) = self.padded();
        let n = b.len();
        let mut z = zi.to_vec();
        z.resize(n.saturating_sub(1), 0.0);

        let mut y = Vec::with_capacity(x.len());
        for &xi in x {
            let yi = b[0] * xi + z.first().copied().unwrap_or(0.0);
            for k in 0..n.saturating_sub(2) {
                z[k] = b[k + 1] * xi + z[k + 1] - a[k + 1] * yi;
            }
            if n >= 2 {
                z[n - 2] = b[n - 1] * xi - a[n - 1] * yi;
            }
            y.push(yi);
        }
        y
    }
}

/// Odd extension: reflect `padlen` samples through each endpoint.
fn odd_extend(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));
    ext
}

/// Batch drift filter applied per axis.
#[derive(Clone, Debug)]
pub struct DriftFilter {
    tf: TransferFunction,
    zi: Vec<f64>,
}

impl DriftFilter {
    pub fn new(config: &HighPassConfig, dt: f64) -> Result<Self> {
        let nyquist = 1.0 / (2.0 * dt);
        let tf = TransferFunction::butterworth_high_pass(config.order, config.cutoff_hz / nyquist)?;
        let zi = tf.initial_state()?;
        debug!(
            "High-pass order {} at {} Hz: b={:?} a={:?}",
            config.order, config.cutoff_hz, tf.b, tf.a
        );
        Ok(Self { tf, zi })
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.tf
    }

    /// Samples reflected at each end before filtering.
    pub fn padlen(&self) -> usize {
        3 * self.tf.len()
    }

    /// Forward-backward filtering of one whole axis.
    ///
    /// Sequences too short for the standard padding use `len - 1`.
    pub fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let padlen = self.padlen().min(x.len() - 1);
        let ext = odd_extend(x, padlen);

        let scaled = |x0: f64| self.zi.iter().map(|z| z * x0).collect::<Vec<f64>>();

        let forward = self.tf.lfilter(&ext, &scaled(ext[0]));
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let y0 = reversed[0];
        let backward = self.tf.lfilter(&reversed, &scaled(y0));
        reversed = backward.into_iter().rev().collect();

        reversed[padlen..reversed.len() - padlen].to_vec()
    }

    pub fn filter_axis(&self, column: ArrayView1<f64>) -> AxisColumn {
        let x: Vec<f64> = column.iter().copied().collect();
        Array1::from(self.filtfilt(&x))
    }

    /// Filter every column of an (n, 3) series independently.
    pub fn filter_series(&self, series: &AxisSeries) -> AxisSeries {
        let mut out = series.clone();
        for (src, mut dst) in series
            .axis_iter(Axis(1))
            .zip(out.axis_iter_mut(Axis(1)))
        {
            dst.assign(&self.filter_axis(src));
        }
        out
    }
}
