//! Map a reconstructed trajectory into the arm's reachable envelope.
//!
//! The trajectory's own extent is stretched to fill each axis interval, the mean
//! is moved onto the workspace center, then every coordinate is hard-clamped.
//! Clamping after recentering can cut off part of a lopsided trajectory; the
//! clamp counts are reported and logged instead of re-normalizing.

use log::warn;
use ndarray::{Array1, Axis};
use serde::Serialize;

use crate::config::WorkspaceBounds;
use crate::error::ReconstructError;
use crate::types::{AxisSeries, AXIS_COUNT, AXIS_NAMES};

/// Normalized value used on an axis whose samples are all equal.
pub const DEGENERATE_NORMALIZED: f64 = 0.5;

/// What the mapper had to adjust.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MappingReport {
    /// Coordinates pulled back inside the bounds, per axis.
    pub clamped: [usize; AXIS_COUNT],
    /// Axes with zero range (min == max), normalized to 0.5.
    pub degenerate_axes: Vec<&'static str>,
}

impl MappingReport {
    pub fn total_clamped(&self) -> usize {
        self.clamped.iter().sum()
    }

    /// Degenerate axes as recoverable errors, for callers collecting warnings.
    pub fn degeneracies(&self, samples: usize) -> Vec<ReconstructError> {
        self.degenerate_axes
            .iter()
            .map(|axis| ReconstructError::NumericDegeneracy {
                axis: *axis,
                samples,
            })
            .collect()
    }
}

/// Per-axis `[0, 1]` normalization over the whole sequence.
///
/// An axis with `max == min` maps every value to exactly 0.5.
pub fn normalize_axis(column: &mut Array1<f64>) -> bool {
    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        column.fill(DEGENERATE_NORMALIZED);
        return true;
    }
    let range = max - min;
    column.mapv_inplace(|v| (v - min) / range);
    false
}

pub struct WorkspaceMapper {
    bounds: WorkspaceBounds,
}

impl WorkspaceMapper {
    pub fn new(bounds: WorkspaceBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &WorkspaceBounds {
        &self.bounds
    }

    /// Normalize, rescale, recenter and clamp an (m, 3) trajectory.
    pub fn map(&self, positions: &AxisSeries) -> (AxisSeries, MappingReport) {
        let mut mapped = positions.clone();
        let mut report = MappingReport::default();
        if positions.nrows() == 0 {
            return (mapped, report);
        }

        let ranges = self.bounds.ranges();
        let centers = self.bounds.centers();

        for (axis, mut column) in mapped.axis_iter_mut(Axis(1)).enumerate() {
            let range = ranges[axis];
            let mut values = column.to_owned();

            if normalize_axis(&mut values) {
                report.degenerate_axes.push(AXIS_NAMES[axis]);
            }

            values.mapv_inplace(|n| n * range.span() + range.min);

            let mean = values.mean().unwrap_or(0.0);
            values.mapv_inplace(|v| centers[axis] + (v - mean));

            for v in values.iter_mut() {
                let clamped = v.clamp(range.min, range.max);
                if clamped != *v {
                    report.clamped[axis] += 1;
                }
                *v = clamped;
            }
            column.assign(&values);
        }

        if report.total_clamped() > 0 {
            warn!(
                "Trajectory exceeded workspace after recentering; clamped x={} y={} z={} of {} poses",
                report.clamped[0],
                report.clamped[1],
                report.clamped[2],
                positions.nrows()
            );
        }
        (mapped, report)
    }
}
