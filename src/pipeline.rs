//! Batch reconstruction: IMU samples in, robot movements out.
//!
//! Stages run strictly in sequence over whole arrays:
//! drift filter -> double integration -> strided Kalman smoothing ->
//! workspace mapping -> movement composition.

use log::{info, warn};
use serde::Serialize;

use crate::config::ReconstructionConfig;
use crate::error::{ReconstructError, Result};
use crate::filters::DriftFilter;
use crate::integration::integrate_acceleration;
use crate::movement::{MovementComposer, MovementPlan};
use crate::reorder::reorder_samples;
use crate::smoothing::AxisSmoother;
use crate::telemetry::{DecodedTelemetry, Frame};
use crate::types::{series_from_triplets, ImuReading, Sample, Vec3};
use crate::workspace::{MappingReport, WorkspaceMapper};

/// Summary of one reconstruction run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReconstructionReport {
    pub input_samples: usize,
    /// Samples missing a channel, left out before filtering.
    pub dropped_samples: usize,
    pub step: usize,
    pub movements: usize,
    pub mapping: MappingReport,
    /// Recoverable problems, rendered for display.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Reconstruction {
    pub plan: MovementPlan,
    pub report: ReconstructionReport,
}

/// Run the full pipeline on samples already in the robot frame.
pub fn reconstruct(samples: &[Sample], config: &ReconstructionConfig) -> Result<Reconstruction> {
    config.validate()?;

    let readings: Vec<ImuReading> = samples
        .iter()
        .filter_map(|s| ImuReading::try_from(s).ok())
        .collect();
    let dropped = samples.len() - readings.len();
    if dropped > 0 {
        warn!(
            "Dropping {} of {} samples missing a gyroscope or accelerometer reading",
            dropped,
            samples.len()
        );
    }
    if readings.is_empty() {
        return Err(ReconstructError::NoData {
            accel_count: samples.iter().filter(|s| s.accel.is_some()).count(),
            gyro_count: samples.iter().filter(|s| s.gyro.is_some()).count(),
        });
    }

    let accel: Vec<Vec3> = readings.iter().map(|r| r.accel).collect();
    let gyro: Vec<Vec3> = readings.iter().map(|r| r.gyro).collect();
    let step = config.step();

    let drift = DriftFilter::new(&config.high_pass, config.dt)?;
    let filtered = drift.filter_series(&series_from_triplets(&accel));

    let kinematics = integrate_acceleration(&filtered, config.dt);

    let smoothed = AxisSmoother::new(&config.kalman, step).smooth(&kinematics.position);

    let (mapped, mapping) = WorkspaceMapper::new(config.workspace.clone()).map(&smoothed);

    let movements = MovementComposer::new(step, config.round_decimals)
        .with_bounds(config.workspace.clone())
        .compose(&mapped, &gyro);

    let warnings = mapping
        .degeneracies(mapped.nrows())
        .iter()
        .map(ToString::to_string)
        .collect();

    info!(
        "Reconstructed {} movements from {} samples (step {}, {} clamped)",
        movements.len(),
        readings.len(),
        step,
        mapping.total_clamped()
    );

    let report = ReconstructionReport {
        input_samples: samples.len(),
        dropped_samples: dropped,
        step,
        movements: movements.len(),
        mapping,
        warnings,
    };
    Ok(Reconstruction {
        plan: MovementPlan::new(movements),
        report,
    })
}

/// Reorder device-frame samples, then reconstruct.
pub fn reconstruct_raw(mut samples: Vec<Sample>, config: &ReconstructionConfig) -> Result<Reconstruction> {
    reorder_samples(&mut samples);
    reconstruct(&samples, config)
}

/// Reconstruct from decoded telemetry of either shape.
///
/// Device-frame samples are reordered first; decoding issues are carried into the
/// report warnings ahead of the pipeline's own.
pub fn reconstruct_decoded(
    decoded: DecodedTelemetry,
    config: &ReconstructionConfig,
) -> Result<Reconstruction> {
    let mut result = match decoded.frame {
        Some(Frame::Device) => reconstruct_raw(decoded.samples, config)?,
        _ => reconstruct(&decoded.samples, config)?,
    };
    let mut warnings: Vec<String> = decoded.issues.iter().map(ToString::to_string).collect();
    warnings.append(&mut result.report.warnings);
    result.report.warnings = warnings;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisRange;
    use crate::telemetry::decode_telemetry;
    use crate::types::MOVEMENT_DIM;
    use serde_json::json;

    fn wave_samples(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.01;
                Sample::new(
                    t * 1000.0,
                    Vec3::new(0.1 * t, -0.2, (t * 3.0).sin()),
                    Vec3::new(
                        (t * 2.0).sin(),
                        0.5 * (t * 5.0).cos(),
                        9.81 + 0.3 * (t * 1.3).sin(),
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_within_workspace() {
        let config = ReconstructionConfig::default();
        let result = reconstruct(&wave_samples(1000), &config).unwrap();

        // step 100 over 1000 samples
        assert_eq!(result.report.step, 100);
        assert_eq!(result.plan.len(), 10);
        assert_eq!(result.report.dropped_samples, 0);
        for m in &result.plan.movements {
            assert_eq!(m.coordinates.len(), MOVEMENT_DIM);
            assert!(config.workspace.contains(&m.position()));
        }
    }

    #[test]
    fn test_bounds_finer_than_rounding_still_hold() {
        let mut config = ReconstructionConfig::default();
        config.workspace.x = AxisRange::new(0.1000004, 0.1234567);
        let result = reconstruct(&wave_samples(1000), &config).unwrap();

        assert!(!result.plan.is_empty());
        for m in &result.plan.movements {
            assert!(config.workspace.contains(&m.position()), "{:?}", m.position());
        }
    }

    #[test]
    fn test_excessive_rounding_rejected() {
        let mut config = ReconstructionConfig::default();
        config.round_decimals = 400;
        assert!(matches!(
            reconstruct(&wave_samples(10), &config),
            Err(ReconstructError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_orientation_is_raw_strided_gyro() {
        let mut config = ReconstructionConfig::default();
        config.sampling_rate = 10.0;
        let samples = wave_samples(95);
        let result = reconstruct(&samples, &config).unwrap();

        assert_eq!(result.report.step, 10);
        assert_eq!(result.plan.len(), 10);
        let m = &result.plan.movements[3];
        let g = samples[30].gyro.unwrap();
        assert_eq!(m.orientation(), [g.x, g.y, g.z].map(|c| (c * 1e6).round() / 1e6));
    }

    #[test]
    fn test_accel_only_and_gyro_only_is_no_data() {
        let document = json!([
            {"Accelerometer": {"3-axis accelerometer": [[0.0, 0.0, 9.8]]}, "Interval in ms": "(0, 10)"},
            {"Gyroscope": {"3-axis gyroscope": [[0.1, 0.0, 0.0]]}, "Interval in ms": "(10, 20)"}
        ]);
        let decoded = decode_telemetry(&document).unwrap();
        let err = reconstruct_decoded(decoded, &ReconstructionConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ReconstructError::NoData {
                accel_count: 1,
                gyro_count: 1
            }
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_incomplete_samples_dropped() {
        let mut samples = wave_samples(300);
        samples[5].gyro = None;
        samples[17].accel = None;
        let result = reconstruct(&samples, &ReconstructionConfig::default()).unwrap();
        assert_eq!(result.report.input_samples, 300);
        assert_eq!(result.report.dropped_samples, 2);
        assert_eq!(result.plan.len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ReconstructionConfig::default();
        config.dt = 0.0;
        assert!(matches!(
            reconstruct(&wave_samples(10), &config),
            Err(ReconstructError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_sample_lands_on_center() {
        let config = ReconstructionConfig::default();
        let result = reconstruct(&wave_samples(1), &config).unwrap();
        assert_eq!(result.plan.len(), 1);
        assert_eq!(result.report.mapping.degenerate_axes.len(), 3);
        assert_eq!(result.report.warnings.len(), 3);
        let centers = config.workspace.centers();
        for (v, c) in result.plan.movements[0].position().iter().zip(centers) {
            assert!((v - c).abs() < 1e-6);
        }
    }

    #[test]
    fn test_raw_input_is_reordered() {
        let config = ReconstructionConfig {
            sampling_rate: 100.0,
            ..Default::default()
        };
        let samples = vec![Sample::new(0.0, Vec3::new(1.0, 2.0, 3.0), Vec3::zeros())];
        let result = reconstruct_raw(samples, &config).unwrap();
        assert_eq!(result.plan.movements[0].orientation(), [-2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_decode_issues_reported_first() {
        let document = json!([
            {"Gyroscope": {"3-axis gyroscope": [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]},
             "Accelerometer": {"3-axis accelerometer": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]]},
             "Interval in ms": "(0, 10)"},
            {"unexpected": true}
        ]);
        let decoded = decode_telemetry(&document).unwrap();
        let result = reconstruct_decoded(decoded, &ReconstructionConfig::default()).unwrap();
        assert!(result.report.warnings[0].contains("Malformed entry 1"));
    }
}
