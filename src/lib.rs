//! Reconstruct arm trajectories from recorded IMU telemetry.
//!
//! Raw extraction output is decoded, rotated into the robot frame, drift-filtered,
//! double-integrated, smoothed and mapped into the arm's workspace, producing a
//! movement plan the playback side replays pose by pose.

pub mod config;
pub mod error;
pub mod filters;
pub mod integration;
pub mod movement;
pub mod pipeline;
pub mod reorder;
pub mod smoothing;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod workspace;

pub use config::{AxisRange, HighPassConfig, KalmanConfig, ReconstructionConfig, WorkspaceBounds};
pub use error::{ReconstructError, Result};
pub use movement::{Movement, MovementPlan};
pub use pipeline::{reconstruct, reconstruct_decoded, reconstruct_raw, Reconstruction, ReconstructionReport};
pub use telemetry::{decode_telemetry, DecodedTelemetry, Frame};
pub use types::{Sample, Vec3};
