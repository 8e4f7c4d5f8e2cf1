pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One flattened IMU reading.
///
/// The serialized form doubles as the persisted reordered-sample artifact, so the
/// field names follow the extraction tool's key names. A channel that could not be
/// decoded is `None` and the sample is dropped before reconstruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "3-axis gyroscope", default, with = "optional_triplet")]
    pub gyro: Option<Vec3>,
    #[serde(rename = "3-axis accelerometer", default, with = "optional_triplet")]
    pub accel: Option<Vec3>,
    #[serde(rename = "Timestamp in ms")]
    pub timestamp_ms: f64,
}

impl Sample {
    pub fn new(timestamp_ms: f64, gyro: Vec3, accel: Vec3) -> Self {
        Self {
            gyro: Some(gyro),
            accel: Some(accel),
            timestamp_ms,
        }
    }

    /// Both channels present.
    pub fn is_complete(&self) -> bool {
        self.gyro.is_some() && self.accel.is_some()
    }
}

/// A sample with both channels present, as consumed by the batch stages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuReading {
    pub timestamp_ms: f64,
    pub gyro: Vec3,
    pub accel: Vec3,
}

impl TryFrom<&Sample> for ImuReading {
    type Error = ();

    fn try_from(sample: &Sample) -> Result<Self, Self::Error> {
        match (sample.gyro, sample.accel) {
            (Some(gyro), Some(accel)) => Ok(Self {
                timestamp_ms: sample.timestamp_ms,
                gyro,
                accel,
            }),
            _ => Err(()),
        }
    }
}

/// Triplets travel as plain `[x, y, z]` arrays (or `null`) on disk.
mod optional_triplet {
    use super::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec3>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(|v| [v.x, v.y, v.z]).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec3>, D::Error> {
        let raw = Option::<[f64; 3]>::deserialize(deserializer)?;
        Ok(raw.map(|[x, y, z]| Vec3::new(x, y, z)))
    }
}
