use log::debug;

use crate::types::{Sample, Vec3};

/// Device frame reports (y, -x, z); the arm expects (x, y, z).
#[inline]
pub fn reorder(v: Vec3) -> Vec3 {
    Vec3::new(-v.y, v.x, v.z)
}

/// Reorder gyro and accel of every sample in place. Missing channels stay missing.
pub fn reorder_samples(samples: &mut [Sample]) {
    for sample in samples.iter_mut() {
        sample.gyro = sample.gyro.map(reorder);
        sample.accel = sample.accel.map(reorder);
    }
    debug!("Reordered axes of {} samples", samples.len());
}
