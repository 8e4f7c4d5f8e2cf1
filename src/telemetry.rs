//! Telemetry decoding
//!
//! The extraction tool emits one JSON entry per reporting interval, each holding a
//! window of gyroscope and accelerometer triplets. The reordered artifact written
//! by this crate uses a flat one-sample-per-entry layout instead. Every entry is
//! matched against the known shapes in a fixed order; anything else is skipped.

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::error::{ReconstructError, Result};
use crate::types::{Sample, Vec3};

const GYRO_BLOCK: &str = "Gyroscope";
const ACCEL_BLOCK: &str = "Accelerometer";
const GYRO_KEY: &str = "3-axis gyroscope";
const ACCEL_KEY: &str = "3-axis accelerometer";
const INTERVAL_KEY: &str = "Interval in ms";
const TIMESTAMP_KEY: &str = "Timestamp in ms";

/// Coordinate frame of decoded samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Straight from the device, axes still need reordering.
    Device,
    /// Already passed through the axis reorderer.
    Reordered,
}

/// One entry, matched to a known shape.
#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryRecord {
    Interval(IntervalRecord),
    Flat(Sample),
}

impl TelemetryRecord {
    pub fn frame(&self) -> Frame {
        match self {
            TelemetryRecord::Interval(_) => Frame::Device,
            TelemetryRecord::Flat(_) => Frame::Reordered,
        }
    }
}

/// A reporting window: raw triplets spread evenly over `[start_ms, end_ms]`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalRecord {
    pub interval: Option<(f64, f64)>,
    pub gyro: Vec<Option<Vec3>>,
    pub accel: Vec<Option<Vec3>>,
}

impl IntervalRecord {
    /// Spread the window into samples, `timestamp = start + i * (end - start) / (n - 1)`.
    ///
    /// `n` is the longer of the two channels; the shorter one is padded with `None`.
    pub fn flatten(&self) -> Vec<Sample> {
        let count = self.gyro.len().max(self.accel.len());
        let (start, end) = self.interval.unwrap_or((0.0, 0.0));
        let span = end - start;
        let denom = count.saturating_sub(1).max(1) as f64;

        (0..count)
            .map(|i| Sample {
                gyro: self.gyro.get(i).copied().flatten(),
                accel: self.accel.get(i).copied().flatten(),
                timestamp_ms: start + span * (i as f64 / denom),
            })
            .collect()
    }
}

/// Decoded telemetry ready for the pipeline.
#[derive(Clone, Debug, Default)]
pub struct DecodedTelemetry {
    pub samples: Vec<Sample>,
    pub frame: Option<Frame>,
    /// Recoverable problems met while decoding.
    pub issues: Vec<ReconstructError>,
    /// Entries dropped whole; the rest of `issues` concern channels of kept entries.
    pub skipped_entries: usize,
}

impl DecodedTelemetry {
    fn skip(&mut self, issue: ReconstructError) {
        warn!("Skipping: {}", issue);
        self.issues.push(issue);
        self.skipped_entries += 1;
    }
}

/// Parse an interval descriptor of the form `"(start, end)"`.
pub fn parse_interval(descriptor: &str) -> Option<(f64, f64)> {
    let inner = descriptor
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let mut parts = inner.split(',');
    let start = parts.next()?.trim().parse::<f64>().ok()?;
    let end = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() || !start.is_finite() || !end.is_finite() {
        return None;
    }
    Some((start, end))
}

/// Read `[x, y, z]`; anything else (wrong length, non-numeric) is `None`.
fn parse_triplet(value: &Value) -> Option<Vec3> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some(Vec3::new(x.as_f64()?, y.as_f64()?, z.as_f64()?)),
        _ => None,
    }
}

/// Pull the triplet window out of `{"Gyroscope": {"3-axis gyroscope": [...]}}`.
fn window_of(
    entry: &Map<String, Value>,
    block: &str,
    key: &str,
    index: usize,
    issues: &mut Vec<ReconstructError>,
) -> Vec<Option<Vec3>> {
    let Some(block_value) = entry.get(block) else {
        return Vec::new();
    };
    let Some(window) = block_value.get(key).and_then(Value::as_array) else {
        issues.push(ReconstructError::malformed(
            index,
            format!("{} block has no '{}' array", block, key),
        ));
        return Vec::new();
    };

    let mut bad = 0usize;
    let triplets: Vec<Option<Vec3>> = window
        .iter()
        .map(|v| {
            let t = parse_triplet(v);
            if t.is_none() {
                bad += 1;
            }
            t
        })
        .collect();
    if bad > 0 {
        issues.push(ReconstructError::malformed(
            index,
            format!("{} of {} {} triplets unreadable", bad, window.len(), key),
        ));
    }
    triplets
}

fn decode_interval(
    entry: &Map<String, Value>,
    index: usize,
    issues: &mut Vec<ReconstructError>,
) -> Result<IntervalRecord> {
    let interval = match entry.get(INTERVAL_KEY) {
        None => {
            debug!("entry {}: no interval descriptor, timestamps pinned to 0", index);
            None
        }
        Some(v) => {
            let parsed = v.as_str().and_then(parse_interval);
            if parsed.is_none() {
                return Err(ReconstructError::malformed(
                    index,
                    format!("unparseable interval descriptor {}", v),
                ));
            }
            parsed
        }
    };

    let gyro = window_of(entry, GYRO_BLOCK, GYRO_KEY, index, issues);
    let accel = window_of(entry, ACCEL_BLOCK, ACCEL_KEY, index, issues);
    if gyro.is_empty() && accel.is_empty() {
        return Err(ReconstructError::malformed(
            index,
            "no gyroscope or accelerometer data",
        ));
    }

    Ok(IntervalRecord {
        interval,
        gyro,
        accel,
    })
}

fn decode_flat(
    entry: &Map<String, Value>,
    index: usize,
    issues: &mut Vec<ReconstructError>,
) -> Result<Sample> {
    let mut channel = |key: &str| match entry.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => {
            let t = parse_triplet(v);
            if t.is_none() {
                issues.push(ReconstructError::malformed(
                    index,
                    format!("'{}' is not a numeric triplet", key),
                ));
            }
            t
        }
    };
    let gyro = channel(GYRO_KEY);
    let accel = channel(ACCEL_KEY);

    let timestamp_ms = match entry.get(TIMESTAMP_KEY) {
        None => 0.0,
        Some(v) => v.as_f64().ok_or_else(|| {
            ReconstructError::malformed(index, format!("non-numeric timestamp {}", v))
        })?,
    };

    Ok(Sample {
        gyro,
        accel,
        timestamp_ms,
    })
}

/// Match one entry against the known shapes, in order.
pub fn decode_record(
    value: &Value,
    index: usize,
    issues: &mut Vec<ReconstructError>,
) -> Result<TelemetryRecord> {
    let entry = value
        .as_object()
        .ok_or_else(|| ReconstructError::malformed(index, "entry is not an object"))?;

    if [GYRO_BLOCK, ACCEL_BLOCK, INTERVAL_KEY]
        .iter()
        .any(|k| entry.contains_key(*k))
    {
        return decode_interval(entry, index, issues).map(TelemetryRecord::Interval);
    }
    if [GYRO_KEY, ACCEL_KEY].iter().any(|k| entry.contains_key(*k)) {
        return decode_flat(entry, index, issues).map(TelemetryRecord::Flat);
    }

    let keys: Vec<&str> = entry.keys().map(String::as_str).collect();
    Err(ReconstructError::malformed(
        index,
        format!("unknown structure, keys {:?}", keys),
    ))
}

/// Decode a whole telemetry document (a JSON array of entries).
///
/// Malformed entries are skipped and reported in `issues`. The first decoded
/// entry fixes the frame; entries of the other shape are treated as malformed.
pub fn decode_telemetry(document: &Value) -> Result<DecodedTelemetry> {
    let entries = document
        .as_array()
        .ok_or_else(|| ReconstructError::Json("telemetry must be a JSON array".into()))?;

    let mut decoded = DecodedTelemetry::default();
    for (index, value) in entries.iter().enumerate() {
        let before = decoded.issues.len();
        let result = decode_record(value, index, &mut decoded.issues);
        for issue in &decoded.issues[before..] {
            warn!("Unreadable channel data: {}", issue);
        }

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                decoded.skip(e);
                continue;
            }
        };

        let frame = *decoded.frame.get_or_insert(record.frame());
        if frame != record.frame() {
            decoded.skip(ReconstructError::malformed(
                index,
                "record shape differs from the rest of the document",
            ));
            continue;
        }

        match record {
            TelemetryRecord::Interval(interval) => decoded.samples.extend(interval.flatten()),
            TelemetryRecord::Flat(sample) => decoded.samples.push(sample),
        }
    }

    info!(
        "Decoded {} samples from {} entries ({} skipped, {} issues)",
        decoded.samples.len(),
        entries.len(),
        decoded.skipped_entries,
        decoded.issues.len()
    );
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn window(n: usize, value: f64) -> Value {
        Value::Array((0..n).map(|_| json!([value, value, value])).collect())
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("(0, 1000)"), Some((0.0, 1000.0)));
        assert_eq!(parse_interval(" (1001,2002) "), Some((1001.0, 2002.0)));
        assert_eq!(parse_interval("0, 1000"), None);
        assert_eq!(parse_interval("(0, abc)"), None);
        assert_eq!(parse_interval("(0, 1, 2)"), None);
    }

    #[test]
    fn test_flatten_200_samples_timestamps() {
        let doc = json!([{
            "Gyroscope": {"3-axis gyroscope": window(200, 0.1)},
            "Accelerometer": {"3-axis accelerometer": window(200, 9.8)},
            "Interval in ms": "(0, 1000)"
        }]);
        let decoded = decode_telemetry(&doc).unwrap();
        let samples = decoded.samples;

        assert_eq!(samples.len(), 200);
        assert_eq!(samples[0].timestamp_ms, 0.0);
        assert_eq!(samples[199].timestamp_ms, 1000.0);
        for (i, s) in samples.iter().enumerate() {
            assert_abs_diff_eq!(s.timestamp_ms, i as f64 * 1000.0 / 199.0, epsilon = 1e-9);
        }
        assert!(samples.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        assert_eq!(decoded.frame, Some(Frame::Device));
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_single_channel_records_have_missing_channel() {
        let doc = json!([
            {"Accelerometer": {"3-axis accelerometer": window(3, 1.0)}, "Interval in ms": "(0, 10)"},
            {"Gyroscope": {"3-axis gyroscope": window(3, 1.0)}, "Interval in ms": "(10, 20)"}
        ]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert_eq!(decoded.samples.len(), 6);
        assert!(decoded.samples.iter().all(|s| !s.is_complete()));
    }

    #[test]
    fn test_bad_triplet_becomes_missing_channel() {
        let doc = json!([{
            "Gyroscope": {"3-axis gyroscope": [[1.0, 2.0, 3.0], [1.0, 2.0], [1.0, "x", 3.0]]},
            "Accelerometer": {"3-axis accelerometer": window(3, 0.0)},
            "Interval in ms": "(0, 20)"
        }]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert_eq!(decoded.samples.len(), 3);
        assert!(decoded.samples[0].is_complete());
        assert!(decoded.samples[1].gyro.is_none());
        assert!(decoded.samples[2].gyro.is_none());
        assert_eq!(decoded.issues.len(), 1);
        assert!(decoded.issues[0].is_recoverable());
        assert_eq!(decoded.skipped_entries, 0);
    }

    #[test]
    fn test_channel_issues_are_not_counted_as_skipped() {
        let doc = json!([
            {"Gyroscope": {"3-axis gyroscope": [[1.0, 2.0]]},
             "Accelerometer": {"3-axis accelerometer": window(1, 0.0)},
             "Interval in ms": "(0, 10)"},
            {"Barometer": [1013.0]}
        ]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert_eq!(decoded.samples.len(), 1);
        assert_eq!(decoded.issues.len(), 2);
        assert_eq!(decoded.skipped_entries, 1);
        assert!(matches!(
            decoded.issues[1],
            ReconstructError::MalformedEntry { index: 1, .. }
        ));
    }

    #[test]
    fn test_unknown_and_empty_entries_skipped() {
        let doc = json!([
            {"Magnetometer": {}},
            {"Interval in ms": "(0, 10)"},
            42,
            {"Gyroscope": {"3-axis gyroscope": window(2, 0.0)},
             "Accelerometer": {"3-axis accelerometer": window(2, 0.0)},
             "Interval in ms": "(0, 10)"}
        ]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert_eq!(decoded.samples.len(), 2);
        assert_eq!(decoded.issues.len(), 3);
        assert_eq!(decoded.skipped_entries, 3);
        assert!(matches!(
            decoded.issues[0],
            ReconstructError::MalformedEntry { index: 0, .. }
        ));
    }

    #[test]
    fn test_bad_interval_descriptor_rejects_record() {
        let doc = json!([{
            "Gyroscope": {"3-axis gyroscope": window(2, 0.0)},
            "Interval in ms": "zero to ten"
        }]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert!(decoded.samples.is_empty());
        assert_eq!(decoded.issues.len(), 1);
    }

    #[test]
    fn test_missing_interval_pins_timestamps() {
        let doc = json!([{
            "Gyroscope": {"3-axis gyroscope": window(3, 0.0)},
            "Accelerometer": {"3-axis accelerometer": window(3, 0.0)}
        }]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert!(decoded.samples.iter().all(|s| s.timestamp_ms == 0.0));
    }

    #[test]
    fn test_flat_records_are_reordered_frame() {
        let doc = json!([
            {"3-axis gyroscope": [1.0, 2.0, 3.0], "3-axis accelerometer": [4.0, 5.0, 6.0], "Timestamp in ms": 0.0},
            {"3-axis gyroscope": null, "3-axis accelerometer": [4.0, 5.0, 6.0], "Timestamp in ms": 5.0}
        ]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert_eq!(decoded.frame, Some(Frame::Reordered));
        assert_eq!(decoded.samples[0].gyro, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(decoded.samples[1].gyro, None);
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let doc = json!([
            {"3-axis gyroscope": [1.0, 2.0, 3.0], "3-axis accelerometer": [4.0, 5.0, 6.0], "Timestamp in ms": 0.0},
            {"Gyroscope": {"3-axis gyroscope": window(2, 0.0)}, "Interval in ms": "(0, 10)"}
        ]);
        let decoded = decode_telemetry(&doc).unwrap();
        assert_eq!(decoded.samples.len(), 1);
        assert_eq!(decoded.issues.len(), 1);
        assert_eq!(decoded.skipped_entries, 1);
    }

    #[test]
    fn test_non_array_document_is_error() {
        assert!(decode_telemetry(&json!({"readings": []})).is_err());
    }
}
