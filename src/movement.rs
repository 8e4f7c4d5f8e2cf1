//! Movement records handed to the robot playback side.
//!
//! On disk a plan is a JSON object keyed `movement_0`, `movement_1`, ... with
//! `{"coordinates": [x, y, z, roll, pitch, yaw]}` values. Key order matters to the
//! player, so serialization walks the movements by index rather than relying on
//! map ordering, and loading sorts keys numerically and insists they are dense.

use std::fmt;

use log::debug;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::WorkspaceBounds;
use crate::error::{ReconstructError, Result};
use crate::types::{AxisSeries, Vec3, AXIS_COUNT, MOVEMENT_DIM};

const KEY_PREFIX: &str = "movement_";

/// One robot pose: position in meters then orientation in radians.
#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    pub index: usize,
    pub coordinates: [f64; MOVEMENT_DIM],
}

impl Movement {
    pub fn key(&self) -> String {
        format!("{}{}", KEY_PREFIX, self.index)
    }

    pub fn position(&self) -> [f64; AXIS_COUNT] {
        [self.coordinates[0], self.coordinates[1], self.coordinates[2]]
    }

    pub fn orientation(&self) -> [f64; AXIS_COUNT] {
        [self.coordinates[3], self.coordinates[4], self.coordinates[5]]
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Pairs mapped positions with the orientation sample at the same strided index.
pub struct MovementComposer {
    step: usize,
    decimals: u32,
    bounds: Option<WorkspaceBounds>,
}

impl MovementComposer {
    pub fn new(step: usize, decimals: u32) -> Self {
        Self {
            step: step.max(1),
            decimals,
            bounds: None,
        }
    }

    /// Keep rounded positions inside `bounds`.
    ///
    /// A bound with more decimals than the rounding keeps can round outward; such
    /// a coordinate is emitted as the bound itself.
    pub fn with_bounds(mut self, bounds: WorkspaceBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Movement `i` takes position row `i` and `gyro[i * step]`, unsmoothed.
    ///
    /// The result is as long as the shorter of the two sequences.
    pub fn compose(&self, positions: &AxisSeries, gyro: &[Vec3]) -> Vec<Movement> {
        let movements: Vec<Movement> = positions
            .rows()
            .into_iter()
            .zip(gyro.iter().step_by(self.step))
            .enumerate()
            .map(|(index, (pos, g))| {
                let raw = [pos[0], pos[1], pos[2], g.x, g.y, g.z];
                let mut coordinates = raw.map(|c| round_to(c, self.decimals));
                if let Some(bounds) = &self.bounds {
                    for (c, range) in coordinates.iter_mut().zip(bounds.ranges()) {
                        *c = c.clamp(range.min, range.max);
                    }
                }
                Movement { index, coordinates }
            })
            .collect();
        debug!("Composed {} movements", movements.len());
        movements
    }
}

/// An ordered movement list with the on-disk key layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovementPlan {
    pub movements: Vec<Movement>,
}

impl MovementPlan {
    pub fn new(movements: Vec<Movement>) -> Self {
        Self { movements }
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Min and max of each position axis, `None` for an empty plan.
    pub fn extents(&self) -> Option<[(f64, f64); AXIS_COUNT]> {
        if self.movements.is_empty() {
            return None;
        }
        let mut extents = [(f64::INFINITY, f64::NEG_INFINITY); AXIS_COUNT];
        for m in &self.movements {
            for (axis, v) in m.position().iter().enumerate() {
                extents[axis].0 = extents[axis].0.min(*v);
                extents[axis].1 = extents[axis].1.max(*v);
            }
        }
        Some(extents)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ReconstructError::InvalidPlan(e.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct CoordinatesEntry {
    coordinates: Vec<f64>,
}

impl Serialize for MovementPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.movements.len()))?;
        for m in &self.movements {
            map.serialize_entry(
                &m.key(),
                &CoordinatesEntry {
                    coordinates: m.coordinates.to_vec(),
                },
            )?;
        }
        map.end()
    }
}

fn parse_key(key: &str) -> Option<usize> {
    key.strip_prefix(KEY_PREFIX)?.parse().ok()
}

struct PlanVisitor;

impl<'de> Visitor<'de> for PlanVisitor {
    type Value = MovementPlan;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of movement_<n> to {coordinates: [6 numbers]}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<MovementPlan, A::Error> {
        use serde::de::Error;

        let mut movements = Vec::new();
        while let Some((key, entry)) = access.next_entry::<String, CoordinatesEntry>()? {
            let index = parse_key(&key)
                .ok_or_else(|| A::Error::custom(format!("unexpected key '{}'", key)))?;
            let coordinates: [f64; MOVEMENT_DIM] =
                entry.coordinates.as_slice().try_into().map_err(|_| {
                    A::Error::custom(format!(
                        "{} has {} coordinates, expected {}",
                        key,
                        entry.coordinates.len(),
                        MOVEMENT_DIM
                    ))
                })?;
            movements.push(Movement { index, coordinates });
        }

        movements.sort_by_key(|m| m.index);
        for (expected, m) in movements.iter().enumerate() {
            if m.index != expected {
                return Err(A::Error::custom(format!(
                    "movement keys are not dense: expected {}{}, found {}",
                    KEY_PREFIX,
                    expected,
                    m.key()
                )));
            }
        }
        Ok(MovementPlan { movements })
    }
}

impl<'de> Deserialize<'de> for MovementPlan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(PlanVisitor)
    }
}
