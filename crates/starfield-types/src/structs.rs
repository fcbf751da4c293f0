//! Plain data structs shared across the workspace.
//!
//! Covers the 3D [`Coordinates`] used for ship positions and waypoints, the
//! named [`SpacePoint`] points of interest, and the timestamped [`LogEntry`]
//! used for both ship logs and mission events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A point or vector in mission space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// X axis.
    pub x: f64,
    /// Y axis.
    pub y: f64,
    /// Z axis.
    pub z: f64,
}

impl Coordinates {
    /// The mission-area origin every ship returns to.
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create coordinates from three components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The vector pointing from `self` to `other`.
    pub fn delta_to(&self, other: &Self) -> Self {
        Self {
            x: other.x - self.x,
            y: other.y - self.y,
            z: other.z - self.z,
        }
    }

    /// Euclidean length of this vector.
    pub fn magnitude(&self) -> f64 {
        self.z.mul_add(self.z, self.x.mul_add(self.x, self.y * self.y)).sqrt()
    }

    /// Euclidean distance between two points.
    pub fn distance_to(&self, other: &Self) -> f64 {
        self.delta_to(other).magnitude()
    }

    /// This vector multiplied by a scalar.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    /// This point moved by `offset`.
    pub fn translated(&self, offset: &Self) -> Self {
        Self {
            x: self.x + offset.x,
            y: self.y + offset.y,
            z: self.z + offset.z,
        }
    }
}

impl core::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// SpacePoint
// ---------------------------------------------------------------------------

/// A named point of interest in the space field.
///
/// Positions are fixed at creation. `visit_count` only grows, through the
/// field's visit operation. `id` is the point's index in the field and is how
/// a ship's private copy finds its way back to the shared entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpacePoint {
    /// Stable index of the point within its field.
    pub id: u32,
    /// Display name, e.g. `"Qzr-417"`. Not guaranteed unique.
    pub name: String,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
    /// Number of times a ship has discovered this point.
    pub visit_count: u32,
}

impl SpacePoint {
    /// The point's location as floating-point coordinates.
    pub fn position(&self) -> Coordinates {
        Coordinates::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// Distance from `origin` to this point.
    pub fn distance_to(&self, origin: &Coordinates) -> f64 {
        origin.distance_to(&self.position())
    }
}

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// A timestamped line in a ship log or a mission event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Human-readable text.
    pub description: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn now(description: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            description: description.into(),
        }
    }
}
