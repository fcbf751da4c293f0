//! The shared field of named points of interest.
//!
//! Points are generated once per world and every query is a linear scan.
//!
//! Ships hold owned snapshots of points, so visits are routed back to the
//! canonical entry by [`SpacePoint::id`].

use rand::Rng;
use starfield_types::{Coordinates, SpacePoint};
use tracing::debug;

/// Characters used for the three-letter name prefix.
const NAME_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of the letter prefix of a point name.
const NAME_PREFIX_LEN: usize = 3;

/// Exclusive upper bound of the numeric name suffix.
const NAME_SUFFIX_MAX: u32 = 1000;

/// The shared collection of points of interest.
#[derive(Debug, Clone, Default)]
pub struct SpacePointField {
    points: Vec<SpacePoint>,
}

impl SpacePointField {
    /// Create an empty field.
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Generate `count` fresh points inside the cube `[-extent, extent)` on
    /// every axis, all with a visit count of zero.
    ///
    /// Name and coordinate collisions are allowed.
    pub fn generate<R: Rng + ?Sized>(count: u32, extent: i32, rng: &mut R) -> Self {
        let extent = extent.max(1);
        let points = (0..count)
            .map(|id| SpacePoint {
                id,
                name: random_name(rng),
                x: rng.random_range(-extent..extent),
                y: rng.random_range(-extent..extent),
                z: rng.random_range(-extent..extent),
                visit_count: 0,
            })
            .collect();
        Self { points }
    }

    /// Rebuild a field from previously persisted points.
    pub const fn from_points(points: Vec<SpacePoint>) -> Self {
        Self { points }
    }

    /// All points in the field.
    pub fn points(&self) -> &[SpacePoint] {
        &self.points
    }

    /// Number of points in the field.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the field has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look up a point by id.
    pub fn get(&self, id: u32) -> Option<&SpacePoint> {
        self.points.iter().find(|point| point.id == id)
    }

    /// Every point of the whole field strictly closer than `radius` to
    /// `origin`, as owned copies.
    pub fn nearby(&self, origin: &Coordinates, radius: f64) -> Vec<SpacePoint> {
        points_within(origin, radius, &self.points)
    }

    /// Count a discovery of `point`.
    ///
    /// Increments the field's entry with the same id and mirrors the new
    /// total into `point`, so the caller's copy and every later reader of
    /// the field agree. A point that is not part of this field only has its
    /// own counter incremented. Returns the new total.
    pub fn record_visit(&mut self, point: &mut SpacePoint) -> u32 {
        let total = match self.points.iter_mut().find(|entry| entry.id == point.id) {
            Some(entry) => {
                entry.visit_count = entry.visit_count.saturating_add(1);
                entry.visit_count
            }
            None => {
                debug!(point = point.name, id = point.id, "Visited point is not in the field");
                point.visit_count.saturating_add(1)
            }
        };
        point.visit_count = total;
        total
    }
}

/// Every point in `candidates` whose distance to `origin` is strictly less
/// than `radius`, in candidate order.
pub fn points_within(origin: &Coordinates, radius: f64, candidates: &[SpacePoint]) -> Vec<SpacePoint> {
    candidates
        .iter()
        .filter(|point| point.distance_to(origin) < radius)
        .cloned()
        .collect()
}

/// A name of the form `Abc-123`.
fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix: String = (0..NAME_PREFIX_LEN)
        .filter_map(|_| {
            let idx = rng.random_range(0..NAME_LETTERS.len());
            NAME_LETTERS.get(idx).map(|&b| char::from(b))
        })
        .collect();
    let suffix = rng.random_range(0..NAME_SUFFIX_MAX);
    format!("{prefix}-{suffix}")
}
