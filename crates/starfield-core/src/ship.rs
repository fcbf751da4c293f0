//! A single ship: its state machine, waypoint queue, and per-tick flight.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──(last waypoint reached)──> InboundSpace ──(origin reached)──> Inbound
//! ```
//!
//! A ship is built by one factory, [`Ship::new`], which either launches it
//! fresh (waypoints and prospective points generated) or resumes it from a
//! persisted [`Voyage`].
//!
//! # Per-tick order
//!
//! [`Ship::advance`] runs, in order: condition wear, movement, scan, and one
//! of four mutually exclusive outcomes (left space, discovery, waypoint
//! arrival, cruising). The arrival check re-measures the distance and may
//! correct the heading each time it is called, and it is called up to twice
//! per tick. That second call is intentional and must not be cached.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};
use starfield_types::{Coordinates, LogEntry, ShipId, ShipStatus, SpacePoint};

use crate::chatter;
use crate::config::FlightConfig;
use crate::mission::{Mission, MissionBrief};
use crate::space::{self, SpacePointField};

/// Consecutive rejected samples after which the mission center is used as
/// the waypoint.
pub const MAX_REJECTION_ATTEMPTS: u32 = 1000;

/// Upper bound on generated waypoints for a single mission.
pub const MAX_DESTINATIONS: u32 = 10_000;

/// Condition a ship is launched with when none is given.
pub const DEFAULT_CONDITION: u32 = 100;

/// Below this distance the heading is the raw delta instead of a unit vector.
const UNIT_HEADING_MIN_DISTANCE: f64 = 1.0;

/// Errors that can occur when building a ship.
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    /// A non-terminal ship was resumed without any waypoint.
    #[error("ship {ship} is {status} but has no destinations")]
    EmptyDestinations {
        /// The ship being resumed.
        ship: ShipId,
        /// The status it was resumed with.
        status: ShipStatus,
    },
}

/// What a ship is launched with: identity, hull condition, and mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipBlueprint {
    /// Ship identifier. Generated when omitted.
    #[serde(default)]
    pub id: ShipId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Starting hull condition.
    #[serde(default = "default_condition")]
    pub condition: u32,
    /// The mission to fly.
    pub mission: MissionBrief,
}

/// The mutable part of a ship that survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voyage {
    /// Lifecycle status.
    pub status: ShipStatus,
    /// Current position.
    pub position: Coordinates,
    /// Remaining waypoints; the head is the current destination.
    pub destinations: VecDeque<Coordinates>,
    /// Distance measured by the last arrival check.
    pub distance_to_destination: f64,
    /// Points of interest this ship may still discover.
    pub prospective_points: Vec<SpacePoint>,
    /// Narrow scans since the last wide scan.
    pub scan_counter: u32,
    /// Ship log.
    pub logs: Vec<LogEntry>,
    /// Mission event log.
    pub events: Vec<LogEntry>,
}

/// Everything needed to rebuild a ship exactly where it left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipRecord {
    /// Identity, condition, and mission.
    pub blueprint: ShipBlueprint,
    /// Flight state.
    pub voyage: Voyage,
}

/// Outcome of one [`Ship::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipEvent {
    /// The ship was already inbound and did nothing.
    Inactive,
    /// Flying with nothing in range.
    Cruising,
    /// The scan found points but the selected slot was already empty.
    Idle,
    /// A prospective point was discovered.
    Discovered {
        /// Field id of the discovered point.
        point_id: u32,
        /// Total visits of that point after this discovery.
        visits: u32,
    },
    /// Reached an intermediate waypoint.
    ArrivedAtWaypoint,
    /// Reached the last waypoint and turned for home.
    ArrivedAtFinalWaypoint,
    /// Reached the origin and left the mission volume.
    LeftSpace,
}

/// A ship flying a mission.
#[derive(Debug, Clone, Serialize)]
pub struct Ship {
    id: ShipId,
    name: String,
    description: String,
    status: ShipStatus,
    condition: u32,
    mission: Mission,
    logs: Vec<LogEntry>,
    position: Coordinates,
    current_destination: Coordinates,
    direction: Coordinates,
    destinations: VecDeque<Coordinates>,
    distance_to_destination: f64,
    prospective_points: Vec<SpacePoint>,
    scan_counter: u32,
}

impl Ship {
    /// Build a ship from its blueprint.
    ///
    /// Without `prior`, the ship starts at the origin with waypoints sampled
    /// inside the mission sphere and a private snapshot of the field points
    /// within it. With `prior`, all flight state is taken as given and
    /// nothing is generated.
    ///
    /// # Errors
    ///
    /// Returns [`ShipError::EmptyDestinations`] if `prior` is not terminal
    /// but has an empty waypoint queue.
    pub fn new<R: Rng + ?Sized>(
        blueprint: ShipBlueprint,
        prior: Option<Voyage>,
        field: &SpacePointField,
        flight: &FlightConfig,
        rng: &mut R,
    ) -> Result<Self, ShipError> {
        let voyage = match prior {
            Some(voyage) => {
                if voyage.destinations.is_empty() && !voyage.status.is_terminal() {
                    return Err(ShipError::EmptyDestinations {
                        ship: blueprint.id,
                        status: voyage.status,
                    });
                }
                voyage
            }
            None => Voyage {
                status: ShipStatus::Active,
                position: Coordinates::ORIGIN,
                destinations: generate_destinations(
                    &blueprint.mission.center,
                    blueprint.mission.radius,
                    flight.subdestination_factor,
                    rng,
                ),
                distance_to_destination: 0.0,
                prospective_points: field
                    .nearby(&blueprint.mission.center, blueprint.mission.radius),
                scan_counter: 0,
                logs: Vec::new(),
                events: Vec::new(),
            },
        };

        let current_destination = voyage
            .destinations
            .front()
            .copied()
            .unwrap_or(Coordinates::ORIGIN);

        Ok(Self {
            id: blueprint.id,
            name: blueprint.name,
            description: blueprint.description,
            status: voyage.status,
            condition: blueprint.condition,
            mission: Mission::resume(blueprint.mission, voyage.events),
            logs: voyage.logs,
            position: voyage.position,
            current_destination,
            direction: heading(&voyage.position, &current_destination),
            destinations: voyage.destinations,
            distance_to_destination: voyage.distance_to_destination,
            prospective_points: voyage.prospective_points,
            scan_counter: voyage.scan_counter,
        })
    }

    /// Rebuild a ship from its persisted record.
    ///
    /// # Errors
    ///
    /// See [`Ship::new`].
    pub fn from_record<R: Rng + ?Sized>(
        record: ShipRecord,
        field: &SpacePointField,
        flight: &FlightConfig,
        rng: &mut R,
    ) -> Result<Self, ShipError> {
        Self::new(record.blueprint, Some(record.voyage), field, flight, rng)
    }

    /// Snapshot this ship for persistence.
    pub fn to_record(&self) -> ShipRecord {
        ShipRecord {
            blueprint: ShipBlueprint {
                id: self.id,
                name: self.name.clone(),
                description: self.description.clone(),
                condition: self.condition,
                mission: self.mission.brief(),
            },
            voyage: Voyage {
                status: self.status,
                position: self.position,
                destinations: self.destinations.clone(),
                distance_to_destination: self.distance_to_destination,
                prospective_points: self.prospective_points.clone(),
                scan_counter: self.scan_counter,
                logs: self.logs.clone(),
                events: self.mission.events().to_vec(),
            },
        }
    }

    /// Advance the ship by one tick.
    ///
    /// Does nothing once the ship is [`ShipStatus::Inbound`].
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        field: &mut SpacePointField,
        flight: &FlightConfig,
        rng: &mut R,
    ) -> ShipEvent {
        if self.status.is_terminal() {
            return ShipEvent::Inactive;
        }

        if roll(rng, flight.degradation_chance) {
            self.condition = self.condition.saturating_sub(1);
        }

        self.position = self
            .position
            .translated(&self.direction.scaled(flight.velocity));

        let scan = if self.scan_counter >= flight.scan_frequency {
            self.scan_counter = 0;
            field.nearby(&self.position, flight.wide_scan_radius)
        } else {
            self.scan_counter = self.scan_counter.saturating_add(1);
            space::points_within(
                &self.position,
                flight.narrow_scan_radius,
                &self.prospective_points,
            )
        };

        if self.is_near_destination(flight.arrival_range)
            && self.status == ShipStatus::InboundSpace
        {
            self.status = ShipStatus::Inbound;
            self.add_mission_event(format!(
                "Ship '{}' has left space. It is now inbound.",
                self.name
            ));
            return ShipEvent::LeftSpace;
        }

        if !scan.is_empty() {
            return self.discover(scan.len(), field, rng);
        }

        if self.is_near_destination(flight.arrival_range) {
            return self.arrive();
        }

        if roll(rng, flight.ship_log_chance) {
            let message = chatter::ship_log_message(&self.name, self.condition, rng);
            self.add_ship_log(message);
        }
        if roll(rng, flight.mission_event_chance) {
            let message = chatter::mission_event_message(&self.name, self.condition, rng);
            self.add_mission_event(message);
        }
        ShipEvent::Cruising
    }

    /// Append a line to the ship log.
    pub fn add_ship_log(&mut self, description: impl Into<String>) {
        self.logs.push(LogEntry::now(description));
    }

    /// Append an event to the mission log.
    pub fn add_mission_event(&mut self, description: impl Into<String>) {
        self.mission.add_event(description);
    }

    /// Pick one of the ship's own prospective points. The slot index is drawn
    /// over the scan result, so it can miss the list entirely.
    fn discover<R: Rng + ?Sized>(
        &mut self,
        found: usize,
        field: &mut SpacePointField,
        rng: &mut R,
    ) -> ShipEvent {
        let slot = rng.random_range(0..found);
        if slot >= self.prospective_points.len() {
            return ShipEvent::Idle;
        }

        let mut point = self.prospective_points.remove(slot);
        let visits = field.record_visit(&mut point);
        self.add_mission_event(format!(
            "Ship '{}' has discovered space point {}! It has been visited {} time(s).",
            self.name, point.name, visits
        ));
        ShipEvent::Discovered {
            point_id: point.id,
            visits,
        }
    }

    /// Pop the reached waypoint and head for the next one, turning for the
    /// origin when the queue runs out.
    fn arrive(&mut self) -> ShipEvent {
        let reached = self
            .destinations
            .pop_front()
            .unwrap_or(self.current_destination);

        let event = if self.destinations.is_empty() {
            self.destinations.push_back(Coordinates::ORIGIN);
            self.status = ShipStatus::InboundSpace;
            self.add_mission_event(format!(
                "Ship '{}' has arrived at its final subdestination coordinates {reached}, and is now returning.",
                self.name
            ));
            ShipEvent::ArrivedAtFinalWaypoint
        } else {
            self.add_mission_event(format!(
                "Ship '{}' has arrived at subdestination coordinates {reached}.",
                self.name
            ));
            ShipEvent::ArrivedAtWaypoint
        };

        self.current_destination = self
            .destinations
            .front()
            .copied()
            .unwrap_or(Coordinates::ORIGIN);
        self.direction = heading(&self.position, &self.current_destination);
        event
    }

    /// Re-measure the distance to the current destination.
    ///
    /// If the ship has drifted further away since the last measurement the
    /// heading is recomputed. The new distance is always stored.
    fn is_near_destination(&mut self, arrival_range: f64) -> bool {
        let distance = self.position.distance_to(&self.current_destination);
        if distance > self.distance_to_destination {
            self.direction = heading(&self.position, &self.current_destination);
        }
        self.distance_to_destination = distance;
        distance < arrival_range
    }

    /// Ship identifier.
    pub const fn id(&self) -> ShipId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Lifecycle status.
    pub const fn status(&self) -> ShipStatus {
        self.status
    }

    /// Hull condition.
    pub const fn condition(&self) -> u32 {
        self.condition
    }

    /// The mission being flown.
    pub const fn mission(&self) -> &Mission {
        &self.mission
    }

    /// Ship log.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Current position.
    pub const fn position(&self) -> Coordinates {
        self.position
    }

    /// The waypoint currently steered toward.
    pub const fn current_destination(&self) -> Coordinates {
        self.current_destination
    }

    /// Per-tick heading.
    pub const fn direction(&self) -> Coordinates {
        self.direction
    }

    /// Remaining waypoints.
    pub const fn destinations(&self) -> &VecDeque<Coordinates> {
        &self.destinations
    }

    /// Distance measured by the last arrival check.
    pub const fn distance_to_destination(&self) -> f64 {
        self.distance_to_destination
    }

    /// Points this ship may still discover.
    pub fn prospective_points(&self) -> &[SpacePoint] {
        &self.prospective_points
    }

    /// Narrow scans since the last wide scan.
    pub const fn scan_counter(&self) -> u32 {
        self.scan_counter
    }
}

/// How many waypoints a mission of `radius` gets: one per `factor` of
/// radius, at least one.
pub fn destination_count(radius: f64, factor: f64) -> usize {
    if radius <= 0.0 || factor <= 0.0 || !radius.is_finite() || !factor.is_finite() {
        return 1;
    }
    let count = (radius / factor).ceil().clamp(1.0, f64::from(MAX_DESTINATIONS));
    // `count` is an integral value within [1, MAX_DESTINATIONS].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = count as u32;
    usize::try_from(count).unwrap_or(1)
}

/// Sample the waypoint queue for a mission sphere.
///
/// Each waypoint is drawn uniformly from the cube of side `2 * radius`
/// around `center` and kept only if it lies strictly inside the sphere.
/// When `radius < factor` the first draw is always kept.
pub fn generate_destinations<R: Rng + ?Sized>(
    center: &Coordinates,
    radius: f64,
    factor: f64,
    rng: &mut R,
) -> VecDeque<Coordinates> {
    let unconditional = radius < factor;
    (0..destination_count(radius, factor))
        .map(|_| sample_destination(center, radius, unconditional, rng))
        .collect()
}

fn sample_destination<R: Rng + ?Sized>(
    center: &Coordinates,
    radius: f64,
    unconditional: bool,
    rng: &mut R,
) -> Coordinates {
    if radius <= 0.0 || !radius.is_finite() {
        return *center;
    }
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let offset = Coordinates::new(
            rng.random_range(-radius..radius),
            rng.random_range(-radius..radius),
            rng.random_range(-radius..radius),
        );
        let candidate = center.translated(&offset);
        if unconditional || candidate.distance_to(center) < radius {
            return candidate;
        }
    }
    *center
}

/// Unit vector from `from` toward `to`, or the raw delta when the two are
/// closer than one unit.
pub fn heading(from: &Coordinates, to: &Coordinates) -> Coordinates {
    let delta = from.delta_to(to);
    let distance = delta.magnitude();
    if distance < UNIT_HEADING_MIN_DISTANCE {
        delta
    } else {
        delta.scaled(distance.recip())
    }
}

/// A Bernoulli roll that treats out-of-range probabilities as 0 or 1.
fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    chance > 0.0 && rng.random_bool(chance.min(1.0))
}

const fn default_condition() -> u32 {
    DEFAULT_CONDITION
}
