//! The live ship population and the per-tick advance/prune cycle.
//!
//! [`EntityRegistry`] is the single owner of every live [`Ship`]. A tick
//! fixes the set of ids up front, advances each ship once in id order, and
//! then prunes every ship that reached [`ShipStatus::Inbound`] in a separate
//! pass so removal never disturbs the iteration.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use starfield_types::{ShipId, ShipStatus};
use tracing::{debug, info, warn};

use crate::config::FlightConfig;
use crate::ship::{Ship, ShipEvent, ShipRecord};
use crate::space::SpacePointField;

/// Errors from registry mutations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A ship with the same id is already live.
    #[error("ship {0} is already registered")]
    AlreadyRegistered(ShipId),
}

/// What happened during one [`EntityRegistry::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Ships advanced this tick.
    pub advanced: usize,
    /// Space points discovered this tick.
    pub discoveries: usize,
    /// Waypoints reached this tick, final ones included.
    pub arrivals: usize,
    /// Ships pruned after reaching inbound.
    pub departed: Vec<ShipId>,
    /// Ships still live after the prune pass.
    pub active: usize,
}

/// Owner of all live ships, keyed and iterated by id.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    ships: BTreeMap<ShipId, Ship>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            ships: BTreeMap::new(),
        }
    }

    /// Register a ship and announce its arrival in both of its logs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] if the id is taken. The
    /// registry is left unchanged.
    pub fn add(&mut self, mut ship: Ship) -> Result<(), RegistryError> {
        let id = ship.id();
        if self.ships.contains_key(&id) {
            warn!(ship_id = %id, name = ship.name(), "Ship already registered, ignoring");
            return Err(RegistryError::AlreadyRegistered(id));
        }

        ship.add_ship_log(format!("Ship '{}' has entered space.", ship.name()));
        ship.add_mission_event(format!(
            "Ship '{}' has entered space. Its objective is {}.",
            ship.name(),
            ship.mission().objective
        ));
        info!(ship_id = %id, name = ship.name(), "Ship entered space");
        self.ships.insert(id, ship);
        Ok(())
    }

    /// Remove a ship by id, returning it if it was live.
    pub fn remove(&mut self, id: ShipId) -> Option<Ship> {
        let removed = self.ships.remove(&id);
        if removed.is_some() {
            info!(ship_id = %id, "Ship removed");
        }
        removed
    }

    /// Advance every live ship once, then prune the ones that went inbound.
    ///
    /// Ships are processed strictly in sequence against the shared field, so
    /// a visit recorded by one ship is visible to the ships after it.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        field: &mut SpacePointField,
        flight: &FlightConfig,
        rng: &mut R,
    ) -> TickReport {
        let mut report = TickReport::default();

        let ids: Vec<ShipId> = self.ships.keys().copied().collect();
        for id in ids {
            let Some(ship) = self.ships.get_mut(&id) else {
                continue;
            };
            match ship.advance(field, flight, rng) {
                ShipEvent::Discovered { point_id, visits } => {
                    debug!(ship_id = %id, point_id, visits, "Space point discovered");
                    report.discoveries = report.discoveries.saturating_add(1);
                }
                ShipEvent::ArrivedAtWaypoint | ShipEvent::ArrivedAtFinalWaypoint => {
                    report.arrivals = report.arrivals.saturating_add(1);
                }
                ShipEvent::Inactive
                | ShipEvent::Cruising
                | ShipEvent::Idle
                | ShipEvent::LeftSpace => {}
            }
            report.advanced = report.advanced.saturating_add(1);
        }

        report.departed = self.prune();
        report.active = self.ships.len();
        report
    }

    /// Remove every inbound ship, returning their ids.
    fn prune(&mut self) -> Vec<ShipId> {
        let departed: Vec<ShipId> = self
            .ships
            .iter()
            .filter(|(_, ship)| ship.status() == ShipStatus::Inbound)
            .map(|(id, _)| *id)
            .collect();

        for id in &departed {
            if let Some(ship) = self.ships.remove(id) {
                info!(
                    ship_id = %id,
                    name = ship.name(),
                    condition = ship.condition(),
                    "Ship left space"
                );
            }
        }
        departed
    }

    /// All live ships in id order.
    pub fn list(&self) -> Vec<&Ship> {
        self.ships.values().collect()
    }

    /// Look up a live ship.
    pub fn get(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Number of live ships.
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// Whether no ship is live.
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Persistence snapshots of every live ship.
    pub fn records(&self) -> Vec<ShipRecord> {
        self.ships.values().map(Ship::to_record).collect()
    }
}
