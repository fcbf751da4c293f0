//! The simulation authority: registry, field, flight parameters, and the
//! random source, advanced one tick at a time.
//!
//! One [`Simulation`] is built per process and shared behind a
//! [`SharedSimulation`] lock by the tick runner and the HTTP handlers.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use starfield_types::ShipId;
use tokio::sync::RwLock;

use crate::config::FlightConfig;
use crate::registry::{EntityRegistry, RegistryError, TickReport};
use crate::ship::{Ship, ShipBlueprint, ShipError, ShipRecord};
use crate::space::SpacePointField;

/// The simulation shared between the tick loop and request handlers.
pub type SharedSimulation = Arc<RwLock<Simulation>>;

/// Errors from placing a ship into the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The ship could not be built.
    #[error("invalid ship: {source}")]
    Ship {
        /// The underlying ship error.
        #[from]
        source: ShipError,
    },

    /// The ship could not be registered.
    #[error("registry rejected ship: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: RegistryError,
    },
}

/// Result of one [`Simulation::step`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick number that just ran, starting at 1.
    pub tick: u64,
    /// What the registry did during the tick.
    pub report: TickReport,
}

/// Live population plus everything it flies through.
#[derive(Debug)]
pub struct Simulation {
    registry: EntityRegistry,
    field: SpacePointField,
    flight: FlightConfig,
    rng: SmallRng,
    tick: u64,
}

impl Simulation {
    /// Create a simulation seeded from the operating system.
    pub fn new(field: SpacePointField, flight: FlightConfig) -> Self {
        Self::with_rng(field, flight, SmallRng::from_os_rng())
    }

    /// Create a simulation with an explicit random source.
    pub const fn with_rng(field: SpacePointField, flight: FlightConfig, rng: SmallRng) -> Self {
        Self {
            registry: EntityRegistry::new(),
            field,
            flight,
            rng,
            tick: 0,
        }
    }

    /// Wrap this simulation for sharing across tasks.
    pub fn into_shared(self) -> SharedSimulation {
        Arc::new(RwLock::new(self))
    }

    /// Advance the whole population by one tick.
    pub fn step(&mut self) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        let report = self
            .registry
            .tick(&mut self.field, &self.flight, &mut self.rng);
        TickSummary {
            tick: self.tick,
            report,
        }
    }

    /// Build a fresh ship from `blueprint` and put it into space.
    pub fn launch(&mut self, blueprint: ShipBlueprint) -> Result<ShipId, SimulationError> {
        let ship = Ship::new(blueprint, None, &self.field, &self.flight, &mut self.rng)?;
        let id = ship.id();
        self.registry.add(ship)?;
        Ok(id)
    }

    /// Rebuild a persisted ship and put it back into space.
    pub fn resume(&mut self, record: ShipRecord) -> Result<ShipId, SimulationError> {
        let ship = Ship::from_record(record, &self.field, &self.flight, &mut self.rng)?;
        let id = ship.id();
        self.registry.add(ship)?;
        Ok(id)
    }

    /// The live population.
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The live population, mutably.
    pub const fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// The space point field.
    pub const fn field(&self) -> &SpacePointField {
        &self.field
    }

    /// Flight parameters used for every ship.
    pub const fn flight(&self) -> &FlightConfig {
        &self.flight
    }

    /// Number of ticks run so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}
