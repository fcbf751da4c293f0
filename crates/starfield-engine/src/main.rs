//! Engine binary for the Starfield ship simulation.
//!
//! This is the main entry point that wires the simulation core to its
//! outer collaborators. It loads configuration, reaches the database if one
//! is configured, restores or seeds the population, serves the HTTP API,
//! and runs the tick loop until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `starfield-config.yaml`
//! 3. Build the persistence gate and probe the database
//! 4. Load or generate the space field
//! 5. Restore persisted ships, or launch seed ships into an empty sky
//! 6. Start the HTTP API server
//! 7. Run the tick loop until `max_ticks` or Ctrl-C
//! 8. Flush the final state and log the result

mod error;
mod launch;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use starfield_api::{AppState, ServerConfig};
use starfield_core::config::{PersistenceConfig, SimulationConfig};
use starfield_core::persistence::Persistence;
use starfield_core::runner::{self, PersistenceSync, StopSignal};
use starfield_core::ship::ShipRecord;
use starfield_core::simulation::{SharedSimulation, Simulation};
use starfield_core::space::SpacePointField;
use starfield_db::{PgShipStore, PostgresConfig, PostgresPool};
use starfield_types::SpacePoint;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "starfield-config.yaml";

/// Application entry point for the engine.
///
/// Initializes all subsystems and runs the simulation loop. Returns
/// an error code on failure.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("starfield-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        point_count = config.space.point_count,
        extent = config.space.extent,
        seed_ships = config.space.seed_ships,
        tick_interval_ms = config.runner.tick_interval_ms,
        max_ticks = config.runner.max_ticks,
        persistence_enabled = config.persistence.enabled,
        "Configuration loaded"
    );

    // 3. Build the persistence gate.
    let (persistence, pool) = connect_persistence(&config.persistence).await?;
    info!(
        configured = persistence.is_configured(),
        available = persistence.is_available(),
        policy = ?persistence.policy(),
        "Persistence gate ready"
    );

    // 4. Load or generate the space field.
    let stored_points = persistence.load_space_points().await;
    let fresh_field = stored_points.is_none();
    let field = stored_points.map_or_else(
        || SpacePointField::generate(config.space.point_count, config.space.extent, &mut rand::rng()),
        SpacePointField::from_points,
    );
    info!(points = field.len(), fresh = fresh_field, "Space field ready");
    if fresh_field {
        persistence.save_space_points(field.points().to_vec()).await;
    }

    // 5. Restore or seed the population.
    let records = persistence.load_population().await;
    let simulation = populate(Simulation::new(field, config.flight), records, &config)?;
    info!(ships = simulation.registry().len(), "Population ready");
    if !simulation.registry().is_empty() {
        persistence.save_ships(simulation.registry().records()).await;
    }
    let simulation = simulation.into_shared();

    // 6. Start the HTTP API server.
    let stop = Arc::new(StopSignal::new());
    let app_state = Arc::new(AppState::new(Arc::clone(&simulation), persistence.clone()));
    let server_config = ServerConfig::from(&config.api);
    let server_handle = {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            let shutdown_signal = Arc::clone(&stop);
            let result = starfield_api::start_server(&server_config, app_state, async move {
                shutdown_signal.stopped().await;
            })
            .await;
            if result.is_err() {
                stop.request_stop();
            }
            result
        })
    };

    // 6b. Ctrl-C ends the run.
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    stop.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 7. Run the simulation.
    let mut sync = PersistenceSync::new(persistence.clone(), &config.runner, &config.persistence);
    let outcome = runner::run_simulation(&simulation, &config.runner, &stop, &mut sync).await;
    stop.request_stop();

    // 8. Flush the final state and shut down.
    sync.settle().await;
    let (records, points) = snapshot(&simulation).await;
    persistence.flush(records, points).await;

    server_handle.await.map_err(|e| EngineError::Task {
        message: format!("API server task failed: {e}"),
    })??;

    if let Some(pool) = pool {
        pool.close().await;
    }

    let result = outcome?;
    runner::log_simulation_end(&result);

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "starfield-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration from `starfield-config.yaml`.
///
/// Looks for the config file relative to the current working directory and
/// falls back to defaults, still honoring environment overrides.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Build the persistence gate and run the startup probe.
///
/// When the store answers, migrations are applied and, if requested, stored
/// state is wiped. A store that never answers leaves the gate offline; the
/// pool is still returned so it can be closed on shutdown.
async fn connect_persistence(
    config: &PersistenceConfig,
) -> Result<(Persistence, Option<PostgresPool>), EngineError> {
    if !config.enabled {
        info!("Persistence disabled in configuration");
        return Ok((Persistence::disabled(), None));
    }

    let pool = PostgresPool::connect_lazy(&PostgresConfig::new(&config.database_url))?;
    let persistence = Persistence::new(
        Arc::new(PgShipStore::new(pool.clone())),
        config.offline_policy,
    );

    let reachable = persistence
        .connect_probe(config.probe_attempts, Duration::from_millis(config.probe_delay_ms))
        .await;
    if reachable {
        pool.run_migrations().await?;
        if config.reset_on_start {
            pool.reset().await?;
            warn!("Stored ships and space points wiped on start");
        }
    }

    Ok((persistence, Some(pool)))
}

/// Rebuild persisted ships, then seed an empty sky.
///
/// A record that cannot be rebuilt is skipped with a warning rather than
/// failing startup.
fn populate(
    mut simulation: Simulation,
    records: Vec<ShipRecord>,
    config: &SimulationConfig,
) -> Result<Simulation, EngineError> {
    let restored = records.len();
    for record in records {
        let id = record.blueprint.id;
        if let Err(e) = simulation.resume(record) {
            warn!(ship_id = %id, error = %e, "Skipping persisted ship");
        }
    }

    if restored == 0 && config.space.seed_ships > 0 {
        let blueprints =
            launch::seed_blueprints(config.space.seed_ships, config.space.extent, &mut rand::rng());
        for blueprint in blueprints {
            let name = blueprint.name.clone();
            let id = simulation.launch(blueprint)?;
            info!(ship_id = %id, name = %name, "Seed ship launched");
        }
    }

    Ok(simulation)
}

/// Copy the population and field out from under the read lock.
async fn snapshot(simulation: &SharedSimulation) -> (Vec<ShipRecord>, Vec<SpacePoint>) {
    let guard = simulation.read().await;
    (guard.registry().records(), guard.field().points().to_vec())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use starfield_core::config::FlightConfig;
    use starfield_types::ShipStatus;

    use super::*;

    fn simulation() -> Simulation {
        let mut rng = SmallRng::seed_from_u64(9);
        let field = SpacePointField::generate(40, 1000, &mut rng);
        Simulation::with_rng(field, FlightConfig::default(), rng)
    }

    fn config(seed_ships: u32) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.space.seed_ships = seed_ships;
        config
    }

    #[test]
    fn empty_sky_is_seeded() {
        let sim = populate(simulation(), Vec::new(), &config(4)).unwrap();
        assert_eq!(sim.registry().len(), 4);
        assert!(
            sim.registry()
                .list()
                .iter()
                .all(|ship| ship.status() == ShipStatus::Active)
        );
    }

    #[test]
    fn restored_population_is_not_reseeded() {
        let mut donor = simulation();
        let mut rng = SmallRng::seed_from_u64(10);
        for blueprint in launch::seed_blueprints(2, 1000, &mut rng) {
            donor.launch(blueprint).unwrap();
        }
        donor.step();

        let sim = populate(simulation(), donor.registry().records(), &config(5)).unwrap();
        assert_eq!(sim.registry().len(), 2);
    }

    #[test]
    fn broken_record_is_skipped() {
        let mut donor = simulation();
        let mut rng = SmallRng::seed_from_u64(11);
        for blueprint in launch::seed_blueprints(2, 1000, &mut rng) {
            donor.launch(blueprint).unwrap();
        }
        let mut records = donor.registry().records();
        records.first_mut().unwrap().voyage.destinations.clear();

        let sim = populate(simulation(), records, &config(0)).unwrap();
        assert_eq!(sim.registry().len(), 1);
    }

    #[test]
    fn no_seeding_when_disabled() {
        let sim = populate(simulation(), Vec::new(), &config(0)).unwrap();
        assert!(sim.registry().is_empty());
    }

    #[test]
    fn shipped_config_parses() {
        let config = SimulationConfig::parse(include_str!("../../../starfield-config.yaml")).unwrap();
        assert_eq!(config.space.seed_ships, 3);
        assert_eq!(config.api.port, 3000);
        assert!(config.persistence.enabled);
    }

    #[tokio::test]
    async fn disabled_persistence_skips_the_database() {
        let config = PersistenceConfig {
            enabled: false,
            ..PersistenceConfig::default()
        };
        let (persistence, pool) = connect_persistence(&config).await.unwrap();
        assert!(!persistence.is_configured());
        assert!(!persistence.is_available());
        assert!(pool.is_none());
    }
}
