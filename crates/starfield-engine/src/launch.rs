//! Seed ship generation for an empty sky.
//!
//! When the engine starts with no persisted population it launches
//! `space.seed_ships` ships. Each gets a name from the built-in pool and a
//! random mission whose sphere sits inside the field extent.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use starfield_core::mission::MissionBrief;
use starfield_core::ship::ShipBlueprint;
use starfield_types::{Coordinates, MissionId, ShipId};

/// Smallest radius a seeded mission is given.
const MIN_MISSION_RADIUS: f64 = 50.0;

/// Built-in pool of ship names. Picked without replacement; once the pool is
/// used up names repeat with a numeric suffix.
const NAME_POOL: &[&str] = &[
    "Aurora", "Beacon", "Corsair", "Dauntless", "Endeavour", "Falcon",
    "Galileo", "Horizon", "Intrepid", "Javelin", "Kestrel", "Lodestar",
    "Meridian", "Nomad", "Odyssey", "Pioneer", "Quasar", "Resolute",
    "Sojourner", "Tempest", "Ulysses", "Vanguard", "Wayfarer", "Xiphias",
    "Yamato", "Zenith",
];

/// Objective tags a seeded mission can carry.
const OBJECTIVES: &[&str] = &["Exploration", "Survey", "Salvage", "Patrol", "Research"];

/// Build `count` blueprints with unique names and random missions.
///
/// Mission centers are drawn from the inner half of the field cube and the
/// radius is capped at half the extent, so waypoints stay near the points
/// the ships are meant to discover.
pub fn seed_blueprints<R: Rng + ?Sized>(count: u32, extent: i32, rng: &mut R) -> Vec<ShipBlueprint> {
    let mut used = BTreeSet::new();
    (0..count)
        .map(|_| {
            let name = pick_name(rng, &used);
            used.insert(name.clone());
            ShipBlueprint {
                id: ShipId::new(),
                description: format!("{name} was launched to seed an empty sky"),
                name,
                condition: 100,
                mission: random_mission(extent, rng),
            }
        })
        .collect()
}

/// A mission somewhere inside `[-extent / 2, extent / 2)` on every axis.
pub fn random_mission<R: Rng + ?Sized>(extent: i32, rng: &mut R) -> MissionBrief {
    let half = f64::from(extent.max(1)) / 2.0;
    let center = Coordinates::new(
        rng.random_range(-half..half),
        rng.random_range(-half..half),
        rng.random_range(-half..half),
    );
    let radius = rng.random_range(MIN_MISSION_RADIUS..=half.max(MIN_MISSION_RADIUS));

    let objective = OBJECTIVES.choose(rng).copied().unwrap_or("Exploration");

    MissionBrief {
        id: MissionId::new(),
        title: format!("{objective} run"),
        objective: objective.to_owned(),
        description: format!("{objective} within {radius:.0} units of the mission center"),
        center,
        radius,
    }
}

/// Pick a random name not in `used`, falling back to a suffixed pool name.
fn pick_name<R: Rng + ?Sized>(rng: &mut R, used: &BTreeSet<String>) -> String {
    let available: Vec<&str> = NAME_POOL
        .iter()
        .filter(|&&name| !used.contains(name))
        .copied()
        .collect();

    if let Some(name) = available.choose(rng) {
        return (*name).to_owned();
    }

    let base = NAME_POOL.choose(rng).copied().unwrap_or("Drifter");
    let mut generation: usize = 2;
    loop {
        let candidate = format!("{base} {generation}");
        if !used.contains(&candidate) {
            return candidate;
        }
        generation = generation.saturating_add(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use starfield_core::config::FlightConfig;
    use starfield_core::simulation::Simulation;
    use starfield_core::space::SpacePointField;

    use super::*;

    #[test]
    fn seeds_requested_count() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(seed_blueprints(5, 1000, &mut rng).len(), 5);
        assert!(seed_blueprints(0, 1000, &mut rng).is_empty());
    }

    #[test]
    fn names_are_unique_past_the_pool() {
        let mut rng = SmallRng::seed_from_u64(2);
        let count = NAME_POOL.len().saturating_mul(2);
        let blueprints = seed_blueprints(u32::try_from(count).unwrap(), 1000, &mut rng);

        let names: BTreeSet<&str> = blueprints.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names.len(), count, "all names must be unique");

        let ids: BTreeSet<ShipId> = blueprints.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn pool_names_come_first() {
        let mut rng = SmallRng::seed_from_u64(3);
        let blueprints = seed_blueprints(4, 1000, &mut rng);
        for blueprint in &blueprints {
            assert!(NAME_POOL.contains(&blueprint.name.as_str()));
        }
    }

    #[test]
    fn missions_stay_inside_the_extent() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..200 {
            let mission = random_mission(1000, &mut rng);
            for axis in [mission.center.x, mission.center.y, mission.center.z] {
                assert!((-500.0..500.0).contains(&axis), "axis {axis}");
            }
            assert!((MIN_MISSION_RADIUS..=500.0).contains(&mission.radius));
            assert!(OBJECTIVES.contains(&mission.objective.as_str()));
        }
    }

    #[test]
    fn tiny_extent_still_yields_a_mission() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mission = random_mission(0, &mut rng);
        assert!(mission.radius >= MIN_MISSION_RADIUS);
        assert!(mission.center.x.abs() <= 0.5);
    }

    #[test]
    fn seeded_blueprints_launch() {
        let mut rng = SmallRng::seed_from_u64(6);
        let field = SpacePointField::generate(50, 1000, &mut rng);
        let blueprints = seed_blueprints(3, 1000, &mut rng);
        let mut sim = Simulation::with_rng(field, FlightConfig::default(), rng);

        for blueprint in blueprints {
            sim.launch(blueprint).unwrap();
        }
        assert_eq!(sim.registry().len(), 3);
    }
}
