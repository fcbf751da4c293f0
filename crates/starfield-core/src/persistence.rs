//! Best-effort persistence behind an availability gate.
//!
//! The simulation never waits on storage. [`ShipStore`] is the contract a
//! backend implements; [`Persistence`] wraps an optional store together with
//! a shared availability flag and decides whether a call is attempted at
//! all. Writes are spawned as detached tokio tasks. A failure to reach or
//! use the store is logged and flips the gate offline, after which calls are
//! skipped silently until a successful re-probe (only under
//! [`OfflinePolicy::Reprobe`]). Bad stored data is logged but leaves the gate
//! open, since the store itself answered.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use starfield_types::{ShipId, SpacePoint};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::OfflinePolicy;
use crate::ship::ShipRecord;

/// Errors reported by a [`ShipStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend was reached but the operation failed.
    #[error("store operation failed: {0}")]
    Backend(String),

    /// Stored data could not be turned back into domain types.
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
}

/// Future returned by every [`ShipStore`] operation.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, PersistenceError>>;

/// Storage backend for ships and space points.
pub trait ShipStore: Send + Sync {
    /// Check that the backend is reachable.
    fn probe(&self) -> StoreFuture<'_, ()>;

    /// Load every persisted ship.
    fn load_ships(&self) -> StoreFuture<'_, Vec<ShipRecord>>;

    /// Insert or replace one ship.
    fn upsert_ship(&self, record: ShipRecord) -> StoreFuture<'_, ()>;

    /// Delete one ship. Deleting an absent ship is not an error.
    fn delete_ship(&self, id: ShipId) -> StoreFuture<'_, ()>;

    /// Insert or replace a batch of ships atomically.
    fn upsert_ships(&self, records: Vec<ShipRecord>) -> StoreFuture<'_, ()>;

    /// Make the stored population exactly `records`, atomically.
    ///
    /// Ships missing from `records` are deleted. An empty batch clears
    /// every stored ship.
    fn replace_ships(&self, records: Vec<ShipRecord>) -> StoreFuture<'_, ()>;

    /// Load the persisted space point field.
    fn load_space_points(&self) -> StoreFuture<'_, Vec<SpacePoint>>;

    /// Insert or replace space points.
    fn save_space_points(&self, points: Vec<SpacePoint>) -> StoreFuture<'_, ()>;
}

/// The persistence gate shared by the engine, runner, and HTTP handlers.
///
/// Cloning is cheap; clones share the same store and availability flag.
#[derive(Clone)]
pub struct Persistence {
    inner: Arc<Inner>,
}

struct Inner {
    store: Option<Arc<dyn ShipStore>>,
    available: AtomicBool,
    /// Set once the stored population has been read. Until then the store
    /// may hold ships this process never saw, and snapshots only upsert.
    population_loaded: AtomicBool,
    policy: OfflinePolicy,
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence")
            .field("configured", &self.inner.store.is_some())
            .field("available", &self.is_available())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl Persistence {
    /// Wrap a store. The gate starts offline until a probe succeeds.
    pub fn new(store: Arc<dyn ShipStore>, policy: OfflinePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Some(store),
                available: AtomicBool::new(false),
                population_loaded: AtomicBool::new(false),
                policy,
            }),
        }
    }

    /// A gate with no store. Every call is skipped.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(Inner {
                store: None,
                available: AtomicBool::new(false),
                population_loaded: AtomicBool::new(false),
                policy: OfflinePolicy::Latched,
            }),
        }
    }

    /// Whether a store is configured at all.
    pub fn is_configured(&self) -> bool {
        self.inner.store.is_some()
    }

    /// Whether calls are currently attempted.
    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::Acquire)
    }

    /// What happens after the gate goes offline.
    pub fn policy(&self) -> OfflinePolicy {
        self.inner.policy
    }

    /// Probe the store up to `attempts` times, `delay` apart.
    ///
    /// Opens the gate on the first success. Returns whether the store is
    /// available afterwards.
    pub async fn connect_probe(&self, attempts: u32, delay: Duration) -> bool {
        let Some(store) = self.inner.store.as_ref() else {
            info!("Persistence disabled, running in memory only");
            return false;
        };

        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match store.probe().await {
                Ok(()) => {
                    info!(attempt, "Persistence store reachable");
                    self.inner.available.store(true, Ordering::Release);
                    return true;
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "Persistence probe failed");
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(attempts, "Persistence unavailable, continuing without it");
        self.inner.available.store(false, Ordering::Release);
        false
    }

    /// Probe once more after going offline. Only does anything under
    /// [`OfflinePolicy::Reprobe`].
    pub async fn reprobe(&self) -> bool {
        if self.is_available() {
            return true;
        }
        if self.inner.policy != OfflinePolicy::Reprobe {
            return false;
        }
        let Some(store) = self.inner.store.as_ref() else {
            return false;
        };
        match store.probe().await {
            Ok(()) => {
                info!("Persistence store reachable again");
                self.inner.available.store(true, Ordering::Release);
                true
            }
            Err(err) => {
                debug!(error = %err, "Persistence re-probe failed");
                false
            }
        }
    }

    /// Load every persisted ship, or nothing when offline.
    pub async fn load_population(&self) -> Vec<ShipRecord> {
        let Some(store) = self.target() else {
            return Vec::new();
        };
        match store.load_ships().await {
            Ok(records) => {
                info!(count = records.len(), "Loaded persisted ships");
                self.inner.population_loaded.store(true, Ordering::Release);
                records
            }
            Err(err) => {
                self.record_failure("load_ships", &err);
                Vec::new()
            }
        }
    }

    /// Load the persisted field. `None` when offline, failed, or empty.
    pub async fn load_space_points(&self) -> Option<Vec<SpacePoint>> {
        let store = self.target()?;
        match store.load_space_points().await {
            Ok(points) if points.is_empty() => None,
            Ok(points) => {
                info!(count = points.len(), "Loaded persisted space points");
                Some(points)
            }
            Err(err) => {
                self.record_failure("load_space_points", &err);
                None
            }
        }
    }

    /// Insert or replace ships and wait for completion. Other stored ships
    /// are left alone.
    pub async fn save_ships(&self, records: Vec<ShipRecord>) {
        let Some(store) = self.target() else {
            return;
        };
        if let Err(err) = store.upsert_ships(records).await {
            self.record_failure("upsert_ships", &err);
        }
    }

    /// Write the field and wait for completion.
    pub async fn save_space_points(&self, points: Vec<SpacePoint>) {
        let Some(store) = self.target() else {
            return;
        };
        if let Err(err) = store.save_space_points(points).await {
            self.record_failure("save_space_points", &err);
        }
    }

    /// Delete one ship and wait for completion.
    pub async fn delete_ship(&self, id: ShipId) {
        let Some(store) = self.target() else {
            return;
        };
        if let Err(err) = store.delete_ship(id).await {
            self.record_failure("delete_ship", &err);
        }
    }

    /// Write a full snapshot and wait for completion.
    ///
    /// Once [`Self::load_population`] has succeeded, the stored population
    /// becomes exactly `records`, so ships deleted while the gate was offline
    /// are removed here. Before that, `records` are only upserted.
    pub async fn flush(&self, records: Vec<ShipRecord>, points: Vec<SpacePoint>) {
        let Some(store) = self.target() else {
            return;
        };
        let ships = records.len();
        let written = if self.inner.population_loaded.load(Ordering::Acquire) {
            store.replace_ships(records).await.map_err(|err| ("replace_ships", err))
        } else {
            store.upsert_ships(records).await.map_err(|err| ("upsert_ships", err))
        };
        if let Err((operation, err)) = written {
            self.record_failure(operation, &err);
            return;
        }
        if let Err(err) = store.save_space_points(points).await {
            self.record_failure("save_space_points", &err);
            return;
        }
        info!(ships, "Persistence flushed");
    }

    /// Persist one ship in the background.
    pub fn spawn_upsert(&self, record: ShipRecord) -> Option<JoinHandle<()>> {
        let store = self.target()?;
        let gate = self.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = store.upsert_ship(record).await {
                gate.record_failure("upsert_ship", &err);
            }
        }))
    }

    /// Delete one ship in the background.
    pub fn spawn_delete(&self, id: ShipId) -> Option<JoinHandle<()>> {
        self.target()?;
        let gate = self.clone();
        Some(tokio::spawn(async move {
            gate.delete_ship(id).await;
        }))
    }

    /// The store, if calls should be attempted right now.
    fn target(&self) -> Option<Arc<dyn ShipStore>> {
        if !self.is_available() {
            return None;
        }
        self.inner.store.clone()
    }

    /// Log a failed call. Anything but bad data takes the gate offline.
    fn record_failure(&self, operation: &'static str, err: &PersistenceError) {
        if matches!(err, PersistenceError::Corrupt(_)) {
            warn!(operation, error = %err, "Persistence rejected stored data, staying online");
            return;
        }
        let was_available = self.inner.available.swap(false, Ordering::AcqRel);
        if was_available {
            warn!(operation, error = %err, "Persistence failed, going offline");
        } else {
            debug!(operation, error = %err, "Persistence failed while offline");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use starfield_types::{Coordinates, MissionId};

    use super::*;
    use crate::config::FlightConfig;
    use crate::mission::MissionBrief;
    use crate::ship::{Ship, ShipBlueprint};
    use crate::space::SpacePointField;

    /// In-memory store that can be told to fail.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub ships: Mutex<BTreeMap<ShipId, ShipRecord>>,
        pub points: Mutex<Vec<SpacePoint>>,
        pub failing: AtomicBool,
        pub corrupt: AtomicBool,
        pub slow_writes: AtomicBool,
        pub probe_failures_left: AtomicU32,
        pub probes: AtomicU32,
    }

    impl MemoryStore {
        fn check(&self) -> Result<(), PersistenceError> {
            if self.failing.load(Ordering::Acquire) {
                Err(PersistenceError::Unavailable(String::from("down")))
            } else {
                Ok(())
            }
        }
    }

    impl ShipStore for MemoryStore {
        fn probe(&self) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                self.probes.fetch_add(1, Ordering::AcqRel);
                let left = self.probe_failures_left.load(Ordering::Acquire);
                if left > 0 {
                    self.probe_failures_left.store(left - 1, Ordering::Release);
                    return Err(PersistenceError::Unavailable(String::from("refused")));
                }
                self.check()
            })
        }

        fn load_ships(&self) -> StoreFuture<'_, Vec<ShipRecord>> {
            Box::pin(async move {
                self.check()?;
                if self.corrupt.load(Ordering::Acquire) {
                    return Err(PersistenceError::Corrupt(String::from("garbled row")));
                }
                Ok(self.ships.lock().unwrap().values().cloned().collect())
            })
        }

        fn upsert_ship(&self, record: ShipRecord) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                self.check()?;
                self.ships
                    .lock()
                    .unwrap()
                    .insert(record.blueprint.id, record);
                Ok(())
            })
        }

        fn delete_ship(&self, id: ShipId) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                self.check()?;
                self.ships.lock().unwrap().remove(&id);
                Ok(())
            })
        }

        fn upsert_ships(&self, records: Vec<ShipRecord>) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                self.check()?;
                let mut ships = self.ships.lock().unwrap();
                for record in records {
                    ships.insert(record.blueprint.id, record);
                }
                Ok(())
            })
        }

        fn replace_ships(&self, records: Vec<ShipRecord>) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                if self.slow_writes.load(Ordering::Acquire) {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                }
                self.check()?;
                *self.ships.lock().unwrap() = records
                    .into_iter()
                    .map(|record| (record.blueprint.id, record))
                    .collect();
                Ok(())
            })
        }

        fn load_space_points(&self) -> StoreFuture<'_, Vec<SpacePoint>> {
            Box::pin(async move {
                self.check()?;
                Ok(self.points.lock().unwrap().clone())
            })
        }

        fn save_space_points(&self, points: Vec<SpacePoint>) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                self.check()?;
                *self.points.lock().unwrap() = points;
                Ok(())
            })
        }
    }

    pub(crate) fn record(name: &str) -> ShipRecord {
        let blueprint = ShipBlueprint {
            id: ShipId::new(),
            name: name.to_owned(),
            description: String::new(),
            condition: 100,
            mission: MissionBrief {
                id: MissionId::new(),
                title: String::from("Survey"),
                objective: String::from("Exploration"),
                description: String::new(),
                center: Coordinates::new(50.0, 50.0, 50.0),
                radius: 80.0,
            },
        };
        Ship::new(
            blueprint,
            None,
            &SpacePointField::new(),
            &FlightConfig::default(),
            &mut SmallRng::seed_from_u64(1),
        )
        .unwrap()
        .to_record()
    }

    async fn online(store: &Arc<MemoryStore>, policy: OfflinePolicy) -> Persistence {
        let gate = Persistence::new(Arc::clone(store) as Arc<dyn ShipStore>, policy);
        assert!(gate.connect_probe(1, Duration::ZERO).await);
        gate
    }

    #[tokio::test]
    async fn probe_retries_until_store_answers() {
        let store = Arc::new(MemoryStore::default());
        store.probe_failures_left.store(2, Ordering::Release);
        let gate = Persistence::new(Arc::clone(&store) as Arc<dyn ShipStore>, OfflinePolicy::Latched);

        assert!(gate.connect_probe(5, Duration::ZERO).await);
        assert!(gate.is_available());
        assert_eq!(store.probes.load(Ordering::Acquire), 3);
    }

    #[tokio::test]
    async fn probe_exhaustion_leaves_gate_offline() {
        let store = Arc::new(MemoryStore::default());
        store.failing.store(true, Ordering::Release);
        let gate = Persistence::new(Arc::clone(&store) as Arc<dyn ShipStore>, OfflinePolicy::Latched);

        assert!(!gate.connect_probe(3, Duration::ZERO).await);
        assert!(!gate.is_available());
        assert_eq!(store.probes.load(Ordering::Acquire), 3);
        assert!(gate.load_population().await.is_empty());
    }

    #[tokio::test]
    async fn disabled_gate_skips_everything() {
        let gate = Persistence::disabled();
        assert!(!gate.connect_probe(3, Duration::ZERO).await);
        assert!(gate.spawn_upsert(record("Ghost")).is_none());
        assert!(gate.spawn_delete(ShipId::new()).is_none());
        assert!(gate.load_space_points().await.is_none());
    }

    #[tokio::test]
    async fn writes_reach_the_store() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;
        let rec = record("Atlas");
        let id = rec.blueprint.id;

        gate.spawn_upsert(rec).unwrap().await.unwrap();
        assert_eq!(gate.load_population().await.len(), 1);

        gate.spawn_delete(id).unwrap().await.unwrap();
        assert!(gate.load_population().await.is_empty());
    }

    #[tokio::test]
    async fn flush_writes_ships_and_points() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;
        let mut rng = SmallRng::seed_from_u64(8);
        let field = SpacePointField::generate(10, 100, &mut rng);

        gate.flush(vec![record("A"), record("B")], field.points().to_vec())
            .await;

        assert_eq!(store.ships.lock().unwrap().len(), 2);
        assert_eq!(gate.load_space_points().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn flush_drops_ships_missing_from_the_snapshot() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;
        let kept = record("Kept");
        let kept_id = kept.blueprint.id;
        gate.save_ships(vec![kept.clone(), record("Gone")]).await;
        assert_eq!(gate.load_population().await.len(), 2);

        gate.flush(vec![kept], Vec::new()).await;
        let ships = store.ships.lock().unwrap();
        assert_eq!(ships.keys().copied().collect::<Vec<_>>(), vec![kept_id]);
    }

    #[tokio::test]
    async fn flush_before_loading_keeps_unseen_ships() {
        let store = Arc::new(MemoryStore::default());
        store.failing.store(true, Ordering::Release);
        let gate = Persistence::new(Arc::clone(&store) as Arc<dyn ShipStore>, OfflinePolicy::Reprobe);
        assert!(!gate.connect_probe(1, Duration::ZERO).await);
        assert!(gate.load_population().await.is_empty());

        let stored = record("Stored");
        store.ships.lock().unwrap().insert(stored.blueprint.id, stored);
        store.failing.store(false, Ordering::Release);
        assert!(gate.reprobe().await);

        gate.flush(vec![record("Seeded")], Vec::new()).await;
        assert_eq!(store.ships.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn save_ships_keeps_other_rows() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;
        gate.save_ships(vec![record("First")]).await;
        gate.save_ships(vec![record("Second")]).await;
        gate.save_space_points(Vec::new()).await;
        assert_eq!(store.ships.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_data_keeps_gate_online() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;
        store.corrupt.store(true, Ordering::Release);

        assert!(gate.load_population().await.is_empty());
        assert!(gate.is_available());

        gate.spawn_upsert(record("After")).unwrap().await.unwrap();
        assert_eq!(store.ships.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_latches_offline() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;

        store.failing.store(true, Ordering::Release);
        gate.spawn_upsert(record("Doomed")).unwrap().await.unwrap();
        assert!(!gate.is_available());

        // Recovery is ignored under the latched policy.
        store.failing.store(false, Ordering::Release);
        assert!(!gate.reprobe().await);
        assert!(gate.spawn_upsert(record("Skipped")).is_none());
        assert!(store.ships.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reprobe_policy_recovers() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Reprobe).await;

        store.failing.store(true, Ordering::Release);
        gate.spawn_delete(ShipId::new()).unwrap().await.unwrap();
        assert!(!gate.is_available());
        assert!(!gate.reprobe().await);

        store.failing.store(false, Ordering::Release);
        assert!(gate.reprobe().await);
        assert!(gate.is_available());
    }

    #[tokio::test]
    async fn empty_point_table_reads_as_missing() {
        let store = Arc::new(MemoryStore::default());
        let gate = online(&store, OfflinePolicy::Latched).await;
        assert!(gate.load_space_points().await.is_none());
        assert!(gate.is_available());
    }
}
