//! [`ShipStore`] implementation over `PostgreSQL`.

use futures::FutureExt as _;
use starfield_core::persistence::{PersistenceError, ShipStore, StoreFuture};
use starfield_core::ship::ShipRecord;
use starfield_types::{ShipId, SpacePoint};

use crate::postgres::PostgresPool;
use crate::ship_store::ShipTable;
use crate::space_store::SpacePointTable;

/// The `PostgreSQL` backend handed to the persistence gate.
#[derive(Debug, Clone)]
pub struct PgShipStore {
    pool: PostgresPool,
}

impl PgShipStore {
    /// Wrap a pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// The wrapped pool.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    fn ships(&self) -> ShipTable<'_> {
        ShipTable::new(self.pool.pool())
    }

    fn space_points(&self) -> SpacePointTable<'_> {
        SpacePointTable::new(self.pool.pool())
    }
}

impl ShipStore for PgShipStore {
    fn probe(&self) -> StoreFuture<'_, ()> {
        async move { self.pool.ping().await.map_err(PersistenceError::from) }.boxed()
    }

    fn load_ships(&self) -> StoreFuture<'_, Vec<ShipRecord>> {
        async move { self.ships().load_all().await.map_err(PersistenceError::from) }.boxed()
    }

    fn upsert_ship(&self, record: ShipRecord) -> StoreFuture<'_, ()> {
        async move {
            self.ships()
                .upsert(&record)
                .await
                .map_err(PersistenceError::from)
        }
        .boxed()
    }

    fn delete_ship(&self, id: ShipId) -> StoreFuture<'_, ()> {
        async move {
            let removed = self.ships().delete(id).await?;
            if !removed {
                tracing::debug!(ship_id = %id, "Delete of unknown ship ignored");
            }
            Ok::<(), crate::error::DbError>(())
        }
        .map(|result| result.map_err(PersistenceError::from))
        .boxed()
    }

    fn upsert_ships(&self, records: Vec<ShipRecord>) -> StoreFuture<'_, ()> {
        async move {
            self.ships()
                .upsert_many(&records)
                .await
                .map_err(PersistenceError::from)
        }
        .boxed()
    }

    fn replace_ships(&self, records: Vec<ShipRecord>) -> StoreFuture<'_, ()> {
        async move {
            self.ships()
                .replace_all(&records)
                .await
                .map_err(PersistenceError::from)
        }
        .boxed()
    }

    fn load_space_points(&self) -> StoreFuture<'_, Vec<SpacePoint>> {
        async move {
            self.space_points()
                .load_all()
                .await
                .map_err(PersistenceError::from)
        }
        .boxed()
    }

    fn save_space_points(&self, points: Vec<SpacePoint>) -> StoreFuture<'_, ()> {
        async move {
            self.space_points()
                .save_all(&points)
                .await
                .map_err(PersistenceError::from)
        }
        .boxed()
    }
}
