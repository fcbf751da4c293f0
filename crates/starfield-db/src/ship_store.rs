//! Ship persistence on the `ships` table.
//!
//! Scalar identity fields get their own columns. The mission (brief plus
//! event log), the ship log, and the flight state are stored as JSONB so a
//! ship can be resumed exactly as it was written.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use starfield_core::mission::MissionBrief;
use starfield_core::ship::{ShipBlueprint, ShipRecord, Voyage};
use starfield_types::{Coordinates, LogEntry, ShipId, ShipStatus, SpacePoint};
use uuid::Uuid;

use crate::error::DbError;

const TABLE: &str = "ships";

/// Operations on the `ships` table.
pub struct ShipTable<'a> {
    pool: &'a PgPool,
}

impl<'a> ShipTable<'a> {
    /// Create a ship table handle bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every stored ship, oldest write first.
    ///
    /// A row that cannot be turned back into a [`ShipRecord`] is skipped
    /// with a warning; the rest of the population still loads.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn load_all(&self) -> Result<Vec<ShipRecord>, DbError> {
        let rows = sqlx::query_as::<_, ShipRow>(
            r"SELECT id, name, description, status, condition, mission, logs, voyage, updated_at
              FROM ships
              ORDER BY updated_at, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(decode_rows(rows))
    }

    /// Insert or replace one ship.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert(&self, record: &ShipRecord) -> Result<(), DbError> {
        self.upsert_many(std::slice::from_ref(record)).await
    }

    /// Insert or replace a batch of ships in one transaction.
    ///
    /// Uses a single `INSERT ... SELECT FROM UNNEST` so the whole batch is
    /// one round-trip.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails; nothing from the
    /// batch is committed in that case.
    pub async fn upsert_many(&self, records: &[ShipRecord]) -> Result<(), DbError> {
        if records.is_empty() {
            return Ok(());
        }

        let batch = ShipBatch::from_records(records)?;
        let mut tx = self.pool.begin().await?;
        batch.write(&mut tx).await?;
        tx.commit().await?;

        tracing::debug!(count = records.len(), "Upserted ships");
        Ok(())
    }

    /// Make the table hold exactly `records`.
    ///
    /// Upserts the batch and deletes every other row in the same
    /// transaction, so a ship that left while a delete could not be issued
    /// is still removed. An empty batch clears the table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if either statement fails; the table is
    /// left untouched in that case.
    pub async fn replace_all(&self, records: &[ShipRecord]) -> Result<(), DbError> {
        let batch = ShipBatch::from_records(records)?;
        let mut tx = self.pool.begin().await?;
        if !records.is_empty() {
            batch.write(&mut tx).await?;
        }
        let removed = sqlx::query("DELETE FROM ships WHERE id <> ALL($1::UUID[])")
            .bind(&batch.ids)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        tracing::debug!(count = records.len(), removed, "Replaced ships");
        Ok(())
    }

    /// Delete one ship. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: ShipId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM ships WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Decode rows one by one, dropping the ones that do not decode.
fn decode_rows(rows: Vec<ShipRow>) -> Vec<ShipRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match row.into_record() {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(ship_id = %id, error = %err, "Skipping undecodable ship row");
                    None
                }
            }
        })
        .collect()
}

/// Column arrays for one `UNNEST` upsert.
struct ShipBatch {
    ids: Vec<Uuid>,
    names: Vec<String>,
    descriptions: Vec<String>,
    statuses: Vec<String>,
    conditions: Vec<i64>,
    missions: Vec<serde_json::Value>,
    logs: Vec<serde_json::Value>,
    voyages: Vec<serde_json::Value>,
}

impl ShipBatch {
    fn from_records(records: &[ShipRecord]) -> Result<Self, DbError> {
        let len = records.len();
        let mut batch = Self {
            ids: Vec::with_capacity(len),
            names: Vec::with_capacity(len),
            descriptions: Vec::with_capacity(len),
            statuses: Vec::with_capacity(len),
            conditions: Vec::with_capacity(len),
            missions: Vec::with_capacity(len),
            logs: Vec::with_capacity(len),
            voyages: Vec::with_capacity(len),
        };

        for record in records {
            let columns = ShipColumns::from_record(record)?;
            batch.ids.push(record.blueprint.id.into_inner());
            batch.names.push(record.blueprint.name.clone());
            batch.descriptions.push(record.blueprint.description.clone());
            batch.statuses.push(record.voyage.status.as_str().to_owned());
            batch.conditions.push(i64::from(record.blueprint.condition));
            batch.missions.push(columns.mission);
            batch.logs.push(columns.logs);
            batch.voyages.push(columns.voyage);
        }
        Ok(batch)
    }

    async fn write(&self, conn: &mut PgConnection) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO ships (id, name, description, status, condition, mission, logs, voyage, updated_at)
              SELECT u.id, u.name, u.description, u.status, u.condition, u.mission, u.logs, u.voyage, now()
              FROM UNNEST($1::UUID[], $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::BIGINT[], $6::JSONB[], $7::JSONB[], $8::JSONB[])
                AS u(id, name, description, status, condition, mission, logs, voyage)
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                status = EXCLUDED.status,
                condition = EXCLUDED.condition,
                mission = EXCLUDED.mission,
                logs = EXCLUDED.logs,
                voyage = EXCLUDED.voyage,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&self.ids)
        .bind(&self.names)
        .bind(&self.descriptions)
        .bind(&self.statuses)
        .bind(&self.conditions)
        .bind(&self.missions)
        .bind(&self.logs)
        .bind(&self.voyages)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// A row from the `ships` table.
///
/// Uses runtime types rather than compile-time checked types to avoid
/// requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipRow {
    /// Ship id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Status string, see [`ShipStatus::as_str`].
    pub status: String,
    /// Hull condition.
    pub condition: i64,
    /// Mission brief and event log.
    pub mission: serde_json::Value,
    /// Ship log entries.
    pub logs: serde_json::Value,
    /// Flight state.
    pub voyage: serde_json::Value,
    /// Time of the last write.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ShipRow {
    /// Turn a stored row back into a [`ShipRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] for an unknown status or an
    /// out-of-range condition, and [`DbError::Serialization`] for malformed
    /// JSONB.
    pub fn into_record(self) -> Result<ShipRecord, DbError> {
        let status = ShipStatus::parse(&self.status).ok_or_else(|| DbError::InvalidRow {
            table: TABLE,
            reason: format!("unknown status '{}' for ship {}", self.status, self.id),
        })?;
        let condition = u32::try_from(self.condition).map_err(|err| DbError::InvalidRow {
            table: TABLE,
            reason: format!("condition {} for ship {}: {err}", self.condition, self.id),
        })?;
        let mission: MissionColumn = serde_json::from_value(self.mission)?;
        let logs: Vec<LogEntry> = serde_json::from_value(self.logs)?;
        let flight: VoyageColumn = serde_json::from_value(self.voyage)?;

        Ok(ShipRecord {
            blueprint: ShipBlueprint {
                id: ShipId::from(self.id),
                name: self.name,
                description: self.description,
                condition,
                mission: mission.brief,
            },
            voyage: Voyage {
                status,
                position: flight.position,
                destinations: flight.destinations,
                distance_to_destination: flight.distance_to_destination,
                prospective_points: flight.prospective_points,
                scan_counter: flight.scan_counter,
                logs,
                events: mission.events,
            },
        })
    }
}

/// JSON shape of the `mission` column.
#[derive(Debug, Serialize, Deserialize)]
struct MissionColumn {
    #[serde(flatten)]
    brief: MissionBrief,
    #[serde(default)]
    events: Vec<LogEntry>,
}

/// JSON shape of the `voyage` column.
#[derive(Debug, Serialize, Deserialize)]
struct VoyageColumn {
    position: Coordinates,
    destinations: VecDeque<Coordinates>,
    distance_to_destination: f64,
    #[serde(default)]
    prospective_points: Vec<SpacePoint>,
    #[serde(default)]
    scan_counter: u32,
}

/// The JSONB columns of one ship, encoded.
struct ShipColumns {
    mission: serde_json::Value,
    logs: serde_json::Value,
    voyage: serde_json::Value,
}

impl ShipColumns {
    fn from_record(record: &ShipRecord) -> Result<Self, DbError> {
        let mission = serde_json::to_value(MissionColumn {
            brief: record.blueprint.mission.clone(),
            events: record.voyage.events.clone(),
        })?;
        let logs = serde_json::to_value(&record.voyage.logs)?;
        let voyage = serde_json::to_value(VoyageColumn {
            position: record.voyage.position,
            destinations: record.voyage.destinations.clone(),
            distance_to_destination: record.voyage.distance_to_destination,
            prospective_points: record.voyage.prospective_points.clone(),
            scan_counter: record.voyage.scan_counter,
        })?;
        Ok(Self {
            mission,
            logs,
            voyage,
        })
    }
}
