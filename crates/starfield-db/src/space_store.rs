//! Space point persistence on the `space_points` table.

use sqlx::PgPool;
use starfield_types::SpacePoint;

use crate::error::DbError;

const TABLE: &str = "space_points";

/// Operations on the `space_points` table.
pub struct SpacePointTable<'a> {
    pool: &'a PgPool,
}

impl<'a> SpacePointTable<'a> {
    /// Create a space point table handle bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the whole field ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::InvalidRow`] if a stored value does not fit.
    pub async fn load_all(&self) -> Result<Vec<SpacePoint>, DbError> {
        let rows = sqlx::query_as::<_, SpacePointRow>(
            r"SELECT id, name, x, y, z, visit_count
              FROM space_points
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SpacePointRow::into_point).collect()
    }

    /// Insert or replace points in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn save_all(&self, points: &[SpacePoint]) -> Result<(), DbError> {
        if points.is_empty() {
            return Ok(());
        }

        let len = points.len();
        let mut ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut xs = Vec::with_capacity(len);
        let mut ys = Vec::with_capacity(len);
        let mut zs = Vec::with_capacity(len);
        let mut visits = Vec::with_capacity(len);

        for point in points {
            ids.push(i64::from(point.id));
            names.push(point.name.clone());
            xs.push(point.x);
            ys.push(point.y);
            zs.push(point.z);
            visits.push(i64::from(point.visit_count));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"INSERT INTO space_points (id, name, x, y, z, visit_count)
              SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::INTEGER[], $4::INTEGER[], $5::INTEGER[], $6::BIGINT[])
              ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                x = EXCLUDED.x,
                y = EXCLUDED.y,
                z = EXCLUDED.z,
                visit_count = EXCLUDED.visit_count",
        )
        .bind(&ids)
        .bind(&names)
        .bind(&xs)
        .bind(&ys)
        .bind(&zs)
        .bind(&visits)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(count = len, "Saved space points");
        Ok(())
    }
}

/// A row from the `space_points` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpacePointRow {
    /// Field-local point id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
    /// Times discovered.
    pub visit_count: i64,
}

impl SpacePointRow {
    /// Turn a stored row back into a [`SpacePoint`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the id or visit count does not fit
    /// in a `u32`.
    pub fn into_point(self) -> Result<SpacePoint, DbError> {
        let id = u32::try_from(self.id).map_err(|err| DbError::InvalidRow {
            table: TABLE,
            reason: format!("id {}: {err}", self.id),
        })?;
        let visit_count = u32::try_from(self.visit_count).map_err(|err| DbError::InvalidRow {
            table: TABLE,
            reason: format!("visit_count {} for point {}: {err}", self.visit_count, self.id),
        })?;
        Ok(SpacePoint {
            id,
            name: self.name,
            x: self.x,
            y: self.y,
            z: self.z,
            visit_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(id: i64, visit_count: i64) -> SpacePointRow {
        SpacePointRow {
            id,
            name: String::from("Abc-1"),
            x: -4,
            y: 5,
            z: 600,
            visit_count,
        }
    }

    #[test]
    fn row_becomes_point() {
        let point = row(7, 2).into_point().unwrap();
        assert_eq!(point.id, 7);
        assert_eq!(point.visit_count, 2);
        assert_eq!((point.x, point.y, point.z), (-4, 5, 600));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(row(-1, 0).into_point(), Err(DbError::InvalidRow { .. })));
        assert!(matches!(
            row(1, i64::from(u32::MAX) + 1).into_point(),
            Err(DbError::InvalidRow { .. })
        ));
    }
}
