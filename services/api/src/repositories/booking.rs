//! Booking repository

use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::{BOOKING_CONFIRMED, Booking};

const BOOKING_COLUMNS: &str = "id, user_id, property_id, status, created_at";

fn map_booking(row: &PgRow) -> Booking {
    Booking {
        id: row.get("id"),
        user_id: row.get("user_id"),
        property_id: row.get("property_id"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}

#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a confirmed booking. A repeat booking of the same property
    /// by the same user returns the existing row instead of a second one.
    pub async fn create(&self, user_id: Uuid, property_id: Uuid) -> Result<Booking, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bookings (user_id, property_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, property_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(property_id)
        .bind(BOOKING_CONFIRMED)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 AND property_id = $2"
        ))
        .bind(user_id)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_booking(&row))
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_booking).collect())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_booking).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_property, seed_user, test_pool};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn rebooking_returns_the_existing_row() {
        let Some(pool) = test_pool().await else { return };
        let repo = BookingRepository::new(pool.clone());

        let user_id = seed_user(&pool).await;
        let property_id = seed_property(&pool, "approved", "available").await;

        let first = repo.create(user_id, property_id).await.expect("create failed");
        let second = repo.create(user_id, property_id).await.expect("repeat failed");
        assert_eq!(first.id, second.id);

        let all = repo.list_for_user(user_id).await.expect("list failed");
        assert_eq!(all.len(), 1);
    }
}
