//! Payment repository
//!
//! Confirmation is driven by both the verify endpoint and the gateway
//! webhook, which may race or repeat. `apply_success` is the single
//! confirmation path and is idempotent: the payment row's pending →
//! success transition is the gate for every side effect.

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{BOOKING_CONFIRMED, Payment, PaymentStatus, PaymentSummary};

const PAYMENT_COLUMNS: &str = "id, user_id, property_id, amount, status, external_ref, created_at";

fn map_payment(row: &PgRow) -> Payment {
    let status: String = row.get("status");
    Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        property_id: row.get("property_id"),
        amount: row.get("amount"),
        status: PaymentStatus::from(status.as_str()),
        external_ref: row.get("external_ref"),
        created_at: row.get("created_at"),
    }
}

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending payment ahead of the gateway call
    pub async fn create_pending(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        amount: f64,
    ) -> Result<Payment, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (user_id, property_id, amount, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(property_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_payment(&row))
    }

    /// Record a user-initiated cancellation. Never touches the gateway,
    /// the property or bookings.
    pub async fn create_cancelled(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        amount: f64,
    ) -> Result<Payment, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (user_id, property_id, amount, status)
            VALUES ($1, $2, $3, 'cancelled')
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(property_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_payment(&row))
    }

    /// Attach the gateway reference returned by initialize
    pub async fn set_reference(&self, id: Uuid, reference: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET external_ref = $2 WHERE id = $1")
            .bind(id)
            .bind(reference)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_payment))
    }

    pub async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_ref = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_payment))
    }

    /// Confirm a payment and apply its side effects exactly once.
    ///
    /// One transaction: flip the payment pending → success; if and only
    /// if that changed a row, mark the property booked (when still
    /// available) and upsert the confirmed booking. Repeat calls are
    /// no-ops that report the stored state.
    pub async fn apply_success(&self, payment: &Payment) -> Result<PaymentStatus, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE payments SET status = $2 WHERE id = $1 AND status = 'pending'",
        )
        .bind(payment.id)
        .bind(PaymentStatus::Success.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.find_by_id(payment.id).await?;
            return Ok(current.map(|p| p.status).unwrap_or(payment.status));
        }

        sqlx::query(
            "UPDATE properties SET status = 'booked', updated_at = now() \
             WHERE id = $1 AND status = 'available'",
        )
        .bind(payment.property_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (user_id, property_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, property_id) DO NOTHING
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.property_id)
        .bind(BOOKING_CONFIRMED)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Payment {} confirmed", payment.id);

        Ok(PaymentStatus::Success)
    }

    /// Mark a payment failed; only a pending payment can fail
    pub async fn mark_failed(&self, id: Uuid) -> Result<PaymentStatus, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE payments SET status = $2 WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(PaymentStatus::Failed.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(PaymentStatus::Failed);
        }

        let current = self.find_by_id(id).await?;
        Ok(current.map(|p| p.status).unwrap_or(PaymentStatus::Failed))
    }

    pub async fn list_all(&self) -> Result<Vec<PaymentSummary>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PaymentSummary::from(&map_payment(row)))
            .collect())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<PaymentSummary>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PaymentSummary::from(&map_payment(row)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_property, seed_user, test_pool};
    use serial_test::serial;
    use sqlx::Row;

    #[tokio::test]
    #[serial]
    async fn double_confirmation_applies_side_effects_once() {
        let Some(pool) = test_pool().await else { return };
        let repo = PaymentRepository::new(pool.clone());

        let user_id = seed_user(&pool).await;
        let property_id = seed_property(&pool, "approved", "available").await;

        let payment = repo
            .create_pending(user_id, property_id, 500.0)
            .await
            .expect("create failed");

        let first = repo.apply_success(&payment).await.expect("confirm failed");
        let second = repo.apply_success(&payment).await.expect("repeat failed");
        assert_eq!(first, PaymentStatus::Success);
        assert_eq!(second, PaymentStatus::Success);

        let status: String = sqlx::query("SELECT status FROM properties WHERE id = $1")
            .bind(property_id)
            .fetch_one(&pool)
            .await
            .expect("property lookup failed")
            .get("status");
        assert_eq!(status, "booked");

        let bookings: i64 = sqlx::query(
            "SELECT count(*) AS n FROM bookings WHERE user_id = $1 AND property_id = $2",
        )
        .bind(user_id)
        .bind(property_id)
        .fetch_one(&pool)
        .await
        .expect("booking count failed")
        .get("n");
        assert_eq!(bookings, 1);
    }

    #[tokio::test]
    #[serial]
    async fn failed_payment_stays_failed() {
        let Some(pool) = test_pool().await else { return };
        let repo = PaymentRepository::new(pool.clone());

        let user_id = seed_user(&pool).await;
        let property_id = seed_property(&pool, "approved", "available").await;

        let payment = repo
            .create_pending(user_id, property_id, 500.0)
            .await
            .expect("create failed");

        assert_eq!(
            repo.mark_failed(payment.id).await.expect("fail failed"),
            PaymentStatus::Failed
        );

        // A late success signal must not resurrect the payment
        let status = repo.apply_success(&payment).await.expect("confirm failed");
        assert_eq!(status, PaymentStatus::Failed);

        let property_status: String = sqlx::query("SELECT status FROM properties WHERE id = $1")
            .bind(property_id)
            .fetch_one(&pool)
            .await
            .expect("property lookup failed")
            .get("status");
        assert_eq!(property_status, "available");
    }

    #[tokio::test]
    #[serial]
    async fn cancellation_has_no_side_effects() {
        let Some(pool) = test_pool().await else { return };
        let repo = PaymentRepository::new(pool.clone());

        let user_id = seed_user(&pool).await;
        let property_id = seed_property(&pool, "approved", "available").await;

        let payment = repo
            .create_cancelled(user_id, property_id, 500.0)
            .await
            .expect("cancel failed");
        assert_eq!(payment.status, PaymentStatus::Cancelled);

        let bookings: i64 = sqlx::query("SELECT count(*) AS n FROM bookings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .expect("booking count failed")
            .get("n");
        assert_eq!(bookings, 0);
    }
}
