//! OTP repository for database operations

use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{OtpCode, OtpStatus};

fn map_otp(row: &PgRow) -> OtpCode {
    let status: String = row.get("status");
    OtpCode {
        id: row.get("id"),
        user_id: row.get("user_id"),
        code: row.get("code"),
        status: OtpStatus::from(status.as_str()),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

/// OTP repository
#[derive(Clone)]
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    /// Create a new OTP repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a fresh 6-digit code for a user, replacing any pending one
    pub async fn issue(&self, user_id: Uuid) -> Result<OtpCode> {
        let code = generate_code();
        let expires_at = OtpCode::deadline_from(Utc::now());

        sqlx::query("DELETE FROM otp_codes WHERE user_id = $1 AND status = 'pending'")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            r#"
            INSERT INTO otp_codes (user_id, code, status, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, code, status, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(&code)
        .bind(OtpStatus::Pending.as_str())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        info!("Issued OTP for user {}", user_id);
        Ok(map_otp(&row))
    }

    /// Find the pending code matching what the user typed, regardless of
    /// expiry. The caller distinguishes expired from invalid.
    pub async fn find_pending(&self, user_id: Uuid, code: &str) -> Result<Option<OtpCode>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, code, status, expires_at, created_at
            FROM otp_codes
            WHERE user_id = $1 AND code = $2 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_otp))
    }

    /// Mark a code as confirmed
    pub async fn confirm(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE otp_codes SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(OtpStatus::Confirmed.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, test_pool};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn issued_code_confirms_and_leaves_no_pending() {
        let Some(pool) = test_pool().await else { return };
        let repo = OtpRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let otp = repo.issue(user_id).await.expect("issue failed");

        let wrong = if otp.code == "123456" { "654321" } else { "123456" };
        assert!(
            repo.find_pending(user_id, wrong)
                .await
                .expect("lookup failed")
                .is_none()
        );

        let found = repo
            .find_pending(user_id, &otp.code)
            .await
            .expect("lookup failed")
            .expect("code missing");
        assert_eq!(found.id, otp.id);
        assert_eq!(found.status, OtpStatus::Pending);

        repo.confirm(found.id).await.expect("confirm failed");
        assert!(
            repo.find_pending(user_id, &otp.code)
                .await
                .expect("lookup failed")
                .is_none()
        );
    }

    #[tokio::test]
    #[serial]
    async fn reissue_replaces_the_pending_code() {
        let Some(pool) = test_pool().await else { return };
        let repo = OtpRepository::new(pool.clone());
        let user_id = seed_user(&pool).await;

        let first = repo.issue(user_id).await.expect("issue failed");
        let second = repo.issue(user_id).await.expect("reissue failed");

        // Only the latest code is live; a lookup by the first code can
        // only hit the second row when the digits happen to collide
        if let Some(found) = repo
            .find_pending(user_id, &first.code)
            .await
            .expect("lookup failed")
        {
            assert_eq!(found.id, second.id);
        }

        let found = repo
            .find_pending(user_id, &second.code)
            .await
            .expect("lookup failed")
            .expect("code missing");
        assert_eq!(found.id, second.id);
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
