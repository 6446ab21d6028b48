//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{Identity, NewUser, Role, User, UserStatus};

fn map_user(row: &PgRow) -> User {
    let role: String = row.get("role");
    let status: String = row.get("status");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        role: Role::from(role.as_str()),
        status: UserStatus::from(status.as_str()),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, status, avatar, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user; hashes the password when one is supplied
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.name);

        let password_hash = match &new_user.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let (email, phone) = match &new_user.identity {
            Identity::Email(e) => (Some(e.as_str()), None),
            Identity::Phone(p) => (None, Some(p.as_str())),
        };

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (name, email, phone, password_hash, role, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&new_user.name)
        .bind(email)
        .bind(phone)
        .bind(&password_hash)
        .bind(Role::User.as_str())
        .bind(new_user.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(map_user(&row))
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// Find a user by phone number
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// Flip a pending account to active once its OTP is confirmed
    pub async fn activate(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET status = 'active', updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Verify a user's password
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let Some(stored) = &user.password_hash else {
            return Ok(false);
        };

        let parsed_hash = PasswordHash::new(stored)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{random_phone, test_pool};
    use argon2::PasswordVerifier;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn phone_registration_round_trips_and_activates() {
        let Some(pool) = test_pool().await else { return };
        let repo = UserRepository::new(pool);

        let phone = random_phone();
        let created = repo
            .create(&NewUser {
                name: "Ama Mensah".to_string(),
                identity: Identity::Phone(phone.clone()),
                password: None,
                status: UserStatus::Pending,
            })
            .await
            .expect("create failed");
        assert_eq!(created.role, Role::User);
        assert_eq!(created.status, UserStatus::Pending);

        let found = repo
            .find_by_phone(&phone)
            .await
            .expect("lookup failed")
            .expect("user missing");
        assert_eq!(found.id, created.id);

        repo.activate(created.id).await.expect("activate failed");
        let active = repo
            .find_by_id(created.id)
            .await
            .expect("lookup failed")
            .expect("user missing");
        assert_eq!(active.status, UserStatus::Active);
    }

    #[tokio::test]
    #[serial]
    async fn stored_password_verifies_against_the_hash() {
        let Some(pool) = test_pool().await else { return };
        let repo = UserRepository::new(pool);

        let email = format!("{}@liaison.test", Uuid::new_v4());
        repo.create(&NewUser {
            name: "Kofi Owusu".to_string(),
            identity: Identity::Email(email.clone()),
            password: Some("Secret-123".to_string()),
            status: UserStatus::Active,
        })
        .await
        .expect("create failed");

        let found = repo
            .find_by_email(&email)
            .await
            .expect("lookup failed")
            .expect("user missing");
        assert!(repo.verify_password(&found, "Secret-123").expect("verify failed"));
        assert!(!repo.verify_password(&found, "wrong").expect("verify failed"));
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("Secret-123").expect("hashing failed");
        let parsed = PasswordHash::new(&hash).expect("parse failed");
        assert!(
            Argon2::default()
                .verify_password(b"Secret-123", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong", &parsed)
                .is_err()
        );
    }
}
