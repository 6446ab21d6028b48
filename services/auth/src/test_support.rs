//! Fixtures for database-backed tests

use rand::Rng;
use sqlx::PgPool;
use sqlx::Row;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Connect and migrate, or skip when no database is configured
pub async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to test database");

    common::database::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    Some(pool)
}

pub fn random_phone() -> String {
    format!("+2335{:08}", rand::thread_rng().gen_range(0..100_000_000u64))
}

pub async fn seed_user(pool: &PgPool) -> Uuid {
    let phone = random_phone();
    let row = sqlx::query("INSERT INTO users (name, phone) VALUES ($1, $2) RETURNING id")
        .bind(format!("Test User {}", &phone[5..]))
        .bind(&phone)
        .fetch_one(pool)
        .await
        .expect("failed to seed user");
    row.get("id")
}
