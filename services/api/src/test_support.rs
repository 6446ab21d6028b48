//! Fixtures for database-backed tests

use rand::Rng;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
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

pub async fn seed_user(pool: &PgPool) -> Uuid {
    let phone = format!("+2335{:08}", rand::thread_rng().gen_range(0..100_000_000u64));
    let row = sqlx::query("INSERT INTO users (name, phone) VALUES ($1, $2) RETURNING id")
        .bind(format!("Test User {}", &phone[5..]))
        .bind(&phone)
        .fetch_one(pool)
        .await
        .expect("failed to seed user");
    row.get("id")
}

pub async fn seed_property(pool: &PgPool, approval: &str, status: &str) -> Uuid {
    let row = sqlx::query(
        r#"
        INSERT INTO properties
            (name, property_type, price, address, bedrooms, bathrooms, description,
             approval_status, status)
        VALUES ($1, 'Apartment', 500.0, '1 Test Street', 2, 1, 'seeded listing', $2, $3)
        RETURNING id
        "#,
    )
    .bind(format!("Listing {}", Uuid::new_v4()))
    .bind(approval)
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("failed to seed property");
    row.get("id")
}
