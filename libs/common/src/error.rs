//! Error types for the shared infrastructure
//!
//! The services wrap these in their own boundary errors; nothing here
//! reaches an HTTP response directly.

use thiserror::Error;

/// Errors from the PostgreSQL layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Could not reach or authenticate against the database
    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A query failed after the connection was established
    #[error("Database query error: {0}")]
    Query(#[source] sqlx::Error),

    /// Embedded schema migrations failed to apply
    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The connection URL or pool settings are unusable
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Errors from the Redis layer
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[source] redis::RedisError),

    #[error("Redis command error: {0}")]
    Command(#[source] redis::RedisError),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type CacheResult<T> = Result<T, CacheError>;
