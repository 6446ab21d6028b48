//! Common library for the Liaison marketplace
//!
//! This crate provides shared functionality used across the Liaison
//! services, including database connectivity, Redis caching, embedded
//! migrations and error handling.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
