use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod jwt;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod sms;
#[cfg(test)]
mod test_support;
mod validation;

use std::sync::Arc;

use common::cache::{RedisConfig, RedisPool};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use sqlx::PgPool;

use crate::{
    jwt::{JwtConfig, JwtService},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{OtpRepository, UserRepository},
    sms::{ConsoleSmsSender, HttpSmsSender, SmsConfig, SmsSender},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub otp_repository: OtpRepository,
    pub rate_limiter: RateLimiter,
    pub sms: Arc<dyn SmsSender>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config)?;

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let user_repository = UserRepository::new(pool.clone());
    let otp_repository = OtpRepository::new(pool.clone());
    let rate_limiter = RateLimiter::new(RateLimiterConfig::default());

    let sms: Arc<dyn SmsSender> = match SmsConfig::from_env() {
        Some(config) => Arc::new(HttpSmsSender::new(config)),
        None => {
            info!("SMS_API_KEY not set, OTPs will be logged instead of sent");
            Arc::new(ConsoleSmsSender)
        }
    };

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        jwt_service,
        user_repository,
        otp_repository,
        rate_limiter,
        sms,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Authentication service listening on 0.0.0.0:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
