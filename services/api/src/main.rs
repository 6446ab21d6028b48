use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod gateway;
mod middleware;
mod models;
mod realtime;
mod repositories;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};

use crate::{
    gateway::{PaymentGateway, PaystackClient, PaystackConfig},
    middleware::JwtVerifier,
    realtime::ChannelRegistry,
    repositories::{BookingRepository, ChatRepository, PaymentRepository, PropertyRepository},
    state::AppState,
    storage::{ImageStore, S3Config, S3ImageStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting marketplace service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let jwt = JwtVerifier::from_env()?;

    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(PaystackClient::new(PaystackConfig::from_env()?));

    let images: Arc<dyn ImageStore> = Arc::new(S3ImageStore::from_env(S3Config::from_env()?).await);

    let app_state = AppState {
        jwt,
        properties: PropertyRepository::new(pool.clone()),
        bookings: BookingRepository::new(pool.clone()),
        payments: PaymentRepository::new(pool.clone()),
        chats: ChatRepository::new(pool),
        registry: ChannelRegistry::new(),
        gateway,
        images,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    info!("Marketplace service listening on 0.0.0.0:3001");

    axum::serve(listener, app).await?;

    Ok(())
}
