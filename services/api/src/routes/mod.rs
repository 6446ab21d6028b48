//! Marketplace service routes

use axum::{
    Json, Router,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::{middleware::auth_middleware, realtime::ws_handler, state::AppState};

pub mod booking;
pub mod chat;
pub mod payment;
pub mod property;

/// Create the router for the marketplace service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/property/add", post(property::add))
        .route("/property/pending", get(property::pending))
        .route("/property/:id", get(property::detail).put(property::update))
        .route("/property/:id/approve", put(property::approve))
        .route("/property/:id/status", put(property::set_status))
        .route("/booking", post(booking::create))
        .route("/booking/admin", get(booking::admin_list))
        .route("/booking/user/:id", get(booking::user_list))
        .route("/payment/initialize", post(payment::initialize))
        .route("/payment/verify/:reference", get(payment::verify))
        .route("/payment/cancel", post(payment::cancel))
        .route("/payment/admin", get(payment::admin_list))
        .route("/payment/user/:id", get(payment::user_list))
        .route("/chat/start", post(chat::start))
        .route("/chat/admin/chats", get(chat::admin_chats))
        .route("/chat/send", post(chat::send))
        .route("/chat/:id", get(chat::detail))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/property", get(property::list))
        .route("/property/latest", get(property::latest))
        .route("/payment/webhook", post(payment::webhook))
        .route("/ws", get(ws_handler))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "api-service"
    }))
}
