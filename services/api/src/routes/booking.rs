//! Booking routes

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::Booking,
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub property_id: Uuid,
}

/// Book a property for the caller. Re-booking the same property returns
/// the existing booking.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .properties
        .find_by_id(payload.property_id)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    let booking = state
        .bookings
        .create(auth_user.id, payload.property_id)
        .await?;

    info!("Booking {} for property {}", booking.id, payload.property_id);
    Ok((StatusCode::CREATED, Json(booking)))
}

/// All bookings, newest first (admin)
pub async fn admin_list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Booking>>> {
    if !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let bookings = state.bookings.list_all().await?;
    Ok(Json(bookings))
}

/// A user's bookings; visible to that user and admins
pub async fn user_list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Booking>>> {
    if auth_user.id != user_id && !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Cannot view another user's bookings".to_string(),
        ));
    }

    let bookings = state.bookings.list_for_user(user_id).await?;
    Ok(Json(bookings))
}
