//! Payment routes
//!
//! Confirmation may arrive through the verify endpoint, the gateway
//! webhook, or both; both paths funnel into the repository's idempotent
//! `apply_success`.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    gateway::GatewayChargeStatus,
    middleware::AuthUser,
    models::{PaymentStatus, PaymentSummary},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub property_id: Uuid,
    /// Defaults to the listing price when omitted
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Start a charge: insert the pending payment, then hand off to the
/// gateway. A gateway failure leaves the pending row in place for
/// webhook reconciliation.
pub async fn initialize(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<InitializeRequest>,
) -> ApiResult<impl IntoResponse> {
    let property = state
        .properties
        .find_by_id(payload.property_id)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    let amount = payload.amount.unwrap_or(property.price);
    if amount <= 0.0 {
        return Err(ApiError::Validation("Amount must be positive".to_string()));
    }

    let payment = state
        .payments
        .create_pending(auth_user.id, property.id, amount)
        .await?;

    // Phone-only accounts have no email; the gateway requires one
    let email = auth_user
        .email
        .clone()
        .unwrap_or_else(|| format!("{}@liaison.app", auth_user.id));

    let init = state.gateway.initialize(&email, amount).await?;
    state.payments.set_reference(payment.id, &init.reference).await?;

    info!("Payment {} initialized, reference {}", payment.id, init.reference);
    Ok((
        StatusCode::OK,
        Json(json!({
            "authorization_url": init.authorization_url,
            "reference": init.reference,
            "payment_id": payment.id,
        })),
    ))
}

/// Check a charge with the gateway and settle the local payment.
/// Safe to call repeatedly; side effects apply once.
pub async fn verify(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let payment = state
        .payments
        .find_by_reference(&reference)
        .await?
        .ok_or(ApiError::NotFound("Payment"))?;

    let status = if payment.status.is_terminal() {
        payment.status
    } else {
        match state.gateway.verify(&reference).await? {
            GatewayChargeStatus::Success => state.payments.apply_success(&payment).await?,
            GatewayChargeStatus::Failed => state.payments.mark_failed(payment.id).await?,
        }
    };

    let label = match status {
        PaymentStatus::Success => "paid",
        _ => "failed",
    };

    Ok(Json(json!({ "status": label })))
}

#[derive(Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Deserialize)]
pub struct WebhookData {
    pub reference: String,
}

/// Gateway callback. Unauthenticated; always 200 once processed so the
/// provider stops retrying.
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<impl IntoResponse> {
    if payload.event != "charge.success" {
        info!("Ignoring webhook event {}", payload.event);
        return Ok(StatusCode::OK);
    }

    match state
        .payments
        .find_by_reference(&payload.data.reference)
        .await?
    {
        Some(payment) => {
            state.payments.apply_success(&payment).await?;
            info!("Webhook confirmed payment {}", payment.id);
        }
        None => {
            warn!("Webhook for unknown reference {}", payload.data.reference);
        }
    }

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub property_id: Uuid,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Record a user-side cancellation; no gateway call, no property or
/// booking side effects
pub async fn cancel(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CancelRequest>,
) -> ApiResult<impl IntoResponse> {
    let property = state
        .properties
        .find_by_id(payload.property_id)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    let payment = state
        .payments
        .create_cancelled(
            auth_user.id,
            property.id,
            payload.amount.unwrap_or(property.price),
        )
        .await?;

    Ok((StatusCode::OK, Json(PaymentSummary::from(&payment))))
}

/// All payments, newest first (admin)
pub async fn admin_list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<PaymentSummary>>> {
    if !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let payments = state.payments.list_all().await?;
    Ok(Json(payments))
}

/// A user's payments; visible to that user and admins
pub async fn user_list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PaymentSummary>>> {
    if auth_user.id != user_id && !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Cannot view another user's payments".to_string(),
        ));
    }

    let payments = state.payments.list_for_user(user_id).await?;
    Ok(Json(payments))
}
