//! Property listing routes

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, Role},
    models::{ApprovalStatus, Property, PropertyDraft, PropertyPatch, PropertyStatus},
    repositories::ListingQuery,
    state::AppState,
};

/// Text fields and uploaded images pulled out of a multipart submission
struct ListingForm {
    fields: HashMap<String, String>,
    images: Vec<String>,
}

/// Drain a multipart body: text parts become form fields, `images` parts
/// are uploaded through the image store as they stream in.
async fn read_listing_form(state: &AppState, mut multipart: Multipart) -> ApiResult<ListingForm> {
    let mut fields = HashMap::new();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "images" {
            let file_name = field
                .file_name()
                .unwrap_or("image")
                .to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read image: {}", e)))?;

            let url = state
                .images
                .store(&file_name, &content_type, bytes.to_vec())
                .await?;
            images.push(url);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read field: {}", e)))?;
            fields.insert(name, value);
        }
    }

    Ok(ListingForm { fields, images })
}

fn require_admin(auth_user: &AuthUser) -> ApiResult<()> {
    if auth_user.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}

/// Approval decisions and the approval queue are superadmin territory,
/// a plain admin does not qualify
fn require_superadmin(auth_user: &AuthUser) -> ApiResult<()> {
    if auth_user.role == Role::Superadmin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Superadmin access required".to_string()))
    }
}

/// Unapproved listings read as missing to everyone below superadmin
fn ensure_visible(property: Property, auth_user: &AuthUser) -> ApiResult<Property> {
    if property.approval_status != ApprovalStatus::Approved && auth_user.role != Role::Superadmin {
        return Err(ApiError::NotFound("Property"));
    }
    Ok(property)
}

/// Create a listing (admin). Starts pending approval.
pub async fn add(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let form = read_listing_form(&state, multipart).await?;
    let draft = PropertyDraft::from_fields(&form.fields).map_err(ApiError::Validation)?;

    if form.images.is_empty() {
        return Err(ApiError::Validation(
            "At least one image is required".to_string(),
        ));
    }

    let property = state.properties.create(&draft, &form.images).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

/// Partial update (admin). Any edit goes back through approval.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<Property>> {
    require_admin(&auth_user)?;

    let form = read_listing_form(&state, multipart).await?;
    let patch = PropertyPatch::from_fields(&form.fields).map_err(ApiError::Validation)?;

    let property = state
        .properties
        .update(id, &patch, &form.images)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    Ok(Json(property))
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub decision: String,
}

/// Approval decision (superadmin only)
pub async fn approve(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> ApiResult<Json<Property>> {
    require_superadmin(&auth_user)?;

    let decision = match payload.decision.as_str() {
        "approved" => ApprovalStatus::Approved,
        "rejected" => ApprovalStatus::Rejected,
        other => {
            return Err(ApiError::Validation(format!(
                "Unknown approval decision: {}",
                other
            )));
        }
    };

    let property = state
        .properties
        .set_approval(id, decision)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    info!("Property {} {}", id, decision.as_str());
    Ok(Json(property))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Availability override (admin). Unapproved listings can only be
/// touched by a superadmin.
pub async fn set_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult<Json<Property>> {
    require_admin(&auth_user)?;

    let property = state
        .properties
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    if property.approval_status != ApprovalStatus::Approved && auth_user.role != Role::Superadmin {
        return Err(ApiError::Forbidden(
            "Property is not approved yet".to_string(),
        ));
    }

    let status = PropertyStatus::from(payload.status.as_str());
    let property = state
        .properties
        .set_status(id, status)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    Ok(Json(property))
}

/// Public catalogue: approved listings with optional filter and search
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> ApiResult<Json<Vec<Property>>> {
    let properties = state.properties.list_approved(&params).await?;
    Ok(Json(properties))
}

/// Newest approved, still-available listings
pub async fn latest(State(state): State<AppState>) -> ApiResult<Json<Vec<Property>>> {
    let properties = state.properties.list_latest(5).await?;
    Ok(Json(properties))
}

/// Single listing; unapproved ones are visible to superadmins only
pub async fn detail(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Property>> {
    let property = state
        .properties
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Property"))?;

    Ok(Json(ensure_visible(property, &auth_user)?))
}

/// The approval queue (superadmin)
pub async fn pending(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Property>>> {
    require_superadmin(&auth_user)?;

    let properties = state.properties.list_pending().await?;
    Ok(Json(properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            email: None,
        }
    }

    fn listing(approval: ApprovalStatus) -> Property {
        Property {
            id: Uuid::new_v4(),
            name: "Sunset Apartments".to_string(),
            property_type: "Apartment".to_string(),
            price: 1200.50,
            images: vec!["https://img.example/1.jpg".to_string()],
            address: "12 Ring Road, Accra".to_string(),
            bedrooms: 3,
            bathrooms: 2,
            area: 85.5,
            description: "Spacious unit near the mall".to_string(),
            facilities: Vec::new(),
            geolocation: String::new(),
            status: PropertyStatus::Available,
            approval_status: approval,
            rating: 0.0,
            reviews: Vec::new(),
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn approval_gate_rejects_plain_admins() {
        assert!(matches!(
            require_superadmin(&caller(Role::Admin)),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            require_superadmin(&caller(Role::User)),
            Err(ApiError::Forbidden(_))
        ));
        assert!(require_superadmin(&caller(Role::Superadmin)).is_ok());
    }

    #[test]
    fn pending_listing_reads_as_missing_below_superadmin() {
        assert!(matches!(
            ensure_visible(listing(ApprovalStatus::Pending), &caller(Role::User)),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            ensure_visible(listing(ApprovalStatus::Pending), &caller(Role::Admin)),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            ensure_visible(listing(ApprovalStatus::Rejected), &caller(Role::Admin)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn superadmin_sees_pending_listings() {
        let property = ensure_visible(listing(ApprovalStatus::Pending), &caller(Role::Superadmin))
            .expect("superadmin should see pending listings");
        assert_eq!(property.approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn approved_listings_are_visible_to_everyone() {
        assert!(ensure_visible(listing(ApprovalStatus::Approved), &caller(Role::User)).is_ok());
    }
}
