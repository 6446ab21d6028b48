//! Booking model

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A confirmed stay, tied to a user and a property. One row per
/// (user, property) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Status given to bookings created through the payment flow or the
/// direct admin-confirmed path
pub const BOOKING_CONFIRMED: &str = "confirmed";
