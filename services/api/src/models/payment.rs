//! Payment model and state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment lifecycle. `pending` may move to `success` or `failed`
/// exactly once; `cancelled` is written directly by a user-initiated
/// cancel and never touches the gateway. No transition leaves a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s {
            "success" => PaymentStatus::Success,
            "failed" => PaymentStatus::Failed,
            "cancelled" => PaymentStatus::Cancelled,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Payment entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub amount: f64,
    pub status: PaymentStatus,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Canonical projection returned by the admin and per-user listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub property_id: Uuid,
}

impl From<&Payment> for PaymentSummary {
    fn from(p: &Payment) -> Self {
        PaymentSummary {
            id: p.id,
            status: p.status,
            amount: p.amount,
            created_at: p.created_at,
            user_id: p.user_id,
            property_id: p.property_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Success.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::from(status.as_str()), status);
        }
    }
}
