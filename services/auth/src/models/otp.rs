//! One-time password model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OTP codes stay valid for 15 minutes from issuance
pub const OTP_TTL_MINUTES: i64 = 15;

/// Lifecycle of an issued code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpStatus {
    Pending,
    Confirmed,
}

impl OtpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpStatus::Pending => "pending",
            OtpStatus::Confirmed => "confirmed",
        }
    }
}

impl From<&str> for OtpStatus {
    fn from(s: &str) -> Self {
        match s {
            "confirmed" => OtpStatus::Confirmed,
            _ => OtpStatus::Pending,
        }
    }
}

/// An issued one-time password
#[derive(Debug, Clone)]
pub struct OtpCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub status: OtpStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    /// Expiry deadline for a code issued now
    pub fn deadline_from(issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::minutes(OTP_TTL_MINUTES)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_expires_after_fifteen_minutes() {
        let issued = Utc::now();
        let otp = OtpCode {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "123456".to_string(),
            status: OtpStatus::Pending,
            expires_at: OtpCode::deadline_from(issued),
            created_at: issued,
        };

        assert!(!otp.is_expired(issued + Duration::minutes(14)));
        assert!(!otp.is_expired(issued + Duration::minutes(15)));
        assert!(otp.is_expired(issued + Duration::minutes(16)));
    }
}
