//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role, gating admin and superadmin operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "superadmin" => Role::Superadmin,
            _ => Role::User,
        }
    }
}

/// Account lifecycle state; phone registrations stay pending until the
/// OTP is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
        }
    }
}

impl From<&str> for UserStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => UserStatus::Pending,
            _ => UserStatus::Active,
        }
    }
}

/// How an account identifies itself: exactly one of email or phone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Email(String),
    Phone(String),
}

impl Identity {
    /// Resolve the optional email/phone pair from a registration payload.
    /// Exactly one of the two must be present.
    pub fn resolve(email: Option<String>, phone: Option<String>) -> Result<Self, String> {
        let email = email.filter(|e| !e.trim().is_empty());
        let phone = phone.filter(|p| !p.trim().is_empty());
        match (email, phone) {
            (Some(e), None) => Ok(Identity::Email(e)),
            (None, Some(p)) => Ok(Identity::Phone(p)),
            (Some(_), Some(_)) => {
                Err("Provide either an email or a phone number, not both".to_string())
            }
            (None, None) => Err("Either email or phone number must be provided".to_string()),
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user creation payload
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub identity: Identity,
    pub password: Option<String>,
    pub status: UserStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        assert_eq!(Role::from("superadmin"), Role::Superadmin);
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("user"), Role::User);
        // Unknown roles fall back to the least privileged
        assert_eq!(Role::from("root"), Role::User);
        assert_eq!(Role::Superadmin.as_str(), "superadmin");
    }

    #[test]
    fn identity_requires_exactly_one() {
        assert_eq!(
            Identity::resolve(Some("a@b.com".into()), None),
            Ok(Identity::Email("a@b.com".into()))
        );
        assert_eq!(
            Identity::resolve(None, Some("0201234567".into())),
            Ok(Identity::Phone("0201234567".into()))
        );
        assert!(Identity::resolve(None, None).is_err());
        assert!(Identity::resolve(Some("a@b.com".into()), Some("0201234567".into())).is_err());
        // Blank strings count as absent
        assert!(Identity::resolve(Some("  ".into()), None).is_err());
    }
}
