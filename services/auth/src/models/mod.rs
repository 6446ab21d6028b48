//! Authentication service models

pub mod otp;
pub mod user;

// Re-export for convenience
pub use otp::{OTP_TTL_MINUTES, OtpCode, OtpStatus};
pub use user::{Identity, NewUser, Role, User, UserStatus};
