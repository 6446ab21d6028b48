//! Repositories for database operations

pub mod otp;
pub mod user;

pub use otp::OtpRepository;
pub use user::UserRepository;
