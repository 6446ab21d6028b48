//! Database repositories for the marketplace service

pub mod booking;
pub mod chat;
pub mod payment;
pub mod property;

pub use booking::BookingRepository;
pub use chat::ChatRepository;
pub use payment::PaymentRepository;
pub use property::{ListingQuery, PropertyRepository};
