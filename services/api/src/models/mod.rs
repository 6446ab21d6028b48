//! Marketplace API models

pub mod booking;
pub mod chat;
pub mod payment;
pub mod property;

// Re-export for convenience
pub use booking::{BOOKING_CONFIRMED, Booking};
pub use chat::{ADMIN_SENTINEL, Chat, ChatMessage, ChatView, MessageView};
pub use payment::{Payment, PaymentStatus, PaymentSummary};
pub use property::{ApprovalStatus, Property, PropertyDraft, PropertyPatch, PropertyStatus};
