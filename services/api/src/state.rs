//! Shared application state for the marketplace service

use std::sync::Arc;

use crate::gateway::PaymentGateway;
use crate::middleware::JwtVerifier;
use crate::realtime::ChannelRegistry;
use crate::repositories::{BookingRepository, ChatRepository, PaymentRepository, PropertyRepository};
use crate::storage::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub jwt: JwtVerifier,
    pub properties: PropertyRepository,
    pub bookings: BookingRepository,
    pub payments: PaymentRepository,
    pub chats: ChatRepository,
    pub registry: ChannelRegistry,
    pub gateway: Arc<dyn PaymentGateway>,
    pub images: Arc<dyn ImageStore>,
}
