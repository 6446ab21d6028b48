//! Payment gateway abstraction and the Paystack implementation

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::env;
use tracing::{info, warn};

use crate::error::ApiError;

/// Result of initializing a charge with the provider
#[derive(Debug, Clone)]
pub struct GatewayInit {
    pub authorization_url: String,
    pub reference: String,
}

/// Provider-side outcome of a charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayChargeStatus {
    Success,
    Failed,
}

/// Interface to the external payment provider. Amounts cross this
/// boundary in major units; implementations convert as the provider
/// requires.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, email: &str, amount: f64) -> Result<GatewayInit, ApiError>;
    async fn verify(&self, reference: &str) -> Result<GatewayChargeStatus, ApiError>;
}

/// Paystack configuration from the environment
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
}

impl PaystackConfig {
    /// Requires `PAYSTACK_SECRET_KEY`; `PAYSTACK_BASE_URL` overrides the
    /// live endpoint for testing
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_key = env::var("PAYSTACK_SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("PAYSTACK_SECRET_KEY environment variable not set"))?;
        let base_url = env::var("PAYSTACK_BASE_URL")
            .unwrap_or_else(|_| "https://api.paystack.co".to_string());

        Ok(PaystackConfig {
            secret_key,
            base_url,
        })
    }
}

/// Paystack REST client
pub struct PaystackClient {
    config: PaystackConfig,
    http: reqwest::Client,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
}

/// Paystack charges in integer minor units (pesewas/kobo)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(&self, email: &str, amount: f64) -> Result<GatewayInit, ApiError> {
        let url = format!("{}/transaction/initialize", self.config.base_url);
        let body = json!({
            "email": email,
            "amount": to_minor_units(amount),
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Paystack initialize request failed: {}", e);
                ApiError::Gateway("Payment provider unreachable".to_string())
            })?;

        let envelope: PaystackEnvelope<InitData> = response.json().await.map_err(|e| {
            warn!("Paystack initialize returned malformed body: {}", e);
            ApiError::Gateway("Payment provider returned an invalid response".to_string())
        })?;

        match (envelope.status, envelope.data) {
            (true, Some(data)) => {
                info!("Paystack charge initialized: {}", data.reference);
                Ok(GatewayInit {
                    authorization_url: data.authorization_url,
                    reference: data.reference,
                })
            }
            _ => Err(ApiError::Gateway(
                envelope
                    .message
                    .unwrap_or_else(|| "Payment initialization failed".to_string()),
            )),
        }
    }

    async fn verify(&self, reference: &str) -> Result<GatewayChargeStatus, ApiError> {
        let url = format!("{}/transaction/verify/{}", self.config.base_url, reference);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| {
                warn!("Paystack verify request failed: {}", e);
                ApiError::Gateway("Payment provider unreachable".to_string())
            })?;

        let envelope: PaystackEnvelope<VerifyData> = response.json().await.map_err(|e| {
            warn!("Paystack verify returned malformed body: {}", e);
            ApiError::Gateway("Payment provider returned an invalid response".to_string())
        })?;

        match envelope.data {
            Some(data) if data.status == "success" => Ok(GatewayChargeStatus::Success),
            Some(_) => Ok(GatewayChargeStatus::Failed),
            None => Err(ApiError::Gateway(
                envelope
                    .message
                    .unwrap_or_else(|| "Payment verification failed".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_convert_to_minor_units() {
        assert_eq!(to_minor_units(1200.50), 120050);
        assert_eq!(to_minor_units(0.0), 0);
        // rounding, not truncation
        assert_eq!(to_minor_units(19.999), 2000);
    }
}
