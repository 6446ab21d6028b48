//! SMS delivery for one-time passwords
//!
//! The core only needs a delivery seam; the HTTP provider targets the
//! smsonlinegh v5 API. `ConsoleSmsSender` stands in when no API key is
//! configured so local development never hits the provider.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

/// Delivery seam for OTP messages
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<()>;
}

/// SMS provider configuration
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_id: String,
}

impl SmsConfig {
    /// Create a new SmsConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SMS_API_URL`: provider endpoint (default: smsonlinegh send URL)
    /// - `SMS_API_KEY`: provider API key (required for the HTTP sender)
    /// - `SMS_SENDER_ID`: sender name shown on the handset (default: "Latictech")
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("SMS_API_KEY").ok()?;
        let api_url = std::env::var("SMS_API_URL")
            .unwrap_or_else(|_| "https://api.smsonlinegh.com/v5/message/sms/send".to_string());
        let sender_id = std::env::var("SMS_SENDER_ID").unwrap_or_else(|_| "Latictech".to_string());

        Some(SmsConfig {
            api_url,
            api_key,
            sender_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SmsHandshake {
    label: Option<String>,
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SmsResponse {
    handshake: Option<SmsHandshake>,
}

/// HTTP sender against the configured SMS provider
pub struct HttpSmsSender {
    client: reqwest::Client,
    config: SmsConfig,
}

impl HttpSmsSender {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<()> {
        let text = format!("Your OTP is {}. Valid for 15 minutes.", code);
        let form = [
            ("to", phone),
            ("text", text.as_str()),
            ("sender", self.config.sender_id.as_str()),
            ("type", "0"),
        ];

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Accept", "application/json")
            .header("Authorization", format!("key {}", self.config.api_key))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "SMS request failed with status {}",
                response.status()
            ));
        }

        let body: SmsResponse = response.json().await?;
        match body.handshake {
            Some(hs) if hs.label.as_deref() == Some("HSHK_OK") => {
                info!("OTP sent successfully to {}", phone);
                Ok(())
            }
            Some(hs) => Err(anyhow::anyhow!(
                "SMS delivery failed: {} (ID: {})",
                hs.label.unwrap_or_else(|| "Unknown error".to_string()),
                hs.id.map(|i| i.to_string()).unwrap_or_else(|| "N/A".into())
            )),
            None => Err(anyhow::anyhow!("SMS delivery failed: malformed response")),
        }
    }
}

/// Logs the OTP instead of sending it; used when SMS_API_KEY is unset
pub struct ConsoleSmsSender;

#[async_trait]
impl SmsSender for ConsoleSmsSender {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<()> {
        warn!("SMS provider not configured; OTP for {} is {}", phone, code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_sender_always_delivers() {
        let sender: &dyn SmsSender = &ConsoleSmsSender;
        assert!(sender.send_otp("+233550000000", "123456").await.is_ok());
    }
}
