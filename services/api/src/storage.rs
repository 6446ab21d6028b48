//! Image storage abstraction and the S3 implementation

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::env;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

/// Stores uploaded listing images and returns their public URLs
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError>;
}

/// S3 configuration from the environment
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Requires `S3_BUCKET`; `AWS_REGION` defaults to eu-west-1 and
    /// `S3_PUBLIC_BASE_URL` overrides the derived object URL prefix
    pub fn from_env() -> anyhow::Result<Self> {
        let bucket = env::var("S3_BUCKET")
            .map_err(|_| anyhow::anyhow!("S3_BUCKET environment variable not set"))?;
        let region = env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string());
        let public_base_url = env::var("S3_PUBLIC_BASE_URL").ok();

        Ok(S3Config {
            bucket,
            region,
            public_base_url,
        })
    }
}

/// S3-backed image store
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    config: S3Config,
}

impl S3ImageStore {
    pub async fn from_env(config: S3Config) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            config,
        }
    }

    fn object_url(&self, key: &str) -> String {
        match &self.config.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket, self.config.region, key
            ),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ApiError> {
        let key = format!("properties/{}-{}", Uuid::new_v4(), sanitize(file_name));

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 upload failed for {}: {}", key, e);
                ApiError::Internal
            })?;

        info!("Uploaded image {}", key);
        Ok(self.object_url(&key))
    }
}

fn sanitize(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize("plain-name.png"), "plain-name.png");
    }
}
