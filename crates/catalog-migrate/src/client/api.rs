//! Provider HTTPS API binding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{parse_created, provider_error, CatalogClient, CreateItemRequest, CreatePriceRequest, RemoteError};
use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};

/// Creates records with form-encoded POSTs against the provider's REST API.
pub struct StripeApiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl StripeApiClient {
    pub fn new(config: &TargetConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MigrateError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn api_key(&self) -> std::result::Result<&str, RemoteError> {
        self.api_key.as_deref().ok_or_else(|| {
            RemoteError::new(format!(
                "no API key: set target.api_key or ${}",
                self.api_key_env
            ))
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/v1/{}", self.base_url, resource)
    }

    async fn post(&self, resource: &str, fields: &[(String, String)]) -> std::result::Result<String, RemoteError> {
        let api_key = self.api_key()?;
        let url = self.url(resource);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .basic_auth(api_key, None::<&str>)
            .form(fields)
            .send()
            .await
            .map_err(|e| RemoteError::new(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::new(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = provider_error(&body).unwrap_or_else(|| format!("HTTP {}", status));
            return Err(RemoteError::new(message));
        }
        parse_created(&body)
    }
}

#[async_trait]
impl CatalogClient for StripeApiClient {
    async fn create_item(&self, request: &CreateItemRequest) -> std::result::Result<String, RemoteError> {
        self.post("products", &request.form_fields()).await
    }

    async fn create_price(&self, request: &CreatePriceRequest) -> std::result::Result<String, RemoteError> {
        self.post("prices", &request.form_fields()).await
    }

    async fn health_check(&self) -> std::result::Result<(), RemoteError> {
        let api_key = self.api_key()?;
        let url = format!("{}?limit=1", self.url("products"));
        let response = self
            .http
            .get(&url)
            .basic_auth(api_key, None::<&str>)
            .send()
            .await
            .map_err(|e| RemoteError::new(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::new(
            provider_error(&body).unwrap_or_else(|| format!("HTTP {}", status)),
        ))
    }

    fn name(&self) -> &'static str {
        "api"
    }
}
