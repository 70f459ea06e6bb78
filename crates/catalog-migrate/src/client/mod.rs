//! Remote catalog client: the capability the engine uses to create records in
//! the destination account.
//!
//! This module defines:
//!
//! - [`CatalogClient`]: the create-item / create-price contract
//! - [`CreateItemRequest`] / [`CreatePriceRequest`]: typed request payloads
//! - [`RemoteError`]: the single, unclassified failure type
//!
//! Requests are encoded by [`CreateItemRequest::form_fields`] and
//! [`CreatePriceRequest::form_fields`] into the provider's form-parameter
//! syntax. Both bindings ([`StripeCliClient`], [`StripeApiClient`]) send those
//! pairs as discrete values, so no quoting or escaping is ever applied.

mod api;
mod cli;

pub use api::StripeApiClient;
pub use cli::StripeCliClient;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{Backend, TargetConfig};
use crate::error::Result;
use crate::model::{Interval, Metadata};

/// A create call failed. Carries the provider-supplied message.
///
/// Validation, auth, rate-limit and network failures are not distinguished.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Remote error: {message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create records in the destination catalog.
///
/// Calls are not idempotent: two equivalent requests create two records.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Create an item and return its destination identifier.
    async fn create_item(&self, request: &CreateItemRequest) -> std::result::Result<String, RemoteError>;

    /// Create a price and return its destination identifier.
    async fn create_price(&self, request: &CreatePriceRequest) -> std::result::Result<String, RemoteError>;

    /// Check that the destination is reachable and credentials are accepted.
    async fn health_check(&self) -> std::result::Result<(), RemoteError>;

    /// Short name of the binding, for logs.
    fn name(&self) -> &'static str;
}

/// Payload for creating an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub metadata: Metadata,
}

/// Payload for creating a price against an already-created item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePriceRequest {
    /// Destination item identifier.
    pub item: String,
    pub currency: String,
    pub unit_amount: u64,
    pub cadence: PriceCadence,
    pub nickname: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceCadence {
    OneTime,
    Recurring { interval: Interval, interval_count: u32 },
}

impl CreateItemRequest {
    /// Encode as ordered provider form parameters.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![("name".to_string(), self.name.clone())];
        if let Some(ref description) = self.description {
            fields.push(("description".to_string(), description.clone()));
        }
        fields.push(("type".to_string(), self.kind.clone()));
        push_metadata(&mut fields, &self.metadata);
        fields
    }
}

impl CreatePriceRequest {
    /// Encode as ordered provider form parameters.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("product".to_string(), self.item.clone()),
            ("currency".to_string(), self.currency.clone()),
            ("unit_amount".to_string(), self.unit_amount.to_string()),
        ];
        if let PriceCadence::Recurring {
            interval,
            interval_count,
        } = self.cadence
        {
            fields.push(("recurring[interval]".to_string(), interval.to_string()));
            if interval_count > 1 {
                fields.push((
                    "recurring[interval_count]".to_string(),
                    interval_count.to_string(),
                ));
            }
        }
        if let Some(ref nickname) = self.nickname {
            fields.push(("nickname".to_string(), nickname.clone()));
        }
        push_metadata(&mut fields, &self.metadata);
        fields
    }
}

fn push_metadata(fields: &mut Vec<(String, String)>, metadata: &Metadata) {
    for (key, value) in metadata {
        fields.push((format!("metadata[{}]", key), value.clone()));
    }
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct CreatedObject {
    id: String,
}

/// Extract the provider error message from a response body, if it carries one.
fn provider_error(body: &str) -> Option<String> {
    let parsed: ProviderErrorBody = serde_json::from_str(body).ok()?;
    let message = parsed
        .error
        .message
        .or(parsed.error.kind)
        .unwrap_or_else(|| "unknown provider error".to_string());
    Some(message)
}

/// Parse a successful create response and return the new object's id.
fn parse_created(body: &str) -> std::result::Result<String, RemoteError> {
    if let Some(message) = provider_error(body) {
        return Err(RemoteError::new(message));
    }
    serde_json::from_str::<CreatedObject>(body)
        .map(|obj| obj.id)
        .map_err(|e| RemoteError::new(format!("unexpected provider response: {}", e)))
}

/// Build the client binding selected by the target configuration.
pub fn build_client(config: &TargetConfig) -> Result<Box<dyn CatalogClient>> {
    match config.backend {
        Backend::Cli => Ok(Box::new(StripeCliClient::new(config))),
        Backend::Api => Ok(Box::new(StripeApiClient::new(config)?)),
    }
}
