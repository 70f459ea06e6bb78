//! Provider CLI binding: one subprocess per create call.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{parse_created, CatalogClient, CreateItemRequest, CreatePriceRequest, RemoteError};
use crate::config::TargetConfig;

/// Environment variable the provider CLI reads its secret key from.
const CLI_API_KEY_ENV: &str = "STRIPE_API_KEY";

/// Creates records by invoking the provider's command-line tool.
///
/// Each form field becomes its own `-d key=value` argument, so values reach the
/// tool exactly as given. No shell is spawned. The secret key is handed over
/// through the child's environment so it never shows up in the process list.
pub struct StripeCliClient {
    program: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl StripeCliClient {
    pub fn new(config: &TargetConfig) -> Self {
        Self {
            program: config.cli_path.clone(),
            api_key: config.resolve_api_key(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Build the argument vector for `<resource> create`.
    pub fn create_args(&self, resource: &str, fields: &[(String, String)]) -> Vec<String> {
        let mut args = vec![resource.to_string(), "create".to_string()];
        for (key, value) in fields {
            args.push("-d".to_string());
            args.push(format!("{}={}", key, value));
        }
        args
    }

    async fn invoke(&self, args: &[String]) -> Result<String, RemoteError> {
        debug!("Running {} {}", self.program, args.first().map(String::as_str).unwrap_or(""));

        let mut command = Command::new(&self.program);
        command.args(args).kill_on_drop(true);
        if let Some(ref key) = self.api_key {
            command.env(CLI_API_KEY_ENV, key);
        }

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RemoteError::new(format!("{} timed out after {:?}", self.program, self.timeout)))?
            .map_err(|e| RemoteError::new(format!("failed to run {}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = super::provider_error(&stdout).unwrap_or_else(|| stderr.trim().to_string());
            return Err(RemoteError::new(message));
        }
        Ok(stdout)
    }

    async fn create(&self, resource: &str, fields: &[(String, String)]) -> Result<String, RemoteError> {
        let args = self.create_args(resource, fields);
        let stdout = self.invoke(&args).await?;
        parse_created(&stdout)
    }
}

#[async_trait]
impl CatalogClient for StripeCliClient {
    async fn create_item(&self, request: &CreateItemRequest) -> Result<String, RemoteError> {
        self.create("products", &request.form_fields()).await
    }

    async fn create_price(&self, request: &CreatePriceRequest) -> Result<String, RemoteError> {
        self.create("prices", &request.form_fields()).await
    }

    async fn health_check(&self) -> Result<(), RemoteError> {
        self.invoke(&["version".to_string()]).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "cli"
    }
}
