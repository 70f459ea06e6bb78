//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Exported source collections.
    #[serde(default)]
    pub source: SourceConfig,

    /// Destination account binding.
    #[serde(default)]
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Locations of the exported source collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Items export (default: "products.json").
    #[serde(default = "default_items_file")]
    pub items_file: PathBuf,

    /// Prices export (default: "prices.json").
    #[serde(default = "default_prices_file")]
    pub prices_file: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            items_file: default_items_file(),
            prices_file: default_prices_file(),
        }
    }
}

/// How the destination provider is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Provider command-line tool, one subprocess per call.
    #[default]
    Cli,
    /// Provider REST API over HTTPS.
    Api,
}

/// Destination account configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Binding used to reach the provider (default: cli).
    #[serde(default)]
    pub backend: Backend,

    /// Provider CLI executable (default: "stripe").
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// REST API base URL (default: "https://api.stripe.com").
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Secret key for the destination account. Falls back to `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable holding the secret key (default: "STRIPE_API_KEY").
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            cli_path: default_cli_path(),
            api_base: default_api_base(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TargetConfig {
    /// Secret key from the config, else from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty()))
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Where the source -> destination item mapping is written
    /// (default: "product_id_mapping.json").
    #[serde(default = "default_mapping_file")]
    pub mapping_file: PathBuf,

    /// Validate and report without calling the provider.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            mapping_file: default_mapping_file(),
            dry_run: false,
        }
    }
}

fn default_items_file() -> PathBuf {
    PathBuf::from("products.json")
}

fn default_prices_file() -> PathBuf {
    PathBuf::from("prices.json")
}

fn default_mapping_file() -> PathBuf {
    PathBuf::from("product_id_mapping.json")
}

fn default_cli_path() -> String {
    "stripe".to_string()
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_api_key_env() -> String {
    "STRIPE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
