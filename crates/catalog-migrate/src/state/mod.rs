//! File-based run state for resume capability.
//!
//! Records which source items and prices a run already created, so a later
//! run can continue without creating duplicates in the destination.

use crate::error::{MigrateError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::path::Path;

type HmacSha256 = Hmac<Sha256>;

/// Migration state for resume capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationState {
    /// Unique run identifier.
    pub run_id: String,

    /// SHA256 hash of the configuration.
    pub config_hash: String,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// Current run status.
    pub status: RunStatus,

    /// Source item id -> destination item id, for items created so far.
    #[serde(default)]
    pub items: IndexMap<String, String>,

    /// Source price id -> destination price id, for prices created so far.
    #[serde(default)]
    pub prices: IndexMap<String, String>,

    /// When the migration completed (if finished).
    pub completed_at: Option<DateTime<Utc>>,

    /// HMAC-SHA256 signature for integrity validation.
    /// Computed over serialized state (excluding this field) using config_hash as key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac: Option<String>,
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    /// Finished, but some records failed or were skipped.
    Partial,
}

impl MigrationState {
    /// Create a new migration state.
    pub fn new(run_id: String, config_hash: String) -> Self {
        Self {
            run_id,
            config_hash,
            started_at: Utc::now(),
            status: RunStatus::Running,
            items: IndexMap::new(),
            prices: IndexMap::new(),
            completed_at: None,
            hmac: None,
        }
    }

    /// Compute HMAC-SHA256 signature for state integrity validation.
    fn compute_hmac(&self) -> Result<String> {
        let mut state_for_signing = self.clone();
        state_for_signing.hmac = None;

        let content = serde_json::to_string(&state_for_signing)
            .map_err(|e| MigrateError::State(format!("Failed to serialize state for HMAC: {}", e)))?;

        let mut mac = HmacSha256::new_from_slice(self.config_hash.as_bytes())
            .map_err(|e| MigrateError::State(format!("Failed to create HMAC: {}", e)))?;

        mac.update(content.as_bytes());
        let result = mac.finalize();
        Ok(hex::encode(result.into_bytes()))
    }

    /// Load state from a file with integrity validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content)?;

        match &state.hmac {
            Some(stored_hmac) => {
                let expected_hmac = state.compute_hmac()?;
                if stored_hmac != &expected_hmac {
                    return Err(MigrateError::State(
                        "integrity check failed: HMAC mismatch (possible tampering)".to_string(),
                    ));
                }
            }
            None => {
                return Err(MigrateError::State(
                    "state file has no HMAC signature".to_string(),
                ));
            }
        }

        Ok(state)
    }

    /// Save state to a file (atomic write with HMAC).
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();

        self.hmac = Some(self.compute_hmac()?);

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MigrateError::State(format!("Failed to serialize state: {}", e)))?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Validate that the config hash matches for resume.
    pub fn validate_config(&self, config_hash: &str) -> Result<()> {
        if self.config_hash != config_hash {
            return Err(MigrateError::ConfigChanged);
        }
        Ok(())
    }

    pub fn record_item(&mut self, source_id: &str, destination_id: &str) {
        self.items
            .insert(source_id.to_string(), destination_id.to_string());
    }

    pub fn record_price(&mut self, source_id: &str, destination_id: &str) {
        self.prices
            .insert(source_id.to_string(), destination_id.to_string());
    }

    /// Destination id of an item created by an earlier run.
    pub fn migrated_item(&self, source_id: &str) -> Option<&str> {
        self.items.get(source_id).map(String::as_str)
    }

    pub fn is_price_migrated(&self, source_id: &str) -> bool {
        self.prices.contains_key(source_id)
    }

    /// Mark the run as finished.
    pub fn mark_finished(&mut self, clean: bool) {
        self.status = if clean {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };
        self.completed_at = Some(Utc::now());
    }
}
