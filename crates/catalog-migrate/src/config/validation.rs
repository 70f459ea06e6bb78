//! Configuration validation.

use super::{Backend, Config};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.items_file.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.items_file is required".into()));
    }
    if config.source.prices_file.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.prices_file is required".into()));
    }
    if config.source.items_file == config.source.prices_file {
        return Err(MigrateError::Config(
            "source.items_file and source.prices_file cannot be the same file".into(),
        ));
    }

    // Target validation
    if config.target.timeout_secs == 0 {
        return Err(MigrateError::Config(
            "target.timeout_secs must be at least 1".into(),
        ));
    }
    match config.target.backend {
        Backend::Cli => {
            if config.target.cli_path.is_empty() {
                return Err(MigrateError::Config(
                    "target.cli_path is required for the cli backend".into(),
                ));
            }
        }
        Backend::Api => {
            if !config.target.api_base.starts_with("http") {
                return Err(MigrateError::Config(format!(
                    "target.api_base must be an http(s) URL, got '{}'",
                    config.target.api_base
                )));
            }
        }
    }

    if config.migration.mapping_file.as_os_str().is_empty() {
        return Err(MigrateError::Config(
            "migration.mapping_file is required".into(),
        ));
    }

    Ok(())
}
