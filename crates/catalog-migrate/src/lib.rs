//! # catalog-migrate
//!
//! Migrate a billing provider's product catalog (items and their prices) from
//! one account to another.
//!
//! The destination assigns new identifiers, so a run happens in two phases:
//!
//! - **Items** are created first and each new identifier is recorded in an
//!   [`IdMapping`]
//! - **Prices** are then created against the destination identifier of their
//!   item; prices whose item has no mapping are skipped
//! - **Mapping artifact** with every source -> destination item identifier is
//!   written at the end, even when some records failed
//! - **Resume capability** via an optional signed JSON state file
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> catalog_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let report = Orchestrator::new(config)?.run().await?;
//!     println!("Created {} items and {} prices", report.items.created, report.prices.created);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod remap;
pub mod report;
pub mod state;

// Re-exports for convenient access
pub use client::{CatalogClient, CreateItemRequest, CreatePriceRequest, PriceCadence, RemoteError};
pub use config::{Backend, Config, MigrationConfig, SourceConfig, TargetConfig};
pub use dataset::{load_items, load_prices, SourceEncoding};
pub use error::{MigrateError, Result};
pub use model::{BillingMode, Interval, Item, Price};
pub use orchestrator::{HealthCheckResult, Orchestrator};
pub use remap::IdMapping;
pub use report::{GapCause, IssueKind, MigrationReport, RecordIssue};
pub use state::MigrationState;
