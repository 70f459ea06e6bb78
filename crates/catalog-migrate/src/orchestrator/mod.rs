//! Migration orchestrator - main workflow coordinator.
//!
//! A run has two sequential phases. Phase 1 creates every eligible item and
//! records its destination identifier in an [`IdMapping`]. Phase 2 creates
//! every eligible price against the destination identifier of its item. Each
//! create call is awaited before the next one is issued.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::client::{build_client, CatalogClient, CreateItemRequest, CreatePriceRequest, PriceCadence};
use crate::config::Config;
use crate::dataset;
use crate::error::Result;
use crate::model::{BillingMode, Item, Price};
use crate::remap::IdMapping;
use crate::report::{EntityKind, GapCause, IssueKind, MigrationReport};
use crate::state::MigrationState;

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    client: Arc<dyn CatalogClient>,
    state_file: Option<PathBuf>,
    state: Option<MigrationState>,
    progress: bool,
}

/// Result of a connectivity check against the destination.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub backend: String,
    pub healthy: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// What happened to an item in phase 1, used to explain gaps in phase 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Mapped,
    Inactive,
    NotCreated,
}

/// Mutable state of one run.
struct RunContext {
    mapping: IdMapping,
    report: MigrationReport,
    item_outcomes: HashMap<String, ItemOutcome>,
    dry_run: bool,
}

#[derive(Serialize)]
struct ProgressEvent<'a> {
    entity: EntityKind,
    source_id: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_id: Option<&'a str>,
}

impl Orchestrator {
    /// Create an orchestrator using the client binding named in the config.
    pub fn new(config: Config) -> Result<Self> {
        let client: Arc<dyn CatalogClient> = Arc::from(build_client(&config.target)?);
        Ok(Self::with_client(config, client))
    }

    /// Create an orchestrator with an explicit client.
    pub fn with_client(config: Config, client: Arc<dyn CatalogClient>) -> Self {
        Self {
            config,
            client,
            state_file: None,
            state: None,
            progress: false,
        }
    }

    /// Set the state file path for resume capability.
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.state_file = Some(path);
        self
    }

    /// Print one JSON line per record to stderr.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Load existing state for resume.
    pub fn resume(mut self) -> Result<Self> {
        if let Some(ref path) = self.state_file {
            if path.exists() {
                let state = MigrationState::load(path)?;
                state.validate_config(&self.config.hash())?;
                info!(
                    "Resuming run {} ({} items, {} prices already migrated)",
                    state.run_id,
                    state.items.len(),
                    state.prices.len()
                );
                self.state = Some(state);
            }
        }
        Ok(self)
    }

    /// Run the migration: load both collections, create items, then prices,
    /// and write the mapping artifact.
    ///
    /// Only load, state and artifact errors are returned as `Err`; failures of
    /// individual records are collected in the report.
    pub async fn run(mut self) -> Result<MigrationReport> {
        let (items, prices) = self.load_sources()?;
        let dry_run = self.config.migration.dry_run;
        self.migrate(&items, &prices, dry_run).await
    }

    /// Check both collections and their references without calling the
    /// provider. Nothing is written.
    pub async fn validate(mut self) -> Result<MigrationReport> {
        let (items, prices) = self.load_sources()?;
        self.state_file = None;
        self.migrate(&items, &prices, true).await
    }

    /// Migrate already-loaded collections.
    pub async fn migrate(&mut self, items: &[Item], prices: &[Price], dry_run: bool) -> Result<MigrationReport> {
        let started = Instant::now();

        if self.state.is_none() && self.state_file.is_some() && !dry_run {
            self.state = Some(MigrationState::new(
                uuid::Uuid::new_v4().to_string(),
                self.config.hash(),
            ));
        }
        if !dry_run {
            // State must be writable before the first remote create.
            self.checkpoint(|_| ())?;
        }
        let run_id = self
            .state
            .as_ref()
            .map(|s| s.run_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!(
            "Starting migration run {} via {} backend{}",
            run_id,
            self.client.name(),
            if dry_run { " (dry run)" } else { "" }
        );
        info!("Found {} items and {} prices", items.len(), prices.len());

        let mut ctx = RunContext {
            mapping: IdMapping::new(),
            report: MigrationReport::new(run_id, dry_run),
            item_outcomes: HashMap::new(),
            dry_run,
        };
        ctx.report.items.found = items.len();
        ctx.report.prices.found = prices.len();

        if let Err(e) = self.run_phases(items, prices, &mut ctx).await {
            if !dry_run {
                // Items created so far must still reach the artifact.
                let mapping_file = &self.config.migration.mapping_file;
                match ctx.mapping.save(mapping_file) {
                    Ok(()) => warn!(
                        "Run aborted; partial item ID mapping saved to: {}",
                        mapping_file.display()
                    ),
                    Err(save_err) => error!("Failed to save item ID mapping: {}", save_err),
                }
            }
            return Err(e);
        }

        self.finalize(ctx, started)
    }

    async fn run_phases(&mut self, items: &[Item], prices: &[Price], ctx: &mut RunContext) -> Result<()> {
        info!("Phase 1: Creating items");
        self.migrate_items(items, ctx).await?;

        info!("Item ID mapping:");
        for (source, destination) in ctx.mapping.iter() {
            info!("  {} -> {}", source, destination);
        }

        info!("Phase 2: Creating prices");
        self.migrate_prices(prices, ctx).await
    }

    /// Test connectivity to the destination.
    pub async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self.client.health_check().await;
        HealthCheckResult {
            backend: self.client.name().to_string(),
            healthy: result.is_ok(),
            latency_ms: start.elapsed().as_millis() as u64,
            error: result.err().map(|e| e.message),
        }
    }

    fn load_sources(&self) -> Result<(Vec<Item>, Vec<Price>)> {
        info!("Loading items from {}", self.config.source.items_file.display());
        let items = dataset::load_items(&self.config.source.items_file)?;
        info!("Loading prices from {}", self.config.source.prices_file.display());
        let prices = dataset::load_prices(&self.config.source.prices_file)?;
        Ok((items.records, prices.records))
    }

    async fn migrate_items(&mut self, items: &[Item], ctx: &mut RunContext) -> Result<()> {
        let mut seen = HashSet::new();

        for item in items {
            let label = item.name.as_deref().unwrap_or(&item.id);

            if !item.active {
                info!("Skipping inactive item: {}", label);
                ctx.item_outcomes.entry(item.id.clone()).or_insert(ItemOutcome::Inactive);
                self.skip(ctx, EntityKind::Item, &item.id, IssueKind::Inactive);
                continue;
            }

            if !seen.insert(item.id.as_str()) {
                warn!("Skipping duplicate item id: {}", item.id);
                self.skip(ctx, EntityKind::Item, &item.id, IssueKind::Duplicate);
                continue;
            }

            if let Some(destination) = self.state.as_ref().and_then(|s| s.migrated_item(&item.id)) {
                debug!("Item {} already migrated as {}", item.id, destination);
                ctx.mapping.record(item.id.as_str(), destination)?;
                ctx.item_outcomes.insert(item.id.clone(), ItemOutcome::Mapped);
                self.skip(ctx, EntityKind::Item, &item.id, IssueKind::AlreadyMigrated);
                continue;
            }

            let request = match item_request(item) {
                Ok(request) => request,
                Err(reason) => {
                    warn!("Skipping invalid item {}: {}", item.id, reason);
                    ctx.item_outcomes.insert(item.id.clone(), ItemOutcome::NotCreated);
                    self.skip(ctx, EntityKind::Item, &item.id, IssueKind::Invalid { reason });
                    continue;
                }
            };

            info!("Creating item: {}", request.name);
            ctx.report.items.attempted += 1;

            let created = if ctx.dry_run {
                Ok(format!("dry_run_{}", item.id))
            } else {
                self.client.create_item(&request).await
            };

            let outcome = match created {
                Ok(destination) => match ctx.mapping.record(item.id.as_str(), destination.as_str()) {
                    Ok(()) => Ok(destination),
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(e.message),
            };

            match outcome {
                Ok(destination) => {
                    info!("Created item: {}", destination);
                    ctx.report.items.created += 1;
                    ctx.item_outcomes.insert(item.id.clone(), ItemOutcome::Mapped);
                    self.emit_progress(EntityKind::Item, &item.id, "created", Some(&destination));
                    if !ctx.dry_run {
                        self.checkpoint(|state| state.record_item(&item.id, &destination))?;
                    }
                }
                Err(message) => {
                    error!("Failed to create item {}: {}", item.id, message);
                    ctx.item_outcomes.insert(item.id.clone(), ItemOutcome::NotCreated);
                    self.skip(ctx, EntityKind::Item, &item.id, IssueKind::RemoteFailure { message });
                }
            }
        }

        Ok(())
    }

    async fn migrate_prices(&mut self, prices: &[Price], ctx: &mut RunContext) -> Result<()> {
        let mut seen = HashSet::new();

        for price in prices {
            if !price.active {
                info!("Skipping inactive price: {}", price.id);
                self.skip(ctx, EntityKind::Price, &price.id, IssueKind::Inactive);
                continue;
            }

            if !seen.insert(price.id.as_str()) {
                warn!("Skipping duplicate price id: {}", price.id);
                self.skip(ctx, EntityKind::Price, &price.id, IssueKind::Duplicate);
                continue;
            }

            if self.state.as_ref().is_some_and(|s| s.is_price_migrated(&price.id)) {
                debug!("Price {} already migrated", price.id);
                self.skip(ctx, EntityKind::Price, &price.id, IssueKind::AlreadyMigrated);
                continue;
            }

            let Some(item_id) = price.item.as_deref() else {
                let reason = "missing product".to_string();
                warn!("Skipping invalid price {}: {}", price.id, reason);
                self.skip(ctx, EntityKind::Price, &price.id, IssueKind::Invalid { reason });
                continue;
            };

            let Some(destination_item) = ctx.mapping.resolve(item_id).map(str::to_string) else {
                let cause = match ctx.item_outcomes.get(item_id) {
                    Some(ItemOutcome::Inactive) => GapCause::ItemInactive,
                    Some(_) => GapCause::ItemNotCreated,
                    None => GapCause::ItemUnknown,
                };
                warn!(
                    "Item {} not found in mapping, skipping price {}",
                    item_id, price.id
                );
                self.skip(
                    ctx,
                    EntityKind::Price,
                    &price.id,
                    IssueKind::ReferentialGap {
                        item_id: item_id.to_string(),
                        cause,
                    },
                );
                continue;
            };

            let request = match price_request(price, destination_item) {
                Ok(request) => request,
                Err(reason) => {
                    warn!("Skipping invalid price {}: {}", price.id, reason);
                    self.skip(ctx, EntityKind::Price, &price.id, IssueKind::Invalid { reason });
                    continue;
                }
            };

            info!(
                "Creating price: {} - {}",
                price.nickname.as_deref().unwrap_or("No nickname"),
                price.display_amount()
            );
            ctx.report.prices.attempted += 1;

            let created = if ctx.dry_run {
                Ok(format!("dry_run_{}", price.id))
            } else {
                self.client.create_price(&request).await
            };

            match created {
                Ok(destination) => {
                    info!("Created price: {}", destination);
                    ctx.report.prices.created += 1;
                    self.emit_progress(EntityKind::Price, &price.id, "created", Some(&destination));
                    if !ctx.dry_run {
                        self.checkpoint(|state| state.record_price(&price.id, &destination))?;
                    }
                }
                Err(e) => {
                    error!("Failed to create price {}: {}", price.id, e.message);
                    self.skip(
                        ctx,
                        EntityKind::Price,
                        &price.id,
                        IssueKind::RemoteFailure { message: e.message },
                    );
                }
            }
        }

        Ok(())
    }

    fn finalize(&mut self, ctx: RunContext, started: Instant) -> Result<MigrationReport> {
        let RunContext {
            mapping,
            mut report,
            dry_run,
            ..
        } = ctx;
        report.mapped_items = mapping.len();

        info!(
            "Migration {}: {}/{} items created, {}/{} prices created in {:.1}s",
            if dry_run { "dry run complete" } else { "complete" },
            report.items.created,
            report.items.found,
            report.prices.created,
            report.prices.found,
            started.elapsed().as_secs_f64()
        );
        if !report.is_clean() {
            warn!(
                "{} items and {} prices failed",
                report.items.failed, report.prices.failed
            );
        }

        if dry_run {
            return Ok(report);
        }

        let mapping_file = &self.config.migration.mapping_file;
        mapping.save(mapping_file)?;
        info!("Item ID mapping saved to: {}", mapping_file.display());

        let clean = report.is_clean();
        self.checkpoint(|state| state.mark_finished(clean))?;

        Ok(report)
    }

    fn skip(&self, ctx: &mut RunContext, entity: EntityKind, source_id: &str, kind: IssueKind) {
        let status = if kind.is_failure() { "failed" } else { "skipped" };
        self.emit_progress(entity, source_id, status, None);
        ctx.report.add_issue(entity, source_id, kind);
    }

    /// Apply `update` to the run state and persist it, if a state file is set.
    fn checkpoint(&mut self, update: impl FnOnce(&mut MigrationState)) -> Result<()> {
        if let (Some(state), Some(path)) = (self.state.as_mut(), self.state_file.as_ref()) {
            update(state);
            state.save(path)?;
        }
        Ok(())
    }

    fn emit_progress(&self, entity: EntityKind, source_id: &str, status: &str, destination_id: Option<&str>) {
        if !self.progress {
            return;
        }
        let event = ProgressEvent {
            entity,
            source_id,
            status,
            destination_id,
        };
        if let Ok(line) = serde_json::to_string(&event) {
            eprintln!("{}", line);
        }
    }
}

/// Build the create request for an item, or explain why it cannot be built.
fn item_request(item: &Item) -> std::result::Result<CreateItemRequest, String> {
    let name = item
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing name".to_string())?;
    let kind = item
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| "missing type".to_string())?;

    Ok(CreateItemRequest {
        name: name.to_string(),
        description: item.description.clone().filter(|d| !d.is_empty()),
        kind: kind.to_string(),
        metadata: item.metadata.clone().unwrap_or_default(),
    })
}

/// Build the create request for a price against its destination item.
fn price_request(price: &Price, destination_item: String) -> std::result::Result<CreatePriceRequest, String> {
    let currency = price
        .currency
        .as_deref()
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .ok_or_else(|| format!("invalid currency {:?}", price.currency))?;

    let unit_amount = match price.unit_amount {
        Some(amount) if amount >= 0 => amount as u64,
        Some(amount) => return Err(format!("negative unit_amount {}", amount)),
        None => return Err("missing unit_amount".to_string()),
    };

    let interval = price.recurring.as_ref().and_then(|r| r.interval);
    let cadence = match (price.billing_mode, interval) {
        (Some(BillingMode::OneTime), None) => PriceCadence::OneTime,
        (Some(BillingMode::OneTime), Some(_)) => {
            return Err("one_time price has a recurring interval".to_string())
        }
        (Some(BillingMode::Recurring), Some(interval)) => {
            let interval_count = price
                .recurring
                .as_ref()
                .and_then(|r| r.interval_count)
                .unwrap_or(1);
            if interval_count == 0 {
                return Err("recurring interval_count must be at least 1".to_string());
            }
            PriceCadence::Recurring {
                interval,
                interval_count,
            }
        }
        (Some(BillingMode::Recurring), None) => {
            return Err("recurring price has no interval".to_string())
        }
        (None, _) => return Err("missing billing type".to_string()),
    };

    Ok(CreatePriceRequest {
        item: destination_item,
        currency: currency.to_lowercase(),
        unit_amount,
        cadence,
        nickname: price.nickname.clone().filter(|n| !n.is_empty()),
        metadata: price.metadata.clone().unwrap_or_default(),
    })
}
