//! catalog-migrate CLI - copy a billing provider's products and prices to another account.

use catalog_migrate::{Config, MigrateError, MigrationReport, Orchestrator};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "catalog-migrate")]
#[command(about = "Migrate billing-provider products and prices between accounts")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Path to state file for resume capability
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides shared by `run` and `resume`.
#[derive(clap::Args)]
struct SourceOverrides {
    /// Override the items export file
    #[arg(long)]
    items: Option<PathBuf>,

    /// Override the prices export file
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Override where the item ID mapping is written
    #[arg(long)]
    mapping_file: Option<PathBuf>,
}

impl SourceOverrides {
    fn apply(self, config: &mut Config) -> Result<(), MigrateError> {
        if let Some(path) = self.items {
            config.source.items_file = path;
        }
        if let Some(path) = self.prices {
            config.source.prices_file = path;
        }
        if let Some(path) = self.mapping_file {
            config.migration.mapping_file = path;
        }
        config.validate()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new migration
    Run {
        #[command(flatten)]
        overrides: SourceOverrides,

        /// Dry run: validate and show plan without creating anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Resume a previously interrupted migration
    Resume {
        #[command(flatten)]
        overrides: SourceOverrides,
    },

    /// Validate export files and item references without creating anything
    Validate,

    /// Test the connection to the destination account
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run { overrides, dry_run } => {
            overrides.apply(&mut config)?;
            if dry_run {
                config.migration.dry_run = true;
            }

            let mut orchestrator = Orchestrator::new(config)?.with_progress(cli.progress);
            if let Some(path) = cli.state_file {
                orchestrator = orchestrator.with_state_file(path);
            }

            let report = orchestrator.run().await?;
            let status_msg = if report.dry_run {
                "Dry run completed!"
            } else {
                "Migration completed!"
            };
            print_report(&report, status_msg, cli.output_json)?;
        }

        Commands::Resume { overrides } => {
            // State file is required for resume
            let state_file = cli.state_file.ok_or_else(|| {
                MigrateError::Config("--state-file is required for resume".to_string())
            })?;

            if !state_file.exists() {
                return Err(MigrateError::Config(format!(
                    "State file not found: {:?}",
                    state_file
                )));
            }

            overrides.apply(&mut config)?;

            let orchestrator = Orchestrator::new(config)?
                .with_state_file(state_file)
                .resume()?
                .with_progress(cli.progress);

            info!("Resuming from previous state");

            let report = orchestrator.run().await?;
            print_report(&report, "Migration resumed and completed!", cli.output_json)?;
        }

        Commands::Validate => {
            let report = Orchestrator::new(config)?.validate().await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("Validation Results:");
                println!(
                    "  Items: {} found, {} would be created",
                    report.items.found, report.items.created
                );
                println!(
                    "  Prices: {} found, {} would be created",
                    report.prices.found, report.prices.created
                );
                for issue in &report.issues {
                    println!("  - {}", issue);
                }
            }
        }

        Commands::HealthCheck => {
            let result = Orchestrator::new(config)?.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Destination ({}): {} ({}ms)",
                    result.backend,
                    if result.healthy { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if let Some(err) = result.error {
                return Err(catalog_migrate::RemoteError::new(err).into());
            }
        }
    }

    Ok(())
}

fn print_report(report: &MigrationReport, status_msg: &str, json: bool) -> Result<(), MigrateError> {
    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!(
        "  Items: {} found, {} created, {} skipped, {} failed",
        report.items.found, report.items.created, report.items.skipped, report.items.failed
    );
    println!(
        "  Prices: {} found, {} created, {} skipped, {} failed",
        report.prices.found, report.prices.created, report.prices.skipped, report.prices.failed
    );
    println!("  Mapped items: {}", report.mapped_items);
    if !report.issues.is_empty() {
        println!("  Issues:");
        for issue in &report.issues {
            println!("    - {}", issue);
        }
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
