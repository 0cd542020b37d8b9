//! hrms-schema-migrate CLI - HRMS schema analysis and migration plan tooling.

use clap::{Parser, Subcommand};
use hrms_schema_migrate::{apply_plan, Analyzer, Config, MigrateError, MigrationPlan};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "hrms-schema-migrate")]
#[command(about = "HRMS schema analysis and migration plan tooling")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the catalog, synthesize DDL, and write the audit and plan files
    Analyze {
        /// Override the table name prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Override the audit artifact path
        #[arg(long)]
        audit_file: Option<PathBuf>,

        /// Override the migration plan path
        #[arg(long)]
        plan_file: Option<PathBuf>,
    },

    /// Execute a previously emitted migration plan against the database
    Apply {
        /// Path to the migration plan
        #[arg(long, default_value = "migration-plan.json")]
        plan: PathBuf,
    },

    /// List the application tables visible in the catalog
    ListTables,

    /// Test the database connection
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
        .map_err(MigrateError::Config)?;

    // Prefer the YAML file; fall back to HRMS_DB_* environment variables so
    // the binary works inside containers without a mounted config.
    let mut config = if cli.config.exists() {
        let config = Config::load(&cli.config)?;
        info!("Loaded configuration from {:?}", cli.config);
        config
    } else {
        let config = Config::from_env()?;
        info!("Loaded configuration from environment");
        config
    };

    match cli.command {
        Commands::Analyze {
            prefix,
            audit_file,
            plan_file,
        } => {
            // Apply overrides
            if let Some(p) = prefix {
                config.analysis.table_prefix = p;
            }
            if let Some(path) = audit_file {
                config.analysis.audit_path = path;
            }
            if let Some(path) = plan_file {
                config.analysis.plan_path = path;
            }
            config.validate()?;

            let analyzer = Analyzer::new(config).await?;
            let result = analyzer.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nAnalysis completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Tables: {}", result.tables);
                println!("  CREATE TABLE statements: {}", result.create_statements);
                println!(
                    "  Foreign key statements: {}",
                    result.foreign_key_statements
                );
                println!("  Index statements: {}", result.index_statements);
                println!("  Audit: {:?}", result.audit_path);
                println!("  Plan: {:?}", result.plan_path);
            }
        }

        Commands::Apply { plan } => {
            if !plan.exists() {
                return Err(MigrateError::Config(format!(
                    "Plan file not found: {:?}",
                    plan
                )));
            }
            config.validate()?;

            let plan = MigrationPlan::load(&plan)?;
            info!(
                "Loaded plan with {} statements (prefix {})",
                plan.len(),
                plan.table_prefix
            );

            let analyzer = Analyzer::new(config).await?;
            let outcome = apply_plan(analyzer.database(), &plan).await?;

            if cli.output_json {
                println!("{}", outcome.to_json()?);
            } else {
                println!("\nPlan applied!");
                println!("  Statements: {}", outcome.statements_total);
                println!("  Executed: {}", outcome.executed);
                println!("  Skipped (already exist): {}", outcome.skipped);
                println!("  Duration: {:.2}s", outcome.duration_seconds);
            }
        }

        Commands::ListTables => {
            config.validate()?;
            let analyzer = Analyzer::new(config).await?;
            let tables = analyzer.list_tables().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}", table);
                }
                println!("\n{} table(s)", tables.len());
            }
        }

        Commands::HealthCheck => {
            config.validate()?;
            let analyzer = Analyzer::new(config).await?;
            let result = analyzer.health_check().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Database: {} ({}ms)",
                    if result.connected { "OK" } else { "FAILED" },
                    result.latency_ms
                );
                if let Some(ref err) = result.error {
                    println!("    Error: {}", err);
                }
            }

            if !result.connected {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
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
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
