//! # hrms-schema-migrate
//!
//! Schema introspection and DDL synthesis for replicating the HRMS payroll
//! database into a second instance.
//!
//! The library reads a live database's catalog metadata (tables, columns,
//! constraints, indexes), assembles a typed schema snapshot, synthesizes
//! `CREATE TABLE` / `ALTER TABLE` / `CREATE INDEX` statements, and emits:
//!
//! - an **audit artifact**: the full snapshot and synthesized DDL as
//!   human-diffable JSON, and
//! - a **migration plan**: an ordered, self-contained statement list that
//!   can later be applied to an empty target with nothing but connection
//!   credentials, tolerating already-applied objects on re-run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hrms_schema_migrate::{Analyzer, Config};
//!
//! #[tokio::main]
//! async fn main() -> hrms_schema_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let analyzer = Analyzer::new(config).await?;
//!     let result = analyzer.run().await?;
//!     println!("Analyzed {} tables", result.tables);
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod ddl;
pub mod error;
pub mod plan;
pub mod pool;
pub mod schema;

// Re-exports for convenient access
pub use analyzer::{AnalysisResult, Analyzer, HealthCheck};
pub use audit::AnalysisReport;
pub use catalog::{read_snapshot, CatalogSource, PgCatalogReader};
pub use config::{AnalysisConfig, Config, DbConfig};
pub use ddl::{synthesize, synthesize_table, TableDdl};
pub use error::{MigrateError, Result};
pub use plan::{
    apply_plan, apply_plan_with, ApplyOutcome, MigrationPlan, Phase, PlanExecutor, PlanStatement,
    StatementOutcome,
};
pub use pool::{Db, RetryPolicy};
pub use schema::{ColumnDef, DataTypeKind, SchemaSnapshot, TableSchema};
