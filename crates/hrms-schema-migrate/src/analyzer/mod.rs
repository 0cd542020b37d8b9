//! Analysis orchestration: catalog read, DDL synthesis, persist, emit.

use crate::audit::AnalysisReport;
use crate::catalog::{read_snapshot, CatalogSource, PgCatalogReader};
use crate::config::Config;
use crate::ddl::synthesize;
use crate::error::Result;
use crate::plan::MigrationPlan;
use crate::pool::Db;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Analysis orchestrator. Tables are analyzed sequentially, one at a time;
/// this is a low-frequency administrative tool, not a performance path.
pub struct Analyzer {
    config: Config,
    db: Db,
}

/// Summary of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub tables: usize,
    pub create_statements: usize,
    pub foreign_key_statements: usize,
    pub index_statements: usize,
    pub audit_path: PathBuf,
    pub plan_path: PathBuf,
}

impl AnalysisResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Connectivity probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub connected: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl Analyzer {
    /// Create an analyzer over the process-wide shared pool, establishing
    /// it on first use with the default retry policy.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Db::shared(&config.database).await?.clone();
        Ok(Self { config, db })
    }

    /// Create an analyzer over an existing pool handle.
    pub fn with_db(config: Config, db: Db) -> Self {
        Self { config, db }
    }

    pub fn database(&self) -> &Db {
        &self.db
    }

    /// List the tables that would be analyzed.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let reader = PgCatalogReader::new(self.db.clone());
        reader.list_tables(&self.config.analysis.table_prefix).await
    }

    /// Run the full analysis: read the catalog, synthesize DDL, persist
    /// the audit artifact, then emit the migration plan.
    pub async fn run(&self) -> Result<AnalysisResult> {
        let started_at = Utc::now();
        let start = std::time::Instant::now();
        let run_id = Uuid::new_v4();
        let prefix = &self.config.analysis.table_prefix;

        info!("Starting schema analysis run {} (prefix '{}')", run_id, prefix);

        let reader = PgCatalogReader::new(self.db.clone());
        let snapshot = read_snapshot(&reader, prefix).await?;
        let ddl = synthesize(&snapshot);

        let report = AnalysisReport::new(run_id, prefix.clone(), snapshot, ddl);
        report.save(&self.config.analysis.audit_path)?;

        let plan = MigrationPlan::from_ddl(prefix.clone(), &report.ddl);
        plan.save(&self.config.analysis.plan_path)?;

        let result = AnalysisResult {
            run_id,
            started_at,
            duration_seconds: start.elapsed().as_secs_f64(),
            tables: report.snapshot.len(),
            create_statements: report.ddl.len(),
            foreign_key_statements: report.ddl.values().map(|d| d.foreign_keys.len()).sum(),
            index_statements: report.ddl.values().map(|d| d.indexes.len()).sum(),
            audit_path: self.config.analysis.audit_path.clone(),
            plan_path: self.config.analysis.plan_path.clone(),
        };

        info!(
            "Analysis complete: {} tables, {} create / {} fk / {} index statements in {:.2}s",
            result.tables,
            result.create_statements,
            result.foreign_key_statements,
            result.index_statements,
            result.duration_seconds
        );
        Ok(result)
    }

    /// Probe connectivity and report latency.
    pub async fn health_check(&self) -> HealthCheck {
        match self.db.ping().await {
            Ok(latency) => HealthCheck {
                connected: true,
                latency_ms: latency.as_millis() as u64,
                error: None,
            },
            Err(e) => HealthCheck {
                connected: false,
                latency_ms: 0,
                error: Some(e.to_string()),
            },
        }
    }
}
