//! Migration plan: ordered DDL statements serialized as a self-contained
//! artifact.
//!
//! The plan is structured data (statements with table and phase metadata),
//! not generated program text. It embeds every SQL statement literally, so
//! applying it needs nothing beyond valid connection credentials.

use crate::ddl::TableDdl;
use crate::error::{MigrateError, Result};
use crate::pool::Db;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

/// Bumped whenever the plan layout changes incompatibly.
pub const PLAN_FORMAT_VERSION: u32 = 1;

/// Execution phase of a plan statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CreateTable,
    ForeignKey,
    Index,
}

/// One DDL statement with its owning table and phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStatement {
    pub table: String,
    pub phase: Phase,
    pub sql: String,
}

/// Ordered execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub format_version: u32,
    pub generated_at: DateTime<Utc>,
    pub table_prefix: String,
    pub statements: Vec<PlanStatement>,
}

impl MigrationPlan {
    /// Build the plan from synthesized DDL in the fixed three-phase order:
    /// every CREATE TABLE in lexicographic table order, then every foreign
    /// key ALTER grouped by owning table in the same order, then every
    /// CREATE INDEX the same way.
    ///
    /// This ordering exists so foreign keys never reference a
    /// not-yet-created table and indexes never reference a
    /// not-yet-existing constraint.
    pub fn from_ddl(table_prefix: impl Into<String>, ddl: &BTreeMap<String, TableDdl>) -> Self {
        let mut statements = Vec::new();

        for (table, table_ddl) in ddl {
            statements.push(PlanStatement {
                table: table.clone(),
                phase: Phase::CreateTable,
                sql: table_ddl.create_table.clone(),
            });
        }
        for (table, table_ddl) in ddl {
            for sql in &table_ddl.foreign_keys {
                statements.push(PlanStatement {
                    table: table.clone(),
                    phase: Phase::ForeignKey,
                    sql: sql.clone(),
                });
            }
        }
        for (table, table_ddl) in ddl {
            for sql in &table_ddl.indexes {
                statements.push(PlanStatement {
                    table: table.clone(),
                    phase: Phase::Index,
                    sql: sql.clone(),
                });
            }
        }

        Self {
            format_version: PLAN_FORMAT_VERSION,
            generated_at: Utc::now(),
            table_prefix: table_prefix.into(),
            statements,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Save the plan as pretty-printed JSON (atomic write: temp file, then
    /// rename).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MigrateError::Serialization(format!("serializing plan: {}", e)))?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)
            .map_err(|e| MigrateError::Serialization(format!("writing {:?}: {}", temp_path, e)))?;
        std::fs::rename(&temp_path, path)
            .map_err(|e| MigrateError::Serialization(format!("renaming to {:?}: {}", path, e)))?;

        info!("Wrote migration plan with {} statements to {:?}", self.len(), path);
        Ok(())
    }

    /// Load a plan, rejecting artifacts from an incompatible emitter.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan: Self = serde_json::from_str(&content)?;
        if plan.format_version != PLAN_FORMAT_VERSION {
            return Err(MigrateError::Config(format!(
                "plan format version {} is not supported (expected {})",
                plan.format_version, PLAN_FORMAT_VERSION
            )));
        }
        Ok(plan)
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub statements_total: usize,
    pub executed: usize,
    pub skipped: usize,
    pub duration_seconds: f64,
}

impl ApplyOutcome {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of executing one plan statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    Executed,
    /// The target object already exists; tolerated and counted as skipped.
    AlreadyExists,
}

/// Executes individual plan statements against a target.
///
/// The seam between plan bookkeeping and the live database; tests
/// substitute a scripted implementation.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    /// Run one DDL statement, classifying duplicate-object failures as
    /// [`StatementOutcome::AlreadyExists`]. Any other failure is an error
    /// that aborts the remaining plan.
    async fn execute(&self, sql: &str) -> Result<StatementOutcome>;
}

#[async_trait]
impl PlanExecutor for Db {
    async fn execute(&self, sql: &str) -> Result<StatementOutcome> {
        let client = self.client().await?;
        match client.batch_execute(sql).await {
            Ok(()) => Ok(StatementOutcome::Executed),
            Err(e) if is_already_exists(&e) => Ok(StatementOutcome::AlreadyExists),
            Err(e) => Err(MigrateError::statement(sql, e)),
        }
    }
}

/// Execute a plan sequentially against the target database.
///
/// A statement failing with an "already exists" signal is logged and
/// skipped, so re-running against an already-migrated target succeeds.
/// Any other failure aborts the remaining plan.
pub async fn apply_plan(db: &Db, plan: &MigrationPlan) -> Result<ApplyOutcome> {
    apply_plan_with(db, plan).await
}

/// Execute a plan through an explicit [`PlanExecutor`].
pub async fn apply_plan_with(
    executor: &dyn PlanExecutor,
    plan: &MigrationPlan,
) -> Result<ApplyOutcome> {
    let start = std::time::Instant::now();
    let mut executed = 0usize;
    let mut skipped = 0usize;

    for stmt in &plan.statements {
        match executor.execute(&stmt.sql).await {
            Ok(StatementOutcome::Executed) => {
                executed += 1;
                info!("Applied [{:?}] {}", stmt.phase, stmt.table);
            }
            Ok(StatementOutcome::AlreadyExists) => {
                skipped += 1;
                info!("Skipped [{:?}] {} (already exists)", stmt.phase, stmt.table);
            }
            Err(e) => {
                error!("Statement failed for {}: {}", stmt.table, e);
                return Err(e);
            }
        }
    }

    Ok(ApplyOutcome {
        statements_total: plan.len(),
        executed,
        skipped,
        duration_seconds: start.elapsed().as_secs_f64(),
    })
}

/// Whether a database error is a duplicate-object signal.
fn is_already_exists(e: &tokio_postgres::Error) -> bool {
    e.code()
        .map(|c| is_duplicate_object_code(c.code()))
        .unwrap_or(false)
}

/// SQLSTATE codes in the "object already exists" class.
pub(crate) fn is_duplicate_object_code(code: &str) -> bool {
    matches!(code, "42P07" | "42710" | "42701" | "42P06")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::synthesize;
    use crate::schema::{ForeignKeyDef, SchemaSnapshot, TableSchema};

    fn table_with_fk(name: &str, fk_to: Option<&str>) -> TableSchema {
        let mut table =
            TableSchema::build(name, vec![], vec![], vec![], vec![], vec![], vec![]);
        if let Some(target) = fk_to {
            table.foreign_keys.push(ForeignKeyDef {
                name: format!("{}_FK", name),
                column: "REF_ID".to_string(),
                ref_table: target.to_string(),
                ref_column: "ID".to_string(),
            });
        }
        table
    }

    fn plan_for(tables: Vec<TableSchema>) -> MigrationPlan {
        let mut snapshot = SchemaSnapshot::default();
        for t in tables {
            snapshot.insert(t);
        }
        MigrationPlan::from_ddl("HRMS_", &synthesize(&snapshot))
    }

    #[test]
    fn test_three_phase_ordering() {
        // HRMS_B references HRMS_A; both CREATEs must precede the FK ALTER,
        // which must precede any CREATE INDEX.
        let mut b = table_with_fk("HRMS_B", Some("HRMS_A"));
        b.indexes.push(crate::schema::IndexDef {
            name: "HRMS_B_REF_ID_IDX".to_string(),
            is_unique: false,
            columns: "REF_ID".to_string(),
        });
        let plan = plan_for(vec![table_with_fk("HRMS_A", None), b]);

        let phases: Vec<Phase> = plan.statements.iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::CreateTable,
                Phase::CreateTable,
                Phase::ForeignKey,
                Phase::Index
            ]
        );
        // CREATE TABLEs in lexicographic table order.
        assert_eq!(plan.statements[0].table, "HRMS_A");
        assert_eq!(plan.statements[1].table, "HRMS_B");
    }

    #[test]
    fn test_empty_snapshot_produces_empty_plan() {
        let plan = plan_for(vec![]);
        assert!(plan.is_empty());
        assert_eq!(plan.format_version, PLAN_FORMAT_VERSION);
    }

    #[test]
    fn test_plan_save_load_round_trip() {
        let plan = plan_for(vec![table_with_fk("HRMS_A", None)]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        plan.save(&path).unwrap();

        let loaded = MigrationPlan::load(&path).unwrap();
        assert_eq!(loaded.len(), plan.len());
        assert_eq!(loaded.table_prefix, "HRMS_");
        assert_eq!(loaded.statements[0].sql, plan.statements[0].sql);
    }

    #[test]
    fn test_load_rejects_unknown_format_version() {
        let mut plan = plan_for(vec![]);
        plan.format_version = 999;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        plan.save(&path).unwrap();

        assert!(MigrationPlan::load(&path).is_err());
    }

    /// Executor that marks statements mentioning `existing` tables as
    /// already present and fails statements mentioning `failing`, recording
    /// every SQL it was asked to run.
    struct ScriptedExecutor {
        existing: Vec<&'static str>,
        failing: Vec<&'static str>,
        log: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(existing: Vec<&'static str>, failing: Vec<&'static str>) -> Self {
            Self {
                existing,
                failing,
                log: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.log.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PlanExecutor for ScriptedExecutor {
        async fn execute(&self, sql: &str) -> Result<StatementOutcome> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.failing.iter().any(|f| sql.contains(f)) {
                return Err(MigrateError::statement(sql, "relation does not exist"));
            }
            if self.existing.iter().any(|e| sql.contains(e)) {
                return Ok(StatementOutcome::AlreadyExists);
            }
            Ok(StatementOutcome::Executed)
        }
    }

    #[tokio::test]
    async fn test_apply_skips_existing_objects_and_continues() {
        let plan = plan_for(vec![
            table_with_fk("HRMS_A", None),
            table_with_fk("HRMS_B", None),
            table_with_fk("HRMS_C", None),
        ]);
        let executor = ScriptedExecutor::new(vec!["HRMS_B"], vec![]);

        let outcome = apply_plan_with(&executor, &plan).await.unwrap();
        assert_eq!(outcome.statements_total, 3);
        assert_eq!(outcome.executed, 2);
        assert_eq!(outcome.skipped, 1);
        // The statement after the skipped one still ran.
        assert_eq!(executor.calls(), 3);
    }

    #[tokio::test]
    async fn test_apply_aborts_on_non_duplicate_failure() {
        let plan = plan_for(vec![
            table_with_fk("HRMS_A", None),
            table_with_fk("HRMS_B", None),
            table_with_fk("HRMS_C", None),
        ]);
        let executor = ScriptedExecutor::new(vec![], vec!["HRMS_B"]);

        let err = apply_plan_with(&executor, &plan).await.unwrap_err();
        match err {
            MigrateError::Statement { statement, .. } => {
                assert!(statement.contains("HRMS_B"));
            }
            other => panic!("expected Statement error, got {:?}", other),
        }
        // HRMS_C was never attempted.
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_apply_empty_plan_executes_nothing() {
        let plan = plan_for(vec![]);
        let executor = ScriptedExecutor::new(vec![], vec![]);

        let outcome = apply_plan_with(&executor, &plan).await.unwrap();
        assert_eq!(outcome.statements_total, 0);
        assert_eq!(outcome.executed, 0);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(executor.calls(), 0);
    }

    #[test]
    fn test_duplicate_object_codes() {
        assert!(is_duplicate_object_code("42P07")); // duplicate table
        assert!(is_duplicate_object_code("42710")); // duplicate object
        assert!(is_duplicate_object_code("42701")); // duplicate column
        assert!(is_duplicate_object_code("42P06")); // duplicate schema
        assert!(!is_duplicate_object_code("42601")); // syntax error
        assert!(!is_duplicate_object_code("28000")); // invalid authorization
    }
}
