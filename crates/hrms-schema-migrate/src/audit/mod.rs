//! Audit artifact: the durable record of one analysis run.
//!
//! Written before the migration plan is emitted; nothing reads it back in.
//! It exists for human diffing between runs, not as live state.

use crate::ddl::TableDdl;
use crate::error::{MigrateError, Result};
use crate::schema::SchemaSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Full analysis record: the schema snapshot plus all synthesized DDL,
/// keyed by table name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub table_prefix: String,
    pub snapshot: SchemaSnapshot,
    pub ddl: BTreeMap<String, TableDdl>,
}

impl AnalysisReport {
    pub fn new(
        run_id: Uuid,
        table_prefix: impl Into<String>,
        snapshot: SchemaSnapshot,
        ddl: BTreeMap<String, TableDdl>,
    ) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            table_prefix: table_prefix.into(),
            snapshot,
            ddl,
        }
    }

    /// Save as pretty-printed JSON (atomic write: temp file, then rename).
    /// A failed write is fatal for the run; the artifact is the only
    /// durable record of the snapshot.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MigrateError::Serialization(format!("serializing report: {}", e)))?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)
            .map_err(|e| MigrateError::Serialization(format!("writing {:?}: {}", temp_path, e)))?;
        std::fs::rename(&temp_path, path)
            .map_err(|e| MigrateError::Serialization(format!("renaming to {:?}: {}", path, e)))?;

        info!(
            "Wrote analysis report for {} tables to {:?}",
            self.snapshot.len(),
            path
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
