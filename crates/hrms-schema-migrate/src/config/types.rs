//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration.
    pub database: DbConfig,

    /// Analysis behavior configuration.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Database connection configuration.
///
/// Values are opaque connection parameters; nothing beyond "non-empty"
/// is validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

/// Analysis behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Table name prefix that selects the application's tables
    /// (default: "HRMS_").
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Path for the audit artifact (default: "schema-analysis.json").
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,

    /// Path for the emitted migration plan (default: "migration-plan.json").
    #[serde(default = "default_plan_path")]
    pub plan_path: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            audit_path: default_audit_path(),
            plan_path: default_plan_path(),
        }
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_pool_size() -> usize {
    4
}

fn default_table_prefix() -> String {
    "HRMS_".to_string()
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("schema-analysis.json")
}

fn default_plan_path() -> PathBuf {
    PathBuf::from("migration-plan.json")
}
