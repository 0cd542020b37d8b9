//! Configuration loading and validation.

mod types;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;

/// Environment variable names consumed by [`Config::from_env`].
const ENV_HOST: &str = "HRMS_DB_HOST";
const ENV_PORT: &str = "HRMS_DB_PORT";
const ENV_DATABASE: &str = "HRMS_DB_NAME";
const ENV_USER: &str = "HRMS_DB_USER";
const ENV_PASSWORD: &str = "HRMS_DB_PASSWORD";
const ENV_POOL_SIZE: &str = "HRMS_DB_POOL_SIZE";
const ENV_TABLE_PREFIX: &str = "HRMS_TABLE_PREFIX";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables.
    ///
    /// Used when no config file is available, e.g. in deployment jobs that
    /// only inject connection credentials into the process environment.
    pub fn from_env() -> Result<Self> {
        let config = Config {
            database: DbConfig {
                host: env_var(ENV_HOST)?,
                port: env_var_or(ENV_PORT, "5432")?
                    .parse()
                    .map_err(|e| MigrateError::Config(format!("{}: {}", ENV_PORT, e)))?,
                database: env_var(ENV_DATABASE)?,
                user: env_var(ENV_USER)?,
                password: env_var(ENV_PASSWORD)?,
                pool_size: env_var_or(ENV_POOL_SIZE, "4")?
                    .parse()
                    .map_err(|e| MigrateError::Config(format!("{}: {}", ENV_POOL_SIZE, e)))?,
            },
            analysis: AnalysisConfig {
                table_prefix: std::env::var(ENV_TABLE_PREFIX)
                    .unwrap_or_else(|_| "HRMS_".to_string()),
                ..AnalysisConfig::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let db = &self.database;
        for (field, value) in [
            ("database.host", &db.host),
            ("database.database", &db.database),
            ("database.user", &db.user),
            ("database.password", &db.password),
        ] {
            if value.trim().is_empty() {
                return Err(MigrateError::Config(format!("{} must not be empty", field)));
            }
        }
        if db.pool_size == 0 {
            return Err(MigrateError::Config(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.analysis.table_prefix.is_empty() {
            return Err(MigrateError::Config(
                "analysis.table_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| MigrateError::Config(format!("environment variable {} is not set", name)))
}

fn env_var_or(name: &str, default: &str) -> Result<String> {
    Ok(std::env::var(name).unwrap_or_else(|_| default.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
database:
  host: localhost
  database: hrms
  user: hrms_admin
  password: secret
"#
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(minimal_yaml()).unwrap();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.analysis.table_prefix, "HRMS_");
        assert_eq!(
            config.analysis.plan_path.to_str().unwrap(),
            "migration-plan.json"
        );
    }

    #[test]
    fn test_from_yaml_overrides() {
        let yaml = r#"
database:
  host: db.internal
  port: 5433
  database: hrms
  user: hrms_admin
  password: secret
  pool_size: 8
analysis:
  table_prefix: PAY_
  audit_path: out/audit.json
  plan_path: out/plan.json
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.database.port, 5433);
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.analysis.table_prefix, "PAY_");
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let yaml = r#"
database:
  host: localhost
  database: hrms
  user: ""
  password: secret
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("database.user"));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let yaml = r#"
database:
  host: localhost
  database: hrms
  user: hrms_admin
  password: secret
  pool_size: 0
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let yaml = r#"
database:
  host: localhost
  database: hrms
  user: hrms_admin
  password: secret
analysis:
  table_prefix: ""
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }
}
