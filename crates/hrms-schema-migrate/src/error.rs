//! Error types for schema analysis and migration.

use thiserror::Error;

/// Main error type for analysis and apply operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, empty credentials).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A catalog query failed while describing a table. Fatal for the run;
    /// no partial schema is accepted.
    #[error("Catalog read failed for {table}: {message}")]
    Catalog { table: String, message: String },

    /// Connection pool error with context about where it occurred.
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A DDL statement failed during plan apply with anything other than
    /// an "already exists" signal. Aborts the remaining plan.
    #[error("Statement failed: {message}\n  Statement: {statement}")]
    Statement { statement: String, message: String },

    /// Writing the audit artifact or migration plan failed.
    #[error("Artifact write failed: {0}")]
    Serialization(String),

    /// Raw database error.
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    /// IO error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigrateError {
    /// Create a Catalog error for a specific table.
    pub fn catalog(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MigrateError::Catalog {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Statement error carrying the offending SQL text.
    pub fn statement(statement: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MigrateError::Statement {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::Catalog { .. } => 3,
            MigrateError::Statement { .. } => 4,
            MigrateError::Serialization(_) | MigrateError::Io(_) | MigrateError::Json(_) => 5,
            MigrateError::Pool { .. } | MigrateError::Db(_) => 6,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for analysis and migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_category() {
        let config = MigrateError::Config("bad".into());
        let catalog = MigrateError::catalog("HRMS_EMPLOYEE", "permission denied");
        let statement = MigrateError::statement("CREATE TABLE X (A int)", "syntax error");
        assert_eq!(config.exit_code(), 2);
        assert_eq!(catalog.exit_code(), 3);
        assert_eq!(statement.exit_code(), 4);
    }

    #[test]
    fn test_catalog_error_names_table() {
        let err = MigrateError::catalog("HRMS_LOAN", "connection reset");
        let msg = err.to_string();
        assert!(msg.contains("HRMS_LOAN"));
        assert!(msg.contains("connection reset"));
    }
}
