//! Catalog reader: builds a [`SchemaSnapshot`] from a live database.

pub mod rows;

use crate::error::{MigrateError, Result};
use crate::pool::Db;
use crate::schema::{SchemaSnapshot, TableSchema};
use async_trait::async_trait;
use rows::{CheckRow, ColumnRow, ForeignKeyRow, IndexRow, PrimaryKeyRow, UniqueRow};
use tracing::{debug, info};

/// Source of catalog metadata.
///
/// The seam between analysis logic and the live database; tests substitute
/// an in-memory implementation.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List user tables whose name starts with `prefix`, in lexicographic
    /// order. An empty result is valid, not an error.
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>>;

    /// Describe one table with independent catalog queries for columns,
    /// primary key, foreign keys, unique constraints, check constraints,
    /// and indexes. Any query failure aborts the table with a fatal
    /// `Catalog` error; no partial schema is returned.
    async fn describe_table(&self, name: &str) -> Result<TableSchema>;
}

/// Read a full snapshot: list matching tables, then describe each one
/// sequentially.
///
/// Each catalog query borrows its own pooled connection, so the queries
/// that describe one table observe a best-effort consistency window: a
/// concurrent schema change can produce an inconsistent cross-section.
pub async fn read_snapshot(source: &dyn CatalogSource, prefix: &str) -> Result<SchemaSnapshot> {
    let tables = source.list_tables(prefix).await?;
    info!("Found {} tables matching prefix '{}'", tables.len(), prefix);

    let mut snapshot = SchemaSnapshot::default();
    for table_name in tables {
        let table = source.describe_table(&table_name).await?;
        debug!(
            "Described {}: {} columns, {} foreign keys, {} indexes",
            table.name,
            table.columns.len(),
            table.foreign_keys.len(),
            table.indexes.len()
        );
        snapshot.insert(table);
    }
    Ok(snapshot)
}

/// PostgreSQL catalog reader.
pub struct PgCatalogReader {
    db: Db,
}

impl PgCatalogReader {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn load_columns(&self, table: &str) -> Result<Vec<ColumnRow>> {
        let query = r#"
            SELECT
                c.column_name,
                c.data_type,
                c.character_maximum_length::int4,
                c.numeric_precision::int4,
                c.numeric_scale::int4,
                c.is_nullable = 'YES',
                c.column_default,
                COALESCE(
                    (SELECT a.attidentity IN ('a', 'd')
                     FROM pg_catalog.pg_class cl
                     JOIN pg_catalog.pg_attribute a ON a.attrelid = cl.oid
                     JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace
                     WHERE n.nspname = c.table_schema
                       AND cl.relname = c.table_name
                       AND a.attname = c.column_name),
                    false
                ),
                c.ordinal_position::int4
            FROM information_schema.columns c
            WHERE c.table_schema = current_schema() AND c.table_name = $1
            ORDER BY c.ordinal_position
        "#;

        let rows = self.db.query(query, &[&table]).await?;
        Ok(rows.iter().map(ColumnRow::from_row).collect())
    }

    async fn load_primary_key(&self, table: &str) -> Result<Vec<PrimaryKeyRow>> {
        let query = r#"
            SELECT c.conname, a.attname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = current_schema()
              AND t.relname = $1
              AND c.contype = 'p'
              AND a.attnum = ANY(c.conkey)
            ORDER BY array_position(c.conkey, a.attnum)
        "#;

        let rows = self.db.query(query, &[&table]).await?;
        Ok(rows.iter().map(PrimaryKeyRow::from_row).collect())
    }

    async fn load_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let query = r#"
            SELECT c.conname, a.attname, rt.relname, ra.attname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
            JOIN pg_catalog.pg_attribute a
                ON a.attrelid = c.conrelid AND a.attnum = ANY(c.conkey)
            JOIN pg_catalog.pg_attribute ra
                ON ra.attrelid = c.confrelid AND ra.attnum = ANY(c.confkey)
            WHERE n.nspname = current_schema()
              AND t.relname = $1
              AND c.contype = 'f'
              AND array_position(c.conkey, a.attnum)
                    = array_position(c.confkey, ra.attnum)
            ORDER BY c.conname, array_position(c.conkey, a.attnum)
        "#;

        let rows = self.db.query(query, &[&table]).await?;
        Ok(rows.iter().map(ForeignKeyRow::from_row).collect())
    }

    async fn load_uniques(&self, table: &str) -> Result<Vec<UniqueRow>> {
        let query = r#"
            SELECT c.conname, a.attname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = current_schema()
              AND t.relname = $1
              AND c.contype = 'u'
              AND a.attnum = ANY(c.conkey)
            ORDER BY c.conname, array_position(c.conkey, a.attnum)
        "#;

        let rows = self.db.query(query, &[&table]).await?;
        Ok(rows.iter().map(UniqueRow::from_row).collect())
    }

    async fn load_checks(&self, table: &str) -> Result<Vec<CheckRow>> {
        let query = r#"
            SELECT c.conname, pg_get_constraintdef(c.oid)
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = current_schema()
              AND t.relname = $1
              AND c.contype = 'c'
            ORDER BY c.conname
        "#;

        let rows = self.db.query(query, &[&table]).await?;
        Ok(rows.iter().map(CheckRow::from_row).collect())
    }

    async fn load_indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        // Constraint-backed indexes (PK, UNIQUE) are emitted as constraints,
        // not as CREATE INDEX statements.
        let query = r#"
            SELECT i.relname, ix.indisunique
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = current_schema()
              AND t.relname = $1
              AND NOT ix.indisprimary
              AND NOT EXISTS (
                  SELECT 1 FROM pg_catalog.pg_constraint c
                  WHERE c.conindid = ix.indexrelid
              )
            ORDER BY i.relname
        "#;

        let rows = self.db.query(query, &[&table]).await?;
        Ok(rows.iter().map(IndexRow::from_row).collect())
    }
}

#[async_trait]
impl CatalogSource for PgCatalogReader {
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
              AND table_schema = current_schema()
              AND table_name LIKE $1
            ORDER BY table_name
        "#;

        let pattern = format!("{}%", escape_like(prefix));
        let rows = self
            .db
            .query(query, &[&pattern])
            .await
            .map_err(|e| MigrateError::catalog(format!("{}*", prefix), e))?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn describe_table(&self, name: &str) -> Result<TableSchema> {
        let columns = self
            .load_columns(name)
            .await
            .map_err(|e| MigrateError::catalog(name, e))?;
        let pk = self
            .load_primary_key(name)
            .await
            .map_err(|e| MigrateError::catalog(name, e))?;
        let fks = self
            .load_foreign_keys(name)
            .await
            .map_err(|e| MigrateError::catalog(name, e))?;
        let uniques = self
            .load_uniques(name)
            .await
            .map_err(|e| MigrateError::catalog(name, e))?;
        let checks = self
            .load_checks(name)
            .await
            .map_err(|e| MigrateError::catalog(name, e))?;
        let indexes = self
            .load_indexes(name)
            .await
            .map_err(|e| MigrateError::catalog(name, e))?;

        Ok(TableSchema::build(
            name, columns, pk, fks, uniques, checks, indexes,
        ))
    }
}

/// Escape LIKE wildcards in a literal prefix. `HRMS_` contains `_`, which
/// would otherwise match any character.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FakeCatalog {
        tables: BTreeMap<String, TableSchema>,
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn list_tables(&self, prefix: &str) -> Result<Vec<String>> {
            Ok(self
                .tables
                .keys()
                .filter(|n| n.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn describe_table(&self, name: &str) -> Result<TableSchema> {
            self.tables
                .get(name)
                .cloned()
                .ok_or_else(|| MigrateError::catalog(name, "no such table"))
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl CatalogSource for FailingCatalog {
        async fn list_tables(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(vec!["HRMS_EMPLOYEE".to_string()])
        }

        async fn describe_table(&self, name: &str) -> Result<TableSchema> {
            Err(MigrateError::catalog(name, "permission denied"))
        }
    }

    fn empty_table(name: &str) -> TableSchema {
        TableSchema::build(name, vec![], vec![], vec![], vec![], vec![], vec![])
    }

    #[tokio::test]
    async fn test_read_snapshot_collects_matching_tables() {
        let mut tables = BTreeMap::new();
        for name in ["HRMS_EMPLOYEE", "HRMS_LOAN", "OTHER_TABLE"] {
            tables.insert(name.to_string(), empty_table(name));
        }
        let source = FakeCatalog { tables };

        let snapshot = read_snapshot(&source, "HRMS_").await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.tables.contains_key("HRMS_EMPLOYEE"));
        assert!(snapshot.tables.contains_key("HRMS_LOAN"));
        assert!(!snapshot.tables.contains_key("OTHER_TABLE"));
    }

    #[tokio::test]
    async fn test_read_snapshot_empty_is_valid() {
        let source = FakeCatalog {
            tables: BTreeMap::new(),
        };
        let snapshot = read_snapshot(&source, "HRMS_").await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_describe_failure_aborts_whole_run() {
        let err = read_snapshot(&FailingCatalog, "HRMS_").await.unwrap_err();
        match err {
            MigrateError::Catalog { table, .. } => assert_eq!(table, "HRMS_EMPLOYEE"),
            other => panic!("expected Catalog error, got {:?}", other),
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("HRMS_"), "HRMS\\_");
        assert_eq!(escape_like("100%"), "100\\%");
    }
}
