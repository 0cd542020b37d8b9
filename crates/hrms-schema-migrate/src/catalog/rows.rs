//! Typed records for each catalog query.
//!
//! Every catalog query decodes into one of these structs immediately after
//! the call, so downstream code never depends on ambient row shapes or
//! field-name casing conventions of the source catalog.

use tokio_postgres::Row;

/// One row from the column catalog query.
#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub name: String,
    pub data_type: String,
    pub length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub nullable: bool,
    pub default_expr: Option<String>,
    pub is_identity: bool,
    pub ordinal: i32,
}

impl ColumnRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            name: row.get(0),
            data_type: row.get(1),
            length: row.get(2),
            precision: row.get(3),
            scale: row.get(4),
            nullable: row.get(5),
            default_expr: row.get(6),
            is_identity: row.get(7),
            ordinal: row.get(8),
        }
    }
}

/// One row from the primary key catalog query.
#[derive(Debug, Clone)]
pub struct PrimaryKeyRow {
    pub constraint_name: String,
    pub column: String,
}

impl PrimaryKeyRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            constraint_name: row.get(0),
            column: row.get(1),
        }
    }
}

/// One row from the foreign key catalog query: a single local column
/// paired with the column it references.
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl ForeignKeyRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            constraint_name: row.get(0),
            column: row.get(1),
            ref_table: row.get(2),
            ref_column: row.get(3),
        }
    }
}

/// One row from the unique constraint catalog query.
#[derive(Debug, Clone)]
pub struct UniqueRow {
    pub constraint_name: String,
    pub column: String,
}

impl UniqueRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            constraint_name: row.get(0),
            column: row.get(1),
        }
    }
}

/// One row from the check constraint catalog query. The definition is
/// carried verbatim; no semantic parsing.
#[derive(Debug, Clone)]
pub struct CheckRow {
    pub constraint_name: String,
    pub definition: String,
}

impl CheckRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            constraint_name: row.get(0),
            definition: row.get(1),
        }
    }
}

/// One row from the index catalog query.
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub name: String,
    pub is_unique: bool,
}

impl IndexRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            name: row.get(0),
            is_unique: row.get(1),
        }
    }
}
