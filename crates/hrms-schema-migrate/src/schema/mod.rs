//! Schema model: typed, database-agnostic table metadata.
//!
//! A [`SchemaSnapshot`] is built fresh on every analysis run, immutable once
//! built, and consumed only by the DDL synthesizer and the audit artifact.

use crate::catalog::rows::{
    CheckRow, ColumnRow, ForeignKeyRow, IndexRow, PrimaryKeyRow, UniqueRow,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Categorical data type kind, driving size-suffix rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeKind {
    /// Length-parameterized character types (varchar, char, ...).
    Character,
    /// Arbitrary-precision numeric types (numeric, decimal, number).
    Numeric,
    /// Date and time types.
    DateTime,
    /// Unbounded text and binary types (text, bytea, blob, clob, ...).
    LargeObject,
    /// Any other native type (integers, floats, boolean, uuid, ...).
    Other,
}

/// Classify a raw catalog type name into a [`DataTypeKind`].
///
/// Fixed-width integer and float types are `Other`, not `Numeric`: the
/// catalog reports a precision for them, but they take no size suffix.
pub fn classify_type(data_type: &str) -> DataTypeKind {
    let dt = data_type.trim().to_lowercase();
    match dt.as_str() {
        "character varying" | "varchar" | "character" | "char" | "bpchar" | "nchar"
        | "nvarchar" | "varchar2" | "nvarchar2" => DataTypeKind::Character,
        "numeric" | "decimal" | "number" => DataTypeKind::Numeric,
        "date" | "datetime" | "smalldatetime" | "timestamptz" | "timetz" => DataTypeKind::DateTime,
        "text" | "bytea" | "blob" | "clob" | "nclob" | "ntext" | "image" | "xml" | "json"
        | "jsonb" => DataTypeKind::LargeObject,
        _ if dt.starts_with("timestamp") || dt.starts_with("time") || dt.starts_with("interval") => {
            DataTypeKind::DateTime
        }
        _ => DataTypeKind::Other,
    }
}

/// One physical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,

    /// Raw type name as reported by the catalog.
    pub type_name: String,

    /// Categorical kind derived from the type name.
    pub kind: DataTypeKind,

    /// Character-count length for character kinds.
    pub length: Option<i32>,

    /// Numeric precision.
    pub precision: Option<i32>,

    /// Numeric scale.
    pub scale: Option<i32>,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Default expression, verbatim. None when the column has no default.
    pub default: Option<String>,

    /// Whether the column is identity/sequence-generated.
    pub is_identity: bool,

    /// Ordinal position (1-based). Unique and total-ordered within a table;
    /// column order is part of the reconstruction contract.
    pub ordinal: i32,
}

/// Primary key: ordered column names plus the constraint name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyDef {
    pub name: String,
    pub columns: Vec<String>,
}

/// Foreign key relationship for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// Named single-column unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueConstraintDef {
    pub name: String,
    pub column: String,
}

/// Named check constraint. The predicate is replayed verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConstraintDef {
    pub name: String,
    pub predicate: String,
}

/// Non-system index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub is_unique: bool,

    /// Covered columns, derived by stripping the table-name prefix and the
    /// trailing `_IDX` token from the index name. Wrong for indexes that do
    /// not follow the `<table>_<columns>_IDX` convention; kept for parity
    /// with previously generated scripts.
    pub columns: String,
}

/// Full schema record for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Option<PrimaryKeyDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub uniques: Vec<UniqueConstraintDef>,
    pub checks: Vec<CheckConstraintDef>,
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    /// Assemble a table schema from raw catalog rows.
    ///
    /// Pure transform, no I/O. Columns are sorted by ordinal position here;
    /// incoming row order is never trusted.
    pub fn build(
        name: impl Into<String>,
        column_rows: Vec<ColumnRow>,
        pk_rows: Vec<PrimaryKeyRow>,
        fk_rows: Vec<ForeignKeyRow>,
        unique_rows: Vec<UniqueRow>,
        check_rows: Vec<CheckRow>,
        index_rows: Vec<IndexRow>,
    ) -> Self {
        let name = name.into();

        let mut columns: Vec<ColumnDef> = column_rows
            .into_iter()
            .map(|row| ColumnDef {
                kind: classify_type(&row.data_type),
                name: row.name,
                type_name: row.data_type,
                length: row.length,
                precision: row.precision,
                scale: row.scale,
                nullable: row.nullable,
                default: normalize_default(row.default_expr),
                is_identity: row.is_identity,
                ordinal: row.ordinal,
            })
            .collect();
        columns.sort_by_key(|c| c.ordinal);

        let primary_key = pk_rows.first().map(|first| PrimaryKeyDef {
            name: first.constraint_name.clone(),
            columns: pk_rows.iter().map(|r| r.column.clone()).collect(),
        });

        let foreign_keys = fk_rows
            .into_iter()
            .map(|row| ForeignKeyDef {
                name: row.constraint_name,
                column: row.column,
                ref_table: row.ref_table,
                ref_column: row.ref_column,
            })
            .collect();

        let uniques = unique_rows
            .into_iter()
            .map(|row| UniqueConstraintDef {
                name: row.constraint_name,
                column: row.column,
            })
            .collect();

        let checks = check_rows
            .into_iter()
            .map(|row| CheckConstraintDef {
                name: row.constraint_name,
                predicate: normalize_check_predicate(&row.definition),
            })
            .collect();

        let indexes = index_rows
            .into_iter()
            .map(|row| IndexDef {
                columns: derive_index_columns(&row.name, &name),
                name: row.name,
                is_unique: row.is_unique,
            })
            .collect();

        Self {
            name,
            columns,
            primary_key,
            foreign_keys,
            uniques,
            checks,
            indexes,
        }
    }

    /// Whether the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key.is_some()
    }
}

/// Complete in-memory schema model captured during one analysis run.
///
/// Keyed by table name; BTreeMap iteration gives the lexicographic table
/// order required for reproducible diffs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, TableSchema>,
}

impl SchemaSnapshot {
    pub fn insert(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Canonical form for default expressions: trimmed, empty means none.
fn normalize_default(expr: Option<String>) -> Option<String> {
    expr.map(|e| e.trim().to_string()).filter(|e| !e.is_empty())
}

/// Reduce a catalog check definition like `CHECK ((SALARY > 0))` to the
/// bare predicate `SALARY > 0`. The predicate itself stays verbatim.
fn normalize_check_predicate(definition: &str) -> String {
    let mut pred = definition.trim();
    // Byte comparison: a match is all ASCII, so slicing at 5 is safe even
    // when the definition contains multi-byte characters.
    if pred.len() >= 5 && pred.as_bytes()[..5].eq_ignore_ascii_case(b"check") {
        pred = pred[5..].trim_start();
    }
    let mut pred = pred.to_string();
    while let Some(inner) = strip_outer_parens(&pred) {
        pred = inner.to_string();
    }
    pred
}

/// Strip one matched pair of outer parentheses, if present.
fn strip_outer_parens(s: &str) -> Option<&str> {
    let s = s.trim();
    if !s.starts_with('(') || !s.ends_with(')') {
        return None;
    }
    // Make sure the opening paren matches the final closing one.
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != s.len() - 1 {
                    return None;
                }
            }
            _ => {}
        }
    }
    Some(s[1..s.len() - 1].trim())
}

/// Recover index covered columns from the index name by removing the
/// table-name prefix and the conventional `_IDX` suffix token.
///
/// Names outside the convention are returned with whatever could not be
/// stripped, matching the behavior of previously generated scripts.
pub fn derive_index_columns(index_name: &str, table_name: &str) -> String {
    let mut rest = index_name;

    // Compare on bytes so an index name with multi-byte characters at the
    // boundary offsets never panics the slice; when the guard passes, the
    // byte before each cut is ASCII, so the cut is a char boundary.
    let table_len = table_name.len();
    if rest.len() > table_len + 1
        && rest.as_bytes()[..table_len].eq_ignore_ascii_case(table_name.as_bytes())
        && rest.as_bytes()[table_len] == b'_'
    {
        rest = &rest[table_len + 1..];
    }

    if rest.len() > 4 && rest.as_bytes()[rest.len() - 4..].eq_ignore_ascii_case(b"_idx") {
        rest = &rest[..rest.len() - 4];
    }

    rest.to_string()
}
