//! DDL synthesizer: deterministic, pure rendering of table schemas to SQL.
//!
//! No validation of SQL semantics happens here; a malformed schema renders
//! literally and fails only when executed against a real engine.

use crate::schema::{ColumnDef, DataTypeKind, SchemaSnapshot, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Synthesized DDL for one table: the CREATE TABLE plus separate foreign
/// key and index statement lists. Foreign keys and indexes are never
/// inlined in the CREATE TABLE because they may reference objects created
/// later in dependency order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDdl {
    pub create_table: String,
    pub foreign_keys: Vec<String>,
    pub indexes: Vec<String>,
}

/// Synthesize DDL for every table in the snapshot, keyed by table name.
pub fn synthesize(snapshot: &SchemaSnapshot) -> BTreeMap<String, TableDdl> {
    snapshot
        .tables
        .iter()
        .map(|(name, table)| (name.clone(), synthesize_table(table)))
        .collect()
}

/// Synthesize DDL for a single table.
pub fn synthesize_table(table: &TableSchema) -> TableDdl {
    TableDdl {
        create_table: render_create_table(table),
        foreign_keys: table
            .foreign_keys
            .iter()
            .map(|fk| {
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
                    table.name, fk.name, fk.column, fk.ref_table, fk.ref_column
                )
            })
            .collect(),
        indexes: table
            .indexes
            .iter()
            .map(|idx| {
                let unique = if idx.is_unique { "UNIQUE " } else { "" };
                format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    unique, idx.name, table.name, idx.columns
                )
            })
            .collect(),
    }
}

fn render_create_table(table: &TableSchema) -> String {
    let mut clauses: Vec<String> = table.columns.iter().map(render_column).collect();

    // Table-level clauses in fixed order: primary key, uniques, checks.
    // The order is a policy choice for reproducible diffs between runs.
    if let Some(pk) = &table.primary_key {
        clauses.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            pk.name,
            pk.columns.join(", ")
        ));
    }
    for u in &table.uniques {
        clauses.push(format!("CONSTRAINT {} UNIQUE ({})", u.name, u.column));
    }
    for c in &table.checks {
        clauses.push(format!("CONSTRAINT {} CHECK ({})", c.name, c.predicate));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        table.name,
        clauses.join(",\n    ")
    )
}

/// Render one column definition: `name type[(size)] [NOT NULL] [DEFAULT expr]`.
fn render_column(col: &ColumnDef) -> String {
    let mut out = format!("{} {}{}", col.name, col.type_name, size_suffix(col));

    if !col.nullable {
        out.push_str(" NOT NULL");
    }

    if let Some(default) = &col.default {
        // Identity/sequence-generated defaults are regenerated by the
        // target's own identity mechanism, never replayed.
        if !col.is_identity && !is_identity_default(default) {
            out.push_str(" DEFAULT ");
            out.push_str(default);
        }
    }

    out
}

/// Size suffix by data-type kind. Date/time and large-object kinds take no
/// suffix even when the catalog reports a raw length for them.
fn size_suffix(col: &ColumnDef) -> String {
    match col.kind {
        DataTypeKind::Character => match col.length {
            Some(len) => format!("({})", len),
            None => String::new(),
        },
        DataTypeKind::Numeric => match (col.precision, col.scale) {
            (Some(p), Some(s)) if s != 0 => format!("({},{})", p, s),
            (Some(p), _) => format!("({})", p),
            _ => String::new(),
        },
        DataTypeKind::DateTime | DataTypeKind::LargeObject | DataTypeKind::Other => String::new(),
    }
}

/// Whether a default expression is an identity/sequence marker produced by
/// auto-increment machinery.
fn is_identity_default(expr: &str) -> bool {
    let e = expr.trim_start().trim_start_matches('"').to_lowercase();
    e.starts_with("nextval(") || e.starts_with("iseq$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        CheckConstraintDef, ForeignKeyDef, IndexDef, PrimaryKeyDef, UniqueConstraintDef,
    };

    fn column(name: &str, type_name: &str, kind: DataTypeKind, ordinal: i32) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            type_name: type_name.to_string(),
            kind,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            default: None,
            is_identity: false,
            ordinal,
        }
    }

    fn bare_table(name: &str, columns: Vec<ColumnDef>) -> TableSchema {
        TableSchema {
            name: name.to_string(),
            columns,
            primary_key: None,
            foreign_keys: vec![],
            uniques: vec![],
            checks: vec![],
            indexes: vec![],
        }
    }

    #[test]
    fn test_character_length_suffix() {
        let mut col = column("NAME", "VARCHAR2", DataTypeKind::Character, 1);
        col.length = Some(100);
        assert_eq!(render_column(&col), "NAME VARCHAR2(100)");
    }

    #[test]
    fn test_numeric_precision_and_scale_suffix() {
        let mut col = column("SALARY", "NUMBER", DataTypeKind::Numeric, 1);
        col.precision = Some(10);
        col.scale = Some(2);
        assert_eq!(render_column(&col), "SALARY NUMBER(10,2)");
    }

    #[test]
    fn test_numeric_zero_or_missing_scale_drops_scale() {
        let mut col = column("ID", "NUMBER", DataTypeKind::Numeric, 1);
        col.precision = Some(10);
        col.scale = Some(0);
        assert_eq!(render_column(&col), "ID NUMBER(10)");

        col.scale = None;
        assert_eq!(render_column(&col), "ID NUMBER(10)");
    }

    #[test]
    fn test_date_kind_never_gets_suffix() {
        let mut col = column("HIRED_ON", "DATE", DataTypeKind::DateTime, 1);
        col.length = Some(7);
        assert_eq!(render_column(&col), "HIRED_ON DATE");
    }

    #[test]
    fn test_large_object_kind_never_gets_suffix() {
        let mut col = column("PHOTO", "bytea", DataTypeKind::LargeObject, 1);
        col.length = Some(4000);
        assert_eq!(render_column(&col), "PHOTO bytea");
    }

    #[test]
    fn test_not_null_and_default() {
        let mut col = column("STATUS", "VARCHAR2", DataTypeKind::Character, 1);
        col.length = Some(1);
        col.nullable = false;
        col.default = Some("'A'".to_string());
        assert_eq!(render_column(&col), "STATUS VARCHAR2(1) NOT NULL DEFAULT 'A'");
    }

    #[test]
    fn test_identity_default_is_stripped() {
        let mut col = column("ID", "NUMBER", DataTypeKind::Numeric, 1);
        col.precision = Some(10);
        col.nullable = false;
        col.default = Some("nextval('hrms_employee_id_seq'::regclass)".to_string());
        assert_eq!(render_column(&col), "ID NUMBER(10) NOT NULL");

        col.default = Some("\"ISEQ$$_12345\".nextval".to_string());
        col.is_identity = true;
        assert_eq!(render_column(&col), "ID NUMBER(10) NOT NULL");
    }

    #[test]
    fn test_identity_flag_strips_any_default() {
        let mut col = column("ID", "integer", DataTypeKind::Other, 1);
        col.is_identity = true;
        col.default = Some("something_else()".to_string());
        assert_eq!(render_column(&col), "ID integer");
    }

    #[test]
    fn test_column_order_preserved_in_create_table() {
        let table = bare_table(
            "HRMS_EMPLOYEE",
            vec![
                column("ID", "NUMBER", DataTypeKind::Numeric, 1),
                column("NAME", "VARCHAR2", DataTypeKind::Character, 2),
                column("DEPT_ID", "NUMBER", DataTypeKind::Numeric, 3),
            ],
        );
        let ddl = synthesize_table(&table);
        let id_pos = ddl.create_table.find("ID NUMBER").unwrap();
        let name_pos = ddl.create_table.find("NAME VARCHAR2").unwrap();
        let dept_pos = ddl.create_table.find("DEPT_ID NUMBER").unwrap();
        assert!(id_pos < name_pos && name_pos < dept_pos);
    }

    #[test]
    fn test_table_clause_order_pk_unique_check() {
        let mut table = bare_table(
            "HRMS_EMPLOYEE",
            vec![column("ID", "NUMBER", DataTypeKind::Numeric, 1)],
        );
        table.primary_key = Some(PrimaryKeyDef {
            name: "HRMS_EMPLOYEE_PK".to_string(),
            columns: vec!["ID".to_string()],
        });
        table.uniques.push(UniqueConstraintDef {
            name: "HRMS_EMPLOYEE_EMAIL_UK".to_string(),
            column: "EMAIL".to_string(),
        });
        table.checks.push(CheckConstraintDef {
            name: "HRMS_EMPLOYEE_SAL_CK".to_string(),
            predicate: "SALARY > 0".to_string(),
        });

        let sql = synthesize_table(&table).create_table;
        let pk = sql.find("CONSTRAINT HRMS_EMPLOYEE_PK PRIMARY KEY (ID)").unwrap();
        let uk = sql.find("CONSTRAINT HRMS_EMPLOYEE_EMAIL_UK UNIQUE (EMAIL)").unwrap();
        let ck = sql.find("CONSTRAINT HRMS_EMPLOYEE_SAL_CK CHECK (SALARY > 0)").unwrap();
        assert!(pk < uk && uk < ck);
    }

    #[test]
    fn test_foreign_keys_and_indexes_are_separate_statements() {
        let mut table = bare_table(
            "HRMS_LOAN",
            vec![column("EMP_ID", "NUMBER", DataTypeKind::Numeric, 1)],
        );
        table.foreign_keys.push(ForeignKeyDef {
            name: "HRMS_LOAN_EMP_FK".to_string(),
            column: "EMP_ID".to_string(),
            ref_table: "HRMS_EMPLOYEE".to_string(),
            ref_column: "ID".to_string(),
        });
        table.indexes.push(IndexDef {
            name: "HRMS_LOAN_EMP_ID_IDX".to_string(),
            is_unique: false,
            columns: "EMP_ID".to_string(),
        });

        let ddl = synthesize_table(&table);
        assert!(!ddl.create_table.contains("FOREIGN KEY"));
        assert_eq!(
            ddl.foreign_keys,
            vec![
                "ALTER TABLE HRMS_LOAN ADD CONSTRAINT HRMS_LOAN_EMP_FK \
                 FOREIGN KEY (EMP_ID) REFERENCES HRMS_EMPLOYEE(ID)"
                    .to_string()
            ]
        );
        assert_eq!(
            ddl.indexes,
            vec!["CREATE INDEX HRMS_LOAN_EMP_ID_IDX ON HRMS_LOAN (EMP_ID)".to_string()]
        );
    }

    #[test]
    fn test_unique_index_statement() {
        let mut table = bare_table("HRMS_DEPT", vec![]);
        table.indexes.push(IndexDef {
            name: "HRMS_DEPT_CODE_IDX".to_string(),
            is_unique: true,
            columns: "CODE".to_string(),
        });
        let ddl = synthesize_table(&table);
        assert_eq!(
            ddl.indexes[0],
            "CREATE UNIQUE INDEX HRMS_DEPT_CODE_IDX ON HRMS_DEPT (CODE)"
        );
    }

    #[test]
    fn test_empty_check_predicate_rendered_literally() {
        let mut table = bare_table("HRMS_X", vec![]);
        table.checks.push(CheckConstraintDef {
            name: "HRMS_X_CK".to_string(),
            predicate: String::new(),
        });
        let sql = synthesize_table(&table).create_table;
        assert!(sql.contains("CONSTRAINT HRMS_X_CK CHECK ()"));
    }
}
