// Module declarations
pub mod error;
pub mod value;
pub mod data_type;
pub mod column;
pub mod row;
pub mod table;

// Re-exports for convenience
pub use error::{BatchOutcome, FgdbError, Result};
pub use value::Value;
pub use data_type::SqlType;
pub use column::{ColumnSchema, GeometryRole};
pub use row::ResultRow;
pub use table::TableSchema;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::cmp::Ordering;
    use std::str::FromStr;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Long(7_000_000_000).to_string(), "7000000000");
        assert_eq!(Value::Double(3.5).to_string(), "3.5");
        assert_eq!(Value::Text("hello".to_string()).to_string(), "hello");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
    }

    #[test]
    fn test_value_sql_eq_across_numeric_types() {
        assert!(Value::Int(2).sql_eq(&Value::Long(2)));
        assert!(Value::Double(2.0).sql_eq(&Value::Int(2)));
        assert!(Value::Decimal(Decimal::from_str("2.50").unwrap()).sql_eq(&Value::Double(2.5)));
        assert!(!Value::Null.sql_eq(&Value::Null));
        assert!(!Value::Text("a".into()).sql_eq(&Value::Text("A".into())));
    }

    #[test]
    fn test_value_sort_nulls_first() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(0)), Ordering::Less);
        assert_eq!(Value::Int(10).sort_cmp(&Value::Double(9.5)), Ordering::Greater);
        assert_eq!(Value::Text("b".into()).sort_cmp(&Value::Text("a".into())), Ordering::Greater);
    }

    #[test]
    fn test_column_defaults_by_name() {
        let oid = ColumnSchema::new("OBJECTID");
        assert_eq!(oid.sql_type, SqlType::Integer);
        assert!(oid.primary_key);
        assert!(oid.oid_column);
        assert_eq!(oid.column_size, Some(10));

        let tid = ColumnSchema::new("T_Id");
        assert!(tid.primary_key);
        assert!(!tid.oid_column);

        let shape = ColumnSchema::new("Shape");
        assert_eq!(shape.sql_type, SqlType::VarBinary);
        assert_eq!(shape.type_name, "GEOMETRY");

        let name = ColumnSchema::new("name");
        assert_eq!(name.sql_type, SqlType::Varchar);
        assert_eq!(name.column_size, Some(4000));
        assert!(name.nullable);
    }

    #[test]
    fn test_geometry_role_forces_binary() {
        let mut col = ColumnSchema::new("geom_col");
        col.apply_type(SqlType::Blob, None, None, None);
        col.set_geometry_role(GeometryRole::EmbeddedBlob);
        assert_eq!(col.sql_type, SqlType::VarBinary);
        assert_eq!(col.type_name, "GEOMETRY");
        assert_eq!(col.decimal_digits, Some(0));
    }

    #[test]
    fn test_table_schema_lookup_ignores_case() {
        let schema = TableSchema::new(
            "Parcel",
            vec![ColumnSchema::new("OBJECTID"), ColumnSchema::new("Name")],
            None,
            Some("OBJECTID".to_string()),
            None,
        );
        assert!(schema.column("objectid").is_some());
        assert_eq!(schema.column("NAME").map(|c| c.name.as_str()), Some("Name"));
        assert!(schema.column("missing").is_none());
        assert_eq!(schema.primary_key_columns(), vec!["OBJECTID".to_string()]);
    }

    #[test]
    fn test_result_row_case_insensitive() {
        let mut row = ResultRow::new();
        row.insert("Id", Value::Int(1));
        row.insert("ID", Value::Int(2));
        assert_eq!(row.get("id"), Some(&Value::Int(2)));
        assert_eq!(row.value("other"), Value::Null);
        assert_eq!(row.iter().count(), 1);
    }
}
