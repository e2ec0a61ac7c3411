/// Database metadata discovery
///
/// Tables, columns, primary keys and index info, served from the known table
/// list and the schema catalog as result sets with the conventional column
/// headers. Name patterns use SQL `%` and `_` wildcards and ignore case.
use std::cell::RefCell;
use std::rc::Rc;

use super::connection::ConnectionState;
use super::result_set::ResultSet;
use crate::core::{ColumnSchema, ResultRow, Result, SqlType, TableSchema, Value};
use crate::executor::conditions::like_matches;
use crate::executor::{OutputColumn, QueryResult};

const TABLE_COLUMNS: &[(&str, SqlType)] = &[
    ("TABLE_CAT", SqlType::Varchar),
    ("TABLE_SCHEM", SqlType::Varchar),
    ("TABLE_NAME", SqlType::Varchar),
    ("TABLE_TYPE", SqlType::Varchar),
    ("REMARKS", SqlType::Varchar),
    ("TYPE_CAT", SqlType::Varchar),
    ("TYPE_SCHEM", SqlType::Varchar),
    ("TYPE_NAME", SqlType::Varchar),
    ("SELF_REFERENCING_COL_NAME", SqlType::Varchar),
    ("REF_GENERATION", SqlType::Varchar),
];

const COLUMN_COLUMNS: &[(&str, SqlType)] = &[
    ("TABLE_CAT", SqlType::Varchar),
    ("TABLE_SCHEM", SqlType::Varchar),
    ("TABLE_NAME", SqlType::Varchar),
    ("COLUMN_NAME", SqlType::Varchar),
    ("DATA_TYPE", SqlType::Integer),
    ("TYPE_NAME", SqlType::Varchar),
    ("COLUMN_SIZE", SqlType::Integer),
    ("BUFFER_LENGTH", SqlType::Integer),
    ("DECIMAL_DIGITS", SqlType::Integer),
    ("NUM_PREC_RADIX", SqlType::Integer),
    ("NULLABLE", SqlType::Integer),
    ("REMARKS", SqlType::Varchar),
    ("COLUMN_DEF", SqlType::Varchar),
    ("SQL_DATA_TYPE", SqlType::Integer),
    ("SQL_DATETIME_SUB", SqlType::Integer),
    ("CHAR_OCTET_LENGTH", SqlType::Integer),
    ("ORDINAL_POSITION", SqlType::Integer),
    ("IS_NULLABLE", SqlType::Varchar),
    ("SCOPE_CATALOG", SqlType::Varchar),
    ("SCOPE_SCHEMA", SqlType::Varchar),
    ("SCOPE_TABLE", SqlType::Varchar),
    ("SOURCE_DATA_TYPE", SqlType::SmallInt),
    ("IS_AUTOINCREMENT", SqlType::Varchar),
    ("IS_GENERATEDCOLUMN", SqlType::Varchar),
];

const PRIMARY_KEY_COLUMNS: &[(&str, SqlType)] = &[
    ("TABLE_CAT", SqlType::Varchar),
    ("TABLE_SCHEM", SqlType::Varchar),
    ("TABLE_NAME", SqlType::Varchar),
    ("COLUMN_NAME", SqlType::Varchar),
    ("KEY_SEQ", SqlType::SmallInt),
    ("PK_NAME", SqlType::Varchar),
];

const INDEX_INFO_COLUMNS: &[(&str, SqlType)] = &[
    ("TABLE_CAT", SqlType::Varchar),
    ("TABLE_SCHEM", SqlType::Varchar),
    ("TABLE_NAME", SqlType::Varchar),
    ("NON_UNIQUE", SqlType::Boolean),
    ("INDEX_QUALIFIER", SqlType::Varchar),
    ("INDEX_NAME", SqlType::Varchar),
    ("TYPE", SqlType::SmallInt),
    ("ORDINAL_POSITION", SqlType::SmallInt),
    ("COLUMN_NAME", SqlType::Varchar),
    ("ASC_OR_DESC", SqlType::Varchar),
    ("CARDINALITY", SqlType::BigInt),
    ("PAGES", SqlType::BigInt),
    ("FILTER_CONDITION", SqlType::Varchar),
];

/// `TYPE` value of a clustered index.
const INDEX_CLUSTERED: i32 = 1;
const COLUMN_NULLABLE: i32 = 1;
const COLUMN_NO_NULLS: i32 = 0;

/// True when `name` matches a `%`/`_` pattern ignoring case; no pattern
/// matches everything.
pub fn matches_pattern(name: &str, pattern: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some(p) if p.is_empty() || p == "%" => true,
        Some(p) => like_matches(&name.to_lowercase(), &p.to_lowercase()),
    }
}

/// Result set with the given header; cells not set in a row read as NULL.
fn build(header: &[(&str, SqlType)], rows: Vec<ResultRow>) -> ResultSet {
    let columns = header
        .iter()
        .map(|(label, sql_type)| OutputColumn::new(*label, *sql_type))
        .collect();
    ResultSet::new(QueryResult::new(columns, rows))
}

fn opt_int(value: Option<u32>) -> Value {
    value
        .and_then(|v| i32::try_from(v).ok())
        .map_or(Value::Null, Value::Int)
}

fn int(value: usize) -> Value {
    i32::try_from(value).map_or(Value::Null, Value::Int)
}

fn primary_key_name(table: &str) -> String {
    format!("PK_{table}")
}

fn column_row(table: &TableSchema, position: usize, column: &ColumnSchema) -> ResultRow {
    let mut row = ResultRow::new();
    row.insert("TABLE_NAME", Value::from(table.table_name.as_str()));
    row.insert("COLUMN_NAME", Value::from(column.name.as_str()));
    row.insert("DATA_TYPE", Value::Int(column.sql_type.type_code()));
    row.insert("TYPE_NAME", Value::from(column.type_name.as_str()));
    row.insert("COLUMN_SIZE", opt_int(column.column_size));
    row.insert("DECIMAL_DIGITS", opt_int(column.decimal_digits));
    row.insert("NUM_PREC_RADIX", opt_int(column.radix));
    row.insert(
        "NULLABLE",
        Value::Int(if column.nullable { COLUMN_NULLABLE } else { COLUMN_NO_NULLS }),
    );
    row.insert("CHAR_OCTET_LENGTH", opt_int(column.char_octet_length));
    row.insert("ORDINAL_POSITION", int(position));
    row.insert("IS_NULLABLE", Value::from(if column.nullable { "YES" } else { "NO" }));
    row.insert("IS_AUTOINCREMENT", Value::from(if column.oid_column { "YES" } else { "NO" }));
    row.insert("IS_GENERATEDCOLUMN", Value::from("NO"));
    row
}

pub struct DatabaseMetadata {
    conn: Rc<RefCell<ConnectionState>>,
}

impl DatabaseMetadata {
    pub(crate) const fn new(conn: Rc<RefCell<ConnectionState>>) -> Self {
        Self { conn }
    }

    fn matching_tables(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let mut names = self.conn.borrow_mut().known_table_names()?;
        names.retain(|name| matches_pattern(name, pattern));
        names.sort_by_key(|name| name.to_lowercase());
        Ok(names)
    }

    fn schema(&self, table: &str) -> Result<std::sync::Arc<TableSchema>> {
        self.conn.borrow_mut().table_schema(table)
    }

    /// One row per known table whose name matches `pattern`.
    pub fn tables(&self, pattern: Option<&str>) -> Result<ResultSet> {
        let rows = self
            .matching_tables(pattern)?
            .into_iter()
            .map(|name| {
                let mut row = ResultRow::new();
                row.insert("TABLE_NAME", Value::Text(name));
                row.insert("TABLE_TYPE", Value::from("TABLE"));
                row
            })
            .collect();
        Ok(build(TABLE_COLUMNS, rows))
    }

    /// Table types offered by the database.
    #[must_use]
    pub fn table_types(&self) -> ResultSet {
        let mut row = ResultRow::new();
        row.insert("TABLE_TYPE", Value::from("TABLE"));
        build(&[("TABLE_TYPE", SqlType::Varchar)], vec![row])
    }

    /// Resolved column descriptions for matching tables and columns.
    pub fn columns(&self, table_pattern: Option<&str>, column_pattern: Option<&str>) -> Result<ResultSet> {
        let mut rows = Vec::new();
        for table in self.matching_tables(table_pattern)? {
            let schema = self.schema(&table)?;
            for (i, column) in schema.columns.iter().enumerate() {
                if matches_pattern(&column.name, column_pattern) {
                    rows.push(column_row(&schema, i + 1, column));
                }
            }
        }
        Ok(build(COLUMN_COLUMNS, rows))
    }

    /// Primary-key columns of `table`, named `PK_<table>`.
    pub fn primary_keys(&self, table: &str) -> Result<ResultSet> {
        let schema = self.schema(table)?;
        let rows = schema
            .primary_key_columns()
            .into_iter()
            .enumerate()
            .map(|(i, column)| {
                let mut row = ResultRow::new();
                row.insert("TABLE_NAME", Value::from(schema.table_name.as_str()));
                row.insert("COLUMN_NAME", Value::Text(column));
                row.insert("KEY_SEQ", int(i + 1));
                row.insert("PK_NAME", Value::Text(primary_key_name(&schema.table_name)));
                row
            })
            .collect();
        Ok(build(PRIMARY_KEY_COLUMNS, rows))
    }

    /// The single unique primary-key index of `table`, one row per key
    /// column.
    pub fn index_info(&self, table: &str) -> Result<ResultSet> {
        let schema = self.schema(table)?;
        let rows = schema
            .primary_key_columns()
            .into_iter()
            .enumerate()
            .map(|(i, column)| {
                let mut row = ResultRow::new();
                row.insert("TABLE_NAME", Value::from(schema.table_name.as_str()));
                row.insert("NON_UNIQUE", Value::Bool(false));
                row.insert("INDEX_NAME", Value::Text(primary_key_name(&schema.table_name)));
                row.insert("TYPE", Value::Int(INDEX_CLUSTERED));
                row.insert("ORDINAL_POSITION", int(i + 1));
                row.insert("COLUMN_NAME", Value::Text(column));
                row.insert("ASC_OR_DESC", Value::from("A"));
                row
            })
            .collect();
        Ok(build(INDEX_INFO_COLUMNS, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Connection, ConnectionOptions};
    use crate::engine::{FileEngine, ITEMS_TABLE};
    use tempfile::TempDir;

    fn connect(temp: &TempDir) -> Connection {
        let options = ConnectionOptions {
            create_if_missing: true,
            ..ConnectionOptions::default()
        };
        let conn = Connection::open(temp.path().join("md.gdb"), Box::new(FileEngine::new()), options).unwrap();
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_update("CREATE TABLE Parcel (OBJECTID INTEGER, area DOUBLE, label VARCHAR(30))")
            .unwrap();
        stmt.execute_update("CREATE TABLE parcel_owner (T_Id INTEGER, name VARCHAR(40))")
            .unwrap();
        stmt.execute_update("CREATE TABLE road (OBJECTID INTEGER)").unwrap();
        conn
    }

    fn column_values(rs: &mut ResultSet, label: &str) -> Vec<Value> {
        let index = rs.find_column(label).unwrap();
        let mut out = Vec::new();
        while rs.next() {
            out.push(rs.get_value(index).unwrap());
        }
        out
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("Parcel", None));
        assert!(matches_pattern("Parcel", Some("%")));
        assert!(matches_pattern("Parcel", Some("parc%")));
        assert!(matches_pattern("Parcel", Some("PARCE_")));
        assert!(!matches_pattern("Parcel", Some("road")));
    }

    #[test]
    fn test_tables_filtered_by_pattern() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let md = conn.metadata().unwrap();
        let mut rs = md.tables(Some("PARCEL%")).unwrap();
        assert_eq!(rs.metadata().column_count(), 10);
        assert_eq!(
            column_values(&mut rs, "TABLE_NAME"),
            vec![Value::from("Parcel"), Value::from("parcel_owner")]
        );
        // System catalog tables are listed too
        let mut all = md.tables(None).unwrap();
        let names = column_values(&mut all, "TABLE_NAME");
        assert_eq!(names.len(), 5);
        assert!(names.contains(&Value::from(ITEMS_TABLE)));
        assert!(names.contains(&Value::from("road")));
    }

    #[test]
    fn test_columns_report_resolved_types() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let md = conn.metadata().unwrap();
        let mut rs = md.columns(Some("parcel"), None).unwrap();
        assert_eq!(rs.row_count(), 3);
        assert!(rs.next());
        assert_eq!(rs.get_value_by_label("COLUMN_NAME").unwrap(), Value::from("OBJECTID"));
        assert_eq!(rs.get_value_by_label("IS_AUTOINCREMENT").unwrap(), Value::from("YES"));
        assert!(rs.next());
        assert_eq!(rs.get_value_by_label("TYPE_NAME").unwrap(), Value::from("DOUBLE"));
        assert_eq!(rs.get_value_by_label("ORDINAL_POSITION").unwrap(), Value::Int(2));
        assert_eq!(
            rs.get_value_by_label("DATA_TYPE").unwrap(),
            Value::Int(SqlType::Double.type_code())
        );

        let mut named = md.columns(Some("%"), Some("NAME")).unwrap();
        assert_eq!(column_values(&mut named, "TABLE_NAME"), vec![Value::from("parcel_owner")]);
    }

    #[test]
    fn test_primary_keys_and_index_info() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let md = conn.metadata().unwrap();

        let mut pk = md.primary_keys("parcel_owner").unwrap();
        assert!(pk.next());
        assert_eq!(pk.get_value_by_label("COLUMN_NAME").unwrap(), Value::from("T_Id"));
        assert_eq!(pk.get_value_by_label("PK_NAME").unwrap(), Value::from("PK_parcel_owner"));
        assert_eq!(pk.get_i32(5).unwrap(), 1);
        assert!(!pk.next());

        let mut idx = md.index_info("PARCEL").unwrap();
        assert!(idx.next());
        assert_eq!(idx.get_value_by_label("INDEX_NAME").unwrap(), Value::from("PK_Parcel"));
        assert!(!idx.get_bool(4).unwrap());
        assert_eq!(idx.get_value_by_label("ASC_OR_DESC").unwrap(), Value::from("A"));
    }
}
