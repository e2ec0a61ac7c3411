//! Forward-only cursor over a materialized query result.

use crate::core::{FgdbError, Result, SqlType, Value};
use crate::executor::{OutputColumn, QueryResult};
use crate::parser::literal::decode_bytes;

/// Column descriptions of a result set. Indexes are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSetMetaData {
    columns: Vec<OutputColumn>,
}

impl ResultSetMetaData {
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, index: usize) -> Result<&OutputColumn> {
        index
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .ok_or_else(|| FgdbError::InvalidParameter(format!("column index {index} out of range")))
    }

    pub fn column_label(&self, index: usize) -> Result<&str> {
        Ok(&self.column(index)?.label)
    }

    pub fn column_type(&self, index: usize) -> Result<SqlType> {
        Ok(self.column(index)?.sql_type)
    }

    pub fn column_type_name(&self, index: usize) -> Result<&str> {
        Ok(&self.column(index)?.type_name)
    }
}

#[derive(Debug, Clone)]
pub struct ResultSet {
    result: QueryResult,
    /// Index of the current row plus one; 0 before the first `next`.
    position: usize,
    last_was_null: bool,
}

impl ResultSet {
    #[must_use]
    pub const fn new(result: QueryResult) -> Self {
        Self {
            result,
            position: 0,
            last_was_null: false,
        }
    }

    /// Advances to the next row; false once the rows are exhausted.
    pub fn next(&mut self) -> bool {
        if self.position < self.result.len() {
            self.position += 1;
            true
        } else {
            self.position = self.result.len() + 1;
            false
        }
    }

    #[must_use]
    pub fn metadata(&self) -> ResultSetMetaData {
        ResultSetMetaData {
            columns: self.result.columns.clone(),
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.result.len()
    }

    /// 1-based index of a column label, ignoring case.
    pub fn find_column(&self, label: &str) -> Result<usize> {
        self.result
            .column_index(label)
            .map(|i| i + 1)
            .ok_or_else(|| FgdbError::UnknownColumn(label.to_string()))
    }

    /// True when the last value read was SQL NULL.
    #[must_use]
    pub const fn was_null(&self) -> bool {
        self.last_was_null
    }

    /// Value of the current row at a 1-based column index.
    pub fn get_value(&mut self, index: usize) -> Result<Value> {
        let row = self
            .position
            .checked_sub(1)
            .and_then(|i| self.result.rows.get(i))
            .ok_or_else(|| FgdbError::InvalidParameter("no current row".to_string()))?;
        let column = index
            .checked_sub(1)
            .and_then(|i| self.result.columns.get(i))
            .ok_or_else(|| FgdbError::InvalidParameter(format!("column index {index} out of range")))?;
        let value = row.value(&column.label);
        self.last_was_null = value.is_null();
        Ok(value)
    }

    pub fn get_value_by_label(&mut self, label: &str) -> Result<Value> {
        let index = self.find_column(label)?;
        self.get_value(index)
    }

    /// Text rendering of the value; `None` for NULL.
    pub fn get_string(&mut self, index: usize) -> Result<Option<String>> {
        Ok(match self.get_value(index)? {
            Value::Null => None,
            Value::Text(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Integer value; NULL reads as 0.
    pub fn get_i64(&mut self, index: usize) -> Result<i64> {
        let value = self.get_value(index)?;
        if value.is_null() {
            return Ok(0);
        }
        value
            .as_i64()
            .ok_or_else(|| conversion_error(&value, "integer"))
    }

    pub fn get_i32(&mut self, index: usize) -> Result<i32> {
        let value = self.get_i64(index)?;
        i32::try_from(value).map_err(|_| FgdbError::InvalidParameter(format!("value {value} out of range for int")))
    }

    /// Floating point value; NULL reads as 0.0.
    pub fn get_f64(&mut self, index: usize) -> Result<f64> {
        let value = self.get_value(index)?;
        if value.is_null() {
            return Ok(0.0);
        }
        value.as_f64().ok_or_else(|| conversion_error(&value, "double"))
    }

    /// Boolean value: numbers are true when non-zero, text accepts
    /// `true`/`false` and `1`/`0`. NULL reads as false.
    pub fn get_bool(&mut self, index: usize) -> Result<bool> {
        let value = self.get_value(index)?;
        match &value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(conversion_error(&value, "boolean")),
            },
            other => other
                .as_f64()
                .map(|n| n != 0.0)
                .ok_or_else(|| conversion_error(&value, "boolean")),
        }
    }

    /// Binary value; tagged binary text decodes, other text yields its
    /// UTF-8 bytes.
    pub fn get_bytes(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        Ok(match self.get_value(index)? {
            Value::Null => None,
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(decode_bytes(&s).unwrap_or_else(|| s.into_bytes())),
            other => Some(other.to_string().into_bytes()),
        })
    }

    /// The underlying materialized result.
    #[must_use]
    pub const fn result(&self) -> &QueryResult {
        &self.result
    }

    #[must_use]
    pub fn into_result(self) -> QueryResult {
        self.result
    }
}

fn conversion_error(value: &Value, target: &str) -> FgdbError {
    FgdbError::InvalidParameter(format!("cannot convert {value} to {target}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResultRow;

    fn result_set() -> ResultSet {
        let columns = vec![
            OutputColumn::new("id", SqlType::Integer),
            OutputColumn::new("label", SqlType::Varchar),
            OutputColumn::new("shape", SqlType::VarBinary),
        ];
        let rows = vec![
            [("id", Value::Int(7)), ("label", Value::from("true")), ("shape", Value::Bytes(vec![1, 2]))],
            [("id", Value::Null), ("label", Value::Null), ("shape", Value::Null)],
        ]
        .into_iter()
        .map(|cells| cells.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<ResultRow>())
        .collect();
        ResultSet::new(QueryResult::new(columns, rows))
    }

    #[test]
    fn test_cursor_walks_rows_once() {
        let mut rs = result_set();
        assert!(rs.get_value(1).is_err());
        assert!(rs.next());
        assert!(rs.next());
        assert!(!rs.next());
        assert!(!rs.next());
        assert!(rs.get_value(1).is_err());
    }

    #[test]
    fn test_typed_getters_and_was_null() {
        let mut rs = result_set();
        assert!(rs.next());
        assert_eq!(rs.get_i32(1).unwrap(), 7);
        assert!(!rs.was_null());
        assert!(rs.get_bool(2).unwrap());
        assert_eq!(rs.get_bytes(3).unwrap(), Some(vec![1, 2]));
        assert_eq!(rs.get_value_by_label("LABEL").unwrap(), Value::from("true"));

        assert!(rs.next());
        assert_eq!(rs.get_i64(1).unwrap(), 0);
        assert!(rs.was_null());
        assert_eq!(rs.get_string(2).unwrap(), None);
        assert_eq!(rs.get_f64(1).unwrap(), 0.0);
    }

    #[test]
    fn test_metadata_reports_types() {
        let rs = result_set();
        let md = rs.metadata();
        assert_eq!(md.column_count(), 3);
        assert_eq!(md.column_label(2).unwrap(), "label");
        assert_eq!(md.column_type(1).unwrap(), SqlType::Integer);
        assert_eq!(md.column_type_name(3).unwrap(), "GEOMETRY");
        assert!(md.column_label(0).is_err());
        assert_eq!(rs.find_column("ID").unwrap(), 1);
        assert!(matches!(rs.find_column("nope"), Err(FgdbError::UnknownColumn(_))));
    }

    #[test]
    fn test_conversion_failure() {
        let mut rs = result_set();
        rs.next();
        assert!(rs.get_i64(2).is_err());
    }
}
