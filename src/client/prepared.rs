/// Prepared statements with positional parameters
///
/// The engine has no bind protocol, so parameters are rendered into the SQL
/// text before execution:
/// 1. Find `?` placeholders outside string literals and quoted identifiers
/// 2. Render each bound [`Param`] as a SQL literal
/// 3. Hand the resulting text to the wrapped [`Statement`]
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::result_set::ResultSet;
use super::statement::Statement;
use crate::core::{BatchOutcome, FgdbError, Result};
use crate::parser::literal::{encode_bytes, quote};

/// A value bound to one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i32),
    Long(i64),
    Double(f64),
    Decimal(Decimal),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Param {
    /// SQL literal text for this value.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(n) => n.to_string(),
            Self::Long(n) => n.to_string(),
            Self::Double(n) => n.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Bool(b) => u8::from(*b).to_string(),
            Self::Text(s) => quote(s),
            Self::Bytes(b) => quote(&encode_bytes(b)),
            Self::Date(d) => quote(&d.format("%Y-%m-%d").to_string()),
            // Times carry the epoch date
            Self::Time(t) => quote(&format!("1970-01-01 {}", t.format("%H:%M:%S"))),
            Self::Timestamp(ts) => quote(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        }
    }
}

impl From<i32> for Param {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<f64> for Param {
    fn from(n: f64) -> Self {
        Self::Double(n)
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Param {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<Self>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Byte offsets of `?` placeholders outside `'...'` literals and `"..."`
/// identifiers. Doubled quotes stay inside their literal.
pub fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote_char: Option<u8> = None;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote_char {
            Some(q) if b == q => {
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote_char = None;
                }
            }
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote_char = Some(b),
            None if b == b'?' => positions.push(i),
            None => {}
        }
        i += 1;
    }
    positions
}

pub struct PreparedStatement {
    statement: Statement,
    sql: String,
    placeholders: Vec<usize>,
    params: Vec<Option<Param>>,
}

impl PreparedStatement {
    pub(crate) fn new(statement: Statement, sql: &str) -> Self {
        let placeholders = placeholder_positions(sql);
        Self {
            statement,
            sql: sql.to_string(),
            params: vec![None; placeholders.len()],
            placeholders,
        }
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Binds the 1-based parameter `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Param>) -> Result<()> {
        let count = self.params.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.params.get_mut(i))
            .ok_or_else(|| {
                FgdbError::InvalidParameter(format!("parameter index {index} out of range (1..={count})"))
            })?;
        *slot = Some(value.into());
        Ok(())
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.set(index, Param::Null)
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.set(index, Param::Int(value))
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> Result<()> {
        self.set(index, Param::Long(value))
    }

    pub fn set_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.set(index, Param::Double(value))
    }

    pub fn set_decimal(&mut self, index: usize, value: Decimal) -> Result<()> {
        self.set(index, Param::Decimal(value))
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.set(index, Param::Bool(value))
    }

    pub fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.set(index, Param::Text(value.to_string()))
    }

    pub fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.set(index, Param::Bytes(value.to_vec()))
    }

    pub fn set_date(&mut self, index: usize, value: NaiveDate) -> Result<()> {
        self.set(index, Param::Date(value))
    }

    pub fn set_time(&mut self, index: usize, value: NaiveTime) -> Result<()> {
        self.set(index, Param::Time(value))
    }

    pub fn set_timestamp(&mut self, index: usize, value: NaiveDateTime) -> Result<()> {
        self.set(index, Param::Timestamp(value))
    }

    pub fn clear_parameters(&mut self) {
        self.params.iter_mut().for_each(|p| *p = None);
    }

    /// SQL text with every placeholder replaced by its bound literal.
    pub fn materialize(&self) -> Result<String> {
        let mut out = String::with_capacity(self.sql.len());
        let mut last = 0;
        for (i, (&pos, param)) in self.placeholders.iter().zip(&self.params).enumerate() {
            let param = param
                .as_ref()
                .ok_or_else(|| FgdbError::InvalidParameter(format!("no value bound for parameter {}", i + 1)))?;
            out.push_str(&self.sql[last..pos]);
            out.push_str(&param.to_sql_literal());
            last = pos + 1;
        }
        out.push_str(&self.sql[last..]);
        Ok(out)
    }

    pub fn execute_query(&mut self) -> Result<ResultSet> {
        let sql = self.materialize()?;
        self.statement.execute_query(&sql)
    }

    pub fn execute_update(&mut self) -> Result<u64> {
        let sql = self.materialize()?;
        self.statement.execute_update(&sql)
    }

    pub fn execute(&mut self) -> Result<bool> {
        let sql = self.materialize()?;
        self.statement.execute(&sql)
    }

    /// Queues the statement with the current parameters.
    pub fn add_batch(&mut self) -> Result<()> {
        let sql = self.materialize()?;
        self.statement.add_batch(&sql)
    }

    pub fn clear_batch(&mut self) {
        self.statement.clear_batch();
    }

    pub fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>> {
        self.statement.execute_batch()
    }

    /// The wrapped plain statement (result set, update count, warnings).
    pub fn statement(&mut self) -> &mut Statement {
        &mut self.statement
    }

    pub fn close(&mut self) {
        self.statement.close();
    }
}
