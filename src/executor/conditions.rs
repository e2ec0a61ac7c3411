/// Condition evaluation for WHERE and ON clauses
///
/// This module handles evaluation of SQL conditions against any row shape
/// that can resolve a column reference: stored engine rows, materialized
/// result rows, and joined rows.
/// Supports: =, !=, >, <, >=, <=, BETWEEN, LIKE, IN, IS NULL, AND, OR operators.

use std::cmp::Ordering;

use crate::core::{FgdbError, ResultRow, Value};
use crate::parser::{ColumnRef, Condition, Operand};

/// Resolves column references against one row.
pub trait ColumnLookup {
    /// `None` when the row has no such column.
    fn lookup(&self, column: &ColumnRef) -> Option<Value>;
}

impl ColumnLookup for ResultRow {
    fn lookup(&self, column: &ColumnRef) -> Option<Value> {
        self.get(&column.name).cloned()
    }
}

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate condition against a row
    pub fn evaluate<R: ColumnLookup + ?Sized>(row: &R, condition: &Condition) -> Result<bool, FgdbError> {
        match condition {
            Condition::Equals(col, rhs) => {
                let (left, right) = Self::operands(row, col, rhs)?;
                Ok(left.sql_eq(&right))
            }
            Condition::NotEquals(col, rhs) => {
                let (left, right) = Self::operands(row, col, rhs)?;
                Ok(!left.is_null() && !right.is_null() && !left.sql_eq(&right))
            }
            Condition::GreaterThan(col, rhs) => {
                let (left, right) = Self::operands(row, col, rhs)?;
                Ok(Self::compare(&left, &right) == Some(Ordering::Greater))
            }
            Condition::LessThan(col, rhs) => {
                let (left, right) = Self::operands(row, col, rhs)?;
                Ok(Self::compare(&left, &right) == Some(Ordering::Less))
            }
            Condition::GreaterThanOrEqual(col, rhs) => {
                let (left, right) = Self::operands(row, col, rhs)?;
                Ok(matches!(Self::compare(&left, &right), Some(Ordering::Greater | Ordering::Equal)))
            }
            Condition::LessThanOrEqual(col, rhs) => {
                let (left, right) = Self::operands(row, col, rhs)?;
                Ok(matches!(Self::compare(&left, &right), Some(Ordering::Less | Ordering::Equal)))
            }
            Condition::Between(col, low, high) => {
                let val = Self::column(row, col)?;
                let ge_low = matches!(Self::compare(&val, low), Some(Ordering::Greater | Ordering::Equal));
                let le_high = matches!(Self::compare(&val, high), Some(Ordering::Less | Ordering::Equal));
                Ok(ge_low && le_high)
            }
            Condition::Like(col, pattern) => {
                let val = Self::column(row, col)?;
                Ok(Self::match_like(&val, pattern))
            }
            Condition::In(col, values) => {
                let val = Self::column(row, col)?;
                Ok(values.iter().any(|v| val.sql_eq(v)))
            }
            Condition::IsNull(col) => Ok(Self::column(row, col)?.is_null()),
            Condition::IsNotNull(col) => Ok(!Self::column(row, col)?.is_null()),
            Condition::And(left, right) => {
                let left_result = Self::evaluate(row, left)?;
                let right_result = Self::evaluate(row, right)?;
                Ok(left_result && right_result)
            }
            Condition::Or(left, right) => {
                let left_result = Self::evaluate(row, left)?;
                let right_result = Self::evaluate(row, right)?;
                Ok(left_result || right_result)
            }
        }
    }

    fn column<R: ColumnLookup + ?Sized>(row: &R, col: &ColumnRef) -> Result<Value, FgdbError> {
        row.lookup(col)
            .ok_or_else(|| FgdbError::UnknownColumn(col.to_string()))
    }

    fn operands<R: ColumnLookup + ?Sized>(
        row: &R,
        col: &ColumnRef,
        rhs: &Operand,
    ) -> Result<(Value, Value), FgdbError> {
        let left = Self::column(row, col)?;
        let right = match rhs {
            Operand::Literal(v) => v.clone(),
            Operand::Column(other) => Self::column(row, other)?,
        };
        Ok((left, right))
    }

    /// Ordering of two non-null values; NULL compares to nothing.
    fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        if a.is_null() || b.is_null() {
            return None;
        }
        Some(a.sort_cmp(b))
    }

    fn match_like(value: &Value, pattern: &str) -> bool {
        match value {
            Value::Null | Value::Bytes(_) => false,
            Value::Text(text) => like_matches(text, pattern),
            other => like_matches(&other.to_string(), pattern),
        }
    }
}

/// LIKE pattern matching
/// % matches zero or more characters
/// _ matches exactly one character
pub fn like_matches(text: &str, pattern: &str) -> bool {
    let text_chars: Vec<char> = text.chars().collect();
    let pattern_chars: Vec<char> = pattern.chars().collect();

    match_recursive(&text_chars, &pattern_chars, 0, 0)
}

fn match_recursive(text: &[char], pattern: &[char], ti: usize, pi: usize) -> bool {
    // Both exhausted - match
    if pi >= pattern.len() && ti >= text.len() {
        return true;
    }

    // Pattern exhausted but text remains - no match
    if pi >= pattern.len() {
        return false;
    }

    if pattern[pi] == '%' {
        // % can match zero characters
        if match_recursive(text, pattern, ti, pi + 1) {
            return true;
        }
        // % can match one or more characters
        return ti < text.len() && match_recursive(text, pattern, ti + 1, pi);
    }

    if ti >= text.len() {
        return false;
    }

    if pattern[pi] == '_' || text[ti] == pattern[pi] {
        return match_recursive(text, pattern, ti + 1, pi + 1);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_condition;

    fn test_row() -> ResultRow {
        let mut row = ResultRow::new();
        row.insert("id", Value::Int(1));
        row.insert("name", Value::Text("Alice".to_string()));
        row.insert("age", Value::Long(30));
        row.insert("score", Value::Double(2.5));
        row.insert("nickname", Value::Null);
        row
    }

    fn eval(sql: &str) -> bool {
        let cond = parse_condition(sql).unwrap();
        ConditionEvaluator::evaluate(&test_row(), &cond).unwrap()
    }

    #[test]
    fn test_equals_across_numeric_types() {
        assert!(eval("age = 30"));
        assert!(eval("score = 2.5"));
        assert!(!eval("id = 2"));
    }

    #[test]
    fn test_comparisons() {
        assert!(eval("age > 25 AND age < 35"));
        assert!(eval("age >= 30 AND age <= 30"));
        assert!(eval("age BETWEEN 18 AND 65"));
        assert!(!eval("age BETWEEN 31 AND 65"));
    }

    #[test]
    fn test_null_never_compares() {
        assert!(!eval("nickname = 'x'"));
        assert!(!eval("nickname <> 'x'"));
        assert!(eval("nickname IS NULL"));
        assert!(eval("name IS NOT NULL"));
    }

    #[test]
    fn test_in_and_or() {
        assert!(eval("id IN (3, 2, 1)"));
        assert!(eval("name = 'Bob' OR name = 'Alice'"));
        assert!(!eval("name = 'Bob' OR id = 5"));
    }

    #[test]
    fn test_column_to_column_comparison() {
        assert!(eval("age > id"));
    }

    #[test]
    fn test_like_patterns() {
        assert!(like_matches("Alice", "A%"));
        assert!(like_matches("Alice", "_lic_"));
        assert!(like_matches("GDB_Items", "GDB%"));
        assert!(!like_matches("Alice", "a%"));
        assert!(eval("name LIKE '%ice'"));
    }

    #[test]
    fn test_unknown_column_is_error() {
        let cond = parse_condition("missing = 1").unwrap();
        let err = ConditionEvaluator::evaluate(&test_row(), &cond).unwrap_err();
        assert_eq!(err.to_string(), "unknown column missing");
    }
}
