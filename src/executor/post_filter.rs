/// Filters over already materialized results
///
/// Only conjunctions of `column = literal` and `column IS NULL` are
/// accepted here. Anything else fails instead of matching every row.

use super::conditions::ConditionEvaluator;
use super::result::QueryResult;
use crate::core::{FgdbError, Result};
use crate::parser::{Condition, Operand};

fn describe(condition: &Condition) -> String {
    match condition {
        Condition::Equals(c, Operand::Column(other)) => format!("{c} = {other}"),
        Condition::Equals(c, Operand::Literal(v)) => format!("{c} = {v}"),
        Condition::NotEquals(c, _) => format!("{c} <>"),
        Condition::GreaterThan(c, _) => format!("{c} >"),
        Condition::LessThan(c, _) => format!("{c} <"),
        Condition::GreaterThanOrEqual(c, _) => format!("{c} >="),
        Condition::LessThanOrEqual(c, _) => format!("{c} <="),
        Condition::Between(c, _, _) => format!("{c} BETWEEN"),
        Condition::Like(c, pattern) => format!("{c} LIKE '{pattern}'"),
        Condition::In(c, _) => format!("{c} IN"),
        Condition::IsNull(c) => format!("{c} IS NULL"),
        Condition::IsNotNull(c) => format!("{c} IS NOT NULL"),
        Condition::And(..) => "AND".to_string(),
        Condition::Or(..) => "OR".to_string(),
    }
}

/// Fails on the first term that is not `column = literal` or `column IS NULL`.
pub fn ensure_supported(condition: &Condition, context: &str) -> Result<()> {
    for term in condition.conjuncts() {
        match term {
            Condition::Equals(_, Operand::Literal(_)) | Condition::IsNull(_) => {}
            other => {
                return Err(FgdbError::Unsupported(format!(
                    "unsupported WHERE condition in {context}: {}",
                    describe(other)
                )));
            }
        }
    }
    Ok(())
}

/// Keeps the rows of `result` matching `condition`.
pub fn apply(result: QueryResult, condition: &Condition, context: &str) -> Result<QueryResult> {
    ensure_supported(condition, context)?;
    if let Some(missing) = condition
        .columns()
        .into_iter()
        .find(|c| result.column_index(&c.name).is_none())
    {
        return Err(FgdbError::UnknownColumn(missing.to_string()));
    }

    let QueryResult { columns, rows } = result;
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if ConditionEvaluator::evaluate(&row, condition)? {
            kept.push(row);
        }
    }
    Ok(QueryResult::new(columns, kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResultRow, SqlType, Value};
    use crate::executor::OutputColumn;
    use crate::parser::parse_condition;

    fn result() -> QueryResult {
        let rows = [("a", Some(1)), ("b", None), ("a", None)]
            .iter()
            .map(|(kind, n)| {
                let mut row = ResultRow::new();
                row.insert("kind", Value::from(*kind));
                row.insert("n", n.map_or(Value::Null, Value::Int));
                row
            })
            .collect();
        QueryResult::new(
            vec![OutputColumn::new("kind", SqlType::Varchar), OutputColumn::new("n", SqlType::Integer)],
            rows,
        )
    }

    #[test]
    fn test_equality_and_is_null_conjunction() {
        let condition = parse_condition("kind = 'a' AND n IS NULL").unwrap();
        let filtered = apply(result(), &condition, "UNION SELECT").unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0].value("kind"), Value::from("a"));
    }

    #[test]
    fn test_other_operators_are_rejected() {
        for sql in ["n > 0", "kind = 'a' OR kind = 'b'", "kind LIKE 'a%'", "kind = n"] {
            let condition = parse_condition(sql).unwrap();
            let err = apply(result(), &condition, "UNION SELECT").unwrap_err();
            assert!(
                err.to_string().contains("unsupported WHERE condition in UNION SELECT"),
                "{sql}: {err}"
            );
        }
    }

    #[test]
    fn test_unknown_filter_column() {
        let condition = parse_condition("missing = 1").unwrap();
        assert!(matches!(apply(result(), &condition, "UNION SELECT"), Err(FgdbError::UnknownColumn(_))));
    }
}
