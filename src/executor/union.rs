/// UNION over a derived table
///
/// `SELECT <items> FROM (<branch> UNION <branch> ...) alias [WHERE ...]`:
/// each branch runs as its own query, rows are merged by position under
/// the first branch's labels and deduplicated, then the restricted WHERE
/// and the outer projection are applied.

use log::debug;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashSet;

use super::join::Source;
use super::planner::UnionPlan;
use super::result::QueryResult;
use super::select::project;
use super::{post_filter, ExecContext, QueryExecutor};
use crate::core::{FgdbError, ResultRow, Result, Value};

/// One cell of a dedup key. Numbers compare by value across Int, Long,
/// Double and Decimal, so `1` from one branch matches `1.0` from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Integer(i64),
    Float(u64),
    Decimal(Decimal),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Int(i) => Self::Integer(i64::from(*i)),
            Value::Long(l) => Self::Integer(*l),
            Value::Double(d) => match Decimal::from_f64(*d) {
                Some(dec) => number(dec),
                None => Self::Float(d.to_bits()),
            },
            Value::Decimal(d) => number(*d),
            Value::Bool(b) => Self::Bool(*b),
            Value::Text(s) => Self::Text(s.clone()),
            Value::Bytes(b) => Self::Bytes(b.clone()),
        }
    }
}

fn number(value: Decimal) -> KeyPart {
    let value = value.normalize();
    match value.to_i64() {
        Some(i) if value.fract().is_zero() => KeyPart::Integer(i),
        _ => KeyPart::Decimal(value),
    }
}

/// Key identifying a row across all `labels`.
pub fn dedup_key(labels: &[String], row: &ResultRow) -> Vec<KeyPart> {
    labels.iter().map(|label| KeyPart::from(&row.value(label))).collect()
}

/// Appends `branch` to `merged`, skipping rows already seen.
fn merge(merged: &mut QueryResult, seen: &mut HashSet<Vec<KeyPart>>, branch: QueryResult) -> Result<()> {
    if branch.columns.len() != merged.columns.len() {
        return Err(FgdbError::Unsupported(format!(
            "UNION branches have {} and {} columns",
            merged.columns.len(),
            branch.columns.len()
        )));
    }
    let labels = merged.labels();
    let branch_labels = branch.labels();
    for row in &branch.rows {
        let aligned: ResultRow = labels
            .iter()
            .cloned()
            .zip(row.values_for(&branch_labels))
            .collect();
        if seen.insert(dedup_key(&labels, &aligned)) {
            merged.rows.push(aligned);
        }
    }
    Ok(())
}

pub fn execute_union(ctx: &mut ExecContext<'_>, plan: &UnionPlan) -> Result<QueryResult> {
    let mut merged: Option<QueryResult> = None;
    let mut seen = HashSet::new();
    for branch in &plan.branches {
        let result = QueryExecutor::query(ctx, branch)?;
        let target = merged.get_or_insert_with(|| QueryResult::new(result.columns.clone(), Vec::new()));
        merge(target, &mut seen, result)?;
    }
    let merged = merged.unwrap_or_default();
    debug!("union merged {} distinct rows from {} branches", merged.len(), plan.branches.len());

    let filtered = match &plan.filter {
        Some(filter) => post_filter::apply(merged, filter, "UNION SELECT")?,
        None => merged,
    };
    let source = Source::from_result("", filtered);
    let picks = source.picks();
    project(&[source], &picks, &plan.items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlType;
    use crate::executor::OutputColumn;

    fn result(label: &str, values: &[Value]) -> QueryResult {
        QueryResult::new(
            vec![OutputColumn::new(label, SqlType::Integer)],
            values
                .iter()
                .map(|v| {
                    let mut row = ResultRow::new();
                    row.insert(label, v.clone());
                    row
                })
                .collect(),
        )
    }

    fn row(values: &[(&str, Value)]) -> ResultRow {
        values.iter().map(|(l, v)| ((*l).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_dedup_key_keeps_null_apart_from_text() {
        let labels = vec!["a".to_string()];
        assert_ne!(
            dedup_key(&labels, &row(&[("a", Value::Null)])),
            dedup_key(&labels, &row(&[("a", Value::from("<null>"))]))
        );
    }

    #[test]
    fn test_dedup_key_keeps_columns_apart() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let left = row(&[("a", Value::from("1|b=2")), ("b", Value::from("3"))]);
        let right = row(&[("a", Value::from("1")), ("b", Value::from("2|b=3"))]);
        assert_ne!(dedup_key(&labels, &left), dedup_key(&labels, &right));
    }

    #[test]
    fn test_dedup_key_matches_numbers_by_value() {
        let labels = vec!["n".to_string()];
        let key = |v: Value| dedup_key(&labels, &row(&[("n", v)]));
        assert_eq!(key(Value::Int(2)), key(Value::Long(2)));
        assert_eq!(key(Value::Int(2)), key(Value::Double(2.0)));
        assert_eq!(key(Value::Double(2.5)), key(Value::Decimal(Decimal::new(250, 2))));
        assert_ne!(key(Value::Int(2)), key(Value::from("2")));
    }

    #[test]
    fn test_merge_aligns_by_position_and_dedups() {
        let mut merged = result("id", &[]);
        let mut seen = HashSet::new();
        merge(&mut merged, &mut seen, result("id", &[Value::Int(1), Value::Int(2), Value::Int(1)])).unwrap();
        merge(&mut merged, &mut seen, result("other", &[Value::Int(2), Value::Int(3), Value::Null])).unwrap();
        let ids: Vec<Value> = merged.rows.iter().map(|r| r.value("id")).collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Null]);
    }

    #[test]
    fn test_merge_rejects_column_count_mismatch() {
        let mut merged = result("id", &[]);
        let wide = QueryResult::new(
            vec![OutputColumn::new("a", SqlType::Integer), OutputColumn::new("b", SqlType::Integer)],
            Vec::new(),
        );
        assert!(merge(&mut merged, &mut HashSet::new(), wide).is_err());
    }
}
