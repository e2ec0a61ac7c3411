/// JOIN operations
///
/// Every source is materialized before combining; the join itself is a
/// nested loop over row indices. A combined row is a `Pick`: one row index
/// per source, `None` on the null side of an outer join.

use super::conditions::{ColumnLookup, ConditionEvaluator};
use super::result::{OutputColumn, QueryResult};
use crate::core::{FgdbError, ResultRow, Result, TableSchema, Value};
use crate::parser::{ColumnRef, Condition, JoinClause, JoinType};

pub type Pick = Vec<Option<usize>>;

/// A materialized relation taking part in a SELECT.
#[derive(Debug, Clone)]
pub struct Source {
    /// Alias, else the table name.
    pub binding: String,
    pub table: String,
    pub columns: Vec<OutputColumn>,
    pub rows: Vec<ResultRow>,
}

impl Source {
    pub fn from_table(binding: &str, schema: &TableSchema, rows: Vec<ResultRow>) -> Self {
        Self {
            binding: binding.to_string(),
            table: schema.table_name.clone(),
            columns: schema
                .columns
                .iter()
                .map(|c| OutputColumn::from_schema(c.name.clone(), c))
                .collect(),
            rows,
        }
    }

    pub fn from_result(binding: &str, result: QueryResult) -> Self {
        Self {
            binding: binding.to_string(),
            table: binding.to_string(),
            columns: result.columns,
            rows: result.rows,
        }
    }

    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.columns
            .iter()
            .find(|c| c.label == name)
            .or_else(|| self.columns.iter().find(|c| c.label.eq_ignore_ascii_case(name)))
    }

    /// True when `qualifier` names this source.
    pub fn answers(&self, qualifier: &str) -> bool {
        let last = |name: &str| name.rsplit('.').next().unwrap_or_default().to_string();
        [self.binding.as_str(), self.table.as_str()]
            .iter()
            .any(|name| name.eq_ignore_ascii_case(qualifier) || last(name).eq_ignore_ascii_case(qualifier))
    }

    /// Every row, one pick each.
    pub fn picks(&self) -> Vec<Pick> {
        (0..self.rows.len()).map(|r| vec![Some(r)]).collect()
    }
}

/// Index of the first source that has `column`, honoring its qualifier.
pub fn locate(sources: &[Source], column: &ColumnRef) -> Option<usize> {
    sources.iter().position(|s| {
        column.qualifier.as_deref().is_none_or(|q| s.answers(q)) && s.column(&column.name).is_some()
    })
}

/// Fails with the first column of `condition` no source can answer.
pub fn validate_condition(sources: &[Source], condition: &Condition) -> Result<()> {
    match condition.columns().into_iter().find(|c| locate(sources, c).is_none()) {
        Some(missing) => Err(FgdbError::UnknownColumn(missing.to_string())),
        None => Ok(()),
    }
}

/// Value of `column` of source `index` in a combined row.
pub fn value_at(sources: &[Source], pick: &[Option<usize>], index: usize, column: &str) -> Value {
    pick.get(index)
        .copied()
        .flatten()
        .map_or(Value::Null, |r| sources[index].rows[r].value(column))
}

/// One combined row seen through column references.
pub struct JoinedView<'a> {
    sources: &'a [Source],
    pick: &'a [Option<usize>],
}

impl<'a> JoinedView<'a> {
    pub fn new(sources: &'a [Source], pick: &'a [Option<usize>]) -> Self {
        let joined = pick.len().min(sources.len());
        Self {
            sources: &sources[..joined],
            pick,
        }
    }
}

impl ColumnLookup for JoinedView<'_> {
    fn lookup(&self, column: &ColumnRef) -> Option<Value> {
        let index = locate(self.sources, column)?;
        Some(value_at(self.sources, self.pick, index, &column.name))
    }
}

/// Joins `sources` left to right; `joins[i]` brings in `sources[i + 1]`.
pub fn join_all(sources: &[Source], joins: &[JoinClause]) -> Result<Vec<Pick>> {
    let Some(first) = sources.first() else {
        return Ok(Vec::new());
    };
    for (i, join) in joins.iter().enumerate() {
        if let Some(on) = &join.on {
            validate_condition(&sources[..(i + 2).min(sources.len())], on)?;
        }
    }
    let mut picks = first.picks();
    for (i, join) in joins.iter().enumerate() {
        if i + 1 >= sources.len() {
            break;
        }
        picks = join_step(&sources[..=i + 1], picks, join)?;
    }
    Ok(picks)
}

/// Joins the last of `sources` onto `left`.
fn join_step(sources: &[Source], left: Vec<Pick>, join: &JoinClause) -> Result<Vec<Pick>> {
    let right_index = sources.len() - 1;
    let right = &sources[right_index];
    let mut right_matched = vec![false; right.rows.len()];
    let mut out = Vec::new();

    for pick in left {
        let mut matched = false;
        for (r, seen) in right_matched.iter_mut().enumerate() {
            let mut candidate = pick.clone();
            candidate.push(Some(r));
            let keep = match &join.on {
                Some(on) if join.join_type != JoinType::Cross => {
                    ConditionEvaluator::evaluate(&JoinedView::new(sources, &candidate), on)?
                }
                _ => true,
            };
            if keep {
                matched = true;
                *seen = true;
                out.push(candidate);
            }
        }
        if !matched && matches!(join.join_type, JoinType::Left | JoinType::Full) {
            let mut padded = pick;
            padded.push(None);
            out.push(padded);
        }
    }

    if matches!(join.join_type, JoinType::Right | JoinType::Full) {
        for (r, seen) in right_matched.iter().enumerate() {
            if !seen {
                let mut padded = vec![None; right_index];
                padded.push(Some(r));
                out.push(padded);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlType;
    use crate::parser::{parse_condition, TableRef};

    fn source(binding: &str, columns: &[&str], rows: &[&[Value]]) -> Source {
        Source {
            binding: binding.to_string(),
            table: binding.to_string(),
            columns: columns.iter().map(|c| OutputColumn::new(*c, SqlType::Integer)).collect(),
            rows: rows
                .iter()
                .map(|values| {
                    columns
                        .iter()
                        .zip(values.iter())
                        .map(|(c, v)| ((*c).to_string(), v.clone()))
                        .collect()
                })
                .collect(),
        }
    }

    fn join(join_type: JoinType, table: &str, on: &str) -> JoinClause {
        JoinClause {
            join_type,
            table: TableRef {
                name: table.to_string(),
                alias: None,
            },
            on: Some(parse_condition(on).unwrap()),
        }
    }

    fn sample() -> Vec<Source> {
        vec![
            source("a", &["id"], &[&[Value::Int(1)], &[Value::Int(2)], &[Value::Int(3)]]),
            source(
                "b",
                &["a_id", "v"],
                &[&[Value::Int(1), Value::Int(10)], &[Value::Int(1), Value::Int(11)], &[Value::Int(4), Value::Int(40)]],
            ),
        ]
    }

    #[test]
    fn test_inner_join_matches_only() {
        let sources = sample();
        let picks = join_all(&sources, &[join(JoinType::Inner, "b", "a.id = b.a_id")]).unwrap();
        assert_eq!(picks, vec![vec![Some(0), Some(0)], vec![Some(0), Some(1)]]);
    }

    #[test]
    fn test_left_join_pads_unmatched_left_rows() {
        let sources = sample();
        let picks = join_all(&sources, &[join(JoinType::Left, "b", "a.id = b.a_id")]).unwrap();
        assert_eq!(picks.len(), 4);
        assert_eq!(picks[2], vec![Some(1), None]);
        assert_eq!(picks[3], vec![Some(2), None]);
        let view = JoinedView::new(&sources, &picks[2]);
        assert_eq!(view.lookup(&ColumnRef::qualified("b", "v")), Some(Value::Null));
    }

    #[test]
    fn test_right_and_full_joins_keep_unmatched_right_rows() {
        let sources = sample();
        let right = join_all(&sources, &[join(JoinType::Right, "b", "a.id = b.a_id")]).unwrap();
        assert_eq!(right.len(), 3);
        assert_eq!(right[2], vec![None, Some(2)]);

        let full = join_all(&sources, &[join(JoinType::Full, "b", "a.id = b.a_id")]).unwrap();
        assert_eq!(full.len(), 5);
    }

    #[test]
    fn test_cross_join_ignores_condition() {
        let sources = sample();
        let mut cross = join(JoinType::Cross, "b", "a.id = b.a_id");
        cross.on = None;
        assert_eq!(join_all(&sources, &[cross]).unwrap().len(), 9);
    }

    #[test]
    fn test_unknown_join_column_fails_before_joining() {
        let sources = sample();
        let err = join_all(&sources, &[join(JoinType::Inner, "b", "a.id = b.missing")]).unwrap_err();
        assert!(matches!(err, FgdbError::UnknownColumn(ref c) if c == "b.missing"));
    }
}
