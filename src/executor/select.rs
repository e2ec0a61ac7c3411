/// SELECT execution
///
/// Three entry points share one projection and ordering stage:
/// - `execute_plan`: single-table fast path, filter pushed to the engine
/// - `execute_count`: COUNT over one scan, no row materialization
/// - `execute_statement`: grammar statements (joins, sub-selects)
///
/// Execution order for statements:
/// 1. Materialize every source
/// 2. Nested-loop joins
/// 3. WHERE over the combined rows
/// 4. ORDER BY
/// 5. Projection

use log::debug;
use std::cmp::Ordering;

use super::conditions::ConditionEvaluator;
use super::join::{join_all, locate, validate_condition, value_at, JoinedView, Pick, Source};
use super::planner::{CountPlan, QueryPlan};
use super::result::{OutputColumn, QueryResult};
use super::scan::{load_table, scan_rows, with_retry};
use super::{post_filter, ExecContext};
use crate::catalog::tables::normalize_identifier;
use crate::catalog::type_resolver::type_from_value;
use crate::core::{FgdbError, ResultRow, Result, TableSchema, Value};
use crate::parser::{self, ColumnRef, CountTarget, FromClause, OrderItem, SelectItem, SelectStatement, SortOrder, TableRef};

/// Single-table SELECT with the filter evaluated by the engine.
pub fn execute_plan(ctx: &mut ExecContext<'_>, plan: &QueryPlan) -> Result<QueryResult> {
    let table = ctx.tables.resolve(ctx.session, &plan.table);
    with_retry(ctx, &table, |ctx| {
        let schema = ctx.catalog.table_schema(ctx.session, &table)?;
        let columns = scan_columns(&schema, plan)?;
        let rows = scan_rows(ctx, &schema, &columns, &plan.where_clause)?;
        let sources = [Source::from_table(normalize_identifier(&plan.table), &schema, rows)];
        let mut picks = sources[0].picks();
        order_picks(&sources, &plan.items, &plan.order_by, &mut picks)?;
        project(&sources, &picks, &plan.items)
    })
}

/// Columns the fast path must read, validated against the schema.
/// Empty means every column.
fn scan_columns(schema: &TableSchema, plan: &QueryPlan) -> Result<Vec<String>> {
    let unknown = |c: &ColumnRef| FgdbError::UnknownColumn(c.name.clone());

    if !plan.where_clause.is_empty() {
        if let Ok(condition) = parser::parse_condition(&plan.where_clause) {
            if let Some(missing) = condition.columns().into_iter().find(|c| schema.column(&c.name).is_none()) {
                return Err(unknown(missing));
            }
        }
    }

    let mut columns: Vec<String> = Vec::new();
    let mut add = |name: &str| {
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            columns.push(name.to_string());
        }
    };
    for column in plan.requested_columns() {
        add(&schema.column(&column.name).ok_or_else(|| unknown(column))?.name);
    }
    for item in &plan.order_by {
        match schema.column(&item.column.name) {
            Some(column) => add(&column.name),
            None if alias_target(&plan.items, &item.column).is_some() => {}
            None => return Err(unknown(&item.column)),
        }
    }

    let wildcard = plan
        .items
        .iter()
        .any(|i| matches!(i, SelectItem::Wildcard | SelectItem::QualifiedWildcard(_)));
    Ok(if wildcard { Vec::new() } else { columns })
}

/// COUNT(*) or COUNT(column) over one filtered scan.
pub fn execute_count(ctx: &mut ExecContext<'_>, plan: &CountPlan) -> Result<QueryResult> {
    let table = ctx.tables.resolve(ctx.session, &plan.table);
    with_retry(ctx, &table, |ctx| {
        let schema = ctx.catalog.table_schema(ctx.session, &table)?;
        if !plan.where_clause.is_empty() {
            if let Ok(condition) = parser::parse_condition(&plan.where_clause) {
                if let Some(missing) = condition.columns().into_iter().find(|c| schema.column(&c.name).is_none()) {
                    return Err(FgdbError::UnknownColumn(missing.name.clone()));
                }
            }
        }
        let counted = match &plan.target {
            CountTarget::All => None,
            CountTarget::Column(column) => Some(
                schema
                    .column(&column.name)
                    .ok_or_else(|| FgdbError::UnknownColumn(column.name.clone()))?
                    .name
                    .clone(),
            ),
        };
        let fields = counted.as_ref().map_or_else(|| "*".to_string(), |c| format!("\"{c}\""));

        let mut count = 0u64;
        ctx.session.scan(&schema.table_name, &fields, &plan.where_clause, |engine, row| {
            if let Some(column) = &counted {
                if engine.row_is_null(row, column)? {
                    return Ok(true);
                }
            }
            count += 1;
            Ok(true)
        })?;
        debug!("counted {count} rows in {}", schema.table_name);
        Ok(QueryResult::count("count", count))
    })
}

/// Executes a parsed SELECT statement.
pub fn execute_statement(ctx: &mut ExecContext<'_>, select: &SelectStatement) -> Result<QueryResult> {
    let mut sources = Vec::with_capacity(1 + select.joins.len());
    sources.push(from_source(ctx, &select.from)?);
    for join in &select.joins {
        sources.push(table_source(ctx, &join.table)?);
    }

    let sub_select = matches!(select.from, FromClause::SubSelect { .. }) && select.joins.is_empty();
    if let Some(filter) = &select.filter {
        if sub_select {
            post_filter::ensure_supported(filter, "sub-select")?;
        }
        validate_condition(&sources, filter)?;
    }

    let mut picks = join_all(&sources, &select.joins)?;
    if let Some(filter) = &select.filter {
        let mut kept = Vec::with_capacity(picks.len());
        for pick in picks {
            if ConditionEvaluator::evaluate(&JoinedView::new(&sources, &pick), filter)? {
                kept.push(pick);
            }
        }
        picks = kept;
    }
    order_picks(&sources, &select.items, &select.order_by, &mut picks)?;
    project(&sources, &picks, &select.items)
}

fn from_source(ctx: &mut ExecContext<'_>, from: &FromClause) -> Result<Source> {
    match from {
        FromClause::Table(table) => table_source(ctx, table),
        FromClause::SubSelect { select, alias } => {
            let inner = execute_statement(ctx, select)?;
            Ok(Source::from_result(alias.as_deref().unwrap_or_default(), inner))
        }
    }
}

fn table_source(ctx: &mut ExecContext<'_>, table: &TableRef) -> Result<Source> {
    let resolved = ctx.tables.resolve(ctx.session, &table.name);
    let (schema, rows) = load_table(ctx, &resolved)?;
    Ok(Source::from_table(table.binding(), &schema, rows))
}

/// Column an output alias stands for, if `column` is one.
fn alias_target<'a>(items: &'a [SelectItem], column: &ColumnRef) -> Option<&'a ColumnRef> {
    if column.qualifier.is_some() {
        return None;
    }
    items.iter().find_map(|item| match item {
        SelectItem::Column {
            column: target,
            alias: Some(alias),
        } if alias.eq_ignore_ascii_case(&column.name) => Some(target),
        _ => None,
    })
}

/// Sorts combined rows; keys may name source columns or output aliases.
/// NULL sorts first, numbers by magnitude, everything else as text.
pub fn order_picks(sources: &[Source], items: &[SelectItem], order_by: &[OrderItem], picks: &mut [Pick]) -> Result<()> {
    if order_by.is_empty() {
        return Ok(());
    }
    let mut keys = Vec::with_capacity(order_by.len());
    for item in order_by {
        let column = if locate(sources, &item.column).is_some() {
            &item.column
        } else {
            alias_target(items, &item.column).ok_or_else(|| FgdbError::UnknownColumn(item.column.to_string()))?
        };
        let index = locate(sources, column).ok_or_else(|| FgdbError::UnknownColumn(column.to_string()))?;
        keys.push((index, column.name.clone(), item.order));
    }

    picks.sort_by(|a, b| {
        for (index, name, order) in &keys {
            let ordering = value_at(sources, a, *index, name).sort_cmp(&value_at(sources, b, *index, name));
            let ordering = match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

enum Projected {
    Slot(usize, String),
    Literal(Value),
}

/// Builds the output columns and rows for `items`.
pub fn project(sources: &[Source], picks: &[Pick], items: &[SelectItem]) -> Result<QueryResult> {
    if let [SelectItem::Count { target, alias }] = items {
        let count = match target {
            CountTarget::All => picks.len(),
            CountTarget::Column(column) => {
                let index = locate(sources, column).ok_or_else(|| FgdbError::UnknownColumn(column.to_string()))?;
                picks
                    .iter()
                    .filter(|pick| !value_at(sources, pick, index, &column.name).is_null())
                    .count()
            }
        };
        return Ok(QueryResult::count(alias.as_deref().unwrap_or("count"), count as u64));
    }

    let mut columns: Vec<OutputColumn> = Vec::new();
    let mut projected = Vec::new();
    let push_source = |index: usize, columns: &mut Vec<OutputColumn>, projected: &mut Vec<Projected>| {
        let source = &sources[index];
        for column in &source.columns {
            let taken = columns.iter().any(|c| c.label.eq_ignore_ascii_case(&column.label));
            let label = if taken {
                format!("{}.{}", source.binding, column.label)
            } else {
                column.label.clone()
            };
            columns.push(column.relabeled(label));
            projected.push(Projected::Slot(index, column.label.clone()));
        }
    };

    for item in items {
        match item {
            SelectItem::Wildcard => {
                for index in 0..sources.len() {
                    push_source(index, &mut columns, &mut projected);
                }
            }
            SelectItem::QualifiedWildcard(qualifier) => {
                let index = sources
                    .iter()
                    .position(|s| s.answers(qualifier))
                    .ok_or_else(|| FgdbError::UnknownColumn(format!("{qualifier}.*")))?;
                push_source(index, &mut columns, &mut projected);
            }
            SelectItem::Column { column, alias } => {
                let index = locate(sources, column).ok_or_else(|| FgdbError::UnknownColumn(column.to_string()))?;
                let source_column = sources[index]
                    .column(&column.name)
                    .ok_or_else(|| FgdbError::UnknownColumn(column.to_string()))?;
                let label = alias.clone().unwrap_or_else(|| column.name.clone());
                columns.push(source_column.relabeled(label));
                projected.push(Projected::Slot(index, source_column.label.clone()));
            }
            SelectItem::Literal { value, .. } => {
                columns.push(OutputColumn::new(item.label(), type_from_value(value)));
                projected.push(Projected::Literal(value.clone()));
            }
            SelectItem::Count { .. } => {
                return Err(FgdbError::Unsupported(
                    "COUNT cannot be combined with other select items".to_string(),
                ));
            }
        }
    }

    let rows = picks
        .iter()
        .map(|pick| {
            let mut row = ResultRow::new();
            for (column, source) in columns.iter().zip(&projected) {
                let value = match source {
                    Projected::Slot(index, name) => value_at(sources, pick, *index, name),
                    Projected::Literal(value) => value.clone(),
                };
                row.insert(column.label.clone(), value);
            }
            row
        })
        .collect();
    Ok(QueryResult::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SqlType;
    use crate::parser::parse_select;

    fn people() -> Source {
        let columns = ["id", "name"];
        let data = [(1, Some("ann")), (2, None), (3, Some("bob"))];
        Source {
            binding: "p".to_string(),
            table: "people".to_string(),
            columns: vec![OutputColumn::new("id", SqlType::Integer), OutputColumn::new("name", SqlType::Varchar)],
            rows: data
                .iter()
                .map(|(id, name)| {
                    let mut row = ResultRow::new();
                    row.insert(columns[0], Value::Int(*id));
                    row.insert(columns[1], name.map_or(Value::Null, Value::from));
                    row
                })
                .collect(),
        }
    }

    #[test]
    fn test_order_nulls_first_and_desc() {
        let sources = [people()];
        let select = parse_select("SELECT id FROM people ORDER BY name").unwrap();
        let mut picks = sources[0].picks();
        order_picks(&sources, &select.items, &select.order_by, &mut picks).unwrap();
        assert_eq!(picks, vec![vec![Some(1)], vec![Some(0)], vec![Some(2)]]);

        let select = parse_select("SELECT id AS k FROM people ORDER BY k DESC").unwrap();
        let mut picks = sources[0].picks();
        order_picks(&sources, &select.items, &select.order_by, &mut picks).unwrap();
        assert_eq!(picks, vec![vec![Some(2)], vec![Some(1)], vec![Some(0)]]);
    }

    #[test]
    fn test_project_labels_literals_and_counts() {
        let sources = [people()];
        let picks = sources[0].picks();
        let select = parse_select("SELECT p.id AS key, 'x' AS tag, name FROM people").unwrap();
        let result = project(&sources, &picks, &select.items).unwrap();
        assert_eq!(result.labels(), vec!["key", "tag", "name"]);
        assert_eq!(result.columns[0].sql_type, SqlType::Integer);
        assert_eq!(result.row_values(1), Some(vec![Value::Int(2), Value::from("x"), Value::Null]));

        let select = parse_select("SELECT COUNT(name) AS named FROM people").unwrap();
        let counted = project(&sources, &picks, &select.items).unwrap();
        assert_eq!(counted.labels(), vec!["named"]);
        assert_eq!(counted.row_values(0), Some(vec![Value::Long(2)]));
    }

    #[test]
    fn test_wildcard_disambiguates_duplicate_labels() {
        let mut other = people();
        other.binding = "q".to_string();
        let sources = [people(), other];
        let picks = vec![vec![Some(0), Some(2)]];
        let select = parse_select("SELECT * FROM people").unwrap();
        let result = project(&sources, &picks, &select.items).unwrap();
        assert_eq!(result.labels(), vec!["id", "name", "q.id", "q.name"]);
        assert_eq!(result.row_values(0).unwrap()[2], Value::Int(3));
    }

    #[test]
    fn test_unknown_projection_column() {
        let sources = [people()];
        let select = parse_select("SELECT nope FROM people").unwrap();
        let err = project(&sources, &[], &select.items).unwrap_err();
        assert_eq!(err.to_string(), "unknown column nope");
    }
}
