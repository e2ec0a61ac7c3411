/// Query planning
///
/// Turns SELECT text into a `PlannedQuery`. Recognition order:
/// 1. Trailing `LIMIT n [OFFSET m]` or `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
/// 2. Bare `JOIN` rewritten to `LEFT JOIN`
/// 3. `SELECT ... FROM ( <union body> ) alias [WHERE ...]`
/// 4. Single-table fast path, `COUNT(...)` included
/// 5. Grammar fallback for joins and everything else

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::paging::LimitSpec;
use crate::catalog::tables::normalize_identifier;
use crate::core::{FgdbError, Result};
use crate::parser::{self, literal, ColumnRef, Condition, CountTarget, OrderItem, SelectItem, SelectStatement, Statement};

static SELECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*SELECT\s+(.+?)\s+FROM\s+((?:"[^"]+"|[A-Za-z0-9_.$]+))(?:\s+WHERE\s+(.+?))?(?:\s+ORDER\s+BY\s+(.+?))?\s*$"#,
    )
    .expect("valid select regex")
});

static COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^COUNT\s*\(\s*(\*|1|"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)\s*\)\s*$"#).expect("valid count regex")
});

static UNION_SELECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^\s*SELECT\s+(.+?)\s+FROM\s*\((.+)\)\s+(?:"?[A-Za-z_][A-Za-z0-9_$]*"?)\s*(?:WHERE\s+(.+?))?\s*$"#)
        .expect("valid union regex")
});

static LIMIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(.*?)(?:\s+LIMIT\s+(\d+)(?:\s+OFFSET\s+(\d+))?)\s*$").expect("valid limit regex")
});

static FETCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(.*?)(?:\s+OFFSET\s+(\d+)\s+ROWS?\s+FETCH\s+NEXT\s+(\d+)\s+ROWS?\s+ONLY)\s*$")
        .expect("valid fetch regex")
});

static JOIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bJOIN\b").expect("valid join regex"));

static QUALIFIED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)\.("[^"]+"|[A-Za-z_][A-Za-z0-9_$]*)"#)
        .expect("valid qualified identifier regex")
});

/// Join qualifiers that keep a following `JOIN` as written.
const JOIN_QUALIFIERS: [&str; 6] = ["LEFT", "RIGHT", "INNER", "FULL", "CROSS", "OUTER"];

/// Single-table SELECT answered by one engine scan.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Table name as written, resolved at execution.
    pub table: String,
    pub items: Vec<SelectItem>,
    /// Filter text for the engine, qualifiers already stripped.
    pub where_clause: String,
    pub order_by: Vec<OrderItem>,
}

impl QueryPlan {
    /// Columns named by the projection; `*` contributes none.
    pub fn requested_columns(&self) -> Vec<&ColumnRef> {
        self.items
            .iter()
            .filter_map(|item| match item {
                SelectItem::Column { column, .. } => Some(column),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountPlan {
    pub table: String,
    pub target: CountTarget,
    pub where_clause: String,
}

/// SELECT over a parenthesized UNION of branch queries.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionPlan {
    pub items: Vec<SelectItem>,
    pub branches: Vec<String>,
    pub filter: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Select(QueryPlan),
    Count(CountPlan),
    Union(UnionPlan),
    Statement(SelectStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    pub plan: Plan,
    pub limit: Option<LimitSpec>,
}

/// Plans one SELECT.
pub fn plan(sql: &str) -> Result<PlannedQuery> {
    let sql = strip_terminators(sql);
    if sql.is_empty() {
        return Err(FgdbError::Parse("empty query".to_string()));
    }
    let (body, limit) = extract_limit(sql)?;
    let body = rewrite_bare_joins(&body);

    let plan = if let Some(union) = match_union(&body) {
        debug!("union plan with {} branches", union.branches.len());
        Plan::Union(union)
    } else if let Some(fast) = match_single_table(&body) {
        debug!("single-table plan for {body}");
        fast
    } else {
        debug!("grammar plan for {body}");
        Plan::Statement(parse_grammar(&body)?)
    };
    Ok(PlannedQuery { plan, limit })
}

/// Removes trailing semicolons and whitespace.
pub fn strip_terminators(sql: &str) -> &str {
    sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn parse_row_count(text: &str) -> Result<usize> {
    text.parse()
        .map_err(|_| FgdbError::Parse(format!("invalid row count {text}")))
}

/// Splits a trailing paging suffix off `sql`.
pub fn extract_limit(sql: &str) -> Result<(String, Option<LimitSpec>)> {
    if let Some(caps) = LIMIT_RE.captures(sql) {
        let limit = parse_row_count(&caps[2])?;
        let offset = caps.get(3).map(|m| parse_row_count(m.as_str())).transpose()?.unwrap_or(0);
        return Ok((caps[1].trim_end().to_string(), Some(LimitSpec::new(limit, offset))));
    }
    if let Some(caps) = FETCH_RE.captures(sql) {
        let offset = parse_row_count(&caps[2])?;
        let limit = parse_row_count(&caps[3])?;
        return Ok((caps[1].trim_end().to_string(), Some(LimitSpec::new(limit, offset))));
    }
    Ok((sql.to_string(), None))
}

/// Applies `rewrite` to every part of `sql` outside string literals.
fn rewrite_outside_literals(sql: &str, mut rewrite: impl FnMut(&str, &str) -> String) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    for (start, end) in literal::outside_literals(sql) {
        out.push_str(&sql[copied..start]);
        out.push_str(&rewrite(&sql[..start], &sql[start..end]));
        copied = end;
    }
    out.push_str(&sql[copied..]);
    out
}

/// Rewrites `JOIN` without an explicit join type to `LEFT JOIN`.
pub fn rewrite_bare_joins(sql: &str) -> String {
    rewrite_outside_literals(sql, |prefix, segment| {
        let mut out = String::with_capacity(segment.len());
        let mut copied = 0;
        for m in JOIN_RE.find_iter(segment) {
            let before = format!("{prefix}{}", &segment[..m.start()]);
            let previous = before
                .trim_end()
                .rsplit(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .next()
                .unwrap_or_default();
            out.push_str(&segment[copied..m.start()]);
            if !JOIN_QUALIFIERS.iter().any(|q| q.eq_ignore_ascii_case(previous)) {
                out.push_str("LEFT ");
            }
            out.push_str(m.as_str());
            copied = m.end();
        }
        out.push_str(&segment[copied..]);
        out
    })
}

/// Rewrites `t.col` and `"t"."col"` to `"col"` for the engine filter.
pub fn strip_qualifiers(where_clause: &str) -> String {
    rewrite_outside_literals(where_clause, |_, segment| {
        let mut current = segment.to_string();
        loop {
            let next = QUALIFIED_RE
                .replace_all(&current, |caps: &regex::Captures| {
                    format!("\"{}\"", normalize_identifier(&caps[1]))
                })
                .into_owned();
            if next == current {
                return current;
            }
            current = next;
        }
    })
}

/// Splits a union body on ` UNION ` at parenthesis depth zero, outside
/// literals. A leading `ALL` on a branch is dropped.
pub fn split_union(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut branches = Vec::new();
    let mut depth = 0i32;
    let mut in_literal = false;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_literal = !in_literal,
            b'(' if !in_literal => depth += 1,
            b')' if !in_literal => depth -= 1,
            c if !in_literal && depth == 0 && c.is_ascii_whitespace() => {
                let rest = &body[i + 1..];
                let is_union = rest.get(..5).is_some_and(|word| word.eq_ignore_ascii_case("UNION"))
                    && rest.as_bytes().get(5).is_some_and(u8::is_ascii_whitespace);
                if is_union {
                    branches.push(body[start..i].to_string());
                    i += 6;
                    start = i;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    branches.push(body[start..].to_string());

    branches
        .into_iter()
        .map(|branch| {
            let branch = branch.trim();
            match branch.get(..4) {
                Some(all) if all.eq_ignore_ascii_case("ALL ") => branch[4..].trim().to_string(),
                _ => branch.to_string(),
            }
        })
        .filter(|branch| !branch.is_empty())
        .collect()
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut in_literal = false;
    for c in text.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_literal
}

fn match_union(body: &str) -> Option<UnionPlan> {
    let caps = UNION_SELECT_RE.captures(body)?;
    let union_body = caps.get(2)?.as_str();
    if !balanced(union_body) {
        return None;
    }
    let branches = split_union(union_body);
    if branches.is_empty() || !branches.iter().all(|b| b.trim_start().to_uppercase().starts_with("SELECT")) {
        return None;
    }
    let items = parser::parse_select_list(&caps[1]).ok()?;
    let filter = match caps.get(3) {
        Some(m) => Some(parser::parse_condition(m.as_str()).ok()?),
        None => None,
    };
    Some(UnionPlan {
        items,
        branches,
        filter,
    })
}

fn count_target(argument: &str) -> CountTarget {
    match argument {
        "*" | "1" => CountTarget::All,
        column => CountTarget::Column(ColumnRef::bare(normalize_identifier(column))),
    }
}

fn match_single_table(body: &str) -> Option<Plan> {
    let caps = SELECT_RE.captures(body)?;
    let fields = caps.get(1)?.as_str().trim();
    let table = caps.get(2)?.as_str().trim().to_string();
    let where_clause = caps.get(3).map_or(String::new(), |m| strip_qualifiers(m.as_str().trim()));

    if let Some(count) = COUNT_RE.captures(fields) {
        if caps.get(4).is_some() {
            return None;
        }
        return Some(Plan::Count(CountPlan {
            table,
            target: count_target(&count[1]),
            where_clause,
        }));
    }

    let items = parser::parse_select_list(fields).ok()?;
    if items.iter().any(|item| matches!(item, SelectItem::Count { .. })) {
        return None;
    }
    let order_by = match caps.get(4) {
        Some(m) => parser::parse_order_list(m.as_str()).ok()?,
        None => Vec::new(),
    };
    Some(Plan::Select(QueryPlan {
        table,
        items,
        where_clause,
        order_by,
    }))
}

fn parse_grammar(sql: &str) -> Result<SelectStatement> {
    match parser::parse_select(sql) {
        Ok(select) => Ok(select),
        Err(select_error) => match parser::parse_statement(sql) {
            Ok(Statement::Select(select)) => Ok(select),
            Ok(_) => Err(FgdbError::Parse(format!("not a query: {sql}"))),
            Err(_) => Err(FgdbError::Parse(select_error)),
        },
    }
}
