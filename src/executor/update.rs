/// DDL and DML passthrough
///
/// Update statements go to the engine as written; the engine reports no
/// affected-row counts. CREATE TABLE and DROP TABLE are tracked so table
/// resolution and the schema cache stay current.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::planner::strip_terminators;
use super::ExecContext;
use crate::catalog::tables::normalize_identifier;
use crate::core::{FgdbError, Result};

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?("[^"]+"|[A-Za-z0-9_.$]+)"#)
        .expect("valid create table regex")
});

static DROP_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^\s*DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?("[^"]+"|[A-Za-z0-9_.$]+)"#).expect("valid drop table regex")
});

static QUERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^\s*\(?\s*SELECT\b").expect("valid query regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    Created(String),
    Dropped(String),
}

/// Table created or dropped by `sql`, if any.
pub fn detect_table_change(sql: &str) -> Option<TableChange> {
    if let Some(caps) = CREATE_TABLE_RE.captures(sql) {
        return Some(TableChange::Created(normalize_identifier(&caps[1]).to_string()));
    }
    DROP_TABLE_RE
        .captures(sql)
        .map(|caps| TableChange::Dropped(normalize_identifier(&caps[1]).to_string()))
}

/// True when `sql` produces a result set.
pub fn is_query(sql: &str) -> bool {
    QUERY_RE.is_match(sql)
}

pub struct UpdateExecutor;

impl UpdateExecutor {
    /// Runs one DDL/DML statement. Always reports 0 affected rows.
    pub fn execute(ctx: &mut ExecContext<'_>, sql: &str) -> Result<u64> {
        let sql = strip_terminators(sql);
        if sql.is_empty() {
            return Err(FgdbError::Parse("empty statement".to_string()));
        }
        if is_query(sql) {
            return Err(FgdbError::Parse(format!("statement returns a result set: {sql}")));
        }
        ctx.session.exec_sql(sql)?;

        match detect_table_change(sql) {
            Some(TableChange::Created(table)) => {
                debug!("created table {table}");
                ctx.tables.register(&table);
                ctx.catalog.invalidate_table(&table);
            }
            Some(TableChange::Dropped(table)) => {
                debug!("dropped table {table}");
                ctx.tables.forget(&table);
                ctx.catalog.invalidate_table(&table);
            }
            None => {}
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_table_change() {
        assert_eq!(
            detect_table_change("create table \"My Table\" (id INTEGER)"),
            Some(TableChange::Created("My Table".to_string()))
        );
        assert_eq!(
            detect_table_change("DROP TABLE IF EXISTS parcels"),
            Some(TableChange::Dropped("parcels".to_string()))
        );
        assert_eq!(detect_table_change("INSERT INTO parcels VALUES (1)"), None);
    }

    #[test]
    fn test_is_query() {
        assert!(is_query("  select * from t"));
        assert!(is_query("(SELECT 1 FROM t)"));
        assert!(!is_query("INSERT INTO t SELECT"));
        assert!(!is_query("selection"));
    }
}
