/// Executor module - turns SQL text into engine calls and materialized results
///
/// Structure:
/// - planner: SELECT recognition (fast path, COUNT, UNION, grammar fallback)
/// - scan: typed row reads, not-found retry
/// - conditions: WHERE / ON evaluation
/// - join: materialized sources and nested-loop joins
/// - select: projection, ordering, fast path and statement execution
/// - union: UNION over a derived table
/// - post_filter: restricted filters over materialized results
/// - paging: LIMIT / OFFSET slicing
/// - update: DDL/DML passthrough with table tracking

pub mod conditions;
pub mod join;
pub mod paging;
pub mod planner;
pub mod post_filter;
pub mod result;
pub mod scan;
pub mod select;
pub mod union;
pub mod update;

pub use conditions::{ColumnLookup, ConditionEvaluator};
pub use paging::LimitSpec;
pub use planner::{plan, Plan, PlannedQuery};
pub use result::{OutputColumn, QueryResult};
pub use update::UpdateExecutor;

use crate::catalog::{KnownTables, SchemaCatalog};
use crate::core::Result;
use crate::engine::Session;

/// Connection state one statement executes against.
pub struct ExecContext<'a> {
    pub session: &'a mut Session,
    pub catalog: &'a mut SchemaCatalog,
    pub tables: &'a mut KnownTables,
    /// Non-fatal problems met while reading rows.
    pub warnings: &'a mut Vec<String>,
}

pub struct QueryExecutor;

impl QueryExecutor {
    /// Main SELECT dispatcher
    ///
    /// Plans `sql`, runs the plan, then applies any LIMIT/OFFSET to the
    /// fully materialized result.
    pub fn query(ctx: &mut ExecContext<'_>, sql: &str) -> Result<QueryResult> {
        let planned = planner::plan(sql)?;
        let result = match &planned.plan {
            Plan::Select(plan) => select::execute_plan(ctx, plan)?,
            Plan::Count(plan) => select::execute_count(ctx, plan)?,
            Plan::Union(plan) => union::execute_union(ctx, plan)?,
            Plan::Statement(statement) => select::execute_statement(ctx, statement)?,
        };
        Ok(match planned.limit {
            Some(limit) => limit.apply(result),
            None => result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FgdbError, Value};
    use crate::engine::FileEngine;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        session: Session,
        catalog: SchemaCatalog,
        tables: KnownTables,
        warnings: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let session = Session::open(Box::new(FileEngine::new()), &temp.path().join("exec.gdb"), true).unwrap();
            Self {
                _temp: temp,
                session,
                catalog: SchemaCatalog::default(),
                tables: KnownTables::new(),
                warnings: Vec::new(),
            }
        }

        fn ctx(&mut self) -> ExecContext<'_> {
            ExecContext {
                session: &mut self.session,
                catalog: &mut self.catalog,
                tables: &mut self.tables,
                warnings: &mut self.warnings,
            }
        }

        fn update(&mut self, sql: &str) {
            UpdateExecutor::execute(&mut self.ctx(), sql).unwrap();
        }

        fn query(&mut self, sql: &str) -> Result<QueryResult> {
            QueryExecutor::query(&mut self.ctx(), sql)
        }

        fn column(&mut self, sql: &str, label: &str) -> Vec<Value> {
            self.query(sql).unwrap().rows.iter().map(|r| r.value(label)).collect()
        }
    }

    fn seeded() -> Fixture {
        let mut f = Fixture::new();
        f.update("CREATE TABLE owners (OBJECTID INTEGER, name VARCHAR(40))");
        f.update("CREATE TABLE parcels (OBJECTID INTEGER, owner_id INTEGER, kind VARCHAR(10), area DOUBLE)");
        f.update("INSERT INTO owners VALUES (1, 'ann'), (2, 'bob'), (3, 'cyd')");
        f.update("INSERT INTO parcels VALUES (10, 1, 'a', 2.5), (11, 1, 'b', 1.0), (12, 2, 'a', NULL), (13, 9, NULL, 4.0)");
        f
    }

    #[test]
    fn test_fast_path_filter_order_and_projection() {
        let mut f = seeded();
        let result = f
            .query("SELECT OBJECTID AS id, area FROM Parcels WHERE parcels.kind = 'a' ORDER BY area DESC")
            .unwrap();
        assert_eq!(result.labels(), vec!["id", "area"]);
        assert_eq!(result.row_values(0), Some(vec![Value::Int(10), Value::Double(2.5)]));
        assert_eq!(result.row_values(1), Some(vec![Value::Int(12), Value::Null]));
    }

    #[test]
    fn test_count_with_filter_and_column() {
        let mut f = seeded();
        assert_eq!(f.column("SELECT COUNT(*) FROM parcels", "count"), vec![Value::Long(4)]);
        assert_eq!(f.column("SELECT COUNT(kind) FROM parcels", "count"), vec![Value::Long(3)]);
        assert_eq!(
            f.column("SELECT count(1) FROM parcels WHERE owner_id = 1;", "count"),
            vec![Value::Long(2)]
        );
    }

    #[test]
    fn test_bare_join_keeps_unmatched_rows() {
        let mut f = seeded();
        let result = f
            .query("SELECT p.OBJECTID, o.name FROM parcels p JOIN owners o ON p.owner_id = o.OBJECTID ORDER BY p.OBJECTID")
            .unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.rows[3].value("name"), Value::Null);
        assert_eq!(result.rows[0].value("name"), Value::from("ann"));
    }

    #[test]
    fn test_inner_join_with_where_after_join() {
        let mut f = seeded();
        let names = f.column(
            "SELECT o.name FROM owners o INNER JOIN parcels p ON o.OBJECTID = p.owner_id WHERE p.kind = 'a' ORDER BY o.name",
            "name",
        );
        assert_eq!(names, vec![Value::from("ann"), Value::from("bob")]);
    }

    #[test]
    fn test_union_dedups_and_filters() {
        let mut f = seeded();
        let sql = "SELECT owner_id FROM (SELECT owner_id FROM parcels UNION SELECT OBJECTID FROM owners) u";
        let mut ids = f.column(sql, "owner_id");
        ids.sort_by(Value::sort_cmp);
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(9)]);

        let filtered = f.column(
            "SELECT kind FROM (SELECT kind FROM parcels UNION ALL SELECT kind FROM parcels) u WHERE kind = 'a'",
            "kind",
        );
        assert_eq!(filtered, vec![Value::from("a")]);

        let err = f
            .query("SELECT kind FROM (SELECT kind FROM parcels UNION SELECT name FROM owners) u WHERE kind LIKE 'a%'")
            .unwrap_err();
        assert!(matches!(err, FgdbError::Unsupported(_)));
    }

    #[test]
    fn test_limit_and_fetch_paging() {
        let mut f = seeded();
        let ids = f.column("SELECT OBJECTID FROM parcels ORDER BY OBJECTID LIMIT 2 OFFSET 1", "OBJECTID");
        assert_eq!(ids, vec![Value::Int(11), Value::Int(12)]);
        let ids = f.column(
            "SELECT OBJECTID FROM parcels ORDER BY OBJECTID OFFSET 3 ROWS FETCH NEXT 5 ROWS ONLY",
            "OBJECTID",
        );
        assert_eq!(ids, vec![Value::Int(13)]);
        let result = f.query("SELECT * FROM parcels LIMIT 3 OFFSET 10").unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns.len(), 4);
    }

    #[test]
    fn test_unknown_column_names_the_column() {
        let mut f = seeded();
        for sql in [
            "SELECT missing_col FROM parcels",
            "SELECT * FROM parcels WHERE missing_col = 1",
            "SELECT COUNT(missing_col) FROM parcels",
            "SELECT p.missing_col FROM parcels p JOIN owners o ON p.owner_id = o.OBJECTID",
        ] {
            let err = f.query(sql).unwrap_err();
            assert!(err.to_string().contains("missing_col"), "{sql}: {err}");
        }
    }

    #[test]
    fn test_drop_table_forgets_and_query_fails() {
        let mut f = seeded();
        f.update("DROP TABLE owners");
        assert!(!f.tables.contains("owners"));
        let err = f.query("SELECT * FROM owners").unwrap_err();
        assert!(matches!(err, FgdbError::TableNotFound(_)));
    }
}
