/// Plain SQL statements and batches
///
/// A statement runs against its connection's shared state:
/// 1. `execute_query` plans and materializes a SELECT
/// 2. `execute_update` passes DDL/DML to the engine
/// 3. `execute_batch` runs queued updates in order, stopping at the first failure
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

use super::connection::ConnectionState;
use super::result_set::ResultSet;
use crate::core::{BatchOutcome, FgdbError, Result};
use crate::executor::planner::strip_terminators;
use crate::executor::update::is_query;
use crate::executor::{QueryExecutor, UpdateExecutor};

pub struct Statement {
    conn: Rc<RefCell<ConnectionState>>,
    batch: Vec<String>,
    result_set: Option<ResultSet>,
    update_count: Option<u64>,
    warnings: Vec<String>,
    closed: bool,
}

impl Statement {
    pub(crate) const fn new(conn: Rc<RefCell<ConnectionState>>) -> Self {
        Self {
            conn,
            batch: Vec::new(),
            result_set: None,
            update_count: None,
            warnings: Vec::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(FgdbError::Closed("statement"));
        }
        Ok(())
    }

    /// Runs a SELECT and returns its fully materialized rows.
    pub fn execute_query(&mut self, sql: &str) -> Result<ResultSet> {
        self.ensure_open()?;
        self.result_set = None;
        self.update_count = None;
        let result = self
            .conn
            .borrow_mut()
            .execute(&mut self.warnings, |ctx| QueryExecutor::query(ctx, sql))?;
        Ok(ResultSet::new(result))
    }

    /// Runs DDL or DML. The engine reports no affected-row counts, so the
    /// result is always 0.
    pub fn execute_update(&mut self, sql: &str) -> Result<u64> {
        self.ensure_open()?;
        self.result_set = None;
        let count = self
            .conn
            .borrow_mut()
            .execute(&mut self.warnings, |ctx| UpdateExecutor::execute(ctx, sql))?;
        self.update_count = Some(count);
        Ok(count)
    }

    /// Runs any statement. True when it produced a result set, available
    /// through [`Statement::result_set`]; otherwise the count is in
    /// [`Statement::update_count`].
    pub fn execute(&mut self, sql: &str) -> Result<bool> {
        if is_query(sql) {
            let rs = self.execute_query(sql)?;
            self.result_set = Some(rs);
            Ok(true)
        } else {
            self.execute_update(sql)?;
            Ok(false)
        }
    }

    /// Result set of the last `execute`, if it produced one.
    pub fn result_set(&mut self) -> Option<&mut ResultSet> {
        self.result_set.as_mut()
    }

    #[must_use]
    pub const fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    pub fn add_batch(&mut self, sql: &str) -> Result<()> {
        self.ensure_open()?;
        let sql = strip_terminators(sql);
        if sql.is_empty() {
            return Err(FgdbError::Parse("empty SQL statement".to_string()));
        }
        self.batch.push(sql.to_string());
        Ok(())
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Runs and clears the queued statements.
    ///
    /// Each success records [`BatchOutcome::SuccessNoInfo`]. The first failure
    /// stops the batch; the error carries its 1-based index and the outcomes
    /// of the statements before it, whose effects stay applied.
    pub fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>> {
        self.ensure_open()?;
        let pending = std::mem::take(&mut self.batch);
        let mut update_counts = Vec::with_capacity(pending.len());
        for (i, sql) in pending.iter().enumerate() {
            if let Err(e) = self.execute_update(sql) {
                debug!("batch stopped at statement {} of {}", i + 1, pending.len());
                return Err(FgdbError::Batch {
                    index: i + 1,
                    message: e.to_string(),
                    update_counts,
                });
            }
            update_counts.push(BatchOutcome::SuccessNoInfo);
        }
        self.update_count = None;
        Ok(update_counts)
    }

    /// Queued batch statements.
    #[must_use]
    pub fn batch(&self) -> &[String] {
        &self.batch
    }

    /// Non-fatal problems met while reading rows, oldest first.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.batch.clear();
        self.result_set = None;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Connection, ConnectionOptions};
    use crate::engine::FileEngine;
    use tempfile::TempDir;

    fn connect(temp: &TempDir) -> Connection {
        let options = ConnectionOptions {
            create_if_missing: true,
            ..ConnectionOptions::default()
        };
        Connection::open(temp.path().join("stmt.gdb"), Box::new(FileEngine::new()), options).unwrap()
    }

    fn count(stmt: &mut Statement, table: &str) -> i64 {
        let mut rs = stmt.execute_query(&format!("SELECT COUNT(*) FROM {table}")).unwrap();
        assert!(rs.next());
        rs.get_i64(1).unwrap()
    }

    #[test]
    fn test_execute_reports_result_kind() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let mut stmt = conn.create_statement().unwrap();
        assert!(!stmt.execute("CREATE TABLE t (id INTEGER)").unwrap());
        assert_eq!(stmt.update_count(), Some(0));
        assert!(stmt.result_set().is_none());

        assert!(stmt.execute("  select * from t").unwrap());
        assert_eq!(stmt.update_count(), None);
        let rs = stmt.result_set().unwrap();
        assert!(!rs.next());
    }

    #[test]
    fn test_update_rejects_queries() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_update("CREATE TABLE t (id INTEGER)").unwrap();
        assert!(matches!(stmt.execute_update("SELECT * FROM t"), Err(FgdbError::Parse(_))));
    }

    #[test]
    fn test_batch_success_and_partial_failure() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let mut stmt = conn.create_statement().unwrap();
        stmt.execute_update("CREATE TABLE t (id INTEGER, label VARCHAR(20))").unwrap();

        stmt.add_batch("INSERT INTO t VALUES (1, 'first')").unwrap();
        stmt.add_batch("INSERT INTO t VALUES (2, 'second');").unwrap();
        let outcomes = stmt.execute_batch().unwrap();
        assert_eq!(outcomes, vec![BatchOutcome::SuccessNoInfo; 2]);
        assert!(stmt.batch().is_empty());
        assert_eq!(count(&mut stmt, "t"), 2);

        stmt.add_batch("INSERT INTO t VALUES (3, 'third')").unwrap();
        stmt.add_batch("INSERT INTO missing_table VALUES (4, 'x')").unwrap();
        stmt.add_batch("INSERT INTO t VALUES (5, 'never')").unwrap();
        match stmt.execute_batch() {
            Err(FgdbError::Batch {
                index, update_counts, ..
            }) => {
                assert_eq!(index, 2);
                assert_eq!(update_counts, vec![BatchOutcome::SuccessNoInfo]);
            }
            other => panic!("expected batch error, got {other:?}"),
        }
        assert_eq!(count(&mut stmt, "t"), 3);
    }

    #[test]
    fn test_empty_batch_entry_rejected() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let mut stmt = conn.create_statement().unwrap();
        assert!(stmt.add_batch(" ; ").is_err());
        stmt.add_batch("DROP TABLE t").unwrap();
        stmt.clear_batch();
        assert!(stmt.execute_batch().unwrap().is_empty());
    }

    #[test]
    fn test_closed_statement_and_connection() {
        let temp = TempDir::new().unwrap();
        let conn = connect(&temp);
        let mut stmt = conn.create_statement().unwrap();
        stmt.close();
        assert!(matches!(stmt.execute_update("CREATE TABLE t (id INTEGER)"), Err(FgdbError::Closed("statement"))));

        let mut other = conn.create_statement().unwrap();
        conn.close().unwrap();
        assert!(matches!(
            other.execute_update("CREATE TABLE t (id INTEGER)"),
            Err(FgdbError::Closed("connection"))
        ));
    }
}
