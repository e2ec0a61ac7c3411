use log::{debug, warn};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use super::metadata::DatabaseMetadata;
use super::prepared::PreparedStatement;
use super::statement::Statement;
use crate::catalog::{KnownTables, SchemaCatalog, DEFAULT_SAMPLE_ROWS};
use crate::core::{FgdbError, Result, TableSchema};
use crate::engine::{NativeEngine, Session};
use crate::executor::ExecContext;
use crate::transaction::TransactionManager;

/// Options for [`Connection::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Create an empty database when `path` has none.
    pub create_if_missing: bool,
    /// Rows sampled per table when no structured definition exists.
    pub sample_limit: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            create_if_missing: false,
            sample_limit: DEFAULT_SAMPLE_ROWS,
        }
    }
}

/// Everything one connection owns. Statements share it through the
/// connection's `Rc`.
pub(crate) struct ConnectionState {
    session: Session,
    catalog: SchemaCatalog,
    tables: KnownTables,
    transactions: TransactionManager,
    closed: bool,
}

impl ConnectionState {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(FgdbError::Closed("connection"));
        }
        Ok(())
    }

    /// Runs `f` against this connection, collecting read warnings into
    /// `warnings`.
    pub(crate) fn execute<T>(
        &mut self,
        warnings: &mut Vec<String>,
        f: impl FnOnce(&mut ExecContext<'_>) -> Result<T>,
    ) -> Result<T> {
        self.ensure_open()?;
        let mut ctx = ExecContext {
            session: &mut self.session,
            catalog: &mut self.catalog,
            tables: &mut self.tables,
            warnings,
        };
        f(&mut ctx)
    }

    pub(crate) fn known_table_names(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.tables.refresh(&self.session);
        Ok(self.tables.names().to_vec())
    }

    pub(crate) fn table_schema(&mut self, table: &str) -> Result<std::sync::Arc<TableSchema>> {
        self.ensure_open()?;
        let resolved = self.tables.resolve(&self.session, table);
        self.catalog.table_schema(&mut self.session, &resolved)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut outcome = Ok(());
        if self.transactions.is_active() {
            if let Err(e) = self.transactions.rollback(&mut self.session, &mut self.catalog, false) {
                warn!("rollback on close of {} failed: {e}", self.session.path().display());
                outcome = Err(e);
            }
        }
        self.transactions.discard_quietly();
        if let Err(e) = self.session.close() {
            warn!("closing {} failed: {e}", self.session.path().display());
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
        self.catalog.invalidate_all();
        debug!("connection to {} closed", self.session.path().display());
        outcome
    }
}

/// One open geodatabase.
///
/// A connection owns the engine session, the schema cache, the known table
/// list and at most one snapshot transaction. It is single threaded; run
/// several connections for concurrency.
pub struct Connection {
    state: Rc<RefCell<ConnectionState>>,
}

impl Connection {
    /// Opens the database at `path` on `engine`.
    pub fn open(path: impl AsRef<Path>, engine: Box<dyn NativeEngine>, options: ConnectionOptions) -> Result<Self> {
        let path = path.as_ref();
        let session = Session::open(engine, path, options.create_if_missing)?;
        let mut tables = KnownTables::new();
        tables.refresh(&session);
        debug!("opened {} with {} tables", path.display(), tables.names().len());
        Ok(Self {
            state: Rc::new(RefCell::new(ConnectionState {
                session,
                catalog: SchemaCatalog::new(options.sample_limit),
                tables,
                transactions: TransactionManager::new(),
                closed: false,
            })),
        })
    }

    pub fn create_statement(&self) -> Result<Statement> {
        self.state.borrow().ensure_open()?;
        Ok(Statement::new(Rc::clone(&self.state)))
    }

    pub fn prepare_statement(&self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(self.create_statement()?, sql))
    }

    pub fn metadata(&self) -> Result<DatabaseMetadata> {
        self.state.borrow().ensure_open()?;
        Ok(DatabaseMetadata::new(Rc::clone(&self.state)))
    }

    /// Turning autocommit off snapshots the database; turning it back on
    /// commits.
    pub fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let ConnectionState {
            session, transactions, ..
        } = &mut *state;
        transactions.set_auto_commit(session, auto_commit)
    }

    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.state.borrow().transactions.auto_commit()
    }

    /// Keeps the changes of the open transaction. No-op in autocommit.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        state.transactions.commit()
    }

    /// Restores the database to the start of the open transaction. No-op in
    /// autocommit.
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let ConnectionState {
            session,
            catalog,
            tables,
            transactions,
            ..
        } = &mut *state;
        transactions.rollback(session, catalog, true)?;
        tables.clear();
        tables.refresh(session);
        Ok(())
    }

    /// Releases the database. An open transaction is rolled back first; the
    /// handle is released even when that rollback fails. Closing twice is a
    /// no-op.
    pub fn close(&self) -> Result<()> {
        self.state.borrow_mut().close()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Engine spelling of a table name.
    pub fn resolve_table_name(&self, name: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let ConnectionState { session, tables, .. } = &mut *state;
        Ok(tables.resolve(session, name))
    }

    /// Closes and reopens the engine handle and drops every cached schema.
    pub fn reopen_session(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        state.session.reopen()?;
        state.catalog.invalidate_all();
        Ok(())
    }

    pub fn known_table_names(&self) -> Result<Vec<String>> {
        self.state.borrow_mut().known_table_names()
    }

    /// Resolved schema of `table`, from the cache when present.
    pub fn table_schema(&self, table: &str) -> Result<std::sync::Arc<TableSchema>> {
        self.state.borrow_mut().table_schema(table)
    }
}

// The last owner (connection or statement) releases the database.
impl Drop for ConnectionState {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("closing connection on drop failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FileEngine;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> Connection {
        let options = ConnectionOptions {
            create_if_missing: true,
            ..ConnectionOptions::default()
        };
        Connection::open(temp.path().join("conn.gdb"), Box::new(FileEngine::new()), options).unwrap()
    }

    #[test]
    fn test_open_missing_without_create_fails() {
        let temp = TempDir::new().unwrap();
        let result = Connection::open(
            temp.path().join("absent.gdb"),
            Box::new(FileEngine::new()),
            ConnectionOptions::default(),
        );
        assert!(matches!(result, Err(FgdbError::Native(e)) if e.is_not_found()));
    }

    #[test]
    fn test_close_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let conn = open(&temp);
        assert!(!conn.is_closed());
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(matches!(conn.create_statement(), Err(FgdbError::Closed(_))));
    }

    #[test]
    fn test_close_rolls_back_open_transaction() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conn.gdb");
        {
            let conn = open(&temp);
            let mut stmt = conn.create_statement().unwrap();
            stmt.execute_update("CREATE TABLE t (id INTEGER)").unwrap();
            conn.set_auto_commit(false).unwrap();
            stmt.execute_update("INSERT INTO t VALUES (1)").unwrap();
            conn.close().unwrap();
        }
        let conn = Connection::open(&path, Box::new(FileEngine::new()), ConnectionOptions::default()).unwrap();
        let mut rs = conn.create_statement().unwrap().execute_query("SELECT COUNT(*) FROM t").unwrap();
        assert!(rs.next());
        assert_eq!(rs.get_i64(1).unwrap(), 0);
    }

    #[test]
    fn test_resolve_table_name_variants() {
        let temp = TempDir::new().unwrap();
        let conn = open(&temp);
        conn.create_statement()
            .unwrap()
            .execute_update("CREATE TABLE Parcel (OBJECTID INTEGER)")
            .unwrap();
        assert_eq!(conn.resolve_table_name("parcel").unwrap(), "Parcel");
        assert_eq!(conn.resolve_table_name("main.\"PARCEL\"").unwrap(), "Parcel");
        assert_eq!(conn.resolve_table_name("unknown").unwrap(), "unknown");
        assert!(conn.known_table_names().unwrap().contains(&"Parcel".to_string()));
    }

    #[test]
    fn test_reopen_session_drops_cached_schemas() {
        let temp = TempDir::new().unwrap();
        let conn = open(&temp);
        conn.create_statement()
            .unwrap()
            .execute_update("CREATE TABLE t (id INTEGER)")
            .unwrap();
        let first = conn.table_schema("t").unwrap();
        conn.reopen_session().unwrap();
        let second = conn.table_schema("t").unwrap();
        assert!(!std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }
}
