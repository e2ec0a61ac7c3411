//! One open database on a native engine, plus scoped table scans that
//! release every handle they acquire.

use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::{DbHandle, NativeEngine, RowHandle};
use crate::core::{FgdbError, Result};

pub struct Session {
    engine: Box<dyn NativeEngine>,
    db: Option<DbHandle>,
    path: PathBuf,
}

impl Session {
    /// Opens `path`, creating the database first when allowed and missing.
    pub fn open(mut engine: Box<dyn NativeEngine>, path: &Path, create_if_missing: bool) -> Result<Self> {
        let db = match engine.open(path) {
            Ok(db) => db,
            Err(e) if e.is_not_found() && create_if_missing => engine.create(path)?,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            engine,
            db: Some(db),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    pub fn db(&self) -> Result<DbHandle> {
        self.db.ok_or(FgdbError::Closed("session"))
    }

    pub fn engine(&self) -> &dyn NativeEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn NativeEngine {
        self.engine.as_mut()
    }

    pub fn exec_sql(&mut self, sql: &str) -> Result<()> {
        let db = self.db()?;
        self.engine.exec_sql(db, sql)?;
        Ok(())
    }

    /// Releases the database handle. Safe to call when already closed.
    pub fn close(&mut self) -> Result<()> {
        if let Some(db) = self.db.take() {
            self.engine.close(db)?;
        }
        Ok(())
    }

    /// Closes and reopens the database at the same path.
    pub fn reopen(&mut self) -> Result<()> {
        if let Some(db) = self.db.take() {
            if let Err(e) = self.engine.close(db) {
                warn!("closing {} before reopen failed: {e}", self.path.display());
            }
        }
        debug!("reopening session on {}", self.path.display());
        self.db = Some(self.engine.open(&self.path)?);
        Ok(())
    }

    pub fn list_table_names(&self) -> Result<Vec<String>> {
        Ok(self.engine.list_table_names(self.db()?)?)
    }

    /// Field names of a table in native order.
    pub fn field_names(&mut self, table: &str) -> Result<Vec<String>> {
        let db = self.db()?;
        let handle = self.engine.open_table(db, table)?;
        let names = self.engine.field_names(handle);
        let closed = self.engine.close_table(db, handle);
        let names = names?;
        closed?;
        Ok(names)
    }

    /// Scans `table`, calling `on_row` for each matching row until it returns
    /// `false`. Rows, the cursor and the table are closed on every path.
    pub fn scan<F>(&mut self, table: &str, fields: &str, where_clause: &str, mut on_row: F) -> Result<()>
    where
        F: FnMut(&dyn NativeEngine, RowHandle) -> Result<bool>,
    {
        let db = self.db()?;
        let engine = self.engine.as_mut();
        let handle = engine.open_table(db, table)?;

        let scanned = (|| -> Result<()> {
            let cursor = engine.search(handle, fields, where_clause)?;
            let fetched = (|| -> Result<()> {
                while let Some(row) = engine.fetch_row(cursor)? {
                    let keep_going = on_row(&*engine, row);
                    let closed = engine.close_row(row);
                    let keep_going = keep_going?;
                    closed?;
                    if !keep_going {
                        break;
                    }
                }
                Ok(())
            })();
            let closed = engine.close_cursor(cursor);
            fetched?;
            closed?;
            Ok(())
        })();

        let closed = engine.close_table(db, handle);
        scanned?;
        closed?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("closing session on {} failed: {e}", self.path.display());
        }
    }
}
