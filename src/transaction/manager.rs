use log::{debug, warn};

use super::snapshot::DirectorySnapshot;
use crate::catalog::SchemaCatalog;
use crate::core::{FgdbError, Result};
use crate::engine::Session;

/// Per-connection transaction state.
///
/// Autocommit is the initial state. Leaving autocommit snapshots the database
/// directory; commit drops the snapshot, rollback restores it. Both return
/// the connection to autocommit.
#[derive(Debug)]
pub struct TransactionManager {
    /// Current transaction ID (None in autocommit)
    tx_id: Option<u64>,
    next_tx_id: u64,
    snapshot: Option<DirectorySnapshot>,
}

impl TransactionManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tx_id: None,
            next_tx_id: 1,
            snapshot: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.tx_id.is_some()
    }

    #[must_use]
    pub const fn auto_commit(&self) -> bool {
        !self.is_active()
    }

    #[must_use]
    pub const fn tx_id(&self) -> Option<u64> {
        self.tx_id
    }

    /// Switches autocommit. Turning it off begins a transaction, turning it
    /// back on commits the open one.
    pub fn set_auto_commit(&mut self, session: &Session, auto_commit: bool) -> Result<()> {
        match (auto_commit, self.is_active()) {
            (false, false) => self.begin(session),
            (true, true) => self.commit(),
            _ => Ok(()),
        }
    }

    /// Snapshots the database and enters the in-transaction state.
    pub fn begin(&mut self, session: &Session) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        let snapshot = DirectorySnapshot::create(session.path()).map_err(|e| {
            FgdbError::Transaction(format!(
                "failed to create transaction snapshot for {}: {e}",
                session.path().display()
            ))
        })?;
        let tx_id = self.next_tx_id;
        self.next_tx_id = tx_id + 1;
        self.tx_id = Some(tx_id);
        self.snapshot = Some(snapshot);
        debug!("transaction {tx_id} started on {}", session.path().display());
        Ok(())
    }

    /// Keeps the changes and drops the snapshot. No-op in autocommit.
    pub fn commit(&mut self) -> Result<()> {
        let Some(tx_id) = self.tx_id else {
            return Ok(());
        };
        if let Some(snapshot) = &self.snapshot {
            snapshot
                .discard()
                .map_err(|e| FgdbError::Transaction(format!("failed to clean up transaction snapshot: {e}")))?;
        }
        self.snapshot = None;
        self.tx_id = None;
        debug!("transaction {tx_id} committed");
        Ok(())
    }

    /// Restores the snapshot taken at begin. No-op in autocommit.
    ///
    /// The database handle is closed before the directory is replaced. With
    /// `reopen` the session is reopened and every cached schema dropped.
    pub fn rollback(&mut self, session: &mut Session, catalog: &mut SchemaCatalog, reopen: bool) -> Result<()> {
        let Some(tx_id) = self.tx_id else {
            return Ok(());
        };
        let Some(snapshot) = self.snapshot.as_ref() else {
            return Err(FgdbError::Transaction("transaction snapshot is missing".to_string()));
        };

        session.close().map_err(rollback_error)?;
        snapshot.restore(session.path()).map_err(rollback_error)?;
        if reopen {
            session.reopen().map_err(rollback_error)?;
            catalog.invalidate_all();
        }
        snapshot.discard().map_err(rollback_error)?;
        self.snapshot = None;
        self.tx_id = None;
        debug!("transaction {tx_id} rolled back");
        Ok(())
    }

    /// Drops a leftover snapshot while the connection closes; failures are
    /// logged only.
    pub fn discard_quietly(&mut self) {
        self.tx_id = None;
        if let Some(snapshot) = self.snapshot.take() {
            let path = snapshot.path().display().to_string();
            if let Err(e) = snapshot.discard() {
                warn!("failed to remove transaction snapshot {path}: {e}");
            }
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn rollback_error(e: impl std::fmt::Display) -> FgdbError {
    FgdbError::Transaction(format!("failed to roll back transaction snapshot: {e}"))
}
