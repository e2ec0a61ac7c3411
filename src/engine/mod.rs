//! Native geodatabase engine boundary.
//!
//! The engine only knows whole-table scans with a single filter string and
//! handle-based field access. [`NativeEngine`] is the seam the client layer
//! is written against; [`FileEngine`] is a directory-backed implementation.

pub mod error;
pub mod file_engine;
pub mod session;
pub mod store;

pub use error::{EngineError, EngineErrorKind, EngineResult};
pub use file_engine::FileEngine;
pub use session::Session;
pub use store::{FEATURE_CLASS_ITEM_TYPE, ITEMS_TABLE, ITEM_RELATIONSHIPS_TABLE};

use std::path::Path;

macro_rules! handle_type {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )*
    };
}

handle_type!(
    /// Open database.
    DbHandle,
    /// Open table of a database.
    TableHandle,
    /// Scan cursor over one table.
    CursorHandle,
    /// Row fetched from a cursor; valid until closed.
    RowHandle,
);

/// Relationship class definition passed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelationshipClass {
    pub name: String,
    pub origin_table: String,
    pub destination_table: String,
    pub origin_pk: String,
    pub origin_fk: String,
    pub forward_label: String,
    pub backward_label: String,
    pub cardinality: String,
    pub composite: bool,
    pub attributed: bool,
}

/// Handle-based native engine interface.
///
/// Every table, cursor and row handle obtained from the engine must be
/// released through the matching close call on every exit path.
pub trait NativeEngine {
    fn open(&mut self, path: &Path) -> EngineResult<DbHandle>;
    fn create(&mut self, path: &Path) -> EngineResult<DbHandle>;
    fn close(&mut self, db: DbHandle) -> EngineResult<()>;

    /// Executes DDL/DML text; the engine reports no affected-row counts.
    fn exec_sql(&mut self, db: DbHandle, sql: &str) -> EngineResult<()>;

    fn open_table(&mut self, db: DbHandle, name: &str) -> EngineResult<TableHandle>;
    fn close_table(&mut self, db: DbHandle, table: TableHandle) -> EngineResult<()>;
    /// Field names in the table's native order.
    fn field_names(&self, table: TableHandle) -> EngineResult<Vec<String>>;

    /// Starts a scan. `fields` is a comma separated list or `*`; an empty
    /// `where_clause` matches every row.
    fn search(&mut self, table: TableHandle, fields: &str, where_clause: &str) -> EngineResult<CursorHandle>;
    /// Next row of the scan, `None` once exhausted.
    fn fetch_row(&mut self, cursor: CursorHandle) -> EngineResult<Option<RowHandle>>;
    fn close_row(&mut self, row: RowHandle) -> EngineResult<()>;
    fn close_cursor(&mut self, cursor: CursorHandle) -> EngineResult<()>;

    fn row_is_null(&self, row: RowHandle, column: &str) -> EngineResult<bool>;
    fn row_get_string(&self, row: RowHandle, column: &str) -> EngineResult<Option<String>>;
    fn row_get_int32(&self, row: RowHandle, column: &str) -> EngineResult<Option<i32>>;
    fn row_get_double(&self, row: RowHandle, column: &str) -> EngineResult<Option<f64>>;
    fn row_get_blob(&self, row: RowHandle, column: &str) -> EngineResult<Option<Vec<u8>>>;
    /// The row's feature geometry.
    fn row_get_geometry(&self, row: RowHandle) -> EngineResult<Option<Vec<u8>>>;

    fn list_table_names(&self, db: DbHandle) -> EngineResult<Vec<String>>;
    fn list_domains(&self, db: DbHandle) -> EngineResult<Vec<String>>;
    fn list_relationships(&self, db: DbHandle) -> EngineResult<Vec<String>>;

    fn create_coded_domain(&mut self, db: DbHandle, name: &str, field_type: &str) -> EngineResult<()>;
    fn add_coded_value(&mut self, db: DbHandle, domain: &str, code: &str, label: &str) -> EngineResult<()>;
    fn assign_domain_to_field(&mut self, db: DbHandle, table: &str, column: &str, domain: &str) -> EngineResult<()>;
    fn create_relationship_class(&mut self, db: DbHandle, relationship: &RelationshipClass) -> EngineResult<()>;
}
