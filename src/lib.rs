// fgdb-sql - SQL client layer over a minimal file geodatabase engine
// Layered: engine boundary, catalog, executor, client surface

// Clippy configuration - allow non-critical pedantic warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::items_after_statements)]

// Value, type and schema model
pub mod core;

// Native engine boundary and the file-backed reference engine
pub mod engine;

// Schema catalog and type resolution
pub mod catalog;

// Shape-to-WKB conversion and NaN-Z sanitizing
pub mod geometry;

// SQL grammar (SELECT, conditions, DDL/DML, literals)
pub mod parser;

// Query planning and execution (joins, unions, paging, updates)
pub mod executor;

// Directory snapshot transactions
pub mod transaction;

// Connection, statement, result set and metadata surface
pub mod client;

// Re-export commonly used types for convenience
pub use client::{
    Connection, ConnectionOptions, DatabaseMetadata, Param, PreparedStatement, ResultSet, ResultSetMetaData,
    Statement,
};
pub use core::{BatchOutcome, FgdbError, Result, SqlType, Value};
pub use engine::{EngineError, FileEngine, NativeEngine};
