//! Column schema resolution: structured definitions, column-property hints,
//! sampling probes and the pure type mapping rules.

pub mod definition;
pub mod probe;
pub mod schema_catalog;
pub mod tables;
pub mod type_resolver;

pub use schema_catalog::{SchemaCatalog, COLUMN_PROP_TABLE, DEFAULT_SAMPLE_ROWS};
pub use tables::KnownTables;
