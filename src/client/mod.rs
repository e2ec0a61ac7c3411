//! Connection, statement and result-set surface.

mod connection;
pub mod metadata;
pub mod prepared;
pub mod result_set;
mod statement;

pub use connection::{Connection, ConnectionOptions};
pub use metadata::DatabaseMetadata;
pub use prepared::{Param, PreparedStatement};
pub use result_set::{ResultSet, ResultSetMetaData};
pub use statement::Statement;
