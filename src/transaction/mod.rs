// Transaction module - directory snapshot commit/rollback

mod manager;
pub mod snapshot;

pub use manager::TransactionManager;
pub use snapshot::DirectorySnapshot;
