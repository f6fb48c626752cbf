//! Database module
//!
//! SQLite connection pool, migrations and the catalog adapter used by labeling.

pub mod catalog;
pub mod connection;
pub mod migrations;

pub use catalog::SqliteCatalog;
pub use connection::{Database, DbError, DbResult};
