// SQLite module - rusqlite-backed connection provider
//
// - config: connection options and their builder
// - params: value conversion and literal quoting
// - query: result materialization
// - connection: the provider and its live handle

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::{SqliteHandle, SqliteProvider, SqliteStatement};
pub use query::build_result_set;
