// SQLite backend - a native driver and cursor over rusqlite
//
// - config: open options and transaction behavior
// - connection: the driver and the caller-owned database handle
// - params: value conversion between RowValues and SQLite
// - result: the native cursor
// - schema: table, record and primary index introspection

pub mod config;
pub mod connection;
pub mod params;
pub mod result;
mod schema;

pub use config::{SqliteOptions, SqliteOptionsBuilder, TxBehavior};
pub use connection::{SqliteDatabase, SqliteDriver};
pub use result::SqliteResult;
