//! Convenient imports for common functionality.
//!
//! This module re-exports the types most callers need to open a scope, run
//! statements and read results.

pub use crate::config::TransactionOptions;
pub use crate::driver::{Database, Driver};
pub use crate::error::{ErrorKind, SqlError, SqlTxError, StatementFailure};
pub use crate::query::Query;
pub use crate::record::SqlRecord;
pub use crate::result::SqlResult;
pub use crate::transaction::{TransactionScope, with_transaction};
pub use crate::types::{BatchExecutionMode, DriverFeature, RowValues, TableType};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteDatabase, SqliteOptions, TxBehavior};
