//! Scope-bound SQL transactions.
//!
//! A [`TransactionScope`] begins a transaction on a caller-owned [`Database`]
//! and rolls it back on drop unless [`TransactionScope::commit`] succeeded.
//! Statements executed through the scope go through [`DriverProxy`] and
//! [`ResultProxy`], which turn the native "returned false, check
//! `last_error`" convention into `Result` values.

pub mod config;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod proxy;
pub mod query;
pub mod record;
pub mod result;
pub mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{TransactionOptions, TransactionOptionsBuilder};
pub use driver::{ConnectOptions, Database, Driver};
pub use error::{ErrorKind, SqlError, SqlTxError, StatementFailure};
pub use proxy::{DriverProxy, ResultProxy};
pub use query::Query;
pub use record::{SqlField, SqlIndex, SqlRecord};
pub use result::{BoundValue, ResultState, SqlResult};
pub use transaction::{TransactionScope, with_transaction};
pub use types::{
    AFTER_LAST_ROW, BEFORE_FIRST_ROW, BatchExecutionMode, DriverFeature, IdentifierType,
    NativeHandle, NumericalPrecisionPolicy, ParamType, RowValues, StatementType, TableType,
};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteOptions, TxBehavior};
