use tracing::{debug, warn};

use crate::config::TransactionOptions;
use crate::driver::{Database, Driver};
use crate::error::{ErrorKind, SqlError, SqlTxError, StatementFailure};
use crate::proxy::DriverProxy;
use crate::query::Query;
use crate::types::DriverFeature;

const BEGIN: &str = "BEGIN";
const COMMIT: &str = "COMMIT";

/// A transaction tied to the lifetime of a value.
///
/// Creating the scope begins a transaction on a caller-owned connection.
/// [`commit`](Self::commit) makes it permanent; dropping the scope without a
/// successful commit rolls it back. Statements run through
/// [`query`](Self::query) report every failure as `Err`.
///
/// ```rust,no_run
/// # use sql_tx_scope::prelude::*;
/// # fn demo(db: &dyn Database) -> Result<(), SqlTxError> {
/// let mut scope = TransactionScope::new(db)?;
/// {
///     let mut query = scope.query();
///     query.exec("INSERT INTO t VALUES (1)")?;
/// }
/// scope.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct TransactionScope<'c> {
    db: &'c dyn Database,
    driver: DriverProxy<'c>,
    committed: bool,
    options: TransactionOptions,
}

impl<'c> TransactionScope<'c> {
    /// Begin a transaction on `db` with default options.
    ///
    /// # Errors
    /// Returns `SqlTxError::TransactionError` if the driver has no transaction
    /// support or the connection refuses to begin.
    pub fn new(db: &'c dyn Database) -> Result<Self, SqlTxError> {
        Self::with_options(db, TransactionOptions::default())
    }

    /// Begin a transaction on `db`.
    ///
    /// # Errors
    /// Returns `SqlTxError::TransactionError` if the driver has no transaction
    /// support or the connection refuses to begin.
    pub fn with_options(
        db: &'c dyn Database,
        options: TransactionOptions,
    ) -> Result<Self, SqlTxError> {
        if options.require_transaction_feature
            && !db.driver().has_feature(DriverFeature::Transactions)
        {
            let error = SqlError::new(
                "driver does not support transactions",
                "",
                ErrorKind::TransactionError,
            );
            return Err(SqlTxError::TransactionError(StatementFailure::new(
                error, BEGIN,
            )));
        }
        if !db.transaction() {
            return Err(SqlTxError::TransactionError(StatementFailure::new(
                failure_or(db.last_error(), "unable to begin transaction"),
                BEGIN,
            )));
        }
        debug!(label = options.label(), "transaction scope started");
        Ok(Self {
            db,
            driver: DriverProxy::new(db),
            committed: false,
            options,
        })
    }

    /// A fresh statement handle whose cursor reports failures as `Err`.
    #[must_use]
    pub fn query(&self) -> Query<'_> {
        debug!(label = self.options.label(), "query handle created");
        Query::new(self.driver.create_result())
    }

    /// Commit the transaction. After success, dropping the scope does nothing.
    ///
    /// # Errors
    /// Returns `SqlTxError::TransactionError` if the connection fails to commit
    /// (the scope stays uncommitted and still rolls back on drop), or if the
    /// scope was already committed.
    pub fn commit(&mut self) -> Result<(), SqlTxError> {
        if self.committed {
            let error = SqlError::new(
                "transaction scope already committed",
                "",
                ErrorKind::TransactionError,
            );
            return Err(SqlTxError::TransactionError(StatementFailure::new(
                error, COMMIT,
            )));
        }
        if !self.db.commit() {
            let error = failure_or(self.db.last_error(), "unable to commit transaction");
            debug!(label = self.options.label(), %error, "commit failed");
            return Err(SqlTxError::TransactionError(StatementFailure::new(
                error, COMMIT,
            )));
        }
        self.committed = true;
        debug!(label = self.options.label(), "transaction scope committed");
        Ok(())
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// The driver wrapper statements run through.
    #[must_use]
    pub fn driver(&self) -> &DriverProxy<'c> {
        &self.driver
    }

    /// The caller's connection handle.
    #[must_use]
    pub fn database(&self) -> &'c dyn Database {
        self.db
    }

    #[must_use]
    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if self.db.rollback() {
            debug!(label = self.options.label(), "transaction scope rolled back");
        } else {
            warn!(
                label = self.options.label(),
                error = %self.db.last_error(),
                "rollback of uncommitted transaction scope failed"
            );
        }
    }
}

fn failure_or(error: SqlError, fallback: &str) -> SqlError {
    if error.is_valid() {
        error
    } else {
        SqlError::new(fallback, "", ErrorKind::TransactionError)
    }
}

/// Run `work` inside a transaction scope on `db`.
///
/// Commits when `work` returns `Ok`; when it returns `Err` the scope is dropped
/// and rolls back, and the error is passed through.
///
/// # Errors
/// Returns the error from `work`, or a `SqlTxError` (converted into `E`) if
/// beginning or committing fails.
pub fn with_transaction<'c, T, E, F>(db: &'c dyn Database, work: F) -> Result<T, E>
where
    F: FnOnce(&TransactionScope<'c>) -> Result<T, E>,
    E: From<SqlTxError>,
{
    let mut scope = TransactionScope::new(db)?;
    let value = work(&scope)?;
    scope.commit()?;
    Ok(value)
}
