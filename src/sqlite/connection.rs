use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::driver::{ConnectOptions, Database, Driver, format_literal};
use crate::error::{ErrorKind, SqlError, SqlTxError};
use crate::record::{SqlField, SqlIndex, SqlRecord};
use crate::result::SqlResult;
use crate::types::{DriverFeature, IdentifierType, NativeHandle, RowValues, TableType};

use super::config::SqliteOptions;
use super::result::SqliteResult;
use super::schema;

/// Describe a rusqlite failure the way native surfaces report errors.
pub(crate) fn sql_error(err: &rusqlite::Error, context: &str, kind: ErrorKind) -> SqlError {
    let code = match err {
        rusqlite::Error::SqliteFailure(ffi, _) => ffi.extended_code.to_string(),
        _ => String::new(),
    };
    let database_text = match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
        other => other.to_string(),
    };
    SqlError::new(context, database_text, kind).with_native_code(code)
}

/// Native `SQLite` driver over a rusqlite connection.
///
/// Transaction control and statement failures are reported the native way:
/// a `false` return plus [`Driver::last_error`].
pub struct SqliteDriver {
    pub(crate) conn: RefCell<Option<Connection>>,
    last_error: RefCell<SqlError>,
    options: SqliteOptions,
}

impl SqliteDriver {
    fn new(conn: Connection, options: SqliteOptions) -> Self {
        Self {
            conn: RefCell::new(Some(conn)),
            last_error: RefCell::new(SqlError::none()),
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    fn set_last_error(&self, error: SqlError) {
        *self.last_error.borrow_mut() = error;
    }

    pub(crate) fn not_open() -> SqlError {
        SqlError::new("database is not open", "", ErrorKind::ConnectionError)
    }

    fn run_batch(&self, sql: &str, context: &str) -> bool {
        let guard = self.conn.borrow();
        let Some(conn) = guard.as_ref() else {
            self.set_last_error(Self::not_open());
            return false;
        };
        match conn.execute_batch(sql) {
            Ok(()) => {
                self.set_last_error(SqlError::none());
                true
            }
            Err(err) => {
                debug!(sql, error = %err, "sqlite transaction statement failed");
                self.set_last_error(sql_error(&err, context, ErrorKind::TransactionError));
                false
            }
        }
    }

    fn with_schema<T: Default>(
        &self,
        context: &str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> T {
        let guard = self.conn.borrow();
        let Some(conn) = guard.as_ref() else {
            self.set_last_error(Self::not_open());
            return T::default();
        };
        match f(conn) {
            Ok(value) => value,
            Err(err) => {
                self.set_last_error(sql_error(&err, context, ErrorKind::StatementError));
                T::default()
            }
        }
    }

    fn apply_busy_timeout(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.busy_timeout(Duration::from_millis(self.options.busy_timeout_ms))
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("open", &self.is_open())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Driver for SqliteDriver {
    fn create_result(&self) -> Box<dyn SqlResult + '_> {
        Box::new(SqliteResult::new(self))
    }

    fn has_feature(&self, feature: DriverFeature) -> bool {
        match feature {
            DriverFeature::Transactions
            | DriverFeature::QuerySize
            | DriverFeature::Blob
            | DriverFeature::Unicode
            | DriverFeature::PreparedQueries
            | DriverFeature::NamedPlaceholders
            | DriverFeature::PositionalPlaceholders
            | DriverFeature::LastInsertId
            | DriverFeature::BatchOperations
            | DriverFeature::SimpleLocking
            | DriverFeature::LowPrecisionNumbers
            | DriverFeature::FinishQuery
            | DriverFeature::CancelQuery => true,
            DriverFeature::EventNotifications | DriverFeature::MultipleResultSets => false,
        }
    }

    fn open(&self, options: &ConnectOptions) -> Result<bool, SqlTxError> {
        if self.is_open() {
            return Ok(true);
        }
        let path = if options.database_name.is_empty() {
            self.options.db_path.as_str()
        } else {
            options.database_name.as_str()
        };
        let opened = Connection::open(path).and_then(|conn| {
            self.apply_busy_timeout(&conn)?;
            Ok(conn)
        });
        match opened {
            Ok(conn) => {
                *self.conn.borrow_mut() = Some(conn);
                self.set_last_error(SqlError::none());
                Ok(true)
            }
            Err(err) => {
                self.set_last_error(sql_error(
                    &err,
                    "Error opening database",
                    ErrorKind::ConnectionError,
                ));
                Ok(false)
            }
        }
    }

    fn close(&self) -> Result<(), SqlTxError> {
        let Some(conn) = self.conn.borrow_mut().take() else {
            return Ok(());
        };
        if let Err((conn, err)) = conn.close() {
            self.set_last_error(sql_error(
                &err,
                "Error closing database",
                ErrorKind::ConnectionError,
            ));
            *self.conn.borrow_mut() = Some(conn);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.borrow().is_some()
    }

    fn last_error(&self) -> SqlError {
        self.last_error.borrow().clone()
    }

    fn begin_transaction(&self) -> bool {
        self.run_batch(self.options.behavior.begin_sql(), "Unable to begin transaction")
    }

    fn commit_transaction(&self) -> bool {
        self.run_batch("COMMIT", "Unable to commit transaction")
    }

    fn rollback_transaction(&self) -> bool {
        self.run_batch("ROLLBACK", "Unable to rollback transaction")
    }

    fn tables(&self, table_type: TableType) -> Vec<String> {
        self.with_schema("Unable to list tables", |conn| {
            schema::tables(conn, table_type)
        })
    }

    fn primary_index(&self, table_name: &str) -> SqlIndex {
        let table = self.strip_delimiters(table_name, IdentifierType::TableName);
        self.with_schema("Unable to read primary index", |conn| {
            schema::primary_index(conn, &table)
        })
    }

    fn record(&self, table_name: &str) -> SqlRecord {
        let table = self.strip_delimiters(table_name, IdentifierType::TableName);
        self.with_schema("Unable to read table record", |conn| {
            schema::record(conn, &table)
        })
    }

    fn handle(&self) -> NativeHandle {
        NativeHandle::of("sqlite3", &self.conn)
    }

    fn cancel_query(&self) -> bool {
        match self.conn.borrow().as_ref() {
            Some(conn) => {
                conn.get_interrupt_handle().interrupt();
                true
            }
            None => false,
        }
    }

    fn escape_identifier(&self, identifier: &str, kind: IdentifierType) -> String {
        if self.is_identifier_escaped(identifier, kind) {
            return identifier.to_owned();
        }
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn format_value(&self, field: &SqlField, trim_strings: bool) -> String {
        match field.value() {
            RowValues::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
            other => format_literal(other, trim_strings),
        }
    }
}

/// A caller-owned `SQLite` connection handle.
#[derive(Debug)]
pub struct SqliteDatabase {
    driver: SqliteDriver,
}

impl SqliteDatabase {
    /// Open the database file named by `options`.
    ///
    /// # Errors
    /// Returns `SqlTxError::ConfigError` for invalid options and
    /// `SqlTxError::SqliteError` if the file cannot be opened.
    pub fn open(options: SqliteOptions) -> Result<Self, SqlTxError> {
        options.validate()?;
        let conn = Connection::open(&options.db_path)?;
        Self::from_connection(conn, options)
    }

    /// Adopt an already opened rusqlite connection.
    ///
    /// # Errors
    /// Returns `SqlTxError::SqliteError` if the busy timeout cannot be applied.
    pub fn from_connection(conn: Connection, options: SqliteOptions) -> Result<Self, SqlTxError> {
        let driver = SqliteDriver::new(conn, options);
        driver.apply_busy_timeout_to_current()?;
        Ok(Self { driver })
    }

    #[must_use]
    pub fn native_driver(&self) -> &SqliteDriver {
        &self.driver
    }

    /// Run `func` against the raw rusqlite connection.
    ///
    /// # Errors
    /// Returns `SqlTxError::ConnectionError` if the connection was closed, or
    /// whatever `func` returns.
    pub fn with_connection<F, R>(&self, func: F) -> Result<R, SqlTxError>
    where
        F: FnOnce(&Connection) -> Result<R, SqlTxError>,
    {
        let guard = self.driver.conn.borrow();
        let conn = guard
            .as_ref()
            .ok_or_else(|| SqlTxError::ConnectionError(SqliteDriver::not_open()))?;
        func(conn)
    }

    /// Open the connection again after a `close`.
    ///
    /// # Errors
    /// Returns `SqlTxError::ConnectionError` if the file cannot be reopened.
    pub fn reopen(&self) -> Result<(), SqlTxError> {
        if self.driver.open(&ConnectOptions::default())? {
            Ok(())
        } else {
            Err(SqlTxError::ConnectionError(self.driver.last_error()))
        }
    }

    /// Close the connection. Statements fail until [`reopen`](Self::reopen).
    ///
    /// # Errors
    /// Never fails for the native driver; kept fallible to mirror `Driver::close`.
    pub fn close(&self) -> Result<(), SqlTxError> {
        self.driver.close()
    }
}

impl SqliteDriver {
    fn apply_busy_timeout_to_current(&self) -> rusqlite::Result<()> {
        match self.conn.borrow().as_ref() {
            Some(conn) => self.apply_busy_timeout(conn),
            None => Ok(()),
        }
    }
}

impl Database for SqliteDatabase {
    fn driver(&self) -> &dyn Driver {
        &self.driver
    }
}
