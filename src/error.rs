use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a native error, as reported by a driver or cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No error occurred.
    #[default]
    NoError,
    /// Connection-level failure.
    ConnectionError,
    /// SQL statement syntax or execution failure.
    StatementError,
    /// Transaction begin/commit/rollback failure.
    TransactionError,
    /// Failure the driver could not classify.
    UnknownError,
}

/// Error information reported by a native driver, connection or cursor.
///
/// Native surfaces signal failure with a `false` return and leave the details
/// here; this value is what ends up inside [`StatementFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SqlError {
    driver_text: String,
    database_text: String,
    native_code: String,
    kind: ErrorKind,
}

impl SqlError {
    #[must_use]
    pub fn new(
        driver_text: impl Into<String>,
        database_text: impl Into<String>,
        kind: ErrorKind,
    ) -> Self {
        Self {
            driver_text: driver_text.into(),
            database_text: database_text.into(),
            native_code: String::new(),
            kind,
        }
    }

    /// The "nothing went wrong" value.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_native_code(mut self, code: impl Into<String>) -> Self {
        self.native_code = code.into();
        self
    }

    #[must_use]
    pub fn driver_text(&self) -> &str {
        &self.driver_text
    }

    #[must_use]
    pub fn database_text(&self) -> &str {
        &self.database_text
    }

    #[must_use]
    pub fn native_code(&self) -> &str {
        &self.native_code
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// `true` when this value describes an actual error.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.kind != ErrorKind::NoError
    }

    /// Database text followed by driver text, skipping whichever is empty.
    #[must_use]
    pub fn text(&self) -> String {
        match (self.database_text.is_empty(), self.driver_text.is_empty()) {
            (false, false) => format!("{} {}", self.database_text, self.driver_text),
            (false, true) => self.database_text.clone(),
            (true, _) => self.driver_text.clone(),
        }
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.native_code.is_empty() {
            write!(f, "{}", self.text())
        } else {
            write!(f, "[{}] {}", self.native_code, self.text())
        }
    }
}

/// Payload of a failed statement: the native error plus the SQL that was
/// running when it happened. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementFailure {
    error: SqlError,
    statement_text: String,
}

impl StatementFailure {
    #[must_use]
    pub fn new(error: SqlError, statement_text: impl Into<String>) -> Self {
        Self {
            error,
            statement_text: statement_text.into(),
        }
    }

    /// Native error code (may be empty when the engine reports none).
    #[must_use]
    pub fn code(&self) -> &str {
        self.error.native_code()
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.error.text()
    }

    #[must_use]
    pub fn statement_text(&self) -> &str {
        &self.statement_text
    }

    #[must_use]
    pub fn error(&self) -> &SqlError {
        &self.error
    }
}

impl fmt::Display for StatementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statement_text.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{} (statement: {})", self.error, self.statement_text)
        }
    }
}

#[derive(Debug, Error)]
pub enum SqlTxError {
    #[error("Connection error: {0}")]
    ConnectionError(SqlError),

    #[error("Transaction error: {0}")]
    TransactionError(StatementFailure),

    #[error("Query error: {0}")]
    QueryError(StatementFailure),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),
}

impl SqlTxError {
    /// The statement payload for transaction and query errors.
    #[must_use]
    pub fn statement_failure(&self) -> Option<&StatementFailure> {
        match self {
            SqlTxError::TransactionError(failure) | SqlTxError::QueryError(failure) => {
                Some(failure)
            }
            _ => None,
        }
    }

    /// The native error carried by this value, if any.
    #[must_use]
    pub fn sql_error(&self) -> Option<&SqlError> {
        match self {
            SqlTxError::ConnectionError(err) => Some(err),
            SqlTxError::TransactionError(failure) | SqlTxError::QueryError(failure) => {
                Some(failure.error())
            }
            _ => None,
        }
    }
}
