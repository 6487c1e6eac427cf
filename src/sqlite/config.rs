use serde::Deserialize;

use crate::error::SqlTxError;

use super::connection::SqliteDatabase;

/// How `BEGIN` acquires locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxBehavior {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl TxBehavior {
    #[must_use]
    pub fn begin_sql(self) -> &'static str {
        match self {
            TxBehavior::Deferred => "BEGIN DEFERRED",
            TxBehavior::Immediate => "BEGIN IMMEDIATE",
            TxBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub behavior: TxBehavior,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            busy_timeout_ms: default_busy_timeout_ms(),
            behavior: TxBehavior::default(),
        }
    }

    /// In-memory database private to one connection.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:".into())
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: TxBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// # Errors
    /// Returns `SqlTxError::ConfigError` if the path is empty.
    pub fn validate(&self) -> Result<(), SqlTxError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlTxError::ConfigError(
                "SQLite db_path must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_timeout_ms(mut self, millis: u64) -> Self {
        self.opts.busy_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn behavior(mut self, behavior: TxBehavior) -> Self {
        self.opts.behavior = behavior;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open the database described by these options.
    ///
    /// # Errors
    /// Returns `SqlTxError` if the options are invalid or the file cannot be opened.
    pub fn open(self) -> Result<SqliteDatabase, SqlTxError> {
        SqliteDatabase::open(self.finish())
    }
}

impl SqliteDatabase {
    #[must_use]
    pub fn builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}
