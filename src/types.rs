use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Cursor position before the first row of a result set.
pub const BEFORE_FIRST_ROW: i64 = -1;
/// Cursor position after the last row of a result set.
pub const AFTER_LAST_ROW: i64 = -2;

/// Values that can be stored in a database row or bound as statement parameters.
///
/// The same enum is used by every backend so cursor and query code never has to
/// branch on driver types:
/// ```rust
/// use sql_tx_scope::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    #[default]
    Null,
    /// Binary data
    Blob(Vec<u8>),
    /// One value per batch row; only meaningful as a bound value for `exec_batch`.
    List(Vec<RowValues>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[RowValues]> {
        if let RowValues::List(items) = self {
            Some(items)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    #[default]
    In,
    Out,
    InOut,
    Binary,
}

/// How a cursor should materialize floating point columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumericalPrecisionPolicy {
    LowPrecisionInt32,
    LowPrecisionInt64,
    LowPrecisionDouble,
    #[default]
    HighPrecision,
}

/// Optional capabilities a driver may advertise through `has_feature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverFeature {
    Transactions,
    QuerySize,
    Blob,
    Unicode,
    PreparedQueries,
    NamedPlaceholders,
    PositionalPlaceholders,
    LastInsertId,
    BatchOperations,
    SimpleLocking,
    LowPrecisionNumbers,
    EventNotifications,
    FinishQuery,
    MultipleResultSets,
    CancelQuery,
}

/// Table categories for schema introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableType {
    #[default]
    Tables,
    SystemTables,
    Views,
    AllTables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierType {
    FieldName,
    TableName,
}

/// Statement shapes produced by `Driver::sql_statement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    WhereStatement,
    SelectStatement,
    UpdateStatement,
    InsertStatement,
    DeleteStatement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchExecutionMode {
    #[default]
    ValuesAsRows,
    ValuesAsColumns,
}

/// Opaque identity of a native driver or cursor object.
///
/// Only good for comparison and display: it names the native type and carries
/// an address-sized token, never a dereferenceable pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle {
    type_name: &'static str,
    token: usize,
}

impl NativeHandle {
    #[must_use]
    pub const fn new(type_name: &'static str, token: usize) -> Self {
        Self { type_name, token }
    }

    /// Handle for a native object that exposes nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            type_name: "",
            token: 0,
        }
    }

    /// Builds a handle whose token is the address of `target`.
    #[must_use]
    pub fn of<T>(type_name: &'static str, target: &T) -> Self {
        Self::new(type_name, std::ptr::from_ref(target) as usize)
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn token(&self) -> usize {
        self.token
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.type_name.is_empty()
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.type_name, self.token)
    }
}
