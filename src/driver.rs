//! Driver and connection capability surfaces.
//!
//! Both traits take `&self`: a driver is shared between the connection that
//! owns it and every cursor created from it, so implementations keep their
//! mutable bits behind `Cell`/`RefCell`.

use std::fmt::Write as _;

use crate::error::{SqlError, SqlTxError};
use crate::record::{SqlField, SqlIndex, SqlRecord};
use crate::result::SqlResult;
use crate::types::{
    DriverFeature, IdentifierType, NativeHandle, RowValues, StatementType, TableType,
};

/// Arguments of a driver-level `open`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub database_name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: Option<u16>,
    /// Backend-specific `key=value;key=value` options.
    pub options: String,
}

impl ConnectOptions {
    #[must_use]
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            ..Self::default()
        }
    }
}

/// A native driver: the engine-specific half of a connection.
pub trait Driver {
    /// New native cursor over this driver. Cursors may borrow the driver.
    fn create_result(&self) -> Box<dyn SqlResult + '_>;

    fn has_feature(&self, feature: DriverFeature) -> bool;

    /// Open the underlying connection.
    ///
    /// # Errors
    /// Native drivers report failure as `Ok(false)`; wrappers may refuse with `Err`.
    fn open(&self, options: &ConnectOptions) -> Result<bool, SqlTxError>;

    /// Close the underlying connection.
    ///
    /// # Errors
    /// Wrappers that do not own the connection refuse with `Err`.
    fn close(&self) -> Result<(), SqlTxError>;

    fn is_open(&self) -> bool;

    fn last_error(&self) -> SqlError;

    fn begin_transaction(&self) -> bool {
        false
    }

    fn commit_transaction(&self) -> bool {
        false
    }

    fn rollback_transaction(&self) -> bool {
        false
    }

    fn tables(&self, table_type: TableType) -> Vec<String> {
        let _ = table_type;
        Vec::new()
    }

    fn primary_index(&self, table_name: &str) -> SqlIndex {
        let _ = table_name;
        SqlIndex::default()
    }

    fn record(&self, table_name: &str) -> SqlRecord {
        let _ = table_name;
        SqlRecord::default()
    }

    fn handle(&self) -> NativeHandle {
        NativeHandle::none()
    }

    fn subscribe_to_notification(&self, name: &str) -> bool {
        let _ = name;
        false
    }

    fn unsubscribe_from_notification(&self, name: &str) -> bool {
        let _ = name;
        false
    }

    fn subscribed_to_notifications(&self) -> Vec<String> {
        Vec::new()
    }

    fn cancel_query(&self) -> bool {
        false
    }

    fn escape_identifier(&self, identifier: &str, kind: IdentifierType) -> String {
        let _ = kind;
        identifier.to_owned()
    }

    fn is_identifier_escaped(&self, identifier: &str, kind: IdentifierType) -> bool {
        let _ = kind;
        identifier.len() >= 2 && identifier.starts_with('"') && identifier.ends_with('"')
    }

    fn strip_delimiters(&self, identifier: &str, kind: IdentifierType) -> String {
        if self.is_identifier_escaped(identifier, kind) {
            identifier[1..identifier.len() - 1].to_owned()
        } else {
            identifier.to_owned()
        }
    }

    /// SQL literal for the value of `field`.
    fn format_value(&self, field: &SqlField, trim_strings: bool) -> String {
        format_literal(field.value(), trim_strings)
    }

    /// Generate a statement of `kind` over `table_name` from the generated fields of `record`.
    ///
    /// Returns an empty string when the record has nothing to generate.
    fn sql_statement(
        &self,
        kind: StatementType,
        table_name: &str,
        record: &SqlRecord,
        prepared: bool,
    ) -> String {
        let table = self.prepare_identifier(table_name, IdentifierType::TableName);
        let generated: Vec<&SqlField> =
            record.fields().iter().filter(|f| f.is_generated()).collect();
        let column = |f: &SqlField| self.prepare_identifier(f.name(), IdentifierType::FieldName);
        let literal = |f: &SqlField| {
            if prepared {
                "?".to_owned()
            } else {
                self.format_value(f, false)
            }
        };

        match kind {
            StatementType::SelectStatement => {
                if generated.is_empty() {
                    return String::new();
                }
                let cols: Vec<String> = generated.iter().map(|f| column(*f)).collect();
                format!("SELECT {} FROM {table}", cols.join(", "))
            }
            StatementType::WhereStatement => {
                if record.is_empty() {
                    return String::new();
                }
                let mut out = String::from("WHERE ");
                for (i, f) in record.fields().iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    let name = column(f);
                    if f.is_null() && !prepared {
                        let _ = write!(out, "{name} IS NULL");
                    } else {
                        let _ = write!(out, "{name} = {}", literal(f));
                    }
                }
                out
            }
            StatementType::UpdateStatement => {
                if generated.is_empty() {
                    return String::new();
                }
                let sets: Vec<String> = generated
                    .iter()
                    .map(|f| format!("{} = {}", column(*f), literal(*f)))
                    .collect();
                format!("UPDATE {table} SET {}", sets.join(", "))
            }
            StatementType::DeleteStatement => format!("DELETE FROM {table}"),
            StatementType::InsertStatement => {
                if generated.is_empty() {
                    return String::new();
                }
                let cols: Vec<String> = generated.iter().map(|f| column(*f)).collect();
                let vals: Vec<String> = generated.iter().map(|f| literal(*f)).collect();
                format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    cols.join(", "),
                    vals.join(", ")
                )
            }
        }
    }

    /// Escape `identifier` unless it already is.
    fn prepare_identifier(&self, identifier: &str, kind: IdentifierType) -> String {
        if self.is_identifier_escaped(identifier, kind) {
            identifier.to_owned()
        } else {
            self.escape_identifier(identifier, kind)
        }
    }
}

/// Engine-neutral SQL literal for `value`.
#[must_use]
pub fn format_literal(value: &RowValues, trim_strings: bool) -> String {
    match value {
        RowValues::Null => "NULL".to_owned(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Bool(b) => (if *b { "1" } else { "0" }).to_owned(),
        RowValues::Text(s) => {
            let s = if trim_strings { s.trim_end() } else { s.as_str() };
            format!("'{}'", s.replace('\'', "''"))
        }
        RowValues::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        RowValues::Blob(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 2);
            out.push('\'');
            for b in bytes {
                let _ = write!(out, "{b:02x}");
            }
            out.push('\'');
            out
        }
        RowValues::List(items) => {
            let parts: Vec<String> =
                items.iter().map(|v| format_literal(v, trim_strings)).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// A caller-owned connection handle.
///
/// Only `driver` is required; everything else defaults to the driver's answer,
/// with `transaction` refusing up front when the driver lacks
/// [`DriverFeature::Transactions`].
pub trait Database {
    fn driver(&self) -> &dyn Driver;

    fn transaction(&self) -> bool {
        let driver = self.driver();
        driver.has_feature(DriverFeature::Transactions) && driver.begin_transaction()
    }

    fn commit(&self) -> bool {
        let driver = self.driver();
        driver.has_feature(DriverFeature::Transactions) && driver.commit_transaction()
    }

    fn rollback(&self) -> bool {
        let driver = self.driver();
        driver.has_feature(DriverFeature::Transactions) && driver.rollback_transaction()
    }

    fn last_error(&self) -> SqlError {
        self.driver().last_error()
    }

    fn is_open(&self) -> bool {
        self.driver().is_open()
    }

    fn tables(&self, table_type: TableType) -> Vec<String> {
        self.driver().tables(table_type)
    }

    fn primary_index(&self, table_name: &str) -> SqlIndex {
        self.driver().primary_index(table_name)
    }

    fn record(&self, table_name: &str) -> SqlRecord {
        self.driver().record(table_name)
    }
}
