use tracing::debug;

use crate::driver::{ConnectOptions, Database, Driver};
use crate::error::{ErrorKind, SqlError, SqlTxError};
use crate::record::{SqlField, SqlIndex, SqlRecord};
use crate::result::SqlResult;
use crate::types::{DriverFeature, IdentifierType, NativeHandle, StatementType, TableType};

use super::ResultProxy;

/// Driver wrapper handed out by a [`TransactionScope`](crate::TransactionScope).
///
/// Forwards everything to the connection's native driver except:
/// * `open`/`close`, which always fail: the caller owns the connection;
/// * transaction control, `is_open` and schema introspection, which go to the
///   connection handle;
/// * `create_result`, which wraps every native cursor in a [`ResultProxy`].
pub struct DriverProxy<'c> {
    db: &'c dyn Database,
    driver: &'c dyn Driver,
}

impl<'c> DriverProxy<'c> {
    #[must_use]
    pub fn new(db: &'c dyn Database) -> Self {
        Self {
            db,
            driver: db.driver(),
        }
    }

    /// The native driver behind this proxy.
    #[must_use]
    pub fn native(&self) -> &'c dyn Driver {
        self.driver
    }
}

fn lifecycle_refused(action: &str) -> SqlTxError {
    let text = format!("cannot {action} a connection owned by a transaction scope");
    debug!(action, "driver proxy refused lifecycle call");
    SqlTxError::ConnectionError(SqlError::new(text.clone(), text, ErrorKind::ConnectionError))
}

impl Driver for DriverProxy<'_> {
    fn create_result(&self) -> Box<dyn SqlResult + '_> {
        Box::new(ResultProxy::new(self.driver.create_result()))
    }

    fn has_feature(&self, feature: DriverFeature) -> bool {
        self.driver.has_feature(feature)
    }

    fn open(&self, _options: &ConnectOptions) -> Result<bool, SqlTxError> {
        Err(lifecycle_refused("open"))
    }

    fn close(&self) -> Result<(), SqlTxError> {
        Err(lifecycle_refused("close"))
    }

    fn is_open(&self) -> bool {
        self.db.is_open()
    }

    fn last_error(&self) -> SqlError {
        self.driver.last_error()
    }

    fn begin_transaction(&self) -> bool {
        self.db.transaction()
    }

    fn commit_transaction(&self) -> bool {
        self.db.commit()
    }

    fn rollback_transaction(&self) -> bool {
        self.db.rollback()
    }

    fn tables(&self, table_type: TableType) -> Vec<String> {
        self.db.tables(table_type)
    }

    fn primary_index(&self, table_name: &str) -> SqlIndex {
        self.db.primary_index(table_name)
    }

    fn record(&self, table_name: &str) -> SqlRecord {
        self.db.record(table_name)
    }

    fn handle(&self) -> NativeHandle {
        self.driver.handle()
    }

    fn subscribe_to_notification(&self, name: &str) -> bool {
        self.driver.subscribe_to_notification(name)
    }

    fn unsubscribe_from_notification(&self, name: &str) -> bool {
        self.driver.unsubscribe_from_notification(name)
    }

    fn subscribed_to_notifications(&self) -> Vec<String> {
        self.driver.subscribed_to_notifications()
    }

    fn cancel_query(&self) -> bool {
        self.driver.cancel_query()
    }

    fn escape_identifier(&self, identifier: &str, kind: IdentifierType) -> String {
        self.driver.escape_identifier(identifier, kind)
    }

    fn is_identifier_escaped(&self, identifier: &str, kind: IdentifierType) -> bool {
        self.driver.is_identifier_escaped(identifier, kind)
    }

    fn strip_delimiters(&self, identifier: &str, kind: IdentifierType) -> String {
        self.driver.strip_delimiters(identifier, kind)
    }

    fn format_value(&self, field: &SqlField, trim_strings: bool) -> String {
        self.driver.format_value(field, trim_strings)
    }

    fn sql_statement(
        &self,
        kind: StatementType,
        table_name: &str,
        record: &SqlRecord,
        prepared: bool,
    ) -> String {
        self.driver.sql_statement(kind, table_name, record, prepared)
    }
}
